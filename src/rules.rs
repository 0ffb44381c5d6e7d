use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RuleContext;
use crate::error::Result;
use crate::models::{
    ActionType, EligibilityStatus, GradeLevel, InterestLevel, Interaction, RuleType, Suggestion,
    TargetSchool, Urgency,
};
use crate::status::{calculate_status, StatusLabel, StatusSignals};
use crate::tasks::TaskChecklist;

pub const OUTREACH_GAP_DAYS: i64 = 30;
pub const COACH_FOLLOW_UP_DAYS: i64 = 14;
pub const REQUIRED_VISITS: usize = 2;
pub const VISIT_KEYWORDS: &[&str] = &["visit", "official", "unofficial", "campus tour"];
pub const VIDEO_STALE_DAYS: i64 = 180;
pub const MIN_TARGET_SCHOOLS: usize = 5;
pub const EVENT_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionDraft {
    pub urgency: Urgency,
    pub message: String,
    pub action_type: ActionType,
    pub related_school_id: Option<Uuid>,
    pub related_task_id: Option<Uuid>,
}

impl SuggestionDraft {
    fn new(urgency: Urgency, action_type: ActionType, message: impl Into<String>) -> Self {
        Self {
            urgency,
            message: message.into(),
            action_type,
            related_school_id: None,
            related_task_id: None,
        }
    }

    fn for_school(mut self, school_id: Uuid) -> Self {
        self.related_school_id = Some(school_id);
        self
    }

    fn for_task(mut self, task_id: Uuid) -> Self {
        self.related_task_id = Some(task_id);
        self
    }
}

/// Something the athlete did that may fulfil an open suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedAction {
    InteractionLogged {
        school_id: Option<Uuid>,
        interaction_type: Option<String>,
    },
    TaskCompleted {
        task_id: Uuid,
    },
    VideoUploaded,
    EventRegistered {
        event_id: Uuid,
    },
    SchoolAdded,
    ProfileUpdated,
}

impl From<&Interaction> for CompletedAction {
    fn from(interaction: &Interaction) -> Self {
        CompletedAction::InteractionLogged {
            school_id: interaction.school_id,
            interaction_type: interaction.interaction_type.clone(),
        }
    }
}

pub trait Rule: Send + Sync {
    fn rule_type(&self) -> RuleType;

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>>;

    /// `ctx` reflects state after the action was recorded.
    fn is_completed_by(
        &self,
        _action: &CompletedAction,
        _suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        false
    }
}

pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(FormalOutreachRule),
        Box::new(OfficialVisitRule),
        Box::new(CoachFollowUpRule),
        Box::new(HighlightVideoRule),
        Box::new(EligibilityRegistrationRule),
        Box::new(StandardizedTestRule),
        Box::new(BuildSchoolListRule),
        Box::new(NextRequiredTaskRule),
        Box::new(UpcomingEventRule),
        Box::new(StatusCheckInRule),
    ]
}

fn grade_at_least(ctx: &RuleContext, floor: GradeLevel) -> Option<GradeLevel> {
    ctx.athlete.grade_level.filter(|grade| *grade >= floor)
}

fn no_longer_applies(rule: &dyn Rule, ctx: &RuleContext) -> bool {
    matches!(rule.evaluate(ctx), Ok(None))
}

fn logged_for_school(action: &CompletedAction, suggestion: &Suggestion) -> bool {
    match action {
        CompletedAction::InteractionLogged { school_id, .. } => match suggestion.related_school_id {
            Some(related) => *school_id == Some(related),
            None => true,
        },
        _ => false,
    }
}

pub fn is_visit_type(interaction_type: Option<&str>) -> bool {
    interaction_type.is_some_and(|kind| {
        let kind = kind.to_lowercase();
        VISIT_KEYWORDS.iter().any(|keyword| kind.contains(keyword))
    })
}

/// Keep in touch with every A/B school at least once a month.
pub struct FormalOutreachRule;

impl Rule for FormalOutreachRule {
    fn rule_type(&self) -> RuleType {
        RuleType::FormalOutreach
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = grade_at_least(ctx, GradeLevel::Junior) else {
            return Ok(None);
        };
        let priority = ctx.priority_schools();
        if priority.is_empty() {
            return Ok(None);
        }

        // Fire when any single school is overdue, not when the average is.
        let overdue: Vec<(&TargetSchool, Option<i64>)> = priority
            .into_iter()
            .map(|school| (school, ctx.days_since_contact(school.id)))
            .filter(|(_, gap)| gap.map_or(true, |days| days > OUTREACH_GAP_DAYS))
            .collect();
        let Some((stalest, gap)) = overdue
            .iter()
            .max_by_key(|(_, gap)| gap.unwrap_or(i64::MAX))
            .copied()
        else {
            return Ok(None);
        };

        let urgency = if grade >= GradeLevel::Senior {
            Urgency::High
        } else {
            Urgency::Medium
        };
        let mut message = match gap {
            Some(days) => format!(
                "It has been {days} days since you contacted {}. Send the coaching staff a formal update.",
                stalest.name
            ),
            None => format!(
                "You haven't contacted {} yet. Send the coaching staff a formal introduction.",
                stalest.name
            ),
        };
        if overdue.len() > 1 {
            message.push_str(&format!(
                " {} other priority schools are also overdue.",
                overdue.len() - 1
            ));
        }

        Ok(Some(
            SuggestionDraft::new(urgency, ActionType::LogInteraction, message).for_school(stalest.id),
        ))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        logged_for_school(action, suggestion)
    }
}

/// Juniors and seniors should see campuses in person.
pub struct OfficialVisitRule;

impl Rule for OfficialVisitRule {
    fn rule_type(&self) -> RuleType {
        RuleType::OfficialVisit
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = grade_at_least(ctx, GradeLevel::Junior) else {
            return Ok(None);
        };
        if ctx.priority_schools().is_empty() {
            return Ok(None);
        }

        let visits = ctx
            .interactions
            .iter()
            .filter(|interaction| is_visit_type(interaction.interaction_type.as_deref()))
            .count();
        if visits >= REQUIRED_VISITS {
            return Ok(None);
        }

        let urgency = if grade >= GradeLevel::Senior {
            Urgency::High
        } else {
            Urgency::Low
        };
        let message = format!(
            "You've logged {visits} campus visit{}. Plan at least {REQUIRED_VISITS} visits to your priority schools.",
            if visits == 1 { "" } else { "s" }
        );
        Ok(Some(SuggestionDraft::new(urgency, ActionType::ScheduleVisit, message)))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        matches!(
            action,
            CompletedAction::InteractionLogged { interaction_type, .. }
                if is_visit_type(interaction_type.as_deref())
        )
    }
}

/// A coach showing high interest deserves a prompt reply.
pub struct CoachFollowUpRule;

impl Rule for CoachFollowUpRule {
    fn rule_type(&self) -> RuleType {
        RuleType::CoachFollowUp
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        if ctx.athlete.grade_level.is_none() {
            return Ok(None);
        }

        let waiting = ctx
            .schools
            .iter()
            .filter(|school| school.interest_level == Some(InterestLevel::High))
            .map(|school| (school, ctx.days_since_contact(school.id)))
            .filter(|(_, gap)| gap.map_or(true, |days| days > COACH_FOLLOW_UP_DAYS))
            .max_by_key(|(_, gap)| gap.unwrap_or(i64::MAX));
        let Some((school, _)) = waiting else {
            return Ok(None);
        };

        let message = format!(
            "The coaching staff at {} is highly interested. Reply within the week to keep the conversation going.",
            school.name
        );
        Ok(Some(
            SuggestionDraft::new(Urgency::High, ActionType::RespondToCoach, message)
                .for_school(school.id),
        ))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        logged_for_school(action, suggestion)
    }
}

pub struct HighlightVideoRule;

impl Rule for HighlightVideoRule {
    fn rule_type(&self) -> RuleType {
        RuleType::HighlightVideo
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = grade_at_least(ctx, GradeLevel::Sophomore) else {
            return Ok(None);
        };
        let urgency = if grade >= GradeLevel::Junior {
            Urgency::Medium
        } else {
            Urgency::Low
        };

        let newest = ctx.videos.iter().map(|video| video.uploaded_at).max();
        let message = match newest {
            None => "Upload a highlight video so coaches can evaluate you.".to_string(),
            Some(uploaded) if ctx.now - uploaded > Duration::days(VIDEO_STALE_DAYS) => {
                "Your highlight video is more than six months old. Add footage from this season."
                    .to_string()
            }
            Some(_) => return Ok(None),
        };
        Ok(Some(SuggestionDraft::new(urgency, ActionType::UploadVideo, message)))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        matches!(action, CompletedAction::VideoUploaded)
    }
}

pub struct EligibilityRegistrationRule;

impl Rule for EligibilityRegistrationRule {
    fn rule_type(&self) -> RuleType {
        RuleType::EligibilityRegistration
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = grade_at_least(ctx, GradeLevel::Sophomore) else {
            return Ok(None);
        };
        let status = ctx.athlete.eligibility_status;
        if status == Some(EligibilityStatus::Registered) {
            return Ok(None);
        }

        let pending = status == Some(EligibilityStatus::Pending);
        let urgency = match (grade >= GradeLevel::Junior, pending) {
            (false, _) => Urgency::Low,
            (true, true) => Urgency::Medium,
            (true, false) => Urgency::High,
        };
        let message = if pending {
            "Your eligibility center registration is pending. Send any missing transcripts to finish it."
        } else {
            "Register with the eligibility center. College coaches cannot make offers until you do."
        };
        Ok(Some(SuggestionDraft::new(
            urgency,
            ActionType::RegisterEligibility,
            message,
        )))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        ctx: &RuleContext,
    ) -> bool {
        matches!(action, CompletedAction::ProfileUpdated) && no_longer_applies(self, ctx)
    }
}

pub struct StandardizedTestRule;

impl Rule for StandardizedTestRule {
    fn rule_type(&self) -> RuleType {
        RuleType::StandardizedTest
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = grade_at_least(ctx, GradeLevel::Junior) else {
            return Ok(None);
        };
        if ctx.athlete.sat_score.is_some() || ctx.athlete.act_score.is_some() {
            return Ok(None);
        }

        let urgency = if grade >= GradeLevel::Senior {
            Urgency::High
        } else {
            Urgency::Medium
        };
        Ok(Some(SuggestionDraft::new(
            urgency,
            ActionType::TakeTest,
            "Add an SAT or ACT score to your profile. Many programs need one before they can evaluate you.",
        )))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        ctx: &RuleContext,
    ) -> bool {
        matches!(action, CompletedAction::ProfileUpdated) && no_longer_applies(self, ctx)
    }
}

pub struct BuildSchoolListRule;

impl Rule for BuildSchoolListRule {
    fn rule_type(&self) -> RuleType {
        RuleType::BuildSchoolList
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = ctx.athlete.grade_level else {
            return Ok(None);
        };
        let count = ctx.schools.len();
        if count >= MIN_TARGET_SCHOOLS {
            return Ok(None);
        }

        let urgency = if grade >= GradeLevel::Junior {
            Urgency::Medium
        } else {
            Urgency::Low
        };
        let message = format!(
            "You're tracking {count} of the recommended {MIN_TARGET_SCHOOLS} target schools. Add a few more across divisions."
        );
        Ok(Some(SuggestionDraft::new(urgency, ActionType::AddSchools, message)))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        ctx: &RuleContext,
    ) -> bool {
        matches!(action, CompletedAction::SchoolAdded) && no_longer_applies(self, ctx)
    }
}

/// Points at the first required checklist task that is unlocked and open.
pub struct NextRequiredTaskRule;

impl Rule for NextRequiredTaskRule {
    fn rule_type(&self) -> RuleType {
        RuleType::NextRequiredTask
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        let Some(grade) = ctx.athlete.grade_level else {
            return Ok(None);
        };
        let checklist = TaskChecklist::from_context(ctx);
        let divisions = ctx.target_divisions();
        let Some(task) = checklist
            .actionable_required(Some(grade), &divisions)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let urgency = if grade >= GradeLevel::Senior {
            Urgency::High
        } else {
            Urgency::Low
        };
        let message = format!("Next on your checklist: {}.", task.title);
        Ok(Some(
            SuggestionDraft::new(urgency, ActionType::CompleteTask, message).for_task(task.id),
        ))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        matches!(
            action,
            CompletedAction::TaskCompleted { task_id } if suggestion.related_task_id == Some(*task_id)
        )
    }
}

pub struct UpcomingEventRule;

impl Rule for UpcomingEventRule {
    fn rule_type(&self) -> RuleType {
        RuleType::UpcomingEvent
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        if grade_at_least(ctx, GradeLevel::Sophomore).is_none() {
            return Ok(None);
        }

        let window_end = ctx.now + Duration::days(EVENT_WINDOW_DAYS);
        let Some(event) = ctx
            .events
            .iter()
            .filter(|event| !event.registered)
            .filter(|event| event.event_date > ctx.now && event.event_date <= window_end)
            .min_by_key(|event| event.event_date)
        else {
            return Ok(None);
        };

        let days = (event.event_date - ctx.now).num_days();
        let message = match days {
            0 => format!("{} is tomorrow or sooner. Register so coaches know you'll be there.", event.name),
            _ => format!("{} is in {days} days. Register so coaches know you'll be there.", event.name),
        };
        Ok(Some(SuggestionDraft::new(
            Urgency::Medium,
            ActionType::RegisterEvent,
            message,
        )))
    }

    fn is_completed_by(
        &self,
        action: &CompletedAction,
        _suggestion: &Suggestion,
        _ctx: &RuleContext,
    ) -> bool {
        matches!(action, CompletedAction::EventRegistered { .. })
    }
}

/// Escalates when the composite status score drops to at-risk.
pub struct StatusCheckInRule;

impl Rule for StatusCheckInRule {
    fn rule_type(&self) -> RuleType {
        RuleType::StatusCheckIn
    }

    fn evaluate(&self, ctx: &RuleContext) -> Result<Option<SuggestionDraft>> {
        if ctx.athlete.grade_level.is_none() {
            return Ok(None);
        }
        let status = calculate_status(&StatusSignals::from_context(ctx));
        if status.label != StatusLabel::AtRisk {
            return Ok(None);
        }
        Ok(Some(SuggestionDraft::new(
            Urgency::High,
            ActionType::ReviewPlan,
            StatusLabel::AtRisk.advice(),
        )))
    }

    fn is_completed_by(
        &self,
        _action: &CompletedAction,
        _suggestion: &Suggestion,
        ctx: &RuleContext,
    ) -> bool {
        no_longer_applies(self, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::models::{
        Athlete, Interaction, InteractionDirection, PriorityTier, RecruitingEvent, TaskDefinition,
        Video,
    };

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn athlete(grade: Option<GradeLevel>) -> Athlete {
        Athlete {
            id: Uuid::new_v4(),
            full_name: "Avery Lee".to_string(),
            email: "avery.lee@example.com".to_string(),
            grade_level: grade,
            graduation_year: Some(2027),
            gpa: Some(3.4),
            sat_score: None,
            act_score: None,
            sport: Some("soccer".to_string()),
            position: Some("forward".to_string()),
            athletic_rating: Some(4),
            eligibility_status: None,
            preferred_region: None,
            committed: false,
        }
    }

    fn school(ctx: &RuleContext, name: &str, tier: Option<PriorityTier>) -> TargetSchool {
        TargetSchool {
            id: Uuid::new_v4(),
            athlete_id: ctx.athlete_id,
            name: name.to_string(),
            priority_tier: tier,
            division: None,
            conference: None,
            interest_level: None,
            average_gpa: None,
            roster_needs: Vec::new(),
            region: None,
            fit: None,
        }
    }

    fn interaction(ctx: &RuleContext, school_id: Option<Uuid>, kind: Option<&str>, days_ago: i64) -> Interaction {
        Interaction {
            id: Uuid::new_v4(),
            athlete_id: ctx.athlete_id,
            school_id,
            coach_name: None,
            interaction_type: kind.map(str::to_string),
            direction: InteractionDirection::Outbound,
            occurred_at: ctx.now - Duration::days(days_ago),
            notes: None,
        }
    }

    fn context(grade: Option<GradeLevel>) -> RuleContext {
        RuleContext::new(athlete(grade), now())
    }

    #[test]
    fn formal_outreach_urgency_follows_grade() {
        let mut junior = context(Some(GradeLevel::Junior));
        junior.schools.push(school(&junior, "Stanford", Some(PriorityTier::A)));
        let draft = FormalOutreachRule.evaluate(&junior).unwrap().expect("never contacted");
        assert_eq!(draft.urgency, Urgency::Medium);
        assert_eq!(draft.related_school_id, Some(junior.schools[0].id));

        let mut senior = context(Some(GradeLevel::Senior));
        senior.schools.push(school(&senior, "Stanford", Some(PriorityTier::A)));
        let draft = FormalOutreachRule.evaluate(&senior).unwrap().expect("never contacted");
        assert_eq!(draft.urgency, Urgency::High);
    }

    #[test]
    fn formal_outreach_fires_on_any_overdue_school_not_the_average() {
        let mut ctx = context(Some(GradeLevel::Junior));
        let fresh = school(&ctx, "Duke", Some(PriorityTier::A));
        let stale = school(&ctx, "Rice", Some(PriorityTier::B));
        // Average gap is 21 days, under the threshold; Rice alone is overdue.
        ctx.interactions.push(interaction(&ctx, Some(fresh.id), Some("email"), 1));
        ctx.interactions.push(interaction(&ctx, Some(stale.id), Some("email"), 41));
        ctx.schools.push(fresh);
        ctx.schools.push(stale.clone());

        let draft = FormalOutreachRule.evaluate(&ctx).unwrap().expect("Rice is overdue");
        assert_eq!(draft.related_school_id, Some(stale.id));
        assert!(draft.message.contains("41 days"));
    }

    #[test]
    fn formal_outreach_ignores_lower_grades_and_unprioritized_schools() {
        let mut sophomore = context(Some(GradeLevel::Sophomore));
        sophomore.schools.push(school(&sophomore, "Duke", Some(PriorityTier::A)));
        assert_eq!(FormalOutreachRule.evaluate(&sophomore).unwrap(), None);

        let mut junior = context(Some(GradeLevel::Junior));
        junior.schools.push(school(&junior, "Duke", Some(PriorityTier::C)));
        junior.schools.push(school(&junior, "Rice", None));
        assert_eq!(FormalOutreachRule.evaluate(&junior).unwrap(), None);

        let mut recent = context(Some(GradeLevel::Senior));
        let duke = school(&recent, "Duke", Some(PriorityTier::A));
        recent.interactions.push(interaction(&recent, Some(duke.id), Some("call"), 30));
        recent.schools.push(duke);
        assert_eq!(FormalOutreachRule.evaluate(&recent).unwrap(), None);
    }

    #[test]
    fn rules_without_grade_level_return_none() {
        let mut ctx = context(None);
        ctx.schools.push(school(&ctx, "Duke", Some(PriorityTier::A)));
        for rule in default_rules() {
            assert_eq!(rule.evaluate(&ctx).unwrap(), None, "{} fired", rule.rule_type());
        }
    }

    #[test]
    fn official_visit_counts_keywords_case_insensitively() {
        let mut ctx = context(Some(GradeLevel::Senior));
        ctx.schools.push(school(&ctx, "Duke", Some(PriorityTier::A)));
        ctx.interactions.push(interaction(&ctx, None, Some("Official Visit"), 10));
        ctx.interactions.push(interaction(&ctx, None, None, 5));
        ctx.interactions.push(interaction(&ctx, None, Some("email"), 3));

        let draft = OfficialVisitRule.evaluate(&ctx).unwrap().expect("only one visit");
        assert_eq!(draft.urgency, Urgency::High);
        assert!(draft.message.contains("1 campus visit."));

        ctx.interactions.push(interaction(&ctx, None, Some("CAMPUS TOUR"), 1));
        assert_eq!(OfficialVisitRule.evaluate(&ctx).unwrap(), None);
    }

    #[test]
    fn coach_follow_up_targets_interested_schools() {
        let mut ctx = context(Some(GradeLevel::Freshman));
        let mut interested = school(&ctx, "Wake Forest", None);
        interested.interest_level = Some(InterestLevel::High);
        ctx.interactions.push(interaction(&ctx, Some(interested.id), Some("call"), 20));
        ctx.schools.push(interested.clone());

        let draft = CoachFollowUpRule.evaluate(&ctx).unwrap().expect("20 days is too long");
        assert_eq!(draft.related_school_id, Some(interested.id));

        ctx.interactions.push(interaction(&ctx, Some(interested.id), Some("email"), 2));
        assert_eq!(CoachFollowUpRule.evaluate(&ctx).unwrap(), None);
    }

    #[test]
    fn highlight_video_flags_missing_or_stale_footage() {
        let mut ctx = context(Some(GradeLevel::Sophomore));
        let draft = HighlightVideoRule.evaluate(&ctx).unwrap().expect("no video");
        assert_eq!(draft.urgency, Urgency::Low);

        ctx.videos.push(Video {
            id: Uuid::new_v4(),
            athlete_id: ctx.athlete_id,
            title: "Fall highlights".to_string(),
            url: "https://video.example.com/1".to_string(),
            uploaded_at: ctx.now - Duration::days(200),
        });
        assert!(HighlightVideoRule.evaluate(&ctx).unwrap().is_some());

        ctx.videos[0].uploaded_at = ctx.now - Duration::days(20);
        assert_eq!(HighlightVideoRule.evaluate(&ctx).unwrap(), None);

        let freshman = context(Some(GradeLevel::Freshman));
        assert_eq!(HighlightVideoRule.evaluate(&freshman).unwrap(), None);
    }

    #[test]
    fn eligibility_urgency_depends_on_grade_and_progress() {
        let mut ctx = context(Some(GradeLevel::Junior));
        assert_eq!(
            EligibilityRegistrationRule.evaluate(&ctx).unwrap().map(|d| d.urgency),
            Some(Urgency::High)
        );
        ctx.athlete.eligibility_status = Some(EligibilityStatus::Pending);
        assert_eq!(
            EligibilityRegistrationRule.evaluate(&ctx).unwrap().map(|d| d.urgency),
            Some(Urgency::Medium)
        );
        ctx.athlete.eligibility_status = Some(EligibilityStatus::Registered);
        assert_eq!(EligibilityRegistrationRule.evaluate(&ctx).unwrap(), None);
    }

    #[test]
    fn next_required_task_respects_locks() {
        let mut ctx = context(Some(GradeLevel::Junior));
        let transcript = TaskDefinition {
            id: Uuid::new_v4(),
            title: "Request transcripts".to_string(),
            category: "academics".to_string(),
            required: true,
            divisions: Vec::new(),
            grade_levels: Vec::new(),
            dependency_task_ids: Vec::new(),
        };
        let amateurism = TaskDefinition {
            id: Uuid::new_v4(),
            title: "Answer amateurism questions".to_string(),
            category: "eligibility".to_string(),
            required: true,
            divisions: Vec::new(),
            grade_levels: Vec::new(),
            dependency_task_ids: vec![transcript.id],
        };
        ctx.tasks = vec![amateurism, transcript.clone()];

        let draft = NextRequiredTaskRule.evaluate(&ctx).unwrap().expect("transcripts are open");
        assert_eq!(draft.related_task_id, Some(transcript.id));
        assert_eq!(draft.message, "Next on your checklist: Request transcripts.");
    }

    #[test]
    fn upcoming_event_picks_soonest_unregistered() {
        let mut ctx = context(Some(GradeLevel::Junior));
        let event = |name: &str, days: i64, registered: bool| RecruitingEvent {
            id: Uuid::new_v4(),
            athlete_id: ctx.athlete_id,
            name: name.to_string(),
            location: None,
            event_date: ctx.now + Duration::days(days),
            registered,
        };
        let events = vec![
            event("Spring Showcase", 10, false),
            event("ID Camp", 3, true),
            event("Summer Camp", 40, false),
        ];
        ctx.events = events;

        let draft = UpcomingEventRule.evaluate(&ctx).unwrap().expect("showcase is soon");
        assert!(draft.message.starts_with("Spring Showcase is in 10 days"));
    }

    #[test]
    fn status_check_in_fires_only_when_at_risk() {
        let mut ctx = context(Some(GradeLevel::Junior));
        assert!(StatusCheckInRule.evaluate(&ctx).unwrap().is_some());

        ctx.athlete.gpa = Some(3.9);
        ctx.athlete.sat_score = Some(1450);
        ctx.athlete.eligibility_status = Some(EligibilityStatus::Registered);
        let mut duke = school(&ctx, "Duke", Some(PriorityTier::A));
        duke.interest_level = Some(InterestLevel::High);
        ctx.interactions.push(interaction(&ctx, Some(duke.id), Some("call"), 2));
        ctx.schools.push(duke);
        assert_eq!(StatusCheckInRule.evaluate(&ctx).unwrap(), None);
    }

    #[test]
    fn visit_keyword_matching() {
        assert!(is_visit_type(Some("Unofficial visit")));
        assert!(is_visit_type(Some("campus tour")));
        assert!(!is_visit_type(Some("phone call")));
        assert!(!is_visit_type(None));
    }
}
