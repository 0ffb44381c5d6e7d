use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fit::FitScoreResult;

/// Declares a closed string-backed enum stored as text in Postgres.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Ordered so that rules can gate on "junior or later".
    #[derive(PartialOrd, Ord)]
    pub enum GradeLevel {
        Freshman => "freshman",
        Sophomore => "sophomore",
        Junior => "junior",
        Senior => "senior",
    }
}

text_enum! {
    pub enum EligibilityStatus {
        NotStarted => "not_started",
        Pending => "pending",
        Registered => "registered",
    }
}

text_enum! {
    pub enum PriorityTier {
        A => "a",
        B => "b",
        C => "c",
    }
}

text_enum! {
    pub enum Division {
        D1 => "d1",
        D2 => "d2",
        D3 => "d3",
    }
}

text_enum! {
    pub enum InterestLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

text_enum! {
    pub enum InteractionDirection {
        Outbound => "outbound",
        Inbound => "inbound",
    }
}

text_enum! {
    pub enum TaskStatus {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        Skipped => "skipped",
    }
}

text_enum! {
    #[derive(PartialOrd, Ord)]
    pub enum Urgency {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

text_enum! {
    pub enum RuleType {
        FormalOutreach => "formal_outreach",
        OfficialVisit => "official_visit",
        CoachFollowUp => "coach_follow_up",
        HighlightVideo => "highlight_video",
        EligibilityRegistration => "eligibility_registration",
        StandardizedTest => "standardized_test",
        BuildSchoolList => "build_school_list",
        NextRequiredTask => "next_required_task",
        UpcomingEvent => "upcoming_event",
        StatusCheckIn => "status_check_in",
    }
}

text_enum! {
    pub enum ActionType {
        LogInteraction => "log_interaction",
        ScheduleVisit => "schedule_visit",
        RespondToCoach => "respond_to_coach",
        UploadVideo => "upload_video",
        RegisterEligibility => "register_eligibility",
        TakeTest => "take_test",
        AddSchools => "add_schools",
        CompleteTask => "complete_task",
        RegisterEvent => "register_event",
        ReviewPlan => "review_plan",
    }
}

text_enum! {
    pub enum RecruitingPhase {
        Freshman => "freshman",
        Sophomore => "sophomore",
        Junior => "junior",
        Senior => "senior",
        Committed => "committed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub grade_level: Option<GradeLevel>,
    pub graduation_year: Option<i32>,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub sport: Option<String>,
    pub position: Option<String>,
    /// Coach-assessed athletic level on a 1-5 scale.
    pub athletic_rating: Option<i32>,
    pub eligibility_status: Option<EligibilityStatus>,
    pub preferred_region: Option<String>,
    pub committed: bool,
}

impl Athlete {
    pub fn phase(&self) -> Option<RecruitingPhase> {
        if self.committed {
            return Some(RecruitingPhase::Committed);
        }
        self.grade_level.map(|grade| match grade {
            GradeLevel::Freshman => RecruitingPhase::Freshman,
            GradeLevel::Sophomore => RecruitingPhase::Sophomore,
            GradeLevel::Junior => RecruitingPhase::Junior,
            GradeLevel::Senior => RecruitingPhase::Senior,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub required: bool,
    /// Empty means every division.
    pub divisions: Vec<Division>,
    /// Empty means every grade level.
    pub grade_levels: Vec<GradeLevel>,
    pub dependency_task_ids: Vec<Uuid>,
}

impl TaskDefinition {
    pub fn applies_to(&self, grade: Option<GradeLevel>, divisions: &[Division]) -> bool {
        let grade_ok = self.grade_levels.is_empty()
            || grade.is_some_and(|grade| self.grade_levels.contains(&grade));
        let division_ok = self.divisions.is_empty()
            || divisions.is_empty()
            || divisions.iter().any(|division| self.divisions.contains(division));
        grade_ok && division_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteTaskStatus {
    pub athlete_id: Uuid,
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSchool {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub name: String,
    pub priority_tier: Option<PriorityTier>,
    pub division: Option<Division>,
    pub conference: Option<String>,
    pub interest_level: Option<InterestLevel>,
    pub average_gpa: Option<f64>,
    pub roster_needs: Vec<String>,
    pub region: Option<String>,
    pub fit: Option<FitScoreResult>,
}

impl TargetSchool {
    pub fn is_priority(&self) -> bool {
        matches!(self.priority_tier, Some(PriorityTier::A | PriorityTier::B))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub school_id: Option<Uuid>,
    pub coach_name: Option<String>,
    pub interaction_type: Option<String>,
    pub direction: InteractionDirection,
    pub occurred_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub title: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecruitingEvent {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub event_date: DateTime<Utc>,
    pub registered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub rule_type: RuleType,
    pub urgency: Urgency,
    pub message: String,
    pub action_type: ActionType,
    pub related_school_id: Option<Uuid>,
    pub related_task_id: Option<Uuid>,
    pub dismissed: bool,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub pending_surface: bool,
    pub surfaced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn is_resolved(&self) -> bool {
        self.dismissed || self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_parse_case_insensitively() {
        assert_eq!(TaskStatus::parse("In_Progress"), Some(TaskStatus::InProgress));
        assert_eq!(PriorityTier::parse("A"), Some(PriorityTier::A));
        assert_eq!(Division::parse(" d2 "), Some(Division::D2));
        assert_eq!(GradeLevel::parse("graduate"), None);
    }

    #[test]
    fn grade_levels_are_ordered() {
        assert!(GradeLevel::Junior > GradeLevel::Sophomore);
        assert!(GradeLevel::Senior >= GradeLevel::Junior);
        assert!(Urgency::High > Urgency::Medium);
    }

    #[test]
    fn task_applicability_respects_grade_and_division() {
        let task = TaskDefinition {
            id: Uuid::new_v4(),
            title: "Register with eligibility center".to_string(),
            category: "eligibility".to_string(),
            required: true,
            divisions: vec![Division::D1, Division::D2],
            grade_levels: vec![GradeLevel::Junior, GradeLevel::Senior],
            dependency_task_ids: Vec::new(),
        };

        assert!(task.applies_to(Some(GradeLevel::Junior), &[Division::D1]));
        assert!(!task.applies_to(Some(GradeLevel::Freshman), &[Division::D1]));
        assert!(!task.applies_to(Some(GradeLevel::Senior), &[Division::D3]));
        assert!(!task.applies_to(None, &[]));
    }
}
