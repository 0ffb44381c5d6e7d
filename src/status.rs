use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RuleContext;
use crate::models::{
    Division, EligibilityStatus, InterestLevel, RecruitingPhase, TaskStatus,
};

pub const ON_TRACK_THRESHOLD: u8 = 75;
pub const SLIGHTLY_BEHIND_THRESHOLD: u8 = 50;

const PRIORITY_INTEREST_BONUS: f64 = 5.0;
const MAX_PRIORITY_INTEREST_BONUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusWeights {
    pub task_completion: f64,
    pub interaction_frequency: f64,
    pub coach_interest: f64,
    pub academic_standing: f64,
}

impl Default for StatusWeights {
    fn default() -> Self {
        Self {
            task_completion: 0.35,
            interaction_frequency: 0.25,
            coach_interest: 0.25,
            academic_standing: 0.15,
        }
    }
}

/// Sub-scores feeding the composite. Absent values count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusScoreInputs {
    pub task_completion_rate: Option<f64>,
    pub interaction_frequency: Option<f64>,
    pub coach_interest: Option<f64>,
    pub academic_standing: Option<f64>,
}

/// Raw, pre-aggregated activity signals for one athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSignals {
    pub required_tasks: usize,
    pub required_tasks_completed: usize,
    pub days_since_last_interaction: Option<i64>,
    pub has_target_schools: bool,
    pub interest_levels: Vec<InterestLevel>,
    pub priority_schools_with_interest: usize,
    pub gpa: Option<f64>,
    pub sat_score: Option<i32>,
    pub act_score: Option<i32>,
    pub eligibility_status: Option<EligibilityStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    OnTrack,
    SlightlyBehind,
    AtRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub task_completion: WeightedScore,
    pub interaction_frequency: WeightedScore,
    pub coach_interest: WeightedScore,
    pub academic_standing: WeightedScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusScoreResult {
    pub score: u8,
    pub label: StatusLabel,
    pub color: &'static str,
    pub breakdown: StatusBreakdown,
}

impl StatusLabel {
    pub fn from_score(score: u8) -> Self {
        if score >= ON_TRACK_THRESHOLD {
            Self::OnTrack
        } else if score >= SLIGHTLY_BEHIND_THRESHOLD {
            Self::SlightlyBehind
        } else {
            Self::AtRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::SlightlyBehind => "slightly_behind",
            Self::AtRisk => "at_risk",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::OnTrack => "green",
            Self::SlightlyBehind => "yellow",
            Self::AtRisk => "red",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::OnTrack => {
                "You're on track. Keep up the steady contact with coaches and stay ahead of your checklist."
            }
            Self::SlightlyBehind => {
                "You're slightly behind. Pick one or two actions this week to close the gap."
            }
            Self::AtRisk => {
                "Your recruiting is at risk. Focus on reaching out to coaches and finishing required tasks now."
            }
        }
    }

    pub fn next_actions(&self, phase: RecruitingPhase) -> &'static [&'static str] {
        use RecruitingPhase::*;
        match (self, phase) {
            (Self::OnTrack, Freshman) => &[
                "Keep your grades strong",
                "Attend a summer camp to get early exposure",
            ],
            (Self::OnTrack, Sophomore) => &[
                "Update your highlight video",
                "Start a short list of target schools",
            ],
            (Self::OnTrack, Junior) => &[
                "Schedule unofficial visits at your top schools",
                "Keep coaches updated on your season",
            ],
            (Self::OnTrack, Senior) => &[
                "Plan official visits",
                "Compare offers and financial aid packages",
            ],
            (_, Committed) => &[
                "Complete your admissions paperwork",
                "Stay in touch with your future coaching staff",
            ],
            (Self::SlightlyBehind, Freshman) => &[
                "Research college divisions and what they require",
                "Create your athlete profile",
            ],
            (Self::SlightlyBehind, Sophomore) => &[
                "Register with the eligibility center",
                "Record a first highlight video",
            ],
            (Self::SlightlyBehind, Junior) => &[
                "Email coaches at every priority school",
                "Register for the SAT or ACT",
            ],
            (Self::SlightlyBehind, Senior) => &[
                "Follow up with every coach who has shown interest",
                "Finalize your eligibility registration",
            ],
            (Self::AtRisk, Freshman) => &[
                "Meet with your counselor about core courses",
                "Talk to your coach about your recruiting goals",
            ],
            (Self::AtRisk, Sophomore) => &[
                "Build a list of at least five target schools",
                "Ask your coach to help you contact college programs",
            ],
            (Self::AtRisk, Junior) => &[
                "Contact coaches at your priority schools this week",
                "Complete your required checklist tasks",
                "Send your highlight video to coaches",
            ],
            (Self::AtRisk, Senior) => &[
                "Call coaches at schools still recruiting your position",
                "Widen your list to include more division options",
                "Complete eligibility registration immediately",
            ],
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn calculate_composite_score(inputs: &StatusScoreInputs) -> StatusScoreResult {
    calculate_composite_score_with(inputs, &StatusWeights::default())
}

pub fn calculate_composite_score_with(
    inputs: &StatusScoreInputs,
    weights: &StatusWeights,
) -> StatusScoreResult {
    let breakdown = StatusBreakdown {
        task_completion: weigh(inputs.task_completion_rate, weights.task_completion),
        interaction_frequency: weigh(inputs.interaction_frequency, weights.interaction_frequency),
        coach_interest: weigh(inputs.coach_interest, weights.coach_interest),
        academic_standing: weigh(inputs.academic_standing, weights.academic_standing),
    };

    let total = breakdown.task_completion.weighted
        + breakdown.interaction_frequency.weighted
        + breakdown.coach_interest.weighted
        + breakdown.academic_standing.weighted;
    let score = clamp_score(total.round()) as u8;
    let label = StatusLabel::from_score(score);

    StatusScoreResult {
        score,
        label,
        color: label.color(),
        breakdown,
    }
}

pub fn calculate_status(signals: &StatusSignals) -> StatusScoreResult {
    calculate_composite_score(&signals.to_inputs())
}

impl StatusSignals {
    pub fn to_inputs(&self) -> StatusScoreInputs {
        StatusScoreInputs {
            task_completion_rate: Some(task_completion_rate(
                self.required_tasks,
                self.required_tasks_completed,
            )),
            interaction_frequency: Some(if self.has_target_schools {
                self.days_since_last_interaction
                    .map(interaction_frequency_score)
                    .unwrap_or(0.0)
            } else {
                0.0
            }),
            coach_interest: Some(coach_interest_score(
                &self.interest_levels,
                self.priority_schools_with_interest,
            )),
            academic_standing: Some(academic_standing_score(
                self.gpa,
                self.sat_score,
                self.act_score,
                self.eligibility_status,
            )),
        }
    }

    pub fn from_context(ctx: &RuleContext) -> Self {
        let divisions: Vec<Division> = ctx.schools.iter().filter_map(|s| s.division).collect();
        let required: HashSet<Uuid> = ctx
            .tasks
            .iter()
            .filter(|task| task.required && task.applies_to(ctx.athlete.grade_level, &divisions))
            .map(|task| task.id)
            .collect();
        let completed = ctx
            .athlete_tasks
            .iter()
            .filter(|row| row.status == TaskStatus::Completed && required.contains(&row.task_id))
            .count();

        let days_since_last_interaction = ctx
            .interactions
            .iter()
            .map(|interaction| interaction.occurred_at)
            .max()
            .map(|latest| (ctx.now - latest).num_days());

        Self {
            required_tasks: required.len(),
            required_tasks_completed: completed,
            days_since_last_interaction,
            has_target_schools: !ctx.schools.is_empty(),
            interest_levels: ctx.schools.iter().filter_map(|s| s.interest_level).collect(),
            priority_schools_with_interest: ctx
                .schools
                .iter()
                .filter(|s| s.is_priority() && s.interest_level.is_some())
                .count(),
            gpa: ctx.athlete.gpa,
            sat_score: ctx.athlete.sat_score,
            act_score: ctx.athlete.act_score,
            eligibility_status: ctx.athlete.eligibility_status,
        }
    }
}

pub fn task_completion_rate(required: usize, completed: usize) -> f64 {
    if required == 0 {
        return 0.0;
    }
    (completed.min(required) as f64 / required as f64) * 100.0
}

pub fn interaction_frequency_score(days_since: i64) -> f64 {
    match days_since {
        i64::MIN..=7 => 100.0,
        8..=14 => 80.0,
        15..=21 => 60.0,
        22..=30 => 40.0,
        _ => 0.0,
    }
}

pub fn interest_value(level: InterestLevel) -> f64 {
    match level {
        InterestLevel::High => 100.0,
        InterestLevel::Medium => 60.0,
        InterestLevel::Low => 20.0,
    }
}

pub fn coach_interest_score(levels: &[InterestLevel], priority_with_interest: usize) -> f64 {
    if levels.is_empty() {
        return 0.0;
    }
    let average = levels.iter().copied().map(interest_value).sum::<f64>() / levels.len() as f64;
    let bonus = (priority_with_interest as f64 * PRIORITY_INTEREST_BONUS).min(MAX_PRIORITY_INTEREST_BONUS);
    clamp_score(average + bonus)
}

pub fn academic_standing_score(
    gpa: Option<f64>,
    sat: Option<i32>,
    act: Option<i32>,
    eligibility: Option<EligibilityStatus>,
) -> f64 {
    let gpa_points = match gpa {
        Some(gpa) if gpa >= 3.5 => 40.0,
        Some(gpa) if gpa >= 3.0 => 30.0,
        Some(gpa) if gpa >= 2.5 => 20.0,
        Some(gpa) if gpa >= 2.0 => 10.0,
        _ => 0.0,
    };
    let test_points = test_score_points(sat, act);
    let eligibility_points = match eligibility {
        Some(EligibilityStatus::Registered) => 30.0,
        Some(EligibilityStatus::Pending) => 15.0,
        Some(EligibilityStatus::NotStarted) | None => 0.0,
    };
    clamp_score(gpa_points + test_points + eligibility_points)
}

/// SAT bands are checked before ACT within each tier.
fn test_score_points(sat: Option<i32>, act: Option<i32>) -> f64 {
    let sat = sat.unwrap_or(0);
    let act = act.unwrap_or(0);
    if sat >= 1200 || act >= 28 {
        30.0
    } else if sat >= 1000 || act >= 24 {
        20.0
    } else if sat >= 900 || act >= 20 {
        10.0
    } else {
        0.0
    }
}

fn weigh(raw: Option<f64>, weight: f64) -> WeightedScore {
    let raw = clamp_score(raw.unwrap_or(0.0));
    WeightedScore {
        raw,
        weight,
        weighted: raw * weight,
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(task: f64, freq: f64, interest: f64, academic: f64) -> StatusScoreInputs {
        StatusScoreInputs {
            task_completion_rate: Some(task),
            interaction_frequency: Some(freq),
            coach_interest: Some(interest),
            academic_standing: Some(academic),
        }
    }

    #[test]
    fn empty_inputs_score_zero() {
        let result = calculate_composite_score(&StatusScoreInputs::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.label, StatusLabel::AtRisk);
        assert_eq!(result.color, "red");
    }

    #[test]
    fn label_boundaries() {
        assert_eq!(StatusLabel::from_score(75), StatusLabel::OnTrack);
        assert_eq!(StatusLabel::from_score(74), StatusLabel::SlightlyBehind);
        assert_eq!(StatusLabel::from_score(50), StatusLabel::SlightlyBehind);
        assert_eq!(StatusLabel::from_score(49), StatusLabel::AtRisk);
    }

    #[test]
    fn out_of_range_sub_scores_are_clamped() {
        let result = calculate_composite_score(&inputs(250.0, -40.0, 100.0, 100.0));
        assert_eq!(result.breakdown.task_completion.raw, 100.0);
        assert_eq!(result.breakdown.interaction_frequency.raw, 0.0);
        assert_eq!(result.score, 75);
    }

    #[test]
    fn interaction_frequency_steps() {
        assert_eq!(interaction_frequency_score(0), 100.0);
        assert_eq!(interaction_frequency_score(7), 100.0);
        assert_eq!(interaction_frequency_score(8), 80.0);
        assert_eq!(interaction_frequency_score(14), 80.0);
        assert_eq!(interaction_frequency_score(21), 60.0);
        assert_eq!(interaction_frequency_score(30), 40.0);
        assert_eq!(interaction_frequency_score(31), 0.0);
    }

    #[test]
    fn no_target_schools_zeroes_interaction_frequency() {
        let signals = StatusSignals {
            days_since_last_interaction: Some(2),
            has_target_schools: false,
            ..StatusSignals::default()
        };
        assert_eq!(signals.to_inputs().interaction_frequency, Some(0.0));
    }

    #[test]
    fn coach_interest_averages_with_capped_bonus() {
        assert_eq!(coach_interest_score(&[], 3), 0.0);
        let levels = [InterestLevel::Medium, InterestLevel::Low];
        assert_eq!(coach_interest_score(&levels, 0), 40.0);
        assert_eq!(coach_interest_score(&levels, 1), 45.0);
        assert_eq!(coach_interest_score(&levels, 4), 50.0);
        assert_eq!(coach_interest_score(&[InterestLevel::High], 2), 100.0);
    }

    #[test]
    fn academic_standing_bands() {
        assert_eq!(
            academic_standing_score(Some(3.8), Some(1400), None, Some(EligibilityStatus::Registered)),
            100.0
        );
        assert_eq!(
            academic_standing_score(Some(3.1), None, Some(25), Some(EligibilityStatus::Pending)),
            65.0
        );
        assert_eq!(academic_standing_score(Some(1.9), Some(850), Some(19), None), 0.0);
        // SAT 950 only reaches the third band but ACT 29 reaches the first.
        assert_eq!(academic_standing_score(None, Some(950), Some(29), None), 30.0);
    }

    #[test]
    fn task_completion_rate_handles_zero_required() {
        assert_eq!(task_completion_rate(0, 0), 0.0);
        assert_eq!(task_completion_rate(10, 9), 90.0);
    }

    #[test]
    fn strong_athlete_is_on_track() {
        let signals = StatusSignals {
            required_tasks: 10,
            required_tasks_completed: 9,
            days_since_last_interaction: Some(3),
            has_target_schools: true,
            interest_levels: vec![InterestLevel::High],
            priority_schools_with_interest: 0,
            gpa: Some(3.8),
            sat_score: Some(1400),
            act_score: None,
            eligibility_status: Some(EligibilityStatus::Registered),
        };

        let result = calculate_status(&signals);
        assert!(result.score >= 90, "score was {}", result.score);
        assert_eq!(result.label, StatusLabel::OnTrack);
        assert_eq!(result.label.as_str(), "on_track");
    }

    #[test]
    fn every_label_has_actions_for_every_phase() {
        for label in [StatusLabel::OnTrack, StatusLabel::SlightlyBehind, StatusLabel::AtRisk] {
            assert!(!label.advice().is_empty());
            for phase in RecruitingPhase::ALL {
                assert!(!label.next_actions(*phase).is_empty());
            }
        }
    }

    proptest! {
        #[test]
        fn score_stays_in_bounds(
            task in -500.0f64..500.0,
            freq in -500.0f64..500.0,
            interest in -500.0f64..500.0,
            academic in -500.0f64..500.0,
        ) {
            let result = calculate_composite_score(&inputs(task, freq, interest, academic));
            prop_assert!(result.score <= 100);
        }

        #[test]
        fn score_is_monotonic_in_each_sub_score(
            base in prop::array::uniform4(0.0f64..100.0),
            bump in 0.0f64..100.0,
            index in 0usize..4,
            weights in prop::array::uniform4(0.0f64..1.0),
        ) {
            let weights = StatusWeights {
                task_completion: weights[0],
                interaction_frequency: weights[1],
                coach_interest: weights[2],
                academic_standing: weights[3],
            };
            let mut raised = base;
            raised[index] += bump;

            let before = calculate_composite_score_with(&inputs(base[0], base[1], base[2], base[3]), &weights);
            let after = calculate_composite_score_with(&inputs(raised[0], raised[1], raised[2], raised[3]), &weights);
            prop_assert!(after.score >= before.score);
        }
    }
}
