use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::BatchSummary;
use crate::error::{AdvisorError, Result};
use crate::models::{Athlete, Division, TargetSchool};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitDimension {
    Athletic,
    Academic,
    Opportunity,
    Personal,
}

impl FitDimension {
    pub fn max_points(&self) -> f64 {
        match self {
            Self::Athletic => 40.0,
            Self::Academic => 25.0,
            Self::Opportunity => 20.0,
            Self::Personal => 15.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Athletic => "athletic",
            Self::Academic => "academic",
            Self::Opportunity => "opportunity",
            Self::Personal => "personal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitTier {
    Safety,
    Match,
    Reach,
    Unlikely,
}

impl FitTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Self::Safety,
            60..=79 => Self::Match,
            40..=59 => Self::Reach,
            _ => Self::Unlikely,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Match => "match",
            Self::Reach => "reach",
            Self::Unlikely => "unlikely",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "safety" => Some(Self::Safety),
            "match" => Some(Self::Match),
            "reach" => Some(Self::Reach),
            "unlikely" => Some(Self::Unlikely),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitBreakdown {
    pub athletic: f64,
    pub academic: f64,
    pub opportunity: f64,
    pub personal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitScoreResult {
    pub score: u8,
    pub tier: FitTier,
    pub breakdown: FitBreakdown,
    pub missing_dimensions: Vec<FitDimension>,
}

/// Scores one dimension each. `Ok(None)` means the inputs were not
/// available; `Err` fails the whole school.
pub trait FitDimensions: Send + Sync {
    fn athletic(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>>;
    fn academic(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>>;
    fn opportunity(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>>;
    fn personal(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>>;
}

pub fn combine_fit(
    athletic: Option<f64>,
    academic: Option<f64>,
    opportunity: Option<f64>,
    personal: Option<f64>,
) -> FitScoreResult {
    let mut missing_dimensions = Vec::new();
    let mut bounded = |dimension: FitDimension, value: Option<f64>| match value {
        Some(value) if !value.is_nan() => value.clamp(0.0, dimension.max_points()),
        _ => {
            missing_dimensions.push(dimension);
            0.0
        }
    };

    let breakdown = FitBreakdown {
        athletic: bounded(FitDimension::Athletic, athletic),
        academic: bounded(FitDimension::Academic, academic),
        opportunity: bounded(FitDimension::Opportunity, opportunity),
        personal: bounded(FitDimension::Personal, personal),
    };
    let total = breakdown.athletic + breakdown.academic + breakdown.opportunity + breakdown.personal;
    let score = total.round().clamp(0.0, 100.0) as u8;

    FitScoreResult {
        score,
        tier: FitTier::from_score(score),
        breakdown,
        missing_dimensions,
    }
}

pub fn score_school(
    dimensions: &dyn FitDimensions,
    athlete: &Athlete,
    school: &TargetSchool,
) -> Result<FitScoreResult> {
    Ok(combine_fit(
        dimensions.athletic(athlete, school)?,
        dimensions.academic(athlete, school)?,
        dimensions.opportunity(athlete, school)?,
        dimensions.personal(athlete, school)?,
    ))
}

/// Rescore every target school independently and persist each result.
pub async fn recompute_all(
    store: &dyn Store,
    dimensions: &dyn FitDimensions,
    athlete_id: Uuid,
) -> Result<BatchSummary> {
    let athlete = store
        .athlete(athlete_id)
        .await?
        .ok_or_else(|| AdvisorError::not_found("athlete", athlete_id))?;
    let schools = store.schools(athlete_id).await?;
    let mut summary = BatchSummary::default();

    for school in schools {
        let outcome = match score_school(dimensions, &athlete, &school) {
            Ok(fit) => store.save_fit_score(school.id, &fit).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &outcome {
            warn!(school_id = %school.id, school = %school.name, error = %err, "fit score failed");
        }
        summary.record(school.id, &outcome);
    }

    info!(
        athlete_id = %athlete_id,
        updated = summary.updated,
        failed = summary.failed,
        "fit scores recomputed"
    );
    Ok(summary)
}

/// Scores dimensions from the athlete profile and the school record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileDimensions;

impl ProfileDimensions {
    fn expected_rating(division: Division) -> i32 {
        match division {
            Division::D1 => 5,
            Division::D2 => 4,
            Division::D3 => 3,
        }
    }
}

impl FitDimensions for ProfileDimensions {
    fn athletic(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>> {
        let (Some(rating), Some(division)) = (athlete.athletic_rating, school.division) else {
            return Ok(None);
        };
        if !(1..=5).contains(&rating) {
            return Err(AdvisorError::Dimension {
                dimension: FitDimension::Athletic.as_str(),
                reason: format!("athletic rating {rating} is outside 1-5"),
            });
        }
        let points = match rating - Self::expected_rating(division) {
            0..=i32::MAX => 40.0,
            -1 => 25.0,
            -2 => 12.0,
            _ => 0.0,
        };
        Ok(Some(points))
    }

    fn academic(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>> {
        let (Some(gpa), Some(average)) = (athlete.gpa, school.average_gpa) else {
            return Ok(None);
        };
        let gap = gpa - average;
        let points = if gap >= 0.3 {
            25.0
        } else if gap >= 0.0 {
            20.0
        } else if gap >= -0.3 {
            12.0
        } else if gap >= -0.6 {
            6.0
        } else {
            0.0
        };
        Ok(Some(points))
    }

    fn opportunity(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>> {
        let Some(position) = athlete.position.as_deref() else {
            return Ok(None);
        };
        if school.roster_needs.is_empty() {
            return Ok(None);
        }
        let needed = school
            .roster_needs
            .iter()
            .any(|need| need.eq_ignore_ascii_case(position));
        Ok(Some(if needed { 20.0 } else { 5.0 }))
    }

    fn personal(&self, athlete: &Athlete, school: &TargetSchool) -> Result<Option<f64>> {
        let (Some(preferred), Some(region)) = (&athlete.preferred_region, &school.region) else {
            return Ok(None);
        };
        Ok(Some(if preferred.eq_ignore_ascii_case(region) { 15.0 } else { 5.0 }))
    }
}
