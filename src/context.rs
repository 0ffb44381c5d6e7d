use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::models::{
    Athlete, AthleteTaskStatus, Division, Interaction, RecruitingEvent, TargetSchool,
    TaskDefinition, Video,
};
use crate::store::Store;

/// Read-only snapshot every rule is evaluated against.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub athlete_id: Uuid,
    pub athlete: Athlete,
    pub schools: Vec<TargetSchool>,
    pub interactions: Vec<Interaction>,
    pub tasks: Vec<TaskDefinition>,
    pub athlete_tasks: Vec<AthleteTaskStatus>,
    pub videos: Vec<Video>,
    pub events: Vec<RecruitingEvent>,
    pub now: DateTime<Utc>,
}

impl RuleContext {
    pub fn new(athlete: Athlete, now: DateTime<Utc>) -> Self {
        Self {
            athlete_id: athlete.id,
            athlete,
            schools: Vec::new(),
            interactions: Vec::new(),
            tasks: Vec::new(),
            athlete_tasks: Vec::new(),
            videos: Vec::new(),
            events: Vec::new(),
            now,
        }
    }

    /// Fails only when the athlete profile itself is missing.
    pub async fn load(store: &dyn Store, athlete_id: Uuid, now: DateTime<Utc>) -> Result<Self> {
        let athlete = store
            .athlete(athlete_id)
            .await?
            .ok_or_else(|| AdvisorError::not_found("athlete", athlete_id))?;

        Ok(Self {
            athlete_id,
            athlete,
            schools: store.schools(athlete_id).await?,
            interactions: store.interactions(athlete_id).await?,
            tasks: store.task_definitions().await?,
            athlete_tasks: store.athlete_tasks(athlete_id).await?,
            videos: store.videos(athlete_id).await?,
            events: store.events(athlete_id).await?,
            now,
        })
    }

    pub fn priority_schools(&self) -> Vec<&TargetSchool> {
        self.schools.iter().filter(|school| school.is_priority()).collect()
    }

    pub fn target_divisions(&self) -> Vec<Division> {
        self.schools.iter().filter_map(|school| school.division).collect()
    }

    /// `None` when the school has never been contacted.
    pub fn days_since_contact(&self, school_id: Uuid) -> Option<i64> {
        self.interactions
            .iter()
            .filter(|interaction| interaction.school_id == Some(school_id))
            .map(|interaction| interaction.occurred_at)
            .max()
            .map(|latest| (self.now - latest).num_days())
    }
}
