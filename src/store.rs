use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::fit::FitScoreResult;
use crate::models::{
    Athlete, AthleteTaskStatus, Interaction, RecruitingEvent, Suggestion, TargetSchool,
    TaskDefinition, Video,
};

/// Persistence collaborator. Every write is independent; only
/// `upsert_suggestions` must apply its whole batch at once.
#[async_trait]
pub trait Store: Send + Sync {
    async fn athlete(&self, athlete_id: Uuid) -> Result<Option<Athlete>>;
    async fn athlete_ids(&self) -> Result<Vec<Uuid>>;
    async fn save_athlete(&self, athlete: &Athlete) -> Result<()>;

    async fn schools(&self, athlete_id: Uuid) -> Result<Vec<TargetSchool>>;
    async fn save_school(&self, school: &TargetSchool) -> Result<()>;
    async fn save_fit_score(&self, school_id: Uuid, fit: &FitScoreResult) -> Result<()>;

    async fn interactions(&self, athlete_id: Uuid) -> Result<Vec<Interaction>>;
    async fn insert_interaction(&self, interaction: &Interaction) -> Result<()>;

    async fn task_definitions(&self) -> Result<Vec<TaskDefinition>>;
    async fn athlete_tasks(&self, athlete_id: Uuid) -> Result<Vec<AthleteTaskStatus>>;
    async fn upsert_task_status(&self, status: &AthleteTaskStatus) -> Result<()>;

    async fn videos(&self, athlete_id: Uuid) -> Result<Vec<Video>>;
    async fn events(&self, athlete_id: Uuid) -> Result<Vec<RecruitingEvent>>;

    async fn suggestions(&self, athlete_id: Uuid) -> Result<Vec<Suggestion>>;
    async fn upsert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    athletes: HashMap<Uuid, Athlete>,
    schools: Vec<TargetSchool>,
    interactions: Vec<Interaction>,
    tasks: Vec<TaskDefinition>,
    task_statuses: HashMap<(Uuid, Uuid), AthleteTaskStatus>,
    videos: Vec<Video>,
    events: Vec<RecruitingEvent>,
    suggestions: Vec<Suggestion>,
    unavailable: HashSet<Uuid>,
}

/// In-process store used by tests and local demos.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_athlete(&self, athlete: Athlete) {
        self.lock().athletes.insert(athlete.id, athlete);
    }

    pub fn add_school(&self, school: TargetSchool) {
        self.lock().schools.push(school);
    }

    pub fn add_interaction(&self, interaction: Interaction) {
        self.lock().interactions.push(interaction);
    }

    pub fn add_task(&self, task: TaskDefinition) {
        self.lock().tasks.push(task);
    }

    pub fn add_video(&self, video: Video) {
        self.lock().videos.push(video);
    }

    pub fn add_event(&self, event: RecruitingEvent) {
        self.lock().events.push(event);
    }

    /// Simulates a storage outage for one athlete: every read keyed by
    /// that athlete fails until the store is dropped.
    #[cfg(test)]
    pub fn mark_unavailable(&self, athlete_id: Uuid) {
        self.lock().unavailable.insert(athlete_id);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(state: &MemoryState, athlete_id: Uuid) -> Result<()> {
        if state.unavailable.contains(&athlete_id) {
            return Err(AdvisorError::Validation(format!(
                "storage unavailable for athlete {athlete_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn athlete(&self, athlete_id: Uuid) -> Result<Option<Athlete>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state.athletes.get(&athlete_id).cloned())
    }

    async fn athlete_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.lock().athletes.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn save_athlete(&self, athlete: &Athlete) -> Result<()> {
        self.lock().athletes.insert(athlete.id, athlete.clone());
        Ok(())
    }

    async fn schools(&self, athlete_id: Uuid) -> Result<Vec<TargetSchool>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .schools
            .iter()
            .filter(|school| school.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn save_school(&self, school: &TargetSchool) -> Result<()> {
        let mut state = self.lock();
        match state.schools.iter_mut().find(|existing| existing.id == school.id) {
            Some(existing) => *existing = school.clone(),
            None => state.schools.push(school.clone()),
        }
        Ok(())
    }

    async fn save_fit_score(&self, school_id: Uuid, fit: &FitScoreResult) -> Result<()> {
        let mut state = self.lock();
        let school = state
            .schools
            .iter_mut()
            .find(|school| school.id == school_id)
            .ok_or_else(|| AdvisorError::not_found("school", school_id))?;
        school.fit = Some(fit.clone());
        Ok(())
    }

    async fn interactions(&self, athlete_id: Uuid) -> Result<Vec<Interaction>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .interactions
            .iter()
            .filter(|interaction| interaction.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn insert_interaction(&self, interaction: &Interaction) -> Result<()> {
        self.lock().interactions.push(interaction.clone());
        Ok(())
    }

    async fn task_definitions(&self) -> Result<Vec<TaskDefinition>> {
        Ok(self.lock().tasks.clone())
    }

    async fn athlete_tasks(&self, athlete_id: Uuid) -> Result<Vec<AthleteTaskStatus>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .task_statuses
            .values()
            .filter(|status| status.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn upsert_task_status(&self, status: &AthleteTaskStatus) -> Result<()> {
        self.lock()
            .task_statuses
            .insert((status.athlete_id, status.task_id), status.clone());
        Ok(())
    }

    async fn videos(&self, athlete_id: Uuid) -> Result<Vec<Video>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .videos
            .iter()
            .filter(|video| video.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn events(&self, athlete_id: Uuid) -> Result<Vec<RecruitingEvent>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .events
            .iter()
            .filter(|event| event.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn suggestions(&self, athlete_id: Uuid) -> Result<Vec<Suggestion>> {
        let state = self.lock();
        Self::check_available(&state, athlete_id)?;
        Ok(state
            .suggestions
            .iter()
            .filter(|suggestion| suggestion.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn upsert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()> {
        let mut state = self.lock();
        for suggestion in suggestions {
            match state
                .suggestions
                .iter_mut()
                .find(|existing| existing.id == suggestion.id)
            {
                Some(existing) => *existing = suggestion.clone(),
                None => state.suggestions.push(suggestion.clone()),
            }
        }
        Ok(())
    }
}
