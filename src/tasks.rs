//! Checklist task dependencies.
//!
//! Lock state is derived on every query from the current statuses, so a
//! status change is visible to dependents immediately.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::RuleContext;
use crate::error::{AdvisorError, Result};
use crate::models::{AthleteTaskStatus, Division, GradeLevel, TaskDefinition, TaskStatus};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct TaskChecklist {
    athlete_id: Uuid,
    definitions: HashMap<Uuid, TaskDefinition>,
    statuses: HashMap<Uuid, AthleteTaskStatus>,
}

impl TaskChecklist {
    pub fn new(
        athlete_id: Uuid,
        definitions: impl IntoIterator<Item = TaskDefinition>,
        statuses: impl IntoIterator<Item = AthleteTaskStatus>,
    ) -> Self {
        Self {
            athlete_id,
            definitions: definitions.into_iter().map(|task| (task.id, task)).collect(),
            statuses: statuses
                .into_iter()
                .filter(|status| status.athlete_id == athlete_id)
                .map(|status| (status.task_id, status))
                .collect(),
        }
    }

    pub async fn load(store: &dyn Store, athlete_id: Uuid) -> Result<Self> {
        let definitions = store.task_definitions().await?;
        let statuses = store.athlete_tasks(athlete_id).await?;
        Ok(Self::new(athlete_id, definitions, statuses))
    }

    pub fn from_context(ctx: &RuleContext) -> Self {
        Self::new(ctx.athlete_id, ctx.tasks.iter().cloned(), ctx.athlete_tasks.iter().cloned())
    }

    /// Every task definition, sorted by title.
    pub fn definitions(&self) -> Vec<&TaskDefinition> {
        let mut tasks: Vec<&TaskDefinition> = self.definitions.values().collect();
        tasks.sort_by(|a, b| a.title.cmp(&b.title));
        tasks
    }

    pub fn definition(&self, task_id: Uuid) -> Option<&TaskDefinition> {
        self.definitions.get(&task_id)
    }

    pub fn status_of(&self, task_id: Uuid) -> TaskStatus {
        self.statuses
            .get(&task_id)
            .map(|row| row.status)
            .unwrap_or(TaskStatus::NotStarted)
    }

    pub fn is_locked(&self, task_id: Uuid) -> bool {
        self.definitions.get(&task_id).is_some_and(|task| {
            task.dependency_task_ids
                .iter()
                .any(|dependency| self.status_of(*dependency) != TaskStatus::Completed)
        })
    }

    pub fn locked_task_ids(&self) -> HashSet<Uuid> {
        self.definitions
            .keys()
            .copied()
            .filter(|task_id| self.is_locked(*task_id))
            .collect()
    }

    /// Titles of prerequisites that are not yet completed, in declaration order.
    pub fn unmet_prerequisites(&self, task_id: Uuid) -> Vec<String> {
        let Some(task) = self.definitions.get(&task_id) else {
            return Vec::new();
        };
        task.dependency_task_ids
            .iter()
            .filter(|dependency| self.status_of(**dependency) != TaskStatus::Completed)
            .map(|dependency| {
                self.definitions
                    .get(dependency)
                    .map(|definition| definition.title.clone())
                    .unwrap_or_else(|| dependency.to_string())
            })
            .collect()
    }

    /// Only `completed` is gated; skipping bypasses prerequisites.
    pub fn validate_transition(&self, task_id: Uuid, new_status: TaskStatus) -> Result<()> {
        if !self.definitions.contains_key(&task_id) {
            return Err(AdvisorError::not_found("task", task_id));
        }
        if new_status == TaskStatus::Completed {
            let prerequisites = self.unmet_prerequisites(task_id);
            if !prerequisites.is_empty() {
                return Err(AdvisorError::TaskLocked { prerequisites });
            }
        }
        Ok(())
    }

    pub async fn update_status(
        &mut self,
        store: &dyn Store,
        task_id: Uuid,
        new_status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<AthleteTaskStatus> {
        self.validate_transition(task_id, new_status)?;

        let record = AthleteTaskStatus {
            athlete_id: self.athlete_id,
            task_id,
            status: new_status,
            completed_at: (new_status == TaskStatus::Completed).then_some(now),
            updated_at: now,
        };
        store.upsert_task_status(&record).await?;
        self.statuses.insert(task_id, record.clone());
        Ok(record)
    }

    /// Required, applicable tasks that can be worked on right now, sorted by title.
    pub fn actionable_required(
        &self,
        grade: Option<GradeLevel>,
        divisions: &[Division],
    ) -> Vec<&TaskDefinition> {
        let mut tasks: Vec<&TaskDefinition> = self
            .definitions
            .values()
            .filter(|task| task.required && task.applies_to(grade, divisions))
            .filter(|task| {
                !matches!(
                    self.status_of(task.id),
                    TaskStatus::Completed | TaskStatus::Skipped
                )
            })
            .filter(|task| !self.is_locked(task.id))
            .collect();
        tasks.sort_by(|a, b| a.title.cmp(&b.title));
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn task(title: &str, dependencies: Vec<Uuid>) -> TaskDefinition {
        TaskDefinition {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: "checklist".to_string(),
            required: true,
            divisions: Vec::new(),
            grade_levels: Vec::new(),
            dependency_task_ids: dependencies,
        }
    }

    #[test]
    fn task_without_dependencies_is_never_locked() {
        let a = task("Create profile", Vec::new());
        let checklist = TaskChecklist::new(Uuid::new_v4(), vec![a.clone()], Vec::new());
        assert!(!checklist.is_locked(a.id));
        assert!(checklist.locked_task_ids().is_empty());
    }

    #[tokio::test]
    async fn completing_prerequisite_unlocks_dependent() {
        let store = MemoryStore::new();
        let athlete_id = Uuid::new_v4();
        let a = task("Task 1", Vec::new());
        let b = task("Task 2", vec![a.id]);
        let mut checklist = TaskChecklist::new(athlete_id, vec![a.clone(), b.clone()], Vec::new());

        assert!(checklist.is_locked(b.id));
        assert_eq!(checklist.locked_task_ids(), HashSet::from([b.id]));

        checklist
            .update_status(&store, a.id, TaskStatus::Completed, Utc::now())
            .await
            .expect("no prerequisites");

        assert!(!checklist.is_locked(b.id));
        assert!(checklist.locked_task_ids().is_empty());
    }

    #[tokio::test]
    async fn completing_locked_task_names_every_prerequisite() {
        let store = MemoryStore::new();
        let athlete_id = Uuid::new_v4();
        let a = task("Task 1", Vec::new());
        let b = task("Task 2", Vec::new());
        let c = task("Final", vec![a.id, b.id]);
        let mut checklist =
            TaskChecklist::new(athlete_id, vec![a.clone(), b.clone(), c.clone()], Vec::new());

        let err = checklist
            .update_status(&store, c.id, TaskStatus::Completed, Utc::now())
            .await
            .expect_err("locked task must not complete");

        assert_matches!(&err, AdvisorError::TaskLocked { prerequisites } if prerequisites.len() == 2);
        assert_eq!(
            err.to_string(),
            "Cannot complete task. Please complete these prerequisites first: Task 1, Task 2"
        );
        assert!(store.athlete_tasks(athlete_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skip_bypasses_lock_but_does_not_unlock_dependents() {
        let store = MemoryStore::new();
        let athlete_id = Uuid::new_v4();
        let a = task("Task 1", Vec::new());
        let b = task("Task 2", vec![a.id]);
        let c = task("Task 3", vec![b.id]);
        let mut checklist =
            TaskChecklist::new(athlete_id, vec![a.clone(), b.clone(), c.clone()], Vec::new());

        let skipped = checklist
            .update_status(&store, b.id, TaskStatus::Skipped, Utc::now())
            .await
            .expect("skip is always allowed");
        assert_eq!(skipped.status, TaskStatus::Skipped);
        assert_eq!(skipped.completed_at, None);
        assert!(checklist.is_locked(c.id));

        checklist
            .update_status(&store, c.id, TaskStatus::InProgress, Utc::now())
            .await
            .expect("in progress is always allowed");
        assert_eq!(store.athlete_tasks(athlete_id).await.unwrap().len(), 2);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let checklist = TaskChecklist::new(Uuid::new_v4(), Vec::new(), Vec::new());
        let missing = Uuid::new_v4();
        assert_matches!(
            checklist.validate_transition(missing, TaskStatus::Completed),
            Err(AdvisorError::NotFound { entity: "task", .. })
        );
    }

    #[test]
    fn actionable_tasks_skip_locked_and_finished() {
        let athlete_id = Uuid::new_v4();
        let a = task("Create profile", Vec::new());
        let b = task("Email coaches", vec![a.id]);
        let c = task("Build school list", Vec::new());
        let statuses = vec![AthleteTaskStatus {
            athlete_id,
            task_id: c.id,
            status: TaskStatus::Skipped,
            completed_at: None,
            updated_at: Utc::now(),
        }];
        let checklist = TaskChecklist::new(athlete_id, vec![a.clone(), b, c], statuses);

        let titles: Vec<&str> = checklist
            .actionable_required(Some(GradeLevel::Junior), &[])
            .into_iter()
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Create profile"]);
    }
}
