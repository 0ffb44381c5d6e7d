use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::SuggestionEngine;
use crate::error::{AdvisorError, Result};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: Uuid,
    pub reason: String,
}

/// Per-item tallies for operations that must not stop at the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    #[serde(skip)]
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn record<T>(&mut self, id: Uuid, outcome: &Result<T>) {
        self.total += 1;
        match outcome {
            Ok(_) => self.updated += 1,
            Err(err) => {
                self.failed += 1;
                self.failures.push(BatchFailure {
                    id,
                    reason: err.to_string(),
                });
            }
        }
    }
}

pub fn authorize(provided: Option<&str>, expected: &str) -> Result<()> {
    if expected.is_empty() {
        return Err(AdvisorError::Unauthorized(
            "batch token is not configured".to_string(),
        ));
    }
    match provided {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        Some(_) => Err(AdvisorError::Unauthorized("invalid batch token".to_string())),
        None => Err(AdvisorError::Unauthorized("missing batch token".to_string())),
    }
}

/// Re-evaluate suggestions for every athlete. Safe to re-run.
pub async fn evaluate_all(store: &dyn Store, engine: &SuggestionEngine) -> Result<BatchSummary> {
    let athlete_ids = store.athlete_ids().await?;
    let mut summary = BatchSummary::default();

    for athlete_id in athlete_ids {
        let outcome = engine.refresh(store, athlete_id).await;
        if let Err(err) = &outcome {
            warn!(athlete_id = %athlete_id, error = %err, "suggestion refresh failed");
        }
        summary.record(athlete_id, &outcome);
    }

    info!(
        total = summary.total,
        updated = summary.updated,
        failed = summary.failed,
        "batch suggestion evaluation finished"
    );
    Ok(summary)
}

pub async fn run_scheduled(
    store: &dyn Store,
    engine: &SuggestionEngine,
    token: Option<&str>,
    expected_token: &str,
) -> Result<BatchSummary> {
    authorize(token, expected_token)?;
    evaluate_all(store, engine).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{Athlete, GradeLevel};
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn athlete(name: &str) -> Athlete {
        Athlete {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            grade_level: Some(GradeLevel::Junior),
            graduation_year: Some(2027),
            gpa: Some(3.2),
            sat_score: None,
            act_score: None,
            sport: Some("soccer".to_string()),
            position: Some("midfielder".to_string()),
            athletic_rating: Some(3),
            eligibility_status: None,
            preferred_region: None,
            committed: false,
        }
    }

    fn engine() -> SuggestionEngine {
        let config = EngineConfig::new(chrono::Duration::days(14), 3).expect("valid config");
        SuggestionEngine::new(config)
    }

    #[test]
    fn authorize_rejects_missing_or_wrong_tokens() {
        assert!(authorize(Some("secret"), "secret").is_ok());
        assert_matches!(authorize(Some("guess"), "secret"), Err(AdvisorError::Unauthorized(_)));
        assert_matches!(authorize(Some("secreT"), "secret"), Err(AdvisorError::Unauthorized(_)));
        assert_matches!(authorize(Some("secret2"), "secret"), Err(AdvisorError::Unauthorized(_)));
        assert_matches!(authorize(None, "secret"), Err(AdvisorError::Unauthorized(_)));
        assert_matches!(authorize(Some(""), ""), Err(AdvisorError::Unauthorized(_)));
    }

    #[test]
    fn summary_serializes_counts_only() {
        let mut summary = BatchSummary::default();
        summary.record::<()>(Uuid::new_v4(), &Ok(()));
        summary.record::<()>(Uuid::new_v4(), &Err(AdvisorError::Validation("bad".to_string())));

        let json = serde_json::to_value(&summary).expect("serializes");
        assert_eq!(json, serde_json::json!({ "total": 2, "updated": 1, "failed": 1 }));
        assert_eq!(summary.failures[0].reason, "Validation failed: bad");
    }

    #[tokio::test]
    async fn one_failing_athlete_does_not_block_others() {
        let store = MemoryStore::new();
        let healthy = athlete("Avery");
        let broken = athlete("Jules");
        let also_healthy = athlete("Kiara");
        store.add_athlete(healthy.clone());
        store.add_athlete(broken.clone());
        store.add_athlete(also_healthy.clone());
        store.mark_unavailable(broken.id);

        let summary = run_scheduled(&store, &engine(), Some("token"), "token")
            .await
            .expect("batch reports partial failure instead of erroring");

        assert_eq!(summary.total, 3);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, broken.id);
        assert!(!store.suggestions(healthy.id).await.unwrap().is_empty());
        assert!(!store.suggestions(also_healthy.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rerunning_batch_is_idempotent() {
        let store = MemoryStore::new();
        let junior = athlete("Avery");
        store.add_athlete(junior.clone());
        let engine = engine();

        evaluate_all(&store, &engine).await.unwrap();
        let first = store.suggestions(junior.id).await.unwrap().len();
        evaluate_all(&store, &engine).await.unwrap();
        let second = store.suggestions(junior.id).await.unwrap().len();

        assert!(first > 0);
        assert_eq!(first, second);
    }
}
