use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Cannot complete task. Please complete these prerequisites first: {}", .prerequisites.join(", "))]
    TaskLocked { prerequisites: Vec<String> },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to score {dimension} fit: {reason}")]
    Dimension {
        dimension: &'static str,
        reason: String,
    },

    #[error("Rule {rule} failed: {reason}")]
    Rule { rule: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type Result<T, E = AdvisorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_message_lists_every_prerequisite() {
        let err = AdvisorError::TaskLocked {
            prerequisites: vec!["Task 1".to_string(), "Task 2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Cannot complete task. Please complete these prerequisites first: Task 1, Task 2"
        );
    }
}
