use chrono::Duration;
use clap::Args;

use crate::error::{AdvisorError, Result};

pub const DEFAULT_SURFACE_LIMIT: usize = 3;

/// Process settings, read from flags or the environment (`.env` is loaded first).
#[derive(Debug, Clone, Args)]
pub struct Settings {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "ADVISOR_DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// How long a dismissed suggestion blocks a fresh one of the same rule.
    /// Required by every command that evaluates suggestions.
    #[arg(long, env = "ADVISOR_DISMISS_COOLDOWN_DAYS")]
    pub dismiss_cooldown_days: Option<i64>,

    #[arg(long, env = "ADVISOR_SURFACE_LIMIT", default_value_t = DEFAULT_SURFACE_LIMIT)]
    pub surface_limit: usize,

    #[arg(long, env = "ADVISOR_BATCH_TOKEN", hide_env_values = true)]
    pub batch_token: Option<String>,
}

impl Settings {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let days = self.dismiss_cooldown_days.ok_or_else(|| {
            AdvisorError::Validation("ADVISOR_DISMISS_COOLDOWN_DAYS must be set".to_string())
        })?;
        let cooldown = Duration::try_days(days).ok_or_else(|| {
            AdvisorError::Validation(format!("dismiss cooldown of {days} days is out of range"))
        })?;
        EngineConfig::new(cooldown, self.surface_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub dismiss_cooldown: Duration,
    pub surface_limit: usize,
}

impl EngineConfig {
    pub fn new(dismiss_cooldown: Duration, surface_limit: usize) -> Result<Self> {
        if dismiss_cooldown <= Duration::zero() {
            return Err(AdvisorError::Validation(
                "dismiss cooldown must be positive".to_string(),
            ));
        }
        if surface_limit == 0 {
            return Err(AdvisorError::Validation(
                "surface limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dismiss_cooldown,
            surface_limit,
        })
    }
}
