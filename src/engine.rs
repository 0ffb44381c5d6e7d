use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::context::RuleContext;
use crate::error::{AdvisorError, Result};
use crate::models::{Interaction, RuleType, Suggestion};
use crate::rules::{default_rules, CompletedAction, Rule, SuggestionDraft};
use crate::store::Store;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub rule_type: RuleType,
    /// `None` when the rule ran cleanly and no longer fires.
    pub draft: Option<SuggestionDraft>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub created: usize,
    pub updated: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub completed: usize,
    pub created: usize,
    pub updated: usize,
    pub resolved: usize,
}

impl std::ops::AddAssign for MutationOutcome {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.created += other.created;
        self.updated += other.updated;
        self.resolved += other.resolved;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacedSuggestions {
    pub suggestions: Vec<Suggestion>,
    pub remaining: usize,
}

pub struct SuggestionEngine {
    rules: Vec<Box<dyn Rule>>,
    config: EngineConfig,
    clock: Clock,
}

impl SuggestionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rules(default_rules(), config)
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>, config: EngineConfig) -> Self {
        Self {
            rules,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Run every rule. A failing rule is logged and left out, so its stored
    /// suggestion is neither created nor resolved.
    pub fn evaluate(&self, ctx: &RuleContext) -> Vec<Evaluation> {
        self.rules
            .iter()
            .filter_map(|rule| match rule.evaluate(ctx) {
                Ok(draft) => Some(Evaluation {
                    rule_type: rule.rule_type(),
                    draft,
                }),
                Err(err) => {
                    warn!(
                        athlete_id = %ctx.athlete_id,
                        rule = rule.rule_type().as_str(),
                        error = %err,
                        "rule evaluation failed"
                    );
                    None
                }
            })
            .collect()
    }

    /// Work out which suggestions to create, update or resolve. Returns only
    /// the records that changed.
    pub fn reconcile(
        &self,
        athlete_id: Uuid,
        existing: &[Suggestion],
        evaluations: Vec<Evaluation>,
        now: DateTime<Utc>,
    ) -> Vec<Suggestion> {
        let mut seen = HashSet::new();
        let mut changes = Vec::new();

        for Evaluation { rule_type, draft } in evaluations {
            if !seen.insert(rule_type) {
                continue;
            }

            let unresolved = existing
                .iter()
                .find(|s| s.athlete_id == athlete_id && s.rule_type == rule_type && !s.is_resolved());
            let Some(draft) = draft else {
                if let Some(current) = unresolved {
                    debug!(rule = rule_type.as_str(), "rule no longer fires, resolving suggestion");
                    let mut resolved = current.clone();
                    mark_completed(&mut resolved, now);
                    changes.push(resolved);
                }
                continue;
            };
            if let Some(current) = unresolved {
                if differs(current, &draft) {
                    let mut updated = current.clone();
                    updated.urgency = draft.urgency;
                    updated.message = draft.message;
                    updated.action_type = draft.action_type;
                    updated.related_school_id = draft.related_school_id;
                    updated.related_task_id = draft.related_task_id;
                    updated.updated_at = now;
                    changes.push(updated);
                }
                continue;
            }

            let last_dismissal = existing
                .iter()
                .filter(|s| s.athlete_id == athlete_id && s.rule_type == rule_type && s.dismissed)
                .filter_map(|s| s.dismissed_at)
                .max();
            if let Some(dismissed_at) = last_dismissal {
                if now - dismissed_at < self.config.dismiss_cooldown {
                    debug!(rule = rule_type.as_str(), "suggestion still cooling down after dismissal");
                    continue;
                }
            }

            changes.push(Suggestion {
                id: Uuid::new_v4(),
                athlete_id,
                rule_type,
                urgency: draft.urgency,
                message: draft.message,
                action_type: draft.action_type,
                related_school_id: draft.related_school_id,
                related_task_id: draft.related_task_id,
                dismissed: false,
                dismissed_at: None,
                completed: false,
                completed_at: None,
                pending_surface: true,
                surfaced_at: None,
                created_at: now,
                updated_at: now,
            });
        }

        changes
    }

    /// Evaluate and persist one athlete's suggestions in a single write.
    pub async fn refresh(&self, store: &dyn Store, athlete_id: Uuid) -> Result<RefreshOutcome> {
        let started = Instant::now();
        let now = self.now();
        let ctx = RuleContext::load(store, athlete_id, now).await?;
        let existing = store.suggestions(athlete_id).await?;

        let evaluations = self.evaluate(&ctx);
        let changes = self.reconcile(athlete_id, &existing, evaluations, now);
        let existing_ids: HashSet<Uuid> = existing.iter().map(|s| s.id).collect();
        let (touched, created): (Vec<&Suggestion>, Vec<&Suggestion>) =
            changes.iter().partition(|s| existing_ids.contains(&s.id));
        let resolved = touched.iter().filter(|s| s.completed).count();
        let outcome = RefreshOutcome {
            created: created.len(),
            updated: touched.len() - resolved,
            resolved,
        };

        if !changes.is_empty() {
            store.upsert_suggestions(&changes).await?;
        }

        info!(
            athlete_id = %athlete_id,
            created = outcome.created,
            updated = outcome.updated,
            resolved = outcome.resolved,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "suggestions refreshed"
        );
        Ok(outcome)
    }

    /// Unresolved suggestions, highest urgency first, oldest first within a tier.
    pub async fn active(&self, store: &dyn Store, athlete_id: Uuid) -> Result<Vec<Suggestion>> {
        let mut active: Vec<Suggestion> = store
            .suggestions(athlete_id)
            .await?
            .into_iter()
            .filter(|s| !s.is_resolved())
            .collect();
        sort_for_display(&mut active);
        Ok(active)
    }

    /// The top suggestions up to the configured limit, plus how many more exist.
    pub async fn surface(&self, store: &dyn Store, athlete_id: Uuid) -> Result<SurfacedSuggestions> {
        let active = self.active(store, athlete_id).await?;
        let limit = self.config.surface_limit;
        let remaining = active.len().saturating_sub(limit);
        let shown: Vec<Suggestion> = active.into_iter().take(limit).collect();
        let suggestions = self.mark_surfaced(store, shown).await?;
        Ok(SurfacedSuggestions {
            suggestions,
            remaining,
        })
    }

    /// Explicitly pull suggestions that have not been shown yet.
    pub async fn pull_next(
        &self,
        store: &dyn Store,
        athlete_id: Uuid,
        count: usize,
    ) -> Result<SurfacedSuggestions> {
        let pending: Vec<Suggestion> = self
            .active(store, athlete_id)
            .await?
            .into_iter()
            .filter(|s| s.pending_surface)
            .collect();
        let remaining = pending.len().saturating_sub(count);
        let shown: Vec<Suggestion> = pending.into_iter().take(count).collect();
        let suggestions = self.mark_surfaced(store, shown).await?;
        Ok(SurfacedSuggestions {
            suggestions,
            remaining,
        })
    }

    pub async fn dismiss(
        &self,
        store: &dyn Store,
        athlete_id: Uuid,
        suggestion_id: Uuid,
    ) -> Result<Suggestion> {
        let mut suggestion = find(store, athlete_id, suggestion_id).await?;
        if suggestion.is_resolved() {
            return Ok(suggestion);
        }
        let now = self.now();
        suggestion.dismissed = true;
        suggestion.dismissed_at = Some(now);
        suggestion.updated_at = now;
        store.upsert_suggestions(std::slice::from_ref(&suggestion)).await?;
        Ok(suggestion)
    }

    pub async fn complete(
        &self,
        store: &dyn Store,
        athlete_id: Uuid,
        suggestion_id: Uuid,
    ) -> Result<Suggestion> {
        let mut suggestion = find(store, athlete_id, suggestion_id).await?;
        if suggestion.is_resolved() {
            return Ok(suggestion);
        }
        mark_completed(&mut suggestion, self.now());
        store.upsert_suggestions(std::slice::from_ref(&suggestion)).await?;
        Ok(suggestion)
    }

    /// Complete every open suggestion that `action` fulfils. Call after the
    /// action has been persisted.
    pub async fn record_action(
        &self,
        store: &dyn Store,
        athlete_id: Uuid,
        action: &CompletedAction,
    ) -> Result<usize> {
        let now = self.now();
        let ctx = RuleContext::load(store, athlete_id, now).await?;
        let mut completed = Vec::new();

        for mut suggestion in self.active(store, athlete_id).await? {
            let Some(rule) = self.rule_for(suggestion.rule_type) else {
                continue;
            };
            if rule.is_completed_by(action, &suggestion, &ctx) {
                mark_completed(&mut suggestion, now);
                completed.push(suggestion);
            }
        }

        if !completed.is_empty() {
            store.upsert_suggestions(&completed).await?;
        }
        Ok(completed.len())
    }

    /// Trigger point for profile-affecting writes: complete what the action
    /// fulfilled, then re-evaluate so new suggestions are visible right away.
    pub async fn after_mutation(
        &self,
        store: &dyn Store,
        athlete_id: Uuid,
        action: &CompletedAction,
    ) -> Result<MutationOutcome> {
        let completed = self.record_action(store, athlete_id, action).await?;
        let refreshed = self.refresh(store, athlete_id).await?;
        Ok(MutationOutcome {
            completed,
            created: refreshed.created,
            updated: refreshed.updated,
            resolved: refreshed.resolved,
        })
    }

    /// Run the mutation trigger once per persisted interaction, in order.
    pub async fn after_interactions(
        &self,
        store: &dyn Store,
        interactions: &[Interaction],
    ) -> Result<MutationOutcome> {
        let mut total = MutationOutcome::default();
        for interaction in interactions {
            let action = CompletedAction::from(interaction);
            total += self.after_mutation(store, interaction.athlete_id, &action).await?;
        }
        Ok(total)
    }

    fn rule_for(&self, rule_type: RuleType) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.rule_type() == rule_type)
            .map(|rule| rule.as_ref())
    }

    async fn mark_surfaced(
        &self,
        store: &dyn Store,
        mut shown: Vec<Suggestion>,
    ) -> Result<Vec<Suggestion>> {
        let now = self.now();
        let mut changed = Vec::new();
        for suggestion in shown.iter_mut() {
            if suggestion.pending_surface || suggestion.surfaced_at.is_none() {
                suggestion.pending_surface = false;
                suggestion.surfaced_at = Some(now);
                suggestion.updated_at = now;
                changed.push(suggestion.clone());
            }
        }
        if !changed.is_empty() {
            store.upsert_suggestions(&changed).await?;
        }
        Ok(shown)
    }
}

fn differs(current: &Suggestion, draft: &SuggestionDraft) -> bool {
    current.urgency != draft.urgency
        || current.message != draft.message
        || current.action_type != draft.action_type
        || current.related_school_id != draft.related_school_id
        || current.related_task_id != draft.related_task_id
}

fn mark_completed(suggestion: &mut Suggestion, now: DateTime<Utc>) {
    suggestion.completed = true;
    suggestion.completed_at = Some(now);
    suggestion.updated_at = now;
}

pub fn sort_for_display(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

async fn find(store: &dyn Store, athlete_id: Uuid, suggestion_id: Uuid) -> Result<Suggestion> {
    store
        .suggestions(athlete_id)
        .await?
        .into_iter()
        .find(|s| s.id == suggestion_id)
        .ok_or_else(|| AdvisorError::not_found("suggestion", suggestion_id))
}
