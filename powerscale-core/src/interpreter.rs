//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.
//! References are resolved right before each Effect, so values computed by
//! earlier Effects (ids, generated names) flow into later ones.

use log::{info, warn};

use crate::effect::Effect;
use crate::graph::{self, BindingMap};
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{Resource, ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
///
/// A replacement reports two outcomes: the delete and then the create.
#[derive(Debug, Default)]
pub struct ApplyResult {
    pub outcomes: Vec<(ResourceId, Result<EffectOutcome, ProviderError>)>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }

    fn record(&mut self, id: ResourceId, result: ProviderResult<EffectOutcome>) -> bool {
        let ok = result.is_ok();
        if ok {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.outcomes.push((id, result));
        ok
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan, bindings: &mut BindingMap) -> ApplyResult {
        let mut result = ApplyResult::default();

        for effect in plan.effects() {
            let ok = if self.config.dry_run {
                result.record(
                    effect.resource_id().clone(),
                    Ok(EffectOutcome::Skipped {
                        reason: "dry-run mode".to_string(),
                    }),
                )
            } else {
                self.execute_effect(effect, bindings, &mut result).await
            };

            if !ok && !self.config.continue_on_error {
                break;
            }
        }

        result
    }

    /// Execute a single Effect, recording its outcome(s)
    async fn execute_effect(
        &self,
        effect: &Effect,
        bindings: &mut BindingMap,
        result: &mut ApplyResult,
    ) -> bool {
        let id = effect.resource_id().clone();
        info!("{}", effect);

        match effect {
            Effect::Read(resource) => {
                let outcome = match self.resolved(resource, bindings) {
                    Ok(resolved) => self
                        .provider
                        .read(&resolved.id, None, &resolved.attributes)
                        .await
                        .and_then(|state| {
                            if state.exists {
                                graph::update_binding(bindings, resource, &state);
                                Ok(EffectOutcome::Read { state })
                            } else {
                                Err(ProviderError::new("Data source returned no object")
                                    .for_resource(resolved.id.clone()))
                            }
                        }),
                    Err(e) => Err(e),
                };
                result.record(id, outcome)
            }
            Effect::Create(resource) => {
                let outcome = self.create(resource, bindings).await;
                result.record(id, outcome)
            }
            Effect::Update { id: rid, from, to, .. } => {
                let outcome = match self.resolved(to, bindings) {
                    Ok(resolved) => self
                        .provider
                        .update(rid, from.identifier(), from, &resolved)
                        .await
                        .map(|state| {
                            graph::update_binding(bindings, to, &state);
                            EffectOutcome::Updated { state }
                        }),
                    Err(e) => Err(e),
                };
                result.record(id, outcome)
            }
            Effect::Replace { from, to, .. } => {
                let deleted = self
                    .provider
                    .delete(from)
                    .await
                    .map(|()| EffectOutcome::Deleted { id: from.id.clone() });
                if !result.record(id.clone(), deleted) {
                    return false;
                }
                let outcome = self.create(to, bindings).await;
                result.record(id, outcome)
            }
            Effect::Delete(state) => {
                let outcome = self
                    .provider
                    .delete(state)
                    .await
                    .map(|()| EffectOutcome::Deleted { id: state.id.clone() });
                result.record(id, outcome)
            }
        }
    }

    async fn create(
        &self,
        resource: &Resource,
        bindings: &mut BindingMap,
    ) -> ProviderResult<EffectOutcome> {
        let resolved = self.resolved(resource, bindings)?;
        let state = self.provider.create(&resolved).await?;
        graph::update_binding(bindings, resource, &state);
        Ok(EffectOutcome::Created { state })
    }

    fn resolved(&self, resource: &Resource, bindings: &BindingMap) -> ProviderResult<Resource> {
        let resolved = graph::resolve_resource(resource, bindings);
        if let Some((key, _)) = resolved
            .attributes
            .iter()
            .find(|(_, v)| v.has_unresolved_ref())
        {
            warn!("{}: attribute '{}' is still unknown", resource.id, key);
            return Err(ProviderError::new("Unresolved reference")
                .with_detail(format!("attribute '{}' refers to an unknown value", key))
                .for_resource(resource.id.clone()));
        }
        Ok(resolved)
    }
}
