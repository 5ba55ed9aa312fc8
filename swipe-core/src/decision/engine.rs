use std::sync::Arc;

use crate::cancel::CancelSignal;

use super::context::{Decision, DecisionContext};
use super::error::DecisionResult;
use super::policy::PolicyKind;
use super::registry::PolicyRegistry;

/// Binds a registry to the currently selected policy kind.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    registry: Arc<PolicyRegistry>,
    selected: PolicyKind,
}

impl DecisionEngine {
    pub fn new(registry: Arc<PolicyRegistry>, selected: PolicyKind) -> Self {
        Self { registry, selected }
    }

    pub fn selected(&self) -> PolicyKind {
        self.selected
    }

    /// Switches policy; takes effect on the next call to [`DecisionEngine::decide`].
    pub fn select(&mut self, kind: PolicyKind) {
        self.selected = kind;
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Resolves the selected policy on every call and delegates to it.
    pub fn decide(&self, cancel: &CancelSignal, ctx: &DecisionContext) -> DecisionResult<Decision> {
        cancel.check()?;
        let policy = self.registry.resolve(self.selected)?;
        policy.decide(cancel, ctx)
    }
}
