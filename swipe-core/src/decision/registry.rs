use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PoliciesSection;

use super::error::{DecisionError, DecisionResult};
use super::policies::{ApparentGenderPolicy, ProbabilisticRatioPolicy, QaCyclePolicy};
use super::policy::{Policy, PolicyKind};

/// Constructed policies keyed by kind.
#[derive(Default, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<PolicyKind, Arc<dyn Policy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every known policy from configuration.
    ///
    /// Any invalid policy configuration fails the whole registry.
    pub fn with_defaults(config: &PoliciesSection) -> DecisionResult<Self> {
        let mut registry = Self::new();
        for kind in PolicyKind::ALL {
            let policy: Arc<dyn Policy> = match kind {
                PolicyKind::QaCycle => Arc::new(QaCyclePolicy::new(config.qa_cycle.clone())?),
                PolicyKind::ProbabilisticRatio => Arc::new(ProbabilisticRatioPolicy::new(
                    config.probabilistic_ratio.clone(),
                )?),
                PolicyKind::ApparentGender => {
                    Arc::new(ApparentGenderPolicy::new(config.apparent_gender.clone())?)
                }
            };
            registry.register(policy);
        }
        Ok(registry)
    }

    /// Registers `policy` under its own kind, returning any policy it replaces.
    pub fn register(&mut self, policy: Arc<dyn Policy>) -> Option<Arc<dyn Policy>> {
        self.policies.insert(policy.kind(), policy)
    }

    pub fn resolve(&self, kind: PolicyKind) -> DecisionResult<Arc<dyn Policy>> {
        self.policies
            .get(&kind)
            .cloned()
            .ok_or(DecisionError::PolicyNotFound(kind))
    }

    pub fn resolve_name(&self, name: &str) -> DecisionResult<Arc<dyn Policy>> {
        self.resolve(name.parse()?)
    }

    pub fn kinds(&self) -> Vec<PolicyKind> {
        let mut kinds: Vec<PolicyKind> = self.policies.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::policies::QaCycleConfig;

    #[test]
    fn unregistered_kind_fails_explicitly() {
        let mut registry = PolicyRegistry::new();
        registry.register(Arc::new(QaCyclePolicy::new(QaCycleConfig::default()).unwrap()));
        assert!(registry.resolve(PolicyKind::QaCycle).is_ok());
        let err = registry.resolve(PolicyKind::ApparentGender).err().unwrap();
        assert!(matches!(err, DecisionError::PolicyNotFound(PolicyKind::ApparentGender)));
    }

    #[test]
    fn defaults_register_every_kind() {
        let registry = PolicyRegistry::with_defaults(&PoliciesSection::default()).unwrap();
        assert_eq!(registry.kinds(), PolicyKind::ALL.to_vec());
        let policy = registry.resolve_name("probabilistic_ratio_v1").unwrap();
        assert_eq!(policy.name(), "probabilistic_ratio_v1");
    }

    #[test]
    fn invalid_policy_config_fails_fast() {
        let mut config = PoliciesSection::default();
        config.probabilistic_ratio.pass_weight = 0;
        let err = PolicyRegistry::with_defaults(&config).err().unwrap();
        assert!(matches!(err, DecisionError::InvalidWeights { .. }));
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let registry = PolicyRegistry::with_defaults(&PoliciesSection::default()).unwrap();
        let err = registry.resolve_name("gut_feeling").err().unwrap();
        assert!(matches!(err, DecisionError::UnknownPolicy(_)));
    }
}
