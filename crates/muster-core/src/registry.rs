//! Policy registry
//!
//! Maps policy names to definitions. Built-in and runtime-registered
//! policies live in the same table and are evaluated by the same
//! [`Evaluator`].

use muster_api::{MemberInfo, Session};
use muster_config::{
    Config, PolicyDefinition, RawPolicy, builtin_policies, parse_policy_json, parse_policy_toml,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::{CoreError, CoreResult, Evaluator};

/// Table of named policies.
///
/// Lookups take a shared lock and may run concurrently; registration
/// takes the exclusive lock.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: RwLock<Vec<Arc<PolicyDefinition>>>,
}

impl PolicyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in policies
    pub fn with_builtins() -> CoreResult<Self> {
        let registry = Self::new();
        for definition in builtin_policies()? {
            registry.register(definition)?;
        }
        info!(policy_count = registry.len(), "Built-in policies registered");
        Ok(registry)
    }

    /// Register a definition; an existing name is rejected
    pub fn register(&self, definition: PolicyDefinition) -> CoreResult<Arc<PolicyDefinition>> {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        if policies.iter().any(|p| p.name == definition.name) {
            return Err(CoreError::DuplicatePolicy(definition.name.to_string()));
        }

        let definition = Arc::new(definition);
        info!(
            policy = %definition.name,
            kind = %definition.kind(),
            "Policy registered"
        );
        policies.push(definition.clone());
        Ok(definition)
    }

    /// Register a definition, replacing any policy of the same name.
    ///
    /// Returns the replaced definition. Evaluators already holding the old
    /// definition keep using it.
    pub fn replace(&self, definition: PolicyDefinition) -> Option<Arc<PolicyDefinition>> {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        let definition = Arc::new(definition);

        match policies.iter_mut().find(|p| p.name == definition.name) {
            Some(slot) => {
                info!(policy = %definition.name, kind = %definition.kind(), "Policy replaced");
                Some(std::mem::replace(slot, definition))
            }
            None => {
                info!(policy = %definition.name, kind = %definition.kind(), "Policy registered");
                policies.push(definition);
                None
            }
        }
    }

    /// Validate and register a raw definition
    pub fn register_raw(&self, raw: &RawPolicy) -> CoreResult<Arc<PolicyDefinition>> {
        let definition =
            PolicyDefinition::from_raw(raw).map_err(|errors| CoreError::InvalidPolicy { errors })?;
        self.register(definition)
    }

    /// Parse, validate and register one definition given as TOML
    pub fn register_toml(&self, content: &str) -> CoreResult<Arc<PolicyDefinition>> {
        self.register(parse_policy_toml(content)?)
    }

    /// Parse, validate and register one definition given as JSON
    pub fn register_json(&self, content: &str) -> CoreResult<Arc<PolicyDefinition>> {
        self.register(parse_policy_json(content)?)
    }

    /// Register every policy of a loaded policy file
    pub fn load_config(&self, config: &Config) -> CoreResult<()> {
        for definition in &config.policies {
            self.register(definition.clone())?;
        }
        info!(
            loaded = config.policies.len(),
            policy_count = self.len(),
            "Policy file loaded"
        );
        Ok(())
    }

    /// Look up a policy by name
    pub fn get(&self, name: &str) -> CoreResult<Arc<PolicyDefinition>> {
        let name = name.trim();
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.name.as_str() == name)
            .cloned()
            .ok_or_else(|| CoreError::PolicyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Registered definitions in registration order
    pub fn definitions(&self) -> Vec<Arc<PolicyDefinition>> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|p| p.name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluator for a named policy, bound to a member and their sessions
    pub fn evaluator<'a>(
        &self,
        name: &str,
        member: &'a MemberInfo,
        sessions: &'a [Session],
    ) -> CoreResult<Evaluator<'a>> {
        Ok(Evaluator::new(self.get(name)?, member, sessions))
    }
}
