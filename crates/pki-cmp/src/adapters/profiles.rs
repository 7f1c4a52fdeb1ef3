//! Static profile registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::context::ConfigurationContext;
use crate::ports::outbound::ContextProvider;

/// Profiles fixed at construction, keyed by profile name.
#[derive(Debug, Default)]
pub struct StaticContextProvider {
    profiles: HashMap<String, Arc<ConfigurationContext>>,
}

impl StaticContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `context` under its own profile name, replacing any previous one.
    pub fn with_profile(mut self, context: ConfigurationContext) -> Self {
        self.insert(Arc::new(context));
        self
    }

    pub fn insert(&mut self, context: Arc<ConfigurationContext>) {
        self.profiles
            .insert(context.profile_name().to_owned(), context);
    }

    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ContextProvider for StaticContextProvider {
    fn context_for(&self, profile: &str) -> Option<Arc<ConfigurationContext>> {
        self.profiles.get(profile).cloned()
    }
}
