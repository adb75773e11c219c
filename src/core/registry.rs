//! # Workload registry - name → factory lookup table.
//!
//! The registry is the only way the launcher learns which workloads exist.
//! It is populated explicitly during process initialization and read-only
//! afterwards, so it can be shared behind an `Arc` without locking.
//!
//! ## Rules
//! - Names are unique; a second registration of the same name is rejected and
//!   the first one stays in place
//! - Lookup is an exact, case-sensitive match
//! - There is no discovery: the set of valid names is exactly what was registered

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LaunchError;
use crate::workloads::WorkloadFactory;

/// A registered workload: its name and constructor.
#[derive(Clone, Debug)]
pub struct WorkloadDescriptor {
    name: Arc<str>,
    factory: WorkloadFactory,
}

impl WorkloadDescriptor {
    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor for new instances.
    pub fn factory(&self) -> &WorkloadFactory {
        &self.factory
    }
}

/// Static table of workloads, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: HashMap<Arc<str>, WorkloadDescriptor>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a static list of `(name, factory)` pairs.
    ///
    /// Fails on the first duplicate name.
    ///
    /// # Example
    /// ```
    /// use deployvisor::{InstanceContext, Registry, Workload, WorkloadError, WorkloadFactory};
    ///
    /// #[derive(Default)]
    /// struct Noop;
    ///
    /// #[async_trait::async_trait]
    /// impl Workload for Noop {
    ///     async fn start(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
    ///     async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> { Ok(()) }
    /// }
    ///
    /// let registry = Registry::from_entries([
    ///     ("noop", WorkloadFactory::of::<Noop>()),
    ///     ("other", WorkloadFactory::of::<Noop>()),
    /// ])?;
    /// assert_eq!(registry.names(), vec!["noop", "other"]);
    /// # Ok::<(), deployvisor::LaunchError>(())
    /// ```
    pub fn from_entries<I, N>(entries: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = (N, WorkloadFactory)>,
        N: Into<Arc<str>>,
    {
        let mut registry = Self::new();
        for (name, factory) in entries {
            registry.register(name, factory)?;
        }
        Ok(registry)
    }

    /// Registers `factory` under `name`.
    ///
    /// Returns [`LaunchError::DuplicateName`] if the name is taken; the existing
    /// entry is left untouched.
    pub fn register(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: WorkloadFactory,
    ) -> Result<(), LaunchError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(LaunchError::DuplicateName {
                name: name.to_string(),
            });
        }
        let descriptor = WorkloadDescriptor {
            name: Arc::clone(&name),
            factory,
        };
        self.entries.insert(name, descriptor);
        Ok(())
    }

    /// Resolves `name` to its factory.
    pub fn resolve(&self, name: &str) -> Result<&WorkloadFactory, LaunchError> {
        self.descriptor(name).map(WorkloadDescriptor::factory)
    }

    /// Resolves `name` to its full descriptor.
    pub fn descriptor(&self, name: &str) -> Result<&WorkloadDescriptor, LaunchError> {
        self.entries
            .get(name)
            .ok_or_else(|| LaunchError::UnknownWorkload {
                name: name.to_string(),
                known: self.names(),
            })
    }

    /// True if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered workloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::AlwaysStarts;

    #[test]
    fn resolves_the_exact_factory_registered() {
        let http = WorkloadFactory::of::<AlwaysStarts>();
        let worker = WorkloadFactory::of::<AlwaysStarts>();
        let registry =
            Registry::from_entries([("http", http.clone()), ("worker", worker.clone())])
                .expect("unique names");

        assert!(registry.resolve("http").expect("http").ptr_eq(&http));
        assert!(registry.resolve("worker").expect("worker").ptr_eq(&worker));
        assert!(!registry.resolve("http").expect("http").ptr_eq(&worker));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let registry =
            Registry::from_entries([("http", WorkloadFactory::of::<AlwaysStarts>())]).expect("ok");

        for name in ["", "HTTP", "http ", "https", "unknown-name"] {
            match registry.resolve(name) {
                Err(LaunchError::UnknownWorkload { name: got, known }) => {
                    assert_eq!(got, name);
                    assert_eq!(known, vec!["http".to_string()]);
                }
                other => panic!("expected UnknownWorkload for {name:?}, got {other:?}"),
            }
        }
        assert!(!registry.contains("HTTP"));
    }

    #[test]
    fn duplicate_registration_keeps_the_first() {
        let first = WorkloadFactory::of::<AlwaysStarts>();
        let mut registry = Registry::new();
        registry
            .register("http", first.clone())
            .expect("first registration");

        let err = registry
            .register("http", WorkloadFactory::of::<AlwaysStarts>())
            .expect_err("duplicate must fail");
        assert!(matches!(err, LaunchError::DuplicateName { ref name } if name == "http"));

        assert!(registry.resolve("http").expect("still there").ptr_eq(&first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn from_entries_fails_on_duplicates() {
        let res = Registry::from_entries([
            ("a", WorkloadFactory::of::<AlwaysStarts>()),
            ("a", WorkloadFactory::of::<AlwaysStarts>()),
        ]);
        assert!(matches!(res, Err(LaunchError::DuplicateName { .. })));
    }
}
