use crate::di::{Instance, downcast, downcast_trait, trait_instance};
use crate::error::{Result, WeftError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Arguments of an intercepted call, positioned by parameter name.
#[derive(Clone, Default)]
pub struct NamedArguments {
    values: BTreeMap<String, Instance>,
}

impl NamedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<V: Send + Sync + 'static>(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<V: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: V) {
        self.insert_instance(name, Arc::new(value));
    }

    pub fn insert_trait<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: Arc<T>,
    ) {
        self.insert_instance(name, trait_instance(value));
    }

    /// Returns the value previously stored under `name`, if any.
    pub fn insert_instance(&mut self, name: impl Into<String>, value: Instance) -> Option<Instance> {
        self.values.insert(name.into(), value)
    }

    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(self.instance(name)?)
    }

    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast_trait(self.instance(name)?)
    }

    pub fn instance(&self, name: &str) -> Result<Instance> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| WeftError::MissingArgument {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for NamedArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
