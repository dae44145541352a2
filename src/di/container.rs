use crate::aspect::{self, Pointcut};
use crate::di::{Binding, ClassRegistry, Key, Recipe};
use crate::error::{Result, WeftError};
use crate::interceptor::MethodTable;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::sync::Arc;

/// Outcome of a store lookup.
pub enum Lookup {
    Found(Arc<Binding>),
    /// Nothing is declared for the key, but its type is a constructible class.
    NoTarget(Untargeted),
    /// Nothing is declared and nothing can be constructed.
    Unbound,
}

/// What the store knows about an undeclared but constructible class.
#[derive(Clone)]
pub struct Untargeted {
    pub recipe: Recipe,
    pub methods: Option<Arc<MethodTable>>,
}

/// Holds bindings keyed by [`Key`].
///
/// Implementations must make `register` and `materialize_null` atomic per key:
/// concurrent callers for the same key never observe two entries.
pub trait BindingStore: Send + Sync {
    fn lookup(&self, key: &Key) -> Lookup;

    /// Insert a binding for a vacant key. Fails with `AlreadyBound` otherwise.
    fn register(&self, binding: Binding) -> Result<Arc<Binding>>;

    /// Replace the null binding under `key` with the binding `materialize`
    /// returns. If the entry is no longer null, `materialize` is not called and
    /// the current binding is returned.
    fn materialize_null(
        &self,
        key: &Key,
        materialize: &mut dyn FnMut(&Binding) -> Result<Binding>,
    ) -> Result<Arc<Binding>>;

    /// Explicit class loading by name.
    fn load_class(&self, class: &str) -> Option<Recipe>;

    fn bindings(&self) -> Vec<Arc<Binding>>;

    fn pointcuts(&self) -> Vec<Pointcut>;
}

/// Thread-safe binding store.
#[derive(Default)]
pub struct Container {
    bindings: DashMap<Key, Arc<Binding>>,
    classes: ClassRegistry,
    pointcuts: RwLock<Vec<Pointcut>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a binding, replacing any earlier declaration for the same key.
    pub fn insert(&self, binding: Binding) -> Option<Arc<Binding>> {
        self.bindings
            .insert(binding.key().clone(), Arc::new(binding))
    }

    pub fn bind_interceptor(&self, pointcut: Pointcut) {
        self.pointcuts.write().push(pointcut);
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn get(&self, key: &Key) -> Option<Arc<Binding>> {
        self.bindings.get(key).map(|binding| binding.value().clone())
    }

    /// Apply every pointcut to every declared binding whose class has a method table.
    pub fn weave_aspects(&self) {
        let pointcuts = self.pointcuts.read().clone();
        if pointcuts.is_empty() {
            return;
        }

        for mut entry in self.bindings.iter_mut() {
            let Some(table) = entry.class().and_then(|class| self.classes.methods(class)) else {
                continue;
            };
            if let Some(woven) = aspect::weave(entry.value(), &table, &pointcuts) {
                tracing::debug!(key = %entry.key(), "woven");
                *entry.value_mut() = Arc::new(woven);
            }
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl BindingStore for Container {
    fn lookup(&self, key: &Key) -> Lookup {
        if let Some(binding) = self.bindings.get(key) {
            return Lookup::Found(binding.value().clone());
        }

        // Qualified keys are never bound just in time.
        if key.is_any() {
            if let Some(recipe) = self.classes.recipe(key.type_name()) {
                let methods = self.classes.methods(recipe.class());
                return Lookup::NoTarget(Untargeted { recipe, methods });
            }
        }

        Lookup::Unbound
    }

    fn register(&self, binding: Binding) -> Result<Arc<Binding>> {
        match self.bindings.entry(binding.key().clone()) {
            Entry::Occupied(entry) => Err(WeftError::AlreadyBound {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let binding = Arc::new(binding);
                entry.insert(binding.clone());
                Ok(binding)
            }
        }
    }

    fn materialize_null(
        &self,
        key: &Key,
        materialize: &mut dyn FnMut(&Binding) -> Result<Binding>,
    ) -> Result<Arc<Binding>> {
        // The shard stays write-locked until the replacement is stored.
        let mut entry = self.bindings.get_mut(key).ok_or_else(|| {
            WeftError::materialization(key.type_name(), "no binding registered")
        })?;

        if entry.null().is_none() {
            return Ok(entry.value().clone());
        }

        let concrete = Arc::new(materialize(entry.value())?);
        *entry.value_mut() = concrete.clone();
        Ok(concrete)
    }

    fn load_class(&self, class: &str) -> Option<Recipe> {
        self.classes.recipe(class)
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        let mut bindings: Vec<_> = self
            .bindings
            .iter()
            .map(|binding| binding.value().clone())
            .collect();
        bindings.sort_by(|a, b| a.key().cmp(b.key()));
        bindings
    }

    fn pointcuts(&self) -> Vec<Pointcut> {
        self.pointcuts.read().clone()
    }
}
