use crate::interceptor::MethodTable;
use crate::di::{Injectable, Injector, Instance, Recipe};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Registry entry for a class the injector may construct just in time
///
/// `#[derive(Injectable)]` submits one entry per concrete type using
/// `#[linkme::distributed_slice(CLASSES)]`.
pub struct ClassEntry {
    /// The class name, as reported by `std::any::type_name`
    pub name: fn() -> &'static str,
    /// Constructs the class, resolving its dependencies
    pub construct: fn(&Injector) -> Result<Instance>,
}

impl ClassEntry {
    pub fn provide<T: Injectable>(injector: &Injector) -> Result<Instance> {
        Ok(Arc::new(T::inject(injector)?))
    }
}

// Auto-collection via linkme distributed slices - derived types submit entries at compile time
#[linkme::distributed_slice]
pub static CLASSES: [ClassEntry] = [..];

/// Explicit class loading: maps class names to constructors and method tables.
///
/// Lookups consult explicitly registered recipes first and fall back to
/// [`CLASSES`]. Generated null objects are registered here under their
/// generated class name.
#[derive(Default)]
pub struct ClassRegistry {
    recipes: DashMap<String, Recipe>,
    methods: DashMap<String, Arc<MethodTable>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, recipe: Recipe) {
        self.recipes.insert(recipe.class().to_string(), recipe);
    }

    pub fn register_methods(&self, table: MethodTable) {
        self.methods
            .insert(table.class().to_string(), Arc::new(table));
    }

    pub fn recipe(&self, class: &str) -> Option<Recipe> {
        if let Some(recipe) = self.recipes.get(class) {
            return Some(recipe.value().clone());
        }

        let entry = CLASSES.iter().find(|entry| (entry.name)() == class)?;
        let recipe = Recipe::from_constructor(class, Arc::new(entry.construct));
        Some(
            self.recipes
                .entry(class.to_string())
                .or_insert(recipe)
                .value()
                .clone(),
        )
    }

    pub fn methods(&self, class: &str) -> Option<Arc<MethodTable>> {
        self.methods.get(class).map(|table| table.value().clone())
    }

    pub fn is_constructible(&self, class: &str) -> bool {
        self.recipes.contains_key(class) || CLASSES.iter().any(|entry| (entry.name)() == class)
    }
}
