use crate::aspect::{Intercepted, Interception};
use crate::di::{Injectable, Injector, Instance, Key};
use crate::error::{Result, WeftError};
use crate::null_object::NullBinding;
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Builds a fully constructed instance, resolving dependencies through the injector.
pub type Constructor = Arc<dyn Fn(&Injector) -> Result<Instance> + Send + Sync>;

/// A setter injection applied to a freshly constructed value.
pub type Setter<T> = Arc<dyn Fn(&mut T, &Injector) -> Result<()> + Send + Sync>;

/// Converts a resolved implementation into the instance expected by the binding key.
pub type Caster = Arc<dyn Fn(Instance) -> Result<Instance> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    /// A new instance on every resolution
    #[default]
    Prototype,
    /// One instance per binding, created on first resolution
    Singleton,
}

/// A construction recipe: constructor plus setter injections.
#[derive(Clone)]
pub struct Recipe {
    class: String,
    setters: usize,
    construct: Constructor,
}

impl Recipe {
    pub fn new<T, F>(construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector) -> Result<T> + Send + Sync + 'static,
    {
        Self::with_setters(construct, Vec::new())
    }

    /// Setters run in order after construction. A failing setter fails the
    /// whole construction, so a half-initialized value never escapes.
    pub fn with_setters<T, F>(construct: F, setters: Vec<Setter<T>>) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Injector) -> Result<T> + Send + Sync + 'static,
    {
        let count = setters.len();
        let construct: Constructor = Arc::new(move |injector: &Injector| {
            let mut value = construct(injector)?;
            for setter in &setters {
                setter(&mut value, injector)?;
            }
            Ok(Arc::new(value) as Instance)
        });

        Self {
            class: type_name::<T>().to_string(),
            setters: count,
            construct,
        }
    }

    pub fn injectable<T: Injectable>() -> Self {
        Self::new(T::inject)
    }

    /// A recipe for a class known only by name, such as a generated null object.
    pub fn from_constructor(class: impl Into<String>, construct: Constructor) -> Self {
        Self {
            class: class.into(),
            setters: 0,
            construct,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn setter_count(&self) -> usize {
        self.setters
    }

    pub fn construct(&self, injector: &Injector) -> Result<Instance> {
        (self.construct)(injector)
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("class", &self.class)
            .field("setters", &self.setters)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub enum Target {
    Instance(Instance),
    Provider(Recipe),
    Linked { to: Key, caster: Caster },
    Null(NullBinding),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Instance(_) => write!(f, "(instance)"),
            Target::Provider(recipe) => {
                write!(f, "(dependency) {}", recipe.class())?;
                if recipe.setter_count() > 0 {
                    write!(f, " +{} setters", recipe.setter_count())?;
                }
                Ok(())
            }
            Target::Linked { to, .. } => write!(f, "(linked) {to}"),
            Target::Null(null) => write!(f, "(null) {}", null.interface()),
        }
    }
}

/// Associates a [`Key`] with a way of producing instances.
///
/// The key never changes once the binding is in a store. The only
/// transition a stored binding goes through is null to concrete,
/// performed by replacing it with the materialized binding.
#[derive(Clone)]
pub struct Binding {
    key: Key,
    target: Target,
    scope: Scope,
    implicit: bool,
    interception: Option<Interception>,
    singleton: Arc<OnceLock<Instance>>,
}

impl Binding {
    pub fn new(key: Key, target: Target) -> Self {
        Self {
            key,
            target,
            scope: Scope::default(),
            implicit: false,
            interception: None,
            singleton: Arc::new(OnceLock::new()),
        }
    }

    /// A binding synthesized for a concrete type that was never declared.
    pub fn implicit(key: Key, recipe: Recipe) -> Self {
        Self {
            implicit: true,
            ..Self::new(key, Target::Provider(recipe))
        }
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub(crate) fn with_interception(mut self, interception: Interception) -> Self {
        self.interception = Some(interception);
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_woven(&self) -> bool {
        self.interception.is_some()
    }

    pub(crate) fn interception(&self) -> Option<&Interception> {
        self.interception.as_ref()
    }

    pub fn null(&self) -> Option<&NullBinding> {
        match &self.target {
            Target::Null(null) => Some(null),
            _ => None,
        }
    }

    /// The concrete class this binding constructs, if it constructs one.
    pub fn class(&self) -> Option<&str> {
        match &self.target {
            Target::Provider(recipe) => Some(recipe.class()),
            _ => None,
        }
    }

    /// Produce an instance. Dependencies are resolved through `injector`,
    /// which may re-enter this binding's store on the same thread.
    pub fn instantiate(&self, injector: &Injector) -> Result<Instance> {
        match &self.target {
            Target::Instance(instance) => Ok(instance.clone()),
            Target::Linked { to, caster } => caster(injector.resolve_key(to)?),
            Target::Provider(recipe) if self.scope == Scope::Singleton => {
                if let Some(instance) = self.singleton.get() {
                    return Ok(instance.clone());
                }
                // Racing threads may both construct; the first stored value wins.
                let instance = self.provide(recipe, injector)?;
                Ok(self.singleton.get_or_init(|| instance).clone())
            }
            Target::Provider(recipe) => self.provide(recipe, injector),
            Target::Null(null) => Err(WeftError::materialization(
                null.interface(),
                "null binding has not been materialized",
            )),
        }
    }

    fn provide(&self, recipe: &Recipe, injector: &Injector) -> Result<Instance> {
        let instance = recipe.construct(injector)?;
        Ok(match &self.interception {
            Some(interception) => {
                Arc::new(Intercepted::new(instance, interception.clone())) as Instance
            }
            None => instance,
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.key, self.target)?;
        if self.scope != Scope::Prototype {
            write!(f, " [{}]", self.scope)?;
        }
        if self.implicit {
            write!(f, " [implicit]")?;
        }
        if let Some(interception) = &self.interception {
            write!(f, " {interception}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({self})")
    }
}
