use crate::aspect::{self, Intercepted, Matcher, Pointcut};
use crate::config::InjectorConfig;
use crate::di::chain::ChainFrame;
use crate::di::{
    Binder, Binding, BindingStore, Instance, Key, Lookup, Untargeted, downcast, downcast_trait,
};
use crate::diagnostics::{self, MODULE_LOG};
use crate::error::{Result, WeftError};
use crate::interceptor::{AssistedInterceptor, MethodInterceptor, MethodInvocationProvider};
use crate::module::Module;
use crate::null_object::{self, NullObjectGenerator, StubWriter};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Qualifier of the builtin `PathBuf` binding holding the script directory.
pub const SCRIPT_DIR: &str = "script_dir";

/// Resolves abstractions into ready-to-use instances.
///
/// The injector is a cheap handle: clones share the same binding store.
/// Resolution is reentrant, so constructors and interceptors may resolve
/// further dependencies through the handle they are given.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

struct InjectorInner {
    store: Arc<dyn BindingStore>,
    script_dir: PathBuf,
    generator: Arc<dyn NullObjectGenerator>,
}

/// A non-owning handle, held by interceptors the injector itself owns.
#[derive(Clone)]
pub struct WeakInjector(Weak<InjectorInner>);

impl WeakInjector {
    pub fn upgrade(&self) -> Result<Injector> {
        self.0
            .upgrade()
            .map(|inner| Injector { inner })
            .ok_or(WeftError::InjectorDropped)
    }
}

impl Injector {
    /// Build an injector from `module` with configuration taken from the
    /// environment.
    pub fn new(module: &dyn Module) -> Result<Self> {
        Self::with_config(module, InjectorConfig::load()?)
    }

    pub fn with_config(module: &dyn Module, config: InjectorConfig) -> Result<Self> {
        Self::with_generator(module, config, Arc::new(StubWriter))
    }

    pub fn with_generator(
        module: &dyn Module,
        config: InjectorConfig,
        generator: Arc<dyn NullObjectGenerator>,
    ) -> Result<Self> {
        let script_dir = config.resolved_script_dir();
        let inner = Arc::new_cyclic(|weak: &Weak<InjectorInner>| {
            let invocations = MethodInvocationProvider::default();
            let assisted: Arc<dyn MethodInterceptor> = Arc::new(AssistedInterceptor::new(
                WeakInjector(weak.clone()),
                invocations,
            ));

            let mut binder = Binder::new();
            binder.bind_interceptor(Pointcut::new(Matcher::Any, Matcher::Assisted, vec![assisted]));
            binder.install(module);
            binder
                .bind::<PathBuf>()
                .annotated_with(SCRIPT_DIR)
                .to_instance(script_dir.clone());
            binder
                .bind::<MethodInvocationProvider>()
                .in_singleton()
                .to_instance(invocations);
            binder
                .bind::<Injector>()
                .to_constructor(|injector: &Injector| Ok(injector.clone()));

            let container = binder.build();
            container.weave_aspects();
            tracing::debug!(bindings = container.len(), "injector built");

            InjectorInner {
                store: Arc::new(container),
                script_dir,
                generator,
            }
        });
        Ok(Self { inner })
    }

    /// Resolve through a caller-provided store. No builtin bindings or
    /// pointcuts are added.
    pub fn with_store(store: Arc<dyn BindingStore>, script_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                store,
                script_dir: script_dir.into(),
                generator: Arc::new(StubWriter),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakInjector {
        WeakInjector(Arc::downgrade(&self.inner))
    }

    pub fn script_dir(&self) -> &Path {
        &self.inner.script_dir
    }

    pub fn store(&self) -> &Arc<dyn BindingStore> {
        &self.inner.store
    }

    /// Resolve an abstraction by type identifier and qualifier.
    pub fn resolve(&self, type_name: &str, qualifier: &str) -> Result<Instance> {
        self.resolve_key(&Key::new(type_name, qualifier))
    }

    /// Resolve `key`.
    ///
    /// A key the store reports as untargeted is bound just in time and
    /// looked up once more. A key that is neither bound nor constructible
    /// fails with [`WeftError::Unbound`] after the binding table is written
    /// to `module.log` in the script directory.
    pub fn resolve_key(&self, key: &Key) -> Result<Instance> {
        let frame = ChainFrame::enter(self.identity(), key)?;
        let mut retried = false;

        loop {
            match self.inner.store.lookup(key) {
                Lookup::Found(binding) => {
                    let binding = if binding.null().is_some() {
                        self.materialize(key)?
                    } else {
                        binding
                    };
                    tracing::debug!(%key, target = %binding.target(), "resolved");
                    return binding.instantiate(self);
                }
                Lookup::NoTarget(untargeted) => {
                    if retried || frame.is_implicit(key) {
                        tracing::error!(%key, "untargeted after just-in-time binding");
                        return Err(WeftError::ResolutionLoop { key: key.clone() });
                    }
                    if self.bind_implicit(key, untargeted)? {
                        frame.mark_implicit(key);
                    }
                    retried = true;
                }
                Lookup::Unbound => return Err(self.unbound(key)),
            }
        }
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_named(crate::di::ANY)
    }

    pub fn get_named<T: Send + Sync + 'static>(&self, qualifier: &str) -> Result<Arc<T>> {
        downcast(self.resolve_key(&Key::named::<T>(qualifier))?)
    }

    /// Resolve a trait object bound with `to_trait_instance`, `to` or `to_null`.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, qualifier: &str) -> Result<Arc<T>> {
        downcast_trait(self.resolve_key(&Key::named::<T>(qualifier))?)
    }

    /// Resolve `T` as its woven form, for calls routed through interceptors.
    pub fn get_intercepted<T: ?Sized + 'static>(&self, qualifier: &str) -> Result<Arc<Intercepted>> {
        let key = Key::named::<T>(qualifier);
        self.resolve_key(&key)?
            .downcast::<Intercepted>()
            .map_err(|_| WeftError::downcast_failed(format!("intercepted {}", key.type_name())))
    }

    /// Identity of the shared store, distinguishing this injector's
    /// resolution chain from those of other injectors on the same thread.
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Returns whether this call registered the binding.
    fn bind_implicit(&self, key: &Key, untargeted: Untargeted) -> Result<bool> {
        let Untargeted { recipe, methods } = untargeted;
        let mut binding = Binding::implicit(key.clone(), recipe);
        if let Some(table) = methods {
            if let Some(woven) = aspect::weave(&binding, &table, &self.inner.store.pointcuts()) {
                binding = woven;
            }
        }

        match self.inner.store.register(binding) {
            Ok(binding) => {
                tracing::info!(%key, class = binding.class(), "bound just in time");
                Ok(true)
            }
            // Another thread won the race for this key; its binding is used.
            Err(WeftError::AlreadyBound { .. }) => {
                tracing::debug!(%key, "bound concurrently");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn materialize(&self, key: &Key) -> Result<Arc<Binding>> {
        let inner = &self.inner;
        let store = inner.store.as_ref();
        let load_class = |class: &str| store.load_class(class);
        let mut replace = |binding: &Binding| -> Result<Binding> {
            let null = binding.null().ok_or_else(|| {
                WeftError::materialization(key.type_name(), "binding is no longer null")
            })?;
            null_object::materialize(
                null,
                key,
                &inner.script_dir,
                inner.generator.as_ref(),
                &load_class,
            )
        };
        store.materialize_null(key, &mut replace)
    }

    fn unbound(&self, key: &Key) -> WeftError {
        let store = &self.inner.store;
        let log = self.inner.script_dir.join(MODULE_LOG);
        let dump = diagnostics::render(key, &store.bindings(), &store.pointcuts());

        match fs::write(&log, dump) {
            Ok(()) => tracing::warn!(%key, log = %log.display(), "unbound"),
            Err(e) => tracing::error!(%key, log = %log.display(), error = %e, "failed to write binding log"),
        }
        WeftError::Unbound {
            key: key.clone(),
            log,
        }
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("script_dir", &self.inner.script_dir)
            .field("bindings", &self.inner.store.bindings().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ANY;

    struct Clock;

    fn injector(dir: &Path) -> Injector {
        let module = |binder: &mut Binder| {
            binder.bind::<u32>().annotated_with("a").to_instance(1_u32);
            binder.bind::<u32>().annotated_with("b").to_instance(2_u32);
            binder.constructible::<Clock>(|_| Ok(Clock));
        };
        Injector::with_config(&module, InjectorConfig::default().with_script_dir(dir)).unwrap()
    }

    #[test]
    fn test_builtin_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let injector = injector(dir.path());

        let script_dir = injector.get_named::<PathBuf>(SCRIPT_DIR).unwrap();
        assert_eq!(script_dir.as_path(), dir.path());
        assert!(injector.get::<MethodInvocationProvider>().is_ok());

        let resolved = injector.get::<Injector>().unwrap();
        assert_eq!(resolved.script_dir(), dir.path());
        assert!(Arc::ptr_eq(&resolved.inner, &injector.inner));
    }

    #[test]
    fn test_qualifiers_are_not_conflated() {
        let dir = tempfile::tempdir().unwrap();
        let injector = injector(dir.path());

        assert_eq!(*injector.get_named::<u32>("a").unwrap(), 1);
        assert_eq!(*injector.get_named::<u32>("b").unwrap(), 2);
        assert!(matches!(
            injector.get_named::<u32>(ANY),
            Err(WeftError::Unbound { .. })
        ));
    }

    #[test]
    fn test_jit_binding_registered_once() {
        let dir = tempfile::tempdir().unwrap();
        let injector = injector(dir.path());
        let before = injector.store().bindings().len();

        injector.get::<Clock>().unwrap();
        injector.get::<Clock>().unwrap();

        let bindings = injector.store().bindings();
        assert_eq!(bindings.len(), before + 1);
        assert!(bindings.iter().any(|b| b.is_implicit() && b.key() == &Key::of::<Clock>()));
    }

    #[test]
    fn test_constructor_failure_surfaces_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let module = |binder: &mut Binder| {
            binder
                .bind::<Clock>()
                .to_constructor(|_| Err(anyhow::anyhow!("clock drifted").into()));
        };
        let injector =
            Injector::with_config(&module, InjectorConfig::default().with_script_dir(dir.path()))
                .unwrap();

        match injector.get::<Clock>().map(|_| ()) {
            Err(WeftError::Provision(e)) => assert_eq!(e.to_string(), "clock drifted"),
            other => panic!("expected a provision failure, got {other:?}"),
        }
    }

    #[test]
    fn test_weak_handle_outlived() {
        let dir = tempfile::tempdir().unwrap();
        let weak = injector(dir.path()).downgrade();
        assert!(matches!(weak.upgrade(), Err(WeftError::InjectorDropped)));
    }
}
