use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use weft::di::{Binding, BindingStore, Lookup, Recipe, Setter, Untargeted, downcast};
use weft::null_object::null_class_name;
use weft::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn injector(dir: &Path, module: impl Fn(&mut Binder)) -> Injector {
    init_tracing();
    Injector::with_config(&module, InjectorConfig::default().with_script_dir(dir)).unwrap()
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Injectable)]
struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}")
    }
}

#[derive(Injectable)]
struct Reception {
    greeter: Arc<dyn Greeter>,
}

#[derive(Debug, Injectable)]
struct Widget;

#[derive(Injectable)]
struct Helper;

impl Helper {
    fn polish(&self, sentence: &str) -> String {
        format!("{sentence}!")
    }
}

#[derive(Injectable)]
struct Greeting;

impl Greeting {
    fn greet(&self, name: &str, helper: &Helper) -> String {
        helper.polish(&format!("Hello, {name}"))
    }
}

impl Interceptable for Greeting {
    fn methods() -> Methods<Self> {
        Methods::<Self>::new().method(
            MethodDescriptor::new("greet")
                .param(ParamDescriptor::new::<String>("name"))
                .param(ParamDescriptor::new::<Helper>("helper"))
                .assisted(&["helper"]),
            |this, args| Ok(this.greet(&*args.get::<String>("name")?, &*args.get::<Helper>("helper")?)),
        )
    }
}

#[test]
fn test_end_to_end_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |binder| {
        binder.bind_untyped().annotated_with("type-int").to_value(1_i32);
        binder.interceptable::<Greeting>();
    });

    // Declared binding, addressed by qualifier alone
    let one = injector.resolve("", "type-int").unwrap();
    assert_eq!(*downcast::<i32>(one).unwrap(), 1);

    // Nothing declared for the interface
    let err = injector.resolve("Greeter", ANY).unwrap_err();
    let WeftError::Unbound { key, log } = &err else {
        panic!("expected Unbound, got {err}");
    };
    assert_eq!(key, &Key::new("Greeter", ANY));
    assert_eq!(log, &dir.path().join("module.log"));
    assert!(err.to_string().contains("Greeter-"));
    assert!(err.to_string().contains(&log.display().to_string()));
    let dump = fs::read_to_string(log).unwrap();
    assert!(!dump.is_empty());
    assert!(dump.contains("Greeter-"));
    assert!(dump.contains("-type-int => (instance)"));

    // Never declared, constructible
    assert!(injector.get::<Widget>().is_ok());

    // `helper` is supplied by the container, `name` by the caller
    let greeting = injector.get_intercepted::<Greeting>(ANY).unwrap();
    let greeted = greeting
        .call::<String>("greet", NamedArguments::new().with("name", "Bob".to_string()))
        .unwrap();
    assert_eq!(greeted.as_str(), "Hello, Bob!");
}

#[test]
fn test_linked_trait_binding_feeds_derived_fields() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |binder| {
        binder.bind::<dyn Greeter>().to::<English, _>(|english| english);
    });

    let reception = injector.get::<Reception>().unwrap();
    assert_eq!(reception.greeter.greet("Ada"), "Hello, Ada");
    assert_eq!(injector.get_trait::<dyn Greeter>(ANY).unwrap().greet("Bo"), "Hello, Bo");
}

#[test]
fn test_unbound_trait_dependency_surfaces_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |_| {});

    match injector.get::<Reception>().map(|_| ()) {
        Err(WeftError::Unbound { key, .. }) => assert_eq!(key, Key::of::<dyn Greeter>()),
        other => panic!("expected Unbound, got {other:?}"),
    }
    // The class itself was still bound just in time
    assert!(
        injector
            .store()
            .bindings()
            .iter()
            .any(|binding| binding.key() == &Key::of::<Reception>())
    );
}

#[test]
fn test_qualifier_routing() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |binder| {
        binder.bind::<String>().annotated_with("a").to_instance("alpha".to_string());
        binder.bind::<String>().annotated_with("b").to_instance("beta".to_string());
    });

    assert_eq!(injector.get_named::<String>("a").unwrap().as_str(), "alpha");
    assert_eq!(injector.get_named::<String>("b").unwrap().as_str(), "beta");
    assert!(matches!(
        injector.get_named::<String>("c"),
        Err(WeftError::Unbound { .. })
    ));
}

#[test]
fn test_jit_binds_once() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |_| {});
    let implicit = |injector: &Injector| {
        injector
            .store()
            .bindings()
            .iter()
            .filter(|binding| binding.is_implicit())
            .count()
    };

    let first = injector.get::<Widget>().unwrap();
    assert_eq!(implicit(&injector), 1);
    let second = injector.get::<Widget>().unwrap();
    assert_eq!(implicit(&injector), 1);
    // Prototype scope
    assert!(!Arc::ptr_eq(&first, &second));
}

/// A store that never stops reporting the key as untargeted.
#[derive(Default)]
struct AlwaysUntargeted {
    registered: AtomicUsize,
}

impl BindingStore for AlwaysUntargeted {
    fn lookup(&self, _key: &Key) -> Lookup {
        Lookup::NoTarget(Untargeted {
            recipe: Recipe::new(|_| Ok(Widget)),
            methods: None,
        })
    }

    fn register(&self, binding: Binding) -> Result<Arc<Binding>> {
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(binding))
    }

    fn materialize_null(
        &self,
        key: &Key,
        _materialize: &mut dyn FnMut(&Binding) -> Result<Binding>,
    ) -> Result<Arc<Binding>> {
        Err(WeftError::materialization(key.type_name(), "no null bindings here"))
    }

    fn load_class(&self, _class: &str) -> Option<Recipe> {
        None
    }

    fn bindings(&self) -> Vec<Arc<Binding>> {
        Vec::new()
    }

    fn pointcuts(&self) -> Vec<Pointcut> {
        Vec::new()
    }
}

#[test]
fn test_resolution_loop_fails_fast() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AlwaysUntargeted::default());
    let injector = Injector::with_store(store.clone(), dir.path());

    match injector.get::<Widget>() {
        Err(WeftError::ResolutionLoop { key }) => assert_eq!(key, Key::of::<Widget>()),
        other => panic!("expected ResolutionLoop, got {other:?}"),
    }
    assert_eq!(store.registered.load(Ordering::SeqCst), 1);
}

static DISPATCHED: AtomicUsize = AtomicUsize::new(0);

struct Calculator;

impl Interceptable for Calculator {
    fn methods() -> Methods<Self> {
        Methods::new()
            .method(
                MethodDescriptor::new("add")
                    .param(ParamDescriptor::new::<u32>("p").named("answer").inject())
                    .param(ParamDescriptor::new::<u32>("q")),
                |_, args| Ok(*args.get::<u32>("p")? + *args.get::<u32>("q")?),
            )
            .method(
                MethodDescriptor::new("greet")
                    .param(ParamDescriptor::new::<dyn Greeter>("greeter").inject()),
                |_, args| {
                    DISPATCHED.fetch_add(1, Ordering::SeqCst);
                    Ok(args.get_trait::<dyn Greeter>("greeter")?.greet("x"))
                },
            )
            .method(
                MethodDescriptor::new("current")
                    .param(ParamDescriptor::new::<MethodInvocationProvider>("invocations").inject()),
                |_, args| {
                    let current = args
                        .get::<MethodInvocationProvider>("invocations")?
                        .current()?;
                    Ok(format!("{}::{}", current.class(), current.method().name()))
                },
            )
            .method(
                MethodDescriptor::new("increment")
                    .param(ParamDescriptor::untyped("step").named("type-int").inject())
                    .param(ParamDescriptor::new::<i32>("n")),
                |_, args| Ok(*args.get::<i32>("step")? + *args.get::<i32>("n")?),
            )
            .method(MethodDescriptor::new("plain"), |_, _| Ok(()))
    }
}

fn calculator_injector(dir: &Path) -> Injector {
    injector(dir, |binder| {
        binder.interceptable::<Calculator>();
        binder.bind::<Calculator>().to_constructor(|_| Ok(Calculator));
        binder.bind::<u32>().annotated_with("answer").to_instance(42_u32);
        binder.bind_untyped().annotated_with("type-int").to_value(1_i32);
    })
}

#[test]
fn test_injection_overrides_caller_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let injector = calculator_injector(dir.path());
    let calculator = injector.get_intercepted::<Calculator>(ANY).unwrap();

    let sum = calculator
        .call::<u32>("add", NamedArguments::new().with("p", 7_u32).with("q", 1_u32))
        .unwrap();
    assert_eq!(*sum, 43);
}

#[test]
fn test_untyped_parameter_injected_by_qualifier() {
    let dir = tempfile::tempdir().unwrap();
    let injector = calculator_injector(dir.path());
    let calculator = injector.get_intercepted::<Calculator>(ANY).unwrap();

    let next = calculator
        .call::<i32>("increment", NamedArguments::new().with("step", 10_i32).with("n", 4_i32))
        .unwrap();
    assert_eq!(*next, 5);
}

#[test]
fn test_failed_injection_is_not_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let injector = calculator_injector(dir.path());
    let calculator = injector.get_intercepted::<Calculator>(ANY).unwrap();

    let result = calculator.invoke("greet", NamedArguments::new());
    assert!(matches!(result, Err(WeftError::Unbound { .. })));
    assert_eq!(DISPATCHED.load(Ordering::SeqCst), 0);
}

#[test]
fn test_current_invocation_lives_for_the_call() {
    let dir = tempfile::tempdir().unwrap();
    let injector = calculator_injector(dir.path());
    let calculator = injector.get_intercepted::<Calculator>(ANY).unwrap();

    let current = calculator
        .call::<String>("current", NamedArguments::new())
        .unwrap();
    assert_eq!(
        current.as_str(),
        format!("{}::current", std::any::type_name::<Calculator>())
    );
    assert!(matches!(
        MethodInvocationProvider.current(),
        Err(WeftError::NoInvocation)
    ));
    // Methods without injected parameters are not intercepted, and still callable
    assert!(calculator.invoke("plain", NamedArguments::new()).is_ok());
}

trait Mailer: Send + Sync {
    fn send(&self, to: &str) -> bool;
    fn queued(&self) -> usize;
}

weft::null_object! {
    struct NullMailer: Mailer {
        fn send(&self, to: &str) -> bool;
        fn queued(&self) -> usize;
    }
}

fn mailer_module(binder: &mut Binder) {
    binder.bind::<dyn Mailer>().to_null::<NullMailer>();
}

fn artifacts(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_null_object_materialized_once() {
    let dir = tempfile::tempdir().unwrap();
    let generated = null_class_name(std::any::type_name::<dyn Mailer>());
    let class_of = |injector: &Injector| {
        injector
            .store()
            .bindings()
            .iter()
            .find(|binding| binding.key() == &Key::of::<dyn Mailer>())
            .and_then(|binding| binding.class().map(str::to_string))
    };

    let injector = injector(dir.path(), mailer_module);
    let mailer = injector.get_trait::<dyn Mailer>(ANY).unwrap();
    assert!(!mailer.send("ops@example.com"));
    assert_eq!(mailer.queued(), 0);
    assert_eq!(class_of(&injector).as_deref(), Some(generated.as_str()));

    injector.get_trait::<dyn Mailer>(ANY).unwrap();
    assert_eq!(class_of(&injector).as_deref(), Some(generated.as_str()));

    // A fresh injector over the same directory reuses the artifact
    let restarted = self::injector(dir.path(), mailer_module);
    restarted.get_trait::<dyn Mailer>(ANY).unwrap();
    assert_eq!(class_of(&restarted).as_deref(), Some(generated.as_str()));

    assert_eq!(artifacts(dir.path()), vec![format!("{generated}.json")]);
}

#[test]
fn test_null_object_needs_existing_script_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script_dir = dir.path().join("scripts");
    fs::create_dir(&script_dir).unwrap();
    let injector = injector(&script_dir, mailer_module);
    fs::remove_dir(&script_dir).unwrap();

    assert!(matches!(
        injector.get_trait::<dyn Mailer>(ANY),
        Err(WeftError::Materialization { .. })
    ));
    // The binding stays null, so a later attempt can still succeed
    fs::create_dir(&script_dir).unwrap();
    assert!(injector.get_trait::<dyn Mailer>(ANY).is_ok());
}

#[test]
fn test_concurrent_resolution_races() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), mailer_module);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                injector.get_trait::<dyn Mailer>(ANY).unwrap();
                injector.get::<Widget>().unwrap();
            });
        }
    });

    let bindings = injector.store().bindings();
    let widgets = bindings
        .iter()
        .filter(|binding| binding.key() == &Key::of::<Widget>())
        .count();
    assert_eq!(widgets, 1);
    assert_eq!(artifacts(dir.path()).len(), 1);
}

#[derive(Injectable)]
#[allow(dead_code)]
struct Chicken {
    egg: Arc<Egg>,
}

#[derive(Injectable)]
#[allow(dead_code)]
struct Egg {
    chicken: Arc<Chicken>,
}

#[test]
fn test_circular_dependency_reported() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |_| {});

    match injector.get::<Chicken>().map(|_| ()) {
        Err(WeftError::CircularDependency { cycle }) => {
            assert!(cycle.contains("Chicken"));
            assert!(cycle.contains("Egg"));
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

struct Session {
    id: usize,
    port: u16,
}

#[test]
fn test_singleton_scope_and_setters() {
    let dir = tempfile::tempdir().unwrap();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let injector = injector(dir.path(), move |binder| {
        let counter = counter.clone();
        let port: Setter<Session> = Arc::new(|session: &mut Session, injector: &Injector| -> Result<()> {
            session.port = *injector.get_named::<u16>("port")?;
            Ok(())
        });
        binder.bind::<u16>().annotated_with("port").to_instance(5432_u16);
        binder.bind::<Session>().in_singleton().to_constructor_with(
            move |_| {
                Ok(Session {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                    port: 0,
                })
            },
            vec![port],
        );
    });

    let first = injector.get::<Session>().unwrap();
    let second = injector.get::<Session>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id, 0);
    assert_eq!(first.port, 5432);
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

struct Gadget;

#[test]
fn test_nested_injectors_keep_separate_chains() {
    let dir = tempfile::tempdir().unwrap();
    let inner = injector(dir.path(), |binder| {
        binder.bind::<u32>().to_instance(7_u32);
    });
    let outer = injector(dir.path(), |binder| {
        let inner = inner.clone();
        binder
            .bind::<u32>()
            .to_constructor(move |_| Ok(*inner.get::<u32>()? + 1));
    });
    assert_eq!(*outer.get::<u32>().unwrap(), 8);

    // Both injectors bind `Widget` just in time within one chain.
    let other = injector(dir.path(), |_| {});
    let gadgets = injector(dir.path(), |binder| {
        let other = other.clone();
        binder.bind::<Gadget>().to_constructor(move |own: &Injector| {
            own.get::<Widget>()?;
            other.get::<Widget>()?;
            Ok(Gadget)
        });
    });
    assert!(gadgets.get::<Gadget>().is_ok());
}

#[derive(Injectable)]
struct Workbench {
    injector: Arc<Injector>,
}

#[test]
fn test_injector_resolves_itself() {
    let dir = tempfile::tempdir().unwrap();
    let injector = injector(dir.path(), |binder| {
        binder.bind::<u32>().to_instance(3_u32);
    });

    let workbench = injector.get::<Workbench>().unwrap();
    assert_eq!(workbench.injector.script_dir(), dir.path());
    assert_eq!(*workbench.injector.get::<u32>().unwrap(), 3);
}
