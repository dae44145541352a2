use crate::aspect::Pointcut;
use crate::di::{
    Binding, Caster, Constructor, Container, Injectable, Injector, Instance, Key, Recipe, Scope, Setter,
    Target, downcast, trait_instance,
};
use crate::error::Result;
use crate::interceptor::Interceptable;
use crate::module::Module;
use crate::null_object::{NullBinding, NullObject, null_class_name};
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collects bindings, pointcuts and classes declared by modules.
///
/// # Example
/// ```ignore
/// let mut binder = Binder::new();
/// binder.bind::<u32>().annotated_with("port").to_instance(8080_u32);
/// binder.bind::<dyn Greeter>().to::<EnglishGreeter, _>(|greeter| greeter);
/// binder.bind::<dyn Mailer>().to_null::<NullMailer>();
/// let container = binder.build();
/// ```
#[derive(Default)]
pub struct Binder {
    container: Container,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a binding for the abstraction `T`.
    pub fn bind<T: ?Sized + 'static>(&mut self) -> BindingBuilder<'_, T> {
        BindingBuilder::new(self, Key::of::<T>())
    }

    /// Start a binding with no declared type. It is addressed by qualifier
    /// alone, as `resolve("", qualifier)`.
    pub fn bind_untyped(&mut self) -> BindingBuilder<'_, Untyped> {
        BindingBuilder::new(self, Key::new("", crate::di::ANY))
    }

    pub fn bind_interceptor(&mut self, pointcut: Pointcut) -> &mut Self {
        tracing::debug!(%pointcut, "pointcut declared");
        self.container.bind_interceptor(pointcut);
        self
    }

    /// Register the method table of `T` so its bindings can be woven.
    pub fn interceptable<T: Interceptable>(&mut self) -> &mut Self {
        self.container.classes().register_methods(T::methods().build());
        self
    }

    /// Make `T` constructible just in time with `construct`.
    pub fn constructible<T: Send + Sync + 'static>(
        &mut self,
        construct: impl Fn(&Injector) -> Result<T> + Send + Sync + 'static,
    ) -> &mut Self {
        self.container.classes().register(Recipe::new(construct));
        self
    }

    /// Make `T` constructible just in time through its [`Injectable`] impl.
    /// Only needed for types the derive cannot announce, such as generic ones.
    pub fn injectable<T: Injectable>(&mut self) -> &mut Self {
        self.container.classes().register(Recipe::injectable::<T>());
        self
    }

    pub fn install(&mut self, module: &dyn Module) -> &mut Self {
        module.configure(self);
        self
    }

    pub fn build(self) -> Container {
        self.container
    }

    fn declare(&mut self, binding: Binding) {
        tracing::debug!(%binding, "binding declared");
        if let Some(previous) = self.container.insert(binding) {
            tracing::debug!(key = %previous.key(), "earlier binding overridden");
        }
    }
}

/// Marker for bindings declared with [`Binder::bind_untyped`].
pub enum Untyped {}

/// Declares one binding. Nothing is stored until a `to_*` method is called.
#[must_use = "a binding is only declared by one of the `to_*` methods"]
pub struct BindingBuilder<'a, T: ?Sized> {
    binder: &'a mut Binder,
    key: Key,
    scope: Scope,
    _marker: PhantomData<fn(&T)>,
}

impl<'a, T: ?Sized + 'static> BindingBuilder<'a, T> {
    fn new(binder: &'a mut Binder, key: Key) -> Self {
        Self {
            binder,
            key,
            scope: Scope::default(),
            _marker: PhantomData,
        }
    }

    pub fn annotated_with(mut self, qualifier: impl Into<String>) -> Self {
        self.key = Key::new(self.key.type_name(), qualifier);
        self
    }

    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn in_singleton(self) -> Self {
        self.in_scope(Scope::Singleton)
    }

    pub fn to_recipe(self, recipe: Recipe) {
        self.declare(Target::Provider(recipe));
    }

    /// Bind to the implementation `U`, converted with `cast`. `U` is
    /// resolved under the any qualifier, so it may be bound just in time.
    pub fn to<U, F>(self, cast: F)
    where
        T: Send + Sync,
        U: Send + Sync + 'static,
        F: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: Instance| -> Result<Instance> {
            Ok(trait_instance(cast(downcast::<U>(instance)?)))
        });
        self.declare(Target::Linked {
            to: Key::of::<U>(),
            caster,
        });
    }

    pub fn to_trait_instance(self, object: Arc<T>)
    where
        T: Send + Sync,
    {
        self.declare(Target::Instance(trait_instance(object)));
    }

    /// Bind the interface `T` to the no-op implementation `N`.
    ///
    /// `N` is registered as the class generated for `T`, and is only
    /// constructed after the null binding is materialized on first resolution.
    pub fn to_null<N: NullObject>(self) {
        let construct: Constructor =
            Arc::new(|_: &Injector| -> Result<Instance> { Ok(N::default().into_instance()) });
        self.binder
            .container
            .classes()
            .register(Recipe::from_constructor(null_class_name(type_name::<T>()), construct));
        self.to_null_stub();
    }

    /// Leave `T` deliberately unimplemented. Without a registered no-op class
    /// the materialized binding yields an inert [`NullStub`](crate::null_object::NullStub).
    pub fn to_null_stub(self) {
        let null = NullBinding::new(type_name::<T>());
        self.declare(Target::Null(null));
    }

    fn declare(self, target: Target) {
        let binding = Binding::new(self.key, target).in_scope(self.scope);
        self.binder.declare(binding);
    }
}

impl<T: Send + Sync + 'static> BindingBuilder<'_, T> {
    pub fn to_instance(self, value: T) {
        self.declare(Target::Instance(Arc::new(value)));
    }

    pub fn to_constructor(self, construct: impl Fn(&Injector) -> Result<T> + Send + Sync + 'static) {
        self.to_recipe(Recipe::new(construct));
    }

    /// Construct with `construct`, then run `setters` in order.
    pub fn to_constructor_with(
        self,
        construct: impl Fn(&Injector) -> Result<T> + Send + Sync + 'static,
        setters: Vec<Setter<T>>,
    ) {
        self.to_recipe(Recipe::with_setters(construct, setters));
    }

    pub fn to_injectable(self)
    where
        T: Injectable,
    {
        self.to_recipe(Recipe::injectable::<T>());
    }
}

impl BindingBuilder<'_, Untyped> {
    pub fn to_value<V: Send + Sync + 'static>(self, value: V) {
        self.declare(Target::Instance(Arc::new(value)));
    }
}
