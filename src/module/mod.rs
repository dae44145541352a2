use crate::di::Binder;

/// A unit of binding configuration
///
/// Modules declare bindings, pointcuts and constructible classes on a
/// [`Binder`], and may install other modules. Closures taking a binder
/// are modules too.
///
/// # Example
/// ```ignore
/// struct AppModule;
///
/// impl Module for AppModule {
///     fn configure(&self, binder: &mut Binder) {
///         binder.install(&StorageModule);
///         binder.bind::<dyn Greeter>().to::<EnglishGreeter, _>(|greeter| greeter);
///     }
/// }
/// ```
pub trait Module {
    fn configure(&self, binder: &mut Binder);
}

impl<F: Fn(&mut Binder)> Module for F {
    fn configure(&self, binder: &mut Binder) {
        self(binder)
    }
}

/// Declares nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModule;

impl Module for NullModule {
    fn configure(&self, _binder: &mut Binder) {}
}
