//! # Weft
//!
//! The resolution and interception core of a dependency injection container.
//!
//! - **Resolution**: [`Injector::resolve`] looks a key up in the binding
//!   store, binds undeclared concrete classes just in time, and on a truly
//!   unbound key writes the binding table to `module.log` before failing.
//! - **Assisted injection**: methods of woven classes may mark parameters
//!   as container-supplied; the [`AssistedInterceptor`](interceptor::AssistedInterceptor)
//!   resolves them at call time, overriding whatever the caller passed.
//! - **Null objects**: interfaces deliberately left unimplemented are bound
//!   to a no-op class, materialized on first use and cached on disk.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weft::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Injectable)]
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello, {name}")
//!     }
//! }
//!
//! #[derive(Injectable)]
//! struct Reception {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! let module = |binder: &mut Binder| {
//!     binder.bind::<dyn Greeter>().to::<English, _>(|english| english);
//! };
//!
//! let injector = Injector::new(&module)?;
//! // `Reception` was never declared; it is bound just in time.
//! let reception = injector.get::<Reception>()?;
//! ```

extern crate self as weft;

pub mod aspect;
pub mod config;
pub mod di;
pub mod diagnostics;
pub mod error;
pub mod interceptor;
pub mod module;
pub mod null_object;

// Re-export core types
pub use config::InjectorConfig;
pub use di::{
    ANY, Binder, CLASSES, ClassEntry, Injectable, Injector, Instance, Key, Scope, WeakInjector,
};
pub use error::{Result, WeftError};
pub use module::Module;
pub use null_object::NullObject;

// Re-export macros
pub use weft_macro::Injectable;

#[doc(hidden)]
pub use linkme;

/// Prelude module for convenient imports
///
/// ```
/// use weft::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aspect::{Intercepted, Matcher, Pointcut};
    pub use crate::config::InjectorConfig;
    pub use crate::di::{ANY, Binder, Injectable, Injector, Instance, Key, Scope};
    pub use crate::error::{Result, WeftError};
    pub use crate::interceptor::{
        Interceptable, MethodDescriptor, MethodInterceptor, MethodInvocation,
        MethodInvocationProvider, Methods, NamedArguments, ParamDescriptor,
    };
    pub use crate::module::Module;
    pub use crate::null_object::NullObject;
    pub use crate::null_object;
    pub use weft_macro::Injectable;
    pub use std::sync::Arc;
}
