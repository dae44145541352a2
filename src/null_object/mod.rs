//! Null-object bindings
//!
//! An interface that is deliberately left without an implementation is bound
//! to a [`NullBinding`]. On first resolution the binding is materialized: a
//! stub artifact for the interface is generated into the script directory
//! (or reused if it is already there) and the binding is replaced with one
//! that constructs the no-op class registered under the generated name.

use crate::di::{Binding, Constructor, Injector, Instance, Key, Recipe, Target};
use crate::error::{Result, WeftError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod generator;

pub use generator::{GeneratedType, NullObjectGenerator, StubDescriptor, StubWriter};

/// A binding whose implementation has not been materialized yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullBinding {
    interface: String,
}

impl NullBinding {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// A no-op implementation of an interface.
///
/// Usually produced by [`null_object!`](crate::null_object!).
pub trait NullObject: Default + Send + Sync + 'static {
    /// Wrap `self` as the interface's trait object.
    fn into_instance(self) -> Instance;
}

/// The fallback when no no-op class was loaded for a generated name.
/// It implements nothing, so only untyped consumers can use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullStub {
    pub interface: String,
    pub class: String,
}

/// Class name derived from an interface, with every character that is not
/// legal in a file name replaced by `_`. Namespace separators (`::`) collapse
/// to a single `_`.
pub fn null_class_name(interface: &str) -> String {
    let sanitized: String = interface
        .replace("::", "_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{sanitized}Null")
}

/// Turn a null binding into a concrete one.
///
/// `script_dir` must already exist. The generated class is looked up with
/// `load_class`; the returned binding constructs it with no arguments and
/// no setter injections.
pub fn materialize(
    null: &NullBinding,
    key: &Key,
    script_dir: &Path,
    generator: &dyn NullObjectGenerator,
    load_class: &dyn Fn(&str) -> Option<Recipe>,
) -> Result<Binding> {
    if !script_dir.is_dir() {
        return Err(WeftError::materialization(
            null.interface(),
            format!("script directory {} does not exist", script_dir.display()),
        ));
    }

    let generated = generator.generate(null.interface(), script_dir)?;
    let recipe = load_class(generated.name()).unwrap_or_else(|| {
        tracing::warn!(
            class = generated.name(),
            "no null object class loaded, falling back to an inert stub"
        );
        stub_recipe(null.interface(), generated.name())
    });

    tracing::info!(
        interface = null.interface(),
        class = recipe.class(),
        artifact = %generated.path().display(),
        "null object materialized"
    );
    Ok(Binding::new(key.clone(), Target::Provider(recipe)))
}

fn stub_recipe(interface: &str, class: &str) -> Recipe {
    let stub = NullStub {
        interface: interface.to_string(),
        class: class.to_string(),
    };
    let construct: Constructor =
        Arc::new(move |_: &Injector| Ok(Arc::new(stub.clone()) as Instance));
    Recipe::from_constructor(class, construct)
}

/// Default location for generated artifacts.
pub fn default_script_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Declares a no-op implementation of a trait.
///
/// Every listed method ignores its arguments and returns `Default::default()`.
/// The listed methods must cover the whole trait.
///
/// ```ignore
/// null_object! {
///     pub struct NullMailer: Mailer {
///         fn send(&self, to: &str, body: &str) -> bool;
///         fn flush(&self);
///     }
/// }
/// ```
#[macro_export]
macro_rules! null_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $($iface:ident)::+ {
            $( fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) $(-> $ret:ty)?; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        $vis struct $name;

        impl $($iface)::+ for $name {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) $(-> $ret)? {
                    $( let _ = $arg; )*
                    ::core::default::Default::default()
                }
            )*
        }

        impl $crate::NullObject for $name {
            fn into_instance(self) -> $crate::Instance {
                let object: ::std::sync::Arc<dyn $($iface)::+> = ::std::sync::Arc::new(self);
                ::std::sync::Arc::new(object)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::ANY;

    #[test]
    fn test_null_class_name_is_path_safe() {
        assert_eq!(null_class_name("dyn app::mail::Mailer"), "dyn_app_mail_MailerNull");
        assert_eq!(null_class_name("Repo<u8>"), "Repo_u8_Null");
        assert_eq!(null_class_name("dyn a::B"), null_class_name("dyn a::B"));
    }

    #[test]
    fn test_materialize_requires_script_dir() {
        let null = NullBinding::new("dyn a::Mailer");
        let missing = Path::new("/definitely/not/a/dir");
        let result = materialize(
            &null,
            &Key::new(null.interface(), ANY),
            missing,
            &StubWriter,
            &|_| None,
        );
        assert!(matches!(result, Err(WeftError::Materialization { .. })));
    }

    #[test]
    fn test_materialize_falls_back_to_stub() {
        let dir = tempfile::tempdir().unwrap();
        let null = NullBinding::new("dyn a::Mailer");
        let binding = materialize(
            &null,
            &Key::new(null.interface(), ANY),
            dir.path(),
            &StubWriter,
            &|_| None,
        )
        .unwrap();

        assert_eq!(binding.class(), Some("dyn_a_MailerNull"));
        assert!(binding.null().is_none());
        assert!(dir.path().join("dyn_a_MailerNull.json").is_file());
    }
}
