use std::any::type_name;
use std::fmt;

/// The "any" qualifier. An unqualified request and a request for `ANY`
/// address the same binding.
pub const ANY: &str = "";

/// Identifies a requested abstraction: a type identifier plus a qualifier.
///
/// Typed requests use [`std::any::type_name`] as the identifier, so
/// `Key::of::<dyn Greeter>()` and a method parameter declared as
/// `dyn Greeter` address the same binding. Untyped values use `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    type_name: String,
    qualifier: String,
}

impl Key {
    pub fn new(type_name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: qualifier.into(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(type_name::<T>(), ANY)
    }

    pub fn named<T: ?Sized + 'static>(qualifier: impl Into<String>) -> Self {
        Self::new(type_name::<T>(), qualifier)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn is_any(&self) -> bool {
        self.qualifier == ANY
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.type_name, self.qualifier)
    }
}
