mod binder;
mod binding;
mod chain;
mod container;
mod injectable;
mod injector;
mod instance;
mod key;
mod registry;

pub use binder::{Binder, BindingBuilder, Untyped};
pub use binding::{Binding, Caster, Constructor, Recipe, Scope, Setter, Target};
pub use container::{BindingStore, Container, Lookup, Untargeted};
pub use injectable::Injectable;
pub use injector::{Injector, SCRIPT_DIR, WeakInjector};
pub use instance::{Instance, downcast, downcast_trait, trait_instance};
pub use key::{ANY, Key};
pub use registry::{CLASSES, ClassEntry, ClassRegistry};
