use crate::aspect::Intercepted;
use crate::error::{Result, WeftError};
use std::any::{Any, type_name};
use std::sync::Arc;

/// A type-erased, shareable instance produced by the injector.
///
/// Trait objects are stored as `Arc<Arc<dyn Trait>>`: the inner `Arc<dyn Trait>`
/// is itself `Sized`, so it can live behind `dyn Any`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Downcast an instance to a concrete type.
///
/// Woven instances are looked through, so a binding that gained
/// interceptors still resolves as its original class.
pub fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    match instance.downcast::<T>() {
        Ok(typed) => Ok(typed),
        Err(other) => match other.downcast::<Intercepted>() {
            Ok(woven) => woven
                .target()
                .clone()
                .downcast::<T>()
                .map_err(|_| WeftError::downcast_failed(type_name::<T>())),
            Err(_) => Err(WeftError::downcast_failed(type_name::<T>())),
        },
    }
}

/// Downcast an instance holding an `Arc<dyn Trait>`.
pub fn downcast_trait<T: ?Sized + Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<Arc<T>>()
        .map(|wrapper| wrapper.as_ref().clone())
        .map_err(|_| WeftError::downcast_failed(type_name::<T>()))
}

/// Wrap a trait object so that [`downcast_trait`] can recover it.
pub fn trait_instance<T: ?Sized + Send + Sync + 'static>(object: Arc<T>) -> Instance {
    Arc::new(object)
}
