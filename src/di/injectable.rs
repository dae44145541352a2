use crate::di::Injector;
use crate::error::Result;

/// Trait for types that the injector can construct on its own
///
/// This trait is typically implemented automatically via `#[derive(Injectable)]`,
/// which also registers the type in [`CLASSES`](crate::CLASSES) so that it can be
/// bound just in time without a module declaring it.
///
/// # Example
/// ```ignore
/// use weft::Injectable;
/// use std::sync::Arc;
///
/// // 1. Define a trait
/// trait UserRepository: Send + Sync {}
///
/// // 2. Derive Injectable on a struct
/// #[derive(Injectable)]
/// pub struct UserService {
///     // This field will be resolved from the injector
///     repository: Arc<dyn UserRepository>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the injector
    ///
    /// # Errors
    /// Returns an error if any required dependency cannot be resolved.
    fn inject(injector: &Injector) -> Result<Self>;
}
