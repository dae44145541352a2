use proc_macro::TokenStream;

mod injectable;

/// Derive macro for making a struct constructible by the injector
///
/// Every `Arc<T>` field is resolved from the injector, `Arc<dyn Trait>`
/// fields through the trait binding. `#[named("...")]` selects a
/// qualifier. Any other field is filled with `Default::default()`.
///
/// Concrete (non-generic) types are also announced to the class
/// registry, which is what lets the injector bind them just in time.
///
/// # Example
/// ```ignore
/// use weft::Injectable;
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     repository: Arc<dyn UserRepository>,
///     #[named("primary")]
///     database: Arc<Database>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(named))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}
