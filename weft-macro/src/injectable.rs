use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, LitStr, Type};

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_injectable_impl(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn generate_injectable_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let injections = fields
                    .named
                    .iter()
                    .map(field_injection)
                    .collect::<syn::Result<Vec<_>>>()?;
                quote!(Self { #(#injections),* })
            }
            Fields::Unit => quote!(Self),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Injectable)] only supports structs with named fields or unit structs",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Injectable)] can only be applied to structs",
            ))
        }
    };

    // Generic types cannot be named from a static, so only concrete
    // types are announced to the class registry.
    let registration = if input.generics.params.is_empty() {
        let entry = format_ident!("__WEFT_CLASS_{}", struct_name.to_string().to_uppercase());
        quote! {
            #[::weft::linkme::distributed_slice(::weft::CLASSES)]
            #[linkme(crate = ::weft::linkme)]
            #[allow(non_upper_case_globals)]
            static #entry: ::weft::ClassEntry = ::weft::ClassEntry {
                name: ::std::any::type_name::<#struct_name>,
                construct: ::weft::ClassEntry::provide::<#struct_name>,
            };
        }
    } else {
        TokenStream2::new()
    };

    Ok(quote! {
        impl #impl_generics ::weft::Injectable for #struct_name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn inject(
                injector: &::weft::Injector
            ) -> ::weft::Result<Self> {
                Ok(#body)
            }
        }

        #registration
    })
}

fn field_injection(field: &Field) -> syn::Result<TokenStream2> {
    let field_name = &field.ident;
    let qualifier = field_qualifier(field)?;

    let Some(inner) = extract_arc_inner(&field.ty) else {
        // Plain values are not container-managed
        return Ok(quote!(#field_name: ::core::default::Default::default()));
    };

    let resolve = match inner {
        Type::TraitObject(_) => quote!(get_trait::<#inner>(#qualifier)),
        _ => quote!(get_named::<#inner>(#qualifier)),
    };

    Ok(quote! {
        #field_name: injector.#resolve?
    })
}

/// Reads `#[named("qualifier")]`, defaulting to the "any" qualifier.
fn field_qualifier(field: &Field) -> syn::Result<TokenStream2> {
    for attr in &field.attrs {
        if attr.path().is_ident("named") {
            let name: LitStr = attr.parse_args()?;
            return Ok(quote!(#name));
        }
    }
    Ok(quote!(::weft::ANY))
}

/// Extract the inner type from Arc<T> or Arc<dyn Trait>
fn extract_arc_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Arc" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_type)) = args.args.first() {
                        return Some(inner_type);
                    }
                }
            }
        }
    }
    None
}
