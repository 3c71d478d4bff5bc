use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Type, Visibility};

/// Container-level attributes for `#[fieldwire(...)]`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(fieldwire), supports(struct_named))]
struct RecordOpts {
    ident: Ident,
    generics: Generics,
    data: darling::ast::Data<(), FieldOpts>,

    /// Clone the record when it is injected by value.
    #[darling(default)]
    shared: bool,

    /// The record implements `Initialize`.
    #[darling(default)]
    init: bool,

    /// Traits the record can be injected as, through an `Arc`.
    #[darling(default)]
    provides: darling::util::PathList,
}

/// Field-level attributes for `#[fieldwire(...)]`
#[derive(Debug, FromField)]
#[darling(attributes(fieldwire))]
struct FieldOpts {
    ident: Option<Ident>,
    ty: Type,
    vis: Visibility,

    #[darling(default)]
    key: Option<String>,
    #[darling(default)]
    inject_as: Option<String>,
    #[darling(default)]
    inject: Option<String>,
    #[darling(default)]
    default: Option<String>,
    #[darling(default)]
    description: Option<String>,
    #[darling(default)]
    example: Option<String>,

    #[darling(default)]
    flatten: bool,
    #[darling(default)]
    skip: bool,
}

pub fn generate_impl(input: &DeriveInput) -> TokenStream2 {
    match RecordOpts::from_derive_input(input) {
        Ok(opts) => generate_from_opts(opts),
        Err(e) => e.write_errors(),
    }
}

fn optional(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(value) => quote! { ::std::option::Option::Some(#value) },
        None => quote! { ::std::option::Option::None },
    }
}

fn generate_from_opts(opts: RecordOpts) -> TokenStream2 {
    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let fields: Vec<FieldOpts> = match opts.data {
        darling::ast::Data::Struct(fields) => fields
            .fields
            .into_iter()
            .filter(|field| !field.skip)
            .collect(),
        darling::ast::Data::Enum(_) => {
            return syn::Error::new_spanned(name, "Record can only be derived for structs")
                .to_compile_error();
        }
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = &field.ident else {
            continue;
        };
        let ty = &field.ty;
        let member_name = ident.to_string();
        let member_name = member_name.strip_prefix("r#").unwrap_or(&member_name);
        let public = matches!(field.vis, Visibility::Public(_));
        let anonymous = field.flatten;

        let key = optional(&field.key);
        let inject_as = optional(&field.inject_as);
        let inject = optional(&field.inject);
        let default = optional(&field.default);
        let description = optional(&field.description);
        let example = optional(&field.example);

        // Private members are described but not reachable, so their types
        // need not implement `Value`.
        let target = if public {
            quote! { <#ty as ::fieldwire::Value>::static_target }
        } else {
            quote! { ::fieldwire::TypeInfo::of::<#ty> }
        };

        descriptors.push(quote! {
            ::fieldwire::Member {
                name: #member_name,
                public: #public,
                anonymous: #anonymous,
                tags: ::fieldwire::Tags {
                    key: #key,
                    inject_as: #inject_as,
                    inject: #inject,
                    default: #default,
                    description: #description,
                    example: #example,
                },
                target: #target,
            }
        });

        if public {
            getters.push(quote! {
                #index => ::std::option::Option::Some(&self.#ident as &dyn ::fieldwire::Value),
            });
            setters.push(quote! {
                #index => ::std::option::Option::Some(&mut self.#ident as &mut dyn ::fieldwire::Value),
            });
        }
    }

    let shared = opts.shared;
    let snapshot = if shared {
        quote! {
            fn snapshot(&self) -> ::std::option::Option<::std::boxed::Box<dyn ::std::any::Any>> {
                ::std::option::Option::Some(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
            }
        }
    } else {
        quote! {}
    };
    let initialize = if opts.init {
        quote! {
            fn as_initialize(&mut self) -> ::std::option::Option<&mut dyn ::fieldwire::Initialize> {
                ::std::option::Option::Some(self)
            }
        }
    } else {
        quote! {}
    };

    let provided: Vec<&syn::Path> = opts.provides.iter().collect();
    let interfaces = if provided.is_empty() {
        quote! {}
    } else {
        quote! {
            fn provides(interface: ::fieldwire::TypeInfo) -> bool {
                #(interface == ::fieldwire::TypeInfo::of::<::std::sync::Arc<dyn #provided>>())||*
            }

            fn arc_as(
                this: &::std::sync::Arc<Self>,
                interface: ::fieldwire::TypeInfo,
            ) -> ::std::option::Option<::std::boxed::Box<dyn ::std::any::Any>> {
                #(
                    if interface == ::fieldwire::TypeInfo::of::<::std::sync::Arc<dyn #provided>>() {
                        let shared: ::std::sync::Arc<dyn #provided> = ::std::sync::Arc::<Self>::clone(this);
                        return ::std::option::Option::Some(::std::boxed::Box::new(shared));
                    }
                )*
                ::std::option::Option::None
            }
        }
    };

    quote! {
        impl #impl_generics ::fieldwire::Value for #name #ty_generics #where_clause {
            fn type_info(&self) -> ::fieldwire::TypeInfo {
                ::fieldwire::TypeInfo::of::<Self>()
            }

            fn static_target() -> ::fieldwire::TypeInfo {
                ::fieldwire::TypeInfo::of::<Self>()
            }

            fn static_shareable() -> bool {
                #shared
            }

            fn kind(&self) -> ::fieldwire::Kind {
                ::fieldwire::Kind::Composite
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn as_record(&self) -> ::std::option::Option<&dyn ::fieldwire::Record> {
                ::std::option::Option::Some(self)
            }

            fn as_record_mut(&mut self) -> ::std::option::Option<&mut dyn ::fieldwire::Record> {
                ::std::option::Option::Some(self)
            }

            fn shareable(&self) -> bool {
                #shared
            }

            #snapshot

            fn inject(
                &mut self,
                snapshot: ::std::boxed::Box<dyn ::std::any::Any>,
            ) -> ::std::result::Result<(), ::fieldwire::StorageError> {
                ::fieldwire::value::assign(self, snapshot)
            }

            #initialize

            #interfaces
        }

        impl #impl_generics ::fieldwire::Record for #name #ty_generics #where_clause {
            fn members(&self) -> ::std::vec::Vec<::fieldwire::Member> {
                ::std::vec![#(#descriptors),*]
            }

            fn member(&self, index: usize) -> ::std::option::Option<&dyn ::fieldwire::Value> {
                match index {
                    #(#getters)*
                    _ => ::std::option::Option::None,
                }
            }

            fn member_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn ::fieldwire::Value> {
                match index {
                    #(#setters)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    }
}
