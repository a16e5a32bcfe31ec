//! Procedural macros for aggregated models.
//!
//! `aggregated-macros` is the compile-time codegen layer. It turns Rust
//! structs into models whose attribute metadata and by-name attribute access
//! are generated, so that the delegation builder can compute an owner's
//! forwarding accessors from a target model's metadata.
//!
//! - `#[derive(Model)]` produces a `Model` implementation.
//! - `#[derive(SqlEnum)]` produces a `SqlEnum` implementation plus `Value`
//!   conversions for enumerated attributes.
//!
//! These macros are used by application crates via the `aggregated` facade.

use proc_macro::TokenStream;
use quote::quote;

mod parse;

use parse::{ModelDef, parse_model, to_snake_case};

/// Derive macro for the `Model` trait.
///
/// This macro generates:
/// - Table name and primary key metadata
/// - Attribute metadata (`fields`) and enum reflection (`enums`)
/// - By-name attribute access (`read_attribute`, `write_attribute`)
/// - Primary key access
/// - The aggregation capability, when the struct has one
///
/// # Attributes
///
/// - `#[aggregated(table = "name")]` - Override table name (defaults to the
///   pluralized snake_case struct name)
/// - `#[aggregated(aggregation_aware)]` - The struct implements
///   `AggregationAware` itself
/// - `#[aggregated(primary_key)]` - Mark field as primary key
/// - `#[aggregated(column = "name")]` - Override column name
/// - `#[aggregated(nullable)]` - Mark field as nullable
/// - `#[aggregated(foreign_key = "table.column")]` - Add foreign key reference
/// - `#[aggregated(enumerated)]` - The field holds a `SqlEnum` value
/// - `#[aggregated(skip)]` - Not an attribute
///
/// Fields of type `Aggregated<T>` are association state and an
/// `AggregationFlag` field is the model's aggregation capability; neither is
/// an attribute.
///
/// # Example
///
/// ```ignore
/// use aggregated::{Aggregated, AggregationFlag, Model, SqlEnum};
///
/// #[derive(Model, Default)]
/// struct Address {
///     #[aggregated(primary_key)]
///     id: Option<i64>,
///     street: String,
///     city: String,
///     #[aggregated(enumerated)]
///     kind: Option<Kind>,
///     flag: AggregationFlag,
/// }
///
/// #[derive(Model, Default)]
/// #[aggregated(table = "people")]
/// struct Person {
///     #[aggregated(primary_key)]
///     id: Option<i64>,
///     #[aggregated(foreign_key = "addresses.id")]
///     address_id: Option<i64>,
///     address: Aggregated<Address>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(aggregated))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let model = match parse_model(&input) {
        Ok(m) => m,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_model_impl(&model).into()
}

/// Generate the Model trait implementation from parsed model definition.
fn generate_model_impl(model: &ModelDef) -> proc_macro2::TokenStream {
    let name = &model.name;
    let table_name = &model.table_name;
    let (impl_generics, ty_generics, where_clause) = model.generics.split_for_impl();

    let pk_fields: Vec<_> = {
        let explicit = model.primary_key_fields();
        if explicit.is_empty() {
            model
                .attribute_fields()
                .filter(|f| f.attribute_name == "id")
                .collect()
        } else {
            explicit
        }
    };
    let pk_names: Vec<&str> = pk_fields.iter().map(|f| f.attribute_name.as_str()).collect();
    let pk_idents: Vec<_> = pk_fields.iter().map(|f| &f.name).collect();

    let field_infos = generate_field_infos(model);
    let enum_infos = generate_enum_infos(model);
    let read_attribute = generate_read_attribute(model);
    let write_attribute = generate_write_attribute(model);
    let aggregation_aware = generate_aggregation_aware(model);

    quote! {
        impl #impl_generics aggregated_core::Model for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table_name;
            const PRIMARY_KEY: &'static [&'static str] = &[#(#pk_names),*];

            fn fields() -> &'static [aggregated_core::FieldInfo] {
                static FIELDS: &[aggregated_core::FieldInfo] = &[#(#field_infos),*];
                FIELDS
            }

            fn enums() -> &'static [aggregated_core::EnumInfo] {
                static ENUMS: &[aggregated_core::EnumInfo] = &[#(#enum_infos),*];
                ENUMS
            }

            #read_attribute

            #write_attribute

            fn primary_key_value(&self) -> ::std::vec::Vec<aggregated_core::Value> {
                ::std::vec![#(
                    <aggregated_core::Value as ::core::convert::From<_>>::from(
                        ::core::clone::Clone::clone(&self.#pk_idents)
                    )
                ),*]
            }

            #aggregation_aware
        }
    }
}

/// Generate `FieldInfo` constructors for every attribute field.
fn generate_field_infos(model: &ModelDef) -> Vec<proc_macro2::TokenStream> {
    model
        .attribute_fields()
        .map(|field| {
            let attribute = &field.attribute_name;
            let column = &field.column_name;
            let nullable = field.nullable;
            let primary_key = field.primary_key;
            let foreign_key = match &field.foreign_key {
                Some(reference) => quote! { ::core::option::Option::Some(#reference) },
                None => quote! { ::core::option::Option::None },
            };
            quote! {
                aggregated_core::FieldInfo::new(#attribute, #column)
                    .nullable(#nullable)
                    .primary_key(#primary_key)
                    .foreign_key_opt(#foreign_key)
            }
        })
        .collect()
}

/// Generate `EnumInfo` reflection for every enumerated attribute.
fn generate_enum_infos(model: &ModelDef) -> Vec<proc_macro2::TokenStream> {
    model
        .attribute_fields()
        .filter(|f| f.enumerated)
        .map(|field| {
            let attribute = &field.attribute_name;
            let enum_ty = field.enum_type();
            quote! { aggregated_core::EnumInfo::of::<#enum_ty>(#attribute) }
        })
        .collect()
}

fn generate_read_attribute(model: &ModelDef) -> proc_macro2::TokenStream {
    let arms = model.attribute_fields().map(|field| {
        let attribute = &field.attribute_name;
        let ident = &field.name;
        quote! {
            #attribute => ::core::option::Option::Some(
                <aggregated_core::Value as ::core::convert::From<_>>::from(
                    ::core::clone::Clone::clone(&self.#ident)
                )
            )
        }
    });

    quote! {
        fn read_attribute(&self, name: &str) -> ::core::option::Option<aggregated_core::Value> {
            match name {
                #(#arms,)*
                _ => ::core::option::Option::None,
            }
        }
    }
}

fn generate_write_attribute(model: &ModelDef) -> proc_macro2::TokenStream {
    let arms = model.attribute_fields().map(|field| {
        let attribute = &field.attribute_name;
        let ident = &field.name;
        let ty = &field.ty;
        quote! {
            #attribute => {
                self.#ident = <#ty as ::core::convert::TryFrom<aggregated_core::Value>>::try_from(value)
                    .map_err(|e| e.with_attribute(#attribute))?;
            }
        }
    });

    quote! {
        fn write_attribute(
            &mut self,
            name: &str,
            value: aggregated_core::Value,
        ) -> aggregated_core::Result<()> {
            match name {
                #(#arms)*
                _ => {
                    return ::core::result::Result::Err(aggregated_core::Error::no_method(
                        <Self as aggregated_core::Model>::TABLE_NAME,
                        ::std::format!("{name}="),
                    ));
                }
            }
            ::core::result::Result::Ok(())
        }
    }
}

fn generate_aggregation_aware(model: &ModelDef) -> proc_macro2::TokenStream {
    if model.aggregation_aware {
        return quote! {
            fn aggregation_aware(
                &self,
            ) -> ::core::option::Option<&dyn aggregated_core::AggregationAware> {
                ::core::option::Option::Some(self)
            }

            fn aggregation_aware_mut(
                &mut self,
            ) -> ::core::option::Option<&mut dyn aggregated_core::AggregationAware> {
                ::core::option::Option::Some(self)
            }
        };
    }
    let Some(flag) = model.flag_field() else {
        return quote! {};
    };
    let ident = &flag.name;
    quote! {
        fn aggregation_aware(
            &self,
        ) -> ::core::option::Option<&dyn aggregated_core::AggregationAware> {
            ::core::option::Option::Some(&self.#ident)
        }

        fn aggregation_aware_mut(
            &mut self,
        ) -> ::core::option::Option<&mut dyn aggregated_core::AggregationAware> {
            ::core::option::Option::Some(&mut self.#ident)
        }
    }
}

/// Derive macro for enumerated attribute types.
///
/// Generates a `SqlEnum` implementation, `From<EnumType> for Value`,
/// `TryFrom<Value> for EnumType`, and `Display`/`FromStr` implementations.
///
/// Variants are stored as their snake_case names by default. Use
/// `#[aggregated(rename = "custom_name")]` on a variant to override.
///
/// # Example
///
/// ```ignore
/// #[derive(SqlEnum, Debug, Clone, Copy, PartialEq)]
/// enum Kind {
///     Home,
///     Work,
///     #[aggregated(rename = "po_box")]
///     PostOfficeBox,
/// }
/// ```
#[proc_macro_derive(SqlEnum, attributes(aggregated))]
pub fn derive_sql_enum(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    match generate_sql_enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate_sql_enum_impl(input: &syn::DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let syn::Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "SqlEnum can only be derived for enums",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "SqlEnum requires at least one variant",
        ));
    }

    let mut variant_names = Vec::new();
    let mut variant_strings: Vec<String> = Vec::new();

    for variant in &data.variants {
        if !variant.fields.is_empty() {
            return Err(syn::Error::new_spanned(
                variant,
                "SqlEnum variants must be unit variants (no fields)",
            ));
        }

        let mut custom_name = None;
        for attr in &variant.attrs {
            if attr.path().is_ident("aggregated") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let s: syn::LitStr = meta.value()?.parse()?;
                        custom_name = Some(s.value());
                        Ok(())
                    } else {
                        Err(meta.error("unknown aggregated attribute; expected `rename`"))
                    }
                })?;
            }
        }

        let sql_str = custom_name.unwrap_or_else(|| to_snake_case(&variant.ident.to_string()));
        if variant_strings.contains(&sql_str) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate stored name '{sql_str}'"),
            ));
        }
        variant_names.push(variant.ident.clone());
        variant_strings.push(sql_str);
    }

    let type_name = to_snake_case(&name.to_string());

    let to_sql_arms = variant_names
        .iter()
        .zip(&variant_strings)
        .map(|(ident, s)| quote! { #name::#ident => #s });
    let from_sql_arms = variant_names
        .iter()
        .zip(&variant_strings)
        .map(|(ident, s)| quote! { #s => ::core::result::Result::Ok(#name::#ident) });

    let valid_values = variant_strings
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let error_msg = format!("invalid value for {name}: expected one of {valid_values}");

    Ok(quote! {
        impl #impl_generics aggregated_core::SqlEnum for #name #ty_generics #where_clause {
            const VARIANTS: &'static [&'static str] = &[#(#variant_strings),*];
            const TYPE_NAME: &'static str = #type_name;

            fn to_sql_str(&self) -> &'static str {
                match self {
                    #(#to_sql_arms,)*
                }
            }

            fn from_sql_str(s: &str) -> ::core::result::Result<Self, ::std::string::String> {
                match s {
                    #(#from_sql_arms,)*
                    _ => ::core::result::Result::Err(::std::format!("{}, got '{}'", #error_msg, s)),
                }
            }
        }

        impl #impl_generics ::core::convert::From<#name #ty_generics> for aggregated_core::Value #where_clause {
            fn from(v: #name #ty_generics) -> Self {
                aggregated_core::Value::Text(::std::string::ToString::to_string(
                    aggregated_core::SqlEnum::to_sql_str(&v),
                ))
            }
        }

        impl #impl_generics ::core::convert::From<&#name #ty_generics> for aggregated_core::Value #where_clause {
            fn from(v: &#name #ty_generics) -> Self {
                aggregated_core::Value::Text(::std::string::ToString::to_string(
                    aggregated_core::SqlEnum::to_sql_str(v),
                ))
            }
        }

        impl #impl_generics ::core::convert::TryFrom<aggregated_core::Value> for #name #ty_generics #where_clause {
            type Error = aggregated_core::Error;

            fn try_from(
                value: aggregated_core::Value,
            ) -> ::core::result::Result<Self, Self::Error> {
                match value {
                    aggregated_core::Value::Text(ref s) => {
                        aggregated_core::SqlEnum::from_sql_str(s.as_str()).map_err(|e| {
                            aggregated_core::Error::type_mismatch(
                                <#name as aggregated_core::SqlEnum>::TYPE_NAME,
                                e,
                            )
                        })
                    }
                    other => ::core::result::Result::Err(aggregated_core::Error::type_mismatch(
                        <#name as aggregated_core::SqlEnum>::TYPE_NAME,
                        other.type_name(),
                    )),
                }
            }
        }

        impl #impl_generics ::core::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(aggregated_core::SqlEnum::to_sql_str(self))
            }
        }

        impl #impl_generics ::core::str::FromStr for #name #ty_generics #where_clause {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                aggregated_core::SqlEnum::from_sql_str(s)
            }
        }
    })
}
