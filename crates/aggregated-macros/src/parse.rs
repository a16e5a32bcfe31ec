//! Parsing logic for the Model derive macro.
//!
//! This module extracts struct-level and field-level `#[aggregated(...)]`
//! attributes from the derive input to build the `ModelDef` and `FieldDef`
//! structures used for code generation.

use proc_macro2::Span;
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, GenericArgument, Generics, Ident, LitStr,
    PathArguments, Result, Type,
};

/// Parsed model definition from a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name (e.g., `Address`).
    pub name: Ident,
    /// The table name (e.g., `"addresses"`).
    pub table_name: String,
    /// Parsed field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Generic parameters from the struct.
    pub generics: Generics,
    /// The struct implements `AggregationAware` itself.
    pub aggregation_aware: bool,
}

impl ModelDef {
    /// Fields that map to attributes.
    pub fn attribute_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.role == FieldRole::Attribute)
    }

    /// Attribute fields explicitly marked as primary key.
    pub fn primary_key_fields(&self) -> Vec<&FieldDef> {
        self.attribute_fields().filter(|f| f.primary_key).collect()
    }

    /// The embedded `AggregationFlag` field, if any.
    pub fn flag_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.role == FieldRole::Flag)
    }
}

/// What a struct field is to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// A named attribute with generated accessors
    Attribute,
    /// An `Aggregated<T>` association state field
    Association,
    /// An embedded `AggregationFlag`
    Flag,
    /// `#[aggregated(skip)]`
    Skipped,
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name (e.g., `street`).
    pub name: Ident,
    /// The attribute name (the field name without a raw prefix).
    pub attribute_name: String,
    /// The column name (e.g., `"street"` or custom override).
    pub column_name: String,
    /// The Rust type of the field.
    pub ty: Type,
    /// Whether the attribute allows NULL values.
    pub nullable: bool,
    /// Whether this field is (part of) the primary key.
    pub primary_key: bool,
    /// Foreign key reference (e.g., `"addresses.id"`).
    pub foreign_key: Option<String>,
    /// The attribute holds a `SqlEnum` value.
    pub enumerated: bool,
    pub role: FieldRole,
}

impl FieldDef {
    /// The enum type of an enumerated field, unwrapping `Option<E>`.
    pub fn enum_type(&self) -> &Type {
        option_inner(&self.ty).unwrap_or(&self.ty)
    }
}

/// Parse a `DeriveInput` into a `ModelDef`.
///
/// Returns an error if:
/// - The input is not a struct with named fields
/// - Unknown attributes are present
/// - Attribute combinations are contradictory
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();

    let StructAttrs {
        table_name,
        aggregation_aware,
    } = parse_struct_attrs(&input.attrs, &name)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    let mut flags = fields.iter().filter(|f| f.role == FieldRole::Flag);
    if let (Some(_), Some(second)) = (flags.next(), flags.next()) {
        return Err(Error::new_spanned(
            &second.name,
            "a model can embed at most one AggregationFlag",
        ));
    }
    let flag = fields.iter().find(|f| f.role == FieldRole::Flag);
    if let (true, Some(flag)) = (aggregation_aware, flag) {
        return Err(Error::new_spanned(
            &flag.name,
            "`aggregation_aware` conflicts with an embedded AggregationFlag field",
        ));
    }

    Ok(ModelDef {
        name,
        table_name,
        fields,
        generics,
        aggregation_aware,
    })
}

/// Parsed struct-level attributes result.
struct StructAttrs {
    table_name: String,
    aggregation_aware: bool,
}

/// Parse struct-level `#[aggregated(...)]` attributes.
///
/// Supported keys:
/// - `table = "name"` (overrides derived table name)
/// - `aggregation_aware` (the struct implements `AggregationAware` itself)
fn parse_struct_attrs(attrs: &[Attribute], struct_name: &Ident) -> Result<StructAttrs> {
    let mut table_name: Option<String> = None;
    let mut aggregation_aware = false;

    for attr in attrs {
        if !attr.path().is_ident("aggregated") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("table name must not be empty"));
                }
                table_name = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("aggregation_aware") {
                aggregation_aware = true;
                Ok(())
            } else {
                let key = meta.path.to_token_stream().to_string();
                Err(meta.error(format!(
                    "unknown aggregated attribute `{key}`. Valid struct attributes are: table, aggregation_aware"
                )))
            }
        })?;
    }

    Ok(StructAttrs {
        table_name: table_name.unwrap_or_else(|| derive_table_name(&struct_name.to_string())),
        aggregation_aware,
    })
}

/// Derive a table name from a struct name.
///
/// Examples:
/// - `Address` -> `addresses`
/// - `TeamMember` -> `team_members`
/// - `Person` -> `people`
fn derive_table_name(struct_name: &str) -> String {
    pluralize(&to_snake_case(struct_name))
}

/// Convert PascalCase to snake_case.
///
/// Examples:
/// - `Home` -> `home`
/// - `PostOffice` -> `post_office`
/// - `HTTPServer` -> `http_server`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();

                // Underscore at a word boundary, or where an acronym ends
                let should_underscore = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase));

                if should_underscore {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Simple English pluralization.
fn pluralize(word: &str) -> String {
    match word {
        "person" => return "people".to_string(),
        "child" => return "children".to_string(),
        "man" => return "men".to_string(),
        "woman" => return "women".to_string(),
        "" => return String::new(),
        _ => {}
    }

    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }

    if let Some(stripped) = word
        .strip_suffix('y')
        .filter(|stem| stem.chars().last().is_some_and(|c| !"aeiou".contains(c)))
    {
        return format!("{stripped}ies");
    }

    format!("{word}s")
}

/// Parse all fields from a struct.
fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Model requires a struct with fields, not a unit struct",
        )),
    }
}

/// Intermediate struct for collecting field attributes.
#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    nullable: Option<bool>,
    primary_key: bool,
    foreign_key: Option<String>,
    enumerated: bool,
    skip: bool,
}

/// Parse a single field and its attributes.
fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;
    let ty = field.ty.clone();

    let attrs = parse_field_attrs(&field.attrs)?;

    let role = if attrs.skip {
        FieldRole::Skipped
    } else if type_ident_is(&ty, "Aggregated") {
        FieldRole::Association
    } else if type_ident_is(&ty, "AggregationFlag") {
        FieldRole::Flag
    } else {
        FieldRole::Attribute
    };

    if role != FieldRole::Attribute
        && (attrs.primary_key || attrs.enumerated || attrs.column.is_some())
    {
        return Err(Error::new_spanned(
            &name,
            "column attributes cannot be used on a skipped, association or flag field",
        ));
    }

    let attribute_name = name.unraw().to_string();
    let column_name = attrs.column.unwrap_or_else(|| attribute_name.clone());
    let nullable = attrs.nullable.unwrap_or_else(|| is_option_type(&ty));

    Ok(FieldDef {
        name,
        attribute_name,
        column_name,
        ty,
        nullable,
        primary_key: attrs.primary_key,
        foreign_key: attrs.foreign_key,
        enumerated: attrs.enumerated,
        role,
    })
}

/// Parse all `#[aggregated(...)]` attributes on a field.
fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("aggregated") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("primary_key") {
                result.primary_key = true;
            } else if path.is_ident("enumerated") {
                result.enumerated = true;
            } else if path.is_ident("skip") {
                result.skip = true;
            } else if path.is_ident("nullable") {
                // `nullable` or `nullable = false`
                if meta.input.peek(syn::Token![=]) {
                    let value: syn::LitBool = meta.value()?.parse()?;
                    result.nullable = Some(value.value);
                } else {
                    result.nullable = Some(true);
                }
            } else if path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("column name must not be empty"));
                }
                result.column = Some(value.value());
            } else if path.is_ident("foreign_key") {
                let value: LitStr = meta.value()?.parse()?;
                let reference = value.value();
                if !reference.contains('.') {
                    return Err(meta.error(format!(
                        "foreign_key must be in 'table.column' format, got '{reference}'"
                    )));
                }
                result.foreign_key = Some(reference);
            } else {
                let key = path.to_token_stream().to_string();
                return Err(meta.error(format!(
                    "unknown aggregated attribute `{key}`. Valid field attributes are: \
                     primary_key, column, nullable, foreign_key, enumerated, skip"
                )));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

/// Check if the last path segment of a type is `ident`.
fn type_ident_is(ty: &Type, ident: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == ident),
        _ => false,
    }
}

/// Check if a type is `Option<T>`.
pub fn is_option_type(ty: &Type) -> bool {
    type_ident_is(ty, "Option")
}

/// The `T` of an `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Home"), "home");
        assert_eq!(to_snake_case("PostOffice"), "post_office");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("Line2Address"), "line2_address");
    }

    #[test]
    fn test_derive_table_name() {
        assert_eq!(derive_table_name("Address"), "addresses");
        assert_eq!(derive_table_name("Person"), "people");
        assert_eq!(derive_table_name("Company"), "companies");
        assert_eq!(derive_table_name("Survey"), "surveys");
        assert_eq!(derive_table_name("TeamMember"), "team_members");
    }

    #[test]
    fn test_parse_model_roles_and_defaults() {
        let input: DeriveInput = parse_quote! {
            struct Person {
                #[aggregated(primary_key)]
                id: Option<i64>,
                #[aggregated(foreign_key = "addresses.id")]
                address_id: Option<i64>,
                #[aggregated(column = "full_name", nullable = false)]
                name: String,
                address: Aggregated<Address>,
                #[aggregated(skip)]
                cache: Vec<u8>,
            }
        };
        let model = parse_model(&input).unwrap();
        assert_eq!(model.table_name, "people");
        assert!(!model.aggregation_aware);

        let attrs: Vec<&str> = model
            .attribute_fields()
            .map(|f| f.attribute_name.as_str())
            .collect();
        assert_eq!(attrs, vec!["id", "address_id", "name"]);
        assert_eq!(model.primary_key_fields().len(), 1);

        let fk = &model.fields[1];
        assert!(fk.nullable);
        assert_eq!(fk.foreign_key.as_deref(), Some("addresses.id"));
        assert_eq!(model.fields[2].column_name, "full_name");
        assert_eq!(model.fields[3].role, FieldRole::Association);
        assert_eq!(model.fields[4].role, FieldRole::Skipped);
    }

    #[test]
    fn test_parse_flag_and_enum_fields() {
        let input: DeriveInput = parse_quote! {
            #[aggregated(table = "addresses")]
            struct Address {
                id: Option<i64>,
                #[aggregated(enumerated)]
                kind: Option<Kind>,
                r#type: String,
                flag: aggregated::AggregationFlag,
            }
        };
        let model = parse_model(&input).unwrap();
        assert_eq!(model.table_name, "addresses");
        assert_eq!(model.flag_field().unwrap().name, "flag");

        let kind = &model.fields[1];
        assert!(kind.enumerated);
        let expected: Type = parse_quote!(Kind);
        assert_eq!(kind.enum_type(), &expected);
        assert_eq!(model.fields[2].attribute_name, "type");
    }

    #[test]
    fn test_rejects_unknown_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Address {
                #[aggregated(unique)]
                street: String,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("unknown aggregated attribute"));
    }

    #[test]
    fn test_rejects_bad_foreign_key() {
        let input: DeriveInput = parse_quote! {
            struct Person {
                #[aggregated(foreign_key = "addresses")]
                address_id: Option<i64>,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_rejects_two_flags() {
        let input: DeriveInput = parse_quote! {
            struct Address {
                first: AggregationFlag,
                second: AggregationFlag,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("at most one"));
    }

    #[test]
    fn test_rejects_aware_with_flag() {
        let input: DeriveInput = parse_quote! {
            #[aggregated(aggregation_aware)]
            struct Address {
                flag: AggregationFlag,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_rejects_column_attrs_on_association() {
        let input: DeriveInput = parse_quote! {
            struct Person {
                #[aggregated(primary_key)]
                address: Aggregated<Address>,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_rejects_enums() {
        let input: DeriveInput = parse_quote! {
            enum Kind { Home, Work }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_option_inner() {
        let ty: Type = parse_quote!(Option<Kind>);
        assert!(is_option_type(&ty));
        assert!(option_inner(&ty).is_some());
        let plain: Type = parse_quote!(Kind);
        assert!(option_inner(&plain).is_none());
    }
}
