//! Models shared by the unit tests.

use crate::aggregate::{AggregateReflection, Aggregated, AggregationAware, AggregationFlag};
use crate::enumerated::EnumInfo;
use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::model::Model;
use crate::value::Value;

fn unknown<M: Model>(name: &str) -> Error {
    Error::no_method(M::TABLE_NAME, format!("{name}="))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub id: Option<i64>,
    pub name: String,
    pub street: String,
    pub city: String,
    pub kind: Option<String>,
    pub lock_version: i32,
    pub flag: AggregationFlag,
}

impl Model for Address {
    const TABLE_NAME: &'static str = "addresses";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn fields() -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true).nullable(true),
            FieldInfo::new("name", "name"),
            FieldInfo::new("street", "street"),
            FieldInfo::new("city", "city"),
            FieldInfo::new("kind", "kind").nullable(true),
            FieldInfo::new("lock_version", "lock_version"),
        ];
        FIELDS
    }

    fn enums() -> &'static [EnumInfo] {
        static ENUMS: &[EnumInfo] = &[EnumInfo::new("kind", &["home", "work"])];
        ENUMS
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::from(self.id)),
            "name" => Some(Value::from(self.name.clone())),
            "street" => Some(Value::from(self.street.clone())),
            "city" => Some(Value::from(self.city.clone())),
            "kind" => Some(Value::from(self.kind.clone())),
            "lock_version" => Some(Value::from(self.lock_version)),
            _ => None,
        }
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "id" => self.id = Option::try_from(value)?,
            "name" => self.name = String::try_from(value)?,
            "street" => self.street = String::try_from(value)?,
            "city" => self.city = String::try_from(value)?,
            "kind" => self.kind = Option::try_from(value)?,
            "lock_version" => self.lock_version = i32::try_from(value)?,
            _ => return Err(unknown::<Self>(name)),
        }
        Ok(())
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![Value::from(self.id)]
    }

    fn aggregation_aware(&self) -> Option<&dyn AggregationAware> {
        Some(&self.flag)
    }

    fn aggregation_aware_mut(&mut self) -> Option<&mut dyn AggregationAware> {
        Some(&mut self.flag)
    }
}

/// Owner of an aggregated address. Answers `city` itself.
#[derive(Debug, Default)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub address_id: Option<i64>,
    pub preferred_city: String,
    pub address: Aggregated<Address>,
}

impl Model for Person {
    const TABLE_NAME: &'static str = "people";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
    const INSTANCE_METHODS: &'static [&'static str] = &["city", "city="];

    fn fields() -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true).nullable(true),
            FieldInfo::new("name", "name"),
            FieldInfo::new("address_id", "address_id")
                .nullable(true)
                .foreign_key("addresses.id"),
        ];
        FIELDS
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::from(self.id)),
            "name" => Some(Value::from(self.name.clone())),
            "address_id" => Some(Value::from(self.address_id)),
            "city" => Some(Value::from(self.preferred_city.clone())),
            _ => None,
        }
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "id" => self.id = Option::try_from(value)?,
            "name" => self.name = String::try_from(value)?,
            "address_id" => self.address_id = Option::try_from(value)?,
            "city" => self.preferred_city = String::try_from(value)?,
            _ => return Err(unknown::<Self>(name)),
        }
        Ok(())
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![Value::from(self.id)]
    }
}

fn person_address(person: &Person) -> &Aggregated<Address> {
    &person.address
}

fn person_address_mut(person: &mut Person) -> &mut Aggregated<Address> {
    &mut person.address
}

pub fn address_reflection() -> AggregateReflection<Person, Address> {
    AggregateReflection::new("address", "address_id", person_address, person_address_mut)
}

/// Target without the aggregation capability.
#[derive(Debug, Clone, Default)]
pub struct Plain {
    pub id: Option<i64>,
}

impl Model for Plain {
    const TABLE_NAME: &'static str = "plains";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn fields() -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[FieldInfo::new("id", "id").primary_key(true)];
        FIELDS
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        (name == "id").then(|| Value::from(self.id))
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        if name != "id" {
            return Err(unknown::<Self>(name));
        }
        self.id = Option::try_from(value)?;
        Ok(())
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![Value::from(self.id)]
    }
}

macro_rules! malformed_model {
    ($name:ident, $table:literal, fields: [$($field:expr),*], enums: [$($enum:expr),*]) => {
        #[derive(Debug, Default)]
        pub struct $name;

        impl Model for $name {
            const TABLE_NAME: &'static str = $table;
            const PRIMARY_KEY: &'static [&'static str] = &["id"];

            fn fields() -> &'static [FieldInfo] {
                static FIELDS: &[FieldInfo] = &[$($field),*];
                FIELDS
            }

            fn enums() -> &'static [EnumInfo] {
                static ENUMS: &[EnumInfo] = &[$($enum),*];
                ENUMS
            }

            fn read_attribute(&self, _name: &str) -> Option<Value> {
                None
            }

            fn write_attribute(&mut self, name: &str, _value: Value) -> Result<()> {
                Err(unknown::<Self>(name))
            }

            fn primary_key_value(&self) -> Vec<Value> {
                vec![Value::Null]
            }
        }
    };
}

malformed_model!(Broken, "brokens", fields: [FieldInfo::new("Street", "street")], enums: []);
malformed_model!(
    DuplicateColumns,
    "duplicates",
    fields: [FieldInfo::new("street", "street"), FieldInfo::new("street", "street_2")],
    enums: []
);
malformed_model!(
    StrayEnum,
    "strays",
    fields: [FieldInfo::new("street", "street")],
    enums: [EnumInfo::new("kind", &["home"])]
);

/// Owner of an association whose target metadata is malformed.
#[derive(Debug, Default)]
pub struct Holder {
    pub id: Option<i64>,
    pub broken: Aggregated<Broken>,
}

impl Model for Holder {
    const TABLE_NAME: &'static str = "holders";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn fields() -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[FieldInfo::new("id", "id").primary_key(true)];
        FIELDS
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        (name == "id").then(|| Value::from(self.id))
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        if name != "id" {
            return Err(unknown::<Self>(name));
        }
        self.id = Option::try_from(value)?;
        Ok(())
    }

    fn primary_key_value(&self) -> Vec<Value> {
        vec![Value::from(self.id)]
    }
}

fn holder_broken(holder: &Holder) -> &Aggregated<Broken> {
    &holder.broken
}

fn holder_broken_mut(holder: &mut Holder) -> &mut Aggregated<Broken> {
    &mut holder.broken
}

pub fn broken_reflection() -> AggregateReflection<Holder, Broken> {
    AggregateReflection::new("broken", "broken_id", holder_broken, holder_broken_mut)
}
