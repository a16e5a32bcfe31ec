//! Derives used next to the prelude glob and locally shadowed std names.

mod shadowed {
    #![allow(dead_code, unused_macros)]

    use aggregated::prelude::*;

    // Local items named like std prelude entries take precedence over it.
    pub struct Ok;
    pub struct Err;
    pub struct Some;
    pub struct None;
    pub struct Vec;
    pub struct String;
    pub trait From {}
    pub trait TryFrom {}
    pub enum Option {}

    macro_rules! format {
        ($($tt:tt)*) => {
            compile_error!("generated code must not use an in-scope `format!`")
        };
    }

    macro_rules! vec {
        ($($tt:tt)*) => {
            compile_error!("generated code must not use an in-scope `vec!`")
        };
    }

    #[derive(SqlEnum, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Kind {
        Home,
        Work,
    }

    #[derive(Model, Debug, Clone, Default)]
    pub struct Address {
        #[aggregated(primary_key)]
        pub id: ::core::option::Option<i64>,
        pub street: ::std::string::String,
        #[aggregated(enumerated)]
        pub kind: ::core::option::Option<Kind>,
        pub flag: AggregationFlag,
    }

    #[derive(Model, Debug, Default)]
    #[aggregated(table = "people")]
    pub struct Person {
        #[aggregated(primary_key)]
        pub id: ::core::option::Option<i64>,
        #[aggregated(foreign_key = "addresses.id")]
        pub address_id: ::core::option::Option<i64>,
        pub address: Aggregated<Address>,
    }
}

use std::sync::LazyLock;

use aggregated::prelude::*;
use shadowed::{Address, Kind, Person};

fn person_address(person: &Person) -> &Aggregated<Address> {
    &person.address
}

fn person_address_mut(person: &mut Person) -> &mut Aggregated<Address> {
    &mut person.address
}

static PERSON_ADDRESS: LazyLock<AggregateReflection<Person, Address>> = LazyLock::new(|| {
    AggregateReflection::new("address", "address_id", person_address, person_address_mut)
});

#[test]
fn sql_enum_converts_with_prelude_in_scope() {
    assert_eq!(Value::from(Kind::Work), Value::from("work"));
    assert_eq!(Kind::try_from(Value::from("home")).unwrap(), Kind::Home);
    assert!(Kind::try_from(Value::from("office")).is_err());
    assert_eq!("work".parse::<Kind>().unwrap(), Kind::Work);
    assert_eq!(Kind::Home.to_string(), "home");
}

#[test]
fn derived_models_delegate_with_prelude_in_scope() {
    let people = ModelClass::<Person>::define()
        .and_then(|class| class.aggregate(&PERSON_ADDRESS))
        .unwrap();
    let mut person = Person::default();

    people.write(&mut person, "street", Value::from("Main St")).unwrap();
    people.write(&mut person, "kind=", Value::from(Kind::Home)).unwrap();

    let address = person.address.target().unwrap();
    assert_eq!(address.street, "Main St");
    assert_eq!(address.kind, Some(Kind::Home));
    assert!(people.write(&mut person, "missing", Value::Null).is_err());
}
