use std::sync::LazyLock;

use aggregated::prelude::*;
use aggregated::ForeignKeyUpdate;

/// Target implementing the capability itself instead of embedding a flag.
#[derive(Model, Debug, Clone, Default)]
#[aggregated(table = "cities", aggregation_aware)]
struct City {
    #[aggregated(primary_key)]
    id: Option<i64>,
    name: String,
    #[aggregated(skip)]
    created_by_lookup: bool,
}

impl AggregationAware for City {
    fn updated_as_aggregated(&self) -> bool {
        self.created_by_lookup
    }

    fn clear_updated_as_aggregated(&mut self) {
        self.created_by_lookup = false;
    }
}

/// Target without the capability.
#[derive(Model, Debug, Clone, Default)]
struct Country {
    #[aggregated(primary_key)]
    id: Option<i64>,
    code: String,
}

#[derive(Model, Debug, Default)]
#[aggregated(table = "offices")]
struct Office {
    #[aggregated(primary_key)]
    id: Option<i64>,
    #[aggregated(foreign_key = "cities.id")]
    city_id: Option<i64>,
    #[aggregated(foreign_key = "countries.id")]
    country_id: Option<i64>,
    city: Aggregated<City>,
    country: Aggregated<Country>,
}

fn office_city(office: &Office) -> &Aggregated<City> {
    &office.city
}

fn office_city_mut(office: &mut Office) -> &mut Aggregated<City> {
    &mut office.city
}

fn office_country(office: &Office) -> &Aggregated<Country> {
    &office.country
}

fn office_country_mut(office: &mut Office) -> &mut Aggregated<Country> {
    &mut office.country
}

static OFFICE_CITY: LazyLock<AggregateReflection<Office, City>> =
    LazyLock::new(|| AggregateReflection::new("city", "city_id", office_city, office_city_mut));

static OFFICE_COUNTRY: LazyLock<AggregateReflection<Office, Country>> = LazyLock::new(|| {
    AggregateReflection::new("country", "country_id", office_country, office_country_mut)
});

fn offices() -> ModelClass<Office> {
    ModelClass::<Office>::define()
        .and_then(|class| class.aggregate(&OFFICE_CITY))
        .and_then(|class| class.aggregate(&OFFICE_COUNTRY))
        .unwrap()
}

fn city(id: i64, created_by_lookup: bool) -> City {
    City {
        id: Some(id),
        name: "Springfield".to_string(),
        created_by_lookup,
    }
}

#[test]
fn updated_truth_table() {
    // (framework flag, target signal) -> updated
    let mut neither = Office::default();
    neither.city.resolve(city(1, false));
    assert!(!OFFICE_CITY.updated(&neither));

    let mut target_only = Office::default();
    target_only.city.resolve(city(1, true));
    assert!(OFFICE_CITY.updated(&target_only));

    let mut framework_only = Office::default();
    framework_only.city.replace(city(1, false));
    assert!(OFFICE_CITY.updated(&framework_only));

    let mut both = Office::default();
    both.city.replace(city(1, true));
    assert!(OFFICE_CITY.updated(&both));
}

#[test]
fn absent_target_is_not_updated() {
    let office = Office {
        city_id: Some(3),
        city: Aggregated::from_fk(3_i64),
        ..Office::default()
    };
    assert!(!office.city.updated());
    assert!(!office.country.updated());
}

#[test]
fn target_without_capability_only_uses_framework_flag() {
    let mut office = Office::default();
    office.country.resolve(Country {
        id: Some(5),
        code: "NL".to_string(),
    });
    assert!(!OFFICE_COUNTRY.updated(&office));

    office.country.replace(Country {
        id: Some(6),
        code: "BE".to_string(),
    });
    assert!(OFFICE_COUNTRY.updated(&office));
}

#[test]
fn sync_writes_every_pending_foreign_key() {
    let offices = offices();
    let mut office = Office {
        city_id: Some(1),
        ..Office::default()
    };
    office.city.resolve(city(8, true));
    office.country.replace(Country {
        id: Some(9),
        code: "DE".to_string(),
    });

    let updates = offices.sync_foreign_keys(&mut office).unwrap();
    assert_eq!(
        updates,
        vec![
            ForeignKeyUpdate {
                association: "city",
                column: "city_id",
                value: Value::BigInt(8),
            },
            ForeignKeyUpdate {
                association: "country",
                column: "country_id",
                value: Value::BigInt(9),
            },
        ]
    );
    assert_eq!(office.city_id, Some(8));
    assert_eq!(office.country_id, Some(9));
    assert!(!office.city.target().unwrap().created_by_lookup);
    assert!(offices.pending_foreign_keys(&office).is_empty());
}

#[test]
fn clearing_an_association_persists_null() {
    let offices = offices();
    let mut office = Office {
        city_id: Some(2),
        city: Aggregated::loaded(city(2, false)),
        ..Office::default()
    };
    office.city.clear();

    let updates = offices.sync_foreign_keys(&mut office).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].value, Value::Null);
    assert_eq!(office.city_id, None);
}

#[test]
fn both_associations_delegate_without_clashing() {
    let offices = offices();
    let mut office = Office::default();

    // `id` stays the owner's; `name` comes from the city and `code` from the country.
    assert!(offices.delegated_method("id").is_none());
    assert!(offices.respond_to("name"));
    assert!(offices.respond_to("code="));

    offices.write(&mut office, "code", Value::from("FR")).unwrap();
    offices.write(&mut office, "name", Value::from("Paris")).unwrap();
    assert_eq!(office.country.target().unwrap().code, "FR");
    assert_eq!(office.city.target().unwrap().name, "Paris");

    // Built targets have no key yet; nothing to persist.
    assert!(office.city.updated());
    assert!(offices.sync_foreign_keys(&mut office).unwrap().is_empty());
}

/// Office variant whose country column cannot hold the country's key.
#[derive(Model, Debug, Default)]
#[aggregated(table = "branches")]
struct Branch {
    #[aggregated(primary_key)]
    id: Option<i64>,
    #[aggregated(foreign_key = "cities.id")]
    city_id: Option<i64>,
    #[aggregated(foreign_key = "countries.code")]
    country_code: Option<String>,
    city: Aggregated<City>,
    country: Aggregated<Country>,
}

fn branch_city(branch: &Branch) -> &Aggregated<City> {
    &branch.city
}

fn branch_city_mut(branch: &mut Branch) -> &mut Aggregated<City> {
    &mut branch.city
}

fn branch_country(branch: &Branch) -> &Aggregated<Country> {
    &branch.country
}

fn branch_country_mut(branch: &mut Branch) -> &mut Aggregated<Country> {
    &mut branch.country
}

static BRANCH_CITY: LazyLock<AggregateReflection<Branch, City>> =
    LazyLock::new(|| AggregateReflection::new("city", "city_id", branch_city, branch_city_mut));

static BRANCH_COUNTRY: LazyLock<AggregateReflection<Branch, Country>> = LazyLock::new(|| {
    AggregateReflection::new("country", "country_code", branch_country, branch_country_mut)
});

#[test]
fn failed_sync_leaves_every_foreign_key_pending() {
    let branches = ModelClass::<Branch>::define()
        .and_then(|class| class.aggregate(&BRANCH_CITY))
        .and_then(|class| class.aggregate(&BRANCH_COUNTRY))
        .unwrap();
    let mut branch = Branch {
        city_id: Some(1),
        ..Branch::default()
    };
    branch.city.resolve(city(8, true));
    branch.country.replace(Country {
        id: Some(9),
        code: "DE".to_string(),
    });

    let err = branches.sync_foreign_keys(&mut branch).unwrap_err();
    assert!(matches!(err, Error::Type(_)));

    // The city column was restored and neither association was synced.
    assert_eq!(branch.city_id, Some(1));
    assert_eq!(branch.country_code, None);
    assert!(branch.city.target().unwrap().created_by_lookup);
    assert!(branch.country.updated());
    assert_eq!(branches.pending_foreign_keys(&branch).len(), 2);
}
