#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sieve_db::{QueryEngine, SelectRequest};
use sieve_query::{GeoJson, Predicate, PredicateTree, Value};
use sieve_store::{IndexType, MemoryStore, Record};

pub const PEOPLE: &str = "people";
pub const PLACES: &str = "places";
pub const SPECIALS: &str = "specials";

pub const PEOPLE_COUNT: usize = 100;
pub const COLORS: [&str; 5] = ["red", "blue", "yellow", "green", "orange"];
pub const SPECIAL_VALUES: [&str; 8] = [
    ".*abc", "abc.*", "a.*bc", "a[b", "a$b", "a\\b", "a^b", "abcd",
];

/// Expiration shared by every even-numbered person; odd ones never expire.
pub const EXPIRES_AT: i64 = 1_900_000_000;

/// A populated store plus the records that were written, so tests can derive
/// expected results independently of the engine.
pub struct Fixture {
    pub store: MemoryStore,
    pub people: Vec<Record>,
    pub places: Vec<Record>,
}

impl Fixture {
    pub fn engine(&self) -> QueryEngine<&MemoryStore, &MemoryStore> {
        QueryEngine::new(&self.store, &self.store)
    }

    /// Sorted keys of the people matching `keep`.
    pub fn expected_people(&self, keep: impl Fn(&Record) -> bool) -> Vec<String> {
        let mut keys: Vec<String> = self
            .people
            .iter()
            .filter(|r| keep(r))
            .map(|r| r.key.clone())
            .collect();
        keys.sort();
        keys
    }
}

/// Deterministic data set: ages cycle through 25..=29 (20 people each),
/// colours and list contents come from a seeded RNG.
pub fn populate() -> Fixture {
    let store = MemoryStore::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    store.create_collection(PEOPLE).unwrap();
    let mut people = Vec::with_capacity(PEOPLE_COUNT);
    for i in 0..PEOPLE_COUNT {
        let age = 25 + (i % 5) as i64;
        let color = COLORS[rng.gen_range(0..COLORS.len())];
        let color_list: Vec<&str> = (0..rng.gen_range(1..=3))
            .map(|_| COLORS[rng.gen_range(0..COLORS.len())])
            .collect();
        let long_list: Vec<i64> = (0..3).map(|_| rng.gen_range(0..100)).collect();

        let mut record = Record::new(format!("person-{i:03}"))
            .with("name", format!("Person {i}"))
            .with("age", age)
            .with("color", color)
            .with("colorList", Value::list(color_list))
            .with("longList", Value::list(long_list))
            .with("colorAgeMap", Value::map([(color, age)]))
            .with("ageColorMap", Value::map([(age, color)]))
            .with(
                "address",
                Value::map([("city", format!("city-{}", i % 4)), ("zip", format!("{:05}", i))]),
            );
        if i % 2 == 0 {
            record = record.expires_at(EXPIRES_AT);
        }
        let generation = store.put(PEOPLE, record.clone()).unwrap();
        record.generation = generation;
        people.push(record);
    }
    store.create_index(PEOPLE, "age_idx", "age", IndexType::Numeric).unwrap();
    store
        .create_index(PEOPLE, "color_idx", "color", IndexType::String)
        .unwrap();

    store.create_collection(PLACES).unwrap();
    let mut places = Vec::new();
    for i in 0..10 {
        // a line of points heading east from (-122, 37.5), ~9 km apart
        let lon = -122.0 + f64::from(i) * 0.1;
        let record = Record::new(format!("place-{i}"))
            .with("loc", GeoJson::point(lon, 37.5))
            .with("rank", i);
        store.put(PLACES, record.clone()).unwrap();
        places.push(record);
    }
    store
        .create_index(PLACES, "loc_idx", "loc", IndexType::Geo2dSphere)
        .unwrap();

    store.create_collection(SPECIALS).unwrap();
    for (i, value) in SPECIAL_VALUES.iter().enumerate() {
        store
            .put(SPECIALS, Record::new(format!("special-{i}")).with("text", *value))
            .unwrap();
    }

    Fixture {
        store,
        people,
        places,
    }
}

pub fn leaf(predicate: Predicate) -> PredicateTree {
    PredicateTree::leaf(predicate)
}

pub fn select(collection: &str, tree: PredicateTree) -> SelectRequest {
    SelectRequest::new(collection).predicate(tree)
}

/// Sorted keys of the records a select returns.
pub fn keys(records: Vec<Record>) -> Vec<String> {
    let mut keys: Vec<String> = records.into_iter().map(|r| r.key).collect();
    keys.sort();
    keys
}

pub fn age(record: &Record) -> i64 {
    record.get("age").and_then(Value::as_i64).unwrap()
}

pub fn color(record: &Record) -> &str {
    record.get("color").and_then(Value::as_str).unwrap()
}
