mod common;
use common::*;

use sieve_db::{RecordEvaluator, SelectRequest};
use sieve_query::{Operator, Predicate, PredicateTree};
use sieve_store::IndexQuery;

// ── Plan selection ──────────────────────────────────────────────

#[test]
fn indexed_eq_is_pushed_without_residual() {
    let fx = populate();
    let engine = fx.engine();
    let cursor = engine
        .select(&select(PEOPLE, leaf(Predicate::eq("color", "blue").unwrap())))
        .unwrap();

    let plan = cursor.plan();
    assert_eq!(
        plan.pushed,
        Some(IndexQuery::new("color", Operator::Eq, "blue"))
    );
    assert!(plan.residual.is_none());

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(keys(records), fx.expected_people(|r| color(r) == "blue"));
}

#[test]
fn first_indexed_and_child_is_pushed() {
    let fx = populate();
    let name = leaf(Predicate::containing("name", "3").unwrap());
    let age_leaf = leaf(Predicate::gte("age", 28).unwrap());
    let color_leaf = leaf(Predicate::eq("color", "red").unwrap());
    let tree = PredicateTree::and([name.clone(), age_leaf, color_leaf.clone()]).unwrap();

    let engine = fx.engine();
    let cursor = engine.select(&select(PEOPLE, tree)).unwrap();
    assert_eq!(
        cursor.plan().pushed,
        Some(IndexQuery::new("age", Operator::GtEq, 28))
    );
    assert_eq!(
        cursor.plan().residual,
        Some(PredicateTree::And(vec![name, color_leaf]))
    );

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(
        keys(records),
        fx.expected_people(|r| {
            r.key.contains('3') && age(r) >= 28 && color(r) == "red"
        })
    );
}

#[test]
fn or_at_the_root_is_never_pushed() {
    let fx = populate();
    let tree = PredicateTree::or([
        leaf(Predicate::eq("color", "blue").unwrap()),
        leaf(Predicate::between("age", 28, 30).unwrap()),
    ])
    .unwrap();

    let engine = fx.engine();
    let cursor = engine.select(&select(PEOPLE, tree.clone())).unwrap();
    assert!(cursor.plan().pushed.is_none());
    assert_eq!(cursor.plan().residual, Some(tree));

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(
        keys(records),
        fx.expected_people(|r| color(r) == "blue" || age(r) >= 28)
    );
}

#[test]
fn case_insensitive_and_metadata_leaves_stay_residual() {
    let fx = populate();
    let engine = fx.engine();

    let folded = Predicate::builder("color", Operator::Eq)
        .value("RED")
        .ignore_case(true)
        .build()
        .unwrap();
    let cursor = engine.select(&select(PEOPLE, leaf(folded))).unwrap();
    assert!(cursor.plan().pushed.is_none());

    let expiring = Predicate::expiry(Operator::Gt, 0).unwrap();
    let cursor = engine.select(&select(PEOPLE, leaf(expiring))).unwrap();
    assert!(cursor.plan().pushed.is_none());
}

// ── Storage range contract ──────────────────────────────────────

#[test]
fn pushed_between_matches_inclusive_evaluation() {
    let fx = populate();
    let request = select(PEOPLE, leaf(Predicate::between("age", 26, 29).unwrap()));
    let engine = fx.engine();

    let cursor = engine.select(&request).unwrap();
    assert_eq!(cursor.plan().pushed, Some(IndexQuery::between("age", 26, 30)));
    let indexed = keys(cursor.collect::<Result<Vec<_>, _>>().unwrap());

    fx.store.drop_index(PEOPLE, "age_idx").unwrap();
    let scanned = keys(engine.select_all(&request).unwrap());

    assert_eq!(indexed, scanned);
    assert_eq!(indexed, fx.expected_people(|r| (26..=29).contains(&age(r))));
}

#[test]
fn float_values_in_numeric_index_match_scan() {
    let fx = populate();
    for (key, age) in [("float-26.5", 26.5), ("float-29.5", 29.5), ("float-30.0", 30.0)] {
        fx.store
            .put(PEOPLE, sieve_store::Record::new(key).with("age", age))
            .unwrap();
    }
    let engine = fx.engine();
    let trees = [
        leaf(Predicate::gt("age", 29).unwrap()),
        leaf(Predicate::eq("age", 30).unwrap()),
        leaf(Predicate::lte("age", 26).unwrap()),
        leaf(Predicate::between("age", 26, 29).unwrap()),
    ];

    let indexed: Vec<Vec<String>> = trees
        .iter()
        .map(|t| keys(engine.select_all(&select(PEOPLE, t.clone())).unwrap()))
        .collect();
    fx.store.drop_index(PEOPLE, "age_idx").unwrap();
    let scanned: Vec<Vec<String>> = trees
        .iter()
        .map(|t| keys(engine.select_all(&select(PEOPLE, t.clone())).unwrap()))
        .collect();

    assert_eq!(indexed, scanned);
    assert!(indexed[0].contains(&"float-29.5".to_string()));
    assert_eq!(indexed[1], vec!["float-30.0"]);
    assert!(indexed[3].contains(&"float-26.5".to_string()));
    assert!(!indexed[3].contains(&"float-29.5".to_string()));
}

#[test]
fn float_bound_falls_back_to_inclusive_evaluation() {
    let fx = populate();
    let request = select(
        PEOPLE,
        leaf(Predicate::between("age", 26.0, 29.0).unwrap()),
    );
    let engine = fx.engine();
    let cursor = engine.select(&request).unwrap();
    assert!(cursor.plan().pushed.is_none());

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(records.len(), 80);
}

// ── Hints ───────────────────────────────────────────────────────

#[test]
fn hint_is_pushed_and_whole_tree_becomes_residual() {
    let fx = populate();
    let tree = leaf(Predicate::eq("color", "green").unwrap());
    let request =
        select(PEOPLE, tree.clone()).index_hint(IndexQuery::new("age", Operator::Eq, 27));

    let engine = fx.engine();
    let cursor = engine.select(&request).unwrap();
    assert_eq!(
        cursor.plan().pushed,
        Some(IndexQuery::new("age", Operator::Eq, 27))
    );
    assert_eq!(cursor.plan().residual, Some(tree));

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(
        keys(records),
        fx.expected_people(|r| age(r) == 27 && color(r) == "green")
    );
}

#[test]
fn hint_without_predicate_returns_index_matches() {
    let fx = populate();
    let request =
        SelectRequest::new(PEOPLE).index_hint(IndexQuery::new("age", Operator::Lt, 26));
    let records = fx.engine().select_all(&request).unwrap();
    assert_eq!(keys(records), fx.expected_people(|r| age(r) == 25));
}

#[test]
fn hint_on_unindexed_field_surfaces_storage_error() {
    let fx = populate();
    let request =
        SelectRequest::new(PEOPLE).index_hint(IndexQuery::new("name", Operator::Eq, "Person 1"));
    let err = fx.engine().select_all(&request).err().unwrap();
    assert!(matches!(
        err,
        sieve_db::DbError::Storage { ref collection, filter: Some(ref filter), .. }
            if collection == PEOPLE && filter == "name EQ \"Person 1\""
    ));
}

// ── Residual invariant ──────────────────────────────────────────

/// Pushing an index filter must not change the result: select returns
/// exactly the records the full tree accepts.
#[test]
fn pushed_plans_match_full_evaluation() {
    let fx = populate();
    let engine = fx.engine();
    let evaluator = RecordEvaluator::default();

    let trees = [
        leaf(Predicate::eq("age", 26).unwrap()),
        leaf(Predicate::lt("age", 27).unwrap()),
        leaf(Predicate::gt("age", 27).unwrap()),
        leaf(Predicate::between("age", 25, 27).unwrap()),
        leaf(Predicate::eq("color", "orange").unwrap()),
        PredicateTree::and([
            leaf(Predicate::eq("color", "yellow").unwrap()),
            leaf(Predicate::lte("age", 26).unwrap()),
        ])
        .unwrap(),
        PredicateTree::and([
            leaf(Predicate::starts_with("name", "Person 4").unwrap()),
            leaf(Predicate::gte("age", 27).unwrap()),
            PredicateTree::or([
                leaf(Predicate::eq("color", "red").unwrap()),
                leaf(Predicate::eq("color", "green").unwrap()),
            ])
            .unwrap(),
        ])
        .unwrap(),
    ];

    for tree in trees {
        let expected = fx.expected_people(|r| evaluator.evaluate(r, &tree).unwrap());
        let actual = keys(engine.select_all(&select(PEOPLE, tree.clone())).unwrap());
        assert_eq!(actual, expected, "tree: {tree:?}");
    }
}
