//! Tests for RoutingTable
//!
//! Covers exact and wildcard matching, registration order, replacement and
//! rejected registrations.

use crate::{RoutingError, RoutingTable, TopicFilter};

#[test]
fn test_new_table_is_empty() {
    let table = RoutingTable::new();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
    assert!(table.route("anything").is_empty());
}

#[test]
fn test_exact_topic() {
    let mut table = RoutingTable::new();
    table.insert("alarms", &["events/alarm", "events/fault"]).unwrap();

    assert_eq!(table.route("events/alarm"), vec!["alarms"]);
    assert_eq!(table.route("events/fault"), vec!["alarms"]);
    assert!(table.route("events/other").is_empty());
}

#[test]
fn test_wildcard_matches_all_topics() {
    let mut table = RoutingTable::new();
    table.insert("default-pipeline", &["#"]).unwrap();

    assert_eq!(table.route("a"), vec!["default-pipeline"]);
    assert_eq!(table.route(""), vec!["default-pipeline"]);
}

#[test]
fn test_match_is_any_filter() {
    let mut table = RoutingTable::new();
    table.insert("first", &["t1"]).unwrap();
    table.insert("all", &["#"]).unwrap();
    table.insert("second", &["t2", "t1"]).unwrap();
    table.insert("other", &["t3"]).unwrap();

    assert_eq!(table.route("t1"), vec!["first", "all", "second"]);
    assert_eq!(table.route("t2"), vec!["all", "second"]);
    assert_eq!(table.route("t3"), vec!["all", "other"]);
    assert_eq!(table.route("t4"), vec!["all"]);
}

#[test]
fn test_no_duplicates_for_overlapping_filters() {
    let mut table = RoutingTable::new();
    table.insert("p", &["t", "#", "t"]).unwrap();
    table.insert("q", &["u", "u"]).unwrap();

    assert_eq!(table.route("t"), vec!["p"]);
    assert_eq!(table.route("u"), vec!["p", "q"]);
}

#[test]
fn test_hash_inside_topic_is_literal() {
    let mut table = RoutingTable::new();
    table.insert("p", &["events/#"]).unwrap();

    assert!(table.route("events/x").is_empty());
    assert_eq!(table.route("events/#"), vec!["p"]);
}

#[test]
fn test_replace_keeps_position() {
    let mut table = RoutingTable::new();
    table.insert("a", &["t"]).unwrap();
    table.insert("b", &["t"]).unwrap();
    table.insert("a", &["t", "u"]).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.route("t"), vec!["a", "b"]);
    assert_eq!(table.route("u"), vec!["a"]);
    assert_eq!(
        table.filters("a").unwrap(),
        &[
            TopicFilter::Exact("t".into()),
            TopicFilter::Exact("u".into())
        ]
    );
}

#[test]
fn test_replace_drops_old_topics() {
    let mut table = RoutingTable::new();
    table.insert("a", &["#"]).unwrap();
    table.insert("a", &["only"]).unwrap();

    assert!(table.route("elsewhere").is_empty());
    assert_eq!(table.route("only"), vec!["a"]);
}

#[test]
fn test_remove() {
    let mut table = RoutingTable::new();
    table.insert("a", &["t"]).unwrap();
    table.insert("b", &["#"]).unwrap();

    assert!(table.remove("a"));
    assert!(!table.remove("a"));
    assert!(!table.contains("a"));
    assert_eq!(table.route("t"), vec!["b"]);
    assert_eq!(table.ids().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn test_rejects_invalid_registrations() {
    let mut table = RoutingTable::new();
    let none: &[&str] = &[];

    assert_eq!(table.insert("", &["t"]), Err(RoutingError::EmptyPipelineId));
    assert_eq!(table.insert("  ", &["t"]), Err(RoutingError::EmptyPipelineId));
    assert_eq!(table.insert("p", none), Err(RoutingError::empty_topics("p")));
    assert_eq!(
        table.insert("p", &["t", ""]),
        Err(RoutingError::invalid_topic("p", ""))
    );
    assert!(table.is_empty());
}
