//! Edgeflow - Routing
//!
//! Topic filters and the compiled topic → pipeline routing table.
//!
//! # Matching
//!
//! A pipeline is selected for an envelope topic when any of its filters is
//! `#` or equals the topic exactly. Lookups return pipeline ids in the order
//! the pipelines were first registered.
//!
//! # Example
//!
//! ```
//! use edgeflow_routing::RoutingTable;
//!
//! let mut table = RoutingTable::new();
//! table.insert("default-pipeline", &["#"]).unwrap();
//! table.insert("alarms", &["events/alarm"]).unwrap();
//!
//! let ids = table.route("events/alarm");
//! assert_eq!(ids, vec!["default-pipeline", "alarms"]);
//! ```

mod error;
mod filter;
mod table;

#[cfg(test)]
mod table_test;

pub use error::{Result, RoutingError};
pub use filter::{TopicFilter, WILDCARD};
pub use table::RoutingTable;
