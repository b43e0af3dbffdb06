//! Routing table for topic → pipelines lookup
//!
//! The table is recompiled on every registration, which is rare. Lookups
//! are a single hash access plus a merge with the wildcard list, and return
//! pipeline ids in registration order.

use std::collections::HashMap;

use crate::{Result, RoutingError, TopicFilter};

#[derive(Debug, Clone)]
struct RouteEntry {
    id: String,
    filters: Vec<TopicFilter>,
}

/// Compiled topic → pipeline routes
///
/// # Example
///
/// ```
/// use edgeflow_routing::RoutingTable;
///
/// let mut table = RoutingTable::new();
/// table.insert("default-pipeline", &["#"]).unwrap();
/// table.insert("alarms", &["events/alarm"]).unwrap();
///
/// assert_eq!(table.route("events/alarm"), vec!["default-pipeline", "alarms"]);
/// assert_eq!(table.route("events/other"), vec!["default-pipeline"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    /// Routes in registration order
    entries: Vec<RouteEntry>,

    /// Exact topic → entry indices, ascending
    exact: HashMap<String, Vec<usize>>,

    /// Entries with a `#` filter, ascending
    wildcard: Vec<usize>,
}

impl RoutingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the route for `id`
    ///
    /// A replaced route keeps its original position in the lookup order.
    ///
    /// # Errors
    /// - `EmptyPipelineId` for a blank id
    /// - `EmptyTopics` when `topics` is empty
    /// - `InvalidTopic` for a blank topic
    pub fn insert(&mut self, id: impl Into<String>, topics: &[impl AsRef<str>]) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RoutingError::EmptyPipelineId);
        }
        if topics.is_empty() {
            return Err(RoutingError::empty_topics(id));
        }

        let filters = topics
            .iter()
            .map(|topic| {
                TopicFilter::parse(topic.as_ref())
                    .ok_or_else(|| RoutingError::invalid_topic(&id, topic.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.filters = filters,
            None => self.entries.push(RouteEntry { id, filters }),
        }
        self.reindex();
        Ok(())
    }

    /// Remove the route for `id`, returning whether it existed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.reindex();
        }
        removed
    }

    /// Ids of every route matching `topic`, in registration order
    pub fn route(&self, topic: &str) -> Vec<&str> {
        let exact = self.exact.get(topic).map(Vec::as_slice).unwrap_or_default();
        let wildcard = self.wildcard.as_slice();

        let mut matched = Vec::with_capacity(exact.len() + wildcard.len());
        let (mut i, mut j) = (0, 0);
        while i < exact.len() || j < wildcard.len() {
            let next = match (exact.get(i), wildcard.get(j)) {
                (Some(&a), Some(&b)) if a < b => {
                    i += 1;
                    a
                }
                (Some(_), Some(&b)) | (None, Some(&b)) => {
                    j += 1;
                    b
                }
                (Some(&a), None) => {
                    i += 1;
                    a
                }
                (None, None) => break,
            };
            matched.push(self.entries[next].id.as_str());
        }
        matched
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Filters registered for `id`
    pub fn filters(&self, id: &str) -> Option<&[TopicFilter]> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.filters.as_slice())
    }

    /// Route ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.exact.clear();
        self.wildcard.clear();

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.filters.iter().any(TopicFilter::is_wildcard) {
                self.wildcard.push(index);
                continue;
            }
            for filter in &entry.filters {
                if let TopicFilter::Exact(topic) = filter {
                    let indices = self.exact.entry(topic.clone()).or_default();
                    if indices.last() != Some(&index) {
                        indices.push(index);
                    }
                }
            }
        }
    }
}
