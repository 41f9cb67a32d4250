//! Registration table of versioned endpoints
//!
//! The table is filled once at startup (or whenever routes are added) and
//! read on every request. Every table carries a process-unique id, and each
//! registration bumps its version stamp, so cached catalogs derived from it
//! can tell which table they belong to and when they are stale.

use crate::model::{ApiVersionMetadata, ApiVersionModel, MappingMode};
use crate::selector::Candidate;
use http::Method;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_table_id() -> u64 {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Index of a registered endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(usize);

impl EndpointId {
    /// Position of the endpoint in registration order
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Entry {
    route_template: String,
    metadata: ApiVersionMetadata,
}

/// Endpoints grouped by route template, with their resolved version models
///
/// A clone is a new table: it gets its own id and evolves independently.
#[derive(Debug)]
pub struct EndpointTable<E> {
    id: u64,
    mapping: MappingMode,
    entries: Vec<Entry>,
    groups: BTreeMap<String, Vec<Candidate<E>>>,
    stamp: u64,
}

impl<E> EndpointTable<E> {
    /// Create an empty table resolving models with [`MappingMode::Both`]
    pub fn new() -> Self {
        Self::with_mapping(MappingMode::Both)
    }

    /// Create an empty table resolving models with the given mapping mode
    pub fn with_mapping(mapping: MappingMode) -> Self {
        Self {
            id: next_table_id(),
            mapping,
            entries: Vec::new(),
            groups: BTreeMap::new(),
            stamp: 0,
        }
    }

    /// Register an endpoint under a route template
    ///
    /// An empty method list accepts every HTTP method.
    pub fn register(
        &mut self,
        route_template: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
        endpoint: E,
        metadata: ApiVersionMetadata,
    ) -> EndpointId {
        let route_template = route_template.into();
        let id = EndpointId(self.entries.len());

        let candidate = Candidate::new(endpoint, metadata.map(self.mapping))
            .methods(methods)
            .route_template(route_template.clone());

        self.groups
            .entry(route_template.clone())
            .or_default()
            .push(candidate);
        self.entries.push(Entry {
            route_template,
            metadata,
        });
        self.stamp += 1;

        tracing::debug!(
            endpoint = id.0,
            route = %self.entries[id.0].route_template,
            stamp = self.stamp,
            "Registered versioned endpoint"
        );

        id
    }

    /// Process-unique identity of this table
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The mapping mode used to resolve endpoint models
    pub fn mapping(&self) -> MappingMode {
        self.mapping
    }

    /// Version stamp, incremented on every registration
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared metadata of a registered endpoint
    pub fn metadata(&self, id: EndpointId) -> Option<&ApiVersionMetadata> {
        self.entries.get(id.0).map(|entry| &entry.metadata)
    }

    /// Route template of a registered endpoint
    pub fn route_template(&self, id: EndpointId) -> Option<&str> {
        self.entries.get(id.0).map(|entry| entry.route_template.as_str())
    }

    /// Candidates registered under a route template
    pub fn candidates(&self, route_template: &str) -> &[Candidate<E>] {
        self.groups
            .get(route_template)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Registered route templates, in sorted order
    pub fn route_templates(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Every candidate in the table
    pub fn all_candidates(&self) -> impl Iterator<Item = &Candidate<E>> {
        self.groups.values().flatten()
    }

    /// Resolved models of every endpoint in the table
    pub fn models(&self) -> impl Iterator<Item = &ApiVersionModel> {
        self.all_candidates().map(Candidate::model)
    }
}

impl<E: Clone> Clone for EndpointTable<E> {
    fn clone(&self) -> Self {
        Self {
            id: next_table_id(),
            mapping: self.mapping,
            entries: self.entries.clone(),
            groups: self.groups.clone(),
            stamp: self.stamp,
        }
    }
}

impl<E> Default for EndpointTable<E> {
    fn default() -> Self {
        Self::new()
    }
}
