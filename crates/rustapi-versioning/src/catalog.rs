//! Deployment-wide version catalogs
//!
//! [`ApiVersionCatalog::collate`] sorts every version mentioned by a set of
//! endpoint models into two disjoint buckets, supported and deprecated.
//! Versions that are only ever advertised, and never declared by any
//! endpoint, are left out. When nothing remains the configured default
//! version is reported as the only supported version.
//!
//! Collation is pure. [`VersionCatalogCache`] memoizes its result per table
//! and route, and recomputes only when the table's version stamp moves.

use crate::model::ApiVersionModel;
use crate::registry::EndpointTable;
use crate::version::ApiVersion;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Response header listing supported versions
pub const API_SUPPORTED_VERSIONS: HeaderName = HeaderName::from_static("api-supported-versions");

/// Response header listing deprecated versions
pub const API_DEPRECATED_VERSIONS: HeaderName = HeaderName::from_static("api-deprecated-versions");

/// Disjoint sets of supported and deprecated versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionCatalog {
    supported: BTreeSet<ApiVersion>,
    deprecated: BTreeSet<ApiVersion>,
}

impl ApiVersionCatalog {
    /// Bucketize the versions of `models`
    pub fn collate<'a, I>(models: I, default_version: &ApiVersion) -> Self
    where
        I: IntoIterator<Item = &'a ApiVersionModel>,
    {
        let mut declared = BTreeSet::new();
        let mut supported = BTreeSet::new();
        let mut deprecated = BTreeSet::new();
        let mut advertised_supported = BTreeSet::new();
        let mut advertised_deprecated = BTreeSet::new();

        for model in models {
            declared.extend(model.declared_api_versions().iter().cloned());
            supported.extend(model.reported_supported_api_versions());
            deprecated.extend(model.reported_deprecated_api_versions());
            advertised_supported.extend(model.advertised_api_versions().iter().cloned());
            advertised_deprecated
                .extend(model.deprecated_advertised_api_versions().iter().cloned());
        }

        advertised_supported.retain(|v| !declared.contains(v));
        advertised_deprecated.retain(|v| !declared.contains(v));

        supported.retain(|v| !advertised_supported.contains(v));
        deprecated.retain(|v| {
            !advertised_deprecated.contains(v) && !supported.contains(v)
        });

        if supported.is_empty() && deprecated.is_empty() {
            supported.insert(default_version.clone());
        }

        Self {
            supported,
            deprecated,
        }
    }

    /// Versions reported as supported
    pub fn supported(&self) -> &BTreeSet<ApiVersion> {
        &self.supported
    }

    /// Versions reported as deprecated
    pub fn deprecated(&self) -> &BTreeSet<ApiVersion> {
        &self.deprecated
    }

    /// Whether `version` is deprecated across the deployment
    pub fn is_deprecated(&self, version: &ApiVersion) -> bool {
        self.deprecated.contains(version)
    }

    /// Whether `version` appears in either bucket
    pub fn contains(&self, version: &ApiVersion) -> bool {
        self.supported.contains(version) || self.deprecated.contains(version)
    }

    /// The highest supported version, if any
    pub fn latest(&self) -> Option<&ApiVersion> {
        self.supported.iter().next_back()
    }

    /// Every catalogued version in ascending order
    pub fn all(&self) -> BTreeSet<ApiVersion> {
        self.supported.union(&self.deprecated).cloned().collect()
    }

    /// `api-supported-versions` and `api-deprecated-versions` headers
    ///
    /// Empty buckets produce no header.
    pub fn report_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, versions) in [
            (API_SUPPORTED_VERSIONS, &self.supported),
            (API_DEPRECATED_VERSIONS, &self.deprecated),
        ] {
            if versions.is_empty() {
                continue;
            }
            let joined = versions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&joined) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

/// Identity of a cached catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    /// One route template of a table
    Route {
        /// [`EndpointTable::id`] of the owning table
        table: u64,
        /// Route template
        template: String,
    },
    /// Every endpoint of a table
    Table {
        /// [`EndpointTable::id`] of the table
        table: u64,
    },
}

impl CatalogKey {
    /// Key for a route template of `table`
    pub fn route<E>(table: &EndpointTable<E>, template: impl Into<String>) -> Self {
        Self::Route {
            table: table.id(),
            template: template.into(),
        }
    }

    /// Key for the whole of `table`
    pub fn table<E>(table: &EndpointTable<E>) -> Self {
        Self::Table { table: table.id() }
    }

    /// Id of the table the key belongs to
    pub fn table_id(&self) -> u64 {
        match self {
            Self::Route { table, .. } | Self::Table { table } => *table,
        }
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route { table, template } => write!(f, "table {} route {}", table, template),
            Self::Table { table } => write!(f, "table {}", table),
        }
    }
}

#[derive(Debug)]
struct CachedCatalog {
    stamp: u64,
    catalog: Arc<ApiVersionCatalog>,
}

/// Memoized catalogs keyed by table and route
///
/// Readers share an [`Arc`] to a fully built catalog. A stale or missing
/// entry is rebuilt under that key's shard lock, so concurrent callers for
/// the same key collate once. A cached catalog is reused only while its
/// stamp matches the one supplied by the caller.
#[derive(Debug, Default)]
pub struct VersionCatalogCache {
    entries: DashMap<CatalogKey, CachedCatalog>,
}

impl VersionCatalogCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached catalog for `key`, collating it when stale
    ///
    /// `collate` runs while the key's shard is locked and must not call back
    /// into this cache.
    pub fn get_or_collate<F>(
        &self,
        key: CatalogKey,
        stamp: u64,
        collate: F,
    ) -> Arc<ApiVersionCatalog>
    where
        F: FnOnce() -> ApiVersionCatalog,
    {
        let fresh = self
            .entries
            .get(&key)
            .filter(|cached| cached.stamp == stamp)
            .map(|cached| Arc::clone(&cached.catalog));
        if let Some(catalog) = fresh {
            return catalog;
        }

        match self.entries.entry(key) {
            // another caller finished while we waited for the shard
            Entry::Occupied(entry) if entry.get().stamp == stamp => {
                Arc::clone(&entry.get().catalog)
            }
            Entry::Occupied(mut entry) => {
                let catalog = collated(entry.key(), stamp, collate);
                entry.insert(CachedCatalog {
                    stamp,
                    catalog: Arc::clone(&catalog),
                });
                catalog
            }
            Entry::Vacant(entry) => {
                let catalog = collated(entry.key(), stamp, collate);
                entry.insert(CachedCatalog {
                    stamp,
                    catalog: Arc::clone(&catalog),
                });
                catalog
            }
        }
    }

    /// Catalog for a route template of an endpoint table
    pub fn for_route<E>(
        &self,
        table: &EndpointTable<E>,
        route_template: &str,
        default_version: &ApiVersion,
    ) -> Arc<ApiVersionCatalog> {
        let key = CatalogKey::route(table, route_template);
        self.get_or_collate(key, table.stamp(), || {
            ApiVersionCatalog::collate(
                table.candidates(route_template).iter().map(|c| c.model()),
                default_version,
            )
        })
    }

    /// Catalog spanning every endpoint of a table
    pub fn for_table<E>(
        &self,
        table: &EndpointTable<E>,
        default_version: &ApiVersion,
    ) -> Arc<ApiVersionCatalog> {
        self.get_or_collate(CatalogKey::table(table), table.stamp(), || {
            ApiVersionCatalog::collate(table.models(), default_version)
        })
    }

    /// Drop the cached catalog for `key`
    pub fn invalidate(&self, key: &CatalogKey) {
        self.entries.remove(key);
    }

    /// Drop every cached catalog of a table
    pub fn invalidate_table<E>(&self, table: &EndpointTable<E>) {
        let id = table.id();
        self.entries.retain(|key, _| key.table_id() != id);
    }

    /// Drop every cached catalog
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached catalogs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collated<F>(key: &CatalogKey, stamp: u64, collate: F) -> Arc<ApiVersionCatalog>
where
    F: FnOnce() -> ApiVersionCatalog,
{
    let catalog = Arc::new(collate());
    tracing::debug!(
        group = %key,
        stamp,
        supported = catalog.supported().len(),
        deprecated = catalog.deprecated().len(),
        "Collated API version catalog"
    );
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApiVersionMetadata;
    use http::Method;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NONE: [ApiVersion; 0] = [];

    fn v(text: &str) -> ApiVersion {
        text.parse().unwrap()
    }

    fn set(versions: &[&str]) -> BTreeSet<ApiVersion> {
        versions.iter().map(|s| v(s)).collect()
    }

    #[test]
    fn test_empty_models_fall_back_to_default() {
        let models: Vec<ApiVersionModel> =
            vec![ApiVersionModel::default(), ApiVersionModel::neutral()];
        let catalog = ApiVersionCatalog::collate(&models, &v("1.0"));

        assert_eq!(catalog.supported(), &set(&["1.0"]));
        assert!(catalog.deprecated().is_empty());
    }

    #[test]
    fn test_supported_takes_precedence_over_deprecated() {
        let models = vec![
            ApiVersionModel::implemented([v("2.0")], [v("1.0")]),
            ApiVersionModel::implemented([v("1.0")], NONE),
            ApiVersionModel::implemented(NONE, [v("0.9")]),
        ];
        let catalog = ApiVersionCatalog::collate(&models, &v("1.0"));

        assert_eq!(catalog.supported(), &set(&["1.0", "2.0"]));
        assert_eq!(catalog.deprecated(), &set(&["0.9"]));
        assert!(catalog.is_deprecated(&v("0.9")));
        assert_eq!(catalog.latest(), Some(&v("2.0")));
        assert_eq!(catalog.all().len(), 3);
    }

    #[test]
    fn test_advertised_only_versions_are_dropped() {
        let models = vec![
            ApiVersionModel::new([v("1.0")], [v("1.0")], NONE, [v("2.0"), v("3.0")], [v("0.5")]),
            ApiVersionModel::implemented([v("2.0")], NONE),
        ];
        let catalog = ApiVersionCatalog::collate(&models, &v("1.0"));

        assert_eq!(catalog.supported(), &set(&["1.0", "2.0"]));
        assert!(catalog.deprecated().is_empty());
        assert!(!catalog.contains(&v("3.0")));
    }

    #[test]
    fn test_report_headers() {
        let models = vec![ApiVersionModel::implemented([v("2.0"), v("1.0")], [v("0.9")])];
        let headers = ApiVersionCatalog::collate(&models, &v("1.0")).report_headers();

        assert_eq!(headers.get(API_SUPPORTED_VERSIONS).unwrap(), "1.0, 2.0");
        assert_eq!(headers.get(API_DEPRECATED_VERSIONS).unwrap(), "0.9");

        let headers =
            ApiVersionCatalog::collate(&Vec::<ApiVersionModel>::new(), &v("1.0")).report_headers();
        assert!(headers.get(API_DEPRECATED_VERSIONS).is_none());
    }

    fn route(template: &str) -> CatalogKey {
        CatalogKey::Route {
            table: 0,
            template: template.to_string(),
        }
    }

    fn table_declaring(version: &str) -> EndpointTable<&'static str> {
        let mut table = EndpointTable::new();
        table.register(
            "/orders",
            [Method::GET],
            "orders",
            ApiVersionMetadata::new(
                ApiVersionModel::implemented([v(version)], NONE),
                ApiVersionModel::default(),
            ),
        );
        table
    }

    #[test]
    fn test_cache_recomputes_only_on_new_stamp() {
        let cache = VersionCatalogCache::new();
        let calls = AtomicUsize::new(0);
        let collate = || {
            calls.fetch_add(1, Ordering::SeqCst);
            ApiVersionCatalog::collate(&Vec::<ApiVersionModel>::new(), &v("1.0"))
        };

        let first = cache.get_or_collate(route("/orders"), 1, collate);
        let second = cache.get_or_collate(route("/orders"), 1, collate);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get_or_collate(route("/orders"), 2, collate);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.get_or_collate(route("/users"), 2, collate);
        assert_eq!(cache.len(), 2);

        cache.invalidate(&route("/users"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_separates_tables_with_equal_stamps() {
        let cache = VersionCatalogCache::new();
        let first = table_declaring("1.0");
        let second = table_declaring("2.0");
        assert_eq!(first.stamp(), second.stamp());

        let default = v("1.0");
        assert_eq!(cache.for_route(&first, "/orders", &default).supported(), &set(&["1.0"]));
        assert_eq!(cache.for_route(&second, "/orders", &default).supported(), &set(&["2.0"]));
        assert_eq!(cache.for_table(&second, &default).supported(), &set(&["2.0"]));
        assert_eq!(cache.len(), 3);

        cache.invalidate_table(&second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_star_route_is_not_the_whole_table() {
        let cache = VersionCatalogCache::new();
        let mut table = table_declaring("1.0");
        table.register(
            "*",
            Vec::<Method>::new(),
            "fallback",
            ApiVersionMetadata::new(
                ApiVersionModel::implemented([v("3.0")], NONE),
                ApiVersionModel::default(),
            ),
        );

        let default = v("1.0");
        assert_eq!(cache.for_table(&table, &default).supported(), &set(&["1.0", "3.0"]));
        assert_eq!(cache.for_route(&table, "*", &default).supported(), &set(&["3.0"]));
    }

    #[test]
    fn test_cache_is_shared_between_threads() {
        let cache = Arc::new(VersionCatalogCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache.get_or_collate(route("/orders"), 7, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        ApiVersionCatalog::collate(
                            &Vec::<ApiVersionModel>::new(),
                            &ApiVersion::new(1, 0),
                        )
                    })
                })
            })
            .collect();

        for handle in handles {
            let catalog = handle.join().unwrap();
            assert_eq!(catalog.supported().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn arb_model() -> impl Strategy<Value = ApiVersionModel> {
        let versions = || prop::collection::vec(0u32..5, 0..3);
        (versions(), versions(), versions(), versions(), versions()).prop_map(
            |(declared, supported, deprecated, advertised, deprecated_advertised)| {
                ApiVersionModel::new(
                    declared.into_iter().map(ApiVersion::major),
                    supported.into_iter().map(ApiVersion::major),
                    deprecated.into_iter().map(ApiVersion::major),
                    advertised.into_iter().map(ApiVersion::major),
                    deprecated_advertised.into_iter().map(ApiVersion::major),
                )
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_collation_is_idempotent(models in prop::collection::vec(arb_model(), 0..5)) {
            let first = ApiVersionCatalog::collate(&models, &ApiVersion::new(1, 0));
            let second = ApiVersionCatalog::collate(&models, &ApiVersion::new(1, 0));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_buckets_are_disjoint(models in prop::collection::vec(arb_model(), 0..5)) {
            let catalog = ApiVersionCatalog::collate(&models, &ApiVersion::new(1, 0));
            prop_assert!(catalog.supported().is_disjoint(catalog.deprecated()));
            prop_assert!(!catalog.supported().is_empty() || !catalog.deprecated().is_empty());
        }
    }
}
