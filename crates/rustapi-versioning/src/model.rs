//! Per-endpoint API version declarations
//!
//! An [`ApiVersionModel`] records which versions an endpoint implements
//! (supported or deprecated) and which versions it merely announces as
//! existing elsewhere in the API surface (advertised). Models are built once
//! during registration and never mutated afterwards; aggregation and merging
//! always produce new models.

use crate::mapping::{map_to, ApiVersionMapping};
use crate::version::ApiVersion;
use std::collections::BTreeSet;

/// The version declarations of a single endpoint or endpoint group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionModel {
    is_api_version_neutral: bool,
    declared: BTreeSet<ApiVersion>,
    supported: BTreeSet<ApiVersion>,
    deprecated: BTreeSet<ApiVersion>,
    advertised: BTreeSet<ApiVersion>,
    deprecated_advertised: BTreeSet<ApiVersion>,
}

impl ApiVersionModel {
    /// Create a model from its five version sets
    ///
    /// A version listed as both supported and deprecated is kept as
    /// supported; likewise a version both advertised and
    /// deprecated-advertised is kept as advertised.
    pub fn new<D, S, P, A, Q>(
        declared: D,
        supported: S,
        deprecated: P,
        advertised: A,
        deprecated_advertised: Q,
    ) -> Self
    where
        D: IntoIterator<Item = ApiVersion>,
        S: IntoIterator<Item = ApiVersion>,
        P: IntoIterator<Item = ApiVersion>,
        A: IntoIterator<Item = ApiVersion>,
        Q: IntoIterator<Item = ApiVersion>,
    {
        let supported: BTreeSet<_> = supported.into_iter().collect();
        let advertised: BTreeSet<_> = advertised.into_iter().collect();

        Self {
            is_api_version_neutral: false,
            declared: declared.into_iter().collect(),
            deprecated: deprecated
                .into_iter()
                .filter(|v| !supported.contains(v))
                .collect(),
            deprecated_advertised: deprecated_advertised
                .into_iter()
                .filter(|v| !advertised.contains(v))
                .collect(),
            supported,
            advertised,
        }
    }

    /// Create a model for an endpoint that implements the given versions
    ///
    /// Every implemented version is also declared.
    pub fn implemented<S, P>(supported: S, deprecated: P) -> Self
    where
        S: IntoIterator<Item = ApiVersion>,
        P: IntoIterator<Item = ApiVersion>,
    {
        let supported: Vec<_> = supported.into_iter().collect();
        let deprecated: Vec<_> = deprecated.into_iter().collect();
        let declared: Vec<_> = supported.iter().chain(&deprecated).cloned().collect();
        Self::new(
            declared,
            supported,
            deprecated,
            Vec::<ApiVersion>::new(),
            Vec::<ApiVersion>::new(),
        )
    }

    /// A model that accepts any requested version
    pub fn neutral() -> Self {
        Self {
            is_api_version_neutral: true,
            ..Self::default()
        }
    }

    /// Whether the endpoint accepts any requested version
    pub fn is_api_version_neutral(&self) -> bool {
        self.is_api_version_neutral
    }

    /// Versions explicitly attached to this endpoint
    pub fn declared_api_versions(&self) -> &BTreeSet<ApiVersion> {
        &self.declared
    }

    /// Versions this endpoint implements and supports
    pub fn supported_api_versions(&self) -> &BTreeSet<ApiVersion> {
        &self.supported
    }

    /// Versions this endpoint implements but has deprecated
    pub fn deprecated_api_versions(&self) -> &BTreeSet<ApiVersion> {
        &self.deprecated
    }

    /// Supported versions announced but implemented elsewhere
    pub fn advertised_api_versions(&self) -> &BTreeSet<ApiVersion> {
        &self.advertised
    }

    /// Deprecated versions announced but implemented elsewhere
    pub fn deprecated_advertised_api_versions(&self) -> &BTreeSet<ApiVersion> {
        &self.deprecated_advertised
    }

    /// Supported and deprecated versions
    pub fn implemented_api_versions(&self) -> BTreeSet<ApiVersion> {
        self.supported.union(&self.deprecated).cloned().collect()
    }

    /// Supported versions as reported to clients, advertised ones included
    pub fn reported_supported_api_versions(&self) -> BTreeSet<ApiVersion> {
        self.supported.union(&self.advertised).cloned().collect()
    }

    /// Deprecated versions as reported to clients, advertised ones included
    pub fn reported_deprecated_api_versions(&self) -> BTreeSet<ApiVersion> {
        self.deprecated
            .union(&self.deprecated_advertised)
            .cloned()
            .collect()
    }

    /// Every version this model mentions
    pub fn all_api_versions(&self) -> BTreeSet<ApiVersion> {
        self.supported
            .iter()
            .chain(&self.deprecated)
            .chain(&self.advertised)
            .chain(&self.deprecated_advertised)
            .cloned()
            .collect()
    }

    /// Whether this endpoint implements `version`
    pub fn implements(&self, version: &ApiVersion) -> bool {
        self.supported.contains(version) || self.deprecated.contains(version)
    }

    /// Whether this endpoint announces `version` without implementing it
    pub fn advertises(&self, version: &ApiVersion) -> bool {
        self.advertised.contains(version) || self.deprecated_advertised.contains(version)
    }

    /// Whether no version is mentioned at all
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
            && self.supported.is_empty()
            && self.deprecated.is_empty()
            && self.advertised.is_empty()
            && self.deprecated_advertised.is_empty()
    }

    /// How strongly this model matches a requested version
    pub fn map_to(&self, requested: Option<&ApiVersion>) -> ApiVersionMapping {
        map_to(self, requested)
    }

    /// The union of two models
    ///
    /// The result is version-neutral only when both inputs are.
    pub fn aggregate(&self, other: &ApiVersionModel) -> ApiVersionModel {
        let union = |a: &BTreeSet<ApiVersion>, b: &BTreeSet<ApiVersion>| {
            a.union(b).cloned().collect::<Vec<_>>()
        };

        let mut model = Self::new(
            union(&self.declared, &other.declared),
            union(&self.supported, &other.supported),
            union(&self.deprecated, &other.deprecated),
            union(&self.advertised, &other.advertised),
            union(&self.deprecated_advertised, &other.deprecated_advertised),
        );
        model.is_api_version_neutral = self.is_api_version_neutral && other.is_api_version_neutral;
        model
    }

    /// The union of any number of models
    ///
    /// An empty input yields an empty, non-neutral model.
    pub fn aggregate_all<'a, I>(models: I) -> ApiVersionModel
    where
        I: IntoIterator<Item = &'a ApiVersionModel>,
    {
        let mut models = models.into_iter();
        match models.next() {
            Some(first) => models.fold(first.clone(), |acc, model| acc.aggregate(model)),
            None => ApiVersionModel::default(),
        }
    }

    /// Resolve an endpoint model against the model of its enclosing group
    ///
    /// - [`MappingMode::Explicit`] uses only the endpoint's own declarations.
    /// - [`MappingMode::Implicit`] uses only the group's declarations.
    /// - [`MappingMode::Both`] prefers the endpoint's declarations and falls
    ///   back to the group's only when the endpoint declared nothing.
    pub fn merge(
        parent: &ApiVersionModel,
        child: &ApiVersionModel,
        mode: MappingMode,
    ) -> ApiVersionModel {
        match mode {
            MappingMode::Explicit => child.clone(),
            MappingMode::Implicit => parent.clone(),
            MappingMode::Both => {
                if child.is_api_version_neutral || !child.declared.is_empty() {
                    child.clone()
                } else {
                    parent.clone()
                }
            }
        }
    }
}

/// Which declarations take part when resolving an endpoint's model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MappingMode {
    /// Only versions mapped directly onto the endpoint
    Explicit,
    /// Only versions inherited from the enclosing group
    Implicit,
    /// The endpoint's own versions, else the group's
    #[default]
    Both,
}

/// The version models of an endpoint and of the group it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionMetadata {
    api: ApiVersionModel,
    endpoint: ApiVersionModel,
}

impl ApiVersionMetadata {
    /// Create metadata from a group model and an endpoint model
    pub fn new(api: ApiVersionModel, endpoint: ApiVersionModel) -> Self {
        Self { api, endpoint }
    }

    /// Metadata for an endpoint that accepts any version
    pub fn neutral() -> Self {
        Self::new(ApiVersionModel::neutral(), ApiVersionModel::neutral())
    }

    /// The group model
    pub fn api_model(&self) -> &ApiVersionModel {
        &self.api
    }

    /// The endpoint's own model
    pub fn endpoint_model(&self) -> &ApiVersionModel {
        &self.endpoint
    }

    /// Whether the resolved endpoint accepts any version
    pub fn is_api_version_neutral(&self) -> bool {
        self.endpoint.is_api_version_neutral()
            || (self.endpoint.declared.is_empty() && self.api.is_api_version_neutral())
    }

    /// The effective model under the given mapping mode
    pub fn map(&self, mode: MappingMode) -> ApiVersionModel {
        ApiVersionModel::merge(&self.api, &self.endpoint, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [ApiVersion; 0] = [];

    fn v(text: &str) -> ApiVersion {
        text.parse().unwrap()
    }

    #[test]
    fn test_supported_wins_over_deprecated() {
        let model = ApiVersionModel::new(
            [v("1.0")],
            [v("1.0")],
            [v("1.0"), v("0.9")],
            [v("3.0")],
            [v("3.0"), v("0.5")],
        );

        assert!(model.supported_api_versions().contains(&v("1.0")));
        assert!(!model.deprecated_api_versions().contains(&v("1.0")));
        assert!(model.deprecated_api_versions().contains(&v("0.9")));
        assert!(model.advertised_api_versions().contains(&v("3.0")));
        assert_eq!(
            model.deprecated_advertised_api_versions().iter().collect::<Vec<_>>(),
            vec![&v("0.5")]
        );
    }

    #[test]
    fn test_derived_sets() {
        let model = ApiVersionModel::new(
            [v("1.0"), v("2.0")],
            [v("2.0")],
            [v("1.0")],
            [v("3.0")],
            [v("0.5")],
        );

        assert_eq!(
            model.implemented_api_versions(),
            [v("1.0"), v("2.0")].into_iter().collect()
        );
        assert_eq!(
            model.reported_supported_api_versions(),
            [v("2.0"), v("3.0")].into_iter().collect()
        );
        assert_eq!(
            model.reported_deprecated_api_versions(),
            [v("0.5"), v("1.0")].into_iter().collect()
        );
        assert_eq!(model.all_api_versions().len(), 4);
        assert!(model.implements(&v("1.0")));
        assert!(!model.implements(&v("3.0")));
        assert!(model.advertises(&v("3.0")));
    }

    #[test]
    fn test_aggregate_is_a_union() {
        let a = ApiVersionModel::implemented([v("1.0")], NONE);
        let b = ApiVersionModel::implemented([v("2.0")], [v("1.0")]);

        let merged = a.aggregate(&b);
        assert_eq!(
            merged.supported_api_versions(),
            &[v("1.0"), v("2.0")].into_iter().collect()
        );
        assert!(merged.deprecated_api_versions().is_empty());
        assert!(!merged.is_api_version_neutral());

        // inputs are untouched
        assert_eq!(a.supported_api_versions().len(), 1);
    }

    #[test]
    fn test_aggregate_all() {
        let models = [
            ApiVersionModel::implemented([v("1.0")], NONE),
            ApiVersionModel::implemented([v("2.0")], NONE),
            ApiVersionModel::neutral(),
        ];

        let merged = ApiVersionModel::aggregate_all(&models);
        assert_eq!(merged.supported_api_versions().len(), 2);
        assert!(!merged.is_api_version_neutral());

        let neutral = ApiVersionModel::aggregate_all(&[ApiVersionModel::neutral()]);
        assert!(neutral.is_api_version_neutral());

        let none: [ApiVersionModel; 0] = [];
        assert!(ApiVersionModel::aggregate_all(&none).is_empty());
    }

    #[test]
    fn test_merge_modes() {
        let group = ApiVersionModel::implemented([v("1.0"), v("2.0")], NONE);
        let mapped = ApiVersionModel::implemented([v("2.0")], NONE);
        let unmapped = ApiVersionModel::default();

        assert_eq!(ApiVersionModel::merge(&group, &mapped, MappingMode::Explicit), mapped);
        assert_eq!(ApiVersionModel::merge(&group, &mapped, MappingMode::Implicit), group);
        assert_eq!(ApiVersionModel::merge(&group, &mapped, MappingMode::Both), mapped);
        assert_eq!(ApiVersionModel::merge(&group, &unmapped, MappingMode::Both), group);
        assert_eq!(
            ApiVersionModel::merge(&group, &unmapped, MappingMode::Explicit),
            unmapped
        );
    }

    #[test]
    fn test_metadata_neutrality() {
        let metadata =
            ApiVersionMetadata::new(ApiVersionModel::neutral(), ApiVersionModel::default());
        assert!(metadata.is_api_version_neutral());
        assert!(metadata.map(MappingMode::Both).is_api_version_neutral());

        let metadata = ApiVersionMetadata::new(
            ApiVersionModel::implemented([v("1.0")], NONE),
            ApiVersionModel::neutral(),
        );
        assert!(metadata.is_api_version_neutral());
        assert!(metadata.map(MappingMode::Both).is_api_version_neutral());
    }
}
