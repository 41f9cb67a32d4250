//! Fluent builders for version declarations
//!
//! These are the registration-time counterpart of version attributes: a
//! group (for example every handler behind one resource) declares the
//! versions it supports, deprecates or advertises, and each endpoint in the
//! group may map itself onto a subset of them.
//!
//! # Example
//!
//! ```rust
//! use rustapi_versioning::{ApiVersion, ApiVersionConventionBuilder, ActionConventionBuilder};
//!
//! let group = ApiVersionConventionBuilder::new()
//!     .has_api_version(ApiVersion::new(2, 0))
//!     .has_deprecated_api_version(ApiVersion::new(1, 0))
//!     .advertises_api_version(ApiVersion::new(3, 0))
//!     .build();
//!
//! let metadata = ActionConventionBuilder::new()
//!     .map_to_api_version(ApiVersion::new(2, 0))
//!     .build(&group);
//!
//! assert!(metadata.endpoint_model().implements(&ApiVersion::new(2, 0)));
//! ```

use crate::model::{ApiVersionMetadata, ApiVersionModel};
use crate::version::ApiVersion;

/// Builder for the version model of an endpoint group
#[derive(Debug, Clone, Default)]
pub struct ApiVersionConventionBuilder {
    neutral: bool,
    supported: Vec<ApiVersion>,
    deprecated: Vec<ApiVersion>,
    advertised: Vec<ApiVersion>,
    deprecated_advertised: Vec<ApiVersion>,
}

impl ApiVersionConventionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a supported version
    pub fn has_api_version(mut self, version: ApiVersion) -> Self {
        self.supported.push(version);
        self
    }

    /// Declare several supported versions
    pub fn has_api_versions(mut self, versions: impl IntoIterator<Item = ApiVersion>) -> Self {
        self.supported.extend(versions);
        self
    }

    /// Declare a deprecated version
    pub fn has_deprecated_api_version(mut self, version: ApiVersion) -> Self {
        self.deprecated.push(version);
        self
    }

    /// Announce a supported version implemented elsewhere
    pub fn advertises_api_version(mut self, version: ApiVersion) -> Self {
        self.advertised.push(version);
        self
    }

    /// Announce a deprecated version implemented elsewhere
    pub fn advertises_deprecated_api_version(mut self, version: ApiVersion) -> Self {
        self.deprecated_advertised.push(version);
        self
    }

    /// Make the group accept any version
    ///
    /// Version declarations are ignored for a neutral group.
    pub fn is_api_version_neutral(mut self) -> Self {
        self.neutral = true;
        self
    }

    /// Build the group model
    pub fn build(&self) -> ApiVersionModel {
        if self.neutral {
            return ApiVersionModel::neutral();
        }

        let declared: Vec<_> = self
            .supported
            .iter()
            .chain(&self.deprecated)
            .cloned()
            .collect();

        ApiVersionModel::new(
            declared,
            self.supported.iter().cloned(),
            self.deprecated.iter().cloned(),
            self.advertised.iter().cloned(),
            self.deprecated_advertised.iter().cloned(),
        )
    }
}

/// Builder for the version metadata of a single endpoint
#[derive(Debug, Clone, Default)]
pub struct ActionConventionBuilder {
    neutral: bool,
    mapped: Vec<ApiVersion>,
}

impl ActionConventionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the endpoint onto one of its group's versions
    pub fn map_to_api_version(mut self, version: ApiVersion) -> Self {
        self.mapped.push(version);
        self
    }

    /// Make the endpoint accept any version
    pub fn is_api_version_neutral(mut self) -> Self {
        self.neutral = true;
        self
    }

    /// Build the endpoint's metadata against its group model
    ///
    /// A mapped version the group deprecates is deprecated on the endpoint
    /// too. An endpoint that maps nothing declares nothing of its own and
    /// inherits the group model under [`crate::MappingMode::Both`].
    pub fn build(&self, api: &ApiVersionModel) -> ApiVersionMetadata {
        if self.neutral || api.is_api_version_neutral() {
            return ApiVersionMetadata::new(api.clone(), ApiVersionModel::neutral());
        }

        if self.mapped.is_empty() {
            return ApiVersionMetadata::new(api.clone(), ApiVersionModel::default());
        }

        let (deprecated, supported): (Vec<_>, Vec<_>) = self
            .mapped
            .iter()
            .cloned()
            .partition(|v| api.deprecated_api_versions().contains(v));

        let endpoint = ApiVersionModel::new(
            self.mapped.iter().cloned(),
            supported,
            deprecated,
            api.advertised_api_versions().iter().cloned(),
            api.deprecated_advertised_api_versions().iter().cloned(),
        );

        ApiVersionMetadata::new(api.clone(), endpoint)
    }
}
