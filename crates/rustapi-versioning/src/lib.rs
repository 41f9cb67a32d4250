//! # rustapi-versioning
//!
//! API version resolution for RustAPI services.
//!
//! This crate decides, for every request, which versioned endpoint serves it
//! and why a request cannot be served. It is a library surface only: it
//! reads versions from `http` request parts and renders errors as `http`
//! responses, but owns no server.
//!
//! ## Building blocks
//!
//! - [`ApiVersion`] - ordered version identifiers (`2024-01-31.2.0-beta`)
//! - [`ApiVersionModel`] - what an endpoint implements or advertises
//! - [`map_to`] - how strongly an endpoint matches a requested version
//! - [`ApiVersionCatalog`] - deployment-wide supported and deprecated versions
//! - [`select`] - picks one endpoint among the candidates of a route
//! - [`ApiVersionError`] - the four failure causes, rendered as problem details
//! - [`ApiVersionPolicy`] - all of the above applied to a request
//!
//! ## Features
//!
//! - `config` - load [`ApiVersioningOptions`] from `API_VERSIONING_*`
//!   environment variables and `.env` files
//!
//! ## Example
//!
//! ```rust
//! use rustapi_versioning::{select, ApiVersion, ApiVersionConventionBuilder, Candidate, Selection};
//!
//! let v1 = ApiVersion::new(1, 0);
//! let v2 = ApiVersion::new(2, 0);
//! let model = |v: &ApiVersion| {
//!     ApiVersionConventionBuilder::new()
//!         .has_api_version(v.clone())
//!         .build()
//! };
//!
//! let candidates = [Candidate::new("v1", model(&v1)), Candidate::new("v2", model(&v2))];
//!
//! match select(Some(&v2), &candidates) {
//!     Selection::Single(candidate) => assert_eq!(*candidate.endpoint(), "v2"),
//!     _ => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod catalog;
mod conventions;
mod description;
mod error;
pub mod format;
mod mapping;
mod model;
mod options;
mod policy;
mod reader;
mod registry;
mod selector;
mod version;


pub use catalog::{
    ApiVersionCatalog, CatalogKey, VersionCatalogCache, API_DEPRECATED_VERSIONS,
    API_SUPPORTED_VERSIONS,
};
pub use conventions::{ActionConventionBuilder, ApiVersionConventionBuilder};
pub use description::{
    group_by_version, substitute_version, ApiVersionDescription, ApiVersionDescriptionProvider,
    SunsetLink, SunsetPolicy, SUNSET,
};
pub use error::{ApiVersionError, ErrorCode, ProblemDetails, Result, PROBLEM_JSON};
pub use mapping::{map_to, ApiVersionMapping};
pub use model::{ApiVersionMetadata, ApiVersionModel, MappingMode};
#[cfg(feature = "config")]
pub use options::ConfigError;
pub use options::{ApiVersionSelectorKind, ApiVersioningOptions, ENV_PREFIX};
pub use policy::{ApiVersionPolicy, Match};
pub use reader::{
    combine, ApiVersionReader, CombinedApiVersionReader, HeaderApiVersionReader,
    MediaTypeApiVersionReader, QueryStringApiVersionReader, RawApiVersion,
    UrlSegmentApiVersionReader,
};
pub use registry::{EndpointId, EndpointTable};
pub use selector::{
    select, ApiVersionSelector, Candidate, ConstantApiVersionSelector,
    CurrentImplementationApiVersionSelector, DefaultApiVersionSelector,
    LowestImplementedApiVersionSelector, Selection,
};
pub use version::{ApiVersion, ApiVersionParseError};
