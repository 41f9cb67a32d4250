//! Request-time version resolution
//!
//! [`ApiVersionPolicy`] ties the pieces together for one request:
//!
//! 1. read the raw version with the configured [`ApiVersionReader`]
//! 2. parse it, or assume one with the configured [`ApiVersionSelector`]
//! 3. keep the candidates accepting the request method
//! 4. [`select`] the endpoint
//! 5. turn a failed selection into an [`ApiVersionError`]
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use rustapi_versioning::{
//!     ApiVersion, ApiVersionConventionBuilder, ActionConventionBuilder, ApiVersionPolicy,
//!     ApiVersioningOptions, EndpointTable, RawApiVersion,
//! };
//!
//! let group = ApiVersionConventionBuilder::new()
//!     .has_api_versions([ApiVersion::new(1, 0), ApiVersion::new(2, 0)])
//!     .build();
//!
//! let mut table = EndpointTable::new();
//! for (version, handler) in [(1, "orders_v1"), (2, "orders_v2")] {
//!     let metadata = ActionConventionBuilder::new()
//!         .map_to_api_version(ApiVersion::new(version, 0))
//!         .build(&group);
//!     table.register("/orders", [Method::GET], handler, metadata);
//! }
//!
//! let policy = ApiVersionPolicy::new(ApiVersioningOptions::default());
//! let matched = policy
//!     .resolve(
//!         &Method::GET,
//!         "/orders",
//!         RawApiVersion::Single("2.0".to_string()),
//!         table.candidates("/orders"),
//!     )
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(*matched.endpoint(), "orders_v2");
//! ```

use crate::catalog::{ApiVersionCatalog, VersionCatalogCache};
use crate::error::{ApiVersionError, Result};
use crate::model::ApiVersionModel;
use crate::options::ApiVersioningOptions;
use crate::reader::{
    combine, ApiVersionReader, QueryStringApiVersionReader, RawApiVersion,
    UrlSegmentApiVersionReader,
};
use crate::registry::EndpointTable;
use crate::selector::{select, ApiVersionSelector, Candidate, DisplayRequested, Selection};
use crate::version::ApiVersion;
use http::header::HeaderMap;
use http::request::Parts;
use http::Method;
use std::sync::Arc;

/// The endpoint chosen for a request
#[derive(Debug)]
pub struct Match<'a, E> {
    candidate: &'a Candidate<E>,
    requested: Option<ApiVersion>,
    assumed: bool,
}

impl<'a, E> Match<'a, E> {
    /// The selected candidate
    pub fn candidate(&self) -> &'a Candidate<E> {
        self.candidate
    }

    /// The selected endpoint handle
    pub fn endpoint(&self) -> &'a E {
        self.candidate.endpoint()
    }

    /// The version the request is served at, if any
    pub fn version(&self) -> Option<&ApiVersion> {
        self.requested.as_ref()
    }

    /// Whether the version was assumed rather than requested
    pub fn is_assumed(&self) -> bool {
        self.assumed
    }
}

/// Deployment-wide request resolution
#[derive(Debug)]
pub struct ApiVersionPolicy {
    options: ApiVersioningOptions,
    reader: Box<dyn ApiVersionReader>,
    selector: Box<dyn ApiVersionSelector>,
    catalogs: VersionCatalogCache,
}

impl ApiVersionPolicy {
    /// Create a policy from options
    ///
    /// Versions are read from the `api-version` query parameter and from
    /// the path segment bound to the route constraint in the route template.
    pub fn new(options: ApiVersioningOptions) -> Self {
        let reader = combine(vec![
            Box::new(QueryStringApiVersionReader::new()),
            Box::new(UrlSegmentApiVersionReader::with_constraint(
                options.route_constraint_name.as_str(),
            )),
        ]);

        Self {
            selector: options.build_selector(),
            reader: Box::new(reader),
            catalogs: VersionCatalogCache::new(),
            options,
        }
    }

    /// Replace the version reader
    pub fn reader(mut self, reader: impl ApiVersionReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Replace the default version selector
    pub fn selector(mut self, selector: impl ApiVersionSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// The options this policy was built with
    pub fn options(&self) -> &ApiVersioningOptions {
        &self.options
    }

    /// Resolve a request against the candidates of its route
    ///
    /// The route template of the first candidate locates a version path
    /// segment.
    pub fn resolve_request<'a, E>(
        &self,
        request: &Parts,
        candidates: &'a [Candidate<E>],
    ) -> Result<Option<Match<'a, E>>> {
        let template = candidates.first().map(Candidate::template).unwrap_or("");
        self.resolve_templated(request, template, candidates)
    }

    /// Resolve a request against a route of an endpoint table
    pub fn resolve_route<'a, E>(
        &self,
        request: &Parts,
        table: &'a EndpointTable<E>,
        route_template: &str,
    ) -> Result<Option<Match<'a, E>>> {
        self.resolve_templated(request, route_template, table.candidates(route_template))
    }

    fn resolve_templated<'a, E>(
        &self,
        request: &Parts,
        route_template: &str,
        candidates: &'a [Candidate<E>],
    ) -> Result<Option<Match<'a, E>>> {
        let raw = self.reader.read_route_version(request, route_template);
        self.resolve(&request.method, request.uri.path(), raw, candidates)
    }

    /// Resolve an already-read version against candidates
    ///
    /// `Ok(None)` means there are no candidates at all, which callers
    /// usually answer with 404.
    pub fn resolve<'a, E>(
        &self,
        method: &Method,
        uri: &str,
        raw: RawApiVersion,
        candidates: &'a [Candidate<E>],
    ) -> Result<Option<Match<'a, E>>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let (requested, assumed) = match self.requested_version(raw, candidates)? {
            Some((version, assumed)) => (Some(version), assumed),
            None => (None, false),
        };

        let selection = select(
            requested.as_ref(),
            candidates.iter().filter(|c| c.allows(method)),
        );

        match selection {
            Selection::Single(candidate) => Ok(Some(Match {
                candidate,
                requested,
                assumed,
            })),
            Selection::Ambiguous(matches) => {
                let err = ApiVersionError::ambiguous(uri, requested.as_ref(), matches);
                tracing::error!(
                    uri,
                    version = %DisplayRequested(requested.as_ref()),
                    error = %err,
                    "Ambiguous versioned endpoint configuration"
                );
                Err(err)
            }
            Selection::None => {
                let err = ApiVersionError::unmatched(method, uri, requested.as_ref(), candidates);
                tracing::debug!(
                    uri,
                    method = %method,
                    code = %err.code(),
                    "No versioned endpoint matched"
                );
                Err(err)
            }
        }
    }

    /// The supported and deprecated versions of a route
    pub fn catalog<E>(
        &self,
        table: &EndpointTable<E>,
        route_template: &str,
    ) -> Arc<ApiVersionCatalog> {
        self.catalogs
            .for_route(table, route_template, &self.options.default_api_version)
    }

    /// Version reporting headers for a route
    ///
    /// Empty unless reporting is enabled.
    pub fn report_headers<E>(&self, table: &EndpointTable<E>, route_template: &str) -> HeaderMap {
        if !self.options.report_api_versions {
            return HeaderMap::new();
        }
        self.catalog(table, route_template).report_headers()
    }

    fn requested_version<E>(
        &self,
        raw: RawApiVersion,
        candidates: &[Candidate<E>],
    ) -> Result<Option<(ApiVersion, bool)>> {
        match raw {
            RawApiVersion::Ambiguous(values) => {
                tracing::debug!(values = ?values, "Conflicting API versions requested");
                Err(ApiVersionError::AmbiguousRequest { values })
            }
            RawApiVersion::Single(text) => match text.parse::<ApiVersion>() {
                Ok(version) => Ok(Some((version, false))),
                Err(source) => {
                    tracing::debug!(raw = %text, error = %source, "Invalid API version requested");
                    Err(ApiVersionError::Invalid { raw: text, source })
                }
            },
            RawApiVersion::Absent if self.options.assume_default_version_when_unspecified => {
                let model = ApiVersionModel::aggregate_all(candidates.iter().map(Candidate::model));
                let version = self.selector.select_version(&model);
                tracing::debug!(version = %version, "Assumed API version");
                Ok(Some((version, true)))
            }
            RawApiVersion::Absent => Ok(None),
        }
    }
}

impl Default for ApiVersionPolicy {
    fn default() -> Self {
        Self::new(ApiVersioningOptions::default())
    }
}
