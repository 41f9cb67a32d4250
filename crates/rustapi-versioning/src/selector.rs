//! Request-time selection of a versioned endpoint
//!
//! [`select`] decides which of the endpoints matching a request serves the
//! requested version. [`ApiVersionSelector`] implementations pick the
//! version to assume when a client did not request one.

use crate::mapping::ApiVersionMapping;
use crate::model::ApiVersionModel;
use crate::version::ApiVersion;
use http::Method;
use std::fmt;

/// An endpoint under consideration for a request
#[derive(Debug, Clone)]
pub struct Candidate<E> {
    endpoint: E,
    model: ApiVersionModel,
    methods: Vec<Method>,
    route_template: String,
}

impl<E> Candidate<E> {
    /// Create a candidate accepting every HTTP method
    pub fn new(endpoint: E, model: ApiVersionModel) -> Self {
        Self {
            endpoint,
            model,
            methods: Vec::new(),
            route_template: String::new(),
        }
    }

    /// Restrict the HTTP methods this candidate accepts
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Attach the route template, used in diagnostics and to locate a URL version segment
    pub fn route_template(mut self, template: impl Into<String>) -> Self {
        self.route_template = template.into();
        self
    }

    /// The endpoint handle
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// The resolved version model
    pub fn model(&self) -> &ApiVersionModel {
        &self.model
    }

    /// Accepted HTTP methods; empty means every method
    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    /// The route template, if one was attached
    pub fn template(&self) -> &str {
        &self.route_template
    }

    /// Whether this candidate accepts `method`
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// How this candidate matches a requested version
    pub fn map_to(&self, requested: Option<&ApiVersion>) -> ApiVersionMapping {
        self.model.map_to(requested)
    }
}

impl<E> fmt::Display for Candidate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.methods.is_empty() {
            write!(f, "* {}", self.route_template)
        } else {
            let methods: Vec<_> = self.methods.iter().map(Method::as_str).collect();
            write!(f, "{} {}", methods.join(","), self.route_template)
        }
    }
}

/// Outcome of selecting among candidates
#[derive(Debug)]
pub enum Selection<'a, E> {
    /// No candidate serves the requested version
    None,
    /// Exactly one candidate serves the requested version
    Single(&'a Candidate<E>),
    /// Several candidates serve the requested version equally well
    Ambiguous(Vec<&'a Candidate<E>>),
}

impl<'a, E> Selection<'a, E> {
    /// The selected candidate, if the outcome is unique
    pub fn single(&self) -> Option<&'a Candidate<E>> {
        match self {
            Self::Single(candidate) => Some(*candidate),
            _ => None,
        }
    }

    /// Whether no candidate matched
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether several candidates matched
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }

    /// Endpoint handles of every matched candidate
    pub fn endpoints(&self) -> Vec<&'a E> {
        match self {
            Self::None => Vec::new(),
            Self::Single(candidate) => vec![(*candidate).endpoint()],
            Self::Ambiguous(candidates) => {
                candidates.iter().copied().map(Candidate::endpoint).collect()
            }
        }
    }
}

/// Select the candidate serving `requested`
///
/// Explicit matches win over implicit ones. A single implicit match is used
/// when nothing matches explicitly. Several matches of the winning strength
/// are ambiguous, which points at conflicting registrations rather than at
/// a bad request.
pub fn select<'a, E, I>(requested: Option<&ApiVersion>, candidates: I) -> Selection<'a, E>
where
    I: IntoIterator<Item = &'a Candidate<E>>,
    E: 'a,
{
    let candidates: Vec<&'a Candidate<E>> = candidates.into_iter().collect();

    match candidates.as_slice() {
        [] => return Selection::None,
        [only] => {
            return if only.map_to(requested).is_match() {
                Selection::Single(only)
            } else {
                Selection::None
            };
        }
        _ => {}
    }

    let mut explicit = Vec::new();
    let mut implicit = Vec::new();
    for candidate in candidates {
        match candidate.map_to(requested) {
            ApiVersionMapping::Explicit => explicit.push(candidate),
            ApiVersionMapping::Implicit => implicit.push(candidate),
            ApiVersionMapping::None => {}
        }
    }

    let selection = match explicit.len() {
        0 => resolve_pool(implicit),
        1 if explicit[0].model().is_api_version_neutral() => {
            explicit.extend(implicit);
            resolve_pool(explicit)
        }
        1 => Selection::Single(explicit[0]),
        _ => Selection::Ambiguous(explicit),
    };

    tracing::debug!(
        version = %DisplayRequested(requested),
        outcome = selection_name(&selection),
        "Selected versioned endpoint"
    );

    selection
}

fn resolve_pool<E>(mut pool: Vec<&Candidate<E>>) -> Selection<'_, E> {
    match pool.len() {
        0 => Selection::None,
        1 => Selection::Single(pool.remove(0)),
        _ => Selection::Ambiguous(pool),
    }
}

fn selection_name<E>(selection: &Selection<'_, E>) -> &'static str {
    match selection {
        Selection::None => "none",
        Selection::Single(_) => "single",
        Selection::Ambiguous(_) => "ambiguous",
    }
}

pub(crate) struct DisplayRequested<'a>(pub(crate) Option<&'a ApiVersion>);

impl fmt::Display for DisplayRequested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(version) => write!(f, "{}", version),
            None => f.write_str("unspecified"),
        }
    }
}

/// Strategy choosing the version to assume when a request has none
pub trait ApiVersionSelector: Send + Sync + fmt::Debug {
    /// Pick a version given the aggregated model of the matching endpoints
    fn select_version(&self, model: &ApiVersionModel) -> ApiVersion;
}

/// Uses the configured default version when the endpoints know it,
/// otherwise the latest supported version
#[derive(Debug, Clone)]
pub struct DefaultApiVersionSelector {
    default_version: ApiVersion,
}

impl DefaultApiVersionSelector {
    /// Create a selector around a default version
    pub fn new(default_version: ApiVersion) -> Self {
        Self { default_version }
    }
}

impl ApiVersionSelector for DefaultApiVersionSelector {
    fn select_version(&self, model: &ApiVersionModel) -> ApiVersion {
        let all = model.all_api_versions();
        if all.is_empty() || all.contains(&self.default_version) {
            return self.default_version.clone();
        }

        model
            .reported_supported_api_versions()
            .into_iter()
            .next_back()
            .or_else(|| all.into_iter().next_back())
            .unwrap_or_else(|| self.default_version.clone())
    }
}

/// Always uses the same version
#[derive(Debug, Clone)]
pub struct ConstantApiVersionSelector {
    version: ApiVersion,
}

impl ConstantApiVersionSelector {
    /// Create a selector that always picks `version`
    pub fn new(version: ApiVersion) -> Self {
        Self { version }
    }
}

impl ApiVersionSelector for ConstantApiVersionSelector {
    fn select_version(&self, _model: &ApiVersionModel) -> ApiVersion {
        self.version.clone()
    }
}

/// Uses the highest implemented release version
///
/// Falls back to the highest implemented pre-release, then to the default
/// version.
#[derive(Debug, Clone)]
pub struct CurrentImplementationApiVersionSelector {
    default_version: ApiVersion,
}

impl CurrentImplementationApiVersionSelector {
    /// Create a selector with a fallback version
    pub fn new(default_version: ApiVersion) -> Self {
        Self { default_version }
    }
}

impl ApiVersionSelector for CurrentImplementationApiVersionSelector {
    fn select_version(&self, model: &ApiVersionModel) -> ApiVersion {
        let supported = model.supported_api_versions();
        supported
            .iter()
            .rev()
            .find(|v| !v.is_prerelease())
            .or_else(|| supported.iter().next_back())
            .cloned()
            .unwrap_or_else(|| self.default_version.clone())
    }
}

/// Uses the lowest implemented version
#[derive(Debug, Clone)]
pub struct LowestImplementedApiVersionSelector {
    default_version: ApiVersion,
}

impl LowestImplementedApiVersionSelector {
    /// Create a selector with a fallback version
    pub fn new(default_version: ApiVersion) -> Self {
        Self { default_version }
    }
}

impl ApiVersionSelector for LowestImplementedApiVersionSelector {
    fn select_version(&self, model: &ApiVersionModel) -> ApiVersion {
        model
            .implemented_api_versions()
            .into_iter()
            .next()
            .unwrap_or_else(|| self.default_version.clone())
    }
}
