//! Reading the requested version from a request
//!
//! Readers only extract raw text. Parsing happens later so that a malformed
//! value can be reported with the exact text the client sent. When several
//! sources disagree the result is [`RawApiVersion::Ambiguous`].

use http::header::{HeaderName, ACCEPT, CONTENT_TYPE};
use http::request::Parts;
use std::fmt;

/// Raw version text read from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawApiVersion {
    /// No version was supplied
    Absent,
    /// Exactly one distinct value was supplied
    Single(String),
    /// Several distinct values were supplied
    Ambiguous(Vec<String>),
}

impl RawApiVersion {
    /// Collapse raw values into a single outcome
    ///
    /// Values are trimmed, empty values are ignored and duplicates are
    /// removed ignoring ASCII case, keeping the first spelling seen.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct: Vec<String> = Vec::new();
        for value in values {
            let value = value.as_ref().trim();
            if value.is_empty() || distinct.iter().any(|seen| seen.eq_ignore_ascii_case(value)) {
                continue;
            }
            distinct.push(value.to_string());
        }

        match distinct.len() {
            0 => Self::Absent,
            1 => Self::Single(distinct.remove(0)),
            _ => Self::Ambiguous(distinct),
        }
    }

    /// The single value, if there is exactly one
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Whether nothing was supplied
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// A source of requested version text
pub trait ApiVersionReader: Send + Sync + fmt::Debug {
    /// Every raw value this reader finds in the request
    fn read(&self, request: &Parts) -> Vec<String>;

    /// Every raw value found in a request routed to `route_template`
    ///
    /// Only readers that depend on the route override this; the default
    /// ignores the template.
    fn read_route(&self, request: &Parts, _route_template: &str) -> Vec<String> {
        self.read(request)
    }

    /// Read and collapse the values into a single outcome
    fn read_version(&self, request: &Parts) -> RawApiVersion {
        RawApiVersion::from_values(self.read(request))
    }

    /// [`read_version`](Self::read_version) for a request routed to `route_template`
    fn read_route_version(&self, request: &Parts, route_template: &str) -> RawApiVersion {
        RawApiVersion::from_values(self.read_route(request, route_template))
    }
}

/// Reads the version from a query string parameter
///
/// Parameter names match ignoring ASCII case. Default: `api-version`.
#[derive(Debug, Clone)]
pub struct QueryStringApiVersionReader {
    names: Vec<String>,
}

impl QueryStringApiVersionReader {
    /// Read from the `api-version` parameter
    pub fn new() -> Self {
        Self::with_names(["api-version"])
    }

    /// Read from the given parameter names
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    fn read_query(&self, query: &str) -> Vec<String> {
        query
            .split('&')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                Some((parts.next()?, parts.next()?))
            })
            .filter(|(name, _)| self.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|(_, value)| value.to_string())
            .collect()
    }
}

impl Default for QueryStringApiVersionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionReader for QueryStringApiVersionReader {
    fn read(&self, request: &Parts) -> Vec<String> {
        request
            .uri
            .query()
            .map(|query| self.read_query(query))
            .unwrap_or_default()
    }
}

/// Reads the version from request headers
///
/// Comma-separated header values count as separate values. Default header:
/// `api-version`.
#[derive(Debug, Clone)]
pub struct HeaderApiVersionReader {
    names: Vec<HeaderName>,
}

impl HeaderApiVersionReader {
    /// Read from the `api-version` header
    pub fn new() -> Self {
        Self {
            names: vec![HeaderName::from_static("api-version")],
        }
    }

    /// Read from the given headers
    pub fn with_names(names: impl IntoIterator<Item = HeaderName>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

impl Default for HeaderApiVersionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionReader for HeaderApiVersionReader {
    fn read(&self, request: &Parts) -> Vec<String> {
        self.names
            .iter()
            .flat_map(|name| request.headers.get_all(name))
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|value| value.to_string())
            .collect()
    }
}

/// Reads the version from the URL path segment bound to the route constraint
///
/// The route template locates the segment: `v{apiVersion}` or
/// `{version:apiVersion}` marks where the version sits, and only that path
/// segment is read, minus the literal text around the placeholder. Paths
/// routed to templates without the constraint yield nothing. Default
/// constraint name: `apiVersion`.
#[derive(Debug, Clone)]
pub struct UrlSegmentApiVersionReader {
    constraint_name: String,
    template: Option<String>,
}

impl UrlSegmentApiVersionReader {
    /// Read the segment bound to `{apiVersion}`
    pub fn new() -> Self {
        Self::with_constraint("apiVersion")
    }

    /// Read the segment bound to a custom constraint name
    pub fn with_constraint(constraint_name: impl Into<String>) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            template: None,
        }
    }

    /// Route template used when the request's route is not known
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    fn read_path(&self, path: &str, template: &str) -> Option<String> {
        let (index, prefix, suffix) = self.version_segment(template)?;
        let segment = path.trim_start_matches('/').split('/').nth(index)?;
        let value = segment.strip_prefix(prefix)?.strip_suffix(suffix)?;
        (!value.is_empty()).then(|| value.to_string())
    }

    // segment position of the placeholder plus the literals around it
    fn version_segment<'t>(&self, template: &'t str) -> Option<(usize, &'t str, &'t str)> {
        template
            .trim_start_matches('/')
            .split('/')
            .enumerate()
            .find_map(|(index, segment)| {
                let open = segment.find('{')?;
                let close = open + segment[open..].find('}')?;
                let parameter = &segment[open + 1..close];
                let bound = parameter == self.constraint_name
                    || parameter
                        .rsplit_once(':')
                        .is_some_and(|(_, constraint)| constraint == self.constraint_name);
                bound.then(|| (index, &segment[..open], &segment[close + 1..]))
            })
    }
}

impl Default for UrlSegmentApiVersionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionReader for UrlSegmentApiVersionReader {
    fn read(&self, request: &Parts) -> Vec<String> {
        match &self.template {
            Some(template) => self.read_path(request.uri.path(), template).into_iter().collect(),
            None => Vec::new(),
        }
    }

    fn read_route(&self, request: &Parts, route_template: &str) -> Vec<String> {
        if self.version_segment(route_template).is_none() {
            return self.read(request);
        }
        self.read_path(request.uri.path(), route_template)
            .into_iter()
            .collect()
    }
}

/// Reads the version from a media type parameter
///
/// Both `Accept` and `Content-Type` are inspected, e.g.
/// `Accept: application/json; v=2.0`. Default parameter: `v`.
#[derive(Debug, Clone)]
pub struct MediaTypeApiVersionReader {
    parameter: String,
}

impl MediaTypeApiVersionReader {
    /// Read from the `v` parameter
    pub fn new() -> Self {
        Self::with_parameter("v")
    }

    /// Read from a custom media type parameter
    pub fn with_parameter(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
        }
    }

    fn read_media_types(&self, value: &str) -> Vec<String> {
        value
            .split(',')
            .flat_map(|media_type| media_type.split(';').skip(1))
            .filter_map(|param| param.split_once('='))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(&self.parameter))
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .collect()
    }
}

impl Default for MediaTypeApiVersionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionReader for MediaTypeApiVersionReader {
    fn read(&self, request: &Parts) -> Vec<String> {
        [ACCEPT, CONTENT_TYPE]
            .iter()
            .flat_map(|name| request.headers.get_all(name))
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| self.read_media_types(value))
            .collect()
    }
}

/// Reads from several sources at once
///
/// The values of every reader are pooled, so two sources naming different
/// versions make the request ambiguous.
#[derive(Debug)]
pub struct CombinedApiVersionReader {
    readers: Vec<Box<dyn ApiVersionReader>>,
}

impl CombinedApiVersionReader {
    /// Combine the given readers
    pub fn new(readers: Vec<Box<dyn ApiVersionReader>>) -> Self {
        Self { readers }
    }

    /// Add another reader
    pub fn with(mut self, reader: impl ApiVersionReader + 'static) -> Self {
        self.readers.push(Box::new(reader));
        self
    }
}

/// Query string and URL segment readers combined
impl Default for CombinedApiVersionReader {
    fn default() -> Self {
        combine(vec![
            Box::new(QueryStringApiVersionReader::new()),
            Box::new(UrlSegmentApiVersionReader::new()),
        ])
    }
}

impl ApiVersionReader for CombinedApiVersionReader {
    fn read(&self, request: &Parts) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|reader| reader.read(request))
            .collect()
    }

    fn read_route(&self, request: &Parts, route_template: &str) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|reader| reader.read_route(request, route_template))
            .collect()
    }
}

/// Combine readers into one
pub fn combine(readers: Vec<Box<dyn ApiVersionReader>>) -> CombinedApiVersionReader {
    CombinedApiVersionReader::new(readers)
}
