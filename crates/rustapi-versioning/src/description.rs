//! Per-version API descriptions
//!
//! Documentation generators describe a deployment one version at a time.
//! [`ApiVersionDescriptionProvider`] turns a catalog into one
//! [`ApiVersionDescription`] per version, [`group_by_version`] lists the
//! endpoints that belong in each version's document, and
//! [`substitute_version`] fills the version into route templates.

use crate::catalog::ApiVersionCatalog;
use crate::mapping::ApiVersionMapping;
use crate::model::ApiVersionModel;
use crate::options::ApiVersioningOptions;
use crate::selector::Candidate;
use crate::version::ApiVersion;
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue, LINK};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `Sunset` response header
pub const SUNSET: HeaderName = HeaderName::from_static("sunset");

/// Link to documentation about a version's retirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunsetLink {
    /// Target URL
    pub url: String,
    /// Optional human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// When and how a version will be retired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunsetPolicy {
    /// Retirement date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Documentation links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SunsetLink>,
}

impl SunsetPolicy {
    /// A policy retiring the version at `date`
    pub fn at(date: DateTime<Utc>) -> Self {
        Self {
            date: Some(date),
            links: Vec::new(),
        }
    }

    /// Add a documentation link
    pub fn link(mut self, url: impl Into<String>, title: Option<&str>) -> Self {
        self.links.push(SunsetLink {
            url: url.into(),
            title: title.map(str::to_string),
        });
        self
    }

    /// The retirement date as an HTTP date, e.g. `Sat, 01 Jun 2024 00:00:00 GMT`
    pub fn http_date(&self) -> Option<String> {
        self.date
            .map(|date| date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    /// `Sunset` and `Link` headers describing this policy
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(value) = self.http_date().and_then(|d| HeaderValue::from_str(&d).ok()) {
            headers.insert(SUNSET, value);
        }

        for link in &self.links {
            let value = match &link.title {
                Some(title) => format!(
                    "<{}>; rel=\"sunset\"; title=\"{}\"",
                    link.url,
                    quote_escape(title)
                ),
                None => format!("<{}>; rel=\"sunset\"", link.url),
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.append(LINK, value);
            }
        }

        headers
    }
}

// quoted-string body: backslash and double quote must be escaped
fn quote_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Description of a single API version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersionDescription {
    /// The described version
    pub api_version: ApiVersion,
    /// Formatted name of the version's document group
    pub group_name: String,
    /// Whether the version is deprecated
    pub is_deprecated: bool,
    /// Retirement policy, if one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset_policy: Option<SunsetPolicy>,
}

/// Builds version descriptions from catalogs
#[derive(Debug, Clone)]
pub struct ApiVersionDescriptionProvider {
    default_version: ApiVersion,
    group_name_format: String,
    route_constraint_name: String,
    substitute_in_url: bool,
    substitution_format: String,
    sunset_policies: BTreeMap<ApiVersion, SunsetPolicy>,
}

impl ApiVersionDescriptionProvider {
    /// Create a provider using the given options
    pub fn new(options: &ApiVersioningOptions) -> Self {
        Self {
            default_version: options.default_api_version.clone(),
            group_name_format: options.group_name_format.clone(),
            route_constraint_name: options.route_constraint_name.clone(),
            substitute_in_url: options.substitute_api_version_in_url,
            substitution_format: options.substitution_format.clone(),
            sunset_policies: BTreeMap::new(),
        }
    }

    /// Attach a sunset policy to a version
    pub fn sunset(mut self, version: ApiVersion, policy: SunsetPolicy) -> Self {
        self.sunset_policies.insert(version, policy);
        self
    }

    /// The sunset policy of a version, if any
    pub fn sunset_policy(&self, version: &ApiVersion) -> Option<&SunsetPolicy> {
        self.sunset_policies.get(version)
    }

    /// Describe every catalogued version in ascending order
    pub fn describe(&self, catalog: &ApiVersionCatalog) -> Vec<ApiVersionDescription> {
        catalog
            .all()
            .into_iter()
            .map(|version| ApiVersionDescription {
                group_name: version.format(&self.group_name_format),
                is_deprecated: catalog.is_deprecated(&version),
                sunset_policy: self.sunset_policies.get(&version).cloned(),
                api_version: version,
            })
            .collect()
    }

    /// Collate `models` and describe the result
    pub fn describe_models<'a, I>(&self, models: I) -> Vec<ApiVersionDescription>
    where
        I: IntoIterator<Item = &'a ApiVersionModel>,
    {
        self.describe(&ApiVersionCatalog::collate(models, &self.default_version))
    }

    /// Route template of `candidate` as documented for `version`
    pub fn route_for<E>(&self, candidate: &Candidate<E>, version: &ApiVersion) -> String {
        if self.substitute_in_url {
            substitute_version(
                candidate.template(),
                &self.route_constraint_name,
                version,
                &self.substitution_format,
            )
        } else {
            candidate.template().to_string()
        }
    }
}

impl Default for ApiVersionDescriptionProvider {
    fn default() -> Self {
        Self::new(&ApiVersioningOptions::default())
    }
}

/// Candidates belonging to each catalogued version
///
/// A candidate belongs to a version it implements. Version-neutral
/// candidates belong to every version.
pub fn group_by_version<'a, E>(
    catalog: &ApiVersionCatalog,
    candidates: &'a [Candidate<E>],
) -> BTreeMap<ApiVersion, Vec<&'a Candidate<E>>> {
    catalog
        .all()
        .into_iter()
        .map(|version| {
            let members = candidates
                .iter()
                .filter(|c| {
                    c.model().is_api_version_neutral()
                        || c.map_to(Some(&version)) == ApiVersionMapping::Explicit
                })
                .collect();
            (version, members)
        })
        .collect()
}

/// Replace the version parameter of a route template
///
/// Both `{name}` and `{param:name}` forms are replaced, where `name` is the
/// route constraint name. Other parameters are left alone.
pub fn substitute_version(
    template: &str,
    constraint_name: &str,
    version: &ApiVersion,
    format: &str,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };

        let parameter = &rest[open + 1..close];
        let is_version = parameter == constraint_name
            || parameter
                .rsplit_once(':')
                .is_some_and(|(_, constraint)| constraint == constraint_name);

        out.push_str(&rest[..open]);
        if is_version {
            out.push_str(&version.format(format));
        } else {
            out.push_str(&rest[open..=close]);
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}
