//! Error types for version resolution
//!
//! Every failure carries a stable [`ErrorCode`] and an HTTP status. Errors
//! render as `application/problem+json` bodies, with an `Allow` header when
//! the version exists but not for the request method.

use crate::selector::Candidate;
use crate::version::{ApiVersion, ApiVersionParseError};
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for version resolution
pub type Result<T, E = ApiVersionError> = std::result::Result<T, E>;

/// Problem details content type
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Stable identifier of a versioning failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No version was supplied and none could be assumed
    ApiVersionUnspecified,
    /// The supplied version could not be parsed
    InvalidApiVersion,
    /// No endpoint serves the supplied version
    UnsupportedApiVersion,
    /// The version could not be resolved to a single value or endpoint
    AmbiguousApiVersion,
}

impl ErrorCode {
    /// The code as it appears in response bodies
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiVersionUnspecified => "ApiVersionUnspecified",
            Self::InvalidApiVersion => "InvalidApiVersion",
            Self::UnsupportedApiVersion => "UnsupportedApiVersion",
            Self::AmbiguousApiVersion => "AmbiguousApiVersion",
        }
    }

    /// Problem type URI
    pub fn type_uri(self) -> &'static str {
        match self {
            Self::ApiVersionUnspecified => "https://docs.api-versioning.org/problems#unspecified",
            Self::InvalidApiVersion => "https://docs.api-versioning.org/problems#invalid",
            Self::UnsupportedApiVersion => "https://docs.api-versioning.org/problems#unsupported",
            Self::AmbiguousApiVersion => "https://docs.api-versioning.org/problems#ambiguous",
        }
    }

    /// Short human-readable title
    pub fn title(self) -> &'static str {
        match self {
            Self::ApiVersionUnspecified => "Unspecified API version",
            Self::InvalidApiVersion => "Invalid API version",
            Self::UnsupportedApiVersion => "Unsupported API version",
            Self::AmbiguousApiVersion => "Ambiguous API version",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request could not be routed to a versioned endpoint
#[derive(Debug, thiserror::Error)]
pub enum ApiVersionError {
    /// No version was supplied and none could be assumed
    #[error("An API version is required, but was not specified.")]
    Unspecified,

    /// The supplied version text is malformed
    #[error("The requested API version '{raw}' is not a valid API version.")]
    Invalid {
        /// Text as sent by the client
        raw: String,
        /// Why parsing failed
        #[source]
        source: ApiVersionParseError,
    },

    /// No endpoint at the request URI serves the version
    #[error("The HTTP resource that matches the request URI '{uri}' does not support the API version '{version}'.")]
    Unsupported {
        /// Request URI
        uri: String,
        /// Requested version
        version: ApiVersion,
    },

    /// The version exists at the request URI, but not for the request method
    #[error("The HTTP resource that matches the request URI '{uri}'{} does not support the HTTP method '{method}'.", version_clause(.version.as_ref()))]
    MethodNotAllowed {
        /// Request URI
        uri: String,
        /// Request method
        method: Method,
        /// Requested or assumed version, if any
        version: Option<ApiVersion>,
        /// Methods that would have matched
        allowed: Vec<Method>,
    },

    /// The client supplied conflicting versions
    #[error("The following API versions were requested: {}. At most, only a single API version may be specified.", .values.join(", "))]
    AmbiguousRequest {
        /// Distinct values supplied
        values: Vec<String>,
    },

    /// Several endpoints claim the same version
    #[error("The request URI '{uri}' with API version '{requested}' matched multiple endpoints: {}.", .endpoints.join("; "))]
    AmbiguousMatch {
        /// Request URI
        uri: String,
        /// Requested or assumed version
        requested: String,
        /// Descriptions of the conflicting endpoints
        endpoints: Vec<String>,
    },
}

impl ApiVersionError {
    /// The stable error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unspecified => ErrorCode::ApiVersionUnspecified,
            Self::Invalid { .. } => ErrorCode::InvalidApiVersion,
            Self::Unsupported { .. } | Self::MethodNotAllowed { .. } => {
                ErrorCode::UnsupportedApiVersion
            }
            Self::AmbiguousRequest { .. } | Self::AmbiguousMatch { .. } => {
                ErrorCode::AmbiguousApiVersion
            }
        }
    }

    /// HTTP status to respond with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::AmbiguousMatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Methods to list in the `Allow` header
    pub fn allowed_methods(&self) -> &[Method] {
        match self {
            Self::MethodNotAllowed { allowed, .. } => allowed.as_slice(),
            _ => &[],
        }
    }

    /// Whether the server configuration, not the client, is at fault
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Build the error for a request that no candidate served
    ///
    /// When some candidate serves the version under a different HTTP method
    /// the error is a 405 listing those methods.
    pub fn unmatched<E>(
        method: &Method,
        uri: &str,
        requested: Option<&ApiVersion>,
        candidates: &[Candidate<E>],
    ) -> Self {
        let mut allowed: Vec<Method> = Vec::new();
        for candidate in candidates {
            if !candidate.map_to(requested).is_match() {
                continue;
            }
            for m in candidate.allowed_methods() {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if !allowed.is_empty() {
            return Self::MethodNotAllowed {
                uri: uri.to_string(),
                method: method.clone(),
                version: requested.cloned(),
                allowed,
            };
        }

        match requested {
            Some(version) => Self::Unsupported {
                uri: uri.to_string(),
                version: version.clone(),
            },
            None => Self::Unspecified,
        }
    }

    /// Build the error for a request several candidates matched
    pub fn ambiguous<'a, E: 'a>(
        uri: &str,
        requested: Option<&ApiVersion>,
        matches: impl IntoIterator<Item = &'a Candidate<E>>,
    ) -> Self {
        Self::AmbiguousMatch {
            uri: uri.to_string(),
            requested: requested
                .map(ToString::to_string)
                .unwrap_or_else(|| "unspecified".to_string()),
            endpoints: matches.into_iter().map(ToString::to_string).collect(),
        }
    }

    /// Message safe to show to clients
    ///
    /// Configuration errors are not described to the client.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            "The request could not be routed to a single API version.".to_string()
        } else {
            self.to_string()
        }
    }

    /// Problem details body for this error
    pub fn problem_details(&self) -> ProblemDetails {
        let code = self.code();
        let requested_version = match self {
            Self::Invalid { raw, .. } => Some(raw.clone()),
            Self::Unsupported { version, .. } => Some(version.to_string()),
            Self::MethodNotAllowed { version, .. } => version.as_ref().map(ToString::to_string),
            _ => None,
        };

        ProblemDetails {
            problem_type: code.type_uri().to_string(),
            title: code.title().to_string(),
            status: self.status().as_u16(),
            detail: self.public_message(),
            code,
            requested_version,
        }
    }

    /// Render the error as an HTTP response
    pub fn to_response(&self) -> http::Response<String> {
        let body = serde_json::to_string(&self.problem_details()).unwrap_or_else(|_| {
            r#"{"title":"Failed to serialize error"}"#.to_string()
        });

        let mut response = http::Response::new(body);
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));

        let allowed = self.allowed_methods();
        if !allowed.is_empty() {
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }

        response
    }
}

fn version_clause(version: Option<&ApiVersion>) -> String {
    version
        .map(|version| format!(" and API version '{}'", version))
        .unwrap_or_default()
}

/// JSON problem details body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// Problem type URI
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short title of the problem
    pub title: String,
    /// HTTP status code
    pub status: u16,
    /// Human-readable explanation
    pub detail: String,
    /// Stable error code
    pub code: ErrorCode,
    /// The version the client asked for, when known
    #[serde(rename = "requestedApiVersion", skip_serializing_if = "Option::is_none", default)]
    pub requested_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApiVersionModel;

    const NONE: [ApiVersion; 0] = [];

    fn v(text: &str) -> ApiVersion {
        text.parse().unwrap()
    }

    fn candidates() -> Vec<Candidate<&'static str>> {
        vec![
            Candidate::new("get_v1", ApiVersionModel::implemented([v("1.0")], NONE))
                .methods([Method::GET])
                .route_template("/orders"),
            Candidate::new("post_v1", ApiVersionModel::implemented([v("1.0")], NONE))
                .methods([Method::POST])
                .route_template("/orders"),
            Candidate::new("get_v2", ApiVersionModel::implemented([v("2.0")], NONE))
                .methods([Method::GET])
                .route_template("/orders"),
        ]
    }

    #[test]
    fn test_codes_and_statuses() {
        let err = ApiVersionError::Unspecified;
        assert_eq!(err.code(), ErrorCode::ApiVersionUnspecified);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiVersionError::AmbiguousRequest {
            values: vec!["1.0".into(), "2.0".into()],
        };
        assert_eq!(err.code(), ErrorCode::AmbiguousApiVersion);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("1.0, 2.0"));

        let err = ApiVersionError::ambiguous("/orders", Some(&v("1.0")), &candidates()[..2]);
        assert_eq!(err.code(), ErrorCode::AmbiguousApiVersion);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("GET /orders"));
        assert!(!err.public_message().contains("/orders"));
    }

    #[test]
    fn test_invalid_keeps_raw_text_and_source() {
        let source = "x.y".parse::<ApiVersion>().unwrap_err();
        let err = ApiVersionError::Invalid {
            raw: "x.y".into(),
            source,
        };

        assert_eq!(err.code(), ErrorCode::InvalidApiVersion);
        assert!(err.to_string().contains("'x.y'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unmatched_version() {
        let err =
            ApiVersionError::unmatched(&Method::GET, "/orders", Some(&v("3.0")), &candidates());
        assert!(matches!(err, ApiVersionError::Unsupported { .. }));
        assert_eq!(err.code(), ErrorCode::UnsupportedApiVersion);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "The HTTP resource that matches the request URI '/orders' does not support the API version '3.0'."
        );
    }

    #[test]
    fn test_unmatched_method() {
        let err =
            ApiVersionError::unmatched(&Method::DELETE, "/orders", Some(&v("1.0")), &candidates());

        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.code(), ErrorCode::UnsupportedApiVersion);
        assert_eq!(err.allowed_methods(), &[Method::GET, Method::POST]);

        let response = err.to_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, POST");
    }

    #[test]
    fn test_unmatched_without_version() {
        let err = ApiVersionError::unmatched(&Method::GET, "/orders", None, &candidates());
        assert!(matches!(err, ApiVersionError::Unspecified));
    }

    #[test]
    fn test_method_not_allowed_on_neutral_endpoint() {
        let health = [Candidate::new("health", ApiVersionModel::neutral())
            .methods([Method::GET])
            .route_template("/health")];

        let err = ApiVersionError::unmatched(&Method::DELETE, "/health", None, &health);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            err.to_string(),
            "The HTTP resource that matches the request URI '/health' does not support the HTTP method 'DELETE'."
        );
        assert!(err.problem_details().requested_version.is_none());

        let err = ApiVersionError::unmatched(&Method::DELETE, "/health", Some(&v("1.0")), &health);
        assert_eq!(
            err.to_string(),
            "The HTTP resource that matches the request URI '/health' and API version '1.0' does not support the HTTP method 'DELETE'."
        );
        assert_eq!(err.problem_details().requested_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_problem_details_response() {
        let err =
            ApiVersionError::unmatched(&Method::GET, "/orders", Some(&v("3.0")), &candidates());
        let response = err.to_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), PROBLEM_JSON);
        assert!(response.headers().get(ALLOW).is_none());

        let body: ProblemDetails = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body.code, ErrorCode::UnsupportedApiVersion);
        assert_eq!(body.status, 400);
        assert_eq!(body.title, "Unsupported API version");
        assert_eq!(body.requested_version.as_deref(), Some("3.0"));

        let json: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(json["code"], "UnsupportedApiVersion");
        assert!(json["type"].as_str().unwrap().starts_with("https://"));
    }
}
