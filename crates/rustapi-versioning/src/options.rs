//! Deployment-wide versioning options
//!
//! Options deserialize with serde, so they can be embedded in any
//! configuration format. With the `config` feature they can also be loaded
//! from `API_VERSIONING_*` environment variables, optionally after reading a
//! `.env` file.
//!
//! # Example
//!
//! ```ignore
//! use rustapi_versioning::ApiVersioningOptions;
//!
//! // API_VERSIONING_DEFAULT_API_VERSION=2.0
//! // API_VERSIONING_ASSUME_DEFAULT_VERSION_WHEN_UNSPECIFIED=true
//! let options = ApiVersioningOptions::from_dotenv()?;
//! ```

use crate::selector::{
    ApiVersionSelector, ConstantApiVersionSelector, CurrentImplementationApiVersionSelector,
    DefaultApiVersionSelector, LowestImplementedApiVersionSelector,
};
use crate::version::ApiVersion;
use serde::{Deserialize, Serialize};

/// Environment variable prefix used by the `config` feature
pub const ENV_PREFIX: &str = "API_VERSIONING_";

/// Which [`ApiVersionSelector`] picks the version of unversioned requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersionSelectorKind {
    /// [`DefaultApiVersionSelector`]
    #[default]
    Default,
    /// [`CurrentImplementationApiVersionSelector`]
    Current,
    /// [`LowestImplementedApiVersionSelector`]
    Lowest,
    /// [`ConstantApiVersionSelector`] using the default version
    Constant,
}

/// Options shared by every versioned endpoint of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiVersioningOptions {
    /// Version assumed when a request carries none
    pub default_api_version: ApiVersion,
    /// Whether unversioned requests fall back to a selected version
    pub assume_default_version_when_unspecified: bool,
    /// Whether responses report supported and deprecated versions
    pub report_api_versions: bool,
    /// Name of the route constraint marking the version segment
    pub route_constraint_name: String,
    /// Format pattern for per-version group names
    pub group_name_format: String,
    /// Whether the version placeholder is replaced in described routes
    pub substitute_api_version_in_url: bool,
    /// Format pattern used for URL substitution
    pub substitution_format: String,
    /// Default version selection strategy
    pub selector: ApiVersionSelectorKind,
}

impl Default for ApiVersioningOptions {
    fn default() -> Self {
        Self {
            default_api_version: ApiVersion::default(),
            assume_default_version_when_unspecified: false,
            report_api_versions: false,
            route_constraint_name: "apiVersion".to_string(),
            group_name_format: "'v'VVV".to_string(),
            substitute_api_version_in_url: true,
            substitution_format: "VVV".to_string(),
            selector: ApiVersionSelectorKind::Default,
        }
    }
}

impl ApiVersioningOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default version
    pub fn default_api_version(mut self, version: ApiVersion) -> Self {
        self.default_api_version = version;
        self
    }

    /// Assume a version for requests that carry none
    pub fn assume_default_version_when_unspecified(mut self, enabled: bool) -> Self {
        self.assume_default_version_when_unspecified = enabled;
        self
    }

    /// Report supported and deprecated versions in responses
    pub fn report_api_versions(mut self, enabled: bool) -> Self {
        self.report_api_versions = enabled;
        self
    }

    /// Set the route constraint name
    pub fn route_constraint_name(mut self, name: impl Into<String>) -> Self {
        self.route_constraint_name = name.into();
        self
    }

    /// Set the group name format
    pub fn group_name_format(mut self, format: impl Into<String>) -> Self {
        self.group_name_format = format.into();
        self
    }

    /// Choose the default version selection strategy
    pub fn selector(mut self, kind: ApiVersionSelectorKind) -> Self {
        self.selector = kind;
        self
    }

    /// Instantiate the configured selector
    pub fn build_selector(&self) -> Box<dyn ApiVersionSelector> {
        let default = self.default_api_version.clone();
        match self.selector {
            ApiVersionSelectorKind::Default => Box::new(DefaultApiVersionSelector::new(default)),
            ApiVersionSelectorKind::Current => {
                Box::new(CurrentImplementationApiVersionSelector::new(default))
            }
            ApiVersionSelectorKind::Lowest => {
                Box::new(LowestImplementedApiVersionSelector::new(default))
            }
            ApiVersionSelectorKind::Constant => Box::new(ConstantApiVersionSelector::new(default)),
        }
    }
}

/// Error type for options loading failures
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
}

#[cfg(feature = "config")]
impl ApiVersioningOptions {
    /// Load options from `API_VERSIONING_*` environment variables
    ///
    /// Unset variables keep their default values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let options = envy::prefixed(ENV_PREFIX).from_env::<Self>()?;
        tracing::debug!(
            default_api_version = %options.default_api_version,
            selector = ?options.selector,
            "Loaded API versioning options"
        );
        Ok(options)
    }

    /// Load a `.env` file if present, then read the environment
    ///
    /// Variables already set in the environment take precedence.
    pub fn from_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApiVersionModel;

    #[test]
    fn test_defaults() {
        let options = ApiVersioningOptions::default();

        assert_eq!(options.default_api_version, ApiVersion::new(1, 0));
        assert!(!options.assume_default_version_when_unspecified);
        assert!(!options.report_api_versions);
        assert_eq!(options.route_constraint_name, "apiVersion");
        assert_eq!(options.group_name_format, "'v'VVV");
        assert!(options.substitute_api_version_in_url);
        assert_eq!(options.substitution_format, "VVV");
        assert_eq!(options.selector, ApiVersionSelectorKind::Default);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let options: ApiVersioningOptions = serde_json::from_str(
            r#"{"default_api_version":"2.0","selector":"current","report_api_versions":true}"#,
        )
        .unwrap();

        assert_eq!(options.default_api_version, ApiVersion::new(2, 0));
        assert_eq!(options.selector, ApiVersionSelectorKind::Current);
        assert!(options.report_api_versions);
        assert_eq!(options.route_constraint_name, "apiVersion");
    }

    #[test]
    fn test_build_selector() {
        let model = ApiVersionModel::implemented(
            [ApiVersion::new(2, 0), ApiVersion::new(3, 0)],
            Vec::<ApiVersion>::new(),
        );

        let options = ApiVersioningOptions::new().selector(ApiVersionSelectorKind::Lowest);
        assert_eq!(options.build_selector().select_version(&model), ApiVersion::new(2, 0));

        let options = ApiVersioningOptions::new().selector(ApiVersionSelectorKind::Constant);
        assert_eq!(options.build_selector().select_version(&model), ApiVersion::new(1, 0));

        let options = ApiVersioningOptions::new();
        assert_eq!(options.build_selector().select_version(&model), ApiVersion::new(3, 0));
    }

    #[cfg(feature = "config")]
    mod env {
        use super::super::*;
        use serial_test::serial;

        fn clear() {
            for (key, _) in std::env::vars() {
                if key.starts_with(ENV_PREFIX) {
                    std::env::remove_var(key);
                }
            }
        }

        #[test]
        #[serial]
        fn test_from_env_uses_defaults_when_unset() {
            clear();
            let options = ApiVersioningOptions::from_env().unwrap();
            assert_eq!(options, ApiVersioningOptions::default());
        }

        #[test]
        #[serial]
        fn test_from_env_reads_prefixed_variables() {
            clear();
            std::env::set_var("API_VERSIONING_DEFAULT_API_VERSION", "2024-01-01.2.0");
            std::env::set_var("API_VERSIONING_ASSUME_DEFAULT_VERSION_WHEN_UNSPECIFIED", "true");
            std::env::set_var("API_VERSIONING_SELECTOR", "lowest");

            let options = ApiVersioningOptions::from_env().unwrap();
            assert_eq!(
                options.default_api_version,
                "2024-01-01.2.0".parse::<ApiVersion>().unwrap()
            );
            assert!(options.assume_default_version_when_unspecified);
            assert_eq!(options.selector, ApiVersionSelectorKind::Lowest);

            clear();
        }

        #[test]
        #[serial]
        fn test_from_env_rejects_bad_version() {
            clear();
            std::env::set_var("API_VERSIONING_DEFAULT_API_VERSION", "not-a-version");

            assert!(ApiVersioningOptions::from_env().is_err());

            clear();
        }
    }
}
