//! Matching a requested version against an endpoint model

use crate::model::ApiVersionModel;
use crate::version::ApiVersion;

/// Strength of the match between a requested version and an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersionMapping {
    /// The endpoint does not serve the requested version
    None,
    /// The endpoint implements the requested version
    Explicit,
    /// The endpoint serves the request without implementing the version:
    /// it is version-neutral or only advertises the version
    Implicit,
}

impl ApiVersionMapping {
    /// Whether the endpoint can serve the request at all
    pub fn is_match(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Classify how `model` matches `requested`
///
/// Version-neutral models match implicitly whether or not a version was
/// requested. Otherwise a missing version never matches, an implemented
/// version matches explicitly and an advertised version matches implicitly.
pub fn map_to(model: &ApiVersionModel, requested: Option<&ApiVersion>) -> ApiVersionMapping {
    if model.is_api_version_neutral() {
        return ApiVersionMapping::Implicit;
    }

    let Some(requested) = requested else {
        return ApiVersionMapping::None;
    };

    if model.implements(requested) {
        ApiVersionMapping::Explicit
    } else if model.advertises(requested) {
        ApiVersionMapping::Implicit
    } else {
        ApiVersionMapping::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: [ApiVersion; 0] = [];

    fn v(text: &str) -> ApiVersion {
        text.parse().unwrap()
    }

    #[test]
    fn test_neutral_always_maps_implicitly() {
        let model = ApiVersionModel::neutral();
        assert_eq!(map_to(&model, None), ApiVersionMapping::Implicit);
        assert_eq!(map_to(&model, Some(&v("42.0"))), ApiVersionMapping::Implicit);
    }

    #[test]
    fn test_missing_version_never_maps() {
        let model = ApiVersionModel::implemented([v("1.0")], [v("0.9")]);
        assert_eq!(map_to(&model, None), ApiVersionMapping::None);
    }

    #[test]
    fn test_implemented_and_advertised_versions() {
        let model = ApiVersionModel::new(
            [v("1.0"), v("0.9")],
            [v("1.0")],
            [v("0.9")],
            [v("2.0")],
            [v("0.5")],
        );

        assert_eq!(model.map_to(Some(&v("1.0"))), ApiVersionMapping::Explicit);
        assert_eq!(model.map_to(Some(&v("0.9"))), ApiVersionMapping::Explicit);
        assert_eq!(model.map_to(Some(&v("2.0"))), ApiVersionMapping::Implicit);
        assert_eq!(model.map_to(Some(&v("0.5"))), ApiVersionMapping::Implicit);
        assert_eq!(model.map_to(Some(&v("3.0"))), ApiVersionMapping::None);
        assert!(!ApiVersionMapping::None.is_match());
        assert!(ApiVersionMapping::Implicit.is_match());
    }

    #[test]
    fn test_implemented_wins_over_advertised() {
        let model = ApiVersionModel::new([v("1.0")], [v("1.0")], NONE, [v("1.0")], NONE);
        assert_eq!(model.map_to(Some(&v("1.0"))), ApiVersionMapping::Explicit);
    }

    fn arb_versions() -> impl Strategy<Value = Vec<ApiVersion>> {
        prop::collection::vec((0u32..5, 0u32..3), 0..4)
            .prop_map(|pairs| pairs.into_iter().map(|(a, b)| ApiVersion::new(a, b)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_mapping_classification(
            supported in arb_versions(),
            deprecated in arb_versions(),
            advertised in arb_versions(),
            deprecated_advertised in arb_versions(),
            major in 0u32..5,
            minor in 0u32..3,
        ) {
            let requested = ApiVersion::new(major, minor);
            let model = ApiVersionModel::new(
                supported.iter().chain(&deprecated).cloned().collect::<Vec<_>>(),
                supported.clone(),
                deprecated.clone(),
                advertised.clone(),
                deprecated_advertised.clone(),
            );

            let implemented = supported.contains(&requested) || deprecated.contains(&requested);
            let announced =
                advertised.contains(&requested) || deprecated_advertised.contains(&requested);

            let expected = if implemented {
                ApiVersionMapping::Explicit
            } else if announced {
                ApiVersionMapping::Implicit
            } else {
                ApiVersionMapping::None
            };
            prop_assert_eq!(map_to(&model, Some(&requested)), expected);
        }
    }
}
