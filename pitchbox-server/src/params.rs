//! Detection parameter resolution from raw query-string values.
//!
//! Pure validation: no side effects, and a single malformed field fails the
//! whole resolution rather than falling back to its default.

use std::collections::HashMap;

use pitchbox_model::DetectionParams;

use crate::error::ApiError;

/// Resolve the five detection query parameters, applying defaults for the
/// absent ones and range checks for the present ones.
pub fn resolve_params(query: &HashMap<String, String>) -> Result<DetectionParams, ApiError> {
    let defaults = DetectionParams::default();

    let onset_threshold =
        parse_unit_interval(query, "onset_threshold")?.unwrap_or(defaults.onset_threshold);
    let frame_threshold =
        parse_unit_interval(query, "frame_threshold")?.unwrap_or(defaults.frame_threshold);
    let min_note_length_ms =
        parse_positive(query, "minimum_note_length")?.unwrap_or(defaults.min_note_length_ms);
    let min_frequency_hz = parse_positive(query, "minimum_frequency")?;
    let max_frequency_hz = parse_positive(query, "maximum_frequency")?;

    if let (Some(min), Some(max)) = (min_frequency_hz, max_frequency_hz) {
        if min > max {
            return Err(ApiError::InvalidParameter {
                field: "minimum_frequency",
                reason: format!("minimum frequency {min} exceeds maximum frequency {max}"),
            });
        }
    }

    Ok(DetectionParams {
        onset_threshold,
        frame_threshold,
        min_note_length_ms,
        min_frequency_hz,
        max_frequency_hz,
    })
}

fn parse_float(
    query: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<f32>, ApiError> {
    match query.get(field) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f32>()
            .map(Some)
            .map_err(|_| ApiError::InvalidParameter {
                field,
                reason: format!("`{raw}` is not a number"),
            }),
    }
}

/// A float in the closed interval [0, 1].
fn parse_unit_interval(
    query: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<f32>, ApiError> {
    match parse_float(query, field)? {
        None => Ok(None),
        Some(v) if (0.0..=1.0).contains(&v) => Ok(Some(v)),
        Some(v) => Err(ApiError::InvalidParameter {
            field,
            reason: format!("{v} is outside [0, 1]"),
        }),
    }
}

/// A strictly positive, finite float.
fn parse_positive(
    query: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<f32>, ApiError> {
    match parse_float(query, field)? {
        None => Ok(None),
        Some(v) if v > 0.0 && v.is_finite() => Ok(Some(v)),
        Some(v) => Err(ApiError::InvalidParameter {
            field,
            reason: format!("{v} is not a positive number"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_yields_defaults() {
        let params = resolve_params(&query(&[])).unwrap();
        assert_eq!(params, DetectionParams::default());
    }

    #[test]
    fn all_fields_are_honored() {
        let params = resolve_params(&query(&[
            ("onset_threshold", "0.7"),
            ("frame_threshold", "0.2"),
            ("minimum_note_length", "100"),
            ("minimum_frequency", "80"),
            ("maximum_frequency", "2000"),
        ]))
        .unwrap();

        assert_eq!(params.onset_threshold, 0.7);
        assert_eq!(params.frame_threshold, 0.2);
        assert_eq!(params.min_note_length_ms, 100.0);
        assert_eq!(params.min_frequency_hz, Some(80.0));
        assert_eq!(params.max_frequency_hz, Some(2000.0));
    }

    #[test]
    fn interval_bounds_are_inclusive() {
        let params = resolve_params(&query(&[
            ("onset_threshold", "0"),
            ("frame_threshold", "1"),
        ]))
        .unwrap();
        assert_eq!(params.onset_threshold, 0.0);
        assert_eq!(params.frame_threshold, 1.0);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = resolve_params(&query(&[("onset_threshold", "1.5")])).unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidParameter {
                field: "onset_threshold",
                ..
            }
        ));
    }

    #[test]
    fn malformed_field_fails_the_whole_resolution() {
        // A valid onset_threshold does not save a malformed frame_threshold.
        let err = resolve_params(&query(&[
            ("onset_threshold", "0.4"),
            ("frame_threshold", "not-a-number"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidParameter {
                field: "frame_threshold",
                ..
            }
        ));
    }

    #[test]
    fn note_length_must_be_positive() {
        for bad in ["0", "-5", "nan"] {
            let err = resolve_params(&query(&[("minimum_note_length", bad)])).unwrap_err();
            assert!(matches!(err, ApiError::InvalidParameter { .. }), "{bad}");
        }
    }

    #[test]
    fn min_frequency_above_max_is_rejected() {
        let err = resolve_params(&query(&[
            ("minimum_frequency", "2000"),
            ("maximum_frequency", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidParameter {
                field: "minimum_frequency",
                ..
            }
        ));
    }

    #[test]
    fn equal_frequency_bounds_are_allowed() {
        let params = resolve_params(&query(&[
            ("minimum_frequency", "440"),
            ("maximum_frequency", "440"),
        ]))
        .unwrap();
        assert_eq!(params.min_frequency_hz, params.max_frequency_hz);
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let params = resolve_params(&query(&[("sonify", "true")])).unwrap();
        assert_eq!(params, DetectionParams::default());
    }
}
