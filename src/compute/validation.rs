//! Validation for geographic coordinates and detector thresholds.

use crate::error::{QueryError, Result};

/// Validates a latitude/longitude pair in degrees.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use quake_query::compute::validation::validate_coordinates;
///
/// // Tohoku 2011
/// assert!(validate_coordinates(38.297, 142.373).is_ok());
///
/// // Invalid latitude
/// assert!(validate_coordinates(95.0, 10.0).is_err());
///
/// // Invalid longitude
/// assert!(validate_coordinates(10.0, 200.0).is_err());
/// ```
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() {
        return Err(QueryError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            latitude
        )));
    }

    if !longitude.is_finite() {
        return Err(QueryError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            longitude
        )));
    }

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(QueryError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(QueryError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            longitude
        )));
    }

    Ok(())
}

/// Validates a distance or time threshold: finite and non-negative.
///
/// ```
/// use quake_query::compute::validation::validate_threshold;
///
/// assert!(validate_threshold("max_distance_km", 50.0).is_ok());
/// assert!(validate_threshold("max_distance_km", 0.0).is_ok());
/// assert!(validate_threshold("max_gap_minutes", -1.0).is_err());
/// assert!(validate_threshold("max_gap_minutes", f64::INFINITY).is_err());
/// ```
pub fn validate_threshold(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(QueryError::InvalidInput(format!(
            "{} must be finite, got: {}",
            name, value
        )));
    }

    if value < 0.0 {
        return Err(QueryError::InvalidInput(format!(
            "{} must be non-negative, got: {}",
            name, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poles_and_antimeridian_are_valid() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_nan_coordinates() {
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_threshold_error_names_field() {
        let err = validate_threshold("max_gap_minutes", -5.0).unwrap_err();
        assert!(err.to_string().contains("max_gap_minutes"));
    }
}
