use crate::utils::error::{AccError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Rejects NaN, infinities, zero and negative distances.
pub fn validate_positive_distance(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Distance must be a finite positive number".to_string(),
        });
    }
    Ok(())
}

pub fn validate_strictly_ascending(field_name: &str, values: &[f64]) -> Result<()> {
    for pair in values.windows(2) {
        if pair[1] <= pair[0] {
            return Err(AccError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: pair[1].to_string(),
                reason: format!("Values must be strictly ascending, {} follows {}", pair[1], pair[0]),
            });
        }
    }
    Ok(())
}

pub fn validate_unique_names(field_name: &str, names: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(*name) {
            return Err(AccError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: name.to_string(),
                reason: "Duplicate name".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_file_extension<'a>(
    field_name: &str,
    file: &'a str,
    allowed_extensions: &[&str],
) -> Result<&'a str> {
    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        })?;

    if !allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    {
        return Err(AccError::UnsupportedFormatError {
            extension: extension.to_string(),
        });
    }

    Ok(extension)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AccError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("regulation.segments", 64, 8).is_ok());
        assert!(validate_positive_number("regulation.segments", 4, 8).is_err());
    }

    #[test]
    fn test_validate_positive_distance() {
        assert!(validate_positive_distance("radius_m", 100.0).is_ok());
        assert!(validate_positive_distance("radius_m", 0.0).is_err());
        assert!(validate_positive_distance("radius_m", -5.0).is_err());
        assert!(validate_positive_distance("radius_m", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_strictly_ascending() {
        assert!(validate_strictly_ascending("radii", &[100.0, 500.0, 1000.0]).is_ok());
        assert!(validate_strictly_ascending("radii", &[100.0, 100.0]).is_err());
        assert!(validate_strictly_ascending("radii", &[500.0, 100.0]).is_err());
        assert!(validate_strictly_ascending("radii", &[]).is_ok());
    }

    #[test]
    fn test_validate_file_extension() {
        assert_eq!(
            validate_file_extension("layer", "zones.GeoJSON", &["geojson", "json"]).unwrap(),
            "GeoJSON"
        );
        assert!(matches!(
            validate_file_extension("layer", "zones.shp", &["geojson", "json"]),
            Err(AccError::UnsupportedFormatError { .. })
        ));
        assert!(validate_file_extension("layer", "zones", &["geojson"]).is_err());
    }

    #[test]
    fn test_validate_unique_names() {
        assert!(validate_unique_names("perimeters", &["100m", "500m"]).is_ok());
        assert!(validate_unique_names("perimeters", &["100m", "100m"]).is_err());
    }
}
