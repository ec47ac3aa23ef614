use crate::core::RegulationProvider;
use crate::domain::model::{BufferMode, BufferSettings, Perimeter, Tier, TierTable};
use crate::utils::error::{AccError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Regulatory thresholds and status lookup, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationConfig {
    pub regulation: RegulationSection,
    pub status: Option<StatusSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationSection {
    pub name: String,
    pub description: Option<String>,
    pub mode: Option<BufferMode>,
    pub segments: Option<usize>,
    pub perimeters: Vec<PerimeterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerimeterConfig {
    pub name: Option<String>,
    pub radius_m: f64,
}

impl PerimeterConfig {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}m", self.radius_m))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSection {
    pub compliant_label: Option<String>,
    pub tiers: Vec<Tier>,
}

impl RegulationConfig {
    /// Loads and parses a regulation file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AccError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AccError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value, leaving unknown names as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AccError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("regulation.name", &self.regulation.name)?;

        if self.regulation.perimeters.is_empty() {
            return Err(AccError::MissingConfigError {
                field: "regulation.perimeters".to_string(),
            });
        }

        let radii: Vec<f64> = self.regulation.perimeters.iter().map(|p| p.radius_m).collect();
        for radius in &radii {
            validation::validate_positive_distance("regulation.perimeters.radius_m", *radius)?;
        }
        validation::validate_strictly_ascending("regulation.perimeters.radius_m", &radii)?;

        let names: Vec<String> = self
            .regulation
            .perimeters
            .iter()
            .map(PerimeterConfig::display_name)
            .collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        validation::validate_unique_names("regulation.perimeters.name", &name_refs)?;

        if let Some(segments) = self.regulation.segments {
            validation::validate_positive_number(
                "regulation.segments",
                segments,
                BufferSettings::MIN_SEGMENTS,
            )?;
        }

        if let Some(status) = &self.status {
            if let Some(label) = &status.compliant_label {
                validation::validate_non_empty_string("status.compliant_label", label)?;
            }
            if status.tiers.is_empty() {
                return Err(AccError::MissingConfigError {
                    field: "status.tiers".to_string(),
                });
            }
            let bounds: Vec<f64> = status.tiers.iter().map(|t| t.up_to_m).collect();
            for bound in &bounds {
                validation::validate_positive_distance("status.tiers.up_to_m", *bound)?;
            }
            validation::validate_strictly_ascending("status.tiers.up_to_m", &bounds)?;
            for tier in &status.tiers {
                validation::validate_non_empty_string("status.tiers.label", &tier.label)?;
            }
        }

        Ok(())
    }
}

impl Default for RegulationConfig {
    fn default() -> Self {
        let settings = BufferSettings::default();
        let tiers = TierTable::default();
        Self {
            regulation: RegulationSection {
                name: "ACC/PMO".to_string(),
                description: None,
                mode: Some(settings.mode),
                segments: Some(settings.segments),
                perimeters: settings
                    .perimeters
                    .into_iter()
                    .map(|p| PerimeterConfig {
                        name: Some(p.name),
                        radius_m: p.radius_m,
                    })
                    .collect(),
            },
            status: Some(StatusSection {
                compliant_label: Some(tiers.compliant_label),
                tiers: tiers.tiers,
            }),
        }
    }
}

impl RegulationProvider for RegulationConfig {
    fn buffer_settings(&self) -> BufferSettings {
        BufferSettings {
            perimeters: self
                .regulation
                .perimeters
                .iter()
                .map(|p| Perimeter::new(p.display_name(), p.radius_m))
                .collect(),
            mode: self.regulation.mode.unwrap_or_default(),
            segments: self
                .regulation
                .segments
                .unwrap_or(BufferSettings::DEFAULT_SEGMENTS),
        }
    }

    fn tier_table(&self) -> TierTable {
        let defaults = TierTable::default();
        match &self.status {
            None => defaults,
            Some(status) => TierTable {
                compliant_label: status
                    .compliant_label
                    .clone()
                    .unwrap_or(defaults.compliant_label),
                tiers: status.tiers.clone(),
            },
        }
    }
}

impl Validate for RegulationConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
