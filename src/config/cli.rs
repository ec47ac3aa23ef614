use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::adapters::geojson_layer::LAYER_EXTENSIONS;
use crate::core::perimeter::PerimeterRule;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "acc-pmo")]
#[command(about = "Regulatory perimeter checks around a production point")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum Command {
    /// Buffer a point, intersect a layer and report the ACC/PMO status
    Evaluate {
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, help = "GeoJSON layer (EPSG:2154 or EPSG:4326)")]
        layer: String,

        #[arg(long, help = "Regulation TOML file, built-in thresholds otherwise")]
        regulation: Option<String>,

        #[arg(long, help = "Write the per-radius table to this CSV file")]
        csv: Option<String>,

        #[arg(long, help = "Write the buffers to this GeoJSON file")]
        buffers_geojson: Option<String>,

        #[arg(long, help = "Print the evaluation as JSON")]
        json: bool,
    },

    /// Check that all participants fit in the collective perimeter
    Perimeter {
        #[arg(long, help = "CSV with id,name,type,lat,lng columns")]
        participants: String,

        #[arg(long, default_value = "2.0", allow_hyphen_values = true, help = "Perimeter diameter D in km (2, 10, 20 or custom)")]
        diameter_km: f64,

        #[arg(long, help = "GeoJSON points of interest to count inside D/2")]
        poi: Option<String>,

        #[arg(long, help = "Write the perimeter circle and participants to this GeoJSON file")]
        geojson: Option<String>,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Evaluate {
                lon,
                lat,
                layer,
                regulation,
                csv,
                buffers_geojson,
                ..
            } => {
                validation::validate_range("lon", *lon, -180.0, 180.0)?;
                validation::validate_range("lat", *lat, -90.0, 90.0)?;
                validation::validate_path("layer", layer)?;
                validation::validate_file_extension("layer", layer, LAYER_EXTENSIONS)?;
                if let Some(path) = regulation {
                    validation::validate_file_extension("regulation", path, &["toml"])?;
                }
                if let Some(path) = csv {
                    validation::validate_path("csv", path)?;
                }
                if let Some(path) = buffers_geojson {
                    validation::validate_path("buffers_geojson", path)?;
                }
            }
            Command::Perimeter {
                participants,
                diameter_km,
                poi,
                geojson,
                ..
            } => {
                validation::validate_path("participants", participants)?;
                validation::validate_file_extension("participants", participants, &["csv"])?;
                PerimeterRule::from_diameter_km(*diameter_km)?;
                if let Some(path) = poi {
                    validation::validate_file_extension("poi", path, LAYER_EXTENSIONS)?;
                }
                if let Some(path) = geojson {
                    validation::validate_path("geojson", path)?;
                }
            }
        }
        Ok(())
    }
}
