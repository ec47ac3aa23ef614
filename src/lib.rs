pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{open_layer_source, parse_layer, GeoJsonFile};
pub use config::RegulationConfig;
pub use core::buffers::generate_buffers;
pub use core::engine::ComplianceEngine;
pub use core::intersect::intersect_layer;
pub use core::perimeter::{check_perimeter, PerimeterReport, PerimeterRule};
pub use core::status::evaluate_acc_status;
pub use domain::model::{
    BufferMode, BufferSet, BufferSettings, Crs, Evaluation, GeoPoint, Layer, Participant,
    ResultRow, ResultTable, Status, TierTable,
};
pub use utils::error::{AccError, Result};
