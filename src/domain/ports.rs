use crate::domain::model::{BufferSettings, Layer, TierTable};
use crate::utils::error::Result;

/// Anything that can be turned into a feature collection with a known CRS.
pub trait LayerSource {
    fn load_layer(&self) -> Result<Layer>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

pub trait RegulationProvider {
    fn buffer_settings(&self) -> BufferSettings;
    fn tier_table(&self) -> TierTable;
}
