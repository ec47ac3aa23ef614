use chrono::Utc;

use crate::core::buffers::generate_buffers;
use crate::core::intersect::intersect_layer;
use crate::core::status::evaluate_acc_status;
use crate::core::RegulationProvider;
use crate::domain::model::{BufferSettings, Evaluation, GeoPoint, Layer, TierTable};
use crate::utils::error::Result;

/// Runs generate → intersect → evaluate for one production point.
pub struct ComplianceEngine {
    settings: BufferSettings,
    tiers: TierTable,
}

impl ComplianceEngine {
    pub fn new(settings: BufferSettings, tiers: TierTable) -> Self {
        Self { settings, tiers }
    }

    pub fn from_provider<R: RegulationProvider>(provider: &R) -> Self {
        Self::new(provider.buffer_settings(), provider.tier_table())
    }

    pub fn settings(&self) -> &BufferSettings {
        &self.settings
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn run(&self, point: &GeoPoint, layer: &Layer) -> Result<Evaluation> {
        tracing::info!("Evaluating point ({}, {})", point.lon, point.lat);

        let buffers = generate_buffers(point, &self.settings)?;
        tracing::info!("Generated {} buffers", buffers.len());

        let table = intersect_layer(layer, &buffers)?;
        tracing::info!(
            "Intersected {} features, {} of {} buffers hit",
            layer.len(),
            table.iter().filter(|row| row.intersects).count(),
            table.len()
        );

        let status = evaluate_acc_status(&table, &self.tiers)?;
        tracing::info!("Status: {}", status);

        Ok(Evaluation {
            origin: *point,
            buffers,
            table,
            status,
            evaluated_at: Utc::now(),
        })
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new(BufferSettings::default(), TierTable::default())
    }
}
