pub mod buffers;
pub mod engine;
pub mod intersect;
pub mod perimeter;
pub mod projection;
pub mod status;

pub use crate::domain::model::{
    Buffer, BufferMode, BufferSet, BufferSettings, Crs, Evaluation, Feature, GeoPoint, Layer,
    ResultRow, ResultTable, Status, TierTable,
};
pub use crate::domain::ports::{LayerSource, RegulationProvider};
pub use crate::utils::error::Result;
