// Adapters layer: file formats the shell reads and writes.

pub mod geojson_layer;
pub mod tabular;

pub use geojson_layer::{open_layer_source, parse_layer, GeoJsonFile};
