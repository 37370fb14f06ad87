//! Modules d'export

pub mod geojson;

pub use self::geojson::{FieldType, GeoJsonSink, LayerSchema};
