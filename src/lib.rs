use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

pub mod convert;
pub mod error;
pub mod inventory;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod prune;
pub mod report;
pub mod sanitize;
pub mod union;
mod walker;

pub use error::{GeometryDefect, PurgeError};
pub use model::{Coord, Feature, FeatureCollection, Geometry, GeometryKind, PropertyValue};
pub use pipeline::{run, Operation, OperationKind};
pub use plan::PlanConfig;
pub use report::PipelineReport;

/// Read a GeoJSON `FeatureCollection` (or a single `Feature`) from `path`
pub fn load_collection(path: &Path) -> Result<FeatureCollection, PurgeError> {
    info!("Loading file: {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let collection = convert::collection_from_json(json)?;
    info!("Found {} features in file", collection.len());
    Ok(collection)
}

/// Write `collection` to `path` as GeoJSON, indented when `pretty` is set
pub fn save_collection(
    path: &Path,
    collection: &FeatureCollection,
    pretty: bool,
) -> Result<(), PurgeError> {
    let document = convert::collection_to_geojson(collection);

    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &document)?;
    } else {
        serde_json::to_writer(&mut writer, &document)?;
    }
    writer.flush()?;

    info!("Wrote {} features to {}", collection.len(), path.display());
    Ok(())
}
