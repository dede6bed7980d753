use std::fmt;

use thiserror::Error;

/// Errors raised while loading or transforming a feature collection
#[derive(Error, Debug)]
pub enum PurgeError {
    /// A feature's geometry does not fit its tag. `variant` is the tag as
    /// written in the document, which may not be a known kind.
    #[error("feature {feature}: invalid {variant} geometry: {defect}")]
    InvalidGeometryVariant {
        feature: usize,
        variant: String,
        defect: GeometryDefect,
    },

    /// A feature with a `null` geometry
    #[error("feature {feature} has no geometry")]
    MissingGeometry { feature: usize },

    /// The document is valid GeoJSON but not something we can process
    #[error("expected a FeatureCollection or a Feature, found {found}")]
    UnsupportedDocument { found: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    GeoJson(#[from] Box<geojson::Error>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unable to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl From<geojson::Error> for PurgeError {
    fn from(err: geojson::Error) -> Self {
        PurgeError::GeoJson(Box::new(err))
    }
}

/// What exactly is wrong with a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryDefect {
    /// A position holds fewer than 2 or more than 3 ordinates
    OrdinateCount { found: usize },

    /// 2D and 3D positions are mixed within one geometry object
    MixedDimensionality,

    /// An ordinate is NaN or infinite
    NonFinite,

    /// The `type` member names no GeoJSON geometry
    UnknownType,

    /// The coordinate arrays are not nested as deep as the tag requires
    Nesting,
}

impl fmt::Display for GeometryDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryDefect::OrdinateCount { found } => {
                write!(f, "position has {found} ordinates, expected 2 or 3")
            }
            GeometryDefect::MixedDimensionality => {
                f.write_str("2D and 3D positions are mixed")
            }
            GeometryDefect::NonFinite => f.write_str("ordinate is not a finite number"),
            GeometryDefect::UnknownType => f.write_str("unknown geometry type"),
            GeometryDefect::Nesting => f.write_str("coordinates do not match the geometry type"),
        }
    }
}

impl GeometryDefect {
    /// Attach the feature index and geometry tag to this defect
    pub fn at(self, feature: usize, variant: impl fmt::Display) -> PurgeError {
        PurgeError::InvalidGeometryVariant {
            feature,
            variant: variant.to_string(),
            defect: self,
        }
    }
}
