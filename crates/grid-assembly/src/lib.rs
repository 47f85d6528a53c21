//! Grid dataset assembly pipeline.
//!
//! Consumes decoded grid records (2-D numeric fields plus metadata) and
//! assembles them into 4-axis datasets (time x level x parameter x
//! location) with consistent axes and correctly oriented, cropped,
//! reprojected or stitched spatial fields.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod field;
pub mod interpolate;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod stitch;
pub mod transform;

pub use config::{
    AccumulationSelect, AssemblyConfig, DeriveOptions, InterpolationMethod, ValidRange,
};
pub use dataset::{assemble, AxisSet, Dataset, DatasetSink};
pub use error::{AssemblyError, RejectReason, Result};
pub use field::{is_missing, Field, PreparedRecord};
pub use pipeline::{Pipeline, PipelineOutput};
pub use transform::ReprojectionCache;
