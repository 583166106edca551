pub mod api;
pub mod batch;
pub mod cache;
pub mod choropleth;
pub mod classify;
pub mod export;
pub mod geojson;
pub mod legend;
pub mod metric;
pub mod options;
pub mod palette;
pub mod reader;

pub use aal_lens_common::{AalLensError, Result};
pub use classify::{classify, Breaks, ClassMethod};
pub use options::ClassifyOptions;
pub use reader::load_observations;
