pub mod aggregate;
pub mod backoff;
pub mod etl;
pub mod input;
pub mod location;
pub mod pipeline;
pub mod render;
pub mod report;

pub use crate::domain::model::{
    LatLon, PostalAggregate, Record, ReportPaths, RunParameters, SummaryStatistics,
    TransformResult,
};
pub use crate::domain::ports::{Geocoder, Pipeline, Storage};
pub use crate::utils::error::Result;
