pub mod boundaries;
pub mod combine;
pub mod download;
pub mod etl;
pub mod pipeline;
pub mod sheet;
pub mod workbook;

pub use crate::domain::model::{RawSheet, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
