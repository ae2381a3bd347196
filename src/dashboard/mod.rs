pub mod dataset;
pub mod figures;
pub mod page;
pub mod server;
pub mod summary;

pub use dataset::Dataset;
pub use figures::FigureBuilder;
pub use server::{create_router, serve, AppState};
