// Domain layer: core models, file naming rules and ports (interfaces).

pub mod files;
pub mod model;
pub mod ports;
