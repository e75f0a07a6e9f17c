// auth_extractor only contributes trait impls; nothing to re-export.
mod auth_extractor;
mod tracing_layer;
mod metrics_layer;

pub use tracing_layer::*;
pub use metrics_layer::*;
