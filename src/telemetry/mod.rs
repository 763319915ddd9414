mod render;
mod sampler;

pub use render::{RenderFormat, Renderer};
pub use sampler::{Snapshot, Telemetry};
