pub mod camera;
pub mod gpu;

pub use camera::{Camera, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
pub use gpu::{CapturedFrame, GpuState, SurfaceResources};
