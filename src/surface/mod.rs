pub mod builder;
pub mod displace;
pub mod spec;

pub use builder::{FaceGroup, PanelGrid, Surface, SurfaceMesh, build};
pub use displace::apply;
pub use spec::{DepthParams, Shape, SurfaceSpec};
