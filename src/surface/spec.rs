/// Closed set of surface shapes. Rebuilding dispatches exhaustively on this,
/// so adding a variant forces every site to handle it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Panel,
    Curved { curve_factor: f32 },
    Cube,
    Sphere,
    Torus,
}

impl Shape {
    pub fn label(&self) -> &'static str {
        match self {
            Shape::Panel => "Panel",
            Shape::Curved { .. } => "Curved",
            Shape::Cube => "Cube",
            Shape::Sphere => "Sphere",
            Shape::Torus => "Torus",
        }
    }

    pub fn is_panel(&self) -> bool {
        matches!(self, Shape::Panel)
    }
}

/// Everything a rebuild needs to know about the target surface. Immutable;
/// parameter changes produce a new spec and a full rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSpec {
    pub shape: Shape,
    pub image_aspect: f32,
}

/// World height of the panel; width follows the image aspect within limits.
pub const PANEL_HEIGHT: f32 = 3.2;
pub const PANEL_MIN_WIDTH: f32 = 2.0;
pub const PANEL_MAX_WIDTH: f32 = 6.2;

/// Grid subdivisions per world unit. Larger panels get denser grids so the
/// displacement has enough vertices to read detail from the height field.
pub const SEGMENTS_PER_UNIT: f32 = 40.0;
pub const MAX_PANEL_SEGMENTS: u32 = 256;

pub const CURVED_RADIAL_SEGMENTS: u32 = 96;
pub const SPHERE_RADIUS_FACTOR: f32 = 0.82;
pub const SPHERE_SEGMENTS: (u32, u32) = (64, 48);
pub const TORUS_RADIUS_FACTOR: f32 = 0.7;
pub const TORUS_TUBE_RADIUS: f32 = 0.4;
pub const TORUS_SEGMENTS: (u32, u32) = (64, 120);

/// Depth offsets are luminance-centered and scaled by this on top of the
/// user-facing intensity.
pub const DEPTH_GAIN: f32 = 1.4;

/// Neighbor faces of the cube keep the same texture at reduced luminance.
pub const CUBE_SIDE_TINT: f32 = 0.9;

impl SurfaceSpec {
    /// Panel world size for this spec: height is fixed, width tracks the
    /// image aspect and is clamped to keep extreme ratios usable.
    pub fn panel_size(&self) -> (f32, f32) {
        let h = PANEL_HEIGHT;
        let w = (h * self.image_aspect).clamp(PANEL_MIN_WIDTH, PANEL_MAX_WIDTH);
        (w, h)
    }
}

/// Displacement parameters; mutating intensity re-runs displacement in place
/// and never triggers a geometry rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthParams {
    pub intensity: f32,
}

impl Default for DepthParams {
    fn default() -> Self {
        Self { intensity: 0.6 }
    }
}
