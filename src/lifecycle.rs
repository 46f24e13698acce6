use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ViewerError;
use crate::image::{self, HeightField, RasterImage};
use crate::surface::{self, DepthParams, Surface, SurfaceSpec};

/// Observable disposal state of one surface generation. Handed out on every
/// rebuild; flips exactly once, when the surface stops being the active one.
#[derive(Clone, Debug)]
pub struct SurfaceHandle {
    generation: u64,
    disposed: Arc<AtomicBool>,
}

impl SurfaceHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// The image wrapped for sampling by the active surface's material. The GPU
/// texture it backs is created and destroyed alongside the surface's buffers.
pub struct TextureBinding {
    pub image: Arc<RasterImage>,
}

/// One fully built surface plus everything displacement needs to re-run.
pub struct ActiveSurface {
    pub surface: Surface,
    pub texture: TextureBinding,
    pub depth: DepthParams,
    height_field: Option<HeightField>,
    disposed: Arc<AtomicBool>,
}

/// Owns the single live surface. Rebuilds are atomic dispose-then-build: the
/// previous generation is retired before the new one becomes active, and a
/// failed build leaves the manager empty rather than half-attached.
pub struct MeshLifecycle {
    active: Option<ActiveSurface>,
    generation: u64,
    /// Set when a rebuild installed a new surface; the renderer must recreate
    /// its GPU mirror (buffers, texture, bind groups).
    rebuilt: bool,
    /// Set when displacement rewrote positions/normals in place; the renderer
    /// only needs to re-upload those two streams.
    geometry_dirty: bool,
}

impl MeshLifecycle {
    pub fn new() -> Self {
        Self {
            active: None,
            generation: 0,
            rebuilt: false,
            geometry_dirty: false,
        }
    }

    pub fn active(&self) -> Option<&ActiveSurface> {
        self.active.as_ref()
    }

    /// Disposes the current surface and builds a replacement from scratch.
    /// Fails with `NoImage` before touching the active surface, so a rejected
    /// call leaves the previous generation live.
    pub fn rebuild(
        &mut self,
        spec: SurfaceSpec,
        image: Option<&Arc<RasterImage>>,
        depth: DepthParams,
    ) -> Result<SurfaceHandle, ViewerError> {
        let image = image.ok_or(ViewerError::NoImage)?;

        self.dispose_active();

        let mut surface = surface::build(spec);
        let height_field = match surface.panel_grid {
            Some(grid) => {
                let field = image::extract(image, grid.cols, grid.rows);
                if let Err(err) = surface::apply(&mut surface, &field, depth.intensity) {
                    // The previous generation is already gone; leave the
                    // manager empty and let the renderer drop its mirror.
                    self.rebuilt = true;
                    return Err(err);
                }
                Some(field)
            }
            None => None,
        };

        self.generation += 1;
        let disposed = Arc::new(AtomicBool::new(false));
        log::info!(
            "surface generation {} built: {} ({} vertices, {} groups)",
            self.generation,
            spec.shape.label(),
            surface.mesh.vertex_count(),
            surface.face_groups.len()
        );

        self.active = Some(ActiveSurface {
            surface,
            texture: TextureBinding {
                image: Arc::clone(image),
            },
            depth,
            height_field,
            disposed: Arc::clone(&disposed),
        });
        self.rebuilt = true;
        self.geometry_dirty = false;

        Ok(SurfaceHandle {
            generation: self.generation,
            disposed,
        })
    }

    /// Detaches and disposes the active surface, returning to the empty state.
    pub fn clear(&mut self) {
        self.dispose_active();
        self.rebuilt = true;
        self.geometry_dirty = false;
    }

    /// Re-runs displacement at the new intensity on the live panel grid.
    /// A no-op for every other shape; returns whether geometry changed.
    pub fn set_depth_intensity(&mut self, intensity: f32) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.surface.spec.shape.is_panel() {
            return false;
        }
        let Some(field) = active.height_field.as_ref() else {
            return false;
        };

        active.depth.intensity = intensity;
        match surface::apply(&mut active.surface, field, intensity) {
            Ok(()) => {
                self.geometry_dirty = true;
                true
            }
            Err(err) => {
                // Cannot happen for a panel grid; keep the old geometry.
                log::warn!("in-place displacement skipped: {err}");
                false
            }
        }
    }

    /// True once per install; the caller uploads a fresh GPU mirror.
    pub fn take_rebuilt(&mut self) -> bool {
        std::mem::take(&mut self.rebuilt)
    }

    /// True once per in-place displacement; the caller re-uploads geometry.
    pub fn take_geometry_dirty(&mut self) -> bool {
        std::mem::take(&mut self.geometry_dirty)
    }

    fn dispose_active(&mut self) {
        if let Some(prev) = self.active.take() {
            prev.disposed.store(true, Ordering::Release);
            log::debug!("surface disposed ({})", prev.surface.spec.shape.label());
        }
    }
}

impl Default for MeshLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raster::solid_image;
    use crate::surface::Shape;

    fn white_image() -> Arc<RasterImage> {
        Arc::new(solid_image(100, 100, [255, 255, 255]))
    }

    fn spec(shape: Shape) -> SurfaceSpec {
        SurfaceSpec {
            shape,
            image_aspect: 1.0,
        }
    }

    #[test]
    fn rebuild_without_image_fails_and_keeps_prior_surface() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        let handle = lifecycle
            .rebuild(spec(Shape::Panel), Some(&image), DepthParams::default())
            .expect("first rebuild");

        let err = lifecycle
            .rebuild(spec(Shape::Cube), None, DepthParams::default())
            .unwrap_err();

        assert!(matches!(err, ViewerError::NoImage));
        assert!(!handle.is_disposed());
        assert!(lifecycle.active().is_some());
        assert_eq!(
            lifecycle.active().unwrap().surface.spec.shape,
            Shape::Panel
        );
    }

    #[test]
    fn sequential_rebuilds_keep_exactly_one_live_surface() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        let shapes = [
            Shape::Panel,
            Shape::Cube,
            Shape::Sphere,
            Shape::Torus,
            Shape::Curved { curve_factor: 0.5 },
        ];

        let handles: Vec<_> = shapes
            .iter()
            .map(|&shape| {
                lifecycle
                    .rebuild(spec(shape), Some(&image), DepthParams::default())
                    .expect("rebuild")
            })
            .collect();

        for prior in &handles[..handles.len() - 1] {
            assert!(prior.is_disposed());
        }
        let last = handles.last().unwrap();
        assert!(!last.is_disposed());
        assert_eq!(last.generation(), shapes.len() as u64);
        assert!(lifecycle.active().is_some());
    }

    #[test]
    fn identical_rebuilds_produce_identical_geometry() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        let depth = DepthParams { intensity: 0.8 };

        lifecycle
            .rebuild(spec(Shape::Panel), Some(&image), depth)
            .expect("first");
        let first_positions = lifecycle.active().unwrap().surface.mesh.positions.clone();
        let first_groups = lifecycle.active().unwrap().surface.face_groups.clone();

        lifecycle
            .rebuild(spec(Shape::Panel), Some(&image), depth)
            .expect("second");
        let second = lifecycle.active().unwrap();

        assert_eq!(second.surface.mesh.positions, first_positions);
        assert_eq!(second.surface.face_groups, first_groups);
    }

    #[test]
    fn clear_returns_to_empty_state() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        let handle = lifecycle
            .rebuild(spec(Shape::Torus), Some(&image), DepthParams::default())
            .expect("rebuild");

        lifecycle.clear();

        assert!(handle.is_disposed());
        assert!(lifecycle.active().is_none());
        assert!(lifecycle.take_rebuilt());
    }

    #[test]
    fn panel_rebuild_applies_displacement_immediately() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();

        lifecycle
            .rebuild(
                spec(Shape::Panel),
                Some(&image),
                DepthParams { intensity: 1.0 },
            )
            .expect("rebuild");

        let positions = &lifecycle.active().unwrap().surface.mesh.positions;
        let max_z = positions.chunks(3).fold(0.0f32, |m, p| m.max(p[2]));
        assert!((max_z - 0.7).abs() < 1e-3);
    }

    #[test]
    fn depth_intensity_updates_panel_in_place() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        lifecycle
            .rebuild(
                spec(Shape::Panel),
                Some(&image),
                DepthParams { intensity: 1.0 },
            )
            .expect("rebuild");
        assert!(lifecycle.take_rebuilt());

        let changed = lifecycle.set_depth_intensity(0.5);

        assert!(changed);
        assert!(lifecycle.take_geometry_dirty());
        assert!(!lifecycle.take_rebuilt());
        let positions = &lifecycle.active().unwrap().surface.mesh.positions;
        let max_z = positions.chunks(3).fold(0.0f32, |m, p| m.max(p[2]));
        assert!((max_z - 0.35).abs() < 1e-3);
    }

    #[test]
    fn depth_intensity_is_a_noop_for_non_panel_shapes() {
        let mut lifecycle = MeshLifecycle::new();
        let image = white_image();
        lifecycle
            .rebuild(spec(Shape::Sphere), Some(&image), DepthParams::default())
            .expect("rebuild");
        lifecycle.take_rebuilt();
        let before = lifecycle.active().unwrap().surface.mesh.positions.clone();

        let changed = lifecycle.set_depth_intensity(0.5);

        assert!(!changed);
        assert!(!lifecycle.take_geometry_dirty());
        assert_eq!(
            lifecycle.active().unwrap().surface.mesh.positions,
            before
        );
    }
}
