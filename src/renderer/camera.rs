use glam::{Mat4, Vec3};

pub const MIN_ZOOM: f32 = 2.0;
pub const MAX_ZOOM: f32 = 18.0;
pub const DEFAULT_ZOOM: f32 = 6.0;

/// Fixed-target camera on the +Z axis. The surface rotates; the camera only
/// dollies in and out.
pub struct Camera {
    pub zoom: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub zoom_speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            fov: 62.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 120.0,
            zoom_speed: 0.6,
        }
    }
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.zoom)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn process_scroll(&mut self, delta: f32) {
        self.zoom = (self.zoom - delta * self.zoom_speed).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn reset(&mut self) {
        self.zoom = DEFAULT_ZOOM;
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width / height.max(1.0);
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position().to_array(),
            _padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn from_matrix(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_zoom_stays_within_limits() {
        let mut camera = Camera::default();

        for _ in 0..100 {
            camera.process_scroll(1.0);
        }
        assert_eq!(camera.zoom, MIN_ZOOM);

        for _ in 0..100 {
            camera.process_scroll(-1.0);
        }
        assert_eq!(camera.zoom, MAX_ZOOM);
    }

    #[test]
    fn reset_restores_default_distance() {
        let mut camera = Camera::default();
        camera.process_scroll(-5.0);
        assert_ne!(camera.zoom, DEFAULT_ZOOM);

        camera.reset();
        assert_eq!(camera.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn camera_looks_down_positive_z() {
        let camera = Camera::default();
        let view = camera.view_matrix();
        let origin = view.transform_point3(Vec3::ZERO);

        // Target sits straight ahead at zoom distance.
        assert!((origin.z + camera.zoom).abs() < 1e-5);
        assert!(origin.x.abs() < 1e-5);
        assert!(origin.y.abs() < 1e-5);
    }
}
