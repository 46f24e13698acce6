use crate::error::ViewerError;
use crate::image::HeightField;
use crate::surface::builder::Surface;
use crate::surface::spec::DEPTH_GAIN;

/// Pushes the panel's vertices along its local depth axis by the height field.
///
/// Each vertex at normalized grid coordinate (nx, ny) in [-1, 1]^2 gets
/// `z = (luminance - 0.5) * intensity * DEPTH_GAIN * mask`, where the radial
/// vignette `mask = 1 - min(1, nx^2 + ny^2)` pins the border flat. Re-runnable
/// whenever intensity changes; only positions and normals are rewritten, the
/// topology is untouched.
pub fn apply(
    surface: &mut Surface,
    field: &HeightField,
    intensity: f32,
) -> Result<(), ViewerError> {
    let Some(grid) = surface.panel_grid else {
        return Err(ViewerError::UnsupportedShape(surface.spec.shape));
    };

    debug_assert_eq!(field.width(), grid.cols);
    debug_assert_eq!(field.height(), grid.rows);

    let positions = &mut surface.mesh.positions;
    for iy in 0..grid.rows {
        let ny = if grid.rows > 1 {
            iy as f32 / (grid.rows - 1) as f32 * 2.0 - 1.0
        } else {
            0.0
        };
        for ix in 0..grid.cols {
            let nx = if grid.cols > 1 {
                ix as f32 / (grid.cols - 1) as f32 * 2.0 - 1.0
            } else {
                0.0
            };
            let mask = 1.0 - (nx * nx + ny * ny).min(1.0);
            let lum = field.sample(ix, iy);
            let z = (lum - 0.5) * intensity * DEPTH_GAIN * mask;
            positions[(iy * grid.cols + ix) * 3 + 2] = z;
        }
    }

    surface.mesh.normals = compute_smooth_normals(positions, &surface.mesh.indices);
    Ok(())
}

/// Area-weighted smooth normals: accumulate each triangle's cross product at
/// its corners, then normalize.
pub fn compute_smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for tri in indices.chunks(3) {
        let [a, b, c] = [tri[0] as usize * 3, tri[1] as usize * 3, tri[2] as usize * 3];
        let ab = [
            positions[b] - positions[a],
            positions[b + 1] - positions[a + 1],
            positions[b + 2] - positions[a + 2],
        ];
        let ac = [
            positions[c] - positions[a],
            positions[c + 1] - positions[a + 1],
            positions[c + 2] - positions[a + 2],
        ];
        let face = [
            ab[1] * ac[2] - ab[2] * ac[1],
            ab[2] * ac[0] - ab[0] * ac[2],
            ab[0] * ac[1] - ab[1] * ac[0],
        ];
        for &corner in &[a, b, c] {
            normals[corner] += face[0];
            normals[corner + 1] += face[1];
            normals[corner + 2] += face[2];
        }
    }

    for n in normals.chunks_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 1e-8 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        } else {
            n[2] = 1.0;
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{self, raster::solid_image};
    use crate::surface::spec::{Shape, SurfaceSpec};
    use crate::surface::{build, builder::PanelGrid};

    fn panel_with_field(rgb: [u8; 3]) -> (Surface, HeightField) {
        let spec = SurfaceSpec {
            shape: Shape::Panel,
            image_aspect: 1.0,
        };
        let surface = build(spec);
        let grid = surface.panel_grid.unwrap();
        let field = image::extract(&solid_image(100, 100, rgb), grid.cols, grid.rows);
        (surface, field)
    }

    fn depth_at(surface: &Surface, grid: PanelGrid, ix: usize, iy: usize) -> f32 {
        surface.mesh.positions[(iy * grid.cols + ix) * 3 + 2]
    }

    #[test]
    fn white_image_peaks_at_center() {
        let (mut surface, field) = panel_with_field([255, 255, 255]);
        let grid = surface.panel_grid.unwrap();

        apply(&mut surface, &field, 1.0).expect("panel displacement");

        // Use an odd-position probe: the exact center vertex exists because
        // the grid has an even segment count, giving an odd vertex count.
        let cx = (grid.cols - 1) / 2;
        let cy = (grid.rows - 1) / 2;
        let center = depth_at(&surface, grid, cx, cy);
        assert!((center - 0.5 * DEPTH_GAIN).abs() < 1e-3);
        assert!(surface
            .mesh
            .positions
            .chunks(3)
            .all(|p| p[2] >= 0.0 && p[2] <= 0.5 * DEPTH_GAIN + 1e-6));
    }

    #[test]
    fn black_image_pulls_depth_negative() {
        let (mut surface, field) = panel_with_field([0, 0, 0]);
        let grid = surface.panel_grid.unwrap();

        apply(&mut surface, &field, 1.0).expect("panel displacement");

        let cx = (grid.cols - 1) / 2;
        let cy = (grid.rows - 1) / 2;
        let center = depth_at(&surface, grid, cx, cy);
        assert!((center + 0.5 * DEPTH_GAIN).abs() < 1e-3);
        assert!(surface.mesh.positions.chunks(3).all(|p| p[2] <= 0.0));
    }

    #[test]
    fn vignette_zeroes_depth_on_and_beyond_the_unit_circle() {
        let (mut surface, field) = panel_with_field([255, 255, 255]);
        let grid = surface.panel_grid.unwrap();

        apply(&mut surface, &field, 1.0).expect("panel displacement");

        for iy in 0..grid.rows {
            let ny = iy as f32 / (grid.rows - 1) as f32 * 2.0 - 1.0;
            for ix in 0..grid.cols {
                let nx = ix as f32 / (grid.cols - 1) as f32 * 2.0 - 1.0;
                if nx * nx + ny * ny >= 1.0 {
                    assert_eq!(depth_at(&surface, grid, ix, iy), 0.0);
                }
            }
        }
    }

    #[test]
    fn reapplying_with_new_intensity_scales_in_place() {
        let (mut surface, field) = panel_with_field([255, 255, 255]);
        let grid = surface.panel_grid.unwrap();
        let cx = (grid.cols - 1) / 2;
        let cy = (grid.rows - 1) / 2;

        apply(&mut surface, &field, 1.0).expect("first pass");
        let full = depth_at(&surface, grid, cx, cy);

        apply(&mut surface, &field, 0.25).expect("second pass");
        let quarter = depth_at(&surface, grid, cx, cy);

        assert!((quarter - full * 0.25).abs() < 1e-5);
        assert_eq!(surface.mesh.vertex_count(), grid.cols * grid.rows);
    }

    #[test]
    fn non_panel_surface_is_rejected() {
        let spec = SurfaceSpec {
            shape: Shape::Sphere,
            image_aspect: 1.0,
        };
        let mut surface = build(spec);
        let field = image::extract(&solid_image(10, 10, [128, 128, 128]), 4, 4);

        let err = apply(&mut surface, &field, 1.0).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::UnsupportedShape(Shape::Sphere)
        ));
    }

    #[test]
    fn flat_grid_normals_point_forward() {
        let positions = vec![
            -1.0, 1.0, 0.0, 1.0, 1.0, 0.0, //
            -1.0, -1.0, 0.0, 1.0, -1.0, 0.0,
        ];
        let indices = vec![0, 2, 1, 1, 2, 3];

        let normals = compute_smooth_normals(&positions, &indices);

        for n in normals.chunks(3) {
            assert!((n[0], n[1]) == (0.0, 0.0));
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }
}
