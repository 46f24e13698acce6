use std::f32::consts::PI;

use crate::surface::spec::{
    CUBE_SIDE_TINT, CURVED_RADIAL_SEGMENTS, MAX_PANEL_SEGMENTS, PANEL_HEIGHT, SEGMENTS_PER_UNIT,
    SPHERE_RADIUS_FACTOR, SPHERE_SEGMENTS, Shape, SurfaceSpec, TORUS_RADIUS_FACTOR, TORUS_SEGMENTS,
    TORUS_TUBE_RADIUS,
};

/// Flat vertex streams, ready for GPU upload as separate buffers.
pub struct SurfaceMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices * 3),
            normals: Vec::with_capacity(vertices * 3),
            uvs: Vec::with_capacity(vertices * 2),
            indices: Vec::with_capacity(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// One draw range with its own material tint. The cube has six of these,
/// everything else has one covering the whole index buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceGroup {
    pub index_start: u32,
    pub index_count: u32,
    pub tint: [f32; 3],
}

/// Vertex grid dimensions of the panel, row-major with row 0 at the top.
/// Displacement needs these to address vertices by (x, y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelGrid {
    pub cols: usize,
    pub rows: usize,
}

pub struct Surface {
    pub mesh: SurfaceMesh,
    pub spec: SurfaceSpec,
    pub face_groups: Vec<FaceGroup>,
    pub panel_grid: Option<PanelGrid>,
    /// World (width, height) footprint, used for logging and camera fit.
    pub size: (f32, f32),
}

/// Builds the tessellated surface for `spec`. Always a fresh allocation; a
/// surface's topology is never mutated after construction (displacement only
/// rewrites positions and normals of the panel grid).
pub fn build(spec: SurfaceSpec) -> Surface {
    match spec.shape {
        Shape::Panel => build_panel(spec),
        Shape::Curved { curve_factor } => build_curved(spec, curve_factor),
        Shape::Cube => build_cube(spec),
        Shape::Sphere => build_sphere(spec),
        Shape::Torus => build_torus(spec),
    }
}

fn single_group(mesh: &SurfaceMesh) -> Vec<FaceGroup> {
    vec![FaceGroup {
        index_start: 0,
        index_count: mesh.indices.len() as u32,
        tint: [1.0, 1.0, 1.0],
    }]
}

fn build_panel(spec: SurfaceSpec) -> Surface {
    let (w, h) = spec.panel_size();
    let seg_w = ((w * SEGMENTS_PER_UNIT).ceil() as u32).clamp(1, MAX_PANEL_SEGMENTS);
    let seg_h = ((h * SEGMENTS_PER_UNIT).ceil() as u32).clamp(1, MAX_PANEL_SEGMENTS);
    let cols = (seg_w + 1) as usize;
    let rows = (seg_h + 1) as usize;

    let mut mesh = SurfaceMesh::with_capacity(cols * rows, seg_w as usize * seg_h as usize * 6);

    for iy in 0..rows {
        let ty = if rows > 1 {
            iy as f32 / (rows - 1) as f32
        } else {
            0.5
        };
        let y = h / 2.0 - ty * h;
        for ix in 0..cols {
            let tx = if cols > 1 {
                ix as f32 / (cols - 1) as f32
            } else {
                0.5
            };
            let x = -w / 2.0 + tx * w;
            mesh.positions.extend_from_slice(&[x, y, 0.0]);
            mesh.normals.extend_from_slice(&[0.0, 0.0, 1.0]);
            mesh.uvs.extend_from_slice(&[tx, ty]);
        }
    }
    push_grid_indices(&mut mesh.indices, cols, rows, 0);

    let face_groups = single_group(&mesh);
    Surface {
        mesh,
        spec,
        face_groups,
        panel_grid: Some(PanelGrid { cols, rows }),
        size: (w, h),
    }
}

fn build_curved(spec: SurfaceSpec, curve_factor: f32) -> Surface {
    let (w, h) = spec.panel_size();
    // Arc length at the wall's width equals w; tiny curve factors would blow
    // the radius up, so the angle is floored instead of the radius.
    let theta = (PI * curve_factor.clamp(0.0, 1.0)).max(1e-4);
    let radius = w / theta;

    let segs = CURVED_RADIAL_SEGMENTS as usize;
    let cols = segs + 1;
    let mut mesh = SurfaceMesh::with_capacity(cols * 2, segs * 6);

    for iy in 0..2 {
        let y = h / 2.0 - iy as f32 * h;
        for ix in 0..cols {
            let t = ix as f32 / segs as f32;
            let a = -theta / 2.0 + t * theta;
            mesh.positions
                .extend_from_slice(&[radius * a.sin(), y, radius * a.cos()]);
            mesh.normals.extend_from_slice(&[a.sin(), 0.0, a.cos()]);
            mesh.uvs.extend_from_slice(&[t, iy as f32]);
        }
    }
    push_grid_indices(&mut mesh.indices, cols, 2, 0);

    let face_groups = single_group(&mesh);
    Surface {
        mesh,
        spec,
        face_groups,
        panel_grid: None,
        size: (w, h),
    }
}

fn build_cube(spec: SurfaceSpec) -> Surface {
    let h = PANEL_HEIGHT;
    let half = h / 2.0;

    // Face order matches the conventional box layout (+x, -x, +y, -y, +z, -z);
    // the camera-facing +z face keeps the unmodified material.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ];

    let mut mesh = SurfaceMesh::with_capacity(24, 36);
    let mut face_groups = Vec::with_capacity(6);

    for (face_idx, (normal, u_dir, v_dir)) in faces.iter().enumerate() {
        let base = mesh.vertex_count() as u32;
        let index_start = mesh.indices.len() as u32;

        for sv in 0..2 {
            for su in 0..2 {
                let fu = su as f32 - 0.5;
                let fv = sv as f32 - 0.5;
                let pos = [
                    normal[0] * half + u_dir[0] * h * fu + v_dir[0] * h * fv,
                    normal[1] * half + u_dir[1] * h * fu + v_dir[1] * h * fv,
                    normal[2] * half + u_dir[2] * h * fu + v_dir[2] * h * fv,
                ];
                mesh.positions.extend_from_slice(&pos);
                mesh.normals.extend_from_slice(normal);
                mesh.uvs.extend_from_slice(&[su as f32, sv as f32]);
            }
        }
        mesh.indices
            .extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);

        let tint = if face_idx == 4 {
            [1.0, 1.0, 1.0]
        } else {
            [CUBE_SIDE_TINT; 3]
        };
        face_groups.push(FaceGroup {
            index_start,
            index_count: 6,
            tint,
        });
    }

    Surface {
        mesh,
        spec,
        face_groups,
        panel_grid: None,
        size: (h, h),
    }
}

fn build_sphere(spec: SurfaceSpec) -> Surface {
    let radius = PANEL_HEIGHT * SPHERE_RADIUS_FACTOR;
    let (w_segs, h_segs) = SPHERE_SEGMENTS;
    let cols = (w_segs + 1) as usize;
    let rows = (h_segs + 1) as usize;

    let mut mesh =
        SurfaceMesh::with_capacity(cols * rows, w_segs as usize * h_segs as usize * 6);

    for iy in 0..rows {
        let v = iy as f32 / h_segs as f32;
        let phi = v * PI;
        for ix in 0..cols {
            let u = ix as f32 / w_segs as f32;
            let th = u * 2.0 * PI;
            let nx = -phi.sin() * th.cos();
            let ny = phi.cos();
            let nz = phi.sin() * th.sin();
            mesh.positions
                .extend_from_slice(&[radius * nx, radius * ny, radius * nz]);
            mesh.normals.extend_from_slice(&[nx, ny, nz]);
            mesh.uvs.extend_from_slice(&[u, v]);
        }
    }
    push_grid_indices(&mut mesh.indices, cols, rows, 0);

    let face_groups = single_group(&mesh);
    Surface {
        mesh,
        spec,
        face_groups,
        panel_grid: None,
        size: (radius * 2.0, radius * 2.0),
    }
}

fn build_torus(spec: SurfaceSpec) -> Surface {
    let ring_radius = PANEL_HEIGHT * TORUS_RADIUS_FACTOR;
    let tube_radius = TORUS_TUBE_RADIUS;
    let (radial_segs, tube_segs) = TORUS_SEGMENTS;
    let rows = (radial_segs + 1) as usize;
    let cols = (tube_segs + 1) as usize;

    let mut mesh =
        SurfaceMesh::with_capacity(cols * rows, radial_segs as usize * tube_segs as usize * 6);

    for iy in 0..rows {
        let v = iy as f32 / radial_segs as f32;
        // Angle around the tube cross-section.
        let cross = v * 2.0 * PI;
        for ix in 0..cols {
            let u = ix as f32 / tube_segs as f32;
            // Angle around the main ring.
            let around = u * 2.0 * PI;

            let cx = ring_radius * around.cos();
            let cy = ring_radius * around.sin();
            let x = (ring_radius + tube_radius * cross.cos()) * around.cos();
            let y = (ring_radius + tube_radius * cross.cos()) * around.sin();
            let z = tube_radius * cross.sin();

            let len = ((x - cx).powi(2) + (y - cy).powi(2) + z * z).sqrt().max(1e-6);
            mesh.positions.extend_from_slice(&[x, y, z]);
            mesh.normals
                .extend_from_slice(&[(x - cx) / len, (y - cy) / len, z / len]);
            mesh.uvs.extend_from_slice(&[u, v]);
        }
    }
    push_grid_indices(&mut mesh.indices, cols, rows, 0);

    let face_groups = single_group(&mesh);
    Surface {
        mesh,
        spec,
        face_groups,
        panel_grid: None,
        size: (
            (ring_radius + tube_radius) * 2.0,
            (ring_radius + tube_radius) * 2.0,
        ),
    }
}

fn push_grid_indices(indices: &mut Vec<u32>, cols: usize, rows: usize, base: u32) {
    for iy in 0..rows - 1 {
        for ix in 0..cols - 1 {
            let tl = base + (iy * cols + ix) as u32;
            let tr = tl + 1;
            let bl = base + ((iy + 1) * cols + ix) as u32;
            let br = bl + 1;

            indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::spec::{PANEL_MAX_WIDTH, PANEL_MIN_WIDTH};

    fn spec(shape: Shape, aspect: f32) -> SurfaceSpec {
        SurfaceSpec {
            shape,
            image_aspect: aspect,
        }
    }

    #[test]
    fn panel_width_tracks_aspect_within_limits() {
        let square = build(spec(Shape::Panel, 1.0));
        assert!((square.size.0 - PANEL_HEIGHT).abs() < 1e-5);

        let ultrawide = build(spec(Shape::Panel, 10.0));
        assert_eq!(ultrawide.size.0, PANEL_MAX_WIDTH);

        let sliver = build(spec(Shape::Panel, 0.1));
        assert_eq!(sliver.size.0, PANEL_MIN_WIDTH);
    }

    #[test]
    fn panel_grid_matches_vertex_streams() {
        let surface = build(spec(Shape::Panel, 1.5));
        let grid = surface.panel_grid.expect("panel has a grid");

        assert_eq!(surface.mesh.vertex_count(), grid.cols * grid.rows);
        assert_eq!(surface.mesh.uvs.len(), grid.cols * grid.rows * 2);
        assert_eq!(
            surface.mesh.indices.len(),
            (grid.cols - 1) * (grid.rows - 1) * 6
        );
        // Denser grid for the wider panel.
        let narrow = build(spec(Shape::Panel, 0.5));
        assert!(grid.cols > narrow.panel_grid.unwrap().cols);
    }

    #[test]
    fn build_is_deterministic_for_identical_specs() {
        let a = build(spec(Shape::Panel, 1.3));
        let b = build(spec(Shape::Panel, 1.3));

        assert_eq!(a.mesh.positions, b.mesh.positions);
        assert_eq!(a.mesh.indices, b.mesh.indices);
        assert_eq!(a.face_groups, b.face_groups);
    }

    #[test]
    fn curved_zero_factor_has_finite_radius() {
        let surface = build(spec(Shape::Curved { curve_factor: 0.0 }, 1.0));

        assert!(surface.mesh.positions.iter().all(|p| p.is_finite()));
        // The angle floor bounds the radius; vertices stay within it.
        let max_coord = surface
            .mesh
            .positions
            .iter()
            .fold(0.0f32, |m, &p| m.max(p.abs()));
        assert!(max_coord.is_finite());
        assert!(max_coord <= PANEL_HEIGHT / 1e-4 + 1.0);
    }

    #[test]
    fn curved_arc_length_matches_panel_width() {
        let surface = build(spec(Shape::Curved { curve_factor: 0.5 }, 1.0));
        let (w, _) = surface.spec.panel_size();

        // First and last columns of the top row sit at the arc ends.
        let cols = CURVED_RADIAL_SEGMENTS as usize + 1;
        let first = &surface.mesh.positions[0..3];
        let last = &surface.mesh.positions[(cols - 1) * 3..cols * 3];
        let theta = PI * 0.5;
        let radius = w / theta;
        let chord =
            ((first[0] - last[0]).powi(2) + (first[2] - last[2]).powi(2)).sqrt();
        let expected_chord = 2.0 * radius * (theta / 2.0).sin();
        assert!((chord - expected_chord).abs() < 1e-3);
    }

    #[test]
    fn cube_has_six_groups_front_untinted() {
        let surface = build(spec(Shape::Cube, 1.0));

        assert_eq!(surface.face_groups.len(), 6);
        assert_eq!(surface.mesh.vertex_count(), 24);
        assert_eq!(surface.mesh.indices.len(), 36);
        for (idx, group) in surface.face_groups.iter().enumerate() {
            assert_eq!(group.index_count, 6);
            if idx == 4 {
                assert_eq!(group.tint, [1.0, 1.0, 1.0]);
            } else {
                assert_eq!(group.tint, [CUBE_SIDE_TINT; 3]);
            }
        }
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let surface = build(spec(Shape::Sphere, 1.0));
        let radius = PANEL_HEIGHT * SPHERE_RADIUS_FACTOR;

        for chunk in surface.mesh.positions.chunks(3) {
            let len = (chunk[0] * chunk[0] + chunk[1] * chunk[1] + chunk[2] * chunk[2]).sqrt();
            assert!((len - radius).abs() < 1e-4);
        }
    }

    #[test]
    fn torus_vertices_stay_within_the_tube() {
        let surface = build(spec(Shape::Torus, 1.0));
        let ring = PANEL_HEIGHT * TORUS_RADIUS_FACTOR;

        for chunk in surface.mesh.positions.chunks(3) {
            let planar = (chunk[0] * chunk[0] + chunk[1] * chunk[1]).sqrt();
            let dist = ((planar - ring).powi(2) + chunk[2] * chunk[2]).sqrt();
            assert!((dist - TORUS_TUBE_RADIUS).abs() < 1e-4);
        }
    }

    #[test]
    fn non_panel_shapes_have_no_displacement_grid() {
        for shape in [
            Shape::Curved { curve_factor: 0.5 },
            Shape::Cube,
            Shape::Sphere,
            Shape::Torus,
        ] {
            assert!(build(spec(shape, 1.0)).panel_grid.is_none());
        }
    }
}
