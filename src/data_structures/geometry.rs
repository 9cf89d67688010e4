//! The static cube: positions, quad faces and texture coordinates.

/// Corners of a unit cube centred at the origin.
pub const CUBE_VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
];

/// Quads wound counter-clockwise when seen from outside the cube.
pub const CUBE_FACES: [[u16; 4]; 6] = [
    // +z
    [0, 1, 2, 3],
    // +x
    [1, 5, 6, 2],
    // -z
    [5, 4, 7, 6],
    // -x
    [4, 0, 3, 7],
    // +y
    [3, 2, 6, 7],
    // -y
    [4, 5, 1, 0],
];

pub const CUBE_TEX_COORDS: [[f32; 2]; 8] = [
    [0.0, 0.0],
    [1.0, 0.0],
    [1.0, 1.0],
    [0.0, 1.0],
    [0.0, 0.0],
    [1.0, 0.0],
    [1.0, 1.0],
    [0.0, 1.0],
];

pub const CUBE_INDEX_COUNT: usize = CUBE_FACES.len() * 6;

/// Fan-triangulates quad `[a, b, c, d]` into `(a, b, c)` and `(a, c, d)`.
pub const fn triangulate_quad(face: [u16; 4]) -> [u16; 6] {
    let [a, b, c, d] = face;
    [a, b, c, a, c, d]
}

pub fn triangulate(faces: &[[u16; 4]]) -> Vec<u16> {
    faces.iter().flat_map(|face| triangulate_quad(*face)).collect()
}

pub fn cube_indices() -> [u16; CUBE_INDEX_COUNT] {
    let mut indices = [0; CUBE_INDEX_COUNT];
    for (triangles, face) in indices.chunks_exact_mut(6).zip(CUBE_FACES) {
        triangles.copy_from_slice(&triangulate_quad(face));
    }
    indices
}

/// Per-axis minimum and maximum of `positions`.
///
/// Returns zeroed bounds for an empty slice.
pub fn position_bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let Some(first) = positions.first() else {
        return ([0.0; 3], [0.0; 3]);
    };
    positions
        .iter()
        .fold((*first, *first), |(mut min, mut max), position| {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
            (min, max)
        })
}

/// Vertex data of the exported cube, ready to be packed into accessors.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeGeometry {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u16>,
    pub tex_coords: Vec<[f32; 2]>,
}

impl CubeGeometry {
    pub fn new() -> Self {
        Self {
            positions: CUBE_VERTICES.to_vec(),
            indices: cube_indices().to_vec(),
            tex_coords: CUBE_TEX_COORDS.to_vec(),
        }
    }
}

impl Default for CubeGeometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    #[test]
    fn should_emit_36_indices_within_vertex_range() {
        let indices = cube_indices();
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < CUBE_VERTICES.len()));
    }

    #[test]
    fn should_use_every_vertex() {
        let indices = cube_indices();
        for vertex in 0..CUBE_VERTICES.len() as u16 {
            assert!(indices.contains(&vertex), "vertex {vertex} is never referenced");
        }
    }

    #[test]
    fn should_split_each_quad_into_abc_and_acd() {
        let indices = cube_indices();
        for (face, triangles) in CUBE_FACES.iter().zip(indices.chunks_exact(6)) {
            let [a, b, c, d] = *face;
            assert_eq!(&triangles[..3], &[a, b, c]);
            assert_eq!(&triangles[3..], &[a, c, d]);
        }
        assert_eq!(triangulate(&CUBE_FACES), indices.to_vec());
    }

    #[test]
    fn should_wind_every_triangle_outwards() {
        let indices = cube_indices();
        for triangle in indices.chunks_exact(3) {
            let [p0, p1, p2] = [0, 1, 2].map(|i| Vector3::from(CUBE_VERTICES[triangle[i] as usize]));
            let normal = (p1 - p0).cross(p2 - p0);
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(
                normal.dot(centroid) > 0.0,
                "triangle {:?} faces inwards",
                triangle
            );
            assert!(normal.magnitude() > 0.0);
        }
    }

    #[test]
    fn should_map_uvs_into_unit_square_corners() {
        assert_eq!(CUBE_TEX_COORDS.len(), CUBE_VERTICES.len());
        for uv in CUBE_TEX_COORDS.iter().flatten() {
            assert!(*uv == 0.0 || *uv == 1.0);
        }
    }

    #[test]
    fn should_bound_the_unit_cube() {
        let (min, max) = position_bounds(&CUBE_VERTICES);
        assert_eq!(min, [-0.5; 3]);
        assert_eq!(max, [0.5; 3]);
        assert_eq!(position_bounds(&[]), ([0.0; 3], [0.0; 3]));
    }
}
