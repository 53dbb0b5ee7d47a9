//! Geometry fix-ups applied by the parsers before meshes reach the importer.

use cgmath::{InnerSpace, Vector2, Vector3, Vector4, Zero};

/// Smooth per-vertex normals from the faces touching each vertex.
///
/// Face normals are summed unnormalized, so larger faces weigh more. Vertices
/// not used by any face (or only by degenerate ones) get a zero normal.
pub fn smooth_normals(positions: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::zero(); positions.len()];
    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let p0: Vector3<f32> = positions[a].into();
        let p1: Vector3<f32> = positions[b].into();
        let p2: Vector3<f32> = positions[c].into();
        let face_normal = (p1 - p0).cross(p2 - p0);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0; 3]
            }
        })
        .collect()
}

/// Per-vertex tangents and bitangents from positions and texture coordinates.
///
/// Every triangle contributes one tangent/bitangent pair to its three
/// vertices; the pairs are averaged afterwards. Triangles with a degenerate
/// UV mapping contribute nothing.
pub fn tangent_space(
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    faces: &[[u32; 3]],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let mut tangents = vec![Vector3::zero(); positions.len()];
    let mut bitangents = vec![Vector3::zero(); positions.len()];
    let mut triangles_included = vec![0u32; positions.len()];
    let in_range = |i: usize| i < positions.len() && i < tex_coords.len();

    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        if !(in_range(a) && in_range(b) && in_range(c)) {
            continue;
        }
        let pos0: Vector3<f32> = positions[a].into();
        let pos1: Vector3<f32> = positions[b].into();
        let pos2: Vector3<f32> = positions[c].into();

        let uv0: Vector2<f32> = tex_coords[a].into();
        let uv1: Vector2<f32> = tex_coords[b].into();
        let uv2: Vector2<f32> = tex_coords[c].into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped for right-handed normal maps with wgpu texture coordinates
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            triangles_included[i] += 1;
        }
    }

    let average = |sum: Vector3<f32>, n: u32| -> [f32; 3] {
        if n == 0 { [0.0; 3] } else { (sum / n as f32).into() }
    };
    let tangents = tangents
        .into_iter()
        .zip(&triangles_included)
        .map(|(t, &n)| average(t, n))
        .collect();
    let bitangents = bitangents
        .into_iter()
        .zip(&triangles_included)
        .map(|(b, &n)| average(b, n))
        .collect();
    (tangents, bitangents)
}

/// Split glTF tangents (xyz plus handedness in w) into tangent and bitangent.
pub fn split_tangents(normals: &[[f32; 3]], tangents: &[[f32; 4]]) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    tangents
        .iter()
        .enumerate()
        .map(|(i, &tangent)| -> ([f32; 3], [f32; 3]) {
            let tangent: Vector4<f32> = tangent.into();
            let normal: Vector3<f32> = normals.get(i).copied().unwrap_or([0.0; 3]).into();
            let bitangent = normal.cross(tangent.truncate()) * tangent.w;
            (tangent.truncate().into(), bitangent.into())
        })
        .unzip()
}
