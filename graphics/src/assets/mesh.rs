use std::io::Cursor;

use crate::error::GraphicsError;
use crate::geometry::{GeometryData, Vertex};

/// Decode Wavefront OBJ text into one triangulated, single-indexed mesh.
///
/// All objects in the file are merged. Materials are ignored.
pub fn decode_obj(name: &str, bytes: &[u8]) -> Result<GeometryData, GraphicsError> {
    let decode_error = |message: String| GraphicsError::AssetDecodeFailed {
        name: name.to_string(),
        message,
    };

    let (models, _materials) = tobj::load_obj_buf(
        &mut Cursor::new(bytes),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| decode_error(e.to_string()))?;

    if models.is_empty() {
        return Err(decode_error("no objects in file".to_string()));
    }

    let mut data = GeometryData::default();
    for model in &models {
        let mesh = &model.mesh;
        let base = data.vertices.len() as u32;
        let vertex_count = mesh.positions.len() / 3;

        for i in 0..vertex_count {
            let normal = if mesh.normals.len() >= (i + 1) * 3 {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0, 0.0, 0.0]
            };
            let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            data.vertices.push(Vertex {
                position: [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ],
                normal,
                uv,
            });
        }
        data.indices.extend(mesh.indices.iter().map(|index| base + index));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_triangulated() {
        let data = decode_obj("quad.obj", QUAD.as_bytes()).unwrap();
        assert_eq!(data.vertices.len(), 4);
        assert_eq!(data.indices.len(), 6);
        assert!(data.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_objects_are_merged() {
        let two = format!("{QUAD}o second\nv 0 0 5\nv 1 0 5\nv 0 1 5\nf 5 6 7\n");
        let data = decode_obj("two.obj", two.as_bytes()).unwrap();
        assert_eq!(data.indices.len(), 9);
        let last = *data.indices.last().unwrap() as usize;
        assert_eq!(data.vertices[last].position[2], 5.0);
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            decode_obj("empty.obj", b""),
            Err(GraphicsError::AssetDecodeFailed { .. })
        ));
    }
}
