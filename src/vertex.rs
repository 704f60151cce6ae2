// Vertex records and the packed buffer handed to the graphics pipeline
//
// Each vertex is six signed 16-bit integers:
//   posX, posY, posZ(=1), texU·K, texV·K, texW·K
// Triangles are fully expanded (three vertices each, no index buffer), so the
// buffer can be uploaded as-is and drawn as a triangle list.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Component types a vertex attribute can be stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Int16,
    Uint16,
    Float32,
}

impl AttributeType {
    /// GL enum name for `vertexAttribPointer`
    pub fn gl_name(&self) -> &'static str {
        match self {
            AttributeType::Int16 => "SHORT",
            AttributeType::Uint16 => "UNSIGNED_SHORT",
            AttributeType::Float32 => "FLOAT",
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            AttributeType::Int16 | AttributeType::Uint16 => 2,
            AttributeType::Float32 => 4,
        }
    }
}

/// One attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub components: usize,
    pub kind: AttributeType,
    /// Byte offset from the start of the vertex
    pub offset: usize,
}

/// Interleaved layout of the buffer produced by [`VertexBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeLayout {
    pub attributes: [VertexAttribute; 2],
    /// Bytes per vertex
    pub stride: usize,
}

impl AttributeLayout {
    pub const DEFAULT: AttributeLayout = AttributeLayout {
        attributes: [
            VertexAttribute {
                name: "a_pos",
                components: 3,
                kind: AttributeType::Int16,
                offset: 0,
            },
            VertexAttribute {
                name: "a_texture_pos",
                components: 3,
                kind: AttributeType::Int16,
                offset: 6,
            },
        ],
        stride: 12,
    };

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Round to the nearest integer and saturate into `i16`.
/// Non-finite input maps to 0.
#[inline]
pub fn quantize(value: f64) -> i16 {
    if !value.is_finite() {
        return 0;
    }
    let rounded = value.round();
    if rounded > i16::MAX as f64 || rounded < i16::MIN as f64 {
        debug!("Vertex component {} saturated to i16 range", value);
    }
    // `as` saturates float-to-int casts
    rounded as i16
}

/// A single warped vertex with its homogeneous texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub pos: [i16; 3],
    pub tex: [i16; 3],
}

impl VertexRecord {
    /// Quantize a warped position and a `[u, v, w]` texcoord already scaled to
    /// the texture extent
    pub fn new(x: f64, y: f64, tex: [f64; 3]) -> Self {
        Self {
            pos: [quantize(x), quantize(y), 1],
            tex: tex.map(quantize),
        }
    }

    pub fn components(&self) -> [i16; 6] {
        [
            self.pos[0],
            self.pos[1],
            self.pos[2],
            self.tex[0],
            self.tex[1],
            self.tex[2],
        ]
    }
}

/// Flat, non-indexed triangle list ready for upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexBuffer {
    records: Vec<VertexRecord>,
}

impl VertexBuffer {
    pub const COMPONENTS_PER_VERTEX: usize = 6;
    pub const VERTICES_PER_TRIANGLE: usize = 3;

    pub fn from_records(records: Vec<VertexRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VertexRecord] {
        &self.records
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.records.len() / Self::VERTICES_PER_TRIANGLE
    }

    /// Records grouped per triangle
    pub fn triangles(&self) -> impl Iterator<Item = &[VertexRecord]> {
        self.records.chunks_exact(Self::VERTICES_PER_TRIANGLE)
    }

    /// All components, six per vertex
    pub fn to_i16_vec(&self) -> Vec<i16> {
        self.records.iter().flat_map(|r| r.components()).collect()
    }

    /// Little-endian bytes laid out per [`AttributeLayout::DEFAULT`]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.records.len() * AttributeLayout::DEFAULT.stride);
        for v in self.to_i16_vec() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(12.4), 12);
        assert_eq!(quantize(12.5), 13);
        assert_eq!(quantize(-3.6), -4);
        assert_eq!(quantize(1e9), i16::MAX);
        assert_eq!(quantize(-1e9), i16::MIN);
        assert_eq!(quantize(f64::NAN), 0);
        assert_eq!(quantize(f64::INFINITY), 0);
    }

    #[test]
    fn test_record_padding() {
        let r = VertexRecord::new(9570.2, 3642.8, [8192.0, 0.0, 8192.0]);
        assert_eq!(r.components(), [9570, 3643, 1, 8192, 0, 8192]);
    }

    #[test]
    fn test_layout_matches_record_size() {
        let layout = AttributeLayout::DEFAULT;
        let bytes_per_vertex = VertexBuffer::COMPONENTS_PER_VERTEX * AttributeType::Int16.size_bytes();
        assert_eq!(layout.stride, bytes_per_vertex);

        let tex = layout.attribute("a_texture_pos").unwrap();
        assert_eq!(tex.offset, 3 * tex.kind.size_bytes());
        assert_eq!(tex.kind.gl_name(), "SHORT");
        assert!(layout.attribute("a_color").is_none());
    }

    #[test]
    fn test_buffer_bytes() {
        let buffer = VertexBuffer::from_records(vec![
            VertexRecord::new(1.0, -1.0, [0.0, 256.0, 8192.0]),
            VertexRecord::new(2.0, 2.0, [0.0, 0.0, 8192.0]),
            VertexRecord::new(3.0, 3.0, [0.0, 0.0, 8192.0]),
        ]);
        assert_eq!(buffer.triangle_count(), 1);
        assert_eq!(buffer.to_i16_vec().len(), 18);

        let bytes = buffer.to_le_bytes();
        assert_eq!(bytes.len(), 3 * AttributeLayout::DEFAULT.stride);
        assert_eq!(&bytes[..12], &[1, 0, 0xff, 0xff, 1, 0, 0, 0, 0, 1, 0, 0x20]);
    }
}
