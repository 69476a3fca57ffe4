//! HDV ("TRITON Vec.Obj") fixed-point mesh loader.
//!
//! # Layout
//! ```text
//! 0x00: identity [u8; 32] (0x0F, "TRITON Vec.Obj", padding)
//! 0x20: face_offset u32
//! 0x24: vert_offset u32
//! 0x28: file_size [u32; 2] (stored twice)
//! 0x30: reserved [i32; 2]
//! 0x38: vertex_count u16
//! 0x3A: version u16
//! 0x3C: face_count u16 (includes two trailing non-geometry records)
//! face_offset: face_count * 36-byte face records
//! vert_offset: vertex_count * 12-byte vertices (3 x i32)
//! ```
//!
//! Faces address vertices by byte offset into the vertex table.

use std::io::{Read, Seek};

use corelib::{DecodeError, DecodeResult, alloc_zeroed};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::{
    mesh::{MeshData, MeshVertex},
    sniff::sniff_magic,
    stream::{Record, le_i32, le_u16, le_u32, read_record, read_records, seek_to, stream_len},
};

/// Start indicator followed by the identity string.
pub const HDV_MAGIC: &[u8; 15] = b"\x0FTRITON Vec.Obj";

pub const HDV_MAX_VERTICES: u16 = 2048;
/// Byte size of one vertex record; face offsets are multiples of it.
pub const HDV_VERTEX_STRIDE: u16 = 12;
/// Records at the end of the face table that carry no geometry.
pub const HDV_TRAILING_FACES: u16 = 2;
pub const HDV_POSITION_SCALE: i32 = 100;
/// Face marker value for a four-sided face.
pub const HDV_QUAD_MARKER: u8 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HdvHeader {
    pub identity: [u8; 32],
    pub face_offset: u32,
    pub vert_offset: u32,
    pub file_size: [u32; 2],
    pub reserved: [i32; 2],
    pub vertex_count: u16,
    pub version: u16,
    pub face_count: u16,
}

impl HdvHeader {
    pub fn new(vertex_count: u16, face_count: u16) -> Self {
        let mut identity = [0u8; 32];
        identity[..HDV_MAGIC.len()].copy_from_slice(HDV_MAGIC);
        Self {
            identity,
            face_offset: Self::SIZE as u32,
            vert_offset: Self::SIZE as u32,
            file_size: [0; 2],
            reserved: [0; 2],
            vertex_count,
            version: 0,
            face_count,
        }
    }

    pub fn has_valid_identity(&self) -> bool {
        self.identity.starts_with(HDV_MAGIC)
    }
}

impl Record for HdvHeader {
    const SIZE: usize = 62;

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            identity: bytes[..32].try_into().ok()?,
            face_offset: le_u32(bytes, 32),
            vert_offset: le_u32(bytes, 36),
            file_size: [le_u32(bytes, 40), le_u32(bytes, 44)],
            reserved: [le_i32(bytes, 48), le_i32(bytes, 52)],
            vertex_count: le_u16(bytes, 56),
            version: le_u16(bytes, 58),
            face_count: le_u16(bytes, 60),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.identity);
        bytes.extend_from_slice(&self.face_offset.to_le_bytes());
        bytes.extend_from_slice(&self.vert_offset.to_le_bytes());
        for v in self.file_size {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in self.reserved {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&self.vertex_count.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.face_count.to_le_bytes());
        bytes
    }
}

/// One face record. Only the marker and the vertex offsets are understood.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HdvFace {
    /// Byte 0 is the corner count (4 for quads).
    pub marker: [u8; 2],
    pub colour_flag: u8,
    pub unknown0: [u8; 8],
    pub unknown1: u8,
    pub vertex_offsets: [u16; 4],
    pub unknown2: [u8; 16],
}

impl HdvFace {
    pub fn triangle(offsets: [u16; 3]) -> Self {
        Self {
            marker: [3, 0],
            vertex_offsets: [offsets[0], offsets[1], offsets[2], 0],
            ..Self::default()
        }
    }

    pub fn quad(offsets: [u16; 4]) -> Self {
        Self {
            marker: [HDV_QUAD_MARKER, 0],
            vertex_offsets: offsets,
            ..Self::default()
        }
    }

    pub fn is_quad(&self) -> bool {
        self.marker[0] == HDV_QUAD_MARKER
    }
}

impl Record for HdvFace {
    const SIZE: usize = 36;

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            marker: [bytes[0], bytes[1]],
            colour_flag: bytes[2],
            unknown0: bytes[3..11].try_into().ok()?,
            unknown1: bytes[11],
            vertex_offsets: [
                le_u16(bytes, 12),
                le_u16(bytes, 14),
                le_u16(bytes, 16),
                le_u16(bytes, 18),
            ],
            unknown2: bytes[20..36].try_into().ok()?,
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.marker);
        bytes.push(self.colour_flag);
        bytes.extend_from_slice(&self.unknown0);
        bytes.push(self.unknown1);
        for o in self.vertex_offsets {
            bytes.extend_from_slice(&o.to_le_bytes());
        }
        bytes.extend_from_slice(&self.unknown2);
        bytes
    }
}

/// Fixed-point vertex position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HdvVertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl HdvVertex {
    /// Convert to engine space: X and Y negated, then each coordinate
    /// divided by the scale in integer arithmetic (truncating toward zero).
    pub fn position(&self) -> [f32; 3] {
        [
            (self.x.wrapping_neg() / HDV_POSITION_SCALE) as f32,
            (self.y.wrapping_neg() / HDV_POSITION_SCALE) as f32,
            (self.z / HDV_POSITION_SCALE) as f32,
        ]
    }
}

impl Record for HdvVertex {
    const SIZE: usize = 12;

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            x: le_i32(bytes, 0),
            y: le_i32(bytes, 4),
            z: le_i32(bytes, 8),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        [self.x, self.y, self.z]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }
}

/// Check every header field against the others and the stream length.
pub fn validate_header(header: &HdvHeader, stream_len: u64) -> DecodeResult<()> {
    if !header.has_valid_identity() {
        return Err(DecodeError::MalformedHeader("invalid HDV header".into()));
    }
    if u64::from(header.file_size[0]) != stream_len {
        return Err(DecodeError::MalformedHeader(format!(
            "invalid file size in HDV header ({} declared, {} actual)",
            header.file_size[0], stream_len
        )));
    }
    if header.vertex_count > HDV_MAX_VERTICES {
        return Err(DecodeError::MalformedHeader(format!(
            "model exceeds max vertex limit ({} > {})",
            header.vertex_count, HDV_MAX_VERTICES
        )));
    }
    if (header.face_offset as usize) < HdvHeader::SIZE {
        return Err(DecodeError::MalformedHeader(format!(
            "invalid face offset in HDV header ({})",
            header.face_offset
        )));
    }
    if (header.vert_offset as usize) < HdvHeader::SIZE {
        return Err(DecodeError::MalformedHeader(format!(
            "invalid vertex offset in HDV header ({})",
            header.vert_offset
        )));
    }
    if header.face_count < HDV_TRAILING_FACES {
        return Err(DecodeError::MalformedHeader(format!(
            "HDV face count {} is below the {} trailing records",
            header.face_count, HDV_TRAILING_FACES
        )));
    }
    Ok(())
}

pub fn sniff_hdv<R: Read + Seek>(reader: &mut R) -> DecodeResult<bool> {
    sniff_magic(reader, HDV_MAGIC)
}

/// Decode an HDV model. Normals are left zero.
pub fn decode_hdv<R: Read + Seek>(reader: &mut R) -> DecodeResult<MeshData> {
    let len = stream_len(reader)?;
    seek_to(reader, 0)?;
    let header: HdvHeader = read_record(reader, "HDV header")?;
    validate_header(&header, len)?;
    log::debug!(
        "HDV header: version={} vertices={} faces={} face_offset={} vert_offset={}",
        header.version,
        header.vertex_count,
        header.face_count,
        header.face_offset,
        header.vert_offset
    );

    seek_to(reader, u64::from(header.face_offset))?;
    let faces: Vec<HdvFace> = read_records(reader, usize::from(header.face_count), "HDV faces")?;

    seek_to(reader, u64::from(header.vert_offset))?;
    let vertices: Vec<HdvVertex> =
        read_records(reader, usize::from(header.vertex_count), "HDV vertices")?;

    let geometry_faces = &faces[..faces.len() - usize::from(HDV_TRAILING_FACES)];
    let mesh = assemble(geometry_faces, &vertices)?;

    log::info!(
        "Decoded HDV model: {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Translate a byte offset into the vertex table into a vertex index.
fn vertex_index(offset: u16, vertex_count: usize) -> DecodeResult<u32> {
    let index = offset / HDV_VERTEX_STRIDE;
    if usize::from(index) >= vertex_count {
        return Err(DecodeError::OutOfRange(format!(
            "HDV face references vertex {} (offset {}) of {}",
            index, offset, vertex_count
        )));
    }
    Ok(u32::from(index))
}

fn assemble(faces: &[HdvFace], vertices: &[HdvVertex]) -> DecodeResult<MeshData> {
    let vertex_count = vertices.len();

    // Placeholder colours to tell faces apart; not stored in the file.
    let mut rng = Pcg32::seed_from_u64(vertex_count as u64);
    let mut mesh_vertices: Vec<MeshVertex> = alloc_zeroed(vertex_count, "HDV mesh vertices")?;
    for (out, v) in mesh_vertices.iter_mut().zip(vertices) {
        let colour = [
            rng.random_range(0..255),
            rng.random_range(0..255),
            rng.random_range(0..255),
            255,
        ];
        *out = MeshVertex::new(v.position(), colour);
    }

    let mut indices: Vec<u32> = Vec::new();
    indices
        .try_reserve_exact(faces.len() * 6)
        .map_err(|_| DecodeError::Allocation {
            size: faces.len() * 6 * 4,
            what: "HDV mesh indices",
        })?;
    for face in faces {
        let [a, b, c, d] = face.vertex_offsets;
        for off in [a, b, c] {
            indices.push(vertex_index(off, vertex_count)?);
        }
        if face.is_quad() {
            for off in [d, a, c] {
                indices.push(vertex_index(off, vertex_count)?);
            }
        }
    }

    Ok(MeshData::new(mesh_vertices, indices))
}

/// Write a complete HDV file: faces right after the header, vertices after
/// the faces, both file-size fields filled in.
///
/// # Panics
///
/// Panics if there are more than `u16::MAX` faces or vertices, since the
/// header stores both counts as 16-bit fields.
pub fn encode_hdv(faces: &[HdvFace], vertices: &[HdvVertex], version: u16) -> Vec<u8> {
    assert!(faces.len() <= usize::from(u16::MAX), "HDV face count exceeds u16");
    assert!(vertices.len() <= usize::from(u16::MAX), "HDV vertex count exceeds u16");
    let mut header = HdvHeader::new(vertices.len() as u16, faces.len() as u16);
    header.version = version;
    header.face_offset = HdvHeader::SIZE as u32;
    // At most 62 + 65535 * (36 + 12) bytes, well inside u32.
    header.vert_offset = (HdvHeader::SIZE + faces.len() * HdvFace::SIZE) as u32;
    let total = header.vert_offset + (vertices.len() * HdvVertex::SIZE) as u32;
    header.file_size = [total; 2];

    let mut out = header.to_bytes();
    for f in faces {
        out.extend(f.to_bytes());
    }
    for v in vertices {
        out.extend(v.to_bytes());
    }
    out
}
