//! Loader dispatch: sniff a stream, decode it, report failures.
//!
//! A format mismatch is not an error. The reader-based functions return
//! `Ok(None)` for it and the sink-based entry points return `None` without
//! writing a record, so callers can move on to the next loader.

use std::{
    io::{Read, Seek},
    path::Path,
};

use corelib::{DecodeResult, ErrorKind, ErrorSink};

use crate::{
    hdv::{decode_hdv, sniff_hdv},
    mesh::{MeshData, StaticModel},
    stream::open_stream,
    texture::RasterImage,
    tim::{decode_tim, sniff_tim},
};

/// One binary asset format.
pub trait AssetLoader {
    type Output;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Non-destructive probe. Leaves the stream rewound.
    fn sniff<R: Read + Seek>(reader: &mut R) -> DecodeResult<bool>;

    fn decode<R: Read + Seek>(reader: &mut R) -> DecodeResult<Self::Output>;
}

pub struct TimLoader;

impl AssetLoader for TimLoader {
    type Output = RasterImage;
    const NAME: &'static str = "TIM";

    fn sniff<R: Read + Seek>(reader: &mut R) -> DecodeResult<bool> {
        sniff_tim(reader)
    }

    fn decode<R: Read + Seek>(reader: &mut R) -> DecodeResult<RasterImage> {
        decode_tim(reader)
    }
}

pub struct HdvLoader;

impl AssetLoader for HdvLoader {
    type Output = MeshData;
    const NAME: &'static str = "HDV";

    fn sniff<R: Read + Seek>(reader: &mut R) -> DecodeResult<bool> {
        sniff_hdv(reader)
    }

    fn decode<R: Read + Seek>(reader: &mut R) -> DecodeResult<MeshData> {
        decode_hdv(reader)
    }
}

/// Formats recognised by [`probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Model,
}

/// Identify which known format the stream holds, if any.
pub fn probe<R: Read + Seek>(reader: &mut R) -> DecodeResult<Option<AssetKind>> {
    if TimLoader::sniff(reader)? {
        return Ok(Some(AssetKind::Image));
    }
    if HdvLoader::sniff(reader)? {
        return Ok(Some(AssetKind::Model));
    }
    Ok(None)
}

/// Sniff then decode. `Ok(None)` means the stream is not in this format.
pub fn load_from_reader<L: AssetLoader, R: Read + Seek>(
    reader: &mut R,
) -> DecodeResult<Option<L::Output>> {
    if !L::sniff(reader)? {
        log::debug!("stream is not {}", L::NAME);
        return Ok(None);
    }
    L::decode(reader).map(Some)
}

/// Open `path` and run [`load_from_reader`] on it. The file is closed on
/// every path out of this function.
pub fn load_from_path<L: AssetLoader>(path: impl AsRef<Path>) -> DecodeResult<Option<L::Output>> {
    let path = path.as_ref();
    log::info!("Loading {} from {:?}", L::NAME, path);
    let mut reader = open_stream(path)?;
    load_from_reader::<L, _>(&mut reader)
}

fn report<T>(sink: &mut dyn ErrorSink, path: &Path, result: DecodeResult<Option<T>>) -> Option<T> {
    match result {
        Ok(out) => out,
        Err(e) => {
            sink.report(e.kind(), &format!("{}: {}", path.display(), e));
            None
        }
    }
}

/// Load a TIM image. Returns `None` on a format mismatch (no record) or on
/// failure (one record in `sink`).
pub fn load_image(path: impl AsRef<Path>, sink: &mut dyn ErrorSink) -> Option<RasterImage> {
    let path = path.as_ref();
    report(sink, path, load_from_path::<TimLoader>(path))
}

/// Load an HDV model and compute its normals and bounds. Returns `None` on a
/// format mismatch (no record) or on failure (one record in `sink`).
pub fn load_model(path: impl AsRef<Path>, sink: &mut dyn ErrorSink) -> Option<StaticModel> {
    let path = path.as_ref();
    let mesh = report(sink, path, load_from_path::<HdvLoader>(path))?;
    let model = StaticModel::from_mesh(mesh);
    if model.is_none() {
        sink.report(
            ErrorKind::MalformedHeader,
            &format!("{}: model has no vertices", path.display()),
        );
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hdv::{HdvFace, HdvVertex, encode_hdv},
        texture::{PixelFormat, compute_buffer_size},
        tim::{TimType, encode_tim},
    };
    use corelib::ErrorLog;
    use std::io::Cursor;

    fn minimal_tim() -> Vec<u8> {
        encode_tim(
            TimType::Bpp4,
            Some((2, 1, &[0x001F, 0x8000][..])),
            (1, 1, &[0x10, 0x01][..]),
        )
    }

    fn minimal_hdv() -> Vec<u8> {
        let faces = [
            HdvFace::quad([0, 12, 24, 36]),
            HdvFace::default(),
            HdvFace::default(),
        ];
        let vertices = [
            HdvVertex { x: -100, y: -100, z: 0 },
            HdvVertex { x: 100, y: -100, z: 0 },
            HdvVertex { x: 100, y: 100, z: 0 },
            HdvVertex { x: -100, y: 100, z: 0 },
        ];
        encode_hdv(&faces, &vertices, 1)
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect("write fixture");
        path
    }

    #[test]
    fn probe_identifies_formats() {
        assert_eq!(
            probe(&mut Cursor::new(minimal_tim())).unwrap(),
            Some(AssetKind::Image)
        );
        assert_eq!(
            probe(&mut Cursor::new(minimal_hdv())).unwrap(),
            Some(AssetKind::Model)
        );
        let mut other = Cursor::new(b"\x89PNG\r\n\x1a\n".to_vec());
        assert_eq!(probe(&mut other).unwrap(), None);
        assert_eq!(other.position(), 0);
    }

    #[test]
    fn wrong_format_is_not_an_error() {
        let mut cur = Cursor::new(minimal_hdv());
        assert!(load_from_reader::<TimLoader, _>(&mut cur).unwrap().is_none());
        assert_eq!(cur.position(), 0);
        // The same stream can then be handed to the next loader.
        assert!(load_from_reader::<HdvLoader, _>(&mut cur).unwrap().is_some());
    }

    #[test]
    fn load_image_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "tiny.tim", &minimal_tim());
        let mut sink = ErrorLog::new();

        let img = load_image(&path, &mut sink).expect("image");
        assert!(sink.is_empty());
        assert_eq!((img.width, img.height), (4, 1));
        assert_eq!(img.format, PixelFormat::Rgb5A1);
        assert_eq!(
            Some(img.data.len()),
            compute_buffer_size(img.format, img.width, img.height)
        );
        // Index 0 is opaque red, index 1 is black with STP (opaque black).
        assert_eq!(img.data, vec![0xF8, 0x01, 0x00, 0x01, 0x00, 0x01, 0xF8, 0x01]);
    }

    #[test]
    fn load_image_failure_writes_one_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut bytes = minimal_tim();
        bytes.pop();
        let path = write(&dir, "short.tim", &bytes);
        let mut sink = ErrorLog::new();

        assert!(load_image(&path, &mut sink).is_none());
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.last().unwrap().kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn load_image_on_model_is_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "model.hdv", &minimal_hdv());
        let mut sink = ErrorLog::new();
        assert!(load_image(&path, &mut sink).is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = ErrorLog::new();
        assert!(load_model(dir.path().join("absent.hdv"), &mut sink).is_none());
        assert_eq!(sink.last().unwrap().kind, ErrorKind::Io);
    }

    #[test]
    fn load_model_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "quad.hdv", &minimal_hdv());
        let mut sink = ErrorLog::new();

        let model = load_model(&path, &mut sink).expect("model");
        assert!(sink.is_empty());
        assert_eq!(model.mesh.vertices.len(), 4);
        assert_eq!(model.mesh.triangle_count(), 2);
        assert_eq!(model.mesh.indices, vec![0, 1, 2, 3, 0, 2]);
        assert_eq!(model.bounds.min.to_array(), [-1.0, -1.0, 0.0]);
        assert_eq!(model.bounds.max.to_array(), [1.0, 1.0, 0.0]);
        assert!(
            model
                .mesh
                .vertices
                .iter()
                .all(|v| (v.normal[2].abs() - 1.0).abs() < 1e-6)
        );
    }

    #[test]
    fn load_model_rejects_vertex_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut bytes = minimal_hdv();
        // vertex_count lives at offset 56.
        bytes[56..58].copy_from_slice(&2049u16.to_le_bytes());
        let path = write(&dir, "big.hdv", &bytes);
        let mut sink = ErrorLog::new();

        assert!(load_model(&path, &mut sink).is_none());
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.last().unwrap().kind, ErrorKind::MalformedHeader);
    }
}
