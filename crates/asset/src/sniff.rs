//! Non-destructive format probing.

use std::io::{Read, Seek, SeekFrom};

use corelib::DecodeResult;

use crate::stream::read_up_to;

/// Compare the first `magic.len()` bytes of the stream with `magic`.
///
/// The stream is rewound to its start on return, match or not, so several
/// formats can be probed against the same reader. A stream shorter than the
/// magic is a negative match, not an error.
pub fn sniff_magic<R: Read + Seek>(reader: &mut R, magic: &[u8]) -> DecodeResult<bool> {
    reader.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; magic.len()];
    let read = read_up_to(reader, &mut buf);
    reader.seek(SeekFrom::Start(0))?;
    let read = read?;
    Ok(read == magic.len() && buf == magic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn matching_magic() {
        let mut cur = Cursor::new(b"MAGICrest".to_vec());
        assert!(sniff_magic(&mut cur, b"MAGIC").unwrap());
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn mismatch_rewinds() {
        let mut cur = Cursor::new(b"other data".to_vec());
        cur.set_position(4);
        assert!(!sniff_magic(&mut cur, b"MAGIC").unwrap());
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn short_stream_is_negative_match() {
        let mut cur = Cursor::new(b"MA".to_vec());
        assert!(!sniff_magic(&mut cur, b"MAGIC").unwrap());
        assert_eq!(cur.position(), 0);
    }
}
