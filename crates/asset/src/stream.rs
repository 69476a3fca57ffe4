//! Byte-stream helpers shared by the binary loaders.
//!
//! Every loader works on any `Read + Seek` source. The helpers here turn the
//! stream's "fewer bytes than asked" outcome into [`DecodeError::UnexpectedEof`]
//! naming the region that was cut short, and let a decoder check that a
//! declared region fits in the stream before allocating for it.

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use corelib::{DecodeError, DecodeResult, alloc_zeroed};

/// Fixed-layout record that can be read verbatim from a stream.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode from exactly [`Record::SIZE`] bytes.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;

    fn to_bytes(&self) -> Vec<u8>;
}

/// Open a file for decoding.
pub fn open_stream(path: impl AsRef<Path>) -> io::Result<BufReader<File>> {
    File::open(path).map(BufReader::new)
}

/// Total length of the stream. The position is restored afterwards.
pub fn stream_len<R: Seek>(reader: &mut R) -> io::Result<u64> {
    let pos = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    if pos != len {
        reader.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Bytes left between the current position and the end of the stream.
pub fn remaining<R: Seek>(reader: &mut R) -> io::Result<u64> {
    let pos = reader.stream_position()?;
    Ok(stream_len(reader)?.saturating_sub(pos))
}

pub fn seek_to<R: Seek>(reader: &mut R, offset: u64) -> io::Result<()> {
    reader.seek(SeekFrom::Start(offset)).map(|_| ())
}

/// Fail with `UnexpectedEof` unless at least `needed` bytes remain.
pub fn ensure_remaining<R: Seek>(reader: &mut R, needed: u64, what: &str) -> DecodeResult<()> {
    let left = remaining(reader)?;
    if left < needed {
        return Err(DecodeError::UnexpectedEof(format!(
            "{} needs {} bytes, stream has {} left",
            what, needed, left
        )));
    }
    Ok(())
}

/// Fill `buf` completely or fail with `UnexpectedEof`.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> DecodeResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::UnexpectedEof(format!(
            "{} truncated (wanted {} bytes)",
            what,
            buf.len()
        )),
        _ => DecodeError::Io(e),
    })
}

/// Read as many bytes as the stream has, up to `buf.len()`.
/// A short count is not an error here.
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one fixed-layout record.
pub fn read_record<T: Record, R: Read>(reader: &mut R, what: &str) -> DecodeResult<T> {
    let mut buf = vec![0u8; T::SIZE];
    read_exact_or_eof(reader, &mut buf, what)?;
    T::from_bytes(&buf)
        .ok_or_else(|| DecodeError::MalformedHeader(format!("{} could not be decoded", what)))
}

/// Read `count` consecutive records, checking the stream can hold them
/// before anything is allocated.
pub fn read_records<T: Record, R: Read + Seek>(
    reader: &mut R,
    count: usize,
    what: &'static str,
) -> DecodeResult<Vec<T>> {
    let len = count.checked_mul(T::SIZE).ok_or_else(|| {
        DecodeError::MalformedHeader(format!("{} count {} overflows", what, count))
    })?;
    ensure_remaining(reader, len as u64, what)?;

    let mut raw: Vec<u8> = alloc_zeroed(len, what)?;
    read_exact_or_eof(reader, &mut raw, what)?;

    let mut records = Vec::new();
    records
        .try_reserve_exact(count)
        .map_err(|_| DecodeError::Allocation {
            size: count.saturating_mul(std::mem::size_of::<T>()),
            what,
        })?;
    for chunk in raw.chunks_exact(T::SIZE) {
        let record = T::from_bytes(chunk)
            .ok_or_else(|| DecodeError::MalformedHeader(format!("{} could not be decoded", what)))?;
        records.push(record);
    }
    Ok(records)
}

#[inline]
pub(crate) fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub(crate) fn le_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
