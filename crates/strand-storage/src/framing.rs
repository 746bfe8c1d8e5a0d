//! Record framing shared by every `Log` backend: `[len:u32][crc32:u32][payload]`.
//!
//! Kept separate from the backends themselves so `InMemoryLog` and
//! `FileLog` can't drift in how they checksum or size-prefix records.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

/// Encode `payload` as a single framed record.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    let checksum = crc32fast::hash(payload);
    out.write_u32::<LittleEndian>(checksum).unwrap();
    out.extend_from_slice(payload);
    out
}

/// Number of framing bytes preceding the payload.
pub const HEADER_LEN: usize = 8;

/// Decode a single record from `bytes`, verifying its checksum.
pub fn decode(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut cursor = Cursor::new(bytes);
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let checksum = cursor.read_u32::<LittleEndian>()?;
    let mut payload = vec![0u8; len];
    cursor.read_exact(&mut payload)?;
    if crc32fast::hash(&payload) != checksum {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "record checksum mismatch",
        ));
    }
    Ok(payload)
}

/// Total on-disk size of a record carrying `payload_len` bytes.
pub fn record_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len
}

/// Write a framed record to `w`.
pub fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    w.write_all(&encode(payload))
}

/// Magic payload written once at log offset `0`. Every backend writes this
/// as its very first record so that offset `0` is never handed out as a
/// real record's address — it would otherwise be indistinguishable from
/// `LogAddress::NONE`.
pub const RESERVED_HEADER: &[u8] = b"STRANDLOG";

/// The framed bytes of the reserved header record.
pub fn reserved_header_record() -> Vec<u8> {
    encode(RESERVED_HEADER)
}
