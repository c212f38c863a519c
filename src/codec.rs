//! Record encoding for intermediate artifacts.
//!
//! An artifact is a flat sequence of records, each laid out as
//!
//! ```text
//! u32 (big endian) key length | key bytes | u32 (big endian) value length | value bytes
//! ```
//!
//! Keys and values are opaque bytes; the framing is the only structure.

use anyhow::{anyhow, bail, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::KeyValue;

const LEN_PREFIX: usize = std::mem::size_of::<u32>();

/// Encode the pairs, in order, into one buffer.
///
/// Fails if a key or value is too long for its length prefix.
pub fn encode(pairs: &[KeyValue]) -> Result<Bytes> {
    let size = pairs
        .iter()
        .map(|kv| 2 * LEN_PREFIX + kv.key.len() + kv.value.len())
        .sum();
    let mut buf = BytesMut::with_capacity(size);
    for kv in pairs {
        put_field(&mut buf, &kv.key)?;
        put_field(&mut buf, &kv.value)?;
    }
    Ok(buf.freeze())
}

/// Decode every record in `buf`.
///
/// Fails if the buffer ends in the middle of a record.
pub fn decode(mut buf: Bytes) -> Result<Vec<KeyValue>> {
    let mut pairs = Vec::new();
    while buf.has_remaining() {
        let key = take_field(&mut buf)?;
        let value = take_field(&mut buf)?;
        pairs.push(KeyValue { key, value });
    }
    Ok(pairs)
}

fn put_field(buf: &mut BytesMut, field: &[u8]) -> Result<()> {
    buf.put_u32(prefix_len(field.len())?);
    buf.put_slice(field);
    Ok(())
}

fn prefix_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| anyhow!("field of {len} bytes does not fit a record"))
}

fn take_field(buf: &mut Bytes) -> Result<Bytes> {
    if buf.remaining() < LEN_PREFIX {
        bail!("truncated record: {} byte(s) left for a length prefix", buf.remaining());
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        bail!(
            "truncated record: field of {} byte(s) but only {} left",
            len,
            buf.remaining()
        );
    }
    Ok(buf.split_to(len))
}
