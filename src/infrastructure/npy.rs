// NPY codec - numeric array file format of the session weight logs
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum NpyError {
    #[error("Missing NPY magic string")]
    BadMagic,

    #[error("Unsupported NPY format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("NPY data ends early")]
    Truncated,

    #[error("Malformed NPY header: {0}")]
    Header(String),

    #[error("Unsupported NPY dtype {0}")]
    UnsupportedDtype(String),
}

/// Serialize a one-dimensional little-endian float64 array (format version 1.0)
pub fn encode_f64(values: &[f64]) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );

    // magic + version + header length + dict + trailing newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    let header_len = dict.len() + padding + 1;

    let mut buf = BytesMut::with_capacity(unpadded + padding + values.len() * 8);
    buf.put_slice(MAGIC);
    buf.put_u8(1);
    buf.put_u8(0);
    buf.put_u16_le(header_len as u16);
    buf.put_slice(dict.as_bytes());
    buf.put_bytes(b' ', padding);
    buf.put_u8(b'\n');
    for value in values {
        buf.put_f64_le(*value);
    }

    buf.to_vec()
}

/// Read a one-dimensional `<f8` or `<i8` array as float64 values
pub fn decode_f64(data: &[u8]) -> Result<Vec<f64>, NpyError> {
    let mut buf = data;
    if buf.remaining() < MAGIC.len() + 2 || &buf[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    buf.advance(MAGIC.len());

    let major = buf.get_u8();
    let minor = buf.get_u8();
    let header_len = match major {
        1 => {
            if buf.remaining() < 2 {
                return Err(NpyError::Truncated);
            }
            buf.get_u16_le() as usize
        }
        2 | 3 => {
            if buf.remaining() < 4 {
                return Err(NpyError::Truncated);
            }
            buf.get_u32_le() as usize
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    if buf.remaining() < header_len {
        return Err(NpyError::Truncated);
    }
    let header = String::from_utf8(buf[..header_len].to_vec())
        .map_err(|_| NpyError::Header("header is not valid text".to_string()))?;
    let descr = quoted_value(&header, "descr")?;
    let len = parse_len(&header)?;
    buf.advance(header_len);

    if len.checked_mul(8).is_none_or(|bytes| buf.remaining() < bytes) {
        return Err(NpyError::Truncated);
    }

    match descr {
        "<f8" => Ok((0..len).map(|_| buf.get_f64_le()).collect()),
        "<i8" => Ok((0..len).map(|_| buf.get_i64_le() as f64).collect()),
        other => Err(NpyError::UnsupportedDtype(other.to_string())),
    }
}

/// Text after `'key':` in the header dict
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let pattern = format!("'{}':", key);
    let start = header
        .find(&pattern)
        .ok_or_else(|| NpyError::Header(format!("missing '{}'", key)))?;
    Ok(header[start + pattern.len()..].trim_start())
}

fn quoted_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let rest = dict_value(header, key)?;
    let rest = rest
        .strip_prefix('\'')
        .ok_or_else(|| NpyError::Header(format!("'{}' is not a string", key)))?;
    let end = rest
        .find('\'')
        .ok_or_else(|| NpyError::Header(format!("unterminated '{}'", key)))?;
    Ok(&rest[..end])
}

fn parse_len(header: &str) -> Result<usize, NpyError> {
    let rest = dict_value(header, "shape")?;
    let rest = rest
        .strip_prefix('(')
        .ok_or_else(|| NpyError::Header("'shape' is not a tuple".to_string()))?;
    let end = rest
        .find(')')
        .ok_or_else(|| NpyError::Header("unterminated 'shape'".to_string()))?;

    let dims = rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<usize>()
                .map_err(|_| NpyError::Header(format!("bad dimension {:?}", d)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match dims.as_slice() {
        [] => Ok(1),
        [len] => Ok(*len),
        _ => Err(NpyError::Header(format!(
            "expected a one-dimensional array, got shape {:?}",
            dims
        ))),
    }
}
