//! Sample format conversion
//!
//! Pure functions between raw byte buffers and typed samples. Byte order is
//! little-endian on every host. Conversions only reinterpret bits, so a
//! round trip through bytes is exact for both encodings (including NaN
//! payloads for f32).
//!
//! The `(bytes, offset, end)` functions decode `bytes[offset..end]`.

use super::error::{PcmError, PcmResult};

/// Scale used to map i16 samples into [-1.0, 1.0)
const I16_SCALE: f32 = 32768.0;

fn checked_range(bytes: &[u8], offset: usize, end: usize) -> PcmResult<&[u8]> {
    if offset > end || end > bytes.len() {
        return Err(PcmError::InvalidArgument(format!(
            "range {}..{} out of bounds for {} byte buffer",
            offset,
            end,
            bytes.len()
        )));
    }
    Ok(&bytes[offset..end])
}

/// Decode little-endian i16 samples from `bytes[offset..end]`
pub fn bytes_to_i16(bytes: &[u8], offset: usize, end: usize) -> PcmResult<Vec<i16>> {
    let range = checked_range(bytes, offset, end)?;
    if range.len() % 2 != 0 {
        return Err(PcmError::InvalidArgument(format!(
            "{} bytes is not a whole number of 16-bit samples",
            range.len()
        )));
    }
    Ok(range
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Decode little-endian f32 samples from `bytes[offset..end]`
///
/// An empty range is rejected as well as a misaligned one.
pub fn bytes_to_f32(bytes: &[u8], offset: usize, end: usize) -> PcmResult<Vec<f32>> {
    let range = checked_range(bytes, offset, end)?;
    if range.is_empty() || range.len() % 4 != 0 {
        return Err(PcmError::InvalidArgument(format!(
            "{} bytes is not a non-empty whole number of 32-bit samples",
            range.len()
        )));
    }
    Ok(range
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Encode i16 samples as little-endian bytes
pub fn i16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode f32 samples as little-endian bytes
pub fn f32_to_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Normalise i16 samples to f32 in [-1.0, 1.0)
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / I16_SCALE).collect()
}

/// New buffer holding the first `len_a` bytes of `a` followed by the first
/// `len_b` bytes of `b`
pub fn concat(a: &[u8], len_a: usize, b: &[u8], len_b: usize) -> PcmResult<Vec<u8>> {
    if len_a > a.len() || len_b > b.len() {
        return Err(PcmError::InvalidArgument(format!(
            "prefix lengths {}/{} exceed buffers of {}/{} bytes",
            len_a,
            len_b,
            a.len(),
            b.len()
        )));
    }
    let mut out = Vec::with_capacity(len_a + len_b);
    out.extend_from_slice(&a[..len_a]);
    out.extend_from_slice(&b[..len_b]);
    Ok(out)
}
