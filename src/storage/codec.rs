//! Record value codec: raw little-endian IEEE-754 f32, `L * 4` bytes, no header.

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Encodes a vector as little-endian f32 bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes little-endian f32 bytes. Returns `None` if the length is not a multiple of 4.
pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    let dim = encoded_dim(bytes.len())?;

    let mut vector = Vec::with_capacity(dim);
    vector.extend(
        bytes
            .chunks_exact(F32_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
    );
    Some(vector)
}

/// Number of f32 values encoded in `byte_len` bytes, if the length is well formed.
#[inline]
pub fn encoded_dim(byte_len: usize) -> Option<usize> {
    byte_len
        .is_multiple_of(F32_BYTES)
        .then_some(byte_len / F32_BYTES)
}
