//! Raw PCM byte layout helpers.
//!
//! Capture files carry no header: signed 16-bit samples, interleaved,
//! little-endian. Consumers learn the rate and channel count from the
//! metadata sidecar or out-of-band.
//!
//! Layout per sample `i`:
//! ```text
//! [2i]     sample & 0xFF
//! [2i + 1] (sample >> 8) & 0xFF
//! ```

/// Size of one 16-bit sample in bytes.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Encode `samples` into `out` as little-endian bytes, replacing its contents.
///
/// `out` ends up exactly `samples.len() * 2` bytes long, so a reused
/// buffer never leaks bytes from a longer previous block.
pub fn encode_le_into(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Encode `samples` into a freshly allocated byte vector.
pub fn encode_le(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    encode_le_into(samples, &mut out);
    out
}

/// Decode little-endian bytes back into samples. A trailing odd byte is ignored.
pub fn decode_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
