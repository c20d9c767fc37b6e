use crate::error::{Result, ViewError};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl TryFrom<u8> for CodecId {
    type Error = ViewError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(CodecId::Store),
            1 => Ok(CodecId::Zstd),
            other => Err(ViewError::Format(format!("unknown body codec {other}"))),
        }
    }
}

pub fn compress(codec: CodecId, src: &[u8], level: i32) -> Result<Vec<u8>> {
    match codec {
        CodecId::Store => Ok(src.to_vec()),
        CodecId::Zstd => Ok(zstd::bulk::compress(src, level)?),
    }
}

/// Decode a body; `u_len` is the exact expected plain length.
pub fn decompress(codec: CodecId, src: &[u8], u_len: usize) -> Result<Vec<u8>> {
    let plain = match codec {
        CodecId::Store => src.to_vec(),
        CodecId::Zstd => zstd::bulk::decompress(src, u_len)
            .map_err(|e| ViewError::Format(format!("zstd body: {e}")))?,
    };
    if plain.len() != u_len {
        return Err(ViewError::Format(format!(
            "body length mismatch: got {} expected {u_len}",
            plain.len()
        )));
    }
    Ok(plain)
}

/// True if `c` saves at least `min_gain` of `u` (e.g. 0.05 = 5%).
pub fn should_compress(u: usize, c: usize, min_gain: f32) -> bool {
    (u as f64 - c as f64) >= (u as f64 * min_gain as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_body_decodes() {
        let body = "Subject: hi\r\n\r\n".repeat(50);
        let c = compress(CodecId::Zstd, body.as_bytes(), 3).unwrap();
        assert!(c.len() < body.len());
        let p = decompress(CodecId::Zstd, &c, body.len()).unwrap();
        assert_eq!(p, body.as_bytes());
    }

    #[test]
    fn length_mismatch_is_a_format_error() {
        let err = decompress(CodecId::Store, b"abc", 4).unwrap_err();
        assert!(matches!(err, ViewError::Format(_)));
    }

    #[test]
    fn min_gain_threshold() {
        assert!(should_compress(100, 90, 0.05));
        assert!(!should_compress(100, 97, 0.05));
    }
}
