use thiserror::Error;

/// Fatal format errors in an MMTF envelope or one of its encoded arrays.
#[derive(Debug, Error)]
pub enum MmtfError {
    #[error("unknown array codec {0}")]
    UnknownCodec(i32),

    #[error("unsupported msgpack marker 0x{0:02x}")]
    UnsupportedMarker(u8),

    #[error("truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("codec {codec}: declared {declared} elements, decoded {decoded}")]
    LengthMismatch {
        codec: i32,
        declared: usize,
        decoded: usize,
    },

    #[error("codec {codec}: {detail}")]
    InvalidArray { codec: i32, detail: String },

    #[error("invalid run-length data: {0}")]
    InvalidRunLength(String),

    #[error("invalid UTF-8 string at byte {0}")]
    InvalidUtf8(usize),

    #[error("values nested deeper than {0} levels")]
    DepthLimit(usize),

    #[error("envelope root must be a map")]
    RootNotMap,

    #[error("gzip decompression failed: {0}")]
    Gzip(#[from] std::io::Error),
}

impl MmtfError {
    pub(crate) fn invalid(codec: i32, detail: impl Into<String>) -> Self {
        MmtfError::InvalidArray {
            codec,
            detail: detail.into(),
        }
    }
}
