use etherparse::err::LenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("{layer} header too short: need {needed} bytes, got {actual}")]
    TooShort {
        layer: &'static str,
        needed: usize,
        actual: usize,
    },
    #[error("unexpected IP version {version}")]
    UnexpectedVersion { version: u8 },
    #[error("invalid IPv4 header length (IHL {ihl})")]
    InvalidHeaderLength { ihl: u8 },
    #[error("{layer} header: {message}")]
    Slice {
        layer: &'static str,
        message: String,
    },
}

impl LayerError {
    pub(crate) fn too_short(layer: &'static str, err: &LenError) -> Self {
        LayerError::TooShort {
            layer,
            needed: err.required_len,
            actual: err.len,
        }
    }
}
