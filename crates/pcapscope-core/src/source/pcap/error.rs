use thiserror::Error;

/// Container-level failure, tagged with the reader step that failed.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture container error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
}
