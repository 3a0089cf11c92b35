//! Error taxonomy for parity-archive operations.
//!
//! `ShardBroken` and `PacketDamaged` are recoverable at their point of
//! origin (a broken shard becomes a hole, a damaged packet is dropped);
//! everything else aborts the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unknown parity container (no recognized magic bytes)")]
    UnknownContainer,

    #[error("unknown container version tag {0}")]
    UnknownVersion(u8),

    #[error("shard index mismatch: got {got}, wanted {want}")]
    IndexMismatch { got: u32, want: u32 },

    #[error("shard is broken")]
    ShardBroken,

    #[error("reconstruct failed: {0}")]
    ReconstructFailed(String),

    #[error("stripe verification failed")]
    VerifyFailed,

    #[error("damaged packet")]
    PacketDamaged,

    #[error("input truncated mid-stripe")]
    Truncation,

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(io) => Error::Io(io),
            other => Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
