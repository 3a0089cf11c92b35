//! Recovery-set configuration persisted at the head of every parity stream.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_SHARD_SIZE: u32 = 512 << 10;
pub const DEFAULT_DATA_SHARDS: u8 = 10;
pub const DEFAULT_PARITY_SHARDS: u8 = 3;

/// On-disk container of the parity stream. The numeric values are the wire
/// `V` tag and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ContainerVersion {
    Json,
    Par2,
    Tar,
}

impl From<ContainerVersion> for u8 {
    fn from(version: ContainerVersion) -> u8 {
        match version {
            ContainerVersion::Json => 0,
            ContainerVersion::Par2 => 1,
            ContainerVersion::Tar => 2,
        }
    }
}

impl TryFrom<u8> for ContainerVersion {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ContainerVersion::Json),
            1 => Ok(ContainerVersion::Par2),
            2 => Ok(ContainerVersion::Tar),
            other => Err(Error::UnknownVersion(other)),
        }
    }
}

impl std::fmt::Display for ContainerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContainerVersion::Json => "json",
            ContainerVersion::Par2 => "par2",
            ContainerVersion::Tar => "tar",
        };
        f.write_str(name)
    }
}

/// Recovery-set configuration. Written once at the head of the parity
/// stream on create and reconstituted at the head of a restore session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(rename = "V")]
    pub version: ContainerVersion,
    #[serde(rename = "DS")]
    pub data_shards: u8,
    #[serde(rename = "PS")]
    pub parity_shards: u8,
    #[serde(rename = "S")]
    pub shard_size: u32,
    #[serde(rename = "F")]
    pub file_name: String,
    #[serde(rename = "OP")]
    pub only_parity: bool,
}

impl FileMetadata {
    /// Applies the historical defaults for unset geometry fields.
    pub fn or_defaults(mut self) -> Self {
        if self.data_shards == 0 {
            self.data_shards = DEFAULT_DATA_SHARDS;
        }
        if self.parity_shards == 0 {
            self.parity_shards = DEFAULT_PARITY_SHARDS;
        }
        if self.shard_size == 0 {
            self.shard_size = DEFAULT_SHARD_SIZE;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let d = self.data_shards as usize;
        let p = self.parity_shards as usize;
        if d == 0 || p == 0 {
            return Err(Error::InvalidMetadata(format!(
                "shard counts must be positive (D={d}, P={p})"
            )));
        }
        if d + p > 256 {
            return Err(Error::InvalidMetadata(format!(
                "D+P must not exceed 256 (D={d}, P={p})"
            )));
        }
        if self.shard_size == 0 {
            return Err(Error::InvalidMetadata("shard size must be positive".into()));
        }
        Ok(())
    }

    pub fn data_shards(&self) -> usize {
        self.data_shards as usize
    }

    pub fn parity_shards(&self) -> usize {
        self.parity_shards as usize
    }

    pub fn total_shards(&self) -> usize {
        self.data_shards() + self.parity_shards()
    }

    pub fn shard_size(&self) -> usize {
        self.shard_size as usize
    }

    /// Bytes of source data carried by one full stripe.
    pub fn stripe_data_len(&self) -> usize {
        self.data_shards() * self.shard_size()
    }
}

/// Rounds a shard size up to the next multiple of four. PAR 2.0 requires
/// 4-aligned slices; the other containers keep the same alignment.
pub fn round_shard_size(size: u32) -> u32 {
    match size % 4 {
        0 => size,
        n => size + (4 - n),
    }
}

/// Per-shard record used by the JSON and tar framings. `hash32` is the
/// CRC-32C of the zero-padded S-byte shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMetadata {
    #[serde(rename = "i")]
    pub index: u32,
    #[serde(rename = "s")]
    pub size: u32,
    #[serde(rename = "h")]
    pub hash32: u32,
}
