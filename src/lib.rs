//! Parity archives: Reed-Solomon side-car files that allow a data file to
//! be reconstructed after limited corruption or truncation of either the
//! data file or the parity file itself.
//!
//! Three on-disk containers are supported: a JSON-framed stream, an
//! uncompressed tar archive of per-shard members, and the PAR 2.0 packet
//! format.

pub mod args;
pub mod checksum;
pub mod codec;
pub mod container;
pub mod create;
pub mod decoder;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod frame_json;
pub mod frame_tar;
pub mod metadata;
pub mod par2;
pub mod restore;
pub mod shard;

pub use create::create_par_file;
pub use error::{Error, Result};
pub use metadata::{ContainerVersion, FileMetadata, ShardMetadata};
pub use restore::restore_par_file;
