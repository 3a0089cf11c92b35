//! Container detection by magic bytes.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::metadata::ContainerVersion;

/// Peeks the head of a parity stream and identifies its container:
/// `PAR2\0` prefix, a leading `{`, or the `ustar` magic at offset 257.
/// The reader is rewound to the start afterwards.
pub fn detect_container<R: Read + Seek>(reader: &mut R) -> Result<ContainerVersion> {
    let mut head = [0u8; 263];
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    reader.seek(SeekFrom::Start(0))?;

    let head = &head[..filled];
    if head.len() >= 5 && &head[..5] == b"PAR2\0" {
        Ok(ContainerVersion::Par2)
    } else if !head.is_empty() && head[0] == b'{' {
        Ok(ContainerVersion::Json)
    } else if head.len() >= 262 && &head[257..262] == b"ustar" {
        Ok(ContainerVersion::Tar)
    } else {
        Err(Error::UnknownContainer)
    }
}
