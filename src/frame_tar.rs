//! Tar framing: an uncompressed POSIX archive with one member per shard.
//!
//! The first member is `FileMetadata.json`. Every shard member is named
//! `shard-{..}.dat` with the `ShardMetadata` record embedded verbatim in
//! the name, so the per-shard metadata survives even when the member body
//! is elided (`only_parity` data shards). Members are read-only; the
//! timestamp is frozen at writer construction.

use std::io::{Read, Seek, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

use crate::checksum::compute_crc32c;
use crate::error::{Error, Result};
use crate::frame_json::fill_view_from;
use crate::metadata::{FileMetadata, ShardMetadata};
use crate::shard::{ShardPull, ShardSource, StripeSink};

pub const METADATA_MEMBER: &str = "FileMetadata.json";

pub struct TarWriter<W: Write> {
    builder: tar::Builder<W>,
    meta: FileMetadata,
    index: u32,
    mtime: u64,
}

impl<W: Write> TarWriter<W> {
    pub fn new(w: W, meta: FileMetadata) -> Result<Self> {
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut writer = Self {
            builder: tar::Builder::new(w),
            meta: meta.clone(),
            index: 0,
            mtime,
        };
        let header_bytes = serde_json::to_vec(&meta)?;
        writer.add_member(METADATA_MEMBER, &header_bytes)?;
        Ok(writer)
    }

    fn add_member(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut header = tar::Header::new_ustar();
        header.set_path(name)?;
        header.set_mode(0o444);
        header.set_uid(0);
        header.set_gid(0);
        header.set_size(data.len() as u64);
        header.set_mtime(self.mtime);
        header.set_cksum();
        self.builder.append(&header, data)?;
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        let mut w = self.builder.into_inner()?;
        w.flush()?;
        Ok(w)
    }
}

impl<W: Write> StripeSink for TarWriter<W> {
    fn write_stripe(&mut self, shards: &[&[u8]], logical_len: usize) -> Result<()> {
        let shard_size = self.meta.shard_size();
        let mut remaining = logical_len;
        for (slot, shard) in shards.iter().enumerate() {
            let is_data = slot < self.meta.data_shards();
            let size = if is_data {
                let n = remaining.min(shard_size);
                remaining -= n;
                n
            } else {
                shard_size
            };

            self.index += 1;
            let record = ShardMetadata {
                index: self.index,
                size: size as u32,
                hash32: compute_crc32c(shard).as_u32(),
            };
            let name = format!("shard-{}.dat", serde_json::to_string(&record)?);
            let payload = if is_data && self.meta.only_parity {
                &[][..]
            } else {
                &shard[..size]
            };
            self.add_member(&name, payload)?;
        }
        Ok(())
    }
}

/// Parses the mandatory first member of a parity archive.
pub fn read_header_member<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<FileMetadata> {
    let name = entry.path_bytes();
    if &name[..] != METADATA_MEMBER.as_bytes() {
        return Err(Error::InvalidMetadata(format!(
            "first archive member should be {METADATA_MEMBER}, got {:?}",
            String::from_utf8_lossy(&name)
        )));
    }
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;
    Ok(serde_json::from_slice(&raw)?)
}

fn record_from_name(name: &[u8]) -> Option<ShardMetadata> {
    let start = name.iter().position(|&b| b == b'{')?;
    let end = name.iter().rposition(|&b| b == b'}')?;
    serde_json::from_slice(&name[start..=end]).ok()
}

/// Shard source for the tar framing. Iterates the remaining archive
/// members in order; data shard bytes come from the data file when
/// `only_parity` is set.
pub struct TarShardSource<'a, R: 'a + Read, D> {
    entries: tar::Entries<'a, R>,
    data: D,
    meta: FileMetadata,
}

impl<'a, R: Read, D: Read + Seek> TarShardSource<'a, R, D> {
    pub fn new(entries: tar::Entries<'a, R>, data: D, meta: FileMetadata) -> Self {
        Self {
            entries,
            data,
            meta,
        }
    }
}

impl<'a, R: Read, D: Read + Seek> ShardSource for TarShardSource<'a, R, D> {
    fn next_shard(&mut self, view: &mut [u8], slot: usize) -> Result<ShardPull> {
        // Skip members whose names carry no shard record.
        let (meta, mut entry) = loop {
            let entry = match self.entries.next() {
                None => return Ok(ShardPull::Eof),
                Some(entry) => entry?,
            };
            let record = record_from_name(&entry.path_bytes());
            if let Some(meta) = record {
                break (meta, entry);
            }
        };
        if meta.size == 0 {
            return Ok(ShardPull::Filled(meta));
        }

        let size = meta.size as usize;
        let filled = if self.meta.only_parity && slot < self.meta.data_shards() {
            fill_view_from(&mut self.data, view, size)?
        } else {
            // Archive members cannot be seeked over; a short member just
            // becomes a hole and the iterator realigns on the next header.
            let mut n = 0;
            loop {
                match entry.read(&mut view[n..size]) {
                    Ok(0) => break,
                    Ok(read) => n += read,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
                if n == size {
                    break;
                }
            }
            view[size..].fill(0);
            n == size
        };
        if !filled {
            warn!("shard {}: short member, marking as missing", meta.index);
            return Ok(ShardPull::Hole(meta));
        }

        let got = compute_crc32c(view).as_u32();
        if got != meta.hash32 {
            warn!(
                "shard {}: crc mismatch (got {}, wanted {})",
                meta.index, got, meta.hash32
            );
            return Ok(ShardPull::Hole(meta));
        }
        Ok(ShardPull::Filled(meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::codec::Gf8Codec;
    use crate::decoder::StreamDecoder;
    use crate::encoder::StreamEncoder;
    use crate::metadata::ContainerVersion;

    fn meta(d: u8, p: u8, s: u32, only_parity: bool) -> FileMetadata {
        FileMetadata {
            version: ContainerVersion::Tar,
            data_shards: d,
            parity_shards: p,
            shard_size: s,
            file_name: "data.bin".into(),
            only_parity,
        }
    }

    fn create(data: &[u8], meta: &FileMetadata) -> Vec<u8> {
        let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards()).unwrap();
        let writer = TarWriter::new(Vec::new(), meta.clone()).unwrap();
        let mut enc = StreamEncoder::new(meta.shard_size(), codec, writer);
        enc.write(data).unwrap();
        enc.finish().unwrap().finish().unwrap()
    }

    fn restore(parity: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut archive = tar::Archive::new(Cursor::new(parity.to_vec()));
        let mut entries = archive.entries()?;
        let mut first = entries.next().expect("missing header member")?;
        let meta = read_header_member(&mut first)?;
        drop(first);
        let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards()).unwrap();
        let source = TarShardSource::new(entries, Cursor::new(data.to_vec()), meta.clone());
        let mut dec = StreamDecoder::new(meta.shard_size(), codec, source);
        let mut out = Vec::new();
        dec.run(&mut out)?;
        Ok(out)
    }

    #[test]
    fn round_trip_only_parity() {
        let data = b"hello world\n";
        let parity = create(data, &meta(3, 2, 8, true));
        assert_eq!(restore(&parity, data).unwrap(), data);
    }

    #[test]
    fn round_trip_embedded_data() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let parity = create(&data, &meta(5, 3, 64, false));
        assert_eq!(restore(&parity, b"").unwrap(), data);
    }

    #[test]
    fn archive_magic_at_offset_257() {
        let parity = create(b"abc", &meta(3, 2, 8, true));
        assert_eq!(&parity[257..262], b"ustar");
    }

    #[test]
    fn first_member_is_metadata_header() {
        let parity = create(b"abc", &meta(3, 2, 8, true));
        let mut archive = tar::Archive::new(Cursor::new(parity));
        let mut entries = archive.entries().unwrap();
        let mut first = entries.next().unwrap().unwrap();
        let parsed = read_header_member(&mut first).unwrap();
        assert_eq!(parsed.file_name, "data.bin");
    }

    #[test]
    fn shard_member_names_carry_records() {
        let parity = create(b"abcdefghij", &meta(2, 1, 4, true));
        let mut archive = tar::Archive::new(Cursor::new(parity));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .skip(1)
            .map(|e| String::from_utf8(e.unwrap().path_bytes().to_vec()).unwrap())
            .collect();
        assert_eq!(names.len(), 6); // two stripes of D+P=3
        for (i, name) in names.iter().enumerate() {
            let record = record_from_name(name.as_bytes()).unwrap();
            assert_eq!(record.index as usize, i + 1);
            assert!(name.starts_with("shard-{"));
            assert!(name.ends_with(".dat"));
        }
    }

    #[test]
    fn corrupted_data_byte_is_repaired() {
        let data = b"hello world\n";
        let parity = create(data, &meta(3, 2, 8, true));
        let mut corrupted = data.to_vec();
        corrupted[5] = 0;
        assert_eq!(restore(&parity, &corrupted).unwrap(), data);
    }
}
