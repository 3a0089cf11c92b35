//! JSON-lines framing.
//!
//! Layout: one `FileMetadata` JSON object on the first line, then for every
//! shard a `{"i":..,"s":..,"h":..}` record line followed by the shard's raw
//! bytes (parity always; data only when `only_parity` is off).

use std::io::{BufRead, Read, Seek, SeekFrom, Write};

use log::warn;

use crate::checksum::compute_crc32c;
use crate::error::Result;
use crate::metadata::{FileMetadata, ShardMetadata};
use crate::shard::{ShardPull, ShardSource, StripeSink};

/// Reads `size` payload bytes into `view` and zero-fills the padding. On a
/// short read the source is advanced past the rest of the shard slot and
/// the slot becomes a hole (`Ok(false)`).
pub(crate) fn fill_view_from<R: Read + Seek>(
    r: &mut R,
    view: &mut [u8],
    size: usize,
) -> Result<bool> {
    let mut n = 0;
    while n < size {
        match r.read(&mut view[n..size]) {
            Ok(0) => {
                r.seek(SeekFrom::Current((view.len() - n) as i64))?;
                return Ok(false);
            }
            Ok(read) => n += read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    view[size..].fill(0);
    Ok(true)
}

pub struct JsonWriter<W: Write> {
    w: W,
    meta: FileMetadata,
    index: u32,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(mut w: W, meta: FileMetadata) -> Result<Self> {
        serde_json::to_writer(&mut w, &meta)?;
        w.write_all(b"\n")?;
        Ok(Self { w, meta, index: 0 })
    }

    pub fn finish(mut self) -> Result<W> {
        self.w.flush()?;
        Ok(self.w)
    }
}

impl<W: Write> StripeSink for JsonWriter<W> {
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
            serde_json::to_writer(&mut self.w, &record)?;
            self.w.write_all(b"\n")?;
            if !is_data || !self.meta.only_parity {
                self.w.write_all(&shard[..size])?;
            }
        }
        Ok(())
    }
}

/// Shard source for the JSON framing. `parity` is positioned just past the
/// metadata header line; `data` is the original data file, consulted for
/// data shards when `only_parity` is set.
pub struct JsonShardSource<P, D> {
    parity: P,
    data: D,
    meta: FileMetadata,
}

impl<P: BufRead + Seek, D: Read + Seek> JsonShardSource<P, D> {
    pub fn new(parity: P, data: D, meta: FileMetadata) -> Self {
        Self { parity, data, meta }
    }

    fn next_record(&mut self) -> Result<Option<ShardMetadata>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.parity.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        Ok(Some(serde_json::from_str(line.trim())?))
    }
}

impl<P: BufRead + Seek, D: Read + Seek> ShardSource for JsonShardSource<P, D> {
    fn next_shard(&mut self, view: &mut [u8], slot: usize) -> Result<ShardPull> {
        let meta = match self.next_record()? {
            Some(meta) => meta,
            None => return Ok(ShardPull::Eof),
        };
        if meta.size == 0 {
            return Ok(ShardPull::Filled(meta));
        }

        let size = meta.size as usize;
        let from_data = self.meta.only_parity && slot < self.meta.data_shards();
        let filled = if from_data {
            fill_view_from(&mut self.data, view, size)?
        } else {
            fill_view_from(&mut self.parity, view, size)?
        };
        if !filled {
            warn!("shard {}: short read, marking as missing", meta.index);
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
