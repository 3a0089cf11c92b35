//! Restore-side orchestration: parity file plus (possibly damaged) data
//! file in, original bytes out.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use log::info;
use rustc_hash::FxHashMap;

use crate::codec::Gf8Codec;
use crate::container::detect_container;
use crate::decoder::StreamDecoder;
use crate::error::{Error, Result};
use crate::frame_json::JsonShardSource;
use crate::frame_tar::{read_header_member, TarShardSource};
use crate::metadata::{ContainerVersion, FileMetadata};
use crate::par2::exponents::{from_wire, ExponentSequence};
use crate::par2::source::Par2ShardSource;
use crate::par2::writer::parse_creator_geometry;
use crate::par2::{Gf16Codec, ParInfo};

/// Restores the original data into `out` from the parity file and the
/// data file. Returns the number of bytes written.
pub fn restore_par_file<W: Write>(out: &mut W, par_path: &Path, data_path: &Path) -> Result<u64> {
    let mut parity = File::open(par_path)?;
    let container = detect_container(&mut parity)?;
    let written = match container {
        ContainerVersion::Json => restore_json(out, parity, data_path)?,
        ContainerVersion::Tar => restore_tar(out, parity, data_path)?,
        ContainerVersion::Par2 => {
            drop(parity);
            restore_par2(out, par_path, data_path)?
        }
    };
    info!("Written {written} bytes.");
    Ok(written)
}

/// Decodes one JSON metadata record, surfacing an out-of-range version tag
/// as `UnknownVersion` rather than a generic parse error.
fn parse_file_metadata(line: &str) -> Result<FileMetadata> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if let Some(tag) = value.get("V").and_then(|v| v.as_u64()) {
        ContainerVersion::try_from(u8::try_from(tag).unwrap_or(u8::MAX))?;
    }
    Ok(serde_json::from_value(value)?)
}

fn restore_json<W: Write>(out: &mut W, parity: File, data_path: &Path) -> Result<u64> {
    let mut reader = BufReader::new(parity);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(Error::Truncation);
    }
    let meta = parse_file_metadata(line.trim())?.or_defaults();
    meta.validate()?;

    let data = File::open(data_path)?;
    let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards())?;
    let source = JsonShardSource::new(reader, data, meta.clone());
    StreamDecoder::new(meta.shard_size(), codec, source).run(out)
}

fn restore_tar<W: Write>(out: &mut W, parity: File, data_path: &Path) -> Result<u64> {
    let mut archive = tar::Archive::new(parity);
    let mut entries = archive.entries()?;
    let mut first = entries
        .next()
        .ok_or_else(|| Error::InvalidMetadata("empty parity archive".into()))??;
    let meta = read_header_member(&mut first)?.or_defaults();
    meta.validate()?;
    drop(first);

    let data = File::open(data_path)?;
    let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards())?;
    let source = TarShardSource::new(entries, data, meta.clone());
    StreamDecoder::new(meta.shard_size(), codec, source).run(out)
}

fn restore_par2<W: Write>(out: &mut W, par_path: &Path, data_path: &Path) -> Result<u64> {
    let info = ParInfo::parse(&[par_path.to_path_buf()])?;
    let main = info
        .main
        .as_ref()
        .ok_or_else(|| Error::InvalidMetadata(format!("empty par file: {}", par_path.display())))?;
    let (file_desc, ifsc) = info.primary_file().ok_or_else(|| {
        Error::InvalidMetadata("recovery set carries no complete file description".into())
    })?;

    let block_size = main.block_size;
    if block_size == 0 || block_size % 4 != 0 || block_size > u32::MAX as u64 {
        return Err(Error::InvalidMetadata(format!(
            "unusable block size {block_size}"
        )));
    }

    // Slot each surviving recovery slice at its sequence position so a
    // lost or damaged slice leaves a hole instead of shifting the rest.
    // Slices with an invalid wire exponent are unusable and dropped.
    let positioned: Vec<(u64, Vec<u8>)> = info
        .recovery_data
        .iter()
        .filter_map(|slice| {
            from_wire(slice.exponent).map(|e| (e, slice.recovery_data.clone()))
        })
        .collect();
    let max_e = positioned.iter().map(|(e, _)| *e).max().unwrap_or(0);
    let position_of: FxHashMap<u64, usize> = ExponentSequence::new()
        .take_while(|&e| e <= max_e)
        .enumerate()
        .map(|(k, e)| (e, k))
        .collect();
    let slots = position_of.len();
    let mut recovery: Vec<Option<Vec<u8>>> = vec![None; slots];
    for (e, bytes) in positioned {
        let k = position_of[&e];
        if recovery[k].is_none() {
            recovery[k] = Some(bytes);
        }
    }

    let (data_shards, parity_shards) = derive_geometry(&info, ifsc.pairs.len(), slots);
    let codec = Gf16Codec::new(data_shards, parity_shards)?;
    let data = File::open(data_path)?;
    let source = Par2ShardSource::new(
        data,
        ifsc.pairs.clone(),
        recovery,
        data_shards,
        parity_shards,
        file_desc.file_length,
    );
    StreamDecoder::new(block_size as usize, codec, source).run(out)
}

/// Stripe geometry for a parsed set: the creator tag when the file is our
/// own, a single-stripe reading for small foreign files, else the
/// historical defaults.
fn derive_geometry(info: &ParInfo, block_count: usize, slice_count: usize) -> (usize, usize) {
    if let Some((d, p)) = info
        .creator
        .as_ref()
        .and_then(|c| parse_creator_geometry(&c.text()))
    {
        return (d as usize, p as usize);
    }
    if block_count >= 1 && slice_count >= 1 && block_count + slice_count <= 256 {
        return (block_count, slice_count);
    }
    if block_count == 0 {
        return (1, 1);
    }
    (
        crate::metadata::DEFAULT_DATA_SHARDS as usize,
        crate::metadata::DEFAULT_PARITY_SHARDS as usize,
    )
}
