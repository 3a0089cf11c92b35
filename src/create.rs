//! Create-side orchestration: data file in, parity file out.

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

use log::info;

use crate::codec::{Gf8Codec, StripeCodec};
use crate::encoder::StreamEncoder;
use crate::error::{Error, Result};
use crate::frame_json::JsonWriter;
use crate::frame_tar::TarWriter;
use crate::metadata::{round_shard_size, ContainerVersion, FileMetadata};
use crate::par2::{Gf16Codec, Par2Writer};
use crate::shard::StripeSink;

/// Creates the parity file `out` for the data file `inp` with the given
/// geometry. Shard sizes are rounded up to a 4-byte multiple; data-shard
/// bytes are not stored in the parity file.
pub fn create_par_file(
    container: ContainerVersion,
    out: &Path,
    inp: &Path,
    data_shards: u8,
    parity_shards: u8,
    shard_size: u32,
) -> Result<()> {
    if out == inp {
        return Err(Error::InvalidMetadata(
            "parity output must differ from the data file".into(),
        ));
    }
    info!("Create {:?} for {:?}.", out, inp);

    let file_name = inp
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| inp.to_string_lossy().into_owned());
    let meta = FileMetadata {
        version: container,
        data_shards,
        parity_shards,
        shard_size: round_shard_size(shard_size),
        file_name,
        only_parity: true,
    }
    .or_defaults();
    meta.validate()?;

    let mut input = File::open(inp)?;
    let output = BufWriter::new(File::create(out)?);

    match container {
        ContainerVersion::Json => {
            let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards())?;
            let writer = JsonWriter::new(output, meta.clone())?;
            pump(&meta, codec, writer, &mut input)?.finish()?;
        }
        ContainerVersion::Tar => {
            let codec = Gf8Codec::new(meta.data_shards(), meta.parity_shards())?;
            let writer = TarWriter::new(output, meta.clone())?;
            pump(&meta, codec, writer, &mut input)?.finish()?;
        }
        ContainerVersion::Par2 => {
            let codec = Gf16Codec::new(meta.data_shards(), meta.parity_shards())?;
            // The writer pre-scans the input for the recovery-set hashes;
            // the encoder then streams the same file from the start.
            let writer = Par2Writer::new(output, meta.clone(), &mut input)?;
            let mut input = File::open(inp)?;
            pump(&meta, codec, writer, &mut input)?.finish()?;
        }
    }
    Ok(())
}

/// Streams `input` through an encoder into `sink`, returning the sink.
fn pump<C: StripeCodec, S: StripeSink>(
    meta: &FileMetadata,
    codec: C,
    sink: S,
    input: &mut File,
) -> Result<S> {
    let mut encoder = StreamEncoder::new(meta.shard_size(), codec, sink);
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                encoder.write(&buf[..n])?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    encoder.finish()
}
