//! PAR 2.0 packet codec: header sealing, the packet tagged union, and the
//! resynchronizing stream parser.

use std::io::{Cursor, Read, Seek, SeekFrom};

use binrw::{BinRead, BinReaderExt, BinWrite};
use log::debug;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

pub mod builder;
pub mod creator_packet;
pub mod exponents;
pub mod file_desc_packet;
pub mod galois;
pub mod gf16;
pub mod ifsc_packet;
pub mod info;
pub mod main_packet;
pub mod matrix;
pub mod recovery_slice_packet;
pub mod source;
pub mod writer;

pub use creator_packet::CreatorPacket;
pub use file_desc_packet::FileDescPacket;
pub use gf16::Gf16Codec;
pub use ifsc_packet::{ChecksumPair, IfscPacket};
pub use info::{FileBundle, ParInfo};
pub use main_packet::MainPacket;
pub use recovery_slice_packet::RecoverySlicePacket;
pub use writer::Par2Writer;

use crate::checksum::compute_md5_bytes;
use crate::domain::{Md5Hash, RecoverySetId};

pub const MAGIC_BYTES: &[u8] = b"PAR2\0PKT";
pub const HEADER_LEN: u64 = 64;

/// Upper bound accepted for a single packet; anything larger is treated as
/// a corrupted length field during resynchronization.
const MAX_PACKET_LEN: u64 = 100 * 1024 * 1024;

/// Computes the header fields sealed over a finished body: total packet
/// length and the packet MD5 over `set_id || type || body`.
pub(crate) fn seal_header(
    set_id: &RecoverySetId,
    type_tag: &[u8],
    body: &[u8],
) -> (u64, Md5Hash) {
    let mut data = Vec::with_capacity(32 + body.len());
    data.extend_from_slice(set_id.as_bytes());
    data.extend_from_slice(type_tag);
    data.extend_from_slice(body);
    (HEADER_LEN + body.len() as u64, Md5Hash::new(compute_md5_bytes(&data)))
}

/// Renders null-terminated ASCII byte fields as text in dump output.
pub(crate) fn serialize_name<S: Serializer>(
    name: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let end = name.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    serializer.serialize_str(&String::from_utf8_lossy(&name[..end]))
}

/// A packet of unrecognized type. Round-trips opaquely and is ignored by
/// higher layers.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct UnknownPacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    #[serde(skip)]
    pub type_tag: [u8; 16],
    #[br(count = length.saturating_sub(64))]
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl BinWrite for UnknownPacket {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&self.length.to_le_bytes())?;
        writer.write_all(self.md5.as_bytes())?;
        writer.write_all(self.set_id.as_bytes())?;
        writer.write_all(&self.type_tag)?;
        writer.write_all(&self.body)?;
        Ok(())
    }
}

/// Tagged union over the known packet types.
#[derive(Debug, Clone)]
pub enum Packet {
    Main(MainPacket),
    FileDesc(FileDescPacket),
    Ifsc(IfscPacket),
    RecoverySlice(RecoverySlicePacket),
    Creator(CreatorPacket),
    Unknown(UnknownPacket),
}

impl Packet {
    pub fn packet_md5(&self) -> Md5Hash {
        match self {
            Packet::Main(p) => p.md5,
            Packet::FileDesc(p) => p.md5,
            Packet::Ifsc(p) => p.md5,
            Packet::RecoverySlice(p) => p.md5,
            Packet::Creator(p) => p.md5,
            Packet::Unknown(p) => p.md5,
        }
    }

    pub fn set_id(&self) -> RecoverySetId {
        match self {
            Packet::Main(p) => p.set_id,
            Packet::FileDesc(p) => p.set_id,
            Packet::Ifsc(p) => p.set_id,
            Packet::RecoverySlice(p) => p.set_id,
            Packet::Creator(p) => p.set_id,
            Packet::Unknown(p) => p.set_id,
        }
    }

    pub fn verify(&self) -> bool {
        match self {
            Packet::Main(p) => p.verify(),
            Packet::FileDesc(p) => p.verify(),
            Packet::Ifsc(p) => p.verify(),
            Packet::RecoverySlice(p) => p.verify(),
            Packet::Creator(p) => p.verify(),
            // Verified generically against the header MD5 during parsing.
            Packet::Unknown(_) => true,
        }
    }

    fn from_bytes(packet: &[u8], type_tag: &[u8; 16]) -> Option<Self> {
        let mut cursor = Cursor::new(packet);
        match &type_tag[..] {
            t if t == main_packet::TYPE_OF_PACKET => {
                cursor.read_le::<MainPacket>().ok().map(Packet::Main)
            }
            t if t == file_desc_packet::TYPE_OF_PACKET => {
                cursor.read_le::<FileDescPacket>().ok().map(Packet::FileDesc)
            }
            t if t == ifsc_packet::TYPE_OF_PACKET => {
                cursor.read_le::<IfscPacket>().ok().map(Packet::Ifsc)
            }
            t if t == recovery_slice_packet::TYPE_OF_PACKET => cursor
                .read_le::<RecoverySlicePacket>()
                .ok()
                .map(Packet::RecoverySlice),
            t if t == creator_packet::TYPE_OF_PACKET => {
                cursor.read_le::<CreatorPacket>().ok().map(Packet::Creator)
            }
            _ => cursor.read_le::<UnknownPacket>().ok().map(Packet::Unknown),
        }
    }
}

/// Parses every intact packet from one PAR 2.0 stream, deduplicating
/// against `seen` (keyed by the header packet MD5).
///
/// The scan resynchronizes on the 8-byte magic: a non-match seeks back
/// seven bytes and retries, so leading garbage and damaged regions are
/// skipped. Damaged packets (body MD5 mismatch, unaligned body) are
/// dropped. A truncated trailing packet ends the scan without error.
pub fn read_packets_into<R: Read + Seek>(
    reader: &mut R,
    seen: &mut FxHashSet<[u8; 16]>,
    packets: &mut Vec<Packet>,
) -> crate::error::Result<()> {
    loop {
        let mut magic = [0u8; 8];
        if reader.read_exact(&mut magic).is_err() {
            return Ok(());
        }
        if &magic[..] != MAGIC_BYTES {
            if reader.seek(SeekFrom::Current(-7)).is_err() {
                return Ok(());
            }
            continue;
        }

        let mut rest = [0u8; 56];
        if reader.read_exact(&mut rest).is_err() {
            return Ok(());
        }
        let length = u64::from_le_bytes(rest[0..8].try_into().unwrap());
        let md5: [u8; 16] = rest[8..24].try_into().unwrap();
        let set_id: [u8; 16] = rest[24..40].try_into().unwrap();
        let type_tag: [u8; 16] = rest[40..56].try_into().unwrap();

        if length < HEADER_LEN || length % 4 != 0 || length > MAX_PACKET_LEN {
            // Bogus length field: resume scanning right after this magic.
            reader.seek(SeekFrom::Current(-63))?;
            continue;
        }

        let body_len = (length - HEADER_LEN) as usize;
        let mut packet = vec![0u8; HEADER_LEN as usize + body_len];
        packet[..8].copy_from_slice(&magic);
        packet[8..64].copy_from_slice(&rest);
        if reader.read_exact(&mut packet[64..]).is_err() {
            return Ok(());
        }

        let mut hashed = Vec::with_capacity(32 + body_len);
        hashed.extend_from_slice(&set_id);
        hashed.extend_from_slice(&type_tag);
        hashed.extend_from_slice(&packet[64..]);
        if compute_md5_bytes(&hashed) != md5 {
            debug!("dropping damaged packet ({})", String::from_utf8_lossy(&type_tag));
            continue;
        }
        if !seen.insert(md5) {
            continue;
        }

        if let Some(parsed) = Packet::from_bytes(&packet, &type_tag) {
            packets.push(parsed);
        }
    }
}

/// Convenience wrapper for a single stream.
pub fn parse_packets<R: Read + Seek>(reader: &mut R) -> crate::error::Result<Vec<Packet>> {
    let mut seen = FxHashSet::default();
    let mut packets = Vec::new();
    read_packets_into(reader, &mut seen, &mut packets)?;
    Ok(packets)
}
