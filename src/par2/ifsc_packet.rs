use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::seal_header;
use crate::domain::{Crc32Value, FileId, Md5Hash, RecoverySetId};

pub const TYPE_OF_PACKET: &[u8] = b"PAR 2.0\0IFSC\0\0\0\0";

/// One verification pair per input block: MD5 and CRC-32 of the block
/// zero-padded to the recovery-set block size. The CRC travels
/// little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChecksumPair {
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(map = Crc32Value::new)]
    pub crc32: Crc32Value,
}

/// Input file slice checksums packet.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct IfscPacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(pad_after = 16)]
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    #[br(map = |x: [u8; 16]| FileId::new(x))]
    pub file_id: FileId,
    #[br(count = length.saturating_sub(80) / 20)]
    pub pairs: Vec<ChecksumPair>,
}

impl IfscPacket {
    pub fn new(file_id: FileId) -> Self {
        Self {
            length: 0,
            md5: Md5Hash::zero(),
            set_id: RecoverySetId::zero(),
            file_id,
            pairs: Vec::new(),
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(16 + 20 * self.pairs.len());
        body.extend_from_slice(self.file_id.as_bytes());
        for pair in &self.pairs {
            body.extend_from_slice(pair.md5.as_bytes());
            body.extend_from_slice(&pair.crc32.to_le_bytes());
        }
        body
    }

    pub fn recalc(&mut self) {
        let body = self.body_bytes();
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &body);
        self.length = length;
        self.md5 = md5;
    }

    pub fn verify(&self) -> bool {
        if self.length < 80 {
            return false;
        }
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.body_bytes());
        length == self.length && md5 == self.md5
    }
}

impl BinWrite for IfscPacket {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        writer.write_all(super::MAGIC_BYTES)?;
        writer.write_all(&self.length.to_le_bytes())?;
        writer.write_all(self.md5.as_bytes())?;
        writer.write_all(self.set_id.as_bytes())?;
        writer.write_all(TYPE_OF_PACKET)?;
        writer.write_all(&self.body_bytes())?;
        Ok(())
    }
}
