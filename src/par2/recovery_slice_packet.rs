use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::seal_header;
use crate::domain::{Md5Hash, RecoverySetId};

pub const TYPE_OF_PACKET: &[u8] = b"PAR 2.0\0RecvSlic";

/// Recovery slice packet: one parity shard under its exponent. The wire
/// exponent field holds 2^e in GF(2^16) for the slice's sequence exponent.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct RecoverySlicePacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(pad_after = 16)]
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    pub exponent: u32,
    #[br(count = length.saturating_sub(68))]
    #[serde(skip)]
    pub recovery_data: Vec<u8>,
}

impl RecoverySlicePacket {
    pub fn new(set_id: RecoverySetId, exponent: u32, recovery_data: Vec<u8>) -> Self {
        let mut packet = Self {
            length: 0,
            md5: Md5Hash::zero(),
            set_id,
            exponent,
            recovery_data,
        };
        packet.recalc();
        packet
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(4 + self.recovery_data.len());
        body.extend_from_slice(&self.exponent.to_le_bytes());
        body.extend_from_slice(&self.recovery_data);
        body
    }

    pub fn recalc(&mut self) {
        let body = self.body_bytes();
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &body);
        self.length = length;
        self.md5 = md5;
    }

    pub fn verify(&self) -> bool {
        if self.length < 68 {
            return false;
        }
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.body_bytes());
        length == self.length && md5 == self.md5
    }
}

impl BinWrite for RecoverySlicePacket {
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
        writer.write_all(&self.exponent.to_le_bytes())?;
        writer.write_all(&self.recovery_data)?;
        Ok(())
    }
}
