use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::seal_header;
use crate::domain::{FileId, Md5Hash, RecoverySetId};

pub const TYPE_OF_PACKET: &[u8] = b"PAR 2.0\0Main\0\0\0\0";

/// Main packet: block size plus the file ids of the recovery set. Its body
/// MD5 doubles as the recovery-set id binding every packet of the set.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct MainPacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(pad_after = 16)]
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    pub block_size: u64,
    pub recovery_set_count: u32,
    #[br(count = recovery_set_count)]
    #[br(map = |v: Vec<[u8; 16]>| v.into_iter().map(FileId::new).collect())]
    pub recovery_set_file_ids: Vec<FileId>,
    #[br(count = (length.saturating_sub(76) / 16).saturating_sub(recovery_set_count as u64))]
    #[br(map = |v: Vec<[u8; 16]>| v.into_iter().map(FileId::new).collect())]
    pub non_recovery_file_ids: Vec<FileId>,
}

impl MainPacket {
    pub fn new(block_size: u64) -> Self {
        Self {
            length: 0,
            md5: Md5Hash::zero(),
            set_id: RecoverySetId::zero(),
            block_size,
            recovery_set_count: 0,
            recovery_set_file_ids: Vec::new(),
            non_recovery_file_ids: Vec::new(),
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(
            12 + 16 * (self.recovery_set_file_ids.len() + self.non_recovery_file_ids.len()),
        );
        body.extend_from_slice(&self.block_size.to_le_bytes());
        body.extend_from_slice(&(self.recovery_set_file_ids.len() as u32).to_le_bytes());
        for id in &self.recovery_set_file_ids {
            body.extend_from_slice(id.as_bytes());
        }
        for id in &self.non_recovery_file_ids {
            body.extend_from_slice(id.as_bytes());
        }
        body
    }

    /// The recovery-set id is the MD5 of this packet's body.
    pub fn derive_set_id(&self) -> RecoverySetId {
        RecoverySetId::new(crate::checksum::compute_md5_bytes(&self.body_bytes()))
    }

    /// Recomputes length and packet MD5 from the current body and set id.
    pub fn recalc(&mut self) {
        self.recovery_set_count = self.recovery_set_file_ids.len() as u32;
        let body = self.body_bytes();
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &body);
        self.length = length;
        self.md5 = md5;
    }

    pub fn verify(&self) -> bool {
        if self.length < 76 {
            return false;
        }
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.body_bytes());
        length == self.length && md5 == self.md5
    }
}

impl BinWrite for MainPacket {
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
