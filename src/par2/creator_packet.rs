use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::seal_header;
use crate::domain::{Md5Hash, RecoverySetId};

pub const TYPE_OF_PACKET: &[u8] = b"PAR 2.0\0Creator\0";

/// Creator packet: free-form ASCII identifying the writing client, padded
/// with nulls to a 4-byte multiple. This implementation also embeds the
/// stripe geometry here (`d=.. p=..`) so restore can regroup stripes.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct CreatorPacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(pad_after = 16)]
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    #[br(count = length.saturating_sub(64))]
    #[serde(serialize_with = "super::serialize_name")]
    pub creator_info: Vec<u8>,
}

impl CreatorPacket {
    pub fn new(creator: &str) -> Self {
        let mut info = creator.as_bytes().to_vec();
        let padded = (info.len() + 3) & !3;
        info.resize(padded, 0);
        Self {
            length: 0,
            md5: Md5Hash::zero(),
            set_id: RecoverySetId::zero(),
            creator_info: info,
        }
    }

    /// Creator text without the null padding.
    pub fn text(&self) -> String {
        let end = self
            .creator_info
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |p| p + 1);
        String::from_utf8_lossy(&self.creator_info[..end]).into_owned()
    }

    pub fn recalc(&mut self) {
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.creator_info);
        self.length = length;
        self.md5 = md5;
    }

    pub fn verify(&self) -> bool {
        if self.length < 64 {
            return false;
        }
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.creator_info);
        length == self.length && md5 == self.md5
    }
}

impl BinWrite for CreatorPacket {
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
        writer.write_all(&self.creator_info)?;
        Ok(())
    }
}
