use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::seal_header;
use crate::checksum::compute_file_id;
use crate::domain::{FileId, Md5Hash, RecoverySetId};

pub const TYPE_OF_PACKET: &[u8] = b"PAR 2.0\0FileDesc";

/// File description packet. The on-wire name is null-padded to a 4-byte
/// multiple; the padding is stripped on read and excluded from the file-id
/// hash, matching the reference implementation.
#[derive(Debug, Clone, BinRead, Serialize)]
#[br(magic = b"PAR2\0PKT")]
#[serde(rename_all = "PascalCase")]
pub struct FileDescPacket {
    pub length: u64,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub md5: Md5Hash,
    #[br(pad_after = 16)]
    #[br(map = |x: [u8; 16]| RecoverySetId::new(x))]
    pub set_id: RecoverySetId,
    #[br(map = |x: [u8; 16]| FileId::new(x))]
    pub file_id: FileId,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub file_md5: Md5Hash,
    #[br(map = |x: [u8; 16]| Md5Hash::new(x))]
    pub mini_md5: Md5Hash,
    pub file_length: u64,
    #[br(count = length.saturating_sub(120))]
    #[br(map = |v: Vec<u8>| {
        let end = v.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        v[..end].to_vec()
    })]
    #[serde(serialize_with = "super::serialize_name")]
    pub file_name: Vec<u8>,
}

impl FileDescPacket {
    pub fn new(file_name: &str) -> Self {
        Self {
            length: 0,
            md5: Md5Hash::zero(),
            set_id: RecoverySetId::zero(),
            file_id: FileId::new([0; 16]),
            file_md5: Md5Hash::zero(),
            mini_md5: Md5Hash::zero(),
            file_length: 0,
            file_name: file_name.as_bytes().to_vec(),
        }
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.file_name).into_owned()
    }

    /// Name field length on the wire, padded to a 4-byte multiple. For a
    /// parsed packet the stored total length is authoritative so foreign
    /// padding survives verification.
    fn name_field_len(&self) -> usize {
        if self.length >= 120 {
            (self.length - 120) as usize
        } else {
            (self.file_name.len() + 3) & !3
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        let name_len = self.name_field_len();
        let mut body = Vec::with_capacity(56 + name_len);
        body.extend_from_slice(self.file_id.as_bytes());
        body.extend_from_slice(self.file_md5.as_bytes());
        body.extend_from_slice(self.mini_md5.as_bytes());
        body.extend_from_slice(&self.file_length.to_le_bytes());
        body.extend_from_slice(&self.file_name);
        body.resize(56 + name_len, 0);
        body
    }

    /// Derives the file id from the mini hash, length and unpadded name.
    pub fn recalc_file_id(&mut self) {
        self.file_id = compute_file_id(&self.mini_md5, self.file_length, &self.file_name);
    }

    pub fn recalc(&mut self) {
        self.length = 0; // canonical padding for a freshly built packet
        let body = self.body_bytes();
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &body);
        self.length = length;
        self.md5 = md5;
    }

    pub fn verify(&self) -> bool {
        if self.length < 120 {
            return false;
        }
        if self.file_id != compute_file_id(&self.mini_md5, self.file_length, &self.file_name) {
            return false;
        }
        let (length, md5) = seal_header(&self.set_id, TYPE_OF_PACKET, &self.body_bytes());
        length == self.length && md5 == self.md5
    }
}

impl BinWrite for FileDescPacket {
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
