//! In-memory reification of a parsed PAR 2.0 set.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::domain::FileId;
use crate::error::Result;

use super::creator_packet::CreatorPacket;
use super::file_desc_packet::FileDescPacket;
use super::ifsc_packet::IfscPacket;
use super::main_packet::MainPacket;
use super::recovery_slice_packet::RecoverySlicePacket;
use super::{read_packets_into, Packet};

/// FileDesc and IFSC packets joined by file id.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileBundle {
    pub file_desc: Option<FileDescPacket>,
    pub ifsc: Option<IfscPacket>,
}

/// One parsed recovery set accumulated from one or more PAR 2.0 files.
/// Each packet is admitted once (dedup by header MD5); damaged packets are
/// dropped during parsing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParInfo {
    pub main: Option<MainPacket>,
    pub creator: Option<CreatorPacket>,
    pub files: Vec<FileBundle>,
    pub recovery_data: Vec<RecoverySlicePacket>,
    pub par_files: Vec<PathBuf>,
    pub block_count: u32,
    pub total_size: u64,
    pub base_dir: PathBuf,
}

impl ParInfo {
    /// Parses the given PAR 2.0 files serially into one set.
    pub fn parse(par_files: &[PathBuf]) -> Result<Self> {
        let mut seen = FxHashSet::default();
        let mut packets = Vec::new();
        for path in par_files {
            let mut reader = BufReader::new(File::open(path)?);
            read_packets_into(&mut reader, &mut seen, &mut packets)?;
        }
        Ok(Self::from_packets(packets, par_files))
    }

    fn from_packets(packets: Vec<Packet>, par_files: &[PathBuf]) -> Self {
        let base_dir = par_files
            .first()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut info = ParInfo {
            main: None,
            creator: None,
            files: Vec::new(),
            recovery_data: Vec::new(),
            par_files: par_files.to_vec(),
            block_count: 0,
            total_size: 0,
            base_dir,
        };

        let mut bundles: FxHashMap<FileId, FileBundle> = FxHashMap::default();
        let mut order: Vec<FileId> = Vec::new();
        for packet in packets {
            match packet {
                Packet::Main(p) => info.main = Some(p),
                Packet::Creator(p) => info.creator = Some(p),
                Packet::RecoverySlice(p) => info.recovery_data.push(p),
                Packet::FileDesc(p) => {
                    info.total_size += p.file_length;
                    let bundle = bundles.entry(p.file_id).or_insert_with(|| {
                        order.push(p.file_id);
                        FileBundle::default()
                    });
                    bundle.file_desc = Some(p);
                }
                Packet::Ifsc(p) => {
                    info.block_count += p.pairs.len() as u32;
                    let bundle = bundles.entry(p.file_id).or_insert_with(|| {
                        order.push(p.file_id);
                        FileBundle::default()
                    });
                    bundle.ifsc = Some(p);
                }
                Packet::Unknown(_) => {}
            }
        }
        for id in order {
            if let Some(bundle) = bundles.remove(&id) {
                info.files.push(bundle);
            }
        }
        info
    }

    /// The single file of this recovery set, when both of its packets
    /// survived.
    pub fn primary_file(&self) -> Option<(&FileDescPacket, &IfscPacket)> {
        let bundle = self.files.first()?;
        Some((bundle.file_desc.as_ref()?, bundle.ifsc.as_ref()?))
    }
}
