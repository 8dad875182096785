//! Checkpoint wire format.
//!
//! `brotli( JSON(frontier) · NUL · JSON(mark prefix) )`, with each MoveSet's
//! SAN string stored as its own brotli-compressed byte array inside the
//! JSON. Loading rebuilds every board from its position key plus a fullmove
//! number derived from the first history's length.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use steno_core::MarkEntry;

use crate::board::Board;
use crate::error::SolveError;
use crate::frontier::{Frontier, MoveSet, Position};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveSetRepr {
    /// Brotli-compressed SAN move string.
    pub moves: Vec<u8>,
    pub captures: String,
    pub promotions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRepr {
    pub check_future: bool,
    pub move_sets: Vec<MoveSetRepr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRepr {
    pub marks: String,
    pub conditions: String,
}

/// A decoded checkpoint: the serialised frontier plus the consumed marks.
#[derive(Debug, Clone)]
pub struct CheckpointData {
    pub frontier: BTreeMap<String, PositionRepr>,
    pub prefix: Vec<EntryRepr>,
}

pub fn encode(frontier: &Frontier, prefix: &[MarkEntry]) -> Result<Vec<u8>, SolveError> {
    let mut positions = BTreeMap::new();
    for (key, position) in &frontier.map {
        let move_sets = position
            .move_sets
            .iter()
            .map(|ms| {
                Ok(MoveSetRepr {
                    moves: compress(ms.moves.as_bytes())?,
                    captures: ms.captures.clone(),
                    promotions: ms.promotions.clone(),
                })
            })
            .collect::<Result<Vec<_>, SolveError>>()?;
        positions.insert(
            key.clone(),
            PositionRepr {
                check_future: position.check_future,
                move_sets,
            },
        );
    }
    let entries: Vec<EntryRepr> = prefix
        .iter()
        .map(|entry| EntryRepr {
            marks: entry.marks.clone(),
            conditions: entry.conditions_src.clone(),
        })
        .collect();

    let frontier_json = serde_json::to_vec(&positions)
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;
    let prefix_json = serde_json::to_vec(&entries)
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;

    let mut blob = frontier_json;
    blob.push(0);
    blob.extend_from_slice(&prefix_json);
    compress(&blob)
}

pub fn decode(bytes: &[u8]) -> Result<CheckpointData, SolveError> {
    let blob = decompress(bytes)?;
    let nul = blob
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| SolveError::InvalidCheckpoint("missing separator".into()))?;
    let frontier: BTreeMap<String, PositionRepr> = serde_json::from_slice(&blob[..nul])
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;
    let prefix: Vec<EntryRepr> = serde_json::from_slice(&blob[nul + 1..])
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;
    Ok(CheckpointData { frontier, prefix })
}

/// Reconstructs a live frontier from its serialised form.
pub fn rebuild_frontier(
    positions: &BTreeMap<String, PositionRepr>,
    chess960: bool,
) -> Result<Frontier, SolveError> {
    let mut frontier = Frontier::default();
    for (key, repr) in positions {
        let move_sets = repr
            .move_sets
            .iter()
            .map(|ms| {
                Ok(MoveSet {
                    moves: String::from_utf8(decompress(&ms.moves)?)
                        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?,
                    captures: ms.captures.clone(),
                    promotions: ms.promotions.clone(),
                })
            })
            .collect::<Result<Vec<_>, SolveError>>()?;
        let ply = move_sets
            .first()
            .map(|ms| ms.san_count())
            .ok_or_else(|| SolveError::InvalidCheckpoint(format!("{key}: no histories")))?;
        let board = Board::from_key(key, ply, chess960)?;
        frontier.map.insert(
            key.clone(),
            Position {
                board,
                check_future: repr.check_future,
                move_sets,
            },
        );
    }
    Ok(frontier)
}

fn compress(data: &[u8]) -> Result<Vec<u8>, SolveError> {
    let mut out = Vec::new();
    let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
    writer
        .write_all(data)
        .and_then(|_| writer.flush())
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;
    drop(writer);
    Ok(out)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, SolveError> {
    let mut out = Vec::new();
    brotli::Decompressor::new(data, 4096)
        .read_to_end(&mut out)
        .map_err(|e| SolveError::InvalidCheckpoint(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartPosition;

    #[test]
    fn test_roundtrip() {
        let board = Board::from_start(&StartPosition::Standard).unwrap();
        let mut frontier = Frontier::start(board);
        let key = frontier.sorted_keys()[0].clone();
        frontier.map.get_mut(&key).unwrap().move_sets = vec![MoveSet {
            moves: "e4 e5 Nf3 Nc6".to_string(),
            captures: String::new(),
            promotions: String::new(),
        }];

        let mut entry = MarkEntry::new(0, "e".to_string());
        entry.conditions_src = "[=Q]".to_string();
        let blob = encode(&frontier, &[entry]).unwrap();

        let data = decode(&blob).unwrap();
        assert_eq!(data.prefix.len(), 1);
        assert_eq!(data.prefix[0].marks, "e");
        assert_eq!(data.prefix[0].conditions, "[=Q]");

        let rebuilt = rebuild_frontier(&data.frontier, false).unwrap();
        assert_eq!(rebuilt.len(), 1);
        let position = rebuilt.map.values().next().unwrap();
        assert_eq!(position.move_sets[0].moves, "e4 e5 Nf3 Nc6");
        assert_eq!(position.board.ply(), 4);
        assert_eq!(&position.board.key(), rebuilt.map.keys().next().unwrap());
    }

    #[test]
    fn test_corrupt_blob_is_rejected() {
        assert!(decode(b"definitely not brotli").is_err());
    }
}
