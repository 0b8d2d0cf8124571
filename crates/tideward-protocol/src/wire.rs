use rmp_serde::{decode, encode};
use thiserror::Error;

use crate::{Command, Event, ReplayFile, Snapshot};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn serialize_command(cmd: &Command) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(cmd)?)
}

pub fn deserialize_command(bytes: &[u8]) -> Result<Command, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_events(events: &[Event]) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(events)?)
}

pub fn deserialize_events(bytes: &[u8]) -> Result<Vec<Event>, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(snapshot)?)
}

pub fn deserialize_snapshot(bytes: &[u8]) -> Result<Snapshot, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_replay(replay: &ReplayFile) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(replay)?)
}

pub fn deserialize_replay(bytes: &[u8]) -> Result<ReplayFile, WireError> {
    Ok(decode::from_slice(bytes)?)
}

/// Human-readable snapshot for debugging and external tooling.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn replay_to_json(replay: &ReplayFile) -> Result<String, WireError> {
    Ok(serde_json::to_string_pretty(replay)?)
}

/// Deterministic snapshot hash for desync detection and replay verification.
///
/// Hashes the MessagePack-serialized snapshot using FNV-1a 64-bit.
pub fn snapshot_hash(snapshot: &Snapshot) -> Result<u64, WireError> {
    let bytes = serialize_snapshot(snapshot)?;
    Ok(hash_bytes_fnv1a64(&bytes))
}

/// Deterministic, stable 64-bit hash for raw bytes (FNV-1a).
pub fn hash_bytes_fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Location, MapSnapshot, PlayerId, PlayerSnapshot, ShipSnapshot};

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            turn: 5,
            map: MapSnapshot {
                width: 2,
                height: 2,
                cells: vec![10, 20, 30, 40],
            },
            players: vec![PlayerSnapshot {
                id: PlayerId(0),
                name: "one".to_string(),
                energy: 500,
                shipyard: Location::new(0, 0),
                alive: true,
                total_production: 120,
                last_turn_alive: 5,
                offenses: 0,
                rank: None,
            }],
            ships: vec![ShipSnapshot {
                id: crate::EntityId::new(0, 0),
                owner: PlayerId(0),
                pos: Location::new(1, 1),
                cargo: 40,
                inspired: false,
            }],
            depots: Vec::new(),
            ship_slots: vec![0],
            depot_slots: Vec::new(),
        }
    }

    #[test]
    fn snapshot_survives_messagepack() {
        let snapshot = sample_snapshot();
        let bytes = serialize_snapshot(&snapshot).unwrap();
        let back = deserialize_snapshot(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn equal_snapshots_hash_equal() {
        let a = sample_snapshot();
        let b = sample_snapshot();
        assert_eq!(snapshot_hash(&a).unwrap(), snapshot_hash(&b).unwrap());

        let mut c = sample_snapshot();
        c.map.cells[0] = 11;
        assert_ne!(snapshot_hash(&a).unwrap(), snapshot_hash(&c).unwrap());
    }

    #[test]
    fn snapshot_json_is_parseable() {
        let json = snapshot_to_json(&sample_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["turn"], 5);
    }
}
