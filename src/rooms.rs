//! # Room Kinds
//!
//! The engine is generic over the caller's room-type vocabulary. Any cheap,
//! ordered, hashable type works; [`RoomType`] is the built-in vocabulary used
//! by the CLI, the presets, and most tests.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Marker trait for room-type vocabularies.
///
/// `Ord` is required so every map keyed by room type iterates in a stable
/// order regardless of hasher state; determinism of the whole pipeline
/// depends on it.
pub trait RoomKind: Clone + Eq + Hash + Ord + Debug {}

impl<T: Clone + Eq + Hash + Ord + Debug> RoomKind for T {}

/// Built-in room-type vocabulary.
///
/// Callers with their own domain enum can use it directly; everything in the
/// engine only needs [`RoomKind`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RoomType {
    /// Player entry room, pinned to the start node.
    Spawn,
    /// Boss encounter room, one per floor.
    Boss,
    /// Standard combat encounter.
    Combat,
    /// Room containing treasure or valuable items.
    Treasure,
    /// Shop or merchant room.
    Shop,
    /// Puzzle or challenge room.
    Puzzle,
    /// Safe rest area.
    Sanctuary,
    /// Library or information room.
    Library,
    /// Hidden room reached through secret passages.
    Secret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_type_ordering_is_stable() {
        let mut types = vec![RoomType::Shop, RoomType::Spawn, RoomType::Boss];
        types.sort();
        assert_eq!(types, vec![RoomType::Spawn, RoomType::Boss, RoomType::Shop]);
    }

    fn assert_room_kind<T: RoomKind>() {}

    #[test]
    fn test_custom_vocabularies_are_room_kinds() {
        assert_room_kind::<RoomType>();
        assert_room_kind::<String>();
        assert_room_kind::<u8>();
    }
}
