//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference slots in the World.
//! The generation counter prevents use-after-free bugs.

use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the world's entity arena
/// - Generation: Incremented when the slot is reclaimed at end of tick
///
/// Example:
/// ```ignore
/// let entity = world.create_entity();
/// world.destroy_entity(entity);
/// world.flush_destroyed();
/// // entity handle is now invalid (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for event payloads and save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Growable bitset indexed by entity slot.
#[derive(Debug, Default, Clone)]
pub(crate) struct SlotBits {
    words: Vec<u64>,
}

impl SlotBits {
    pub fn set(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << bit;
    }

    pub fn clear(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1 << bit);
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        let (word, bit) = Self::locate(index);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn reset(&mut self) {
        self.words.clear();
    }

    #[inline]
    fn locate(index: u32) -> (usize, u32) {
        ((index / 64) as usize, index % 64)
    }
}
