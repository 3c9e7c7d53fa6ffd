//! One side of the book with snapshot and delta semantics

use super::{PriceLevel, PriceLevelMap, Side};

/// Bid or ask levels owned by an [`OrderBook`](super::OrderBook)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSide {
    side: Side,
    levels: PriceLevelMap,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: PriceLevelMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn levels(&self) -> &PriceLevelMap {
        &self.levels
    }

    /// Replace every level with the snapshot's levels.
    ///
    /// Zero-size entries mean "no level" and are skipped.
    pub fn replace_all(&mut self, levels: &[PriceLevel]) {
        self.levels.clear();
        for level in levels {
            self.levels.set(level.price, level.size);
        }
    }

    /// Merge a delta. Each size is the new absolute size at that price; zero
    /// removes the level. Prices not mentioned are left untouched.
    pub fn apply_delta(&mut self, levels: &[PriceLevel]) {
        for level in levels {
            self.levels.set(level.price, level.size);
        }
        debug_assert!(self.levels.is_consistent());
    }

    /// Best level: highest bid or lowest ask
    pub fn best(&self) -> Option<PriceLevel> {
        match self.side {
            Side::Bid => self.levels.highest(),
            Side::Ask => self.levels.lowest(),
        }
    }

    /// Up to `n` levels, best first
    pub fn best_n(&self, n: usize) -> Vec<PriceLevel> {
        match self.side {
            Side::Bid => self.levels.iter_desc().take(n).collect(),
            Side::Ask => self.levels.iter_asc().take(n).collect(),
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
