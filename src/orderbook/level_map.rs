//! Price -> aggregate size mapping for one side of the book

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::PriceLevel;

/// Ordered map of price to aggregate size.
///
/// Every stored size is strictly positive. A zero size removes the level; a
/// negative size can only come from a reconciliation bug and panics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevelMap {
    levels: BTreeMap<Decimal, Decimal>,
}

impl PriceLevelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute size at `price`, removing the level when `size` is zero.
    ///
    /// Returns the previous size, if any.
    ///
    /// # Panics
    ///
    /// Panics if `size` is negative.
    pub fn set(&mut self, price: Decimal, size: Decimal) -> Option<Decimal> {
        if size.is_zero() {
            return self.levels.remove(&price);
        }
        assert!(
            size > Decimal::ZERO,
            "negative size {size} at price {price} reached the level map"
        );
        self.levels.insert(price, size)
    }

    pub fn get(&self, price: &Decimal) -> Option<Decimal> {
        self.levels.get(price).copied()
    }

    pub fn contains(&self, price: &Decimal) -> bool {
        self.levels.contains_key(price)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Highest price level
    pub fn highest(&self) -> Option<PriceLevel> {
        self.levels
            .last_key_value()
            .map(|(p, s)| PriceLevel::new(*p, *s))
    }

    /// Lowest price level
    pub fn lowest(&self) -> Option<PriceLevel> {
        self.levels
            .first_key_value()
            .map(|(p, s)| PriceLevel::new(*p, *s))
    }

    /// Levels from highest to lowest price
    pub fn iter_desc(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.levels
            .iter()
            .rev()
            .map(|(p, s)| PriceLevel::new(*p, *s))
    }

    /// Levels from lowest to highest price
    pub fn iter_asc(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.levels.iter().map(|(p, s)| PriceLevel::new(*p, *s))
    }

    /// Check the positive-size invariant over the whole map
    pub fn is_consistent(&self) -> bool {
        self.levels.values().all(|size| *size > Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_set_overwrites() {
        let mut map = PriceLevelMap::new();
        assert_eq!(map.set(dec!(100), dec!(5)), None);
        assert_eq!(map.set(dec!(100), dec!(3)), Some(dec!(5)));
        assert_eq!(map.get(&dec!(100)), Some(dec!(3)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_zero_removes() {
        let mut map = PriceLevelMap::new();
        map.set(dec!(100), dec!(5));
        assert_eq!(map.set(dec!(100), dec!(0)), Some(dec!(5)));
        assert!(!map.contains(&dec!(100)));
        assert_eq!(map.set(dec!(100), dec!(0.000)), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_equal_prices_with_different_scale_share_a_level() {
        let mut map = PriceLevelMap::new();
        map.set(dec!(100.50), dec!(1));
        map.set(dec!(100.5), dec!(2));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&dec!(100.500)), Some(dec!(2)));
    }

    #[test]
    fn test_ordering() {
        let mut map = PriceLevelMap::new();
        map.set(dec!(101), dec!(3));
        map.set(dec!(100), dec!(1));
        map.set(dec!(102), dec!(2));

        assert_eq!(map.highest(), Some(PriceLevel::new(dec!(102), dec!(2))));
        assert_eq!(map.lowest(), Some(PriceLevel::new(dec!(100), dec!(1))));

        let desc: Vec<Decimal> = map.iter_desc().map(|l| l.price).collect();
        assert_eq!(desc, vec![dec!(102), dec!(101), dec!(100)]);
        let asc: Vec<Decimal> = map.iter_asc().map(|l| l.price).collect();
        assert_eq!(asc, vec![dec!(100), dec!(101), dec!(102)]);
        assert!(map.is_consistent());
    }

    #[test]
    #[should_panic(expected = "negative size")]
    fn test_negative_size_panics() {
        let mut map = PriceLevelMap::new();
        map.set(dec!(100), dec!(-1));
    }
}
