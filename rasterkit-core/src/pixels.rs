//! # Pixel change sets
//!
//! A batch of pixel writes produced by a tool, consumed once by [`Layer::set_pixels`](crate::state::layer::Layer::set_pixels).

use crate::{
    color::Color,
    coords::{self, Coordinates, Rect},
};

/// Sparse map of document coordinates to the color they should become.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelChangeSet {
    changes: hashbrown::HashMap<Coordinates, Color>,
    built_as_single_color: bool,
}
impl PixelChangeSet {
    /// Every coordinate set to the same color. Duplicate coordinates collapse.
    #[must_use]
    pub fn from_single_color(coords: impl IntoIterator<Item = Coordinates>, color: Color) -> Self {
        Self {
            changes: coords.into_iter().map(|c| (c, color)).collect(),
            built_as_single_color: true,
        }
    }
    /// Arbitrary writes. On a duplicate coordinate, the last write wins.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Coordinates, Color)>) -> Self {
        Self {
            changes: pairs.into_iter().collect(),
            built_as_single_color: false,
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }
    #[must_use]
    pub fn get(&self, coord: Coordinates) -> Option<Color> {
        self.changes.get(&coord).copied()
    }
    pub fn iter(&self) -> impl Iterator<Item = (Coordinates, Color)> + '_ {
        self.changes.iter().map(|(c, color)| (*c, *color))
    }
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinates> + '_ {
        self.changes.keys().copied()
    }
    /// Whether this set was built from a single color.
    #[must_use]
    pub fn built_as_single_color(&self) -> bool {
        self.built_as_single_color
    }
    /// The shared color, if this set was built as single-colored and is non-empty.
    #[must_use]
    pub fn single_color(&self) -> Option<Color> {
        if self.built_as_single_color {
            self.changes.values().next().copied()
        } else {
            None
        }
    }
    /// Tight bounding box of the written coordinates.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        coords::bounds_of(self.changes.keys())
    }
    /// Merge `other` on top of `self`, its writes winning on conflict.
    #[must_use]
    pub fn combine_overriding(mut self, other: Self) -> Self {
        let still_single = match (self.single_color(), other.single_color()) {
            (Some(a), Some(b)) => a == b,
            (None, Some(_)) => self.is_empty() && other.built_as_single_color,
            (Some(_), None) => other.is_empty(),
            (None, None) => self.is_empty() && other.is_empty(),
        };
        self.changes.extend(other.changes);
        self.built_as_single_color = still_single;
        self
    }
    /// Translate every coordinate.
    #[must_use]
    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            changes: self
                .changes
                .into_iter()
                .map(|(c, color)| (c.offset_by(dx, dy), color))
                .collect(),
            built_as_single_color: self.built_as_single_color,
        }
    }
    /// Approximate heap size, for history accounting.
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        self.changes.capacity()
            * (std::mem::size_of::<Coordinates>() + std::mem::size_of::<Color>())
    }
}
impl IntoIterator for PixelChangeSet {
    type Item = (Coordinates, Color);
    type IntoIter = hashbrown::hash_map::IntoIter<Coordinates, Color>;
    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_color() {
        let set = PixelChangeSet::from_single_color(
            [Coordinates::new(1, 1), Coordinates::new(4, -2), Coordinates::new(1, 1)],
            Color::BLACK,
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.single_color(), Some(Color::BLACK));
        assert_eq!(set.bounds(), Some(Rect::new(1, -2, 4, 4)));

        let empty = PixelChangeSet::from_single_color([], Color::BLACK);
        assert!(empty.is_empty());
        assert_eq!(empty.single_color(), None);
        assert_eq!(empty.bounds(), None);
    }
    #[test]
    fn pairs_are_not_single() {
        let set = PixelChangeSet::from_pairs([(Coordinates::ZERO, Color::WHITE)]);
        assert!(!set.built_as_single_color());
        assert_eq!(set.single_color(), None);
        assert_eq!(set.get(Coordinates::ZERO), Some(Color::WHITE));
    }
    #[test]
    fn combine() {
        let a = PixelChangeSet::from_single_color(
            [Coordinates::new(0, 0), Coordinates::new(1, 0)],
            Color::BLACK,
        );
        let b = PixelChangeSet::from_single_color([Coordinates::new(1, 0)], Color::WHITE);
        let combined = a.clone().combine_overriding(b);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.get(Coordinates::new(1, 0)), Some(Color::WHITE));
        assert!(!combined.built_as_single_color());

        let same = a.clone().combine_overriding(PixelChangeSet::from_single_color(
            [Coordinates::new(7, 7)],
            Color::BLACK,
        ));
        assert_eq!(same.single_color(), Some(Color::BLACK));
    }
}
