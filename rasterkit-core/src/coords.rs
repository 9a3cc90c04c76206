//! # Coordinates
//!
//! Integer pixel geometry. Document space is unbounded in every direction, only the clamps of a
//! [`Layer`](crate::state::layer::Layer) restrict where content may land.

/// A pixel position, either document-absolute or layer-local depending on context.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Debug)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}
impl Coordinates {
    pub const ZERO: Self = Self::new(0, 0);
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    /// Componentwise saturating translation.
    #[must_use]
    pub const fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
    /// `self - other`, componentwise.
    #[must_use]
    pub const fn relative_to(self, origin: Self) -> Self {
        Self::new(
            self.x.saturating_sub(origin.x),
            self.y.saturating_sub(origin.y),
        )
    }
    /// The four edge-adjacent neighbours, in right, left, down, up order.
    #[must_use]
    pub const fn neighbours(self) -> [Self; 4] {
        [
            self.offset_by(1, 0),
            self.offset_by(-1, 0),
            self.offset_by(0, 1),
            self.offset_by(0, -1),
        ]
    }
}
impl From<(i32, i32)> for Coordinates {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}
impl std::ops::Add for Coordinates {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        self.offset_by(rhs.x, rhs.y)
    }
}
impl std::ops::Sub for Coordinates {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self.relative_to(rhs)
    }
}

/// An axis-aligned rectangle with an exclusive right and bottom edge.
///
/// A rectangle with zero width or height contains nothing, but still has a meaningful position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    /// Rectangle from an inclusive `min` and an exclusive `max` corner.
    /// Inverted corners give an empty rect at `min`.
    #[must_use]
    pub fn from_corners(min: Coordinates, max_exclusive: Coordinates) -> Self {
        use az::SaturatingAs;
        let width = (i64::from(max_exclusive.x) - i64::from(min.x)).max(0);
        let height = (i64::from(max_exclusive.y) - i64::from(min.y)).max(0);
        Self::new(min.x, min.y, width.saturating_as(), height.saturating_as())
    }
    #[must_use]
    pub const fn origin(&self) -> Coordinates {
        Coordinates::new(self.x, self.y)
    }
    #[must_use]
    pub fn right(&self) -> i32 {
        use az::SaturatingAs;
        (i64::from(self.x) + i64::from(self.width)).saturating_as()
    }
    #[must_use]
    pub fn bottom(&self) -> i32 {
        use az::SaturatingAs;
        (i64::from(self.y) + i64::from(self.height)).saturating_as()
    }
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        point.x >= self.x && point.y >= self.y && point.x < self.right() && point.y < self.bottom()
    }
    /// Overlapping region, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let min = Coordinates::new(self.x.max(other.x), self.y.max(other.y));
        let max = Coordinates::new(
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        );
        let rect = Self::from_corners(min, max);
        (!rect.is_empty()).then_some(rect)
    }
    /// Smallest rect covering both. Empty rects don't contribute.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) | (false, true) => *self,
            (true, false) => *other,
            (false, false) => Self::from_corners(
                Coordinates::new(self.x.min(other.x), self.y.min(other.y)),
                Coordinates::new(
                    self.right().max(other.right()),
                    self.bottom().max(other.bottom()),
                ),
            ),
        }
    }
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let origin = self.origin().offset_by(dx, dy);
        Self::new(origin.x, origin.y, self.width, self.height)
    }
    /// Every coordinate inside, row-major.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinates> {
        let (x, right) = (self.x, self.right());
        (self.y..self.bottom()).flat_map(move |y| (x..right).map(move |x| Coordinates::new(x, y)))
    }
    /// Integer centre, rounding toward negative infinity.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        center_of(self.origin(), Coordinates::new(self.right(), self.bottom()))
    }
}

/// Midpoint of an inclusive `min` and exclusive `max`, rounding toward negative infinity.
#[must_use]
pub fn center_of(min: Coordinates, max_exclusive: Coordinates) -> Coordinates {
    use az::SaturatingAs;
    let mid = |a: i32, b: i32| -> i32 { (i64::from(a) + i64::from(b)).div_euclid(2).saturating_as() };
    Coordinates::new(mid(min.x, max_exclusive.x), mid(min.y, max_exclusive.y))
}

/// Tight bounding rect of a set of coordinates, or `None` if there are none.
#[must_use]
pub fn bounds_of<'a>(coords: impl IntoIterator<Item = &'a Coordinates>) -> Option<Rect> {
    let mut iter = coords.into_iter();
    let first = *iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), c| {
        (
            Coordinates::new(min.x.min(c.x), min.y.min(c.y)),
            Coordinates::new(max.x.max(c.x), max.y.max(c.y)),
        )
    });
    Some(Rect::from_corners(min, max.offset_by(1, 1)))
}

/// Whether `point` lies on the outermost ring of pixels of a `width` x `height` area at the origin.
#[must_use]
pub fn is_on_border(point: Coordinates, width: u32, height: u32) -> bool {
    let rect = Rect::new(0, 0, width, height);
    rect.contains(point)
        && (point.x == 0
            || point.y == 0
            || point.x == rect.right() - 1
            || point.y == rect.bottom() - 1)
}

bitflags::bitflags! {
    /// Which edges stay put when the canvas changes size. An axis with neither (or both) of its
    /// edges set is centered on that axis.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    pub struct AnchorPoint: u8 {
        const TOP = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT = 0b0100;
        const RIGHT = 0b1000;
    }
}
impl AnchorPoint {
    pub const CENTER: Self = Self::empty();
    pub const TOP_LEFT: Self = Self::TOP.union(Self::LEFT);
    pub const BOTTOM_RIGHT: Self = Self::BOTTOM.union(Self::RIGHT);

    /// Translation that moves content anchored at `self` from an area of `old` size into one of `new` size.
    #[must_use]
    pub fn offset(self, old: (u32, u32), new: (u32, u32)) -> Coordinates {
        Coordinates::new(
            axis_offset(self, Self::LEFT, Self::RIGHT, old.0, new.0),
            axis_offset(self, Self::TOP, Self::BOTTOM, old.1, new.1),
        )
    }
}
fn axis_offset(anchor: AnchorPoint, start: AnchorPoint, end: AnchorPoint, old: u32, new: u32) -> i32 {
    use az::SaturatingAs;
    let (old, new) = (i64::from(old), i64::from(new));
    let delta = match (anchor.contains(start), anchor.contains(end)) {
        (true, false) => 0,
        (false, true) => new - old,
        // Halve each side separately, so odd sizes round the same way a lone layer centre would.
        _ => new / 2 - old / 2,
    };
    delta.saturating_as()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rect_edges() {
        let r = Rect::new(-2, 3, 4, 5);
        assert_eq!(r.right(), 2);
        assert_eq!(r.bottom(), 8);
        assert!(r.contains(Coordinates::new(-2, 3)));
        assert!(r.contains(Coordinates::new(1, 7)));
        assert!(!r.contains(Coordinates::new(2, 7)));
        assert_eq!(r.coordinates().count(), 20);
    }
    #[test]
    fn intersect_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert_eq!(a.intersect(&Rect::new(10, 0, 1, 1)), None);
        // Empty rects don't drag the union toward the origin.
        assert_eq!(Rect::default().union(&b), b);
    }
    #[test]
    fn bounds() {
        let points = [
            Coordinates::new(3, 9),
            Coordinates::new(-1, 4),
            Coordinates::new(2, 2),
        ];
        assert_eq!(bounds_of(&points), Some(Rect::new(-1, 2, 5, 8)));
        assert_eq!(bounds_of(&[]), None);
    }
    #[test]
    fn border() {
        assert!(is_on_border(Coordinates::new(0, 3), 5, 5));
        assert!(is_on_border(Coordinates::new(4, 4), 5, 5));
        assert!(!is_on_border(Coordinates::new(2, 2), 5, 5));
        assert!(!is_on_border(Coordinates::new(5, 0), 5, 5));
    }
    #[test]
    fn center_rounds_down() {
        assert_eq!(Rect::new(0, 0, 5, 5).center(), Coordinates::new(2, 2));
        assert_eq!(Rect::new(-3, -3, 2, 2).center(), Coordinates::new(-2, -2));
    }
    #[test]
    fn anchors() {
        let old = (10, 10);
        let new = (20, 16);
        assert_eq!(AnchorPoint::TOP_LEFT.offset(old, new), Coordinates::ZERO);
        assert_eq!(
            AnchorPoint::BOTTOM_RIGHT.offset(old, new),
            Coordinates::new(10, 6)
        );
        assert_eq!(AnchorPoint::CENTER.offset(old, new), Coordinates::new(5, 3));
        // Shrinking moves content the other way.
        assert_eq!(
            AnchorPoint::BOTTOM_RIGHT.offset(new, old),
            Coordinates::new(-10, -6)
        );
        assert_eq!(AnchorPoint::TOP.offset(old, new), Coordinates::new(5, 0));
    }
}
