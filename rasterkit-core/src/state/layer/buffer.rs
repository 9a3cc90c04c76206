//! Owned, dense RGBA8 storage behind every [`Layer`](super::Layer).

use crate::{
    color::Color,
    coords::{Coordinates, Rect},
};

/// Row-major straight-alpha pixels. Never shared, cloning duplicates the whole buffer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}
impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
impl PixelBuffer {
    /// A fully transparent buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; Self::area(width, height)],
        }
    }
    /// Wrap existing pixels. `None` if the length doesn't match the dimensions.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Option<Self> {
        (pixels.len() == Self::area(width, height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }
    fn area(width: u32, height: u32) -> usize {
        use az::SaturatingAs;
        (u64::from(width) * u64::from(height)).saturating_as()
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
    fn index_of(&self, at: Coordinates) -> Option<usize> {
        let x = u32::try_from(at.x).ok()?;
        let y = u32::try_from(at.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        use az::CheckedAs;
        (u64::from(y) * u64::from(self.width) + u64::from(x)).checked_as()
    }
    #[must_use]
    pub fn get(&self, at: Coordinates) -> Option<Color> {
        self.index_of(at).map(|idx| self.pixels[idx])
    }
    /// Write one pixel. Returns false, writing nothing, if out of bounds.
    pub fn set(&mut self, at: Coordinates, color: Color) -> bool {
        if let Some(idx) = self.index_of(at) {
            self.pixels[idx] = color;
            true
        } else {
            false
        }
    }
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    pub fn clear(&mut self) {
        self.pixels.fill(Color::TRANSPARENT);
    }
    /// A new buffer of the given size with `self` copied in at `dest`.
    /// Parts that fall outside the new size are lost, uncovered parts are transparent.
    #[must_use]
    pub fn reanchored(&self, width: u32, height: u32, dest: Coordinates) -> Self {
        let mut out = Self::new(width, height);
        let Some(overlap) = Rect::new(dest.x, dest.y, self.width, self.height)
            .intersect(&Rect::new(0, 0, width, height))
        else {
            return out;
        };
        // Row-wise copy of the overlapping block.
        for y in overlap.y..overlap.bottom() {
            let src = Coordinates::new(overlap.x, y).relative_to(dest);
            let (Some(src_start), Some(dst_start)) =
                (self.index_of(src), out.index_of(Coordinates::new(overlap.x, y)))
            else {
                continue;
            };
            let len = overlap.width as usize;
            out.pixels[dst_start..dst_start + len]
                .copy_from_slice(&self.pixels[src_start..src_start + len]);
        }
        out
    }
    /// Copy out the part within `rect`, which is relative to this buffer's origin.
    #[must_use]
    pub fn crop(&self, rect: Rect) -> Self {
        self.reanchored(rect.width, rect.height, Coordinates::new(-rect.x, -rect.y))
    }
    /// Nearest-neighbour resample to a new size.
    #[must_use]
    pub fn resample_nearest(&self, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        if self.is_empty() {
            return out;
        }
        for y in 0..height {
            let src_y = u64::from(y) * u64::from(self.height) / u64::from(height);
            for x in 0..width {
                let src_x = u64::from(x) * u64::from(self.width) / u64::from(width);
                // Both are strictly less than the source dimensions, which already fit an i32 index.
                let src = self.pixels[(src_y * u64::from(self.width) + src_x) as usize];
                out.pixels[(u64::from(y) * u64::from(width) + u64::from(x)) as usize] = src;
            }
        }
        out
    }
    /// Tight box of pixels with nonzero alpha, relative to this buffer's origin.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        let width = self.width as usize;
        if width == 0 {
            return None;
        }
        let mut min = (usize::MAX, usize::MAX);
        let mut max = (0usize, 0usize);
        let mut found = false;
        for (y, row) in self.pixels.chunks_exact(width).enumerate() {
            let Some(first) = row.iter().position(|p| !p.is_transparent()) else {
                continue;
            };
            // Found one, so there is a last one.
            let last = row.iter().rposition(|p| !p.is_transparent()).unwrap_or(first);
            found = true;
            min = (min.0.min(first), min.1.min(y));
            max = (max.0.max(last), max.1.max(y));
        }
        if !found {
            return None;
        }
        use az::SaturatingAs;
        Some(Rect::from_corners(
            Coordinates::new(min.0.saturating_as(), min.1.saturating_as()),
            Coordinates::new((max.0 + 1).saturating_as(), (max.1 + 1).saturating_as()),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for at in Rect::new(0, 0, width, height).coordinates() {
            if (at.x + at.y) % 2 == 0 {
                buf.set(at, Color::BLACK);
            }
        }
        buf
    }

    #[test]
    fn bounds_checked() {
        let mut buf = PixelBuffer::new(3, 2);
        assert!(buf.set(Coordinates::new(2, 1), Color::WHITE));
        assert!(!buf.set(Coordinates::new(3, 1), Color::WHITE));
        assert!(!buf.set(Coordinates::new(-1, 0), Color::WHITE));
        assert_eq!(buf.get(Coordinates::new(2, 1)), Some(Color::WHITE));
        assert_eq!(buf.get(Coordinates::new(0, 2)), None);
        assert_eq!(buf.as_bytes().len(), 3 * 2 * 4);
    }
    #[test]
    fn reanchor_keeps_content() {
        let buf = checker(4, 4);
        let bigger = buf.reanchored(6, 7, Coordinates::new(2, 3));
        for at in Rect::new(0, 0, 4, 4).coordinates() {
            assert_eq!(buf.get(at), bigger.get(at.offset_by(2, 3)));
        }
        assert_eq!(bigger.get(Coordinates::new(0, 0)), Some(Color::TRANSPARENT));
        assert_eq!(bigger.content_bounds(), Some(Rect::new(2, 3, 4, 4)));
    }
    #[test]
    fn crop() {
        let buf = checker(5, 5);
        let cropped = buf.crop(Rect::new(1, 1, 2, 2));
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.get(Coordinates::new(0, 0)), Some(Color::BLACK));
        assert_eq!(cropped.get(Coordinates::new(1, 0)), Some(Color::TRANSPARENT));
    }
    #[test]
    fn nearest_doubles() {
        let buf = checker(2, 2);
        let big = buf.resample_nearest(4, 4);
        assert_eq!(big.get(Coordinates::new(1, 1)), Some(Color::BLACK));
        assert_eq!(big.get(Coordinates::new(2, 1)), Some(Color::TRANSPARENT));
        assert_eq!(big.get(Coordinates::new(3, 3)), Some(Color::BLACK));
        assert!(PixelBuffer::default().resample_nearest(3, 3).content_bounds().is_none());
    }
    #[test]
    fn content_bounds() {
        let mut buf = PixelBuffer::new(10, 10);
        assert_eq!(buf.content_bounds(), None);
        buf.set(Coordinates::new(7, 2), Color::BLACK);
        buf.set(Coordinates::new(3, 8), Color::BLACK);
        assert_eq!(buf.content_bounds(), Some(Rect::new(3, 2, 5, 7)));
    }
}
