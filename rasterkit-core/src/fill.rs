//! # Flood fill
//!
//! Bucket fill over a single layer. The search runs in document space, since the filled region may extend
//! past the layer's current buffer into transparent space the layer will grow to cover.

use az::SaturatingAs;

use crate::{
    color::Color,
    coords::{Coordinates, Rect},
    pixels::PixelChangeSet,
    state::layer::Layer,
};

/// Find the 4-connected region of `start`'s color and produce the writes recoloring it to `color`.
///
/// The region is limited to the `document_width` x `document_height` rectangle at the origin. Returns an
/// empty set if `start` is outside of it or already has the fill color.
#[must_use]
pub fn flood_fill(
    layer: &Layer,
    document_width: u32,
    document_height: u32,
    start: Coordinates,
    color: Color,
) -> PixelChangeSet {
    let document = Rect::new(0, 0, document_width, document_height);
    if !document.contains(start) {
        return PixelChangeSet::default();
    }
    let seed = layer.get_pixel_with_offset(start.x, start.y);

    // Checked on pop, so out of range coordinates may be pushed freely.
    let mut visited = bitvec::vec::BitVec::<usize>::repeat(
        false,
        (u64::from(document_width) * u64::from(document_height)).saturating_as(),
    );
    let index = |at: Coordinates| -> usize {
        let (x, y) = (at.x.saturating_as::<u64>(), at.y.saturating_as::<u64>());
        (y * u64::from(document_width) + x).saturating_as()
    };

    let mut region = Vec::new();
    let mut stack = vec![start];
    while let Some(at) = stack.pop() {
        if !document.contains(at) || visited[index(at)] {
            continue;
        }
        let current = layer.get_pixel_with_offset(at.x, at.y);
        if current == color || current != seed {
            continue;
        }
        visited.set(index(at), true);
        region.push(at);
        stack.extend(at.neighbours());
    }

    log::trace!("flood fill from {start:?} covers {} pixels", region.len());
    PixelChangeSet::from_single_color(region, color)
}

#[cfg(test)]
mod test {
    use super::*;

    /// A 10x10 document with a 4x4 black ring (2..=5) drawn on an otherwise transparent layer.
    fn ring() -> Layer {
        let mut layer = Layer::with_size("ring", 10, 10);
        let ring = Rect::new(2, 2, 4, 4)
            .coordinates()
            .filter(|c| c.x == 2 || c.x == 5 || c.y == 2 || c.y == 5);
        layer.set_pixels(
            &PixelChangeSet::from_single_color(ring, Color::BLACK),
            false,
            true,
        );
        layer
    }

    #[test]
    fn same_color_is_noop() {
        let layer = ring();
        assert!(flood_fill(&layer, 10, 10, Coordinates::new(2, 2), Color::BLACK).is_empty());
    }
    #[test]
    fn fills_enclosed_region() {
        let layer = ring();
        let red = Color::rgb(255, 0, 0);
        let inside = flood_fill(&layer, 10, 10, Coordinates::new(3, 3), red);
        assert_eq!(inside.len(), 4);
        assert_eq!(inside.single_color(), Some(red));

        let outside = flood_fill(&layer, 10, 10, Coordinates::new(0, 0), red);
        assert_eq!(outside.len(), 100 - 16);
        assert!(outside.get(Coordinates::new(3, 3)).is_none());

        let border = flood_fill(&layer, 10, 10, Coordinates::new(2, 4), red);
        assert_eq!(border.len(), 12);
    }
    #[test]
    fn extends_past_layer() {
        // Transparent space outside the buffer is fillable up to the document edge.
        let mut layer = Layer::new("small");
        layer.set_pixel(Coordinates::new(1, 1), Color::BLACK, true, true);
        let fill = flood_fill(&layer, 4, 3, Coordinates::new(3, 2), Color::WHITE);
        assert_eq!(fill.len(), 11);
    }
    #[test]
    fn start_outside_document() {
        let layer = ring();
        assert!(flood_fill(&layer, 10, 10, Coordinates::new(-1, 0), Color::WHITE).is_empty());
        assert!(flood_fill(&layer, 10, 10, Coordinates::new(10, 0), Color::WHITE).is_empty());
    }
    #[test]
    fn degenerate_documents() {
        let layer = Layer::new("empty");
        assert!(flood_fill(&layer, 3, 0, Coordinates::ZERO, Color::WHITE).is_empty());
        assert!(flood_fill(&layer, 0, 0, Coordinates::ZERO, Color::WHITE).is_empty());

        let column = flood_fill(&layer, 1, 5, Coordinates::new(0, 4), Color::WHITE);
        assert_eq!(column.len(), 5);
        let row = flood_fill(&layer, 7, 1, Coordinates::new(6, 0), Color::WHITE);
        assert_eq!(row.len(), 7);
    }
}
