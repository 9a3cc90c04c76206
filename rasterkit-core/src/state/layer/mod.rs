//! # Layers
//!
//! A layer is a raster image positioned somewhere in document space. Its buffer only covers the part of the
//! document that actually has content: painting outside of it grows the buffer, erasing along its edge
//! shrinks it again.
//!
//! Nothing here records history. Direct edits are for tools that preview, everything user-visible goes
//! through [`Document`](crate::state::document::Document).

pub mod buffer;

use crate::{
    color::Color,
    commands::{CommandError, PropertyKind, PropertyTarget, PropertyValue},
    coords::{self, Coordinates, Rect},
    pixels::PixelChangeSet,
    util::Opacity,
};
use buffer::PixelBuffer;

pub type LayerID = crate::RasterID<Layer>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerError {
    #[error("buffer is {actual} bytes, expected {expected} for the given dimensions")]
    BufferSize { expected: usize, actual: usize },
}

#[derive(Clone, Debug)]
pub struct Layer {
    // NOT public, history finds layers by this!
    id: LayerID,
    // NOT public, these must move together with the buffer.
    offset: Coordinates,
    buffer: PixelBuffer,
    /// Growth is clamped to `[0, max_width) x [0, max_height)` of document space.
    max_width: u32,
    max_height: u32,
    pub name: String,
    pub is_visible: bool,
    pub opacity: Opacity,
    pub is_active: bool,
    /// Reference layers are excluded from merging.
    pub is_mergeable: bool,
}
impl Layer {
    /// An empty, zero-sized layer that may grow anywhere in positive document space.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_buffer(name, PixelBuffer::default())
    }
    /// A transparent layer of the given size at the origin.
    #[must_use]
    pub fn with_size(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_buffer(name, PixelBuffer::new(width, height))
    }
    /// Build a layer from raw row-major straight RGBA8 bytes.
    pub fn from_bytes(
        name: impl Into<String>,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> Result<Self, LayerError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).unwrap_or(usize::MAX);
        if bytes.len() != expected {
            return Err(LayerError::BufferSize {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels: Vec<Color> = bytemuck::cast_slice(bytes).to_vec();
        let buffer = PixelBuffer::from_pixels(width, height, pixels).ok_or(LayerError::BufferSize {
            expected,
            actual: bytes.len(),
        })?;
        Ok(Self::from_buffer(name, buffer))
    }
    fn from_buffer(name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            id: LayerID::new(),
            offset: Coordinates::ZERO,
            buffer,
            max_width: u32::MAX,
            max_height: u32::MAX,
            name: name.into(),
            is_visible: true,
            opacity: Opacity::OPAQUE,
            is_active: false,
            is_mergeable: true,
        }
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    /// Replace the identity of this layer.
    ///
    /// Any history entry that refers to the old ID will fail to find this layer afterwards. Only merge
    /// machinery uses this, to let the merged result take over the identity of one of its inputs.
    pub fn change_id(&mut self, new: LayerID) {
        log::debug!("layer {} takes over id {new}", self.id);
        self.id = new;
    }
    /// Deep copy. Keeps the ID unless `generate_new_id` is set.
    #[must_use]
    pub fn clone_layer(&self, generate_new_id: bool) -> Self {
        let mut clone = self.clone();
        if generate_new_id {
            clone.id = LayerID::new();
        }
        clone
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }
    #[must_use]
    pub fn offset(&self) -> Coordinates {
        self.offset
    }
    /// Move the layer without touching its pixels.
    pub fn set_offset(&mut self, offset: Coordinates) {
        self.offset = offset;
    }
    #[must_use]
    pub fn max_size(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }
    /// Change the growth clamps. Existing content outside of them is kept.
    pub fn set_max_size(&mut self, max_width: u32, max_height: u32) {
        self.max_width = max_width;
        self.max_height = max_height;
    }
    /// Layer rectangle in document space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.offset.x, self.offset.y, self.width(), self.height())
    }
    /// Tight box of visible-alpha pixels in document space.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        self.buffer
            .content_bounds()
            .map(|rect| rect.translated(self.offset.x, self.offset.y))
    }
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
    /// Raw row-major RGBA8 bytes, for an external serializer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
    /// Document space to layer-local.
    #[must_use]
    pub fn relative_position(&self, coord: Coordinates) -> Coordinates {
        coord.relative_to(self.offset)
    }
    #[must_use]
    pub fn to_relative(&self, coords: &[Coordinates]) -> Vec<Coordinates> {
        coords.iter().map(|c| self.relative_position(*c)).collect()
    }
    /// Layer-local read. Transparent outside the buffer.
    #[must_use]
    pub fn get_pixel(&self, x: i32, y: i32) -> Color {
        self.buffer
            .get(Coordinates::new(x, y))
            .unwrap_or(Color::TRANSPARENT)
    }
    /// Document space read. Transparent outside the buffer.
    #[must_use]
    pub fn get_pixel_with_offset(&self, x: i32, y: i32) -> Color {
        let local = self.relative_position(Coordinates::new(x, y));
        self.get_pixel(local.x, local.y)
    }
    pub fn set_pixel(
        &mut self,
        coord: Coordinates,
        color: Color,
        dynamic_resize: bool,
        apply_offset: bool,
    ) {
        self.set_pixels(
            &PixelChangeSet::from_single_color([coord], color),
            dynamic_resize,
            apply_offset,
        );
    }
    /// Write a batch of pixels.
    ///
    /// With `dynamic_resize`, the buffer first grows to cover the batch (limited to the growth clamps), and
    /// a transparent write on the buffer's edge shrinks it to its content afterwards. With `apply_offset`
    /// the coordinates are in document space, otherwise layer-local. Writes that still fall outside of the
    /// buffer are dropped.
    pub fn set_pixels(&mut self, changes: &PixelChangeSet, dynamic_resize: bool, apply_offset: bool) {
        if changes.is_empty() {
            return;
        }
        // Where the change coordinates are measured from, in document space.
        let space = if apply_offset {
            Coordinates::ZERO
        } else {
            self.offset
        };
        let clip_requested = dynamic_resize && self.dynamic_resize(changes, space);

        for (coord, color) in changes.iter() {
            // Out of bounds is silently dropped.
            self.buffer.set((coord + space).relative_to(self.offset), color);
        }

        if clip_requested {
            self.clip_canvas();
        }
    }
    /// Grow to fit the batch. Returns whether a clip should follow the write.
    fn dynamic_resize(&mut self, changes: &PixelChangeSet, space: Coordinates) -> bool {
        let Some(batch) = changes.bounds() else {
            return false;
        };
        let batch = batch.translated(space.x, space.y);
        let limit = self.growth_limit();

        let erasing = changes.single_color().is_some_and(Color::is_transparent);
        if !erasing {
            if self.buffer.is_empty() {
                // Nothing to keep in place, new content defines the origin.
                self.offset = Coordinates::new(
                    batch.x.clamp(0, limit.right()),
                    batch.y.clamp(0, limit.bottom()),
                );
            }
            if let Some(wanted) = batch.intersect(&limit) {
                let current = self.bounds();
                let target = current.union(&wanted);
                if target != current {
                    self.reanchor(target);
                }
            }
        }

        let (width, height) = (self.width(), self.height());
        changes.iter().any(|(coord, color)| {
            color.is_transparent()
                && coords::is_on_border((coord + space).relative_to(self.offset), width, height)
        })
    }
    fn growth_limit(&self) -> Rect {
        Rect::new(0, 0, self.max_width, self.max_height)
    }
    /// Move the buffer onto `target` (document space), keeping every pixel's absolute position.
    fn reanchor(&mut self, target: Rect) {
        log::trace!(
            "layer {} grows from {:?} to {target:?}",
            self.id,
            self.bounds()
        );
        let dest = self.offset.relative_to(target.origin());
        self.buffer = self.buffer.reanchored(target.width, target.height, dest);
        self.offset = target.origin();
    }
    /// Shrink to the tight box of non-transparent content. A fully transparent layer is left as is.
    pub fn clip_canvas(&mut self) {
        let Some(content) = self.buffer.content_bounds() else {
            return;
        };
        if content == Rect::new(0, 0, self.width(), self.height()) {
            return;
        }
        self.buffer = self.buffer.crop(content);
        self.offset = self.offset.offset_by(content.x, content.y);
    }
    /// Nearest-neighbour scale of the content to a new size, and new growth clamps.
    pub fn resize(&mut self, width: u32, height: u32, new_max_width: u32, new_max_height: u32) {
        self.buffer = self.buffer.resample_nearest(width, height);
        self.set_max_size(new_max_width, new_max_height);
    }
    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.clip_canvas();
    }
    /// Bytes owned by this layer, roughly.
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.as_bytes().len() + self.name.capacity()
    }
}

/// The pixels and placement of a layer, without its identity or presentation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RasterSnapshot {
    offset: Coordinates,
    buffer: PixelBuffer,
    max_width: u32,
    max_height: u32,
}
impl RasterSnapshot {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.buffer.width(),
            self.buffer.height(),
        )
    }
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.buffer.as_bytes().len()
    }
}
impl Layer {
    /// Copy out everything painting, clipping, or resizing may change.
    #[must_use]
    pub fn raster_snapshot(&self) -> RasterSnapshot {
        RasterSnapshot {
            offset: self.offset,
            buffer: self.buffer.clone(),
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }
    pub fn restore_raster(&mut self, snapshot: &RasterSnapshot) {
        self.offset = snapshot.offset;
        self.buffer = snapshot.buffer.clone();
        self.max_width = snapshot.max_width;
        self.max_height = snapshot.max_height;
    }
}

impl PropertyTarget for Layer {
    fn property(&self, kind: PropertyKind) -> Option<PropertyValue> {
        Some(match kind {
            PropertyKind::Name => PropertyValue::Name(self.name.clone()),
            PropertyKind::Visible => PropertyValue::Visible(self.is_visible),
            PropertyKind::Opacity => PropertyValue::Opacity(self.opacity),
            PropertyKind::Offset => PropertyValue::Offset(self.offset),
        })
    }
    fn set_property(&mut self, value: PropertyValue) -> Result<(), CommandError> {
        match value {
            PropertyValue::Name(name) => self.name = name,
            PropertyValue::Visible(visible) => self.is_visible = visible,
            PropertyValue::Opacity(opacity) => self.opacity = opacity,
            PropertyValue::Offset(offset) => self.offset = offset,
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pixel(x: i32, y: i32, color: Color) -> PixelChangeSet {
        PixelChangeSet::from_single_color([Coordinates::new(x, y)], color)
    }

    #[test]
    fn out_of_bounds_read_is_transparent() {
        let mut layer = Layer::with_size("a", 4, 4);
        layer.set_pixels(&pixel(1, 1, Color::BLACK), false, true);
        assert_eq!(layer.get_pixel(1, 1), Color::BLACK);
        for (x, y) in [(-1, 0), (0, -1), (4, 0), (0, 4), (i32::MAX, i32::MIN)] {
            assert_eq!(layer.get_pixel(x, y).a, 0);
        }
    }
    #[test]
    fn grows_from_empty() {
        let mut layer = Layer::new("a");
        layer.set_pixel(Coordinates::new(15, 2), Color::BLACK, true, true);
        assert_eq!(layer.offset(), Coordinates::new(15, 2));
        assert!(layer.width() >= 1 && layer.height() >= 1);
        assert_eq!(layer.get_pixel(0, 0), Color::BLACK);
        assert_eq!(layer.get_pixel_with_offset(15, 2), Color::BLACK);
    }
    #[test]
    fn grows_keeping_absolute_position() {
        let mut layer = Layer::new("a");
        layer.set_pixel(Coordinates::new(10, 10), Color::BLACK, true, true);
        // Up and left of the existing content.
        layer.set_pixel(Coordinates::new(4, 6), Color::WHITE, true, true);
        // Down and right.
        layer.set_pixel(Coordinates::new(12, 13), Color::WHITE, true, true);

        assert_eq!(layer.bounds(), Rect::new(4, 6, 9, 8));
        assert_eq!(layer.get_pixel_with_offset(10, 10), Color::BLACK);
        assert_eq!(layer.get_pixel_with_offset(4, 6), Color::WHITE);
        assert_eq!(layer.get_pixel_with_offset(12, 13), Color::WHITE);
    }
    #[test]
    fn growth_is_clamped() {
        let mut layer = Layer::new("a");
        layer.set_max_size(8, 8);
        let changes = PixelChangeSet::from_single_color(
            [Coordinates::new(-3, 2), Coordinates::new(5, 5), Coordinates::new(20, 2)],
            Color::BLACK,
        );
        layer.set_pixels(&changes, true, true);
        let bounds = layer.bounds();
        assert!(bounds.x >= 0 && bounds.y >= 0);
        assert!(bounds.right() <= 8 && bounds.bottom() <= 8);
        assert_eq!(layer.get_pixel_with_offset(5, 5), Color::BLACK);
        assert_eq!(layer.get_pixel_with_offset(-3, 2).a, 0);
    }
    #[test]
    fn erasing_nothing_does_not_grow() {
        let mut layer = Layer::new("a");
        layer.set_pixel(Coordinates::new(3, 3), Color::TRANSPARENT, true, true);
        assert_eq!((layer.width(), layer.height()), (0, 0));
        assert_eq!(layer.offset(), Coordinates::ZERO);
    }
    #[test]
    fn local_coordinates_grow_left_and_up() {
        let mut layer = Layer::new("a");
        layer.set_pixels(&pixel(5, 5, Color::BLACK), true, true);
        assert_eq!(layer.bounds(), Rect::new(5, 5, 1, 1));

        layer.set_pixels(&pixel(-2, 0, Color::BLACK), true, false);
        assert_eq!(layer.bounds(), Rect::new(3, 5, 3, 1));
        assert_eq!(layer.get_pixel_with_offset(3, 5), Color::BLACK);
        assert_eq!(layer.get_pixel_with_offset(5, 5), Color::BLACK);

        // Measured from the moved origin now.
        layer.set_pixels(&pixel(0, -1, Color::BLACK), true, false);
        assert_eq!(layer.bounds(), Rect::new(3, 4, 3, 2));
        assert_eq!(layer.get_pixel_with_offset(3, 4), Color::BLACK);
        assert_eq!(layer.get_pixel_with_offset(5, 5), Color::BLACK);
    }
    #[test]
    fn local_coordinates_on_empty_layer() {
        let mut layer = Layer::new("a");
        layer.set_offset(Coordinates::new(5, 5));
        layer.set_pixels(&pixel(0, 0, Color::BLACK), true, false);
        assert_eq!(layer.bounds(), Rect::new(5, 5, 1, 1));
        assert_eq!(layer.get_pixel_with_offset(5, 5), Color::BLACK);
    }
    #[test]
    fn erasing_edge_clips() {
        let mut layer = Layer::new("a");
        let line = PixelChangeSet::from_single_color(
            (0..5).map(|x| Coordinates::new(x, 0)),
            Color::BLACK,
        );
        layer.set_pixels(&line, true, true);
        assert_eq!(layer.width(), 5);
        layer.set_pixel(Coordinates::new(4, 0), Color::TRANSPARENT, true, true);
        assert_eq!(layer.bounds(), Rect::new(0, 0, 4, 1));
        layer.set_pixel(Coordinates::new(0, 0), Color::TRANSPARENT, true, true);
        assert_eq!(layer.bounds(), Rect::new(1, 0, 3, 1));
    }
    #[test]
    fn clip_scenario() {
        let mut layer = Layer::with_size("a", 10, 10);
        layer.set_pixel(Coordinates::new(5, 5), Color::BLACK, false, true);
        layer.set_pixel(Coordinates::new(0, 0), Color::BLACK, false, true);
        layer.clip_canvas();

        assert_eq!((layer.width(), layer.height()), (6, 6));
        assert_eq!(layer.offset(), Coordinates::ZERO);
        assert_eq!(layer.get_pixel(0, 0), Color::BLACK);
        assert_eq!(layer.get_pixel(5, 5), Color::BLACK);
        for at in Rect::new(0, 0, 6, 6).coordinates() {
            if at != Coordinates::ZERO && at != Coordinates::new(5, 5) {
                assert_eq!(layer.get_pixel(at.x, at.y), Color::TRANSPARENT);
            }
        }
    }
    #[test]
    fn clip_idempotent() {
        let mut layer = Layer::with_size("a", 10, 10);
        layer.set_pixel(Coordinates::new(3, 4), Color::BLACK, false, true);
        layer.set_pixel(Coordinates::new(7, 6), Color::BLACK, false, true);
        layer.clip_canvas();
        let once = (layer.bounds(), layer.to_bytes());
        layer.clip_canvas();
        assert_eq!(once, (layer.bounds(), layer.to_bytes()));
        assert_eq!(once.0, Rect::new(3, 4, 5, 3));
    }
    #[test]
    fn empty_layer_clip_untouched() {
        let mut layer = Layer::with_size("a", 7, 3);
        layer.set_offset(Coordinates::new(2, 2));
        layer.clip_canvas();
        assert_eq!(layer.bounds(), Rect::new(2, 2, 7, 3));
        layer.clear();
        assert_eq!(layer.bounds(), Rect::new(2, 2, 7, 3));
    }
    #[test]
    fn snapshot_restores() {
        let mut layer = Layer::new("a");
        layer.set_pixel(Coordinates::new(3, 3), Color::BLACK, true, true);
        let before = layer.raster_snapshot();
        layer.set_pixel(Coordinates::new(9, 1), Color::WHITE, true, true);
        assert_ne!(before, layer.raster_snapshot());
        layer.restore_raster(&before);
        assert_eq!(layer.bounds(), Rect::new(3, 3, 1, 1));
        assert_eq!(layer.get_pixel_with_offset(3, 3), Color::BLACK);
    }
    #[test]
    fn clone_identity() {
        let layer = Layer::with_size("a", 2, 2);
        assert_eq!(layer.clone_layer(false).id(), layer.id());
        assert_ne!(layer.clone_layer(true).id(), layer.id());
    }
    #[test]
    fn bytes() {
        let bytes: Vec<u8> = (0..2 * 3 * 4).map(|b| b as u8).collect();
        let layer = Layer::from_bytes("raw", 2, 3, &bytes).unwrap();
        assert_eq!(layer.as_bytes(), bytes.as_slice());
        assert_eq!(layer.get_pixel(1, 0), Color::rgba(4, 5, 6, 7));
        assert_eq!(
            Layer::from_bytes("raw", 2, 2, &bytes).unwrap_err(),
            LayerError::BufferSize {
                expected: 16,
                actual: 24
            }
        );
    }
    #[test]
    fn resize_nearest() {
        let mut layer = Layer::with_size("a", 2, 2);
        layer.set_pixel(Coordinates::new(1, 1), Color::BLACK, false, true);
        layer.resize(4, 4, 40, 40);
        assert_eq!(layer.max_size(), (40, 40));
        assert_eq!(layer.get_pixel(2, 2), Color::BLACK);
        assert_eq!(layer.get_pixel(3, 3), Color::BLACK);
        assert_eq!(layer.get_pixel(1, 1), Color::TRANSPARENT);
    }
}
