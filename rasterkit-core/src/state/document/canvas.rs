//! Whole-canvas operations: resizing, scaling, centering and clipping.

use az::SaturatingAs;

use super::{Document, DocumentError};
use crate::{
    commands::{Change, CommandError, PropertyValue, RootFinder},
    coords::{AnchorPoint, Coordinates},
    notify::Notification,
    state::layer::{Layer, LayerID, RasterSnapshot},
};

/// New document size, and how far every layer moves to get there.
#[derive(Debug)]
struct CanvasShift {
    width: u32,
    height: u32,
    delta: Coordinates,
}
fn shift_canvas(document: &mut Document, shift: &CanvasShift) -> Result<(), CommandError> {
    for layer in &mut document.layers {
        layer.set_offset(layer.offset() + shift.delta);
        layer.set_max_size(shift.width, shift.height);
    }
    document.set_size(shift.width, shift.height);
    Ok(())
}

/// Document size together with the pixels of every layer.
#[derive(Debug)]
struct DocumentRasters {
    width: u32,
    height: u32,
    rasters: Vec<(LayerID, RasterSnapshot)>,
}
impl DocumentRasters {
    fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .rasters
                .iter()
                .map(|(_, raster)| raster.approximate_size())
                .sum::<usize>()
    }
}
fn restore_rasters(document: &mut Document, state: &DocumentRasters) -> Result<(), CommandError> {
    // All or nothing.
    if let Some((missing, _)) = state
        .rasters
        .iter()
        .find(|(id, _)| document.layer_index(*id).is_none())
    {
        return Err(CommandError::InvariantViolation(format!(
            "{missing} is gone, can't restore canvas"
        )));
    }
    for (id, raster) in &state.rasters {
        if let Some(layer) = document.layer_mut(*id) {
            layer.restore_raster(raster);
        }
        document.notify(Notification::LayerPixelsChanged(*id));
    }
    document.set_size(state.width, state.height);
    Ok(())
}

impl Document {
    fn set_size(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.notify(Notification::DocumentResized { width, height });
        }
    }
    fn rasters(&self) -> DocumentRasters {
        DocumentRasters {
            width: self.width,
            height: self.height,
            rasters: self
                .layers
                .iter()
                .map(|layer| (layer.id(), layer.raster_snapshot()))
                .collect(),
        }
    }
    fn commit_rasters(
        &mut self,
        description: &str,
        after: DocumentRasters,
    ) -> Result<(), DocumentError> {
        let before = self.rasters();
        let size = before.approximate_size() + after.approximate_size();
        self.commit(Change::procedure(
            description,
            restore_rasters,
            after,
            restore_rasters,
            before,
            size,
        ))?;
        Ok(())
    }
    /// Change the document size without scaling anything. Layers keep their pixels, moved according to
    /// `anchor`, and content that ends up outside of the document is kept.
    pub fn resize_canvas(
        &mut self,
        width: u32,
        height: u32,
        anchor: AnchorPoint,
    ) -> Result<(), DocumentError> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let delta = anchor.offset((self.width, self.height), (width, height));
        let forward = CanvasShift {
            width,
            height,
            delta,
        };
        let reverse = CanvasShift {
            width: self.width,
            height: self.height,
            delta: Coordinates::ZERO - delta,
        };
        self.commit(Change::procedure(
            format!("Resize canvas to {width}x{height}"),
            shift_canvas,
            forward,
            shift_canvas,
            reverse,
            0,
        ))?;
        Ok(())
    }
    /// Scale the document and every layer, nearest-neighbour.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), DocumentError> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let scale_x = f64::from(width) / f64::from(self.width.max(1));
        let scale_y = f64::from(height) / f64::from(self.height.max(1));
        let scale = |value: f64, factor: f64| (value * factor).round();

        let rasters = self
            .layers
            .iter()
            .map(|layer| {
                let mut scaled = layer.clone();
                scaled.resize(
                    scale(f64::from(layer.width()), scale_x).saturating_as(),
                    scale(f64::from(layer.height()), scale_y).saturating_as(),
                    width,
                    height,
                );
                let offset = layer.offset();
                scaled.set_offset(Coordinates::new(
                    scale(f64::from(offset.x), scale_x).saturating_as(),
                    scale(f64::from(offset.y), scale_y).saturating_as(),
                ));
                (layer.id(), scaled.raster_snapshot())
            })
            .collect();
        self.commit_rasters(
            &format!("Resize to {width}x{height}"),
            DocumentRasters {
                width,
                height,
                rasters,
            },
        )
    }
    /// Move every visible layer so the centre of their combined content lands on the document centre.
    pub fn center_content(&mut self) -> Result<(), DocumentError> {
        let Some(content) =
            Self::union_of(self.layers.iter().filter(|l| l.is_visible).filter_map(Layer::content_bounds))
        else {
            return Ok(());
        };
        let target = Coordinates::new(
            (self.width / 2).saturating_as(),
            (self.height / 2).saturating_as(),
        );
        let delta = target - content.center();
        if delta == Coordinates::ZERO {
            return Ok(());
        }
        log::debug!("centering content {content:?} moves it by {delta:?}");

        let moves: Vec<Change> = self
            .layers
            .iter()
            .filter(|layer| layer.is_visible)
            .map(|layer| {
                Change::property(
                    "Move layer",
                    RootFinder::layer(layer.id()),
                    PropertyValue::Offset(layer.offset()),
                    PropertyValue::Offset(layer.offset() + delta),
                )
            })
            .collect();
        if let Some(change) = Change::scope("Center content", moves) {
            self.commit(change)?;
        }
        Ok(())
    }
    /// Clip every layer to its content, then shrink the document to their union, moved to the origin.
    ///
    /// Does nothing if no layer has content.
    pub fn clip_canvas(&mut self) -> Result<(), DocumentError> {
        let clipped: Vec<Layer> = self
            .layers
            .iter()
            .map(|layer| {
                let mut clipped = layer.clone();
                clipped.clip_canvas();
                clipped
            })
            .collect();
        let Some(content) = Self::union_of(clipped.iter().filter_map(Layer::content_bounds)) else {
            return Ok(());
        };
        let delta = Coordinates::ZERO - content.origin();

        let rasters = clipped
            .into_iter()
            .map(|mut layer| {
                layer.set_offset(layer.offset() + delta);
                layer.set_max_size(content.width, content.height);
                (layer.id(), layer.raster_snapshot())
            })
            .collect();
        let after = DocumentRasters {
            width: content.width,
            height: content.height,
            rasters,
        };
        if after.width == self.width
            && after.height == self.height
            && after
                .rasters
                .iter()
                .zip(&self.layers)
                .all(|((_, raster), layer)| *raster == layer.raster_snapshot())
        {
            return Ok(());
        }
        self.commit_rasters("Clip canvas", after)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::document::test::black_pixel;

    fn ceil_half(value: u32) -> i32 {
        value.div_ceil(2).saturating_as()
    }

    #[test]
    fn resize_canvas_sets_size() {
        for (old_w, old_h, new_w, new_h) in [(10, 10, 20, 20), (1, 2, 5, 8), (20, 20, 10, 10)] {
            let mut document = Document::new(old_w, old_h);
            document
                .resize_canvas(new_w, new_h, AnchorPoint::TOP_LEFT)
                .unwrap();
            assert_eq!((document.width(), document.height()), (new_w, new_h));
        }
    }
    #[test]
    fn resize_canvas_anchors() {
        let mut document = Document::new(10, 10);
        let id = document.add_layer("a").unwrap();
        black_pixel(&mut document, 2, 3);

        document
            .resize_canvas(20, 14, AnchorPoint::BOTTOM_RIGHT)
            .unwrap();
        let layer = document.layer(id).unwrap();
        assert_eq!(layer.offset(), Coordinates::new(12, 7));
        assert_eq!(layer.max_size(), (20, 14));

        document.undo().unwrap();
        assert_eq!((document.width(), document.height()), (10, 10));
        let layer = document.layer(id).unwrap();
        assert_eq!(layer.offset(), Coordinates::new(2, 3));
        assert_eq!(layer.max_size(), (10, 10));

        document.redo().unwrap();
        document.resize_canvas(10, 10, AnchorPoint::CENTER).unwrap();
        assert_eq!(
            document.layer(id).unwrap().offset(),
            Coordinates::new(7, 5)
        );
    }
    #[test]
    fn resize_sets_size() {
        for (old_w, old_h, new_w, new_h) in [(10, 10, 20, 20), (5, 8, 10, 16)] {
            let mut document = Document::new(old_w, old_h);
            document.resize(new_w, new_h).unwrap();
            assert_eq!((document.width(), document.height()), (new_w, new_h));
        }
    }
    #[test]
    fn resize_scales_layers() {
        let mut document = Document::new(10, 10);
        let id = document.add_layer("a").unwrap();
        black_pixel(&mut document, 2, 3);
        black_pixel(&mut document, 3, 3);

        document.resize(20, 20).unwrap();
        let layer = document.layer(id).unwrap();
        assert_eq!(layer.offset(), Coordinates::new(4, 6));
        assert_eq!((layer.width(), layer.height()), (4, 2));
        assert_eq!(layer.get_pixel_with_offset(7, 7), crate::color::Color::BLACK);

        document.undo().unwrap();
        let layer = document.layer(id).unwrap();
        assert_eq!((layer.width(), layer.height()), (2, 1));
        assert_eq!(document.width(), 10);
    }
    #[test]
    fn clip_single_layer() {
        for (size, extra) in [(10, (0, 0)), (50, (10, 49))] {
            let mut document = Document::new(size, size);
            let id = document.add_layer("test").unwrap();
            black_pixel(&mut document, ceil_half(size), ceil_half(size));
            black_pixel(&mut document, extra.0, extra.1);

            document.clip_canvas().unwrap();
            let layer = document.layer(id).unwrap();
            assert_eq!(layer.width(), document.width());
            assert_eq!(layer.height(), document.height());
            assert_eq!(layer.offset(), Coordinates::ZERO);
        }
    }
    #[test]
    fn clip_multiple_layers() {
        for (size, second) in [(10, (0, 0)), (50, (15, 23)), (3, (1, 1))] {
            let mut document = Document::new(size, size);
            document.add_layer("test").unwrap();
            black_pixel(&mut document, ceil_half(size), ceil_half(size));
            document.add_layer("test2").unwrap();
            black_pixel(&mut document, second.0, second.1);

            document.clip_canvas().unwrap();
            let [first, second] = document.layers() else {
                panic!("expected two layers");
            };
            let extent = |a: i32, b: i32| (a - b).unsigned_abs() + 1;
            let width = extent(
                second.bounds().right(),
                first.bounds().right(),
            );
            let height = extent(
                second.bounds().bottom(),
                first.bounds().bottom(),
            );
            assert_eq!((document.width(), document.height()), (width, height));
        }
    }
    #[test]
    fn clip_undo_and_noop() {
        let mut document = Document::new(10, 10);
        let id = document.add_layer("a").unwrap();
        document.clip_canvas().unwrap();
        assert!(!document.can_undo());

        black_pixel(&mut document, 4, 5);
        document.clip_canvas().unwrap();
        assert_eq!((document.width(), document.height()), (1, 1));
        assert_eq!(document.layer(id).unwrap().offset(), Coordinates::ZERO);

        document.clip_canvas().unwrap();
        assert_eq!(document.undo_manager().undo_len(), 1);

        document.undo().unwrap();
        assert_eq!((document.width(), document.height()), (10, 10));
        assert_eq!(document.layer(id).unwrap().offset(), Coordinates::new(4, 5));
    }
    #[test]
    fn center_single_layer() {
        for (width, height) in [(10, 10), (11, 11), (25, 17)] {
            let mut document = Document::new(width, height);
            let id = document.add_layer("test").unwrap();
            black_pixel(&mut document, 0, 0);

            document.center_content().unwrap();
            let offset = document.layer(id).unwrap().offset();
            assert_eq!(offset, Coordinates::new(width as i32 / 2, height as i32 / 2));
        }
    }
    #[test]
    fn center_multiple_layers() {
        for (width, height) in [(10, 10), (11, 11), (25, 17)] {
            let mut document = Document::new(width, height);
            let a = document.add_layer("test").unwrap();
            black_pixel(&mut document, 0, 0);
            let b = document.add_layer("test2").unwrap();
            black_pixel(&mut document, 1, 1);

            document.center_content().unwrap();
            let (mid_w, mid_h) = (width as i32 / 2, height as i32 / 2);
            assert_eq!(
                document.layer(a).unwrap().offset(),
                Coordinates::new(mid_w - 1, mid_h - 1)
            );
            assert_eq!(
                document.layer(b).unwrap().offset(),
                Coordinates::new(mid_w, mid_h)
            );

            document.undo().unwrap();
            assert_eq!(document.layer(a).unwrap().offset(), Coordinates::ZERO);
            assert_eq!(
                document.layer(b).unwrap().offset(),
                Coordinates::new(1, 1)
            );
        }
    }
    #[test]
    fn center_skips_hidden() {
        let mut document = Document::new(10, 10);
        let hidden = document.add_layer("hidden").unwrap();
        black_pixel(&mut document, 9, 9);
        document.layer_mut(hidden).unwrap().is_visible = false;
        document.add_layer("shown").unwrap();
        black_pixel(&mut document, 0, 0);

        document.center_content().unwrap();
        assert_eq!(
            document.layer(hidden).unwrap().offset(),
            Coordinates::new(9, 9)
        );
        assert_eq!(
            document.active_layer().unwrap().offset(),
            Coordinates::new(5, 5)
        );
    }
}
