//! Adding, removing and reordering layers, their properties, and painting into them.

use std::sync::Arc;

use super::{Document, DocumentError};
use crate::{
    color::Color,
    commands::{Change, CommandError, PropertyValue, RootFinder},
    coords::Coordinates,
    notify::Notification,
    pixels::PixelChangeSet,
    state::{
        layer::{Layer, LayerID, RasterSnapshot},
        structure::{GroupID, LayerStructure},
    },
    util::Opacity,
};

/// Everything needed to put a layer into the document or take it back out.
///
/// Shared between both directions of the change.
#[derive(Debug)]
struct LayerPresence {
    index: usize,
    layer: Layer,
    /// Structure while the layer is present.
    with: LayerStructure,
    without: LayerStructure,
    active_with: Option<LayerID>,
    active_without: Option<LayerID>,
}
impl LayerPresence {
    fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.layer.approximate_size()
            + self.with.approximate_size()
            + self.without.approximate_size()
    }
}

fn restore_layer(document: &mut Document, presence: &Arc<LayerPresence>) -> Result<(), CommandError> {
    let id = presence.layer.id();
    if presence.index > document.layers.len() || document.layer_index(id).is_some() {
        return Err(CommandError::InvariantViolation(format!(
            "can't put {id} back at index {}",
            presence.index
        )));
    }
    document.layers.insert(presence.index, presence.layer.clone());
    document.structure = presence.with.clone();
    document.notify(Notification::LayerAdded(id));
    document.select(presence.active_with);
    Ok(())
}
fn drop_layer(document: &mut Document, presence: &Arc<LayerPresence>) -> Result<(), CommandError> {
    let id = presence.layer.id();
    if document.layers.get(presence.index).map(Layer::id) != Some(id) {
        return Err(CommandError::InvariantViolation(format!(
            "{id} is not at index {}",
            presence.index
        )));
    }
    document.layers.remove(presence.index);
    document.structure = presence.without.clone();
    document.notify(Notification::LayerRemoved(id));
    document.select(presence.active_without);
    Ok(())
}

/// One direction of a reorder.
#[derive(Debug)]
struct Placement {
    layer: LayerID,
    from: usize,
    to: usize,
    structure: LayerStructure,
}
fn place_layer(document: &mut Document, placement: &Placement) -> Result<(), CommandError> {
    if document.layers.get(placement.from).map(Layer::id) != Some(placement.layer)
        || placement.to >= document.layers.len()
    {
        return Err(CommandError::InvariantViolation(format!(
            "can't move {} from {} to {}",
            placement.layer, placement.from, placement.to
        )));
    }
    let layer = document.layers.remove(placement.from);
    document.layers.insert(placement.to, layer);
    document.structure = placement.structure.clone();
    document.notify(Notification::LayersReordered);
    Ok(())
}

/// Pixels of one layer to put in place.
#[derive(Debug)]
struct RasterEdit {
    layer: LayerID,
    raster: RasterSnapshot,
}
fn apply_raster(document: &mut Document, edit: &RasterEdit) -> Result<(), CommandError> {
    let Some(layer) = document.layer_mut(edit.layer) else {
        return Err(CommandError::InvariantViolation(format!(
            "{} is gone, can't restore its pixels",
            edit.layer
        )));
    };
    layer.restore_raster(&edit.raster);
    document.notify(Notification::LayerPixelsChanged(edit.layer));
    Ok(())
}

impl Document {
    /// Add an empty layer on top and make it active.
    pub fn add_layer(&mut self, name: impl Into<String>) -> Result<LayerID, DocumentError> {
        self.add_layer_from(Layer::new(name))
    }
    /// Add an empty layer named after the configured template.
    pub fn add_default_layer(&mut self) -> Result<LayerID, DocumentError> {
        let name = self.config.layer_name(self.layers.len() + 1);
        self.add_layer(name)
    }
    /// Add an existing layer on top and make it active. Its growth is clamped to the document.
    ///
    /// The first layer of an empty document is its initial state, and is not recorded.
    pub fn add_layer_from(&mut self, mut layer: Layer) -> Result<LayerID, DocumentError> {
        let id = layer.id();
        if self.layer_index(id).is_some() {
            return Err(DocumentError::DuplicateLayer(id));
        }
        layer.set_max_size(self.width, self.height);
        layer.is_active = false;

        if self.layers.is_empty() {
            log::debug!("{id} is the initial layer, not recorded");
            self.layers.push(layer);
            self.notify(Notification::LayerAdded(id));
            self.select(Some(id));
            return Ok(id);
        }
        let index = self.layers.len();
        self.insert_recorded(format!("Add layer {:?}", layer.name), index, layer, None)
    }
    /// Copy the layer at `index` with a fresh ID, and place the copy right above it.
    pub fn duplicate_layer(&mut self, index: usize) -> Result<LayerID, DocumentError> {
        self.check_index(index)?;
        let source = &self.layers[index];
        let mut copy = source.clone_layer(true);
        copy.name = format!("{} copy", source.name);
        copy.is_active = false;
        let description = format!("Duplicate {:?}", source.name);
        let parent = self.structure.get_group_by_layer(source.id());
        self.insert_recorded(description, index + 1, copy, parent)
    }
    fn insert_recorded(
        &mut self,
        description: String,
        index: usize,
        layer: Layer,
        parent: Option<GroupID>,
    ) -> Result<LayerID, DocumentError> {
        let id = layer.id();
        let mut order = self.layer_order();
        order.insert(index, id);
        let mut with = self.structure.clone();
        with.link(id.into(), parent);
        with.rederive(&order)?;

        let presence = Arc::new(LayerPresence {
            index,
            layer,
            with,
            without: self.structure.clone(),
            active_with: Some(id),
            active_without: self.active_layer_id(),
        });
        let size = presence.approximate_size();
        self.commit(Change::procedure(
            description,
            restore_layer,
            Arc::clone(&presence),
            drop_layer,
            presence,
            size,
        ))?;
        Ok(id)
    }
    /// Take the layer at `index` out of the document. If it was active, the layer below it becomes active.
    ///
    /// Without `record_undo`, history entries touching this layer will fail when replayed.
    pub fn remove_layer(&mut self, index: usize, record_undo: bool) -> Result<LayerID, DocumentError> {
        self.check_index(index)?;
        let layer = self.layers[index].clone();
        let id = layer.id();

        let mut order = self.layer_order();
        order.remove(index);
        let mut without = self.structure.clone();
        without.forget_layer(id, &order)?;

        let active_with = self.active_layer_id();
        let active_without = if layer.is_active {
            order.get(index.saturating_sub(1)).copied()
        } else {
            active_with
        };
        let presence = Arc::new(LayerPresence {
            index,
            layer,
            with: self.structure.clone(),
            without,
            active_with,
            active_without,
        });

        if record_undo {
            let size = presence.approximate_size();
            let description = format!("Remove layer {:?}", presence.layer.name);
            self.commit(Change::procedure(
                description,
                drop_layer,
                Arc::clone(&presence),
                restore_layer,
                presence,
                size,
            ))?;
        } else {
            log::debug!("removing {id} without history");
            drop_layer(self, &presence)?;
        }
        Ok(id)
    }
    /// Move the layer at `index` to `index + delta`.
    ///
    /// If the move would split a group, the layer joins the group of the neighbour it displaced instead.
    pub fn move_layer_index_by(&mut self, index: usize, delta: isize) -> Result<(), DocumentError> {
        self.check_index(index)?;
        let to = index
            .checked_add_signed(delta)
            .filter(|to| *to < self.layers.len())
            .ok_or(DocumentError::IndexOutOfRange {
                index: index.saturating_add_signed(delta),
                len: self.layers.len(),
            })?;
        if to == index {
            return Ok(());
        }
        let id = self.layers[index].id();
        let displaced = self.layers[to].id();
        let mut order = self.layer_order();
        order.remove(index);
        order.insert(to, id);

        let mut after = self.structure.clone();
        if let Err(err) = after.rederive(&order) {
            log::debug!("moving {id} as-is fails ({err}), joining the group of {displaced}");
            after = self.structure.clone();
            after.link(id.into(), self.structure.get_group_by_layer(displaced));
            after.rederive(&order)?;
        }

        let size = self.structure.approximate_size() + after.approximate_size();
        let forward = Placement {
            layer: id,
            from: index,
            to,
            structure: after,
        };
        let reverse = Placement {
            layer: id,
            from: to,
            to: index,
            structure: self.structure.clone(),
        };
        self.commit(Change::procedure(
            "Move layer",
            place_layer,
            forward,
            place_layer,
            reverse,
            size,
        ))?;
        Ok(())
    }
    /// Make the layer at `index` the only active one. Not recorded.
    pub fn set_active_layer(&mut self, index: usize) -> Result<(), DocumentError> {
        self.check_index(index)?;
        let id = self.layers[index].id();
        self.select(Some(id));
        Ok(())
    }
    /// Activate the layer below `index`, or the bottom layer if `index` is 0. Not recorded.
    ///
    /// Used after the layer at `index` went away.
    pub fn set_next_layer_as_active(&mut self, index: usize) {
        let next = index
            .saturating_sub(1)
            .min(self.layers.len().saturating_sub(1));
        let id = self.layers.get(next).map(Layer::id);
        self.select(id);
    }
    pub fn rename_layer(&mut self, id: LayerID, name: impl Into<String>) -> Result<(), DocumentError> {
        self.commit_property(
            "Rename layer".to_owned(),
            RootFinder::layer(id),
            PropertyValue::Name(name.into()),
        )
    }
    pub fn set_layer_visibility(&mut self, id: LayerID, visible: bool) -> Result<(), DocumentError> {
        let description = if visible { "Show layer" } else { "Hide layer" };
        self.commit_property(
            description.to_owned(),
            RootFinder::layer(id),
            PropertyValue::Visible(visible),
        )
    }
    /// Set a layer's opacity, clamped into `0.0..=1.0`.
    pub fn set_layer_opacity(&mut self, id: LayerID, opacity: f32) -> Result<(), DocumentError> {
        let opacity = Opacity::new(opacity)?;
        self.commit_property(
            "Layer opacity".to_owned(),
            RootFinder::layer(id),
            PropertyValue::Opacity(opacity),
        )
    }
    /// Write pixels in document space, growing and clipping the layer as needed.
    ///
    /// Nothing is recorded if the layer ends up unchanged.
    pub fn paint(&mut self, id: LayerID, changes: &PixelChangeSet) -> Result<(), DocumentError> {
        let layer = self.layer(id).ok_or(DocumentError::UnknownLayer(id))?;
        let before = layer.raster_snapshot();
        let mut painted = layer.clone();
        painted.set_pixels(changes, true, true);
        let after = painted.raster_snapshot();
        if after == before {
            log::trace!("painting {} pixels changed nothing on {id}", changes.len());
            return Ok(());
        }

        let size = before.approximate_size() + after.approximate_size();
        self.commit(Change::procedure(
            "Paint",
            apply_raster,
            RasterEdit {
                layer: id,
                raster: after,
            },
            apply_raster,
            RasterEdit {
                layer: id,
                raster: before,
            },
            size,
        ))?;
        Ok(())
    }
    /// Bucket fill from `start` (document space), as one recorded paint. Returns the pixel count filled.
    pub fn flood_fill(
        &mut self,
        id: LayerID,
        start: Coordinates,
        color: Color,
    ) -> Result<usize, DocumentError> {
        let layer = self.layer(id).ok_or(DocumentError::UnknownLayer(id))?;
        let changes = crate::fill::flood_fill(layer, self.width, self.height, start, color);
        if !changes.is_empty() {
            self.paint(id, &changes)?;
        }
        Ok(changes.len())
    }
}
