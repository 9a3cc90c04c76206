//! Flattening two layers into one.

use std::sync::Arc;

use super::{Document, DocumentError};
use crate::{
    blend,
    color::Color,
    commands::{Change, CommandError},
    notify::Notification,
    state::{
        layer::{Layer, LayerID},
        structure::LayerStructure,
    },
    util::Opacity,
};

#[derive(Debug)]
struct MergeArgs {
    lower_index: usize,
    upper_index: usize,
    /// Both inputs as they were, `lower` also being the identity of `merged`.
    lower: Layer,
    upper: Layer,
    merged: Layer,
    before: LayerStructure,
    after: LayerStructure,
    active_before: Option<LayerID>,
    active_after: Option<LayerID>,
}
impl MergeArgs {
    fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.lower.approximate_size()
            + self.upper.approximate_size()
            + self.merged.approximate_size()
            + self.before.approximate_size()
            + self.after.approximate_size()
    }
    fn mismatch(&self) -> CommandError {
        CommandError::InvariantViolation(format!(
            "merge of {} and {} no longer matches the layers",
            self.lower.id(),
            self.upper.id()
        ))
    }
}

fn apply_merge(document: &mut Document, args: &Arc<MergeArgs>) -> Result<(), CommandError> {
    let at = |index: usize| document.layers.get(index).map(Layer::id);
    if at(args.lower_index) != Some(args.lower.id()) || at(args.upper_index) != Some(args.upper.id()) {
        return Err(args.mismatch());
    }
    document.layers[args.lower_index] = args.merged.clone();
    document.layers.remove(args.upper_index);
    document.structure = args.after.clone();
    document.notify(Notification::LayerRemoved(args.upper.id()));
    document.notify(Notification::LayerPixelsChanged(args.lower.id()));
    document.select(args.active_after);
    Ok(())
}
fn undo_merge(document: &mut Document, args: &Arc<MergeArgs>) -> Result<(), CommandError> {
    if document.layers.get(args.lower_index).map(Layer::id) != Some(args.merged.id())
        || args.upper_index > document.layers.len()
        || document.layer_index(args.upper.id()).is_some()
    {
        return Err(args.mismatch());
    }
    document.layers[args.lower_index] = args.lower.clone();
    document.layers.insert(args.upper_index, args.upper.clone());
    document.structure = args.before.clone();
    document.notify(Notification::LayerAdded(args.upper.id()));
    document.notify(Notification::LayerPixelsChanged(args.lower.id()));
    document.select(args.active_before);
    Ok(())
}

/// Composite `upper` over `lower`, each weighted by its opacity, over the union of their areas.
fn flatten(lower: &Layer, upper: &Layer, name: String) -> Result<Layer, DocumentError> {
    let area = lower.bounds().union(&upper.bounds());
    let pixels: Vec<Color> = area
        .coordinates()
        .map(|at| {
            blend::alpha_over(
                lower.get_pixel_with_offset(at.x, at.y),
                lower.opacity,
                upper.get_pixel_with_offset(at.x, at.y),
                upper.opacity,
            )
        })
        .collect();
    let mut merged = Layer::from_bytes(name, area.width, area.height, bytemuck::cast_slice(&pixels))?;
    merged.set_offset(area.origin());
    Ok(merged)
}

impl Document {
    /// Nearest layer above `index` that takes part in merges.
    #[must_use]
    pub fn mergeable_layer_above_index(&self, index: usize) -> Option<usize> {
        (index.saturating_add(1)..self.layers.len()).find(|i| self.layers[*i].is_mergeable)
    }
    /// Nearest layer below `index` that takes part in merges.
    #[must_use]
    pub fn mergeable_layer_below_index(&self, index: usize) -> Option<usize> {
        (0..index.min(self.layers.len()))
            .rev()
            .find(|i| self.layers[*i].is_mergeable)
    }
    /// Flatten two layers into one, at the lower position and with the lower layer's identity.
    ///
    /// The result is fully opaque, with the inputs' opacities baked into its pixels. Visibility of the
    /// inputs is not considered. Returns the ID of the merged layer.
    pub fn merge_layers(
        &mut self,
        lower: usize,
        upper: usize,
        keep_upper_name: bool,
    ) -> Result<LayerID, DocumentError> {
        self.check_index(lower)?;
        self.check_index(upper)?;
        let (lower_index, upper_index) = match lower.cmp(&upper) {
            std::cmp::Ordering::Less => (lower, upper),
            std::cmp::Ordering::Greater => (upper, lower),
            std::cmp::Ordering::Equal => return Err(CommandError::NoOp.into()),
        };
        let lower = self.layers[lower_index].clone();
        let upper = self.layers[upper_index].clone();
        for layer in [&lower, &upper] {
            if !layer.is_mergeable {
                return Err(DocumentError::NotMergeable(layer.id()));
            }
        }

        let name = if keep_upper_name {
            upper.name.clone()
        } else {
            lower.name.clone()
        };
        let mut merged = flatten(&lower, &upper, name)?;
        merged.change_id(lower.id());
        merged.is_visible = lower.is_visible;
        merged.opacity = Opacity::OPAQUE;
        merged.is_mergeable = true;
        merged.set_max_size(self.width, self.height);
        merged.clip_canvas();

        let mut order = self.layer_order();
        order.remove(upper_index);
        let mut after = self.structure.clone();
        after.forget_layer(upper.id(), &order)?;

        let active_before = self.active_layer_id();
        let active_after = if lower.is_active || upper.is_active {
            Some(lower.id())
        } else {
            active_before
        };
        let description = format!("Merge {:?} into {:?}", upper.name, lower.name);
        let id = lower.id();
        let args = Arc::new(MergeArgs {
            lower_index,
            upper_index,
            lower,
            upper,
            merged,
            before: self.structure.clone(),
            after,
            active_before,
            active_after,
        });
        let size = args.approximate_size();
        self.commit(Change::procedure(
            description,
            apply_merge,
            Arc::clone(&args),
            undo_merge,
            args,
            size,
        ))?;
        Ok(id)
    }
    /// Merge the layer at `index` with the nearest mergeable layer above it.
    pub fn merge_with_above(&mut self, index: usize) -> Result<LayerID, DocumentError> {
        self.check_index(index)?;
        let above = self
            .mergeable_layer_above_index(index)
            .ok_or(DocumentError::NotMergeable(self.layers[index].id()))?;
        self.merge_layers(index, above, false)
    }
    /// Merge the layer at `index` into the nearest mergeable layer below it.
    pub fn merge_with_below(&mut self, index: usize) -> Result<LayerID, DocumentError> {
        self.check_index(index)?;
        let below = self
            .mergeable_layer_below_index(index)
            .ok_or(DocumentError::NotMergeable(self.layers[index].id()))?;
        self.merge_layers(below, index, false)
    }
}
