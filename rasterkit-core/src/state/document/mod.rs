//! # Document
//!
//! The composition root: an ordered list of layers, the group structure over them, and the history of
//! every change made to either.
//!
//! Layer index 0 is the bottom-most layer. Public mutators are recorded unless documented otherwise, and
//! take effect through [`Document::commit`] so the forward direction of a change is the only code path
//! that performs it.

mod canvas;
mod groups;
mod layers;
mod merge;

use crate::{
    commands::{
        undo::UndoManager, Change, ChangeKind, CommandConsumer, CommandError, DoUndo, PropertyKind,
        PropertyTarget, PropertyValue, RootFinder,
    },
    config::EditorConfig,
    coords::Rect,
    notify::{Notification, Notifier},
    state::{
        layer::{Layer, LayerError, LayerID},
        structure::{LayerStructure, StructureError, StructureID},
    },
    util::{Opacity, OpacityError},
};

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("layer index {index} out of range for {len} layers")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("layer {0} not found")]
    UnknownLayer(LayerID),
    #[error("layer {0} is already in the document")]
    DuplicateLayer(LayerID),
    #[error("layer {0} can't be merged")]
    NotMergeable(LayerID),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error("bad opacity: {0}")]
    Opacity(#[from] OpacityError),
}

pub struct Document {
    width: u32,
    height: u32,
    /// Bottom to top.
    layers: Vec<Layer>,
    structure: LayerStructure,
    history: UndoManager,
    notifier: Notifier,
    config: EditorConfig,
}
impl Default for Document {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self::with_config(config.default_width, config.default_height, &config)
    }
}
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers.len())
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}
impl Document {
    /// An empty document of the given size, with default settings.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_config(width, height, &EditorConfig::default())
    }
    #[must_use]
    pub fn with_config(width: u32, height: u32, config: &EditorConfig) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            structure: LayerStructure::default(),
            history: UndoManager::new(config.history_warning_bytes),
            notifier: Notifier::default(),
            config: config.clone(),
        }
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
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
    /// Bottom to top.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn layer_at(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }
    #[must_use]
    pub fn layer_index(&self, id: LayerID) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }
    /// Unrecorded access for tools that draw previews. Anything done through this can't be undone, and
    /// may confuse history recorded afterwards if left in place.
    pub fn layer_mut(&mut self, id: LayerID) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.is_active)
    }
    #[must_use]
    pub fn active_layer_index(&self) -> Option<usize> {
        self.layers.iter().position(|layer| layer.is_active)
    }
    #[must_use]
    pub fn structure(&self) -> &LayerStructure {
        &self.structure
    }
    #[must_use]
    pub fn undo_manager(&self) -> &UndoManager {
        &self.history
    }
    /// Union of the content of every layer, in document space.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        Self::union_of(self.layers.iter().filter_map(Layer::content_bounds))
    }
    /// Whether the layer and every group containing it are visible.
    #[must_use]
    pub fn final_visibility(&self, id: LayerID) -> Option<bool> {
        let layer = self.layer(id)?;
        Some(self.structure.final_visibility(id, layer.is_visible))
    }
    /// The layer's opacity, multiplied by that of every group containing it.
    #[must_use]
    pub fn final_opacity(&self, id: LayerID) -> Option<Opacity> {
        let layer = self.layer(id)?;
        Some(self.structure.final_opacity(id, layer.opacity))
    }
    /// Receive a [`Notification`] for every change from now on.
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Apply a change and record it in the history. Nothing is recorded if it fails.
    pub fn commit(&mut self, change: Change) -> Result<(), CommandError> {
        self.apply(DoUndo::Do(&change))?;
        self.history.record(change);
        self.notify(Notification::HistoryChanged);
        Ok(())
    }
    /// Undo the most recent change. `Ok(false)` if there was nothing to undo.
    ///
    /// A change that fails to undo is dropped from the history entirely.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let Some(change) = self.history.pop_undo() else {
            return Ok(false);
        };
        self.replay(change, true)
    }
    /// Redo the most recently undone change. `Ok(false)` if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let Some(change) = self.history.pop_redo() else {
            return Ok(false);
        };
        self.replay(change, false)
    }
    /// Undo up to `n` changes, returning how many were undone.
    pub fn undo_n(&mut self, n: usize) -> Result<usize, CommandError> {
        for done in 0..n {
            if !self.undo()? {
                return Ok(done);
            }
        }
        Ok(n)
    }
    /// Redo up to `n` changes, returning how many were redone.
    pub fn redo_n(&mut self, n: usize) -> Result<usize, CommandError> {
        for done in 0..n {
            if !self.redo()? {
                return Ok(done);
            }
        }
        Ok(n)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
    fn replay(&mut self, change: Change, undo: bool) -> Result<bool, CommandError> {
        self.history.set_replaying(true);
        let result = self.apply(direction(&change, undo));
        self.history.set_replaying(false);
        self.notify(Notification::HistoryChanged);

        match result {
            Ok(()) => {
                log::trace!(
                    "{} {:?}",
                    if undo { "undid" } else { "redid" },
                    change.description()
                );
                if undo {
                    self.history.push_redo(change);
                } else {
                    self.history.push_undo(change);
                }
                Ok(true)
            }
            Err(err) => {
                log::error!(
                    "dropping {:?} from history, it no longer applies: {err}",
                    change.description()
                );
                Err(err)
            }
        }
    }

    /// Look up anything with properties. This is the default [`RootFinder`] procedure.
    pub fn find_property_target(&mut self, key: StructureID) -> Option<&mut dyn PropertyTarget> {
        match key {
            StructureID::Layer(id) => self
                .layer_mut(id)
                .map(|layer| layer as &mut dyn PropertyTarget),
            StructureID::Group(id) => self
                .structure
                .group_mut(id)
                .map(|group| group as &mut dyn PropertyTarget),
        }
    }
    /// Record a property change on a layer or group, unless it already has that value.
    fn commit_property(
        &mut self,
        description: String,
        root: RootFinder,
        to: PropertyValue,
    ) -> Result<(), DocumentError> {
        let from = {
            let Some(target) = (root.find)(self, root.key) else {
                return Err(match root.key {
                    StructureID::Layer(id) => DocumentError::UnknownLayer(id),
                    StructureID::Group(id) => StructureError::UnknownGroup(id).into(),
                });
            };
            target
                .property(to.kind())
                .ok_or(CommandError::UnknownResource)?
        };
        if from == to {
            return Ok(());
        }
        self.commit(Change::property(description, root, from, to))?;
        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        self.notifier.notify(&notification);
    }
    fn notify_property(&mut self, key: StructureID, kind: PropertyKind) {
        let notification = match key {
            StructureID::Layer(layer) => Notification::LayerPropertyChanged {
                layer,
                property: kind.into(),
            },
            StructureID::Group(group) => Notification::GroupChanged(group),
        };
        self.notify(notification);
    }
    fn layer_order(&self) -> Vec<LayerID> {
        self.layers.iter().map(Layer::id).collect()
    }
    fn check_index(&self, index: usize) -> Result<(), DocumentError> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(DocumentError::IndexOutOfRange {
                index,
                len: self.layers.len(),
            })
        }
    }
    fn active_layer_id(&self) -> Option<LayerID> {
        self.active_layer().map(Layer::id)
    }
    /// Make `active` the only active layer.
    fn select(&mut self, active: Option<LayerID>) {
        let previous = self.active_layer_id();
        for layer in &mut self.layers {
            layer.is_active = Some(layer.id()) == active;
        }
        let now = self.active_layer_id();
        if previous != now {
            self.notify(Notification::ActiveLayerChanged(now));
        }
    }
    fn union_of(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
        rects.into_iter().reduce(|a, b| a.union(&b))
    }
}

fn direction(change: &Change, undo: bool) -> DoUndo<'_, Change> {
    if undo {
        DoUndo::Undo(change)
    } else {
        DoUndo::Do(change)
    }
}

impl CommandConsumer<Change> for Document {
    fn apply(&mut self, command: DoUndo<'_, Change>) -> Result<(), CommandError> {
        let (change, undo) = match command {
            DoUndo::Do(change) => (change, false),
            DoUndo::Undo(change) => (change, true),
        };
        match change.kind() {
            ChangeKind::Property(property) => {
                property.assign(self, undo)?;
                self.notify_property(property.root.key, property.to.kind());
                Ok(())
            }
            ChangeKind::Procedure(procedure) => {
                if undo {
                    procedure.reverse.run(self)
                } else {
                    procedure.forward.run(self)
                }
            }
            ChangeKind::Scope(children) => {
                let order: Vec<&Change> = if undo {
                    children.iter().rev().collect()
                } else {
                    children.iter().collect()
                };
                for (done, child) in order.iter().enumerate() {
                    if let Err(err) = self.apply(direction(child, undo)) {
                        // Take back the part of the scope that did apply.
                        for applied in order[..done].iter().rev() {
                            if let Err(rollback) = self.apply(direction(applied, undo).reversed()) {
                                log::error!(
                                    "rolling back {:?} failed: {rollback}",
                                    applied.description()
                                );
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}
