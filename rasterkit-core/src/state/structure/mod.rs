//! # Structure
//!
//! Layers live in a flat, ordered list. Groups are folders over contiguous runs of that list, and may nest.
//!
//! Membership is stored as links only: each layer knows its direct parent group, each group knows its own
//! parent. The layer range a group covers is derived from those links and the current layer order, and is
//! re-derived after every structural mutation. A group that no longer contains any layers ceases to exist.

use crate::{
    commands::{CommandError, PropertyKind, PropertyTarget, PropertyValue},
    state::layer::LayerID,
    util::Opacity,
};

pub type GroupID = crate::RasterID<GroupItem>;

/// Either a layer or a group.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StructureID {
    Layer(LayerID),
    Group(GroupID),
}
impl From<LayerID> for StructureID {
    fn from(value: LayerID) -> Self {
        Self::Layer(value)
    }
}
impl From<GroupID> for StructureID {
    fn from(value: GroupID) -> Self {
        Self::Group(value)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("layer {0} is not in the document")]
    UnknownLayer(LayerID),
    #[error("group {0} not found")]
    UnknownGroup(GroupID),
    #[error("can't reparent a group into its own [grand]children")]
    WouldCycle,
    #[error("layers of {0} would not be contiguous")]
    NonContiguous(GroupID),
    #[error("{0} is its own ancestor")]
    Cycle(GroupID),
}

#[derive(Clone, PartialEq, Debug)]
pub struct GroupItem {
    id: GroupID,
    // NOT public, derived from the layer order.
    start_layer: LayerID,
    end_layer: LayerID,
    // NOT public, could form a cycle.
    parent: Option<GroupID>,
    pub name: String,
    pub is_visible: bool,
    pub opacity: Opacity,
    pub is_expanded: bool,
}
impl GroupItem {
    #[must_use]
    pub fn id(&self) -> GroupID {
        self.id
    }
    /// Bottom-most layer of this group, inclusive.
    #[must_use]
    pub fn start_layer(&self) -> LayerID {
        self.start_layer
    }
    /// Top-most layer of this group, inclusive.
    #[must_use]
    pub fn end_layer(&self) -> LayerID {
        self.end_layer
    }
    #[must_use]
    pub fn parent(&self) -> Option<GroupID> {
        self.parent
    }
}
impl PropertyTarget for GroupItem {
    fn property(&self, kind: PropertyKind) -> Option<PropertyValue> {
        match kind {
            PropertyKind::Name => Some(PropertyValue::Name(self.name.clone())),
            PropertyKind::Visible => Some(PropertyValue::Visible(self.is_visible)),
            PropertyKind::Opacity => Some(PropertyValue::Opacity(self.opacity)),
            PropertyKind::Offset => None,
        }
    }
    fn set_property(&mut self, value: PropertyValue) -> Result<(), CommandError> {
        match value {
            PropertyValue::Name(name) => self.name = name,
            PropertyValue::Visible(visible) => self.is_visible = visible,
            PropertyValue::Opacity(opacity) => self.opacity = opacity,
            PropertyValue::Offset(_) => return Err(CommandError::UnknownResource),
        }
        Ok(())
    }
}

/// Extent of a group within the layer order, while deriving.
#[derive(Clone, Copy)]
struct Extent {
    min: usize,
    max: usize,
    count: usize,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct LayerStructure {
    groups: hashbrown::HashMap<GroupID, GroupItem>,
    layer_parents: hashbrown::HashMap<LayerID, GroupID>,
}
impl LayerStructure {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
    #[must_use]
    pub fn group(&self, id: GroupID) -> Option<&GroupItem> {
        self.groups.get(&id)
    }
    /// Only presentation fields are reachable through this. Membership goes through [`Self::assign_parent`].
    pub fn group_mut(&mut self, id: GroupID) -> Option<&mut GroupItem> {
        self.groups.get_mut(&id)
    }
    /// All groups, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupItem> + '_ {
        self.groups.values()
    }
    /// Direct parent group of a layer.
    #[must_use]
    pub fn get_group_by_layer(&self, layer: LayerID) -> Option<GroupID> {
        self.layer_parents.get(&layer).copied()
    }
    /// Direct parent group of a layer or group.
    #[must_use]
    pub fn parent_of(&self, target: StructureID) -> Option<GroupID> {
        match target {
            StructureID::Layer(layer) => self.get_group_by_layer(layer),
            StructureID::Group(group) => self.groups.get(&group)?.parent,
        }
    }
    /// Groups containing `group`, nearest first. Stops early if the links form a cycle.
    pub fn ancestors(&self, group: GroupID) -> impl Iterator<Item = GroupID> + '_ {
        std::iter::successors(self.groups.get(&group).and_then(|g| g.parent), |id| {
            self.groups.get(id).and_then(|g| g.parent)
        })
        .take(self.groups.len())
    }
    /// Nesting depth. Top-level groups are 0.
    #[must_use]
    pub fn depth(&self, group: GroupID) -> usize {
        self.ancestors(group).count()
    }
    /// Strict ancestry: whether `ancestor` contains `candidate`, at any depth.
    #[must_use]
    pub fn is_child_of(&self, candidate: GroupID, ancestor: GroupID) -> bool {
        self.ancestors(candidate).any(|id| id == ancestor)
    }
    /// Whether `group` contains `layer`, at any depth.
    #[must_use]
    pub fn is_layer_child_of(&self, layer: LayerID, group: GroupID) -> bool {
        self.get_group_by_layer(layer)
            .is_some_and(|parent| parent == group || self.is_child_of(parent, group))
    }
    /// Every layer within the group's range, nested groups included, bottom to top.
    #[must_use]
    pub fn get_group_layers(&self, group: GroupID, order: &[LayerID]) -> Vec<LayerID> {
        let Some(item) = self.groups.get(&group) else {
            return Vec::new();
        };
        let position = |id: LayerID| order.iter().position(|l| *l == id);
        match (position(item.start_layer), position(item.end_layer)) {
            (Some(start), Some(end)) if start <= end => order[start..=end].to_vec(),
            _ => Vec::new(),
        }
    }
    /// Combined visibility of a layer and every group containing it.
    #[must_use]
    pub fn final_visibility(&self, layer: LayerID, own: bool) -> bool {
        own && self.containing_groups(layer).all(|g| g.is_visible)
    }
    /// Combined opacity of a layer and every group containing it.
    #[must_use]
    pub fn final_opacity(&self, layer: LayerID, own: Opacity) -> Opacity {
        self.containing_groups(layer)
            .fold(own, |acc, g| acc.multiply(g.opacity))
    }
    fn containing_groups(&self, layer: LayerID) -> impl Iterator<Item = &GroupItem> + '_ {
        self.get_group_by_layer(layer)
            .into_iter()
            .flat_map(|parent| std::iter::once(parent).chain(self.ancestors(parent)))
            .filter_map(|id| self.groups.get(&id))
    }
    /// Wrap a layer or group in a new group, which takes over the child's former parent.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        child: StructureID,
        order: &[LayerID],
    ) -> Result<GroupID, StructureError> {
        self.check_exists(child, order)?;
        let (start_layer, end_layer) = match child {
            StructureID::Layer(layer) => (layer, layer),
            StructureID::Group(group) => {
                let item = self
                    .groups
                    .get(&group)
                    .ok_or(StructureError::UnknownGroup(group))?;
                (item.start_layer, item.end_layer)
            }
        };
        let id = GroupID::new();
        let item = GroupItem {
            id,
            start_layer,
            end_layer,
            parent: self.parent_of(child),
            name: name.into(),
            is_visible: true,
            opacity: Opacity::OPAQUE,
            is_expanded: true,
        };
        self.transaction(order, |this| {
            this.groups.insert(id, item);
            this.link(child, Some(id));
        })?;
        log::debug!("created {id} around {child:?}");
        Ok(id)
    }
    /// Move a layer or group into `new_parent`, or to the top level.
    ///
    /// Fails without changing anything if that would put a group inside itself, or leave any group's
    /// layers non-contiguous.
    pub fn assign_parent(
        &mut self,
        target: StructureID,
        new_parent: Option<GroupID>,
        order: &[LayerID],
    ) -> Result<(), StructureError> {
        self.check_exists(target, order)?;
        if let Some(parent) = new_parent {
            if !self.groups.contains_key(&parent) {
                return Err(StructureError::UnknownGroup(parent));
            }
            if let StructureID::Group(group) = target {
                if group == parent || self.is_child_of(parent, group) {
                    return Err(StructureError::WouldCycle);
                }
            }
        }
        self.transaction(order, |this| this.link(target, new_parent))
    }
    /// Dissolve a group. Its children move up to its parent.
    pub fn remove_group(&mut self, group: GroupID, order: &[LayerID]) -> Result<(), StructureError> {
        let parent = self
            .groups
            .get(&group)
            .ok_or(StructureError::UnknownGroup(group))?
            .parent;
        self.transaction(order, |this| {
            this.groups.remove(&group);
            for item in this.groups.values_mut() {
                if item.parent == Some(group) {
                    item.parent = parent;
                }
            }
            for layer_parent in this.layer_parents.values_mut() {
                if *layer_parent == group {
                    if let Some(parent) = parent {
                        *layer_parent = parent;
                    }
                }
            }
            if parent.is_none() {
                this.layer_parents.retain(|_, p| *p != group);
            }
        })
    }
    /// Drop the membership of a layer that left the document. `order` must no longer contain it.
    pub fn forget_layer(&mut self, layer: LayerID, order: &[LayerID]) -> Result<(), StructureError> {
        self.transaction(order, |this| {
            this.layer_parents.remove(&layer);
        })
    }
    /// Check every invariant against `order` without changing anything.
    pub fn validate(&self, order: &[LayerID]) -> Result<(), StructureError> {
        let mut copy = self.clone();
        copy.rederive(order)?;
        if copy == *self {
            Ok(())
        } else {
            // Stale ranges or leftover empty groups. Report the first group whose range moved.
            let stale = self
                .groups
                .keys()
                .find(|&&id| copy.groups.get(&id) != self.groups.get(&id))
                .copied();
            match stale {
                Some(id) => Err(StructureError::NonContiguous(id)),
                None => Ok(()),
            }
        }
    }
    fn check_exists(&self, target: StructureID, order: &[LayerID]) -> Result<(), StructureError> {
        match target {
            StructureID::Layer(layer) if !order.contains(&layer) => {
                Err(StructureError::UnknownLayer(layer))
            }
            StructureID::Group(group) if !self.groups.contains_key(&group) => {
                Err(StructureError::UnknownGroup(group))
            }
            _ => Ok(()),
        }
    }
    /// Set a parent link without re-deriving. Callers must [`Self::rederive`] afterwards.
    pub(crate) fn link(&mut self, target: StructureID, parent: Option<GroupID>) {
        match (target, parent) {
            (StructureID::Layer(layer), Some(parent)) => {
                self.layer_parents.insert(layer, parent);
            }
            (StructureID::Layer(layer), None) => {
                self.layer_parents.remove(&layer);
            }
            (StructureID::Group(group), parent) => {
                if let Some(item) = self.groups.get_mut(&group) {
                    item.parent = parent;
                }
            }
        }
    }
    /// Run a mutation, then re-derive. Rolls the mutation back on failure.
    fn transaction(
        &mut self,
        order: &[LayerID],
        mutate: impl FnOnce(&mut Self),
    ) -> Result<(), StructureError> {
        let backup = self.clone();
        mutate(self);
        if let Err(err) = self.rederive(order) {
            log::debug!("structure change rejected: {err}");
            *self = backup;
            return Err(err);
        }
        Ok(())
    }
    /// Recompute every group's range from the links and `order`, dropping groups without layers.
    pub(crate) fn rederive(&mut self, order: &[LayerID]) -> Result<(), StructureError> {
        for &id in self.groups.keys() {
            if self.ancestors(id).any(|ancestor| ancestor == id) {
                return Err(StructureError::Cycle(id));
            }
            if self.ancestors(id).count() == self.groups.len() {
                // Ran into the iteration cap, so the chain above loops without passing through `id`.
                return Err(StructureError::Cycle(id));
            }
        }

        let present: hashbrown::HashSet<LayerID> = order.iter().copied().collect();
        self.layer_parents.retain(|layer, _| present.contains(layer));

        let mut extents = hashbrown::HashMap::<GroupID, Extent>::with_capacity(self.groups.len());
        for (index, layer) in order.iter().enumerate() {
            let Some(parent) = self.get_group_by_layer(*layer) else {
                continue;
            };
            for group in std::iter::once(parent).chain(self.ancestors(parent)) {
                extents
                    .entry(group)
                    .and_modify(|e| {
                        e.min = e.min.min(index);
                        e.max = e.max.max(index);
                        e.count += 1;
                    })
                    .or_insert(Extent {
                        min: index,
                        max: index,
                        count: 1,
                    });
            }
        }

        let before = self.groups.len();
        self.groups.retain(|id, _| extents.contains_key(id));
        if self.groups.len() != before {
            log::debug!("dropped {} empty groups", before - self.groups.len());
        }
        // Links to dropped groups can't exist: a group with a member layer has an extent, and so do all
        // of its ancestors.

        for (id, extent) in &extents {
            if extent.max - extent.min + 1 != extent.count {
                return Err(StructureError::NonContiguous(*id));
            }
            if let Some(item) = self.groups.get_mut(id) {
                item.start_layer = order[extent.min];
                item.end_layer = order[extent.max];
            }
        }
        Ok(())
    }
    /// Approximate heap size, for history accounting.
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        self.groups.capacity() * std::mem::size_of::<(GroupID, GroupItem)>()
            + self.groups.values().map(|g| g.name.capacity()).sum::<usize>()
            + self.layer_parents.capacity() * std::mem::size_of::<(LayerID, GroupID)>()
    }
}
