//! Recorded edits of the group structure.

use super::{Document, DocumentError};
use crate::{
    commands::{Change, CommandError, PropertyValue, RootFinder},
    notify::Notification,
    state::{
        layer::LayerID,
        structure::{GroupID, LayerStructure, StructureError, StructureID},
    },
    util::Opacity,
};

fn set_structure(document: &mut Document, structure: &LayerStructure) -> Result<(), CommandError> {
    structure
        .validate(&document.layer_order())
        .map_err(|err| CommandError::InvariantViolation(format!("stale group structure: {err}")))?;
    document.structure = structure.clone();
    document.notify(Notification::StructureChanged);
    Ok(())
}

impl Document {
    /// Run `edit` on a copy of the structure and record the result, unless it changed nothing.
    fn commit_structure<T>(
        &mut self,
        description: &str,
        edit: impl FnOnce(&mut LayerStructure, &[LayerID]) -> Result<T, DocumentError>,
    ) -> Result<T, DocumentError> {
        let order = self.layer_order();
        let mut after = self.structure.clone();
        let output = edit(&mut after, &order)?;
        if after != self.structure {
            let before = self.structure.clone();
            let size = before.approximate_size() + after.approximate_size();
            self.commit(Change::procedure(
                description,
                set_structure,
                after,
                set_structure,
                before,
                size,
            ))?;
        }
        Ok(output)
    }
    /// Wrap a layer or group in a new group, which takes its place in the structure.
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        child: StructureID,
    ) -> Result<GroupID, DocumentError> {
        let name = name.into();
        self.commit_structure("Add group", |structure, order| {
            Ok(structure.add_group(name, child, order)?)
        })
    }
    /// Move a layer or group into `parent`, or to the top level.
    pub fn assign_parent(
        &mut self,
        target: StructureID,
        parent: Option<GroupID>,
    ) -> Result<(), DocumentError> {
        self.commit_structure("Move into group", |structure, order| {
            Ok(structure.assign_parent(target, parent, order)?)
        })
    }
    /// Dissolve a group, keeping its layers.
    pub fn remove_group(&mut self, group: GroupID) -> Result<(), DocumentError> {
        self.commit_structure("Ungroup", |structure, order| {
            Ok(structure.remove_group(group, order)?)
        })
    }
    pub fn rename_group(&mut self, id: GroupID, name: impl Into<String>) -> Result<(), DocumentError> {
        self.commit_property(
            "Rename group".to_owned(),
            RootFinder::group(id),
            PropertyValue::Name(name.into()),
        )
    }
    pub fn set_group_visibility(&mut self, id: GroupID, visible: bool) -> Result<(), DocumentError> {
        let description = if visible { "Show group" } else { "Hide group" };
        self.commit_property(
            description.to_owned(),
            RootFinder::group(id),
            PropertyValue::Visible(visible),
        )
    }
    pub fn set_group_opacity(&mut self, id: GroupID, opacity: f32) -> Result<(), DocumentError> {
        let opacity = Opacity::new(opacity)?;
        self.commit_property(
            "Group opacity".to_owned(),
            RootFinder::group(id),
            PropertyValue::Opacity(opacity),
        )
    }
    /// Fold or unfold a group in layer listings. Presentation only, so not recorded.
    pub fn set_group_expanded(&mut self, id: GroupID, expanded: bool) -> Result<(), DocumentError> {
        let group = self
            .structure
            .group_mut(id)
            .ok_or(StructureError::UnknownGroup(id))?;
        if group.is_expanded != expanded {
            group.is_expanded = expanded;
            self.notify(Notification::GroupChanged(id));
        }
        Ok(())
    }
}
