//! # Commands
//!
//! Every user-visible mutation of a [`Document`] is described by a [`Change`], which knows how to apply
//! itself in both directions. Changes never hold references into the document. Property changes find
//! their target again through a [`RootFinder`], procedure changes carry owned snapshots of everything
//! they need.
//!
//! Changes are applied through [`CommandConsumer`], and kept in an [`undo::UndoManager`].

pub mod undo;

use crate::{
    coords::Coordinates,
    state::{document::Document, layer::LayerID, structure::GroupID, structure::StructureID},
    util::Opacity,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("history no longer matches the document: {0}")]
    InvariantViolation(String),
    #[error("command makes no changes")]
    NoOp,
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<'c, T> DoUndo<'c, T> {
    /// The same command, applied the other way.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match *self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
}

/// A typed value of one of the properties shared by layers and groups.
#[derive(Clone, PartialEq, Debug, strum::AsRefStr, strum::EnumDiscriminants)]
#[strum_discriminants(name(PropertyKind), derive(Hash, strum::AsRefStr, strum::IntoStaticStr))]
pub enum PropertyValue {
    Name(String),
    Visible(bool),
    Opacity(Opacity),
    Offset(Coordinates),
}
impl PropertyValue {
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.into()
    }
    fn approximate_size(&self) -> usize {
        match self {
            Self::Name(name) => name.capacity(),
            _ => 0,
        }
    }
}

/// Anything with properties a [`PropertyChange`] can target.
pub trait PropertyTarget {
    /// Current value of the property, `None` if this target doesn't have it.
    fn property(&self, kind: PropertyKind) -> Option<PropertyValue>;
    /// Assign a property. Fails with [`CommandError::UnknownResource`] if this target doesn't have it.
    fn set_property(&mut self, value: PropertyValue) -> Result<(), CommandError>;
}

/// Locates the target of a property change in a document, at the time the change is applied.
#[derive(Clone, Copy)]
pub struct RootFinder {
    pub key: StructureID,
    pub find: for<'d> fn(&'d mut Document, StructureID) -> Option<&'d mut dyn PropertyTarget>,
}
impl RootFinder {
    /// Find a layer by ID, wherever it has moved to.
    #[must_use]
    pub fn layer(id: LayerID) -> Self {
        Self {
            key: id.into(),
            find: Document::find_property_target,
        }
    }
    /// Find a group by ID.
    #[must_use]
    pub fn group(id: GroupID) -> Self {
        Self {
            key: id.into(),
            find: Document::find_property_target,
        }
    }
    fn resolve<'d>(&self, document: &'d mut Document) -> Result<&'d mut dyn PropertyTarget, CommandError> {
        (self.find)(document, self.key).ok_or_else(|| {
            CommandError::InvariantViolation(format!("{:?} no longer exists", self.key))
        })
    }
}
impl std::fmt::Debug for RootFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RootFinder").field(&self.key).finish()
    }
}

#[derive(Clone, Debug)]
pub struct PropertyChange {
    pub root: RootFinder,
    pub from: PropertyValue,
    pub to: PropertyValue,
}
impl PropertyChange {
    /// Assign `to` to the target, which must currently hold `from`. Swapped when undoing.
    pub(crate) fn assign(&self, document: &mut Document, undo: bool) -> Result<(), CommandError> {
        let (from, to) = if undo {
            (&self.to, &self.from)
        } else {
            (&self.from, &self.to)
        };
        let target = self.root.resolve(document)?;
        let current = target
            .property(from.kind())
            .ok_or(CommandError::UnknownResource)?;
        if current != *from {
            return Err(CommandError::MismatchedState);
        }
        target.set_property(to.clone())
    }
}

/// Signature of the plain functions procedure changes are built from.
pub type ProcedureFn<Args> = fn(&mut Document, &Args) -> Result<(), CommandError>;

/// A function paired with an owned snapshot of its arguments.
pub struct Procedure {
    name: &'static str,
    run: Box<dyn Fn(&mut Document) -> Result<(), CommandError> + Send>,
}
impl Procedure {
    pub fn new<Args: Send + 'static>(name: &'static str, f: ProcedureFn<Args>, args: Args) -> Self {
        Self {
            name,
            run: Box::new(move |document| f(document, &args)),
        }
    }
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub(crate) fn run(&self, document: &mut Document) -> Result<(), CommandError> {
        (self.run)(document)
    }
}
impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Procedure").field(&self.name).finish()
    }
}

#[derive(Debug)]
pub struct ProcedureChange {
    pub reverse: Procedure,
    pub forward: Procedure,
}

#[derive(Debug)]
pub enum ChangeKind {
    Property(PropertyChange),
    Procedure(ProcedureChange),
    /// Bundle many changes into one. Can be nested many times.
    /// Children are done in order and undone in reverse order.
    Scope(Box<[Change]>),
}

/// One undoable unit of mutation.
#[derive(Debug)]
pub struct Change {
    description: String,
    kind: ChangeKind,
    approximate_size: usize,
}
impl Change {
    #[must_use]
    pub fn property(
        description: impl Into<String>,
        root: RootFinder,
        from: PropertyValue,
        to: PropertyValue,
    ) -> Self {
        let approximate_size =
            std::mem::size_of::<Self>() + from.approximate_size() + to.approximate_size();
        Self {
            description: description.into(),
            kind: ChangeKind::Property(PropertyChange { root, from, to }),
            approximate_size,
        }
    }
    /// A change applying `forward` with `forward_args`, and undone by `reverse` with `reverse_args`.
    ///
    /// `snapshot_size` is the heap size owned by both argument snapshots.
    #[must_use]
    pub fn procedure<Fwd: Send + 'static, Rev: Send + 'static>(
        description: impl Into<String>,
        forward: ProcedureFn<Fwd>,
        forward_args: Fwd,
        reverse: ProcedureFn<Rev>,
        reverse_args: Rev,
        snapshot_size: usize,
    ) -> Self {
        Self {
            description: description.into(),
            kind: ChangeKind::Procedure(ProcedureChange {
                reverse: Procedure::new("reverse", reverse, reverse_args),
                forward: Procedure::new("forward", forward, forward_args),
            }),
            approximate_size: std::mem::size_of::<Self>()
                + std::mem::size_of::<Fwd>()
                + std::mem::size_of::<Rev>()
                + snapshot_size,
        }
    }
    /// Bundle changes into one. A single change is returned as-is, `None` if there are none.
    #[must_use]
    pub fn scope(
        description: impl Into<String>,
        changes: impl IntoIterator<Item = Change>,
    ) -> Option<Self> {
        // Optimize for exactly one change, the most common case.
        let mut changes: smallvec::SmallVec<[Change; 1]> = changes.into_iter().collect();
        match changes.len() {
            0 => None,
            1 => changes.pop(),
            _ => {
                let approximate_size = std::mem::size_of::<Self>()
                    + changes.iter().map(Change::approximate_size).sum::<usize>();
                Some(Self {
                    description: description.into(),
                    kind: ChangeKind::Scope(changes.into_vec().into_boxed_slice()),
                    approximate_size,
                })
            }
        }
    }
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
    #[must_use]
    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        self.approximate_size
    }
}
