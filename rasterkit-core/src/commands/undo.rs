//! Linear undo/redo history.

use super::Change;

/// Two stacks of [`Change`]s, most recent on top.
///
/// The stacks only store changes, applying them is up to the [`Document`](crate::state::document::Document)
/// which owns this manager.
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: Vec<Change>,
    redo_stack: Vec<Change>,
    /// Set while a change is being undone or redone.
    replaying: bool,
    /// Summed approximate size of both stacks.
    total_size: usize,
    warning_threshold: usize,
    /// Whether we already warned about the current crossing of the threshold.
    warned: bool,
}
impl Default for UndoManager {
    fn default() -> Self {
        Self::new(crate::config::EditorConfig::default().history_warning_bytes)
    }
}
impl UndoManager {
    /// Empty history, warning once the stored changes exceed `warning_threshold` bytes.
    #[must_use]
    pub fn new(warning_threshold: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            replaying: false,
            total_size: 0,
            warning_threshold,
            warned: false,
        }
    }
    /// Record a change that has already taken effect.
    ///
    /// Clears the redo stack. Ignored while a change is being replayed, returning false.
    pub fn record(&mut self, change: Change) -> bool {
        if self.replaying {
            log::warn!(
                "ignored recording {:?} during undo/redo",
                change.description()
            );
            return false;
        }
        log::trace!("recording {:?}", change.description());
        let forgotten: usize = self.redo_stack.drain(..).map(|c| c.approximate_size()).sum();
        self.shrink(forgotten);
        self.push_undo(change);
        true
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
    /// Descriptions of the undo stack, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.undo_stack.iter().rev().map(Change::description)
    }
    /// Descriptions of the redo stack, next to be redone first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.redo_stack.iter().rev().map(Change::description)
    }
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }
    /// Approximate bytes held by the history.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.total_size
    }
    /// Forget all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_size = 0;
        self.warned = false;
    }

    pub(crate) fn set_replaying(&mut self, replaying: bool) {
        self.replaying = replaying;
    }
    /// Take the change to undo. The caller returns it with [`Self::push_redo`] once it's applied, or
    /// drops it if applying failed.
    pub(crate) fn pop_undo(&mut self) -> Option<Change> {
        let change = self.undo_stack.pop()?;
        self.shrink(change.approximate_size());
        Some(change)
    }
    pub(crate) fn pop_redo(&mut self) -> Option<Change> {
        let change = self.redo_stack.pop()?;
        self.shrink(change.approximate_size());
        Some(change)
    }
    pub(crate) fn push_undo(&mut self, change: Change) {
        self.grow(change.approximate_size());
        self.undo_stack.push(change);
    }
    pub(crate) fn push_redo(&mut self, change: Change) {
        self.grow(change.approximate_size());
        self.redo_stack.push(change);
    }
    fn shrink(&mut self, by: usize) {
        self.total_size = self.total_size.saturating_sub(by);
        if self.total_size <= self.warning_threshold {
            self.warned = false;
        }
    }
    fn grow(&mut self, by: usize) {
        self.total_size = self.total_size.saturating_add(by);
        if self.total_size > self.warning_threshold {
            if !self.warned {
                self.warned = true;
                log::warn!(
                    "undo history holds {}, past the {} warning threshold",
                    human_bytes::human_bytes(self.total_size as f64),
                    human_bytes::human_bytes(self.warning_threshold as f64),
                );
            }
        } else {
            self.warned = false;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{commands::CommandError, state::document::Document};

    fn nothing(_: &mut Document, _: &()) -> Result<(), CommandError> {
        Ok(())
    }
    fn change(name: &str, size: usize) -> Change {
        Change::procedure(name, nothing, (), nothing, (), size)
    }

    #[test]
    fn record_clears_redo() {
        let mut history = UndoManager::new(usize::MAX);
        history.record(change("a", 0));
        history.record(change("b", 0));
        let b = history.pop_undo().unwrap();
        history.push_redo(b);
        assert!(history.can_redo());
        history.record(change("c", 0));
        assert!(!history.can_redo());
        assert_eq!(history.undo_descriptions().collect::<Vec<_>>(), ["c", "a"]);
    }
    #[test]
    fn ignored_while_replaying() {
        let mut history = UndoManager::new(usize::MAX);
        history.set_replaying(true);
        assert!(!history.record(change("a", 0)));
        history.set_replaying(false);
        assert!(!history.can_undo());
        assert!(history.record(change("a", 0)));
    }
    #[test]
    fn tracks_size() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut history = UndoManager::new(1024);
        history.record(change("small", 10));
        let small = history.total_size();
        assert!(small >= 10);
        history.record(change("big", 4096));
        assert!(history.warned);
        let big = history.pop_undo().unwrap();
        assert_eq!(history.total_size(), small);
        assert!(!history.warned);
        history.push_redo(big);
        history.record(change("after", 0));
        // Redo stack dropped, so only "small" and "after" remain.
        assert!(history.total_size() < 1024);
        history.clear();
        assert_eq!(history.total_size(), 0);
        assert!(!history.can_undo());
    }
}
