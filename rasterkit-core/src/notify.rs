//! # Notifications
//!
//! Observers such as a renderer or a layer panel learn about document changes through channels. They
//! never get to touch the document themselves.

use crate::state::{layer::LayerID, structure::GroupID};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Notification {
    LayerAdded(LayerID),
    LayerRemoved(LayerID),
    /// A presentation property changed, named by [`PropertyKind`](crate::commands::PropertyKind).
    LayerPropertyChanged {
        layer: LayerID,
        property: &'static str,
    },
    LayerPixelsChanged(LayerID),
    LayersReordered,
    GroupChanged(GroupID),
    StructureChanged,
    DocumentResized {
        width: u32,
        height: u32,
    },
    ActiveLayerChanged(Option<LayerID>),
    HistoryChanged,
}

#[derive(Default, Debug)]
pub struct Notifier {
    listeners: Vec<crossbeam::channel::Sender<Notification>>,
}
impl Notifier {
    /// A new receiver of every notification sent from now on.
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<Notification> {
        let (send, recv) = crossbeam::channel::unbounded();
        self.listeners.push(send);
        recv
    }
    /// Send to every listener. Listeners that hung up are forgotten.
    pub fn notify(&mut self, notification: &Notification) {
        self.listeners
            .retain(|listener| listener.send(notification.clone()).is_ok());
    }
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prunes_disconnected() {
        let mut notifier = Notifier::default();
        let kept = notifier.subscribe();
        let dropped = notifier.subscribe();
        drop(dropped);
        notifier.notify(&Notification::LayersReordered);
        assert_eq!(notifier.listener_count(), 1);
        assert_eq!(kept.try_recv(), Ok(Notification::LayersReordered));
        assert!(kept.try_recv().is_err());
    }
}
