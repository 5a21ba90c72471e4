//! Boundary between an [`Engine`] and whatever actually displays containers.
//!
//! A host shows containers, tells the engine what a viewer currently has
//! open, and turns native container events into [`Notification`]s.

use std::collections::{HashMap, VecDeque};

use crate::model::{ContainerId, ViewerId};
use crate::page::Page;
use crate::router::Engine;

/// Host collaborator the router depends on.
pub trait Host {
    /// Present `page` to `viewer`. Replaces whatever the viewer had open.
    fn show(&mut self, viewer: &ViewerId, container: ContainerId, page: &Page);

    /// Close whatever the viewer has open.
    fn close(&mut self, viewer: &ViewerId);

    /// Container the viewer has open right now, if any.
    fn open_container(&self, viewer: &ViewerId) -> Option<ContainerId>;

    /// Short text notice for the viewer (boundary messages, errors).
    fn notify(&mut self, viewer: &ViewerId, message: &str);

    /// Contents of a page the viewer is looking at changed.
    fn refresh(&mut self, _viewer: &ViewerId, _container: ContainerId, _page: &Page) {}
}

/// Native container event, translated for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Open {
        viewer: ViewerId,
        container: ContainerId,
    },
    Click {
        viewer: ViewerId,
        container: ContainerId,
        slot: u16,
    },
    Close {
        viewer: ViewerId,
        container: ContainerId,
    },
}

/// In-process host with native container semantics: showing a container
/// first closes the one already open, and every change is queued as a
/// notification for [`pump`] to deliver.
#[derive(Debug, Default)]
pub struct SimulatedHost {
    open: HashMap<ViewerId, ContainerId>,
    pending: VecDeque<Notification>,
    messages: Vec<(ViewerId, String)>,
    shown: Vec<(ViewerId, ContainerId)>,
    refreshes: usize,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewer clicks `slot` of whatever they have open.
    pub fn click(&mut self, viewer: &ViewerId, slot: u16) {
        if let Some(container) = self.open.get(viewer).copied() {
            self.pending.push_back(Notification::Click {
                viewer: viewer.clone(),
                container,
                slot,
            });
        }
    }

    /// Viewer opens a container this host does not attribute to any engine
    /// it was asked to show, e.g. another plugin's GUI.
    pub fn open_foreign(&mut self, viewer: &ViewerId, container: ContainerId) {
        if let Some(previous) = self.open.insert(viewer.clone(), container) {
            self.pending.push_back(Notification::Close {
                viewer: viewer.clone(),
                container: previous,
            });
        }
        self.pending.push_back(Notification::Open {
            viewer: viewer.clone(),
            container,
        });
    }

    pub fn pop(&mut self) -> Option<Notification> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn messages(&self) -> &[(ViewerId, String)] {
        &self.messages
    }

    pub fn messages_for(&self, viewer: &ViewerId) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(v, _)| v == viewer)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn shown(&self) -> &[(ViewerId, ContainerId)] {
        &self.shown
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Host for SimulatedHost {
    fn show(&mut self, viewer: &ViewerId, container: ContainerId, _page: &Page) {
        self.shown.push((viewer.clone(), container));
        self.open_foreign(viewer, container);
    }

    fn close(&mut self, viewer: &ViewerId) {
        if let Some(previous) = self.open.remove(viewer) {
            self.pending.push_back(Notification::Close {
                viewer: viewer.clone(),
                container: previous,
            });
        }
    }

    fn open_container(&self, viewer: &ViewerId) -> Option<ContainerId> {
        self.open.get(viewer).copied()
    }

    fn notify(&mut self, viewer: &ViewerId, message: &str) {
        self.messages.push((viewer.clone(), message.to_string()));
    }

    fn refresh(&mut self, _viewer: &ViewerId, _container: ContainerId, _page: &Page) {
        self.refreshes += 1;
    }
}

/// Delivers every queued notification, including ones raised while delivering.
pub fn pump(engine: &mut Engine, host: &mut SimulatedHost) -> usize {
    let mut delivered = 0;
    while let Some(notification) = host.pop() {
        engine.handle(notification, host);
        delivered += 1;
    }
    delivered
}

/// Pumps, then runs deferred continuations, until nothing is left to do.
pub fn settle(engine: &mut Engine, host: &mut SimulatedHost) {
    loop {
        pump(engine, host);
        if !engine.has_deferred() {
            break;
        }
        engine.tick(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineId, PageId};

    fn container(page: u32) -> ContainerId {
        ContainerId::new(EngineId::next(), PageId(page))
    }

    #[test]
    fn opening_replaces_the_current_container() {
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        let (first, second) = (container(1), container(2));
        host.open_foreign(&viewer, first);
        host.open_foreign(&viewer, second);

        assert_eq!(
            host.pop(),
            Some(Notification::Open {
                viewer: viewer.clone(),
                container: first
            })
        );
        assert_eq!(
            host.pop(),
            Some(Notification::Close {
                viewer: viewer.clone(),
                container: first
            })
        );
        assert!(matches!(host.pop(), Some(Notification::Open { container, .. }) if container == second));
        assert_eq!(host.open_container(&viewer), Some(second));
    }

    #[test]
    fn clicks_without_an_open_container_are_ignored() {
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        host.click(&viewer, 3);
        host.close(&viewer);
        assert!(!host.has_pending());
    }

    #[test]
    fn notices_are_kept_per_viewer() {
        let mut host = SimulatedHost::new();
        let (alice, bob) = (ViewerId::new("alice"), ViewerId::new("bob"));
        host.notify(&alice, "hi");
        host.notify(&bob, "yo");
        assert_eq!(host.messages_for(&alice), vec!["hi"]);
        assert_eq!(host.messages().len(), 2);
    }
}
