use std::collections::HashMap;

use crate::model::{PageId, ViewerId};

/// Ephemeral state for one viewer of one GUI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub current_page: Option<PageId>,
    pub global_open_fired: bool,
}

/// Per-viewer current page plus the "global open already fired" flag.
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: HashMap<ViewerId, Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `viewer` is now looking at `page`. Returns true when this
    /// started a new session.
    pub fn enter(&mut self, viewer: &ViewerId, page: PageId) -> bool {
        let started = !self.sessions.contains_key(viewer);
        self.sessions.entry(viewer.clone()).or_default().current_page = Some(page);
        started
    }

    pub fn current_page(&self, viewer: &ViewerId) -> Option<PageId> {
        self.sessions.get(viewer).and_then(|s| s.current_page)
    }

    pub fn get(&self, viewer: &ViewerId) -> Option<&Session> {
        self.sessions.get(viewer)
    }

    /// Marks the global open handler as fired. Returns true only the first
    /// time within a session.
    pub fn claim_global_open(&mut self, viewer: &ViewerId) -> bool {
        match self.sessions.get_mut(viewer) {
            Some(session) if !session.global_open_fired => {
                session.global_open_fired = true;
                true
            }
            _ => false,
        }
    }

    pub fn end(&mut self, viewer: &ViewerId) -> Option<Session> {
        self.sessions.remove(viewer)
    }

    pub fn viewers(&self) -> Vec<ViewerId> {
        let mut viewers: Vec<_> = self.sessions.keys().cloned().collect();
        viewers.sort();
        viewers
    }

    pub fn viewers_on(&self, page: PageId) -> Vec<ViewerId> {
        let mut viewers: Vec<_> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.current_page == Some(page))
            .map(|(v, _)| v.clone())
            .collect();
        viewers.sort();
        viewers
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
