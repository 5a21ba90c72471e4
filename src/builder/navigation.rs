use std::sync::Arc;

use crate::error::ConfigError;
use crate::model::{Item, PageId};
use crate::page::{NavSlots, PageRegistry, ReservationSet};
use crate::router::{EventContext, Handler, handler};

/// Previous/next travel items placed on every content page.
#[derive(Clone)]
pub struct Navigation {
    pub next_item: Item,
    pub prev_item: Item,
    /// Distance of the travel items from the last-row corners.
    pub margin: u16,
    /// Explicit slot overrides; derived from `margin` when absent.
    pub next_slot: Option<u16>,
    pub prev_slot: Option<u16>,
    pub first_page_notice: String,
    pub last_page_notice: String,
    /// Replaces the notices when a travel item has nowhere to go.
    pub on_boundary: Option<Handler>,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            next_item: Item::labeled("arrow", "Next Page"),
            prev_item: Item::labeled("arrow", "Previous Page"),
            margin: 0,
            next_slot: None,
            prev_slot: None,
            first_page_notice: "You are on the first page.".to_string(),
            last_page_notice: "You are on the last page.".to_string(),
            on_boundary: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Travel {
    Next,
    Prev,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_item(mut self, item: Item) -> Self {
        self.next_item = item;
        self
    }

    pub fn prev_item(mut self, item: Item) -> Self {
        self.prev_item = item;
        self
    }

    pub fn margin(mut self, margin: u16) -> Self {
        self.margin = margin;
        self
    }

    pub fn next_slot(mut self, slot: u16) -> Self {
        self.next_slot = Some(slot);
        self
    }

    pub fn prev_slot(mut self, slot: u16) -> Self {
        self.prev_slot = Some(slot);
        self
    }

    pub fn on_boundary(mut self, handler: Handler) -> Self {
        self.on_boundary = Some(handler);
        self
    }

    /// Copies this configuration into the allocator's reservation set.
    pub(crate) fn reserve(&self, reservation: &mut ReservationSet) {
        reservation.nav_enabled = true;
        reservation.next_slot = self.next_slot;
        reservation.prev_slot = self.prev_slot;
        reservation.margin = self.margin;
    }

    /// Places travel items on every content page that has somewhere to go.
    pub(crate) fn install(&self, registry: &mut PageRegistry) -> Result<(), ConfigError> {
        let order = registry.content_page_ids();
        let (Some(first), Some(last)) = (order.first().copied(), order.last().copied()) else {
            return Ok(());
        };
        let order: Arc<[PageId]> = order.into();
        let next = self.travel_handler(Travel::Next, Arc::clone(&order));
        let prev = self.travel_handler(Travel::Prev, Arc::clone(&order));

        for id in order.iter().copied() {
            let capacity = registry.page(id).map(|p| p.capacity()).unwrap_or(0);
            let slots = NavSlots::derive(capacity, self.margin, self.next_slot, self.prev_slot);
            if id != first {
                registry.set_item(id, slots.prev, self.prev_item.clone(), Some(prev.clone()))?;
            }
            if id != last {
                registry.set_item(id, slots.next, self.next_item.clone(), Some(next.clone()))?;
            }
        }
        Ok(())
    }

    fn travel_handler(&self, travel: Travel, order: Arc<[PageId]>) -> Handler {
        let boundary = self.on_boundary.clone();
        let notice = match travel {
            Travel::Next => self.last_page_notice.clone(),
            Travel::Prev => self.first_page_notice.clone(),
        };
        handler(move |ctx: &mut EventContext<'_>| {
            let current = ctx.page();
            let target = match travel {
                Travel::Next => order.iter().copied().find(|id| *id > current),
                Travel::Prev => order.iter().rev().copied().find(|id| *id < current),
            };
            match (target, boundary.as_ref()) {
                (Some(page), _) => ctx.open_page(page),
                (None, Some(boundary)) => return (boundary.as_ref())(ctx),
                (None, None) => ctx.notify(notice.clone()),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Setting, ViewerId};
    use crate::router::{EventKind, Request};

    fn registry_with(pages: &[u32]) -> PageRegistry {
        let mut registry = PageRegistry::new(Setting::new(3, "Page {page}"));
        for id in pages {
            registry
                .create_page(PageId(*id), Setting::new(3, "Page {page}"))
                .unwrap();
        }
        registry
    }

    fn click(handler: &Handler, page: PageId) -> Vec<Request> {
        let viewer = ViewerId::new("alice");
        let mut ctx = EventContext::new(&viewer, page, EventKind::Click { slot: 0 });
        (handler.as_ref())(&mut ctx).unwrap();
        ctx.requests().to_vec()
    }

    #[test]
    fn first_and_last_pages_skip_the_missing_direction() {
        let mut registry = registry_with(&[1, 2, 3]);
        Navigation::new().margin(1).install(&mut registry).unwrap();

        let first = registry.page(PageId(1)).unwrap();
        assert!(first.render(19).is_none(), "first page has no previous");
        assert_eq!(first.render(25).unwrap().label, "Next Page");

        let middle = registry.page(PageId(2)).unwrap();
        assert_eq!(middle.render(19).unwrap().label, "Previous Page");
        assert_eq!(middle.render(25).unwrap().label, "Next Page");

        let last = registry.page(PageId(3)).unwrap();
        assert_eq!(last.render(19).unwrap().label, "Previous Page");
        assert!(last.render(25).is_none(), "last page has no next");

        assert!(registry.page(PageId::SHARED).unwrap().is_empty());
    }

    #[test]
    fn travel_follows_declared_page_order() {
        let mut registry = registry_with(&[1, 5, 9]);
        Navigation::new().install(&mut registry).unwrap();
        let next = registry
            .page(PageId(1))
            .and_then(|p| p.click_handler(26))
            .cloned()
            .unwrap();
        assert_eq!(click(&next, PageId(1)), vec![Request::OpenPage(PageId(5))]);
        assert_eq!(
            click(&next, PageId(9)),
            vec![Request::Notify("You are on the last page.".into())]
        );

        let prev = registry
            .page(PageId(9))
            .and_then(|p| p.click_handler(18))
            .cloned()
            .unwrap();
        assert_eq!(click(&prev, PageId(9)), vec![Request::OpenPage(PageId(5))]);
        assert_eq!(
            click(&prev, PageId(1)),
            vec![Request::Notify("You are on the first page.".into())]
        );
    }

    #[test]
    fn boundary_handler_replaces_notice() {
        let mut registry = registry_with(&[1, 2]);
        let nav = Navigation::new().on_boundary(handler(|ctx| {
            ctx.close();
            Ok(())
        }));
        nav.install(&mut registry).unwrap();
        let next = registry
            .page(PageId(1))
            .and_then(|p| p.click_handler(26))
            .cloned()
            .unwrap();
        assert_eq!(click(&next, PageId(2)), vec![Request::Close]);
    }

    #[test]
    fn explicit_slot_out_of_range_is_rejected() {
        let mut registry = registry_with(&[1, 2]);
        let err = Navigation::new()
            .next_slot(40)
            .install(&mut registry)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SlotOutOfRange { slot: 40, .. }));
    }

    #[test]
    fn reserve_copies_slots_into_reservation() {
        let mut reservation = ReservationSet::default();
        Navigation::new()
            .margin(2)
            .prev_slot(3)
            .reserve(&mut reservation);
        assert!(reservation.nav_enabled);
        assert_eq!(reservation.prev_slot, Some(3));
        assert_eq!(reservation.next_slot, None);
        assert_eq!(reservation.margin, 2);
    }
}
