use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ConfigError;
use crate::model::{Item, PageId, Setting};
use crate::router::Handler;

use super::core::Page;
use super::reservation::ReservationSet;

type RegistryResult<T> = std::result::Result<T, ConfigError>;

/// Where the allocator put an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placement {
    pub page: PageId,
    pub slot: u16,
}

impl Placement {
    pub fn new(page: PageId, slot: u16) -> Self {
        Self { page, slot }
    }
}

/// Outcome of removing one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// Pages whose contents changed.
    pub touched: BTreeSet<PageId>,
    /// True when the virtual item stream was shifted.
    pub compacted: bool,
}

impl Removal {
    fn merge(&mut self, other: Removal) {
        self.touched.extend(other.touched);
        self.compacted |= other.compacted;
    }
}

/// Every page of one GUI plus the bookkeeping for automatic placement.
///
/// Placement records are kept as an ordered `(page, slot)` set; iterating it
/// yields the virtual item stream in page-major, slot-minor order.
#[derive(Debug)]
pub struct PageRegistry {
    pages: BTreeMap<PageId, Page>,
    placements: BTreeSet<Placement>,
    reservation: ReservationSet,
    /// Originating page -> page currently receiving its overflow.
    filling: HashMap<PageId, PageId>,
    created: Vec<PageId>,
}

impl PageRegistry {
    pub fn new(shared: Setting) -> Self {
        let mut pages = BTreeMap::new();
        pages.insert(PageId::SHARED, Page::new(PageId::SHARED, shared));
        Self {
            pages,
            placements: BTreeSet::new(),
            reservation: ReservationSet::default(),
            filling: HashMap::new(),
            created: Vec::new(),
        }
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub(crate) fn page_mut(&mut self, id: PageId) -> RegistryResult<&mut Page> {
        self.pages.get_mut(&id).ok_or(ConfigError::UnknownPage(id))
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn page_ids(&self) -> Vec<PageId> {
        self.pages.keys().copied().collect()
    }

    /// Non-shared page ids in ascending order.
    pub fn content_page_ids(&self) -> Vec<PageId> {
        self.pages
            .keys()
            .copied()
            .filter(|id| !id.is_shared())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn reservation(&self) -> &ReservationSet {
        &self.reservation
    }

    pub(crate) fn reservation_mut(&mut self) -> &mut ReservationSet {
        &mut self.reservation
    }

    pub fn is_placed(&self, page: PageId, slot: u16) -> bool {
        self.placements.contains(&Placement::new(page, slot))
    }

    /// The virtual item stream: every placement record, page-major.
    pub fn stream(&self) -> Vec<Placement> {
        self.placements.iter().copied().collect()
    }

    /// Pages created since the last call, in creation order.
    pub(crate) fn take_created(&mut self) -> Vec<PageId> {
        std::mem::take(&mut self.created)
    }

    /// Next id for pages declared without one: one past the highest id.
    pub fn next_auto_id(&self) -> PageId {
        self.pages
            .keys()
            .next_back()
            .copied()
            .unwrap_or(PageId::SHARED)
            .next()
    }

    fn next_unused_after(&self, start: PageId) -> RegistryResult<PageId> {
        let exhausted = ConfigError::PageIdsExhausted { after: start };
        let mut id = start.checked_next().ok_or_else(|| exhausted.clone())?;
        while self.pages.contains_key(&id) {
            id = id.checked_next().ok_or_else(|| exhausted.clone())?;
        }
        Ok(id)
    }

    /// Creates a page seeded with a copy of the shared page.
    pub fn create_page(&mut self, id: PageId, setting: Setting) -> RegistryResult<&mut Page> {
        if id.is_shared() {
            return Err(ConfigError::ReservedPageId(id));
        }
        if self.pages.contains_key(&id) {
            return Err(ConfigError::DuplicatePageId(id));
        }
        setting.validate()?;

        let mut page = Page::new(id, setting);
        if let Some(shared) = self.pages.get(&PageId::SHARED) {
            page.seed_from(shared);
        }
        self.created.push(id);
        Ok(self.pages.entry(id).or_insert(page))
    }

    fn free_slot(&self, id: PageId) -> Option<u16> {
        let page = self.pages.get(&id)?;
        let reserved = self.reservation.reserved_slots(page.capacity());
        (0..page.capacity()).find(|slot| !reserved.contains(slot) && page.is_empty_slot(*slot))
    }

    /// Whether a fresh page built from `setting` would have room once seeded.
    fn fresh_page_has_room(&self, setting: &Setting) -> bool {
        let capacity = setting.capacity();
        let reserved = self.reservation.reserved_slots(capacity);
        let shared = self.pages.get(&PageId::SHARED);
        (0..capacity).any(|slot| {
            !reserved.contains(&slot) && shared.is_none_or(|page| page.is_empty_slot(slot))
        })
    }

    /// Places `item` on `origin`, its current overflow page, or a new page.
    pub fn allocate(
        &mut self,
        origin: PageId,
        item: Item,
        handler: Option<Handler>,
    ) -> RegistryResult<Placement> {
        if !self.pages.contains_key(&origin) {
            return Err(ConfigError::UnknownPage(origin));
        }

        if let Some(slot) = self.free_slot(origin) {
            return Ok(self.place(origin, slot, item, handler));
        }

        let filling = self.filling.get(&origin).copied().unwrap_or(origin);
        if filling != origin {
            if let Some(slot) = self.free_slot(filling) {
                return Ok(self.place(filling, slot, item, handler));
            }
        }

        let template = self.page_mut(origin)?.setting().clone();
        if !self.fresh_page_has_room(&template) {
            return Err(ConfigError::NoAllocatableSlots { page: origin });
        }
        let new_id = self.next_unused_after(filling)?;
        self.create_page(new_id, template)?;
        self.filling.insert(origin, new_id);
        self.allocate(new_id, item, handler)
    }

    fn place(&mut self, page: PageId, slot: u16, item: Item, handler: Option<Handler>) -> Placement {
        if let Some(target) = self.pages.get_mut(&page) {
            target.put(slot, item, handler);
        }
        let placement = Placement::new(page, slot);
        self.placements.insert(placement);
        placement
    }

    /// Explicit slot assignment. Never tracked for compaction.
    pub fn set_item(
        &mut self,
        page: PageId,
        slot: u16,
        item: Item,
        handler: Option<Handler>,
    ) -> RegistryResult<()> {
        let target = self.page_mut(page)?;
        target.check_slot(slot)?;
        target.put(slot, item, handler);
        self.placements.remove(&Placement::new(page, slot));
        Ok(())
    }

    /// Removes one slot, compacting the virtual stream when it was auto-placed.
    pub fn remove(&mut self, page: PageId, slot: u16) -> RegistryResult<Removal> {
        self.page_mut(page)?.check_slot(slot)?;
        let mut removal = Removal::default();
        removal.touched.insert(page);

        let removed = Placement::new(page, slot);
        if !self.placements.contains(&removed) {
            self.page_mut(page)?.clear(slot);
            return Ok(removal);
        }

        let stream = self.stream();
        let Some(position) = stream.iter().position(|p| *p == removed) else {
            return Ok(removal);
        };

        for window in stream[position..].windows(2) {
            let (target, source) = (window[0], window[1]);
            let Some((item, handler)) = self.pages.get(&source.page).and_then(|p| p.entry(source.slot))
            else {
                continue;
            };
            self.page_mut(target.page)?.put(target.slot, item, handler);
            removal.touched.insert(target.page);
        }

        if let Some(last) = stream.last().copied() {
            self.page_mut(last.page)?.clear(last.slot);
            self.placements.remove(&last);
            removal.touched.insert(last.page);
        }
        removal.compacted = true;
        Ok(removal)
    }

    /// Removes several slots, highest first.
    pub fn remove_slots(&mut self, page: PageId, slots: &[u16]) -> RegistryResult<Removal> {
        let mut ordered = slots.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        let mut removal = Removal::default();
        for slot in ordered {
            removal.merge(self.remove(page, slot)?);
        }
        Ok(removal)
    }

    /// Removes every slot on `page` holding an item with the same identity.
    pub fn remove_item(&mut self, page: PageId, item: &Item) -> RegistryResult<Removal> {
        let fingerprint = item.fingerprint();
        let slots: Vec<u16> = self
            .page_mut(page)?
            .items()
            .iter()
            .filter(|(_, stored)| stored.fingerprint() == fingerprint)
            .map(|(slot, _)| *slot)
            .collect();
        self.remove_slots(page, &slots)
    }

    /// Item currently shown at `slot`, if any.
    pub fn item_at(&self, page: PageId, slot: u16) -> Option<&Item> {
        self.pages.get(&page).and_then(|p| p.render(slot))
    }

    /// Location of the first item whose key matches, scanning page-major.
    pub fn find(&self, key: &str) -> Option<Placement> {
        self.pages.values().find_map(|page| {
            page.items()
                .iter()
                .find(|(_, item)| item.key == key)
                .map(|(slot, _)| Placement::new(page.id(), *slot))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(rows: u8) -> PageRegistry {
        let mut registry = PageRegistry::new(Setting::new(rows, "Page {page}"));
        registry
            .create_page(PageId(1), Setting::new(rows, "Page {page}"))
            .unwrap();
        registry.take_created();
        registry
    }

    fn keys_in_stream(registry: &PageRegistry) -> Vec<String> {
        registry
            .stream()
            .iter()
            .filter_map(|p| registry.item_at(p.page, p.slot))
            .map(|item| item.key.clone())
            .collect()
    }

    #[test]
    fn shared_page_id_is_rejected() {
        let mut registry = registry(1);
        let err = registry
            .create_page(PageId::SHARED, Setting::new(1, "x"))
            .unwrap_err();
        assert_eq!(err, ConfigError::ReservedPageId(PageId::SHARED));
    }

    #[test]
    fn duplicate_page_id_is_rejected() {
        let mut registry = registry(1);
        let err = registry
            .create_page(PageId(1), Setting::new(1, "x"))
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicatePageId(PageId(1)));
    }

    #[test]
    fn overflow_creates_ceil_n_over_capacity_pages() {
        let mut registry = registry(1);
        let mut seen = BTreeSet::new();
        for n in 0..20 {
            let placement = registry
                .allocate(PageId(1), Item::new(format!("item-{n}")), None)
                .unwrap();
            assert!(seen.insert(placement), "duplicate placement {placement:?}");
        }
        // 20 items over 9-slot pages.
        assert_eq!(registry.content_page_ids(), vec![PageId(1), PageId(2), PageId(3)]);
        assert_eq!(registry.page(PageId(3)).unwrap().len(), 2);
        assert_eq!(registry.take_created(), vec![PageId(2), PageId(3)]);
        assert_eq!(registry.page(PageId(3)).unwrap().title(), "Page 3");
    }

    #[test]
    fn overflow_respects_reserved_slots() {
        let mut registry = registry(2);
        registry.reservation_mut().nav_enabled = true;
        // 18 slots minus a 9-slot navigation band leaves 9 per page.
        for n in 0..12 {
            let placement = registry
                .allocate(PageId(1), Item::new(format!("{n}")), None)
                .unwrap();
            assert!(placement.slot < 9, "reserved slot chosen: {placement:?}");
        }
        assert_eq!(registry.content_page_ids().len(), 2);
    }

    #[test]
    fn overflow_skips_existing_ids() {
        let mut registry = registry(1);
        registry.create_page(PageId(2), Setting::new(1, "x")).unwrap();
        for n in 0..9 {
            registry.set_item(PageId(2), n, Item::new("fixed"), None).unwrap();
        }
        for n in 0..10 {
            registry.allocate(PageId(1), Item::new(format!("{n}")), None).unwrap();
        }
        assert_eq!(registry.find("9"), Some(Placement::new(PageId(3), 0)));
    }

    #[test]
    fn fully_reserved_template_is_an_error() {
        let mut registry = registry(1);
        registry.reservation_mut().nav_enabled = true;
        let err = registry
            .allocate(PageId(1), Item::new("x"), None)
            .unwrap_err();
        assert_eq!(err, ConfigError::NoAllocatableSlots { page: PageId(1) });
    }

    #[test]
    fn overflow_past_the_largest_page_id_is_an_error() {
        let mut registry = registry(1);
        let top = PageId(u32::MAX);
        registry.create_page(top, Setting::new(1, "x")).unwrap();
        for n in 0..9 {
            registry.allocate(top, Item::new(format!("{n}")), None).unwrap();
        }
        let err = registry.allocate(top, Item::new("one-more"), None).unwrap_err();
        assert_eq!(err, ConfigError::PageIdsExhausted { after: top });
        assert_eq!(registry.page(top).unwrap().len(), 9);
    }

    #[test]
    fn removal_compacts_the_virtual_stream() {
        let mut registry = registry(1);
        let placements: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|key| registry.allocate(PageId(1), Item::new(*key), None).unwrap())
            .collect();

        let removal = registry.remove(PageId(1), placements[1].slot).unwrap();
        assert!(removal.compacted);
        assert_eq!(keys_in_stream(&registry), vec!["A", "C", "D"]);
        assert_eq!(registry.item_at(PageId(1), 1).unwrap().key, "C");
        assert_eq!(registry.item_at(PageId(1), 2).unwrap().key, "D");
        assert!(registry.item_at(PageId(1), 3).is_none());
    }

    #[test]
    fn compaction_crosses_page_boundaries() {
        let mut registry = registry(1);
        for n in 0..11 {
            registry.allocate(PageId(1), Item::new(format!("{n}")), None).unwrap();
        }
        let removal = registry.remove(PageId(1), 0).unwrap();
        assert_eq!(removal.touched, BTreeSet::from([PageId(1), PageId(2)]));
        assert_eq!(registry.item_at(PageId(1), 8).unwrap().key, "9");
        assert_eq!(registry.item_at(PageId(2), 0).unwrap().key, "10");
        assert!(registry.item_at(PageId(2), 1).is_none());
        assert!(!registry.is_placed(PageId(2), 1));
        // Emptied pages are kept.
        registry.remove(PageId(2), 0).unwrap();
        assert!(registry.contains(PageId(2)));
    }

    #[test]
    fn explicit_items_are_never_shifted() {
        let mut registry = registry(1);
        registry.set_item(PageId(1), 2, Item::new("fixed"), None).unwrap();
        for key in ["A", "B", "C"] {
            registry.allocate(PageId(1), Item::new(key), None).unwrap();
        }
        // Stream: A@0 B@1 C@3.
        registry.remove(PageId(1), 0).unwrap();
        assert_eq!(registry.item_at(PageId(1), 0).unwrap().key, "B");
        assert_eq!(registry.item_at(PageId(1), 1).unwrap().key, "C");
        assert_eq!(registry.item_at(PageId(1), 2).unwrap().key, "fixed");
        assert!(registry.item_at(PageId(1), 3).is_none());

        let removal = registry.remove(PageId(1), 2).unwrap();
        assert!(!removal.compacted);
        assert_eq!(keys_in_stream(&registry), vec!["B", "C"]);
    }

    #[test]
    fn remove_slots_processes_highest_first() {
        let mut registry = registry(1);
        for key in ["A", "B", "C", "D", "E"] {
            registry.allocate(PageId(1), Item::new(key), None).unwrap();
        }
        registry.remove_slots(PageId(1), &[1, 3]).unwrap();
        assert_eq!(keys_in_stream(&registry), vec!["A", "C", "E"]);
    }

    #[test]
    fn remove_item_matches_identity() {
        let mut registry = registry(1);
        for key in ["A", "dup", "B", "dup"] {
            registry.allocate(PageId(1), Item::new(key), None).unwrap();
        }
        registry.remove_item(PageId(1), &Item::new("dup")).unwrap();
        assert_eq!(keys_in_stream(&registry), vec!["A", "B"]);
    }

    #[test]
    fn shared_seed_is_a_snapshot() {
        let mut registry = PageRegistry::new(Setting::new(1, "x"));
        registry
            .set_item(PageId::SHARED, 0, Item::new("first"), None)
            .unwrap();
        registry.create_page(PageId(1), Setting::new(1, "x")).unwrap();
        registry
            .set_item(PageId::SHARED, 1, Item::new("second"), None)
            .unwrap();

        let page = registry.page(PageId(1)).unwrap();
        assert_eq!(page.render(0).unwrap().key, "first");
        assert!(page.render(1).is_none());
    }
}
