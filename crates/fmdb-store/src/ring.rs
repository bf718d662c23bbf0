//! Rings: per-kind ordered member lists
//!
//! A [`Ring`] keeps the members of one entity kind inside one scope in a
//! doubly linked order plus a userID index. Connect inserts in userID
//! order; [`Ring::move_after`] splices anywhere in O(1).

use fmdb_types::{Handle, TypeTag, UserId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Ordered homogeneous member list
#[derive(Debug, Clone)]
pub struct Ring {
    tag: TypeTag,
    head: Option<Handle>,
    tail: Option<Handle>,
    links: HashMap<Handle, Link>,
    by_id: BTreeMap<UserId, Handle>,
}

impl Ring {
    #[must_use]
    pub fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            head: None,
            tail: None,
            links: HashMap::new(),
            by_id: BTreeMap::new(),
        }
    }

    /// Member kind
    #[inline]
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.tag.label()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.links.contains_key(&handle)
    }

    /// Member with the given userID
    #[inline]
    #[must_use]
    pub fn get(&self, id: UserId) -> Option<Handle> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    #[must_use]
    pub fn is_taken(&self, id: UserId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Largest userID in use (0 when empty)
    #[must_use]
    pub fn max_id(&self) -> UserId {
        self.by_id.keys().next_back().copied().unwrap_or(UserId::UNSET)
    }

    /// Smallest positive userID not in use
    #[must_use]
    pub fn first_hole(&self) -> UserId {
        let mut candidate = UserId::new(1);
        for id in self.by_id.keys().filter(|id| id.get() > 0) {
            if *id != candidate {
                break;
            }
            candidate = candidate.next();
        }
        candidate
    }

    /// Next free userID under the given policy
    #[must_use]
    pub fn next_id(&self, reuse_holes: bool) -> UserId {
        if reuse_holes {
            self.first_hole()
        } else {
            self.max_id().next()
        }
    }

    /// Insert keeping userID order
    ///
    /// Callers check [`Ring::is_taken`] first; a taken ID is left alone.
    pub(crate) fn insert_sorted(&mut self, handle: Handle, id: UserId) -> bool {
        if self.by_id.contains_key(&id) || self.links.contains_key(&handle) {
            return false;
        }
        let before = self.by_id.range(..id).next_back().map(|(_, h)| *h);
        self.by_id.insert(id, handle);
        self.links.insert(handle, Link::default());
        match before {
            Some(anchor) => self.link_after(handle, anchor),
            None => self.link_front(handle),
        }
        true
    }

    /// Remove a member
    pub(crate) fn remove(&mut self, handle: Handle, id: UserId) -> bool {
        if !self.links.contains_key(&handle) {
            return false;
        }
        self.unlink(handle);
        self.links.remove(&handle);
        if self.by_id.get(&id) == Some(&handle) {
            self.by_id.remove(&id);
        } else {
            self.by_id.retain(|_, h| *h != handle);
        }
        true
    }

    /// Change the userID key of a member without moving it
    pub(crate) fn rekey(&mut self, handle: Handle, old: UserId, new: UserId) -> bool {
        if self.by_id.get(&old) != Some(&handle) || self.by_id.contains_key(&new) {
            return false;
        }
        self.by_id.remove(&old);
        self.by_id.insert(new, handle);
        true
    }

    /// Splice `handle` directly after `anchor` in O(1)
    ///
    /// Both must be members. Returns false otherwise.
    pub(crate) fn move_after(&mut self, handle: Handle, anchor: Handle) -> bool {
        if handle == anchor || !self.contains(handle) || !self.contains(anchor) {
            return false;
        }
        self.unlink(handle);
        self.link_after(handle, anchor);
        true
    }

    fn link_front(&mut self, handle: Handle) {
        let old_head = self.head;
        if let Some(link) = self.links.get_mut(&handle) {
            *link = Link {
                prev: None,
                next: old_head,
            };
        }
        match old_head.and_then(|h| self.links.get_mut(&h)) {
            Some(link) => link.prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }

    fn link_after(&mut self, handle: Handle, anchor: Handle) {
        let next = self.links.get(&anchor).and_then(|l| l.next);
        if let Some(link) = self.links.get_mut(&handle) {
            *link = Link {
                prev: Some(anchor),
                next,
            };
        }
        if let Some(link) = self.links.get_mut(&anchor) {
            link.next = Some(handle);
        }
        match next.and_then(|h| self.links.get_mut(&h)) {
            Some(link) => link.prev = Some(handle),
            None => self.tail = Some(handle),
        }
    }

    fn unlink(&mut self, handle: Handle) {
        let Link { prev, next } = self.links.get(&handle).copied().unwrap_or_default();
        match prev.and_then(|h| self.links.get_mut(&h)) {
            Some(link) => link.next = next,
            None => self.head = next,
        }
        match next.and_then(|h| self.links.get_mut(&h)) {
            Some(link) => link.prev = prev,
            None => self.tail = prev,
        }
    }

    /// Members in ring order
    pub fn iter(&self) -> RingIter<'_> {
        RingIter {
            ring: self,
            cursor: self.head,
        }
    }
}

/// Iterator over ring members
pub struct RingIter<'a> {
    ring: &'a Ring,
    cursor: Option<Handle>,
}

impl Iterator for RingIter<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let current = self.cursor?;
        self.cursor = self.ring.links.get(&current).and_then(|l| l.next);
        Some(current)
    }
}

/// One ring per entity kind, in serialization rank order
#[derive(Debug, Clone)]
pub struct RingMap {
    rings: Vec<Ring>,
}

impl Default for RingMap {
    fn default() -> Self {
        Self {
            rings: TypeTag::ALL.iter().copied().map(Ring::new).collect(),
        }
    }
}

impl RingMap {
    #[inline]
    #[must_use]
    pub fn ring(&self, tag: TypeTag) -> &Ring {
        &self.rings[tag.rank() as usize]
    }

    #[inline]
    pub(crate) fn ring_mut(&mut self, tag: TypeTag) -> &mut Ring {
        &mut self.rings[tag.rank() as usize]
    }

    /// Rings in rank order
    pub fn iter(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }

    /// Total member count over all rings
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.rings.iter().map(Ring::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(i: u32) -> Handle {
        Handle::from_raw(i, 1)
    }

    fn ids(ring: &Ring) -> Vec<u32> {
        ring.iter().map(Handle::index).collect()
    }

    #[test]
    fn ring_insert_sorted_by_id() {
        let mut ring = Ring::new(TypeTag::Triad);
        assert!(ring.insert_sorted(h(3), UserId::new(3)));
        assert!(ring.insert_sorted(h(1), UserId::new(1)));
        assert!(ring.insert_sorted(h(2), UserId::new(2)));
        assert_eq!(ids(&ring), vec![1, 2, 3]);
        assert_eq!(ring.max_id(), UserId::new(3));
    }

    #[test]
    fn ring_rejects_taken_id() {
        let mut ring = Ring::new(TypeTag::Triad);
        assert!(ring.insert_sorted(h(1), UserId::new(1)));
        assert!(!ring.insert_sorted(h(2), UserId::new(1)));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(UserId::new(1)), Some(h(1)));
    }

    #[test]
    fn ring_first_hole_and_next_id() {
        let mut ring = Ring::new(TypeTag::Part);
        assert_eq!(ring.first_hole(), UserId::new(1));
        for i in [1, 2, 4] {
            ring.insert_sorted(h(i), UserId::new(i as i32));
        }
        assert_eq!(ring.first_hole(), UserId::new(3));
        assert_eq!(ring.next_id(true), UserId::new(3));
        assert_eq!(ring.next_id(false), UserId::new(5));
    }

    #[test]
    fn ring_move_after_and_remove() {
        let mut ring = Ring::new(TypeTag::Load);
        for i in 1..=4 {
            ring.insert_sorted(h(i), UserId::new(i as i32));
        }
        assert!(ring.move_after(h(1), h(3)));
        assert_eq!(ids(&ring), vec![2, 3, 1, 4]);

        assert!(ring.move_after(h(4), h(2)));
        assert_eq!(ids(&ring), vec![2, 4, 3, 1]);

        assert!(ring.remove(h(2), UserId::new(2)));
        assert_eq!(ids(&ring), vec![4, 3, 1]);
        assert!(!ring.remove(h(2), UserId::new(2)));
        assert!(!ring.move_after(h(2), h(4)));
    }

    #[test]
    fn ring_rekey_keeps_position() {
        let mut ring = Ring::new(TypeTag::Engine);
        ring.insert_sorted(h(1), UserId::new(1));
        ring.insert_sorted(h(2), UserId::new(2));
        assert!(ring.rekey(h(1), UserId::new(1), UserId::new(9)));
        assert_eq!(ids(&ring), vec![1, 2]);
        assert_eq!(ring.get(UserId::new(9)), Some(h(1)));
        assert!(!ring.rekey(h(2), UserId::new(2), UserId::new(9)));
    }

    #[test]
    fn ring_map_has_every_kind_in_rank_order() {
        let map = RingMap::default();
        let tags: Vec<TypeTag> = map.iter().map(Ring::tag).collect();
        assert_eq!(tags, TypeTag::ALL.to_vec());
        assert_eq!(map.member_count(), 0);
    }
}
