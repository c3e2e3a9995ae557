use http::{HeaderMap, HeaderName};

use crate::arena::Span;
use crate::ensure;
use crate::protocol::CapacityError;

/// Largest header table a store will hold; `HeaderMap` panics well above it.
pub const MAX_HEADERS_LIMIT: usize = 16 * 1024;

/// Where a header's text lives inside the owning message's arena.
///
/// `name` keeps the casing the header arrived or was set with, it is what gets
/// written back on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSlot {
    pub name: Span,
    pub value: Span,
}

/// Bounded, case-insensitive header table.
///
/// Keys are [`HeaderName`]s, which are lower-cased on construction, so
/// `Content-Type` and `content-type` land on the same entry. Iteration follows
/// insertion order, overwriting a key keeps its position.
#[derive(Debug)]
pub struct HeaderStore {
    map: HeaderMap<HeaderSlot>,
    max_num: usize,
}

impl HeaderStore {
    /// `max_num` is clamped to [`MAX_HEADERS_LIMIT`].
    pub fn with_capacity(max_num: usize) -> Self {
        let max_num = max_num.min(MAX_HEADERS_LIMIT);
        Self { map: HeaderMap::with_capacity(max_num), max_num }
    }

    /// Inserts or overwrites in place.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::TooManyHeaders`] when `key` is new and the
    /// table is already full.
    pub fn set(&mut self, key: HeaderName, slot: HeaderSlot) -> Result<(), CapacityError> {
        if let Some(existing) = self.map.get_mut(&key) {
            existing.value = slot.value;
            return Ok(());
        }
        ensure!(self.map.len() < self.max_num, CapacityError::too_many_headers(self.max_num));
        self.map.insert(key, slot);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&HeaderSlot> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn max_num(&self) -> usize {
        self.max_num
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderSlot)> {
        self.map.iter()
    }

    /// Empties the table, keeping its allocation for the next message.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
