//! Sub-registration tracking for register-service and connection sessions.

use std::collections::HashMap;
use crate::transport::Descriptor;

/// Index of a sub-registration within its session.
///
/// Carried in the frame header's `reg_index`; `0` names the session's
/// own primary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u32);

impl RecordId {
    pub const PRIMARY: RecordId = RecordId(0);
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to one individually registered record.
///
/// Not `Clone`: removing a record consumes its handle.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RecordRef {
    session: Descriptor,
    id: RecordId,
}

impl RecordRef {
    pub(crate) fn new(session: Descriptor, id: RecordId) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Descriptor of the session that owns the record.
    pub fn session(&self) -> Descriptor {
        self.session
    }
}

/// A live sub-registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedRecord {
    pub rrtype: u16,
}

/// Records owned by one session, keyed by [`RecordId`].
#[derive(Debug)]
pub struct RecordRegistry {
    owner: Descriptor,
    next: u32,
    records: HashMap<RecordId, TrackedRecord>,
}

impl RecordRegistry {
    pub fn new(owner: Descriptor) -> Self {
        Self {
            owner,
            next: 1,
            records: HashMap::new(),
        }
    }

    /// Track a new record and hand out its reference.
    pub fn insert(&mut self, rrtype: u16) -> RecordRef {
        let id = RecordId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        self.records.insert(id, TrackedRecord { rrtype });
        RecordRef::new(self.owner, id)
    }

    /// `true` if `record` was issued by this registry and is still live.
    pub fn owns(&self, record: &RecordRef) -> bool {
        record.session == self.owner && self.records.contains_key(&record.id)
    }

    /// Stop tracking `record`, returning what was tracked.
    pub fn remove(&mut self, record: &RecordRef) -> Option<TrackedRecord> {
        if record.session != self.owner {
            return None;
        }
        self.forget(record.id)
    }

    /// Stop tracking the record with index `id`. Outstanding handles to
    /// it stop being owned.
    pub fn forget(&mut self, id: RecordId) -> Option<TrackedRecord> {
        self.records.remove(&id)
    }

    /// Forget every record. Returns how many were live.
    pub fn clear(&mut self) -> usize {
        let n = self.records.len();
        self.records.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
