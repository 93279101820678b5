//! Two-tier request log: a buffer of recently touched entries in front of the
//! canonical, published sequence.
//!
//! Producers only ever write to the buffer. [`LogBatcher::flush`] drains the
//! whole buffer into the canonical sequence with a fixed merge policy:
//!
//! - an entry whose id is already canonical replaces it in place;
//! - any other entry is appended to the end.
//!
//! The buffer is keyed by [`RequestId`] in a `BTreeMap`, so one flush appends
//! its new entries in dispatch order. Across flushes the canonical order is
//! the order in which entries were first flushed, which is not necessarily
//! chronological by start time.

use crate::types::{ErrorKind, RequestId, RequestLog};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct LogBatcher {
    buffered: BTreeMap<RequestId, RequestLog>,
    canonical: Vec<RequestLog>,
    index: HashMap<RequestId, usize>,
    // Canonical entries changed in place since the last flush
    dirty: bool,
}

impl LogBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `log` into the buffer, replacing any buffered entry with the same id.
    pub fn stage(&mut self, log: RequestLog) {
        self.buffered.insert(log.id, log);
    }

    /// Latest known version of an entry, buffered first.
    pub fn get(&self, id: RequestId) -> Option<&RequestLog> {
        self.buffered.get(&id).or_else(|| {
            self.index
                .get(&id)
                .and_then(|&position| self.canonical.get(position))
        })
    }

    /// Merges every buffered entry into the canonical sequence.
    ///
    /// Returns `true` when the canonical sequence changed since the previous
    /// flush and should be republished.
    pub fn flush(&mut self) -> bool {
        let changed = self.dirty || !self.buffered.is_empty();
        self.dirty = false;

        let batch = std::mem::take(&mut self.buffered);
        for (id, log) in batch {
            match self.index.get(&id).copied() {
                Some(position) => {
                    if let Some(slot) = self.canonical.get_mut(position) {
                        *slot = log;
                    }
                }
                None => {
                    self.index.insert(id, self.canonical.len());
                    self.canonical.push(log);
                }
            }
        }

        changed
    }

    /// Forces every pending entry, canonical or buffered, to `failed`.
    ///
    /// Returns how many entries were overridden.
    pub fn fail_pending(&mut self, kind: ErrorKind, message: &str) -> u64 {
        let mut overridden = 0u64;

        for log in self.canonical.iter_mut().filter(|log| log.is_pending()) {
            log.fail(kind, message);
            overridden += 1;
            self.dirty = true;
        }

        for log in self.buffered.values_mut().filter(|log| log.is_pending()) {
            log.fail(kind, message);
            overridden += 1;
        }

        overridden
    }

    pub fn canonical(&self) -> &[RequestLog] {
        &self.canonical
    }

    #[cfg(test)]
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }
}
