//! Versioned streams with cursor addressing and prefix-reusing sync.
//!
//! A [`History`] is an append-only logical sequence with a movable read
//! cursor. Both the token stream and the parse/recovery stream are
//! histories; the incremental machinery never recomputes confirmed history,
//! it only synchronizes an old stream against a freshly produced one and
//! reuses the maximal shared prefix.
//!
//! [`History::sync`] is the heart of incrementality. It walks the old
//! derived stream and the new raw stream in lockstep through three one-way
//! phases:
//!
//! 1. **strong**: items pass the identity check; the old derived item is
//!    carried forward untouched.
//! 2. **weak**: identity broke but content still matches; the derived item
//!    is updated in place, keeping its computed state.
//! 3. **fresh**: true divergence; the rest of the old stream is discarded
//!    and derived items are initialized from scratch, each seeded from the
//!    previously produced item.
//!
//! Once a phase is left it is never re-entered, so a single edit splits the
//! stream into at most three contiguous regions.

/// Counts of how sync classified each new item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Items carried forward by identity.
    pub reused: usize,
    /// Items updated in place (content-equal, new allocation).
    pub updated: usize,
    /// Items initialized from scratch.
    pub fresh: usize,
}

impl SyncStats {
    /// Total items in the synchronized stream.
    pub fn total(&self) -> usize {
        self.reused + self.updated + self.fresh
    }
}

/// An append-only sequence with a movable read cursor.
///
/// The cursor always points at a real item; a history is never empty (it is
/// seeded with an anchor item at construction).
#[derive(Debug, Clone)]
pub struct History<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> History<T> {
    /// Create a history holding only `anchor`, cursor on it.
    pub fn new(anchor: T) -> Self {
        History {
            items: vec![anchor],
            cursor: 0,
        }
    }

    /// The item at the cursor.
    pub fn focused(&self) -> &T {
        &self.items[self.cursor.min(self.items.len() - 1)]
    }

    /// Cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items, oldest first.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Append an item and focus it.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.cursor = self.items.len() - 1;
    }

    /// Move the cursor to the last item.
    pub fn seek_end(&mut self) {
        self.cursor = self.items.len() - 1;
    }

    /// Move the cursor backward to the most recent item at or before the
    /// current position satisfying `predicate`.
    ///
    /// Returns whether a match was found; on failure the cursor moves to
    /// the first item (the anchor), so the caller's fallback is a restart
    /// from the very beginning.
    pub fn seek_backward(&mut self, predicate: impl Fn(&T) -> bool) -> bool {
        let mut idx = self.cursor;
        loop {
            if predicate(&self.items[idx]) {
                self.cursor = idx;
                return true;
            }
            if idx == 0 {
                self.cursor = 0;
                return false;
            }
            idx -= 1;
        }
    }

    /// Shift the cursor by a relative offset, clamped to the valid range.
    pub fn move_by(&mut self, delta: isize) {
        let pos = isize::try_from(self.cursor).unwrap_or(isize::MAX);
        let max = isize::try_from(self.items.len() - 1).unwrap_or(isize::MAX);
        self.cursor = usize::try_from(pos.saturating_add(delta).clamp(0, max)).unwrap_or(0);
    }

    /// Discard all items after the cursor.
    pub fn drop_tail(&mut self) {
        self.items.truncate(self.cursor + 1);
    }
}

impl<T: Clone> History<T> {
    /// Synchronize this stream against a freshly produced raw stream.
    ///
    /// `strong_check` detects identity matches (nothing changed at all);
    /// `weak_check` detects content matches (safe to keep derived state);
    /// `weak_update` rebuilds a derived item around the new raw item while
    /// keeping its computed state; `init` builds a derived item from
    /// scratch, seeded from the previously produced derived item (`None`
    /// only when the new stream starts fresh at position zero).
    ///
    /// The result's cursor is on the last item. An empty raw stream
    /// degenerates to this history's anchor alone, so the result always
    /// holds at least one item. Purely structural: no failure modes.
    pub fn sync<S>(
        &self,
        new: &[S],
        mut strong_check: impl FnMut(&T, &S) -> bool,
        mut weak_check: impl FnMut(&T, &S) -> bool,
        mut weak_update: impl FnMut(&T, &S) -> T,
        mut init: impl FnMut(Option<&T>, &S) -> T,
    ) -> (History<T>, SyncStats) {
        #[derive(PartialEq)]
        enum Phase {
            Strong,
            Weak,
            Fresh,
        }

        if new.is_empty() {
            return (
                History {
                    items: vec![self.items[0].clone()],
                    cursor: 0,
                },
                SyncStats::default(),
            );
        }

        let mut items: Vec<T> = Vec::with_capacity(new.len());
        let mut stats = SyncStats::default();
        let mut phase = Phase::Strong;

        for (idx, raw) in new.iter().enumerate() {
            let old = self.items.get(idx);
            if phase == Phase::Strong {
                match old {
                    Some(prev) if strong_check(prev, raw) => {
                        items.push(prev.clone());
                        stats.reused += 1;
                        continue;
                    }
                    Some(prev) if weak_check(prev, raw) => {
                        items.push(weak_update(prev, raw));
                        stats.updated += 1;
                        phase = Phase::Weak;
                        continue;
                    }
                    _ => phase = Phase::Fresh,
                }
            } else if phase == Phase::Weak {
                match old {
                    Some(prev) if weak_check(prev, raw) => {
                        items.push(weak_update(prev, raw));
                        stats.updated += 1;
                        continue;
                    }
                    _ => phase = Phase::Fresh,
                }
            }
            let item = init(items.last(), raw);
            items.push(item);
            stats.fresh += 1;
        }

        tracing::trace!(
            reused = stats.reused,
            updated = stats.updated,
            fresh = stats.fresh,
            "synchronized stream"
        );
        let cursor = items.len().saturating_sub(1);
        (History { items, cursor }, stats)
    }
}
