/// Handle to a scheduled delay. Stale handles (from before a `cancel_all`)
/// are recognized and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    generation: u64,
}

impl TimerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Scheduled<K> {
    handle: TimerHandle,
    due_ms: i64,
    kind: K,
}

/// The set of pending delays belonging to one round (or one session).
///
/// Nothing fires on its own: the owner calls [`TimerSet::pop_due`] from its
/// poll and handles each expired timer in due order. Cancelling the whole set
/// bumps the generation so a handle kept from a previous round can never
/// touch the new round's timers.
#[derive(Debug, Clone)]
pub struct TimerSet<K> {
    generation: u64,
    next_id: u64,
    scheduled: Vec<Scheduled<K>>,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        Self {
            generation: 0,
            next_id: 0,
            scheduled: Vec::new(),
        }
    }
}

impl<K: Copy> TimerSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire once the clock reaches `due_ms`.
    pub fn schedule(&mut self, kind: K, due_ms: i64) -> TimerHandle {
        let handle = TimerHandle {
            id: self.next_id,
            generation: self.generation,
        };
        self.next_id += 1;
        self.scheduled.push(Scheduled {
            handle,
            due_ms,
            kind,
        });
        handle
    }

    /// Cancel a single timer. Returns false for fired, cancelled or stale handles.
    #[cfg(test)]
    fn cancel(&mut self, handle: TimerHandle) -> bool {
        if handle.generation != self.generation {
            return false;
        }
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.handle != handle);
        self.scheduled.len() != before
    }

    /// Cancel every pending timer and start a new generation.
    pub fn cancel_all(&mut self) {
        self.scheduled.clear();
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if `handle` belongs to the current generation and is still pending
    #[cfg(test)]
    fn is_pending(&self, handle: TimerHandle) -> bool {
        handle.generation == self.generation && self.scheduled.iter().any(|s| s.handle == handle)
    }

    /// Earliest due time among pending timers
    pub fn next_due_ms(&self) -> Option<i64> {
        self.scheduled.iter().map(|s| s.due_ms).min()
    }

    /// Remove and return the earliest timer due at or before `now_ms`,
    /// together with its due time. Equal due times fire in schedule order.
    pub fn pop_due(&mut self, now_ms: i64) -> Option<(K, i64)> {
        let idx = self
            .scheduled
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= now_ms)
            .min_by_key(|(_, s)| (s.due_ms, s.handle.id))
            .map(|(idx, _)| idx)?;
        let fired = self.scheduled.remove(idx);
        Some((fired.kind, fired.due_ms))
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}
