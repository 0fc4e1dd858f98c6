use super::*;

use std::collections::BTreeMap;
use std::collections::VecDeque;

/// A discrete logical instant. Unrelated to wall-clock time.
pub type Timepoint = u64;

/// The schedule of pending actions, ordered by timepoint.
///
/// Each key of `segments` is one time segment: every action scheduled for
/// that timepoint, in the order it was added. A segment is dropped as soon
/// as its last action is popped, so the map never holds an empty queue.
///
/// `origin` is the timepoint of the most recently popped action. It only
/// moves forward on [`Timeline::pop`].
#[derive(Debug, Clone)]
pub struct Timeline<A> {
    origin: Timepoint,
    segments: BTreeMap<Timepoint, VecDeque<A>>,
    len: usize,
}

impl<A> Timeline<A> {
    pub fn new() -> Timeline<A> {
        Timeline {
            origin: 0,
            segments: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of pending actions across all segments.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The timepoint of the most recently popped action. This is "now".
    pub fn current_origin(&self) -> Timepoint {
        self.origin
    }

    /// The timepoint of the next action [`Timeline::pop`] would return.
    pub fn peek_time(&self) -> Option<Timepoint> {
        self.segments.keys().next().copied()
    }

    /// Add `action` at the absolute timepoint `t`.
    pub fn add(&mut self, action: A, t: Timepoint) -> Result<(), SimError> {
        if t < self.origin {
            return Err(SimError::NonCausal { requested: t, origin: self.origin });
        }
        self.segments.entry(t).or_default().push_back(action);
        self.len += 1;
        Ok(())
    }

    /// Add `action` at `delay` timepoints after the current origin.
    pub fn schedule_after(&mut self, delay: Timepoint, action: A) -> Result<Timepoint, SimError> {
        let t = self.origin
            .checked_add(delay)
            .ok_or(SimError::TimeOverflow { origin: self.origin, delay })?;
        self.add(action, t)?;
        Ok(t)
    }

    /// Remove the head action of the earliest segment and advance the origin to it.
    pub fn pop(&mut self) -> Option<A> {
        let mut segment = self.segments.first_entry()?;
        let t = *segment.key();
        let action = segment.get_mut().pop_front();
        if segment.get().is_empty() {
            segment.remove();
        }
        if action.is_some() {
            self.origin = t;
            self.len -= 1;
        }
        action
    }

    /// Drop every pending action and rewind the origin to zero.
    pub fn clear(&mut self) {
        self.origin = 0;
        self.segments.clear();
        self.len = 0;
    }
}

impl<A> Default for Timeline<A> {
    fn default() -> Self {
        Timeline::new()
    }
}
