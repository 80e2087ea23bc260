use std::time::Duration;

use crate::foundation::core::{Pts, StreamKind};
use crate::timeline::sampler::TimelineSample;

/// Stream kind whose samples drive scheduling. Other kinds are ignored.
pub const DRIVING_KIND: StreamKind = StreamKind::Video;

#[derive(Debug)]
struct Pending<A> {
    target: Pts,
    action: A,
}

/// An action released by the scheduler.
///
/// `delay` is zero when the target has already been reached. Otherwise the next sample is
/// expected to overshoot the target and the caller should run the action after `delay` on a
/// best-effort timer; the error is bounded by one sample interval.
#[derive(Debug, PartialEq, Eq)]
pub struct Firing<A> {
    pub target: Pts,
    pub delay: Duration,
    pub action: A,
}

/// Pending timed actions, released as timeline samples approach their targets.
///
/// Actions are kept sorted by target timestamp; equal targets keep insertion order. At most one
/// action is released per sample.
#[derive(Debug)]
pub struct ActionScheduler<A> {
    pending: Vec<Pending<A>>,
    next: Option<Pts>,
    last_sample: Option<Pts>,
}

impl<A> Default for ActionScheduler<A> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next: None,
            last_sample: None,
        }
    }
}

impl<A> ActionScheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to run when the timeline reaches `target`.
    pub fn schedule(&mut self, target: Pts, action: A) {
        let at = self.pending.partition_point(|p| p.target <= target);
        self.pending.insert(at, Pending { target, action });
        self.next = self.pending.first().map(|p| p.target);
    }

    /// Cached smallest pending target.
    pub fn next_target(&self) -> Option<Pts> {
        self.next
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Most recent driving sample seen.
    pub fn last_sample(&self) -> Option<Pts> {
        self.last_sample
    }

    /// Drop every pending action and forget the sample history.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.next = None;
        self.last_sample = None;
    }

    /// Evaluate one timeline sample.
    pub fn on_sample(&mut self, sample: TimelineSample) -> Option<Firing<A>> {
        if sample.kind != DRIVING_KIND {
            return None;
        }
        let pts = sample.pts;
        let previous = self.last_sample.replace(pts);
        let next = self.next?;

        if pts >= next {
            return self.fire(Duration::ZERO);
        }
        // Extrapolate from the last interval: if the next sample will land past the target,
        // release now with an estimated wall-clock delay instead of waiting a full interval.
        let delta = previous.map(|prev| pts.0.saturating_sub(prev.0))?;
        if pts.0.saturating_add(delta) > next.0 {
            return self.fire(pts.until(next));
        }
        None
    }

    fn fire(&mut self, delay: Duration) -> Option<Firing<A>> {
        if self.pending.is_empty() {
            return None;
        }
        let Pending { target, action } = self.pending.remove(0);
        self.next = self.pending.first().map(|p| p.target);
        Some(Firing {
            target,
            delay,
            action,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/scheduler.rs"]
mod tests;
