//! Fixed-capacity, oldest-first sliding window of samples.

use std::collections::VecDeque;

use crate::sample::Sample;

/// Bounded FIFO of [`Sample`]s.
///
/// `len() <= capacity()` holds after every mutation. Insertion order is
/// chronological order; the front is the oldest sample.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// Append one sample and evict from the front while over capacity.
    /// Returns the number of evicted samples.
    pub fn push(&mut self, sample: Sample) -> usize {
        self.samples.push_back(sample);
        self.evict()
    }

    /// Append a batch, then evict. A batch larger than the capacity keeps
    /// only its newest `capacity` samples.
    pub fn extend<I: IntoIterator<Item = Sample>>(&mut self, batch: I) -> usize {
        self.samples.extend(batch);
        self.evict()
    }

    /// Replace the whole content, keeping the newest `capacity` samples.
    pub fn replace(&mut self, samples: Vec<Sample>) {
        self.samples = VecDeque::from(samples);
        self.evict();
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    fn evict(&mut self) -> usize {
        let excess = self.samples.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.samples.drain(..excess);
        }
        excess
    }
}
