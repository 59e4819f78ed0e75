use ndarray::Array1;
use rand::Rng;
use std::collections::VecDeque;

/// One recorded transition. Never mutated once stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// Bounded FIFO of experiences with uniform sampling.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an experience, evicting the oldest one when full.
    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Draw `batch_size` experiences uniformly, with replacement.
    ///
    /// The same experience may appear more than once. Callers check
    /// `len() >= batch_size` first; an empty buffer yields an empty batch.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| &self.buffer[rng.gen_range(0..self.buffer.len())])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }
}
