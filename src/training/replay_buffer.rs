use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::error::BufferUnderflow;
use crate::game::{Action, GameState};

/// One step of experience, rewarded from the perspective of the player who
/// chose `action`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: GameState,
    pub action: Action,
    pub reward: f32,
    pub next_state: GameState,
    pub terminal: bool,
}

/// Bounded FIFO store of transitions with uniform sampling.
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, rng: StdRng) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            rng,
        }
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::new(capacity, StdRng::seed_from_u64(seed))
    }

    /// Add a transition, evicting the oldest one when full.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` distinct transitions uniformly at random. Nothing is
    /// drawn when the buffer holds fewer than requested.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<Transition>, BufferUnderflow> {
        if batch_size > self.buffer.len() {
            return Err(BufferUnderflow {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }
        let indices = index::sample(&mut self.rng, self.buffer.len(), batch_size);
        Ok(indices.iter().map(|i| self.buffer[i].clone()).collect())
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

    /// Stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
