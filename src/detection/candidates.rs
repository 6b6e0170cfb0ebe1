//! In-memory buffer of recently detected spaces.

use crate::core::types::{DetectedSpace, SpaceCode};
use std::collections::VecDeque;

/// Bounded FIFO of detected spaces. The oldest entry is evicted when full.
#[derive(Debug, Clone)]
pub struct CandidateBuffer {
    spaces: VecDeque<DetectedSpace>,
    capacity: usize,
}

impl CandidateBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            spaces: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, space: DetectedSpace) {
        if self.spaces.len() == self.capacity {
            self.spaces.pop_front();
        }
        self.spaces.push_back(space);
    }

    /// Most recent space
    pub fn latest(&self) -> Option<&DetectedSpace> {
        self.spaces.back()
    }

    /// Most recent space matching a selection code
    pub fn find(&self, code: SpaceCode) -> Option<&DetectedSpace> {
        self.spaces.iter().rev().find(|s| s.code() == code)
    }

    /// Snapshot, oldest first
    pub fn to_vec(&self) -> Vec<DetectedSpace> {
        self.spaces.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}
