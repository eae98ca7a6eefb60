// src/model/queues.rs

use std::collections::VecDeque;

/// Fixed-length pipe: whatever goes in at the back comes out `delay` pops later.
#[derive(Debug, Clone, Default)]
pub struct TimeDelayQueue {
    buffer: VecDeque<u32>,
}

impl TimeDelayQueue {
    /// Pipe already carrying `fill` units in every slot (classic beer-game start).
    pub fn prefilled(delay: usize, fill: u32) -> Self {
        Self {
            buffer: std::iter::repeat(fill).take(delay).collect(),
        }
    }

    /// Items arriving at the destination. Call at the start of the turn.
    pub fn pop_arrival(&mut self) -> u32 {
        self.buffer.pop_front().unwrap_or(0)
    }

    /// Items entering the pipe. Call at the end of the turn.
    pub fn push_departure(&mut self, item: u32) {
        self.buffer.push_back(item);
    }

    /// Contents, next arrival first.
    pub fn contents(&self) -> Vec<u32> {
        self.buffer.iter().copied().collect()
    }
}
