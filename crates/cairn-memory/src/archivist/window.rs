// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation windows for extraction.

use std::collections::VecDeque;

use crate::types::Turn;

/// Split a transcript into overlapping windows of `window` turns.
///
/// Windows start every `stride` turns; a transcript shorter than one window
/// yields a single window with everything. `max_windows` caps the output.
pub fn make_windows(
    turns: &[Turn],
    window: usize,
    stride: usize,
    max_windows: Option<usize>,
) -> Vec<&[Turn]> {
    if turns.is_empty() {
        return vec![];
    }
    let window = window.max(1);
    let stride = stride.max(1);
    let last_start = turns.len().saturating_sub(window);

    (0..=last_start)
        .step_by(stride)
        .take(max_windows.unwrap_or(usize::MAX))
        .map(|start| &turns[start..(start + window).min(turns.len())])
        .collect()
}

/// Rolling buffer of a conversation's recent turns.
///
/// Counts turns added since the last extraction so the archivist only runs
/// after enough new material has arrived.
#[derive(Debug, Clone)]
pub struct TurnBuffer {
    turns: VecDeque<Turn>,
    capacity: usize,
    new_turns: usize,
}

impl TurnBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            new_turns: 0,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
        self.new_turns += 1;
    }

    /// Turns added since the last [`TurnBuffer::take_window`].
    pub fn new_turns(&self) -> usize {
        self.new_turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Snapshot the buffered window and reset the new-turn counter.
    pub fn take_window(&mut self) -> Vec<Turn> {
        self.new_turns = 0;
        self.turns.iter().cloned().collect()
    }
}
