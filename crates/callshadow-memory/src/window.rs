//! Memory window: bounded, ordered turn storage for one session
//!
//! The window is a synchronous state machine; the async two-phase
//! compaction protocol around it lives in `registry`. Compaction moves
//! through `idle -> compacting -> idle` whether it succeeds or fails; a
//! failed attempt leaves the same oldest turns eligible for the next one.

use std::collections::VecDeque;

use callshadow_protocol::{ContextSnapshot, ConversationStats, Turn, TurnInput};

use crate::config::MemoryConfig;
use crate::stats::aggregate;

/// Token that ties a summarization result back to the reservation that
/// produced it. A `clear` bumps the generation, so late results from before
/// the clear no longer match and are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionTicket {
    generation: u64,
    through_sequence: u64,
}

/// Snapshot of the oldest turns reserved for summarization.
#[derive(Debug, Clone)]
pub struct CompactionBatch {
    pub ticket: CompactionTicket,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompactionState {
    Idle,
    Compacting { through_sequence: u64 },
}

/// Ordered store of live turns for one session. Length never exceeds
/// `capacity`, even while a compaction is in flight: hard FIFO eviction in
/// `append` is the unconditional safety net.
#[derive(Debug)]
pub struct MemoryWindow {
    session_id: String,
    capacity: usize,
    soft_threshold: usize,
    compaction_batch: usize,
    turns: VecDeque<Turn>,
    summary: String,
    next_sequence: u64,
    generation: u64,
    compaction: CompactionState,
}

impl MemoryWindow {
    pub fn new(session_id: &str, config: &MemoryConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            session_id: session_id.to_string(),
            capacity: config.capacity,
            soft_threshold: config.soft_threshold,
            compaction_batch: config.compaction_batch,
            turns: VecDeque::with_capacity(config.capacity.min(4096)),
            summary: String::new(),
            next_sequence: 0,
            generation: 0,
            compaction: CompactionState::Idle,
        }
    }

    /// Append one validated turn. Assigns the sequence number and timestamp,
    /// then evicts oldest turns until the capacity bound holds again.
    /// Infallible; returns the assigned sequence number.
    pub fn append(&mut self, input: TurnInput) -> u64 {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.turns.push_back(Turn::from_input(sequence, input));
        while self.turns.len() > self.capacity {
            if self.turns.pop_front().is_none() {
                break;
            }
            tracing::debug!(
                session_id = %self.session_id,
                capacity = self.capacity,
                "evicted oldest turn at hard capacity"
            );
        }
        sequence
    }

    /// Reserve the oldest turns for summarization once the soft threshold is
    /// reached. Returns `None` below the threshold or while a compaction is
    /// already in flight (back-pressure by suppression, not queuing).
    pub fn begin_compaction(&mut self) -> Option<CompactionBatch> {
        if self.compaction != CompactionState::Idle || self.turns.len() < self.soft_threshold {
            return None;
        }
        let take = self.compaction_batch.min(self.turns.len());
        let turns: Vec<Turn> = self.turns.iter().take(take).cloned().collect();
        let through_sequence = turns.last()?.sequence;
        self.compaction = CompactionState::Compacting { through_sequence };
        Some(CompactionBatch {
            ticket: CompactionTicket {
                generation: self.generation,
                through_sequence,
            },
            turns,
        })
    }

    /// Fold a successful summarization result back in: merge the text into
    /// the accumulated summary and drop the summarized turns. Returns false
    /// (mutating nothing) when the ticket is stale, i.e. the window was
    /// cleared while the summarizer ran.
    pub fn apply_summary(&mut self, ticket: CompactionTicket, text: String) -> bool {
        if !self.ticket_is_current(ticket) {
            return false;
        }
        if !self.summary.is_empty() {
            self.summary.push('\n');
        }
        self.summary.push_str(&text);
        while self
            .turns
            .front()
            .is_some_and(|turn| turn.sequence <= ticket.through_sequence)
        {
            self.turns.pop_front();
        }
        self.compaction = CompactionState::Idle;
        true
    }

    /// Release a reservation after a failed or timed-out summarization.
    /// Turns and summary stay untouched; the same oldest turns remain
    /// eligible for a future attempt.
    pub fn abort_compaction(&mut self, ticket: CompactionTicket) {
        if self.ticket_is_current(ticket) {
            self.compaction = CompactionState::Idle;
        }
    }

    fn ticket_is_current(&self, ticket: CompactionTicket) -> bool {
        ticket.generation == self.generation
            && self.compaction
                == CompactionState::Compacting {
                    through_sequence: ticket.through_sequence,
                }
    }

    /// Structured view of recent state: the accumulated summary plus up to
    /// `max_turns` of the most recent live turns, oldest first. Never
    /// mutates.
    pub fn context(&self, max_turns: Option<usize>) -> ContextSnapshot {
        let take = max_turns.unwrap_or(self.turns.len()).min(self.turns.len());
        let turns: Vec<Turn> = self
            .turns
            .iter()
            .skip(self.turns.len() - take)
            .cloned()
            .collect();
        let summary_text = if self.summary.is_empty() {
            None
        } else {
            Some(self.summary.clone())
        };
        ContextSnapshot {
            summary_text,
            turns,
        }
    }

    /// Aggregate counts over the live turns only.
    pub fn stats(&self) -> ConversationStats {
        aggregate(&self.turns)
    }

    /// Empty turns and summary. The sequence counter keeps counting and the
    /// generation changes, so in-flight summarization results are dropped.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.summary.clear();
        self.generation += 1;
        self.compaction = CompactionState::Idle;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn summary(&self) -> Option<&str> {
        if self.summary.is_empty() {
            None
        } else {
            Some(self.summary.as_str())
        }
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.back()
    }
}
