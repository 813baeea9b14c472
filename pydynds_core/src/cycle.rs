//! Cycle-advance arithmetic for the Model.
//!
//! Every message takes `message_delay` cycles and every computation takes
//! `computation_cost` cycles. Messages and computations proceed in parallel,
//! so the slower of the two batches gates how far simulated time moves.

use pydynds_env::{Computation, Message, StatsSnapshot};

/// Anything stamped with the cycle it started at.
pub trait Timed {
    fn start_cycle(&self) -> u64;
}

impl Timed for Message {
    fn start_cycle(&self) -> u64 {
        Message::start_cycle(self)
    }
}

impl Timed for Computation {
    fn start_cycle(&self) -> u64 {
        Computation::start_cycle(self)
    }
}

/// Start cycle of the latest item, `None` for an empty batch.
pub fn find_latest_start<T: Timed>(items: &[T]) -> Option<u64> {
    items.iter().map(Timed::start_cycle).max()
}

/// Outcome of one [`CycleClock::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub from: u64,
    pub to: u64,
    pub new_messages: usize,
    pub new_computations: usize,
}

impl Advance {
    pub fn elapsed(&self) -> u64 {
        self.to - self.from
    }
}

/// Simulated clock driven by algorithm statistics.
#[derive(Debug, Clone)]
pub struct CycleClock {
    current_cycle: u64,
    message_delay: u64,
    computation_cost: u64,
    messages_seen: usize,
    computations_seen: usize,
}

impl CycleClock {
    pub fn new(message_delay: u64, computation_cost: u64) -> Self {
        Self {
            current_cycle: 0,
            message_delay,
            computation_cost,
            messages_seen: 0,
            computations_seen: 0,
        }
    }

    pub fn current_cycle(&self) -> u64 {
        self.current_cycle
    }

    pub fn message_delay(&self) -> u64 {
        self.message_delay
    }

    pub fn computation_cost(&self) -> u64 {
        self.computation_cost
    }

    /// Cycles until the latest message of `batch` is delivered.
    pub fn messages_time(&self, batch: &[Message]) -> Option<u64> {
        find_latest_start(batch)
            .map(|latest| self.elapsed_until(latest.saturating_add(self.message_delay)))
    }

    /// Cycles until the latest computation of `batch` completes.
    pub fn computations_time(&self, batch: &[Computation]) -> Option<u64> {
        find_latest_start(batch)
            .map(|latest| self.elapsed_until(latest.saturating_add(self.computation_cost)))
    }

    fn elapsed_until(&self, completion: u64) -> u64 {
        completion.saturating_sub(self.current_cycle)
    }

    /// Consumes the items of `stats` not seen yet and moves the clock.
    ///
    /// Empty batches do not contribute; two empty batches mean no advance.
    /// The clock saturates at `u64::MAX` instead of wrapping.
    pub fn advance(&mut self, stats: &StatsSnapshot) -> Advance {
        let new_messages = stats
            .unread_messages
            .get(self.messages_seen..)
            .unwrap_or_default();
        let new_computations = stats
            .unread_computations
            .get(self.computations_seen..)
            .unwrap_or_default();

        let elapsed = self
            .messages_time(new_messages)
            .into_iter()
            .chain(self.computations_time(new_computations))
            .max()
            .unwrap_or(0);

        let advance = Advance {
            from: self.current_cycle,
            to: self.current_cycle.saturating_add(elapsed),
            new_messages: new_messages.len(),
            new_computations: new_computations.len(),
        };

        self.messages_seen = stats.unread_messages.len();
        self.computations_seen = stats.unread_computations.len();
        self.current_cycle = advance.to;
        advance
    }
}
