//! Handoff coordinator
//!
//! Decides whether one agent may transfer a conversation to another, enforcing
//! per-conversation rate limits, loop prevention and a confidence gate. Decisions
//! for one conversation are serialized behind a per-conversation lock.

mod coordinator;
mod history;
mod types;


pub use coordinator::HandoffCoordinator;
pub use types::{
    BlockReason, HandoffDecision, HandoffOutcome, HandoffRecord, HandoffRequest, OutcomeCounts,
    HANDOFF_OPERATION,
};
