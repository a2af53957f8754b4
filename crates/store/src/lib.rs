//! Persisted entities and the persistence contract for rankvote.
//!
//! The store *implementation* is an external collaborator; this crate
//! pins down what it must provide:
//!
//! - **Entities**: [`Contest`] (with its owned [`RecurrenceRule`] and
//!   [`NotificationState`] sub-records) and [`Ballot`]
//! - **Contract**: the [`ContestStore`] trait — gets, due listings, and
//!   the conditional one-shot mutations the scheduler's idempotency
//!   rests on
//! - **Reference**: [`MemoryStore`], an in-memory implementation for
//!   tests and the demo daemon

pub mod ballot;
pub mod contest;
pub mod memory;
pub mod store;

pub use ballot::Ballot;
pub use contest::{ChannelLink, Contest, NotificationState, RecurrenceRule};
pub use memory::MemoryStore;
pub use store::ContestStore;
