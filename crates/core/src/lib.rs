//! Core domain logic for rankvote.
//!
//! The computational heart of the system lives here:
//!
//! - **Tabulation**: [`tabulation::tabulate`], the pure instant-runoff
//!   engine, and [`tiebreak`], its cascading elimination resolver
//! - **Services**: [`ContestService`] and [`BallotService`], the CRUD
//!   orchestration over the persistence collaborator
//! - **Notification routing**: the [`notify`] contract handed to the
//!   delivery collaborator, plus the webhook-backed default
//!   implementation in [`webhook`]

pub mod notify;
pub mod services;
pub mod tabulation;
pub mod tiebreak;
pub mod webhook;

pub use notify::{EventKind, EventPayload, NotificationDispatcher, RecordingDispatcher};
pub use services::{
    BallotService, CastBallotInput, ContestService, CreateContestInput, CreateRecurrenceInput,
};
pub use tabulation::{IrvResult, Round, tabulate};
pub use tiebreak::{Elimination, TieBreak, TieBreakCause};
pub use webhook::WebhookDispatcher;
