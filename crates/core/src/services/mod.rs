//! Business logic services.

pub mod ballot;
pub mod contest;

pub use ballot::{BallotService, CastBallotInput};
pub use contest::{ContestService, CreateContestInput, CreateRecurrenceInput};
