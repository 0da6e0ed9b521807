mod circle;
mod matching;
mod slot;
mod trace;
mod user;

pub use circle::{Circle, NewCircle};
pub use matching::{
    ClaimOutcome, MatchingResult, MatchingRunReport, MatchingStatus, MatchingStatusRecord,
    ResultStatus,
};
pub use slot::{OccurrencePhase, SlotOccurrence, SlotOfDay, SlotView};
pub use trace::RequestLogEntry;
pub use user::{EligibleUser, Gender, WaitlistEntry};
