//! Hayes modem protocol: result-code classification, the init/answer
//! sequence and the post-call reset.

pub mod event;
pub mod reset;
pub mod sequencer;

pub use event::{trim_line, ModemEvent, ResponseClassifier};
pub use reset::{ModemReset, ResetOutcome};
pub use sequencer::AnswerSequencer;
