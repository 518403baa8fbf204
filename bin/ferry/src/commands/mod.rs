//! Subcommands for the ferry binary.

mod replicate;
pub use replicate::ReplicateCommand;

mod tip;
pub use tip::TipCommand;

mod verify;
pub use verify::VerifyCommand;

mod inspect;
pub use inspect::InspectCommand;

mod report;
