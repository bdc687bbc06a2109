//! Test doubles shared by unit and behavioural suites.

mod io;
mod reporter;

pub use io::{FailingWriter, ScriptedInput, SharedBuffer};
pub use reporter::{HealthEvent, RecordingHealthReporter};
