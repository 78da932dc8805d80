//! Ordered subsystem startup with reverse-order teardown.
//!
//! Each successful stage may register a teardown closure on an explicit stack.
//! Shutdown pops the stack, so a subsystem is never torn down while something
//! initialized after it is still alive.

mod sequencer;

pub use sequencer::{StartupError, StartupSequencer, TeardownStack};
