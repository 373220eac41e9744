//! Document change detection and the single-flight busy gate.

pub mod detector;
pub mod gate;

pub use detector::{ChangeDetector, PlainTextExtractor, TextExtractor, TriggerEvent};
pub use gate::BusyGate;
