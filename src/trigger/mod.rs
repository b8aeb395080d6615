mod controller;

pub use controller::{TriggerController, TriggerDecision, TriggerThresholds};
