pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod eligibility;
pub mod errors;
pub mod lock;
pub mod logging;
pub mod metadata;
pub mod processor;
pub mod report;
pub mod scanner;

pub use controller::{RunController, RunOutcome};
