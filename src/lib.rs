pub mod automation;
pub mod classifier;
pub mod config;
pub mod contact;
pub mod delay_manager;
pub mod error;
pub mod gate;
pub mod input_loader;
pub mod logger;
pub mod orchestrator;
pub mod resume_manager;
pub mod stats;
pub mod store;
pub mod webdriver;

// Exporting types for convenience
pub use automation::{AutomationError, MessagingSurface};
pub use classifier::{AttemptOutcome, FailureReason};
pub use config::{Config, Delays};
pub use contact::{ContactRecord, Status};
pub use error::{Error, Result};
pub use gate::{AutoGate, Checkpoint, ConsoleGate, ReadinessGate};
pub use orchestrator::Orchestrator;
pub use stats::RunStats;
pub use store::{open_store, ContactStore, FileStore};
pub use webdriver::WebDriverSurface;
