use std::fmt;
use std::path::Path;

use log::{info, warn};

use crate::automation::{AutomationError, MessagingSurface};
use crate::contact::{ContactRecord, Status};
use crate::delay_manager::{Pace, Pacer};
use crate::logger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The search found no account for the phone number.
    NotOnPlatform,
    /// A protocol step raised an error.
    Interaction(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotOnPlatform => f.write_str("number not found on the platform"),
            FailureReason::Interaction(detail) => f.write_str(detail),
        }
    }
}

/// Result of one attempt. There is no partial or retry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Done,
    Failed(FailureReason),
}

impl AttemptOutcome {
    pub fn status(&self) -> Status {
        match self {
            AttemptOutcome::Done => Status::Done,
            AttemptOutcome::Failed(_) => Status::Failed,
        }
    }
}

/// Maps the protocol result to an outcome, in precedence order: a
/// lookup miss, then any step error, then success.
pub fn classify(result: Result<Lookup, AutomationError>) -> AttemptOutcome {
    match result {
        Ok(Lookup::NoResults) => AttemptOutcome::Failed(FailureReason::NotOnPlatform),
        Err(e) => AttemptOutcome::Failed(FailureReason::Interaction(e.to_string())),
        Ok(Lookup::Sent) => AttemptOutcome::Done,
    }
}

/// How far the protocol got without raising an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    NoResults,
    Sent,
}

/// Drives steps 1-6 of the protocol for one record.
fn deliver<M: MessagingSurface + ?Sized>(
    surface: &mut M,
    record: &ContactRecord,
    pacer: &Pacer,
) -> Result<Lookup, AutomationError> {
    pacer.pause(Pace::BetweenActions);
    surface.open_new_conversation()?;

    surface.search_recipient(&record.phone)?;
    pacer.pause(Pace::NewChatSearch);

    if surface.has_no_results()? {
        return Ok(Lookup::NoResults);
    }

    surface.select_first_result()?;
    pacer.pause(Pace::SelectResult);

    surface.enter_message_text(&record.message)?;
    pacer.pause(Pace::TypingSimulation);

    surface.invoke_send()?;
    pacer.pause(Pace::PostSend);
    Ok(Lookup::Sent)
}

/// Performs one attempt and classifies it. Never returns an error.
///
/// When `screenshot_dir` is set a capture is taken after a successful
/// send; a failed capture is logged and does not change the outcome.
pub fn attempt<M: MessagingSurface + ?Sized>(
    surface: &mut M,
    record: &ContactRecord,
    pacer: &Pacer,
    screenshot_dir: Option<&Path>,
) -> AttemptOutcome {
    let outcome = classify(deliver(surface, record, pacer));

    match &outcome {
        AttemptOutcome::Done => {
            if let Some(dir) = screenshot_dir {
                let path = dir.join(record.screenshot_name());
                match surface.capture_screenshot(&path) {
                    Ok(()) => info!("Screenshot saved: {}", path.display()),
                    Err(e) => warn!("Screenshot for row {} failed: {}", record.row, e),
                }
            }
            info!(target: logger::SENT, "Message sent to {} - {}", record.sequence, record.name);
        }
        AttemptOutcome::Failed(reason) => {
            warn!(target: logger::FAILED, "Row {}: {} ({}) failed: {}", record.row, record.name, record.phone, reason);
        }
    }
    outcome
}
