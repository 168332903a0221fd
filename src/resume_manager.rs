use crate::contact::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Attempt,
    Skip,
}

/// Decides from a row's persisted status whether it is sent this run.
///
/// Under resume mode both `Done` and `Failed` are terminal: a failed
/// number is not retried until its status cell is cleared or the run is
/// started with resume disabled.
#[derive(Debug, Clone, Copy)]
pub struct ResumeFilter {
    enabled: bool,
}

impl ResumeFilter {
    pub fn new(enabled: bool) -> Self {
        ResumeFilter { enabled }
    }

    pub fn decide(&self, status: Status) -> Decision {
        if self.enabled && status.is_terminal() {
            Decision::Skip
        } else {
            Decision::Attempt
        }
    }
}
