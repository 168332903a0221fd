use std::path::Path;
use thiserror::Error;

/// Failure of one interaction step. Contained to the attempt in progress.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("session disconnected: {0}")]
    Disconnected(String),

    #[error("driver rejected command: {0}")]
    Driver(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StepResult<T> = std::result::Result<T, AutomationError>;

/// Interaction protocol of the messaging web application.
///
/// Implementations model one human operator: every call blocks until the
/// UI has settled, and no two calls overlap.
pub trait MessagingSurface {
    fn open_new_conversation(&mut self) -> StepResult<()>;
    fn search_recipient(&mut self, phone: &str) -> StepResult<()>;
    /// True when the search reports that the number has no account.
    fn has_no_results(&mut self) -> StepResult<bool>;
    fn select_first_result(&mut self) -> StepResult<()>;
    fn enter_message_text(&mut self, body: &str) -> StepResult<()>;
    fn invoke_send(&mut self) -> StepResult<()>;
    fn capture_screenshot(&mut self, path: &Path) -> StepResult<()>;
    /// Closes whatever conversation or panel is open.
    fn dismiss_conversation(&mut self) -> StepResult<()>;
}

impl<T: MessagingSurface + ?Sized> MessagingSurface for Box<T> {
    fn open_new_conversation(&mut self) -> StepResult<()> {
        (**self).open_new_conversation()
    }
    fn search_recipient(&mut self, phone: &str) -> StepResult<()> {
        (**self).search_recipient(phone)
    }
    fn has_no_results(&mut self) -> StepResult<bool> {
        (**self).has_no_results()
    }
    fn select_first_result(&mut self) -> StepResult<()> {
        (**self).select_first_result()
    }
    fn enter_message_text(&mut self, body: &str) -> StepResult<()> {
        (**self).enter_message_text(body)
    }
    fn invoke_send(&mut self) -> StepResult<()> {
        (**self).invoke_send()
    }
    fn capture_screenshot(&mut self, path: &Path) -> StepResult<()> {
        (**self).capture_screenshot(path)
    }
    fn dismiss_conversation(&mut self) -> StepResult<()> {
        (**self).dismiss_conversation()
    }
}
