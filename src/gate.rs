use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::error::{Error, Result};

/// The two points where a run waits for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Before the loop: the messaging session must be logged in.
    SessionReady,
    /// After the loop: final state is inspected before teardown.
    Inspection,
}

impl Checkpoint {
    fn prompt(&self) -> &'static str {
        match self {
            Checkpoint::SessionReady => "Log in to the messaging session, then press Enter to start sending",
            Checkpoint::Inspection => "Sending finished. Inspect the session, then press Enter to close it",
        }
    }
}

/// External readiness handshake. A checkpoint is waiting while `wait`
/// blocks and released once it returns `Ok`.
pub trait ReadinessGate {
    fn wait(&mut self, checkpoint: Checkpoint) -> Result<()>;
}

impl<T: ReadinessGate + ?Sized> ReadinessGate for Box<T> {
    fn wait(&mut self, checkpoint: Checkpoint) -> Result<()> {
        (**self).wait(checkpoint)
    }
}

/// Prompts on stdout and blocks on a line from the given reader.
pub struct ConsoleGate<R> {
    input: R,
}

impl ConsoleGate<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        ConsoleGate { input: io::stdin().lock() }
    }
}

impl<R: BufRead> ConsoleGate<R> {
    pub fn new(input: R) -> Self {
        ConsoleGate { input }
    }
}

impl<R: BufRead> ReadinessGate for ConsoleGate<R> {
    fn wait(&mut self, checkpoint: Checkpoint) -> Result<()> {
        warn!("{}", checkpoint.prompt());
        io::stdout().flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::Gate(format!("input closed while waiting at {:?}", checkpoint)));
        }
        info!("{:?} released", checkpoint);
        Ok(())
    }
}

/// Releases every checkpoint immediately, for unattended runs.
#[derive(Debug, Default)]
pub struct AutoGate;

impl ReadinessGate for AutoGate {
    fn wait(&mut self, checkpoint: Checkpoint) -> Result<()> {
        info!("{:?} released automatically", checkpoint);
        Ok(())
    }
}
