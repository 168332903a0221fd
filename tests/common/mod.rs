#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::rc::Rc;

use bulk_sender_lib::automation::{AutomationError, MessagingSurface, StepResult};
use bulk_sender_lib::gate::{Checkpoint, ReadinessGate};
use bulk_sender_lib::store::{Cell, ContactStore, Sheet};
use bulk_sender_lib::{Config, ContactRecord, Delays, Error, Result, Status};

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn quiet_config(resume: bool) -> Config {
    Config {
        delays: Delays::none(),
        resume,
        ..Config::default()
    }
}

fn text(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

/// Builds a sheet with the standard header from (name, phone, message, status) rows.
pub fn sheet(rows: &[(&str, &str, &str, &str)]) -> Sheet {
    let mut grid: Vec<Vec<Cell>> = vec![["Sr No", "Name", "Contact No", "Message", "Status"].iter().map(|h| text(h)).collect()];
    for (i, (name, phone, message, status)) in rows.iter().enumerate() {
        grid.push(vec![text(&(i + 1).to_string()), text(name), text(phone), text(message), text(status)]);
    }
    Sheet { name: "Contacts".to_string(), rows: grid }
}

/// Store that separates pending writes from what has been flushed.
pub struct MemoryStore {
    pending: Sheet,
    pub durable: Sheet,
    pub flushes: usize,
    pub fail_read_at: Option<usize>,
    log: EventLog,
}

impl MemoryStore {
    pub fn new(sheet: Sheet, log: EventLog) -> Self {
        MemoryStore {
            pending: sheet.clone(),
            durable: sheet,
            flushes: 0,
            fail_read_at: None,
            log,
        }
    }

    pub fn durable_status(&self, row: usize) -> Status {
        self.durable.record(row).map(|r| r.status).unwrap_or_default()
    }

    /// Copy of the flushed state, as a fresh process would read it.
    pub fn reopen(&self, log: EventLog) -> MemoryStore {
        MemoryStore::new(self.durable.clone(), log)
    }
}

impl ContactStore for MemoryStore {
    fn data_rows(&self) -> RangeInclusive<usize> {
        self.pending.data_rows()
    }

    fn read_record(&self, row: usize) -> Result<ContactRecord> {
        if self.fail_read_at == Some(row) {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "process killed")));
        }
        self.pending.record(row)
    }

    fn write_status(&mut self, row: usize, status: Status) -> Result<()> {
        self.log.borrow_mut().push(format!("write:{}:{}", row, status));
        self.pending.set_status(row, status)
    }

    fn flush(&mut self) -> Result<()> {
        self.durable = self.pending.clone();
        self.flushes += 1;
        self.log.borrow_mut().push("flush".to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    NotFound,
    FailOnSelect,
    FailOnEnter,
    FailOnSend,
}

/// Fake messaging UI that logs every step it receives.
pub struct ScriptedSurface {
    log: EventLog,
    behaviors: HashMap<String, Behavior>,
    current: Option<String>,
    pub fail_screenshots: bool,
}

impl ScriptedSurface {
    pub fn new(log: EventLog) -> Self {
        ScriptedSurface {
            log,
            behaviors: HashMap::new(),
            current: None,
            fail_screenshots: false,
        }
    }

    pub fn with(mut self, phone: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(phone.to_string(), behavior);
        self
    }

    fn push(&self, event: String) {
        self.log.borrow_mut().push(event);
    }

    fn behavior(&self) -> Option<Behavior> {
        self.current.as_ref().and_then(|p| self.behaviors.get(p)).copied()
    }
}

impl MessagingSurface for ScriptedSurface {
    fn open_new_conversation(&mut self) -> StepResult<()> {
        self.push("open".to_string());
        Ok(())
    }

    fn search_recipient(&mut self, phone: &str) -> StepResult<()> {
        self.current = Some(phone.to_string());
        self.push(format!("search:{}", phone));
        Ok(())
    }

    fn has_no_results(&mut self) -> StepResult<bool> {
        Ok(self.behavior() == Some(Behavior::NotFound))
    }

    fn select_first_result(&mut self) -> StepResult<()> {
        self.push("select".to_string());
        if self.behavior() == Some(Behavior::FailOnSelect) {
            return Err(AutomationError::ElementNotFound("first result".to_string()));
        }
        Ok(())
    }

    fn enter_message_text(&mut self, body: &str) -> StepResult<()> {
        self.push(format!("enter:{}", body));
        if self.behavior() == Some(Behavior::FailOnEnter) {
            return Err(AutomationError::Timeout("message box".to_string()));
        }
        Ok(())
    }

    fn invoke_send(&mut self) -> StepResult<()> {
        self.push("send".to_string());
        if self.behavior() == Some(Behavior::FailOnSend) {
            return Err(AutomationError::Disconnected("socket closed".to_string()));
        }
        Ok(())
    }

    fn capture_screenshot(&mut self, path: &Path) -> StepResult<()> {
        self.push(format!("screenshot:{}", path.display()));
        if self.fail_screenshots {
            return Err(AutomationError::Driver("screenshot unavailable".to_string()));
        }
        Ok(())
    }

    fn dismiss_conversation(&mut self) -> StepResult<()> {
        self.current = None;
        self.push("dismiss".to_string());
        Ok(())
    }
}

/// Gate that records checkpoints and can refuse to release.
pub struct RecordingGate {
    log: EventLog,
    pub refuse: Option<Checkpoint>,
}

impl RecordingGate {
    pub fn new(log: EventLog) -> Self {
        RecordingGate { log, refuse: None }
    }
}

impl ReadinessGate for RecordingGate {
    fn wait(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.log.borrow_mut().push(format!("gate:{:?}", checkpoint));
        if self.refuse == Some(checkpoint) {
            return Err(Error::Gate("operator aborted".to_string()));
        }
        Ok(())
    }
}

pub fn events_matching(log: &EventLog, prefix: &str) -> Vec<String> {
    log.borrow().iter().filter(|e| e.starts_with(prefix)).cloned().collect()
}
