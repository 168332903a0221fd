use std::fmt;

pub const DONE_MARK: &str = "✅Done";
pub const FAILED_MARK: &str = "❌Failed";

/// Persisted delivery status of one recipient row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Unset,
    Done,
    Failed,
}

impl Status {
    /// Reads a status cell. Unknown or empty values are `Unset`.
    pub fn parse(cell: &str) -> Self {
        match cell.trim() {
            DONE_MARK => Status::Done,
            FAILED_MARK => Status::Failed,
            _ => Status::Unset,
        }
    }

    /// Text written back into the status cell.
    pub fn as_cell(&self) -> &'static str {
        match self {
            Status::Unset => "",
            Status::Done => DONE_MARK,
            Status::Failed => FAILED_MARK,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unset => f.write_str("unset"),
            other => f.write_str(other.as_cell()),
        }
    }
}

/// One data row of the recipient list.
///
/// Identity is the sheet row number; two rows with the same phone number
/// are independent recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub row: usize,
    pub sequence: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub status: Status,
}

impl ContactRecord {
    /// Builds a record from the five schema cells, trimming each one.
    pub fn from_cells(row: usize, cells: [&str; 5]) -> Self {
        let [sequence, name, phone, message, status] = cells;
        ContactRecord {
            row,
            sequence: sequence.trim().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            message: message.trim().to_string(),
            status: Status::parse(status),
        }
    }

    /// A row without a phone number or a message is never attempted.
    pub fn is_eligible(&self) -> bool {
        !self.phone.is_empty() && !self.message.is_empty()
    }

    /// File name used for this row's delivery screenshot.
    pub fn screenshot_name(&self) -> String {
        let safe: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}_{}.png", self.row, safe)
    }
}
