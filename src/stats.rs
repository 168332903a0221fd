use std::fmt;

/// Counters for one run. Never persisted.
///
/// `excluded` counts rows without a phone number or message; those rows
/// are not part of `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub excluded: usize,
}

impl RunStats {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let rule = "=".repeat(50);
        vec![
            rule.clone(),
            "FINAL STATISTICS:".to_string(),
            format!("Total Contacts: {}", self.total),
            format!("Successfully Sent: {}", self.sent),
            format!("Failed: {}", self.failed),
            format!("Skipped: {}", self.skipped),
            format!("Empty Rows Excluded: {}", self.excluded),
            rule,
        ]
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} sent={} failed={} skipped={} excluded={}",
            self.total, self.sent, self.failed, self.skipped, self.excluded
        )
    }
}
