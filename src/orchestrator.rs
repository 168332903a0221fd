use std::path::Path;

use log::{debug, info, warn};

use crate::automation::MessagingSurface;
use crate::classifier::{self, AttemptOutcome};
use crate::config::Config;
use crate::contact::ContactRecord;
use crate::delay_manager::{Pace, Pacer};
use crate::error::Result;
use crate::gate::{Checkpoint, ReadinessGate};
use crate::logger;
use crate::resume_manager::{Decision, ResumeFilter};
use crate::stats::RunStats;
use crate::store::ContactStore;

/// Sequential send loop over one contact store and one messaging session.
///
/// Each row's status is written and flushed before the next row is
/// touched, so a killed run loses at most the row in flight, which reads
/// as unset on the next launch.
pub struct Orchestrator<S, M, G> {
    config: Config,
    store: S,
    surface: M,
    gate: G,
    pacer: Pacer,
    filter: ResumeFilter,
    stats: RunStats,
}

impl<S, M, G> Orchestrator<S, M, G>
where
    S: ContactStore,
    M: MessagingSurface,
    G: ReadinessGate,
{
    pub fn new(config: Config, store: S, surface: M, gate: G) -> Self {
        let pacer = Pacer::new(config.delays.clone());
        let filter = ResumeFilter::new(config.resume);
        Orchestrator {
            config,
            store,
            surface,
            gate,
            pacer,
            filter,
            stats: RunStats::default(),
        }
    }

    /// Runs the whole list. Only store and gate failures are returned;
    /// per-recipient failures are recorded as `Failed` and the loop moves on.
    pub fn run(&mut self) -> Result<RunStats> {
        self.stats = RunStats::default();

        self.checkpoint(Checkpoint::SessionReady)?;

        for row in self.store.data_rows() {
            self.process_row(row)?;
        }

        for line in self.stats.summary_lines() {
            info!("{}", line);
        }

        self.checkpoint(Checkpoint::Inspection)?;
        Ok(self.stats)
    }

    fn checkpoint(&mut self, checkpoint: Checkpoint) -> Result<()> {
        debug!("Waiting at {:?}", checkpoint);
        self.gate.wait(checkpoint)?;
        debug!("{:?} released", checkpoint);
        Ok(())
    }

    fn process_row(&mut self, row: usize) -> Result<()> {
        let record = self.store.read_record(row)?;

        if !record.is_eligible() {
            self.stats.excluded += 1;
            warn!("Row {}: Skipping empty contact", row);
            return Ok(());
        }

        if self.filter.decide(record.status) == Decision::Skip {
            self.stats.skipped += 1;
            info!(target: logger::SKIPPED, "Row {}: Skipping {} (already {})", row, record.name, record.status);
            return Ok(());
        }

        self.stats.total += 1;
        info!(target: logger::PROGRESS, "Processing {}: {} ({})", self.stats.total, record.name, record.phone);

        let outcome = self.attempt(&record);

        self.store.write_status(row, outcome.status())?;
        self.store.flush()?;

        match outcome {
            AttemptOutcome::Done => self.stats.sent += 1,
            AttemptOutcome::Failed(_) => self.stats.failed += 1,
        }

        if let Err(e) = self.surface.dismiss_conversation() {
            warn!("Row {}: could not dismiss conversation: {}", row, e);
        }
        self.pacer.pause(Pace::AfterSend);
        Ok(())
    }

    fn attempt(&mut self, record: &ContactRecord) -> AttemptOutcome {
        let screenshot_dir = if self.config.screenshots {
            Some(self.config.screenshot_dir.as_path())
        } else {
            None
        };
        classifier::attempt(&mut self.surface, record, &self.pacer, screenshot_dir)
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn into_parts(self) -> (S, M, G) {
        (self.store, self.surface, self.gate)
    }
}

/// Creates the screenshot directory when captures are enabled.
pub fn prepare_screenshot_dir(config: &Config) -> Result<()> {
    if config.screenshots && !Path::new(&config.screenshot_dir).exists() {
        std::fs::create_dir_all(&config.screenshot_dir)?;
        info!("Created screenshot directory {:?}", config.screenshot_dir);
    }
    Ok(())
}
