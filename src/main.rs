use bulk_sender_lib::{logger, orchestrator};
use bulk_sender_lib::{open_store, AutoGate, Config, ConsoleGate, Orchestrator, ReadinessGate, WebDriverSurface};
use bulk_sender_lib::delay_manager::Pace;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info, LevelFilter};

#[derive(Parser, Debug)]
#[command(name = "bulk-sender")]
#[command(about = "Resumable bulk sender for personalised chat messages")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Contact list (.xlsx or .csv)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Browser profile directory that keeps the session logged in
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Attempt every row, including ones already marked Done or Failed
    #[arg(long)]
    no_resume: bool,

    /// Save a screenshot after each successful send
    #[arg(long)]
    screenshots: bool,

    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// WebDriver endpoint, e.g. a running chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Do not wait for the operator at the start and end of the run
    #[arg(short, long)]
    yes: bool,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Cli {
    fn into_config(self) -> Result<Config, bulk_sender_lib::Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(store) = self.store {
            config.store_path = store;
        }
        if let Some(profile_dir) = self.profile_dir {
            config.profile_dir = profile_dir;
        }
        if self.no_resume {
            config.resume = false;
        }
        if self.screenshots {
            config.screenshots = true;
        }
        if let Some(dir) = self.screenshot_dir {
            config.screenshot_dir = dir;
        }
        if let Some(url) = self.webdriver_url {
            config.webdriver_url = url;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.log_level);
    info!("Starting bulk message sender...");

    let unattended = cli.yes;
    let config = cli.into_config()?;

    // Preconditions: nothing is sent unless the list opens cleanly.
    let store = match open_store(&config.store_path) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Found {} contacts in {:?}", store.row_count(), store.path());
    orchestrator::prepare_screenshot_dir(&config)?;

    let surface = WebDriverSurface::launch(&config)?;
    let gate: Box<dyn ReadinessGate> = if unattended {
        Box::new(AutoGate)
    } else {
        Box::new(ConsoleGate::stdin())
    };

    let mut sender = Orchestrator::new(config, store, surface, gate);
    let outcome = sender.run();
    let pacer = sender.pacer().clone();
    let (_store, surface, _gate) = sender.into_parts();

    pacer.pause(Pace::Teardown);
    if let Err(e) = surface.close() {
        error!("Failed to close browser session: {}", e);
    }

    let stats = outcome?;
    info!(target: logger::SENT, "Bulk messaging completed! {}", stats);
    Ok(())
}
