use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod controller;
mod dataset;
mod debounce;
mod domain;
mod engine;
mod format;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use dataset::Dataset;
use domain::{JTConfig, JTError};
use model::{Model, Status};
use ui::TableUI;

#[derive(Parser, Debug)]
#[command(
    name = "jt",
    about = "A tui based searchable, sortable table viewer for json datasets"
)]
struct Args {
    /// Path to the json data file ({"headers": [...], "data": [...]})
    data_file: String,

    /// Records per page
    #[arg(long, default_value_t = 100)]
    page_size: usize,

    /// Search debounce window in milliseconds
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

// The terminal belongs to the tui, logs go to a file instead. Only enabled
// when RUST_LOG is set.
fn init_logging() -> Result<(), JTError> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let logfile = std::fs::File::create("jt.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(logfile))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run() -> Result<(), JTError> {
    let args = Args::parse();
    init_logging()?;

    let path = shellexpand::full(&args.data_file)
        .map_err(|e| JTError::LoadingFailed(e.to_string()))?
        .into_owned();
    let path = PathBuf::from(path);
    info!("Starting jt with {}", path.display());

    // A missing or broken data file degrades to an empty table instead of
    // failing
    let dataset = match Dataset::load(&path) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("Error loading data: {e:?}");
            Dataset::empty()
        }
    };

    let cfg = JTConfig {
        page_size: args.page_size,
        debounce_ms: args.debounce_ms,
        ..JTConfig::default()
    };

    let title = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    let mut model = Model::init(&cfg, dataset, title);
    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map them to a Message. A poll timeout still
        // ticks the model so the search debounce can fire.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
