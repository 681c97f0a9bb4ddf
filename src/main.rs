use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use shipview::controller::Controller;
use shipview::domain::{Message, SVConfig, SVError};
use shipview::export::{ExportService, HttpExportService, OfflineExportService};
use shipview::model::{Model, Status};
use shipview::record::RecordSet;
use shipview::ui::TableUI;

const DEFAULT_LOG_FILTER: &str = "shipview=info";

#[derive(Parser, Debug)]
#[command(version, about = "Interactive table of extracted shipment records", long_about = None)]
struct Args {
    /// Extraction results to show (.json, .csv, .parquet, .arrow)
    #[arg(required = true)]
    files: Vec<String>,

    /// Base url of the export service, exports are generated locally without it
    #[arg(long)]
    export_url: Option<String>,

    /// Directory downloads are written to
    #[arg(long, default_value = ".")]
    download_dir: String,

    /// Export request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[arg(long, default_value = "shipview.log")]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, SVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| SVError::loading_failed(format!("cannot expand {path}: {e}")))
}

fn init_logging(log_file: &Path) -> Result<(), SVError> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(filter),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| SVError::loading_failed(format!("cannot initialize logging: {e}")))
}

fn run(args: Args) -> Result<(), SVError> {
    let mut config = SVConfig::default()
        .with_event_poll_time(args.poll)
        .with_export_timeout(Duration::from_secs(args.timeout))
        .with_download_dir(expand(&args.download_dir)?)
        .with_log_file(expand(&args.log_file)?);
    if let Some(url) = args.export_url {
        config = config.with_export_url(url);
    }
    init_logging(&config.log_file)?;
    info!("Starting shipview {}", env!("CARGO_PKG_VERSION"));

    let paths = args
        .files
        .iter()
        .map(|f| expand(f))
        .collect::<Result<Vec<PathBuf>, SVError>>()?;
    // Load before taking over the terminal so errors print normally.
    let (record_set, load_time) = RecordSet::load(&paths)?;

    let exporter: Arc<dyn ExportService> = match &config.export_url {
        Some(url) => Arc::new(HttpExportService::new(url, config.export_timeout)?),
        None => Arc::new(OfflineExportService),
    };
    let (sender, receiver) = mpsc::channel();

    let mut terminal = ratatui::init();
    let result = terminal.size().map_err(SVError::from).and_then(|size| {
        let mut model = Model::init(
            &config,
            exporter,
            sender,
            size.width as usize,
            size.height as usize,
        );
        model.load(record_set, load_time);
        event_loop(&mut terminal, &mut model, &receiver, &config)
    });
    ratatui::restore();
    info!("Bye");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    receiver: &Receiver<Message>,
    config: &SVConfig,
) -> Result<(), SVError> {
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model, f))?;

        let message = controller.handle_event(model)?;
        model.update(message)?;

        // Export results arrive from worker threads.
        while let Ok(message) = receiver.try_recv() {
            model.update(Some(message))?;
        }
    }
    Ok(())
}
