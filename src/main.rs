//! photodropd - photo ingestion daemon.
//!
//! Listens for images over TCP, files them by date and prints each new one.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use photodrop::config::{secs_to_timeout, DEFAULT_CONFIG_PATH};
use photodrop::consumer::{ConsoleConsumer, QueuePoller};
use photodrop::storage::ensure_base_dir;
use photodrop::{ArtifactStore, Config, ConnectionHandler, HandoffQueue, IngestServer};

#[derive(Parser)]
#[command(name = "photodropd")]
#[command(about = "Receives photos over TCP and stores them by date")]
struct Args {
    /// Config file (key = value lines)
    #[arg(short, long, env = "PHOTODROP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// IP address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory images are stored under
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Largest accepted image in bytes
    #[arg(long)]
    max_frame_bytes: Option<u32>,

    /// Seconds to wait for data before dropping a client (0 = forever)
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Maximum simultaneous connections (0 = unlimited)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Maximum queued images awaiting display (0 = unbounded)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(max_frame_bytes) = self.max_frame_bytes {
            config.max_frame_bytes = max_frame_bytes;
        }
        if let Some(secs) = self.read_timeout {
            config.read_timeout = secs_to_timeout(secs);
        }
        if let Some(max_connections) = self.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "photodrop=debug,photodropd=debug"
    } else {
        "photodrop=info,photodropd=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(args) {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load_from(&args.config).context("Failed to load configuration")?;
    args.apply(&mut config);

    info!("Config path: {:?}", args.config);
    info!("Data path: {:?}", config.data_dir);

    ensure_base_dir(&config.data_dir)?;

    let queue = if config.queue_capacity > 0 {
        HandoffQueue::bounded(config.queue_capacity)
    } else {
        HandoffQueue::unbounded()
    };

    let handler = ConnectionHandler::new(ArtifactStore::new(&config.data_dir), queue.publisher())
        .with_max_frame_bytes(config.max_frame_bytes)
        .with_read_timeout(config.read_timeout);

    let addr = config.bind_addr()?;
    let server = IngestServer::bind(addr, handler)
        .context("Failed to start ingest server")?
        .with_max_connections(config.max_connections);

    let poller = QueuePoller::new(queue).with_interval(config.poll_interval);

    let server_running = server.running_flag();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down");
        server_running.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let consumer = ConsoleConsumer::new().with_verbose(args.verbose);
    let poller_running = poller.running_flag();
    let poller_thread = poller.spawn(consumer).context("Failed to start poller")?;

    // Returns after in-flight connections have drained, so the poller is
    // stopped only once nothing else can publish.
    server.run()?;
    poller_running.store(false, Ordering::SeqCst);

    match poller_thread.join() {
        Ok(queue) if !queue.is_empty() => {
            info!("{} images received but not presented", queue.len());
        }
        Ok(_) => {}
        Err(_) => error!("Poller thread panicked"),
    }

    Ok(())
}
