//! `nexlink` drives a panel over a serial port.
//!
//! ```bash
//! nexlink --config panel.yaml run
//! nexlink --config panel.yaml send "page 1"
//! nexlink --config panel.yaml get main t0 txt
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use nexlink_device::{
    Command, Device, DeviceEvent, PanelConfig, Poller, ReturnMode, SerialTransport, Status,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nexlink")]
#[command(about = "Drive a Nextion-class HMI panel over a serial link", long_about = None)]
struct Cli {
    /// Panel description (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, overriding the config file
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate, overriding the config file
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long, global = true)]
    metrics_addr: Option<std::net::SocketAddr>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the panel and print events until interrupted
    Run,

    /// Send one instruction and print how it completed
    Send {
        /// Instruction text, e.g. `page 1`
        instruction: String,
    },

    /// Read a widget property
    Get {
        page: String,
        widget: String,
        property: String,
    },

    /// List the configured pages and widgets
    Pages,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_addr {
        nexlink_metrics::install_prometheus(addr)
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "Serving metrics");
    }

    let mut config = match &cli.config {
        Some(path) => PanelConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => PanelConfig::default(),
    };
    apply_overrides(&mut config, cli.port, cli.baud);

    match cli.command {
        Commands::Run => run(&config),
        Commands::Send { instruction } => send(&config, &instruction),
        Commands::Get {
            page,
            widget,
            property,
        } => get(&config, &page, &widget, &property),
        Commands::Pages => {
            print_pages(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn apply_overrides(config: &mut PanelConfig, port: Option<String>, baud: Option<u32>) {
    if let Some(port) = port {
        let serial = config.serial.get_or_insert_with(|| nexlink_device::SerialConfig {
            port: String::new(),
            baud: 9600,
        });
        serial.port = port;
    }
    if let (Some(baud), Some(serial)) = (baud, config.serial.as_mut()) {
        serial.baud = baud;
    }
}

fn open(config: &PanelConfig) -> Result<Device<SerialTransport>> {
    let Some(serial) = &config.serial else {
        bail!("no serial port configured, pass --port or set serial.port");
    };
    let transport = SerialTransport::open(&serial.port, serial.baud)
        .with_context(|| format!("failed to open {}", serial.port))?;
    let registry = config.build_registry()?;
    Ok(Device::new(transport, registry, config.device.clone()))
}

// ============================================================================
// Subcommands
// ============================================================================

fn run(config: &PanelConfig) -> Result<()> {
    let mut device = open(config)?;
    device.init()?;

    let poller = Poller::spawn(device)?;
    let events = poller.handle().subscribe()?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    info!("Listening for panel events, Ctrl-C to exit");
    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => print_event(&event),
            Err(RecvTimeoutError::Timeout) => {
                if !poller.is_running() {
                    warn!("Poller exited");
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    poller.stop()?;
    Ok(())
}

fn send(config: &PanelConfig, instruction: &str) -> Result<()> {
    let mut device = open(config)?;
    device.enqueue(Command::return_mode(ReturnMode::Always));
    device.drain()?;

    let (tx, rx) = crossbeam_channel::bounded(1);
    let command = Command::raw(instruction)?.on_complete(move |command: &Command| {
        let _ = tx.send((command.status(), command.final_event().cloned()));
    });
    device.enqueue(command);
    device.drain()?;

    let (status, final_event) = rx.recv().context("command was dropped")?;
    match final_event {
        Some(event) => println!("{status}: {event}"),
        None => println!("{status}"),
    }
    if status != Status::Successful {
        bail!("instruction failed");
    }
    Ok(())
}

fn get(config: &PanelConfig, page: &str, widget: &str, property: &str) -> Result<()> {
    let mut device = open(config)?;
    let page = device.registry().find_page(page)?;
    let widget = device.registry().find_widget(page, widget)?;

    device.enqueue(Command::return_mode(ReturnMode::Always));
    device.get_property(widget, property)?;
    device.drain()?;

    match device.registry().widget(widget).cached(property) {
        Some(value) => println!("{value}"),
        None => bail!("panel did not return {property}"),
    }
    Ok(())
}

fn print_pages(config: &PanelConfig) {
    for page in &config.pages {
        match page.id {
            Some(id) => println!("{} (page {id})", page.name),
            None => println!("{}", page.name),
        }
        for widget in &page.widgets {
            let id = widget.id.map(|id| format!(" #{id}")).unwrap_or_default();
            println!("  {} {}{id}", widget.kind, widget.name);
        }
    }
}

fn print_event(event: &DeviceEvent) {
    match event {
        DeviceEvent::Touch {
            page, name, state, ..
        } => println!("touch {page}.{name} {state:?}"),
        DeviceEvent::PageChanged { name, id, .. } => match id {
            Some(id) => println!("page {name} ({id})"),
            None => println!("page {name}"),
        },
        DeviceEvent::ValueChanged {
            name,
            property,
            value,
            ..
        } => println!("value {name}.{property} = {value}"),
        DeviceEvent::CommandFailed {
            command,
            fault,
            timed_out,
            ..
        } => {
            if *timed_out {
                println!("failed {command}: timed out");
            } else {
                println!("failed {command}: {fault:?}");
            }
        }
        DeviceEvent::Unsolicited(event) => println!("unsolicited {event}"),
    }
}
