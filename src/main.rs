use clap::{Parser, Subcommand};
use log::{error, info, warn};
use reportpull::configuration::config::{Config, ConfigOverrides};
use reportpull::controller::Controller;
use reportpull::events::{EngineEvent, EventSink};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "reportpull")]
#[command(version = "0.1.0")]
#[command(about = "Pulls report files from a connected device and archives them on the device")]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor device connectivity; press Enter to fetch, type `q` to quit
    Watch,
    /// Fetch the reports once, archive them on the device and exit
    Fetch,
    /// List the attached devices and exit
    Devices,
}

fn load_config(args: &Args) -> Result<Config, String> {
    let config = match &args.config_file {
        Some(path) => Config::from_file(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    config
        .with_overrides(&args.overrides)
        .map_err(|e| e.to_string())
}

/// Prints every engine event as one JSON line on stdout.
async fn print_events(mut receiver: UnboundedReceiver<EngineEvent>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Unable to serialize event {:?}: {}", event, e),
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    info!("Importing configuration");
    let config = load_config(&args).unwrap_or_else(|e| {
        error!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });
    info!("Configuration imported successfully");

    let (events, receiver) = EventSink::channel();
    let printer = tokio::spawn(print_events(receiver));

    let controller = Controller::with_adb(config, events).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });
    let controller = Arc::new(controller);

    let code = match args.command {
        Command::Watch => watch(controller.clone()).await,
        Command::Fetch => fetch(&controller).await,
        Command::Devices => devices(&controller).await,
    };

    // Dropping the last sender lets the printer drain and finish.
    drop(controller);
    let _ = printer.await;
    std::process::exit(code);
}

async fn fetch(controller: &Controller<reportpull::bridge::AdbBridge>) -> i32 {
    if let Err(e) = controller.start_server().await {
        error!("{}", e);
        return 1;
    }
    match controller.fetch().await {
        Ok(outcome) => {
            info!(
                "Fetched {} of {} report(s) into {}",
                outcome.transfer.downloaded,
                outcome.transfer.total,
                outcome.transfer.destination.display()
            );
            if let Some(archive) = outcome.archive {
                info!("Archive: {}", archive);
            }
            0
        }
        Err(e) => {
            error!("Fetch failed: {}", e);
            1
        }
    }
}

async fn devices(controller: &Controller<reportpull::bridge::AdbBridge>) -> i32 {
    if let Err(e) = controller.start_server().await {
        error!("{}", e);
        return 1;
    }
    match controller.list_devices().await {
        Ok(devices) => {
            if devices.is_empty() {
                info!("No device attached");
            }
            for device in devices {
                match serde_json::to_string(&device) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Unable to serialize {:?}: {}", device, e),
                }
            }
            0
        }
        Err(e) => {
            error!("Unable to enumerate devices: {}", e);
            1
        }
    }
}

async fn watch(controller: Arc<Controller<reportpull::bridge::AdbBridge>>) -> i32 {
    let cancel = CancellationToken::new();

    let mut poller = {
        let controller = controller.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            info!("Spawning the connectivity monitor");
            controller.run(cancel).await
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let finished = loop {
        tokio::select! {
            result = &mut poller => break Some(result),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break None;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(input)) if matches!(input.trim(), "q" | "quit") => break None,
                Ok(Some(_)) => {
                    if let Err(e) = controller.fetch().await {
                        error!("Fetch failed: {}", e);
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    error!("Unable to read from stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    };
    cancel.cancel();

    let result = match finished {
        Some(result) => result,
        None => poller.await,
    };
    match result {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            1
        }
        Err(e) => {
            error!("Error joining at the end of execution: {:?}", e);
            1
        }
    }
}
