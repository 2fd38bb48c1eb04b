//! # bulbctl: Prestigio bulb console
//!
//! Composition root that wires a BLE backend into a bulb session and drives
//! it from standard input.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise tracing
//! - Construct the selected adapter (host Bluetooth or the virtual bulb)
//! - Run the session and the post-connection handshake
//! - Translate console lines into bulb commands
//! - Shut down on `quit`, end of input or Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no session logic belongs here.

mod config;
mod console;
mod controller;
mod history;

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing_subscriber::EnvFilter;

use bulb_adapter_ble::BtleplugAdapter;
use bulb_adapter_virtual::VirtualBulbAdapter;
use bulb_app::ports::BleAdapter;
use bulb_app::services::{BulbSession, ChannelObserver};
use bulb_domain::session::SessionConfig;

use crate::config::{BackendKind, Config};
use crate::console::{ConsoleCommand, HELP};
use crate::controller::{Controller, Flow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("unable to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter).context("invalid log filter")?)
        .with_writer(std::io::stderr)
        .init();

    match config.backend.kind {
        BackendKind::Ble => {
            let adapter = BtleplugAdapter::open(config.backend.ble())
                .await
                .context("unable to open the bluetooth adapter")?;
            run(adapter, config.bulb).await
        }
        BackendKind::Virtual => {
            tracing::info!("using the virtual bulb");
            run(VirtualBulbAdapter::default(), config.bulb).await
        }
    }
}

async fn run<A: BleAdapter>(adapter: A, config: SessionConfig) -> anyhow::Result<()> {
    tracing::info!(target_name = %config.target_name, "looking for bulb");

    let (observer, mut notifications) = ChannelObserver::new();
    let (session, handle) = BulbSession::new(Arc::new(adapter), observer, config);
    let session = tokio::spawn(session.run());
    handle.start()?;

    let mut controller = Controller::new(handle);
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{HELP}")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => {
                controller.on_notification(&notification)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if controller.on_command(command, &mut stdout)? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => writeln!(stdout, "{err}")?,
                }
            }
            result = &mut interrupted => {
                result?;
                tracing::info!("interrupted");
                break;
            }
        }
    }

    drop(controller);
    session.await.context("bulb session panicked")?;
    tracing::info!("bulbctl stopped");
    Ok(())
}
