//! dacvol CLI - control client for the dacvol daemon.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use dacvol_core::SessionStatus;
use dacvol_ipc::{ErrorInfo, IpcClient, Method, Response, StatusSnapshot, socket_path};

#[derive(Parser, Debug)]
#[command(name = "dacvol", author, version, about = "Set the output volume of the Apple USB-C dongle")]
struct Args {
    /// Socket path override
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show daemon and device status
    Status,
    /// Apply a volume token (4 hex digits, e.g. 007f)
    Set {
        /// Volume token
        volume: String,
    },
    /// Apply the saved volume automatically when the dongle connects
    AutoApply {
        /// on or off
        #[arg(value_parser = parse_switch)]
        enabled: bool,
    },
    /// Exit the daemon after a successful auto-apply
    QuitAfterApply {
        /// on or off
        #[arg(value_parser = parse_switch)]
        enabled: bool,
    },
    /// Stream daemon events until interrupted
    Watch,
    /// Stop the daemon
    Shutdown,
}

fn parse_switch(input: &str) -> Result<bool, String> {
    match input {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(format!("expected 'on' or 'off', got {other:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let socket = args.socket.unwrap_or_else(socket_path);

    let mut client = IpcClient::connect(&socket).await.with_context(|| {
        format!("failed to connect to the daemon at {} (is dacvol-daemon running?)", socket.display())
    })?;

    match args.command {
        Command::Status => {
            let value = expect_ok(client.request(Method::GetStatus).await?)?;
            let snapshot: StatusSnapshot =
                serde_json::from_value(value).context("unexpected status payload")?;
            print_status(&snapshot);
        }

        Command::Set { volume } => {
            let value = expect_ok(client.request(Method::ApplyVolume { volume }).await?)?;
            println!("volume set to {}", value["volume"].as_str().unwrap_or("?"));
        }

        Command::AutoApply { enabled } => {
            expect_ok(client.request(Method::SetAutoApply { enabled }).await?)?;
            println!("auto-apply {}", if enabled { "on" } else { "off" });
        }

        Command::QuitAfterApply { enabled } => {
            expect_ok(client.request(Method::SetQuitAfterApply { enabled }).await?)?;
            println!("quit-after-apply {}", if enabled { "on" } else { "off" });
        }

        Command::Watch => {
            // Empty subscription list means every event type.
            expect_ok(client.request(Method::Subscribe { events: Vec::new() }).await?)?;
            while let Some(event) = client.events().recv().await {
                println!("{} {}", event_name(&event.event), event.data);
            }
        }

        Command::Shutdown => {
            expect_ok(client.request(Method::Shutdown).await?)?;
            println!("daemon stopping");
        }
    }

    Ok(())
}

fn expect_ok(response: Response) -> Result<serde_json::Value> {
    match response.result {
        Ok(value) => Ok(value),
        Err(ErrorInfo { code, message }) => bail!("daemon error ({code}): {message}"),
    }
}

fn print_status(snapshot: &StatusSnapshot) {
    match &snapshot.status {
        SessionStatus::Idle => println!("device: none"),
        SessionStatus::AwaitingPermission { label } => {
            println!("device: {label} (waiting for access)");
        }
        SessionStatus::Connected { label } => println!("device: {label} (connected)"),
    }
    println!("saved volume: {}", snapshot.volume);
    println!("auto-apply: {}", if snapshot.auto_apply { "on" } else { "off" });
    println!("quit-after-apply: {}", if snapshot.quit_after_apply { "on" } else { "off" });
}

fn event_name(event: &dacvol_ipc::EventType) -> &'static str {
    use dacvol_ipc::EventType;
    match event {
        EventType::DeviceConnected => "device-connected",
        EventType::DeviceDisconnected => "device-disconnected",
        EventType::PermissionPending => "permission-pending",
        EventType::PermissionDenied => "permission-denied",
        EventType::VolumeApplied => "volume-applied",
        EventType::Error => "error",
    }
}
