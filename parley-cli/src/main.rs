use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use parley_client::engine::{ChannelMessage, WebRtcEngine};
use parley_client::{ClientError, DriverState, NegotiationDriver, SignalClient};
use parley_core::{ClientId, Role, RoomId};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version)]
#[command(about = "Meet a peer in a relay room and chat over a data channel")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Base url of the relay.
    #[arg(long, global = true, env = "PARLEY_SERVER", default_value = "http://localhost:8080")]
    server: String,

    /// Room to join; prompted for when missing.
    #[arg(short, long, global = true)]
    room: Option<String>,

    /// Client id; random when missing.
    #[arg(long, global = true)]
    id: Option<String>,

    /// Interval between polls for the peer's description (ms).
    #[arg(long, global = true, default_value_t = 700)]
    poll_ms: u64,
}

#[derive(Subcommand, Clone, Copy)]
enum Mode {
    /// Join expecting to be the offerer.
    Offer,
    /// Join expecting to be the answerer.
    Answer,
    /// Take whichever role the relay assigns.
    Auto,
}

impl Mode {
    fn expected_role(self) -> Option<Role> {
        match self {
            Mode::Offer => Some(Role::Offerer),
            Mode::Answer => Some(Role::Answerer),
            Mode::Auto => None,
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Mode::Offer => "offer",
            Mode::Answer => "answer",
            Mode::Auto => "peer",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let room = match cli.room {
        Some(room) => room,
        None => Input::<String>::new()
            .with_prompt("Room")
            .interact_text()
            .context("Failed to read the room name")?,
    };
    let room = RoomId::parse(room).context("Invalid room")?;
    let client_id = match cli.id {
        Some(id) => ClientId::parse(id).context("Invalid client id")?,
        None => ClientId::random(cli.mode.id_prefix()),
    };

    println!(
        "{}",
        format!("🔗 Joining room '{}' as {}...", room, client_id).cyan()
    );
    debug!(server = %cli.server, "Using relay");

    let signal = SignalClient::new(&cli.server, room, client_id)?;
    let servers = signal
        .relay_servers()
        .await
        .context("Failed to fetch relay servers")?;
    let (engine, channels) = WebRtcEngine::new(&servers)
        .await
        .context("Failed to create the peer connection")?;

    let mut driver = NegotiationDriver::new(signal, engine.clone(), channels.events)
        .poll_interval(Duration::from_millis(cli.poll_ms));
    if let Some(role) = cli.mode.expected_role() {
        driver = driver.expect_role(role);
    }

    let mut state = driver.state();
    let mut messages = channels.messages;
    let cancel = CancellationToken::new();
    let mut run = tokio::spawn(driver.run(cancel.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let outcome = loop {
        tokio::select! {
            result = &mut run => break result.context("Negotiation task panicked")?,
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Leaving...".yellow());
                cancel.cancel();
            }
            Ok(()) = state.changed() => print_state(&state.borrow_and_update()),
            Some(message) = messages.recv() => {
                if print_message(message) {
                    cancel.cancel();
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Err(e) = engine.send_text(&line).await {
                        println!("{} {:#}", "⚠️  Not sent:".yellow(), e);
                    }
                }
                None => {
                    stdin_open = false;
                    if leaves_on_eof(&state.borrow()) {
                        cancel.cancel();
                    } else {
                        println!("{}", "Input closed, listening only".yellow());
                    }
                }
            },
        }
    };

    match outcome {
        Ok(role) => {
            println!("{}", format!("✨ Session as {} ended", role).green().bold());
            Ok(())
        }
        Err(ClientError::Cancelled) => {
            println!("{}", "Cancelled before connecting".yellow());
            Ok(())
        }
        Err(e) => Err(e).context("Negotiation failed"),
    }
}

/// End of input means leaving only once the session is up; before that it
/// just stops sending.
fn leaves_on_eof(state: &DriverState) -> bool {
    matches!(state, DriverState::Connected(_))
}

fn print_state(state: &DriverState) {
    let line = format!("• {}", state);
    match state {
        DriverState::Joining | DriverState::RoleKnown(_) => println!("{}", line.cyan()),
        DriverState::Negotiating(_) => println!("{}", line.yellow()),
        DriverState::Connected(_) => println!("{}", line.green().bold()),
        DriverState::Failed(_) => println!("{}", line.red().bold()),
    }
}

/// Prints one data channel event; `true` once the channel has closed.
fn print_message(message: ChannelMessage) -> bool {
    match message {
        ChannelMessage::Opened => {
            println!("{}", "💬 Data channel open, type a line to send it".green());
            false
        }
        ChannelMessage::Text(text) => {
            println!("{} {}", "peer>".magenta().bold(), text);
            false
        }
        ChannelMessage::Binary(bytes) => {
            println!("{} [{} bytes]", "peer>".magenta().bold(), bytes.len());
            false
        }
        ChannelMessage::Closed => {
            println!("{}", "Peer closed the data channel".yellow());
            true
        }
    }
}
