//! Event client command-line tool: entry point.
//!
//! Each invocation opens one session with the event server, sends one command,
//! and closes the session again, so the host sees `HELO … BYE` every time.
//! `hold` keeps the session (and its keepalive) open until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! evc-client [OPTIONS] <COMMAND>
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --host <HOST>          Event server host [default: 127.0.0.1]
//!   --port <PORT>          Event server port [default: 9777]
//!   --device-name <NAME>   Name shown by the host
//!   --icon <PATH>          PNG/JPEG/GIF sent with HELO
//!   --keepalive <SECS>     Keepalive interval [default: 20]
//!   --overflow <POLICY>    truncate | reject [default: truncate]
//!   --dry-run              Print datagrams instead of sending them
//!
//! Commands:
//!   button, release, mouse, notify, log, action, ping, hold, config
//! ```
//!
//! # Precedence
//!
//! CLI flag > `EVC_*` environment variable > config file > built-in default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use evc_core::{
    ActionPacket, ActionType, AxisMode, ButtonPacket, FragmentHeader, Icon, LogLevel,
    OverflowPolicy,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use evc_client::application::session::{DatagramTransport, EventClient};
use evc_client::infrastructure::config::{
    config_file_path, load_config, load_config_from, load_icon, save_config_to, AppConfig,
    ConfigError,
};
use evc_client::infrastructure::transport::{mock::MockTransport, UdpTransport};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote-control client for media-center event servers.
#[derive(Debug, Parser)]
#[command(
    name = "evc-client",
    about = "Send remote-control events to a media-center event server over UDP",
    version
)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, env = "EVC_CONFIG")]
    config: Option<PathBuf>,

    /// Hostname or IP address of the event server.
    #[arg(long, env = "EVC_HOST")]
    host: Option<String>,

    /// UDP port of the event server.
    #[arg(long, env = "EVC_PORT")]
    port: Option<u16>,

    /// Device name sent with HELO.
    #[arg(long, env = "EVC_DEVICE_NAME")]
    device_name: Option<String>,

    /// Icon sent with HELO.  Type is inferred from the file extension.
    #[arg(long, env = "EVC_ICON")]
    icon: Option<PathBuf>,

    /// Seconds between keepalive PINGs.
    #[arg(long, env = "EVC_KEEPALIVE")]
    keepalive: Option<u64>,

    /// What to do with fields that do not fit their wire width.
    #[arg(long, env = "EVC_OVERFLOW")]
    overflow: Option<OverflowPolicy>,

    /// Print the datagrams instead of sending them.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Press (or release) a button by code or by keymap name.
    Button(ButtonArgs),
    /// Release whatever button the host considers held.
    Release,
    /// Move the pointer to an absolute position in 0..=65535 space.
    #[command(allow_negative_numbers = true)]
    Mouse { x: i32, y: i32 },
    /// Show a notification on the host.
    Notify {
        title: String,
        message: String,
        /// Image shown next to the notification.
        #[arg(long)]
        icon: Option<PathBuf>,
    },
    /// Write a line to the host's log.
    Log {
        /// debug, info, notice, warning, error or severe.
        #[arg(long, default_value = "info")]
        level: LogLevel,
        message: String,
    },
    /// Run a built-in command, or a named action with `--button`.
    Action {
        #[arg(long)]
        button: bool,
        message: String,
    },
    /// Send one PING.
    Ping,
    /// Keep a session open until Ctrl-C or `--secs` elapse.
    Hold {
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Args)]
struct ButtonArgs {
    /// Raw button code.
    #[arg(long, conflicts_with = "name", required_unless_present = "name")]
    code: Option<u16>,
    /// Keymap the button name belongs to, e.g. KB, XG, R1.
    #[arg(long, requires = "name")]
    map: Option<String>,
    /// Button name within the keymap, e.g. enter.
    #[arg(long)]
    name: Option<String>,
    /// Send a release instead of a press.
    #[arg(long)]
    up: bool,
    /// Ask the host not to auto-repeat the press.
    #[arg(long)]
    no_repeat: bool,
    /// Queue the event instead of acting on it immediately.
    #[arg(long)]
    queue: bool,
    /// Analog amount (0..=65535).
    #[arg(long, default_value_t = 0)]
    amount: u16,
    /// Axis mode: 0 none, 1 single, 2 dual.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    axis: u8,
}

impl ButtonArgs {
    fn into_packet(self) -> ButtonPacket {
        let base = match (self.code, self.name) {
            (Some(code), _) => ButtonPacket::code(code),
            (None, Some(name)) => {
                ButtonPacket::named(self.map.unwrap_or_else(|| "KB".to_string()), name)
            }
            // clap guarantees one of the two is present.
            (None, None) => ButtonPacket::code(0),
        };
        base.with_down(!self.up)
            .with_repeat(!self.no_repeat)
            .with_queue(self.queue)
            .with_amount(self.amount)
            .with_axis(AxisMode::try_from(self.axis).unwrap_or_default())
    }
}

impl Cli {
    /// Applies CLI and environment overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.network.host = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(name) = &self.device_name {
            config.client.device_name = name.clone();
        }
        if let Some(icon) = &self.icon {
            config.client.icon = Some(icon.clone());
        }
        if let Some(secs) = self.keepalive {
            config.network.keepalive_secs = secs;
        }
        if let Some(policy) = self.overflow {
            config.encoding.overflow = policy;
        }
    }

    fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)?,
            None => match load_config() {
                Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
                other => other?,
            },
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }
}

/// Resolves `host:port`, preferring the first address returned.
async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("{host}:{port} resolved to no addresses"))
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_command(client: &EventClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Button(args) => client.send_button(args.into_packet()).await?,
        Command::Release => client.release_button().await?,
        Command::Mouse { x, y } => client.send_mouse(x, y).await?,
        Command::Notify {
            title,
            message,
            icon,
        } => {
            let icon = icon.as_deref().map(load_icon).transpose()?;
            client.send_notification(&title, &message, icon).await?;
        }
        Command::Log { level, message } => client.send_log(level, &message).await?,
        Command::Action { button, message } => {
            let action_type = if button {
                ActionType::Button
            } else {
                ActionType::ExecBuiltin
            };
            client
                .send_action(ActionPacket {
                    action_type,
                    message,
                })
                .await?;
        }
        Command::Ping => client.ping().await?,
        Command::Hold { secs } => hold(secs).await,
        Command::Config { .. } => {}
    }
    Ok(())
}

/// Runs one command inside its own session: HELO, the command, BYE.
///
/// BYE is attempted even when the command fails.  The command's error takes
/// precedence; when BYE fails too, its error is attached as context.
async fn run_session(
    client: &mut EventClient,
    destination: SocketAddr,
    device_name: &str,
    icon: Option<Icon>,
    command: Command,
) -> anyhow::Result<()> {
    client
        .start(destination, device_name, icon)
        .await
        .with_context(|| format!("failed to start session with {destination}"))?;

    let outcome = run_command(client, command).await;
    let stopped = client
        .stop()
        .await
        .with_context(|| format!("failed to end session with {destination}"));

    match (outcome, stopped) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(e), Err(stop_err)) => {
            Err(e.context(format!("session cleanup also failed ({stop_err:#})")))
        }
    }
}

/// Waits for Ctrl-C, or for `secs` seconds when given.
async fn hold(secs: Option<u64>) {
    let timeout = async {
        match secs {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    info!("holding session open; press Ctrl-C to stop");
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("failed to listen for Ctrl-C signal: {e}");
            }
        }
        _ = timeout => {}
    }
}

/// Dry-run line for one datagram: type, fragment position, token, hex bytes.
fn format_datagram(datagram: &[u8]) -> String {
    let hex: String = datagram.iter().map(|b| format!("{b:02x}")).collect();
    match FragmentHeader::parse(datagram) {
        Ok((h, _)) => format!(
            "{:?} {}/{} token={} {hex}",
            h.packet_type, h.sequence, h.total_fragments, h.token
        ),
        Err(e) => format!("<unparsable: {e}> {hex}"),
    }
}

fn print_datagrams(recorder: &MockTransport) {
    for datagram in recorder.datagrams() {
        println!("{}", format_datagram(&datagram));
    }
}

/// Where `config --write` saves: the `--config` path, else the platform file.
fn config_target(write: bool, explicit: Option<PathBuf>) -> anyhow::Result<Option<PathBuf>> {
    Ok(match (write, explicit) {
        (false, _) => None,
        (true, Some(path)) => Some(path),
        (true, None) => Some(config_file_path()?),
    })
}

/// Renders `config` as TOML and optionally saves it to `write_to`.
fn render_config(config: &AppConfig, write_to: Option<&Path>) -> anyhow::Result<String> {
    let rendered = config.to_toml()?;
    if let Some(path) = write_to {
        save_config_to(path, config)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("configuration written to {}", path.display());
    }
    Ok(rendered)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("failed to load configuration")?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    let command = cli.command;
    if let Command::Config { write } = command {
        let target = config_target(write, cli.config)?;
        print!("{}", render_config(&config, target.as_deref())?);
        return Ok(());
    }

    let destination = resolve(&config.network.host, config.network.port).await?;
    let icon = config.load_icon()?;

    let recorder = Arc::new(MockTransport::new());
    let transport: Arc<dyn DatagramTransport> = if cli.dry_run {
        Arc::clone(&recorder) as Arc<dyn DatagramTransport>
    } else {
        Arc::new(UdpTransport::new())
    };
    let mut client = EventClient::new(transport, config.session_options());
    let result = run_session(
        &mut client,
        destination,
        &config.client.device_name,
        icon,
        command,
    )
    .await;
    if cli.dry_run {
        print_datagrams(&recorder);
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
