use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smsgate")]
#[command(about = "Bridge a serial cellular module to notification channels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory with an empty config and the data directory.
    Init {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the gateway: read the module's serial output, store and forward messages, serve the HTTP API.
    Run {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,

        /// Serial device (overrides serial.device in the config)
        #[arg(long, short, value_name = "TTY")]
        device: Option<PathBuf>,
    },

    /// Send an SMS through a running gateway.
    Send {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Recipient phone number
        to: String,

        /// Message text
        content: String,
    },

    /// Print the module status reported by a running gateway.
    Status {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Some(Commands::Run { .. }) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Some(Commands::Version) => {
            println!("smsgate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run {
            config,
            port,
            device,
        }) => {
            if let Err(e) = run_gateway(config, port, device).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            to,
            content,
        }) => {
            if let Err(e) = run_send(config, to, content).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Status { config }) => {
            if let Err(e) = run_status(config).await {
                log::error!("status failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    device: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    if device.is_some() {
        config.serial.device = device;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config, path).await
}

/// Base URL and bearer token for talking to the gateway described by the config.
fn gateway_client(config_path: Option<PathBuf>) -> anyhow::Result<(String, Option<String>)> {
    let (config, _) = lib::config::load_config(config_path)?;
    let bind = match config.gateway.bind.trim() {
        "0.0.0.0" | "::" | "" => "127.0.0.1",
        b => b,
    };
    let host = if bind.contains(':') {
        format!("[{}]", bind)
    } else {
        bind.to_string()
    };
    let token = lib::config::resolve_gateway_token(&config);
    Ok((format!("http://{}:{}", host, config.gateway.port), token))
}

/// Error text from an `{ "error": ... }` body, or the status line.
async fn api_error(res: reqwest::Response) -> anyhow::Error {
    let status = res.status();
    let body: serde_json::Value = res.json().await.unwrap_or_default();
    match body.get("error").and_then(|v| v.as_str()) {
        Some(e) => anyhow::anyhow!("gateway answered {}: {}", status, e),
        None => anyhow::anyhow!("gateway answered {}", status),
    }
}

async fn run_send(config_path: Option<PathBuf>, to: String, content: String) -> anyhow::Result<()> {
    let (base, token) = gateway_client(config_path)?;
    let mut req = reqwest::Client::new()
        .post(format!("{}/api/serial/sms", base))
        .json(&serde_json::json!({ "to": to, "content": content }));
    if let Some(t) = token {
        req = req.bearer_auth(t);
    }
    let res = req.send().await?;
    if !res.status().is_success() {
        return Err(api_error(res).await);
    }
    let body: serde_json::Value = res.json().await?;
    println!(
        "queued, request id {}",
        body.get("requestId").and_then(|v| v.as_str()).unwrap_or("?")
    );
    Ok(())
}

async fn run_status(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (base, token) = gateway_client(config_path)?;
    let mut req = reqwest::Client::new().get(format!("{}/api/serial/status", base));
    if let Some(t) = token {
        req = req.bearer_auth(t);
    }
    let res = req.send().await?;
    if !res.status().is_success() {
        return Err(api_error(res).await);
    }
    let body: serde_json::Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
