//! Aurora CLI - drive the wallet bootstrap flows from a terminal
//!
//!   aurora create                       → create a wallet and wait for it to start
//!   aurora open                         → open the existing wallet
//!   aurora recover --seed "<24 words>"  → restore from seed words
//!   aurora recover --cipher <hex> --passphrase <p>
//!   aurora delete                       → stop and delete the wallet
//!   aurora status                       → wallet and relay state
//!   aurora seed                         → print the seed words
//!   aurora paper --passphrase <p>       → print a paper wallet cipher
//!
//! Every command prints one JSON document on stdout; errors go to stderr as
//! `{"error": ...}` with exit code 1.

use std::env;
use std::io::IsTerminal;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};
use tracing::debug;

use aurora::bootstrap::{Bootstrap, BootstrapStatus};
use aurora::logging::init_logging;
use aurora::recovery::{seal_paper_wallet, RecoveryPayload};
use aurora::runtime::install_signal_handlers;
use aurora::wallet::{keys, WalletBackend};
use aurora::{Engine, EngineConfig, Network};

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("aurora {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some(command) => run(command, &opts).await,
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || (!opts.json && std::io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({ "error": format!("{e:#}") }), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered =
        if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

async fn run(command: &str, opts: &ParsedArgs) -> anyhow::Result<Value> {
    let recovery = match command {
        "recover" => Some(opts.recovery_payload()?),
        _ => None,
    };
    let engine = Engine::from_config(opts.config()?, recovery).context("starting engine")?;
    install_signal_handlers(engine.shutdown_handle());
    debug!(command, "running command");

    let output = match command {
        "create" => cmd_create(&engine).await,
        "open" => cmd_open(&engine).await,
        "recover" => cmd_recover(&engine).await,
        "delete" => cmd_delete(&engine).await,
        "status" => cmd_status(&engine).await,
        "seed" => cmd_seed(&engine).await,
        "paper" => cmd_paper(&engine, opts).await,
        other => Err(anyhow!("Unknown command: {other}")),
    };

    engine.shutdown().await.context("stopping engine")?;
    output
}

async fn cmd_create(engine: &Engine) -> anyhow::Result<Value> {
    engine.bootstrap().create_wallet().await;
    outcome(engine.bootstrap())
}

async fn cmd_open(engine: &Engine) -> anyhow::Result<Value> {
    if !engine.wallet().db_exists() {
        bail!("no wallet at {}", engine.wallet().path().display());
    }
    engine.bootstrap().open_wallet().await;
    outcome(engine.bootstrap())
}

async fn cmd_recover(engine: &Engine) -> anyhow::Result<Value> {
    let bootstrap = engine.bootstrap();
    if !bootstrap.recover_wallet().await {
        bail!("no recovery data supplied");
    }
    outcome(bootstrap)
}

async fn cmd_delete(engine: &Engine) -> anyhow::Result<Value> {
    engine.bootstrap().delete_wallet().await;
    Ok(json!({
        "deleted": !engine.bootstrap().is_wallet_exist(),
        "status": engine.bootstrap().status(),
    }))
}

async fn cmd_status(engine: &Engine) -> anyhow::Result<Value> {
    let wallet = engine.wallet();
    let exists = wallet.db_exists();
    let (network, version) = if exists {
        (wallet.get_value(keys::NETWORK).await?, wallet.get_value(keys::VERSION).await?)
    } else {
        (None, None)
    };
    Ok(json!({
        "exists": exists,
        "path": wallet.path().display().to_string(),
        "network": network,
        "version": version,
        "configured_network": engine.config().network.as_str(),
        "transport": format!("{:?}", engine.transport().state()),
    }))
}

async fn cmd_seed(engine: &Engine) -> anyhow::Result<Value> {
    let words = engine.wallet().seed_words().await?;
    Ok(json!({ "count": words.len(), "words": words.join(" ") }))
}

async fn cmd_paper(engine: &Engine, opts: &ParsedArgs) -> anyhow::Result<Value> {
    let passphrase = opts.passphrase.as_deref().context("--passphrase is required")?;
    let words = engine.wallet().seed_words().await?;
    let cipher = seal_paper_wallet(&words, passphrase)?;
    Ok(json!({ "cipher": cipher }))
}

/// Turn the final bootstrap state into command output.
fn outcome(bootstrap: &Bootstrap) -> anyhow::Result<Value> {
    let status = bootstrap.status();
    match status.status {
        BootstrapStatus::Success
        | BootstrapStatus::SuccessRestored
        | BootstrapStatus::SuccessSync => Ok(json!({
            "status": status,
            "exists": bootstrap.is_wallet_exist(),
            "auto_reconnect": bootstrap.can_automatically_reconnect(),
        })),
        _ => match bootstrap.last_message() {
            Some(message) => bail!("{}: {}", message.title, message.description),
            None => bail!("wallet flow ended in {:?}", status.status),
        },
    }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    app: Option<String>,
    network: Option<String>,
    data_dir: Option<String>,
    tor_port: Option<u16>,
    timeout_secs: Option<u64>,
    // Recovery options
    seed: Option<String>,
    cipher: Option<String>,
    passphrase: Option<String>,
    // Output options
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            let value = args.get(i + 1).cloned();
            let mut takes_value = true;
            match arg.as_str() {
                "--help" | "-h" => { opts.help = true; takes_value = false; }
                "--version" | "-V" => { opts.version = true; takes_value = false; }
                "--json" => { opts.json = true; takes_value = false; }
                "--pretty" => { opts.pretty = true; takes_value = false; }
                "--app" | "-a" => opts.app = value,
                "--network" | "-n" => opts.network = value,
                "--data-dir" | "-d" => opts.data_dir = value,
                "--tor-port" => opts.tor_port = value.and_then(|v| v.parse().ok()),
                "--timeout" => opts.timeout_secs = value.and_then(|v| v.parse().ok()),
                "--seed" | "-s" => opts.seed = value,
                "--cipher" => opts.cipher = value,
                "--passphrase" | "-p" => opts.passphrase = value,
                _ if !arg.starts_with('-') => {
                    positional.push(arg.clone());
                    takes_value = false;
                }
                _ => takes_value = false, // Ignore unknown flags
            }
            i += if takes_value { 2 } else { 1 };
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }

        // Environment variables (lower priority than CLI args)
        if opts.app.is_none() {
            opts.app = env::var("AURORA_APP").ok().filter(|s| !s.is_empty());
        }
        if opts.data_dir.is_none() {
            opts.data_dir = env::var("AURORA_DATA_DIR").ok().filter(|s| !s.is_empty());
        }

        opts
    }

    /// `AURORA_*` environment first, then explicit flags on top.
    fn config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::from_env(self.app.as_deref().unwrap_or("aurora"));
        if let Some(network) = &self.network {
            let network = Network::from_str(network)
                .with_context(|| format!("unknown network: {network}"))?;
            config = config.with_network(network);
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(port) = self.tor_port {
            config = config.with_tor_port(port);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_transport_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    fn recovery_payload(&self) -> anyhow::Result<RecoveryPayload> {
        match (&self.seed, &self.cipher, &self.passphrase) {
            (Some(words), None, _) => Ok(RecoveryPayload::seed_phrase(words.clone())),
            (None, Some(cipher), Some(passphrase)) => {
                Ok(RecoveryPayload::paper_wallet(cipher.clone(), passphrase.clone()))
            }
            (None, Some(_), None) => bail!("--cipher needs --passphrase"),
            _ => bail!("recover needs either --seed or --cipher with --passphrase"),
        }
    }
}

fn print_usage() {
    println!(
        r#"aurora - wallet bootstrap

USAGE:
    aurora <command> [options]

COMMANDS:
    create                  Create a new wallet and start it
    open                    Open the existing wallet
    recover                 Restore a wallet (--seed, or --cipher with --passphrase)
    delete                  Stop and delete the wallet
    status                  Show wallet and relay state
    seed                    Print the wallet seed words
    paper                   Print a paper wallet cipher (--passphrase)

OPTIONS:
    --app, -a <name>        Application name (env: AURORA_APP)
    --network, -n <net>     mainnet|nextnet|stagenet|esmeralda|igor|localnet (env: AURORA_NETWORK)
    --data-dir, -d <path>   Data directory (env: AURORA_DATA_DIR)
    --tor-port <port>       Wait for the Tor SOCKS port before starting (env: AURORA_TOR_PORT)
    --timeout <secs>        Give up waiting for Tor (env: AURORA_TRANSPORT_TIMEOUT_SECS)

RECOVERY OPTIONS:
    --seed, -s <words>      24 seed words
    --cipher <hex>          Paper wallet cipher
    --passphrase, -p <p>    Paper wallet passphrase

OUTPUT OPTIONS:
    --json                  Compact JSON output
    --pretty                Pretty-print JSON
    --version, -V           Print version

EXAMPLES:
    aurora create --network nextnet
    aurora paper --passphrase "correct horse"
    aurora recover --cipher 9f3c... --passphrase "correct horse"
"#
    );
}
