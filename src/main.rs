//! `prism` command-line front-end.
//!
//! A thin caller of the library: starts and supervises the engine, issues
//! RPC calls against a running engine, and manages encrypted secrets.
//!
//! ```text
//! prism start                 launch engine, wait for readiness, hold until Ctrl-C
//! prism status|history|market read-only engine calls
//! prism shield|swap|pay       write engine calls (never retried)
//! prism config ...            secret store management
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use prism_sidecar::config::{resolve_config, SidecarConfig, CONFIG_ENV_VAR};
use prism_sidecar::credentials::{BearerToken, Passphrase, AUTH_TOKEN_ENV_VAR};
use prism_sidecar::lifecycle::signals;
use prism_sidecar::observability::logging;
use prism_sidecar::rpc::{Endpoint, RpcClient, RpcError, DEFAULT_STRATEGY};
use prism_sidecar::secrets::SecretStore;
use prism_sidecar::supervisor::{ProcessSupervisor, SupervisorConfig};

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Privacy-routing sidecar front-end", long_about = None)]
struct Cli {
    /// Config file (TOML).
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Session bearer token shared with the engine.
    #[arg(short, long, env = AUTH_TOKEN_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    /// Engine endpoint override (`unix:/path` or `host:port`).
    #[arg(short, long)]
    endpoint: Option<Endpoint>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the engine and hold until interrupted
    Start {
        /// Readiness deadline in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Engine identity and state
    Status,
    /// Past transactions
    History,
    /// Price snapshot
    Market,
    /// Route funds privately to a destination
    Shield {
        /// Amount in lamports
        amount: u64,
        destination: String,
        #[arg(long, default_value = DEFAULT_STRATEGY)]
        strategy: String,
        /// Override a risk-based refusal
        #[arg(long)]
        force: bool,
    },
    /// Swap between assets
    Swap {
        /// Amount in base units of the source asset
        amount: u64,
        #[arg(long, default_value = "SOL")]
        from: String,
        #[arg(long, default_value = "USDC")]
        to: String,
    },
    /// Private payment to a merchant
    Pay {
        merchant: String,
        /// Amount in lamports
        amount: u64,
    },
    /// Secret store management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Encrypt and store a secret
    SetSecret { name: String, value: String },
    /// Decrypt and print a secret
    GetSecret { name: String },
    /// Print the engine socket path of this installation
    SocketPath,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prism: config: {}", e);
            std::process::exit(2);
        }
    };
    logging::init(&config.observability.log_level);

    if let Err(e) = run(cli, config).await {
        eprintln!("prism: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config: SidecarConfig) -> Result<(), Box<dyn Error>> {
    let store = SecretStore::from_config(&config.storage).map_err(stage("secret store"))?;
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| config.endpoint(&store));

    match cli.command {
        Commands::Start { deadline_ms } => {
            let deadline_ms = deadline_ms.unwrap_or(config.readiness.deadline_ms);
            let deadline = Duration::from_millis(deadline_ms);
            start(&config, &store, endpoint, cli.token, deadline).await
        }
        Commands::Config(cmd) => manage_secrets(&store, cmd),
        command => {
            let token = cli.token.map(BearerToken::new).ok_or_else(|| {
                format!("no session token: pass --token or set {}", AUTH_TOKEN_ENV_VAR)
            })?;
            let client = RpcClient::new(endpoint, token)
                .with_timeout(Duration::from_millis(config.rpc.request_timeout_ms));
            call(&client, command).await
        }
    }
}

async fn start(
    config: &SidecarConfig,
    store: &SecretStore,
    endpoint: Endpoint,
    token: Option<String>,
    deadline: Duration,
) -> Result<(), Box<dyn Error>> {
    let generated = token.is_none();
    let token = token.map(BearerToken::new).unwrap_or_else(BearerToken::generate);

    let mut supervisor_config = SupervisorConfig::from_config(config, store);
    supervisor_config.endpoint = endpoint.clone();
    let mut supervisor = ProcessSupervisor::new(supervisor_config);

    let passphrase = Passphrase::from_env();
    let readiness = supervisor
        .start(deadline, &token, passphrase.as_ref())
        .await
        .map_err(stage("engine startup"))?;

    println!(
        "engine ready at {} ({} probes, {}ms)",
        endpoint,
        readiness.probes,
        readiness.elapsed.as_millis()
    );
    if generated {
        println!("{}={}", AUTH_TOKEN_ENV_VAR, token.expose());
    }

    signals::shutdown_signal().await;
    supervisor.stop().await;
    Ok(())
}

async fn call(client: &RpcClient, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Status => print_json(&client.get_status().await.map_err(rpc_failure)?),
        Commands::History => print_json(&client.get_history().await.map_err(rpc_failure)?),
        Commands::Market => print_json(&client.get_market().await.map_err(rpc_failure)?),
        Commands::Shield {
            amount,
            destination,
            strategy,
            force,
        } => print_json(
            &client
                .shield(amount, &destination, &strategy, force)
                .await
                .map_err(rpc_failure)?,
        ),
        Commands::Swap { amount, from, to } => {
            print_json(&client.swap(amount, &from, &to).await.map_err(rpc_failure)?)
        }
        Commands::Pay { merchant, amount } => {
            print_json(&client.pay(amount, &merchant).await.map_err(rpc_failure)?)
        }
        Commands::Start { .. } | Commands::Config(_) => Ok(()),
    }
}

fn manage_secrets(store: &SecretStore, command: ConfigCommands) -> Result<(), Box<dyn Error>> {
    match command {
        ConfigCommands::SetSecret { name, value } => {
            store.save(&name, value).map_err(stage("secret store"))?;
            println!("saved {}", name);
        }
        ConfigCommands::GetSecret { name } => {
            let value = store.load_string(&name).map_err(stage("secret store"))?;
            println!("{}", value);
        }
        ConfigCommands::SocketPath => {
            println!("{}", store.socket_path().display());
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prefix an error with the stage that produced it.
fn stage<E: std::fmt::Display>(name: &'static str) -> impl FnOnce(E) -> Box<dyn Error> {
    move |e| format!("{}: {}", name, e).into()
}

fn rpc_failure(e: RpcError) -> Box<dyn Error> {
    if e.is_ambiguous() {
        format!(
            "{}; the request may have reached the engine, check history before retrying",
            e
        )
        .into()
    } else {
        e.into()
    }
}
