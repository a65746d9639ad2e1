use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DEPLOYMENTS_ROOT,
    DeploymentEnv,
    DeploymentStore,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:9494";
const DEFAULT_DATA_DIR: &str = "~/.rps-wager";
const LOG_FILE_PREFIX: &str = "rps-wager.log";

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["devnet", "testnet", "mainnet", "local"])
            .required(true)
    )
)]
struct Args {
    #[arg(long)]
    devnet: bool,

    #[arg(long)]
    testnet: bool,

    #[arg(long)]
    mainnet: bool,

    #[arg(long)]
    local: bool,

    /// Full node JSON-RPC endpoint; defaults to the deployment's network
    #[arg(long)]
    rpc_url: Option<String>,

    /// Wallet bridge that signs and executes transactions
    #[arg(long, default_value = DEFAULT_WALLET_URL)]
    wallet_url: String,

    /// Where skin preferences and logs are kept
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: String,

    #[arg(long, default_value = DEPLOYMENTS_ROOT)]
    deployments_root: PathBuf,
}

impl Args {
    fn env(&self) -> DeploymentEnv {
        if self.devnet {
            DeploymentEnv::Devnet
        } else if self.testnet {
            DeploymentEnv::Testnet
        } else if self.mainnet {
            DeploymentEnv::Mainnet
        } else {
            DeploymentEnv::Local
        }
    }
}

/// Logs go to a daily file; the terminal belongs to the UI.
fn init_file_tracing(data_dir: &Path) -> Result<WorkerGuard> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("installing tracing subscriber failed: {e}"))?;
    Ok(guard)
}

fn app_config(args: Args) -> Result<client::AppConfig> {
    let env = args.env();
    let data_dir = PathBuf::from(shellexpand::tilde(&args.data_dir).into_owned());
    let store = DeploymentStore::at(&args.deployments_root, env)
        .map_err(|e| eyre!(e))
        .wrap_err("opening deployments store")?;
    let record = store
        .load()
        .map_err(|e| eyre!(e))
        .wrap_err("loading deployment")?
        .ok_or_else(|| {
            eyre!(
                "No deployment record for {env} in {}",
                store.path().display()
            )
        })?;
    let rpc_url = match args.rpc_url {
        Some(url) => url,
        None if !record.network_url.trim().is_empty() => record.network_url.clone(),
        None => env.default_network_url().to_string(),
    };
    Ok(client::AppConfig {
        env,
        rpc_url,
        wallet_url: args.wallet_url,
        data_dir,
        record,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let config = app_config(args)?;
    let _guard = init_file_tracing(&config.data_dir)?;
    tracing::info!(
        env = %config.env,
        deployed_at = %config.record.deployed_at,
        "starting rps-wager client"
    );
    client::run_app(config).await
}
