use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::info;

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Devnet,
    Testnet,
    Mainnet,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Devnet => "devnet",
            DeploymentEnv::Testnet => "testnet",
            DeploymentEnv::Mainnet => "mainnet",
            DeploymentEnv::Local => "local",
        }
    }

    /// Public full node used when neither the CLI nor the record names one.
    pub fn default_network_url(self) -> &'static str {
        match self {
            DeploymentEnv::Devnet => "https://fullnode.devnet.sui.io:443",
            DeploymentEnv::Testnet => "https://fullnode.testnet.sui.io:443",
            DeploymentEnv::Mainnet => "https://fullnode.mainnet.sui.io:443",
            DeploymentEnv::Local => "http://127.0.0.1:9000",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Devnet => "Devnet",
            DeploymentEnv::Testnet => "Testnet",
            DeploymentEnv::Mainnet => "Mainnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

fn default_game_module() -> String {
    "rps".to_string()
}

fn default_randomness_id() -> String {
    "0x8".to_string()
}

fn default_token_decimals() -> u8 {
    9
}

fn default_collectible_module() -> String {
    "gg_nft".to_string()
}

fn default_mint_function() -> String {
    "mint_collectible".to_string()
}

fn default_mint_fee() -> u64 {
    150
}

fn default_allowed_stakes() -> Vec<u64> {
    vec![1, 5, 10, 50, 100]
}

/// Where one game deployment lives on a network. Amounts are whole tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub network_url: String,
    pub package_id: String,
    #[serde(default = "default_game_module")]
    pub game_module: String,
    pub pool_id: String,
    #[serde(default = "default_randomness_id")]
    pub randomness_id: String,
    pub token_type: String,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
    #[serde(default)]
    pub faucet_id: Option<String>,
    #[serde(default = "default_collectible_module")]
    pub collectible_module: String,
    #[serde(default = "default_mint_function")]
    pub mint_function: String,
    #[serde(default = "default_mint_fee")]
    pub mint_fee: u64,
    #[serde(default = "default_allowed_stakes")]
    pub allowed_stakes: Vec<u64>,
}

impl DeploymentRecord {
    pub fn new(
        network_url: impl AsRef<str>,
        package_id: impl AsRef<str>,
        pool_id: impl AsRef<str>,
        token_type: impl AsRef<str>,
    ) -> Self {
        Self {
            deployed_at: Utc::now().to_rfc3339(),
            network_url: network_url.as_ref().to_string(),
            package_id: package_id.as_ref().to_string(),
            game_module: default_game_module(),
            pool_id: pool_id.as_ref().to_string(),
            randomness_id: default_randomness_id(),
            token_type: token_type.as_ref().to_string(),
            token_decimals: default_token_decimals(),
            faucet_id: None,
            collectible_module: default_collectible_module(),
            mint_function: default_mint_function(),
            mint_fee: default_mint_fee(),
            allowed_stakes: default_allowed_stakes(),
        }
    }

    pub fn with_faucet(mut self, faucet_id: impl AsRef<str>) -> Self {
        self.faucet_id = Some(faucet_id.as_ref().to_string());
        self
    }
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::at(DEPLOYMENTS_ROOT, env)
    }

    /// A store under `root` instead of the working directory's
    /// `.deployments`.
    pub fn at(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }

    /// Replaces the current deployment record.
    pub fn save(&self, record: DeploymentRecord) -> Result<()> {
        info!(
            path = %self.path.display(),
            package = %record.package_id,
            pool = %record.pool_id,
            "recording deployment"
        );
        write_record(&self.path, &record)
    }
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root).with_context(|| {
            format!("Failed to create deployments directory {}", root.display())
        })?;
    }

    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create {} directory", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"").with_context(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}
