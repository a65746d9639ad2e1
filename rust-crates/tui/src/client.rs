use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
};
use rps_tui::{
    rpc_client::SuiRpcClient,
    wallet_bridge::WalletBridge,
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    error,
    info,
    warn,
};
use wager::{
    Address,
    GameSession,
    MoveChoice,
    RoundReport,
    collectibles::{
        Collectible,
        MintRequest,
    },
    config::{
        GameConfig,
        StakeTable,
    },
    reconciler::BalanceSnapshot,
    round::{
        RoundPhase,
        RoundState,
        ScoreTally,
    },
    skins::{
        SkinPreferences,
        SledSkinRepository,
    },
    transaction::GameContract,
};

const SKINS_DB_DIR: &str = "skins";
const MAX_ERRORS: usize = 50;
const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: DeploymentEnv,
    pub rpc_url: String,
    pub wallet_url: String,
    pub data_dir: PathBuf,
    pub record: DeploymentRecord,
}

/// Turns a deployment record into the game's on-ledger configuration.
pub fn game_config(record: &DeploymentRecord) -> Result<GameConfig> {
    let parse = |raw: &str, what: &str| -> Result<Address> {
        raw.parse::<Address>()
            .wrap_err_with(|| format!("deployment record has an invalid {what}"))
    };
    let faucet = record
        .faucet_id
        .as_deref()
        .map(|raw| parse(raw, "faucet id"))
        .transpose()?;
    let contract = GameContract {
        package: parse(&record.package_id, "package id")?,
        module: record.game_module.clone(),
        pool: parse(&record.pool_id, "pool id")?,
        randomness: parse(&record.randomness_id, "randomness id")?,
        token_type: record.token_type.clone(),
        faucet,
        collectible_module: record.collectible_module.clone(),
        mint_function: record.mint_function.clone(),
    };
    let mut config = GameConfig::new(contract);
    config.stakes = StakeTable::new(record.allowed_stakes.clone(), record.token_decimals);
    config.mint_fee = record.mint_fee;
    Ok(config)
}

#[derive(Clone, Debug, Default)]
pub struct AppSnapshot {
    pub network: String,
    pub account: Option<Address>,
    pub decimals: u8,
    pub balances: BalanceSnapshot,
    pub round: RoundState,
    pub last_report: Option<RoundReport>,
    pub tally: ScoreTally,
    pub stakes: Vec<u64>,
    pub mint_fee: u64,
    pub faucet_available: bool,
    pub collectibles: Vec<Collectible>,
    pub skins: SkinPreferences,
    pub status: String,
    pub errors: Vec<String>,
}

type AppSession = GameSession<SuiRpcClient, WalletBridge, SledSkinRepository>;

pub struct AppController {
    session: AppSession,
    wallet: WalletBridge,
    env: DeploymentEnv,
    status: String,
    errors: Vec<String>,
    last_report: Option<RoundReport>,
    wallet_reachable: bool,
    balance_tx: mpsc::UnboundedSender<BalanceSnapshot>,
}

impl AppController {
    pub fn new(
        config: AppConfig,
        balance_tx: mpsc::UnboundedSender<BalanceSnapshot>,
    ) -> Result<Self> {
        let game = game_config(&config.record)?;
        let ledger = Arc::new(
            SuiRpcClient::new(config.rpc_url.clone()).wrap_err("ledger client setup failed")?,
        );
        let wallet =
            WalletBridge::new(&config.wallet_url).wrap_err("wallet bridge setup failed")?;
        let skins = SledSkinRepository::open(config.data_dir.join(SKINS_DB_DIR))
            .wrap_err("opening skin preferences failed")?;
        info!(
            env = %config.env,
            rpc = %config.rpc_url,
            wallet = %wallet.base(),
            package = %game.contract.package,
            "game session ready"
        );
        Ok(Self {
            session: GameSession::new(game, ledger, wallet.clone(), skins),
            wallet,
            env: config.env,
            status: String::from("Connecting to wallet..."),
            errors: Vec::new(),
            last_report: None,
            wallet_reachable: true,
            balance_tx,
        })
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn report_error(&mut self, context: &str, err: wager::Error) {
        let hint = if err.is_retryable() {
            " (nothing was spent, try again)"
        } else {
            ""
        };
        self.set_status(format!("{context} failed"));
        push_errors(&mut self.errors, vec![format!("{context}: {err}{hint}")]);
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let config = self.session.config();
        AppSnapshot {
            network: self.env.to_string(),
            account: self.session.account().cloned(),
            decimals: config.stakes.decimals(),
            balances: self.session.balances().clone(),
            round: *self.session.round(),
            last_report: self.last_report.clone(),
            tally: self.session.tally(),
            stakes: config.stakes.allowed().to_vec(),
            mint_fee: config.mint_fee,
            faucet_available: config.contract.faucet.is_some(),
            collectibles: self.session.collectibles().to_vec(),
            skins: self.session.skins().clone(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    /// Follows the wallet's connected account. Returns true when it changed.
    pub async fn sync_account(&mut self) -> bool {
        let account = match self.wallet.connected_account().await {
            Ok(account) => {
                if !self.wallet_reachable {
                    info!("wallet reachable again");
                    self.wallet_reachable = true;
                }
                account
            }
            Err(err) => {
                if self.wallet_reachable {
                    warn!(?err, "wallet account unavailable");
                    self.wallet_reachable = false;
                    self.set_status("Wallet unreachable, is the bridge running?");
                }
                return false;
            }
        };
        if account.as_ref() == self.session.account() {
            return false;
        }
        self.session.connect(account);
        self.last_report = None;
        match self.session.account() {
            Some(account) => {
                let message = format!("Connected {}", account.short());
                self.set_status(message);
                self.spawn_reconcile(None);
                self.refresh_collectibles().await;
            }
            None => self.set_status("Wallet disconnected"),
        }
        true
    }

    /// Polls balances on a separate task after a write. Each read comes back
    /// through the balance channel.
    fn spawn_reconcile(&self, baseline: Option<BalanceSnapshot>) {
        let Ok(reconciler) = self.session.balance_reconciler() else {
            return;
        };
        let tx = self.balance_tx.clone();
        tokio::spawn(async move {
            let report = reconciler
                .reconcile(baseline.as_ref(), |snapshot| {
                    let _ = tx.send(snapshot);
                })
                .await;
            debug!(
                attempts = report.attempts,
                converged = report.converged,
                "balance reconcile finished"
            );
        });
    }

    /// One background read of the current balances.
    fn spawn_refresh(&self) {
        let Ok(reconciler) = self.session.balance_reconciler() else {
            return;
        };
        let tx = self.balance_tx.clone();
        tokio::spawn(async move {
            match reconciler.read().await {
                Ok(snapshot) => {
                    let _ = tx.send(snapshot);
                }
                Err(err) => debug!(?err, "periodic balance read failed"),
            }
        });
    }

    pub fn apply_balances(&mut self, snapshot: BalanceSnapshot) {
        if !self.session.apply_balances(snapshot) {
            debug!("dropped balances for a previous account");
        }
    }

    pub async fn play(&mut self, choice: MoveChoice, stake: u64) {
        let baseline = self.session.balances().clone();
        match self.session.play(choice, stake).await {
            Ok(report) => {
                let message = format!(
                    "{} vs {}: {}",
                    report.player, report.decoded.opponent, report.decoded.outcome
                );
                self.set_status(message);
                self.last_report = Some(report);
                self.spawn_reconcile(Some(baseline));
            }
            Err(err) => {
                error!(?err, %choice, stake, "round failed");
                if self.session.round().phase == RoundPhase::Undecoded {
                    self.spawn_reconcile(Some(baseline));
                }
                self.report_error("Round", err);
            }
        }
    }

    pub fn acknowledge(&mut self) {
        match self.session.acknowledge() {
            Ok(()) => {
                self.last_report = None;
                self.set_status("Pick your next move");
            }
            Err(err) => self.report_error("Next round", err),
        }
    }

    pub async fn claim_faucet(&mut self) {
        let baseline = self.session.balances().clone();
        match self.session.claim_faucet().await {
            Ok(digest) => {
                self.set_status(format!("Faucet claimed ({digest})"));
                self.spawn_reconcile(Some(baseline));
            }
            Err(err) => self.report_error("Faucet claim", err),
        }
    }

    pub async fn deposit(&mut self, whole: u64) {
        let baseline = self.session.balances().clone();
        match self.session.deposit_to_pool(whole).await {
            Ok(digest) => {
                self.set_status(format!("Deposited {whole} to the pool ({digest})"));
                self.spawn_reconcile(Some(baseline));
            }
            Err(err) => self.report_error("Deposit", err),
        }
    }

    pub async fn mint(&mut self, request: MintRequest) {
        let baseline = self.session.balances().clone();
        match self.session.mint_collectible(&request).await {
            Ok(digest) => {
                self.spawn_reconcile(Some(baseline));
                self.refresh_collectibles().await;
                self.set_status(format!("Minted {} ({digest})", request.name.trim()));
            }
            Err(err) => self.report_error("Mint", err),
        }
    }

    pub async fn refresh_collectibles(&mut self) {
        match self.session.refresh_collectibles().await {
            Ok(owned) => debug!(count = owned.len(), "collectibles refreshed"),
            Err(err) => self.report_error("Loading collectibles", err),
        }
    }

    pub fn select_skin(&mut self, collectible: Collectible) {
        let message = format!("{} now shows {}", collectible.move_type, collectible.name);
        match self.session.select_skin(collectible) {
            Ok(()) => self.set_status(message),
            Err(err) => self.report_error("Selecting skin", err),
        }
    }

    pub fn remove_skin(&mut self, choice: MoveChoice) {
        match self.session.remove_skin(choice) {
            Ok(()) => self.set_status(format!("{choice} uses the default look")),
            Err(err) => self.report_error("Resetting skin", err),
        }
    }
}

/// Appends `items`, keeping only the newest `MAX_ERRORS`.
fn push_errors(errors: &mut Vec<String>, mut items: Vec<String>) {
    if items.is_empty() {
        return;
    }
    for item in &items {
        error!("{}", item);
    }
    errors.append(&mut items);
    if errors.len() > MAX_ERRORS {
        let drain = errors.len() - MAX_ERRORS;
        errors.drain(0..drain);
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (balance_tx, mut balance_rx) = mpsc::unbounded_channel();
    let controller = AppController::new(config, balance_tx)?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, &mut input_events, &mut balance_rx).await;
    ui::terminal_exit()?;
    res
}

fn show_processing_status(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    message: impl Into<String>,
    context: &'static str,
) -> Result<()> {
    controller.set_status(message);
    ui::draw(ui_state, &controller.snapshot()).wrap_err(context)
}

async fn run_loop(
    mut controller: AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
    balance_rx: &mut mpsc::UnboundedReceiver<BalanceSnapshot>,
) -> Result<()> {
    tracing::info!("Running app loop");
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            Some(snapshot) = balance_rx.recv() => {
                controller.apply_balances(snapshot);
            }
            _ = tick.tick() => {
                if !controller.sync_account().await {
                    controller.spawn_refresh();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Play(choice, stake) => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            format!("Playing {choice} for {stake}, approve in your wallet..."),
                            "draw while submitting round failed",
                        )?;
                        controller.play(choice, stake).await;
                    }
                    ui::UserEvent::Acknowledge => controller.acknowledge(),
                    ui::UserEvent::ClaimFaucet => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            "Claiming from the faucet...",
                            "draw while claiming faucet failed",
                        )?;
                        controller.claim_faucet().await;
                    }
                    ui::UserEvent::Deposit(amount) => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            format!("Depositing {amount} to the pool..."),
                            "draw while depositing failed",
                        )?;
                        controller.deposit(amount).await;
                    }
                    ui::UserEvent::ConfirmMint(request) => {
                        show_processing_status(
                            &mut controller,
                            ui_state,
                            format!("Minting {}...", request.name.trim()),
                            "draw while minting failed",
                        )?;
                        controller.mint(request).await;
                    }
                    ui::UserEvent::SelectSkin(collectible) => controller.select_skin(collectible),
                    ui::UserEvent::RemoveSkin(choice) => controller.remove_skin(choice),
                    ui::UserEvent::RefreshCollectibles => {
                        controller.refresh_collectibles().await;
                    }
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    info!("leaving app loop");
    Ok(())
}
