use crate::{
    assets,
    collectibles::{
        self,
        Collectible,
        MintRequest,
    },
    config::{
        GameConfig,
        Wager,
    },
    error::{
        Error,
        Result,
    },
    ledger::{
        Address,
        LedgerReader,
        SigningProvider,
    },
    moves::MoveChoice,
    outcome::{
        self,
        DecodedOutcome,
    },
    reconciler::{
        BalanceReconciler,
        BalanceSnapshot,
        BalanceTargets,
    },
    round::{
        RoundState,
        ScoreTally,
        apply_outcome,
    },
    skins::{
        SkinPreferenceStore,
        SkinPreferences,
        SkinRepository,
    },
    submitter::RoundSubmitter,
    transaction::{
        TransactionBuilder,
        TransactionDescription,
    },
};
use std::sync::Arc;
use tracing::{
    error,
    info,
};

/// What a settled round reports back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    pub digest: String,
    pub player: MoveChoice,
    pub decoded: DecodedOutcome,
    pub wager: Wager,
}

/// Session-scoped game state for the connected account. Scores outlive
/// account switches; everything else is per account.
pub struct GameSession<L, S, R> {
    config: GameConfig,
    ledger: Arc<L>,
    submitter: RoundSubmitter<S>,
    skins: SkinPreferenceStore<R>,
    account: Option<Address>,
    round: RoundState,
    tally: ScoreTally,
    balances: BalanceSnapshot,
    collectibles: Vec<Collectible>,
}

impl<L, S, R> GameSession<L, S, R>
where
    L: LedgerReader,
    S: SigningProvider,
    R: SkinRepository,
{
    pub fn new(config: GameConfig, ledger: Arc<L>, signer: S, skins: R) -> Self {
        let submitter = RoundSubmitter::new(signer, config.submit_timeout);
        Self {
            config,
            ledger,
            submitter,
            skins: SkinPreferenceStore::new(skins),
            account: None,
            round: RoundState::default(),
            tally: ScoreTally::default(),
            balances: BalanceSnapshot::default(),
            collectibles: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn balances(&self) -> &BalanceSnapshot {
        &self.balances
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn skins(&self) -> &SkinPreferences {
        self.skins.preferences()
    }

    /// Switches the connected account. Reconnecting the same account keeps
    /// the current state.
    pub fn connect(&mut self, account: Option<Address>) {
        if account == self.account {
            return;
        }
        info!(account = ?account.as_ref().map(Address::as_str), "account changed");
        self.skins.switch_account(account.as_ref());
        self.round = RoundState::default();
        self.balances = BalanceSnapshot::default();
        self.collectibles.clear();
        self.account = account;
    }

    fn require_account(&self) -> Result<Address> {
        self.account.clone().ok_or(Error::NoAccount)
    }

    /// Plays one round: funds the stake, submits the play call once and
    /// decodes the result. The result stays on the round until
    /// [`GameSession::acknowledge`].
    pub async fn play(&mut self, choice: MoveChoice, stake: u64) -> Result<RoundReport> {
        let account = self.require_account()?;
        if !self.round.is_idle() {
            return Err(Error::RoundInProgress);
        }
        let wager = self.config.stakes.wager(stake)?;
        let transaction = self.funded(&account, wager.base_units, |builder, plan| {
            Ok(builder.play(plan, choice))
        })
        .await?;

        let result = self
            .submitter
            .submit(&mut self.round, choice, &account, &transaction)
            .await?;

        match outcome::decode(&result, choice) {
            Ok(decoded) => {
                let (round, tally) = apply_outcome(&self.round, self.tally, &decoded);
                self.round = round;
                self.tally = tally;
                info!(
                    digest = %result.digest,
                    %choice,
                    opponent = %decoded.opponent,
                    outcome = %decoded.outcome,
                    "round settled"
                );
                Ok(RoundReport {
                    digest: result.digest,
                    player: choice,
                    decoded,
                    wager,
                })
            }
            Err(err) => {
                error!(digest = %result.digest, ?err, "confirmed round could not be decoded");
                self.round = self.round.undecoded();
                Err(err)
            }
        }
    }

    /// Clears a shown result so the next round can start.
    pub fn acknowledge(&mut self) -> Result<()> {
        self.round = self.round.acknowledge()?;
        Ok(())
    }

    pub async fn claim_faucet(&mut self) -> Result<String> {
        let account = self.require_account()?;
        let transaction = TransactionBuilder::new(&self.config.contract).claim_faucet()?;
        let result = self.submitter.execute(&account, &transaction).await?;
        info!(digest = %result.digest, "faucet claimed");
        Ok(result.digest)
    }

    /// Deposits `whole` tokens into the pool.
    pub async fn deposit_to_pool(&mut self, whole: u64) -> Result<String> {
        let account = self.require_account()?;
        let amount = self.config.stakes.to_base_units(whole)?;
        let transaction = self
            .funded(&account, amount, |builder, plan| {
                Ok(builder.deposit_to_pool(plan))
            })
            .await?;
        let result = self.submitter.execute(&account, &transaction).await?;
        info!(digest = %result.digest, whole, "deposited to pool");
        Ok(result.digest)
    }

    pub async fn mint_collectible(&mut self, request: &MintRequest) -> Result<String> {
        let account = self.require_account()?;
        request.validate()?;
        let fee = self.config.stakes.to_base_units(self.config.mint_fee)?;
        let transaction = self
            .funded(&account, fee, |builder, plan| {
                builder.mint_collectible(request, plan)
            })
            .await?;
        let result = self.submitter.execute(&account, &transaction).await?;
        info!(digest = %result.digest, name = %request.name, "collectible minted");
        Ok(result.digest)
    }

    /// Reads the account's coins, selects enough of them for `amount` and
    /// lets `build` turn the plan into a transaction.
    async fn funded(
        &self,
        account: &Address,
        amount: u64,
        build: impl FnOnce(&TransactionBuilder<'_>, &assets::SpendPlan) -> Result<TransactionDescription>,
    ) -> Result<TransactionDescription> {
        let coins = self
            .ledger
            .get_coins(account, &self.config.contract.token_type)
            .await?;
        let plan = assets::select(&coins, amount)?;
        build(&TransactionBuilder::new(&self.config.contract), &plan)
    }

    pub async fn refresh_collectibles(&mut self) -> Result<&[Collectible]> {
        let account = self.require_account()?;
        let objects = self
            .ledger
            .get_owned_objects(&account, &self.config.contract.collectible_type())
            .await?;
        self.collectibles = collectibles::decode_owned(&objects);
        Ok(&self.collectibles)
    }

    /// A reconciler for the connected account that can be moved onto its own
    /// task.
    pub fn balance_reconciler(&self) -> Result<BalanceReconciler<L>> {
        let account = self.require_account()?;
        let contract = &self.config.contract;
        Ok(BalanceReconciler::new(
            self.ledger.clone(),
            account,
            BalanceTargets {
                token_type: contract.token_type.clone(),
                pool: Some(contract.pool.clone()),
                faucet: contract.faucet.clone(),
            },
            self.config.reconcile,
        ))
    }

    /// Takes a snapshot from a reconciler. Snapshots for an account that is
    /// no longer connected are dropped.
    pub fn apply_balances(&mut self, snapshot: BalanceSnapshot) -> bool {
        if snapshot.account.is_none() || snapshot.account != self.account {
            return false;
        }
        self.balances = snapshot;
        true
    }

    pub fn select_skin(&mut self, collectible: Collectible) -> Result<()> {
        self.skins.select(collectible)
    }

    pub fn remove_skin(&mut self, choice: MoveChoice) -> Result<()> {
        self.skins.remove(choice)
    }

    pub fn skin_for(&self, choice: MoveChoice) -> Option<&Collectible> {
        self.skins.lookup(choice)
    }
}
