use crate::{
    collectibles::Collectible,
    config::GameConfig,
    error::{
        Error,
        Result,
    },
    ledger::{
        Address,
        ExecutionResult,
        ExecutionStatus,
        LedgerEvent,
        LedgerReader,
        ObjectFields,
        ObjectId,
        OwnedObject,
        SigningProvider,
        TokenObject,
    },
    moves::MoveChoice,
    session::GameSession,
    skins::InMemorySkinRepository,
    transaction::{
        GameContract,
        TransactionDescription,
    },
};
use serde_json::json;
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
    },
};

pub const ONE_TOKEN: u64 = 1_000_000_000;

pub fn address(byte: u8) -> Address {
    format!("0x{byte:02x}").parse().unwrap()
}

pub fn sample_contract() -> GameContract {
    let package = address(0xab);
    GameContract {
        token_type: format!("{package}::ggc::GGC"),
        package,
        module: "rps".to_string(),
        pool: address(0xb0),
        randomness: "0x8".parse().unwrap(),
        faucet: Some(address(0xfa)),
        collectible_module: "gg_nft".to_string(),
        mint_function: "mint_collectible".to_string(),
    }
}

pub fn sample_config() -> GameConfig {
    GameConfig::new(sample_contract())
}

pub fn game_result_event(outcome: u8, house_choice: u8) -> LedgerEvent {
    LedgerEvent {
        event_type: format!("{}::rps::GameResult", address(0xab)),
        payload: json!({
            "outcome": outcome,
            "house_choice": house_choice,
        }),
    }
}

pub fn collectible(byte: u8, move_type: MoveChoice) -> Collectible {
    Collectible {
        id: address(byte),
        name: format!("{move_type} #{byte}"),
        description: format!("a {} skin", move_type.label().to_lowercase()),
        image_url: format!("https://img.example/{byte}.png"),
        move_type,
    }
}

pub fn owned_collectible(byte: u8, move_type: MoveChoice) -> OwnedObject {
    OwnedObject {
        id: address(byte),
        type_name: sample_contract().collectible_type(),
        fields: json!({
            "name": { "bytes": format!("Skin {byte}") },
            "description": move_type.label(),
            "image_url": format!("https://img.example/{byte}.png"),
        })
        .as_object()
        .cloned()
        .unwrap(),
    }
}

#[derive(Default)]
struct FakeLedgerState {
    coins: HashMap<Address, Vec<TokenObject>>,
    scripted_balances: VecDeque<u64>,
    objects: HashMap<ObjectId, ObjectFields>,
    owned: HashMap<Address, Vec<OwnedObject>>,
    balance_reads: usize,
    coin_reads: usize,
    fail_reads: bool,
}

/// Ledger read path backed by in-memory state. Clones share state.
#[derive(Clone, Default)]
pub struct FakeLedger {
    state: Arc<Mutex<FakeLedgerState>>,
}

impl FakeLedger {
    pub fn set_coins(&self, owner: &Address, coins: Vec<TokenObject>) {
        self.state.lock().unwrap().coins.insert(owner.clone(), coins);
    }

    /// Successive `get_balance` calls return these values in order; the last
    /// one repeats.
    pub fn script_balances(&self, balances: impl IntoIterator<Item = u64>) {
        self.state.lock().unwrap().scripted_balances = balances.into_iter().collect();
    }

    pub fn set_object_balance(&self, id: ObjectId, balance: u64) {
        let fields = json!({ "balance": balance.to_string() })
            .as_object()
            .cloned()
            .unwrap();
        self.state.lock().unwrap().objects.insert(id, fields);
    }

    pub fn set_owned_objects(&self, owner: &Address, objects: Vec<OwnedObject>) {
        self.state.lock().unwrap().owned.insert(owner.clone(), objects);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn balance_reads(&self) -> usize {
        self.state.lock().unwrap().balance_reads
    }

    pub fn coin_reads(&self) -> usize {
        self.state.lock().unwrap().coin_reads
    }
}

impl LedgerReader for FakeLedger {
    async fn get_balance(&self, owner: &Address, _coin_type: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.balance_reads += 1;
        if state.fail_reads {
            return Err(Error::Ledger("connection refused".to_string()));
        }
        let scripted = if state.scripted_balances.len() > 1 {
            state.scripted_balances.pop_front()
        } else {
            state.scripted_balances.front().copied()
        };
        Ok(scripted.unwrap_or_else(|| {
            state
                .coins
                .get(owner)
                .map(|coins| coins.iter().map(|coin| coin.balance).sum())
                .unwrap_or_default()
        }))
    }

    async fn get_coins(&self, owner: &Address, _coin_type: &str) -> Result<Vec<TokenObject>> {
        let mut state = self.state.lock().unwrap();
        state.coin_reads += 1;
        if state.fail_reads {
            return Err(Error::Ledger("connection refused".to_string()));
        }
        Ok(state.coins.get(owner).cloned().unwrap_or_default())
    }

    async fn get_object_fields(&self, id: &ObjectId) -> Result<ObjectFields> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Ledger(format!("object {id} not found")))
    }

    async fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<OwnedObject>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .owned
            .get(owner)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|object| object.type_name == struct_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeSignerState {
    responses: VecDeque<Result<ExecutionResult>>,
    submissions: Vec<(Address, TransactionDescription)>,
    stalled: bool,
}

/// Signing provider that replays queued responses and records what it was
/// asked to sign. Clones share state.
#[derive(Clone, Default)]
pub struct FakeSigner {
    state: Arc<Mutex<FakeSignerState>>,
}

impl FakeSigner {
    pub fn push_response(&self, response: Result<ExecutionResult>) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    pub fn push_success(&self, digest: &str, events: Vec<LedgerEvent>) {
        self.push_response(Ok(ExecutionResult {
            digest: digest.to_string(),
            status: ExecutionStatus::Success,
            events,
        }));
    }

    /// Every later call hangs without resolving.
    pub fn stall(&self) {
        self.state.lock().unwrap().stalled = true;
    }

    pub fn submissions(&self) -> Vec<(Address, TransactionDescription)> {
        self.state.lock().unwrap().submissions.clone()
    }
}

impl SigningProvider for FakeSigner {
    async fn sign_and_execute(
        &self,
        sender: &Address,
        transaction: &TransactionDescription,
    ) -> Result<ExecutionResult> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.submissions.push((sender.clone(), transaction.clone()));
            if state.stalled {
                None
            } else {
                Some(state.responses.pop_front().unwrap_or_else(|| {
                    Err(Error::SubmissionFailed("no scripted response".to_string()))
                }))
            }
        };
        match next {
            Some(response) => response,
            None => futures::future::pending().await,
        }
    }
}

pub type TestSession = GameSession<FakeLedger, FakeSigner, InMemorySkinRepository>;

/// A session connected as `player`, who holds 60 tokens split over two coins.
pub struct TestContext {
    pub ledger: FakeLedger,
    pub signer: FakeSigner,
    pub skins: InMemorySkinRepository,
    pub player: Address,
    pub session: TestSession,
}

impl TestContext {
    pub fn new() -> Self {
        let ledger = FakeLedger::default();
        let signer = FakeSigner::default();
        let skins = InMemorySkinRepository::new();
        let player = address(0x01);
        ledger.set_coins(
            &player,
            vec![
                TokenObject::new(address(0xc1), 40 * ONE_TOKEN),
                TokenObject::new(address(0xc2), 20 * ONE_TOKEN),
            ],
        );
        let mut session = GameSession::new(
            sample_config(),
            Arc::new(ledger.clone()),
            signer.clone(),
            skins.clone(),
        );
        session.connect(Some(player.clone()));
        Self {
            ledger,
            signer,
            skins,
            player,
            session,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
