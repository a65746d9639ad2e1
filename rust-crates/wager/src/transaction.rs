//! Pure construction of the transactions the client submits. Nothing here
//! talks to the network.

use crate::{
    assets::SpendPlan,
    collectibles::MintRequest,
    error::{
        Error,
        Result,
    },
    ledger::{
        Address,
        ObjectId,
    },
    moves::MoveChoice,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTarget {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PureValue {
    U8(u8),
    U64(u64),
    Address(Address),
    String(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Argument {
    Object { id: ObjectId },
    Pure { value: PureValue },
    /// Output `index` of the command at position `command`.
    NestedResult { command: u16, index: u16 },
}

impl Argument {
    pub fn object(id: &ObjectId) -> Self {
        Argument::Object { id: id.clone() }
    }

    pub fn pure(value: PureValue) -> Self {
        Argument::Pure { value }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    MoveCall {
        target: CallTarget,
        type_arguments: Vec<String>,
        arguments: Vec<Argument>,
    },
}

/// A self-contained, ordered list of commands handed to the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescription {
    pub commands: Vec<Command>,
}

impl TransactionDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `command` and returns its position.
    pub fn push(&mut self, command: Command) -> u16 {
        self.commands.push(command);
        (self.commands.len() - 1) as u16
    }

    pub fn move_calls(&self) -> impl Iterator<Item = (&CallTarget, &[Argument])> {
        self.commands.iter().filter_map(|command| match command {
            Command::MoveCall {
                target, arguments, ..
            } => Some((target, arguments.as_slice())),
            _ => None,
        })
    }
}

/// On-ledger identifiers of one game deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameContract {
    pub package: ObjectId,
    pub module: String,
    pub pool: ObjectId,
    pub randomness: ObjectId,
    pub token_type: String,
    pub faucet: Option<ObjectId>,
    pub collectible_module: String,
    /// Entry function of `collectible_module` that mints one collectible.
    pub mint_function: String,
}

impl GameContract {
    pub fn target(&self, function: &str) -> CallTarget {
        CallTarget {
            package: self.package.clone(),
            module: self.module.clone(),
            function: function.to_string(),
        }
    }

    fn collectible_target(&self, function: &str) -> CallTarget {
        CallTarget {
            package: self.package.clone(),
            module: self.collectible_module.clone(),
            function: function.to_string(),
        }
    }

    /// Struct type of the minted collectibles, used to list them.
    pub fn collectible_type(&self) -> String {
        format!("{}::{}::NFT", self.package, self.collectible_module)
    }
}

pub struct TransactionBuilder<'a> {
    contract: &'a GameContract,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(contract: &'a GameContract) -> Self {
        Self { contract }
    }

    /// `play(pool, coin, move_code, random)`
    pub fn play(&self, funding: &SpendPlan, choice: MoveChoice) -> TransactionDescription {
        let mut tx = TransactionDescription::new();
        let coin = funding.append_to(&mut tx);
        tx.push(Command::MoveCall {
            target: self.contract.target("play"),
            type_arguments: vec![],
            arguments: vec![
                Argument::object(&self.contract.pool),
                coin,
                Argument::pure(PureValue::U8(choice.code())),
                Argument::object(&self.contract.randomness),
            ],
        });
        tx
    }

    /// `claim_faucet(faucet, random)`
    pub fn claim_faucet(&self) -> Result<TransactionDescription> {
        let faucet = self.contract.faucet.as_ref().ok_or(Error::FaucetUnavailable)?;
        let mut tx = TransactionDescription::new();
        tx.push(Command::MoveCall {
            target: self.contract.target("claim_faucet"),
            type_arguments: vec![],
            arguments: vec![
                Argument::object(faucet),
                Argument::object(&self.contract.randomness),
            ],
        });
        Ok(tx)
    }

    /// `deposit_to_pool(pool, coin)`
    pub fn deposit_to_pool(&self, funding: &SpendPlan) -> TransactionDescription {
        let mut tx = TransactionDescription::new();
        let coin = funding.append_to(&mut tx);
        tx.push(Command::MoveCall {
            target: self.contract.target("deposit_to_pool"),
            type_arguments: vec![],
            arguments: vec![Argument::object(&self.contract.pool), coin],
        });
        tx
    }

    /// `<mint_function>(name, description, image_url, move_type, fee_coin)`
    pub fn mint_collectible(
        &self,
        request: &MintRequest,
        fee: &SpendPlan,
    ) -> Result<TransactionDescription> {
        request.validate()?;
        let mut tx = TransactionDescription::new();
        let coin = fee.append_to(&mut tx);
        tx.push(Command::MoveCall {
            target: self.contract.collectible_target(&self.contract.mint_function),
            type_arguments: vec![],
            arguments: vec![
                Argument::pure(PureValue::String(request.name.trim().to_string())),
                Argument::pure(PureValue::String(request.description.clone())),
                Argument::pure(PureValue::String(request.image_url.trim().to_string())),
                Argument::pure(PureValue::String(request.move_type.label().to_string())),
                coin,
            ],
        });
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        assets,
        ledger::TokenObject,
        test_helpers::{
            address,
            sample_contract,
        },
    };

    fn single_coin_plan(amount: u64) -> SpendPlan {
        assets::select(&[TokenObject::new(address(0xc1), 1_000)], amount).unwrap()
    }

    #[test]
    fn play__calls_entry_point_with_fixed_argument_order() {
        // given
        let contract = sample_contract();
        let plan = single_coin_plan(10);

        // when
        let tx = TransactionBuilder::new(&contract).play(&plan, MoveChoice::Rock);

        // then
        let calls: Vec<_> = tx.move_calls().collect();
        assert_eq!(calls.len(), 1);
        let (target, arguments) = calls[0];
        assert_eq!(target.function, "play");
        assert_eq!(target.module, "rps");
        assert_eq!(
            arguments,
            &[
                Argument::object(&contract.pool),
                Argument::NestedResult {
                    command: 0,
                    index: 0
                },
                Argument::pure(PureValue::U8(1)),
                Argument::object(&contract.randomness),
            ]
        );
    }

    #[test]
    fn play__encodes_every_move_with_its_table_code() {
        let contract = sample_contract();
        let plan = single_coin_plan(1);
        for choice in MoveChoice::ALL {
            let tx = TransactionBuilder::new(&contract).play(&plan, choice);
            let (_, arguments) = tx.move_calls().next().unwrap();
            assert_eq!(arguments[2], Argument::pure(PureValue::U8(choice.code())));
        }
    }

    #[test]
    fn claim_faucet__fails_without_a_configured_faucet() {
        // given
        let mut contract = sample_contract();
        contract.faucet = None;

        // when
        let result = TransactionBuilder::new(&contract).claim_faucet();

        // then
        assert_eq!(result, Err(Error::FaucetUnavailable));
    }

    #[test]
    fn mint_collectible__targets_the_collectible_module() {
        // given
        let contract = sample_contract();
        let request = MintRequest {
            name: " Stone Fist ".to_string(),
            description: "heavy".to_string(),
            image_url: "https://img/rock.png".to_string(),
            move_type: MoveChoice::Rock,
        };

        // when
        let tx = TransactionBuilder::new(&contract)
            .mint_collectible(&request, &single_coin_plan(150))
            .unwrap();

        // then
        let (target, arguments) = tx.move_calls().next().unwrap();
        assert_eq!(target.module, contract.collectible_module);
        assert_eq!(target.function, contract.mint_function);
        assert_eq!(
            arguments[0],
            Argument::pure(PureValue::String("Stone Fist".to_string()))
        );
        assert_eq!(
            arguments[3],
            Argument::pure(PureValue::String("Rock".to_string()))
        );
    }

    #[test]
    fn mint_collectible__calls_the_configured_mint_function() {
        // given
        let mut contract = sample_contract();
        contract.collectible_module = "skins".to_string();
        contract.mint_function = "mint_skin".to_string();
        let request = MintRequest {
            name: "Sheet".to_string(),
            description: String::new(),
            image_url: "https://img/paper.png".to_string(),
            move_type: MoveChoice::Paper,
        };

        // when
        let tx = TransactionBuilder::new(&contract)
            .mint_collectible(&request, &single_coin_plan(150))
            .unwrap();

        // then
        let (target, _) = tx.move_calls().next().unwrap();
        assert_eq!(target.module, "skins");
        assert_eq!(target.function, "mint_skin");
    }

    #[test]
    fn description__serializes_to_tagged_json() {
        let contract = sample_contract();
        let tx = TransactionBuilder::new(&contract).play(&single_coin_plan(5), MoveChoice::Paper);

        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["commands"][0]["command"], "splitCoins");
        assert_eq!(json["commands"][1]["command"], "moveCall");
        assert_eq!(json["commands"][1]["arguments"][2]["value"]["type"], "u8");
        assert_eq!(json["commands"][1]["arguments"][2]["value"]["value"], 2);
    }
}
