#![allow(non_snake_case)]

use proptest::prelude::*;
use tokio::runtime::Builder;
use wager::{
    Error,
    MoveChoice,
    Outcome,
    assets,
    determine_outcome,
    ledger::TokenObject,
    test_helpers::{
        ONE_TOKEN,
        TestContext,
        address,
        game_result_event,
    },
};

fn move_choice() -> impl Strategy<Value = MoveChoice> {
    prop_oneof![
        Just(MoveChoice::Rock),
        Just(MoveChoice::Paper),
        Just(MoveChoice::Scissors),
    ]
}

// fragmented holdings: up to eight coins, some of them empty
prop_compose! {
    fn holdings()(balances in prop::collection::vec(0u64..=1_000_000u64, 0..8)) -> Vec<TokenObject> {
        balances
            .into_iter()
            .enumerate()
            .map(|(i, balance)| TokenObject::new(address(i as u8 + 1), balance))
            .collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn select__succeeds_iff_holdings_cover_the_amount(
        coins in holdings(),
        amount in 1u64..=2_000_000u64,
    ) {
        let total: u64 = coins.iter().map(|coin| coin.balance).sum();
        match assets::select(&coins, amount) {
            Ok(plan) => {
                prop_assert!(amount <= total);
                prop_assert_eq!(plan.total, total);
                prop_assert_eq!(plan.remainder(), total - amount);
                prop_assert!(!plan.merged.contains(&plan.primary));
            }
            Err(Error::InsufficientFunds { required, available }) => {
                prop_assert!(amount > total);
                prop_assert_eq!(required, amount);
                prop_assert_eq!(available, total);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    #[test]
    fn move_code__round_trips(choice in move_choice()) {
        prop_assert_eq!(MoveChoice::from_code(choice.code()), Ok(choice));
    }

    #[test]
    fn determine_outcome__is_antisymmetric(player in move_choice(), opponent in move_choice()) {
        let forward = determine_outcome(player, opponent);
        let backward = determine_outcome(opponent, player);
        prop_assert_eq!(forward == Outcome::Draw, player == opponent);
        let expected_backward = match forward {
            Outcome::Win => Outcome::Lose,
            Outcome::Lose => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        };
        prop_assert_eq!(backward, expected_backward);
        prop_assert_eq!(determine_outcome(player, opponent), forward);
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 10, .. ProptestConfig::default() })]
    #[test]
    fn tally__counts_every_decoded_round_once(rounds in prop::collection::vec((move_choice(), move_choice()), 1..12)) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            _tally__counts_every_decoded_round_once(rounds).await
        })?;
    }
}

async fn _tally__counts_every_decoded_round_once(
    rounds: Vec<(MoveChoice, MoveChoice)>,
) -> Result<(), TestCaseError> {
    // given
    let mut ctx = TestContext::new();
    ctx.ledger.set_coins(
        &ctx.player,
        vec![TokenObject::new(address(0xc1), 1_000 * ONE_TOKEN)],
    );

    for (i, (player, house)) in rounds.iter().enumerate() {
        let outcome = determine_outcome(*player, *house);
        ctx.signer
            .push_success(&format!("D{i}"), vec![game_result_event(outcome.code(), house.code())]);

        // when
        let before = ctx.session.tally();
        ctx.session.play(*player, 1).await.unwrap();
        ctx.session.acknowledge().unwrap();

        // then
        let after = ctx.session.tally();
        prop_assert_eq!(after.rounds(), before.rounds() + 1);
        match outcome {
            Outcome::Win => prop_assert_eq!(after.wins, before.wins + 1),
            Outcome::Lose => prop_assert_eq!(after.losses, before.losses + 1),
            Outcome::Draw => prop_assert_eq!(after.draws, before.draws + 1),
        }
    }

    prop_assert_eq!(ctx.session.tally().rounds(), rounds.len() as u64);
    Ok(())
}
