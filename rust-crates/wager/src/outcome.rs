//! Strict decoding of the `GameResult` event a confirmed play emits.

use crate::{
    error::{
        Error,
        Result,
    },
    ledger::{
        ExecutionResult,
        LedgerEvent,
        read_u64,
    },
    moves::{
        MoveChoice,
        Outcome,
        determine_outcome,
    },
};
use serde_json::{
    Map,
    Value,
};
use tracing::warn;

pub const GAME_RESULT_MARKER: &str = "GameResult";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedOutcome {
    pub outcome: Outcome,
    pub opponent: MoveChoice,
    pub bet_amount: Option<u64>,
    pub payout: Option<u64>,
}

pub fn is_game_result(event: &LedgerEvent) -> bool {
    event.event_type.contains(GAME_RESULT_MARKER)
}

/// Finds the `GameResult` event in `result` and decodes it against the move
/// the player submitted.
pub fn decode(result: &ExecutionResult, submitted: MoveChoice) -> Result<DecodedOutcome> {
    let mut matches = result.events.iter().filter(|event| is_game_result(event));
    let event = matches.next().ok_or_else(|| Error::EventNotFound {
        digest: result.digest.clone(),
    })?;
    if matches.next().is_some() {
        warn!(digest = %result.digest, "multiple GameResult events, decoding the first");
    }
    decode_event(event, submitted)
}

pub fn decode_event(event: &LedgerEvent, submitted: MoveChoice) -> Result<DecodedOutcome> {
    let payload = event
        .payload
        .as_object()
        .ok_or_else(|| Error::schema("payload", "expected an object"))?;

    let outcome = Outcome::from_code(required_u8(payload, "outcome")?)?;
    let opponent = MoveChoice::from_code(required_u8(payload, "house_choice")?)?;

    if let Some(echoed) = optional(payload, "player_choice") {
        let echoed = MoveChoice::from_code(as_u8(echoed, "player_choice")?)?;
        if echoed != submitted {
            return Err(Error::schema(
                "player_choice",
                format!("ledger recorded {echoed}, submitted {submitted}"),
            ));
        }
    }

    if determine_outcome(submitted, opponent) != outcome {
        return Err(Error::InconsistentOutcome {
            player: submitted,
            house: opponent,
            reported: outcome,
        });
    }

    Ok(DecodedOutcome {
        outcome,
        opponent,
        bet_amount: optional(payload, "bet_amount")
            .map(|value| read_u64(value, "bet_amount"))
            .transpose()?,
        payout: optional(payload, "payout")
            .map(|value| read_u64(value, "payout"))
            .transpose()?,
    })
}

fn optional<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|value| !value.is_null())
}

fn required_u8(payload: &Map<String, Value>, field: &str) -> Result<u8> {
    let value = optional(payload, field).ok_or_else(|| Error::schema(field, "missing"))?;
    as_u8(value, field)
}

fn as_u8(value: &Value, field: &str) -> Result<u8> {
    let wide = read_u64(value, field)?;
    u8::try_from(wide).map_err(|_| Error::schema(field, format!("{wide} exceeds u8")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        ledger::ExecutionStatus,
        test_helpers::game_result_event,
    };
    use serde_json::json;

    fn execution(events: Vec<LedgerEvent>) -> ExecutionResult {
        ExecutionResult {
            digest: "D1".to_string(),
            status: ExecutionStatus::Success,
            events,
        }
    }

    #[test]
    fn decode__maps_win_against_scissors() {
        // given
        let result = execution(vec![
            LedgerEvent {
                event_type: "0x2::coin::CoinEvent".to_string(),
                payload: json!({}),
            },
            game_result_event(1, 0),
        ]);

        // when
        let decoded = decode(&result, MoveChoice::Rock).unwrap();

        // then
        assert_eq!(decoded.outcome, Outcome::Win);
        assert_eq!(decoded.opponent, MoveChoice::Scissors);
    }

    #[test]
    fn decode__fails_without_a_game_result_event() {
        let result = execution(vec![]);
        assert_eq!(
            decode(&result, MoveChoice::Rock),
            Err(Error::EventNotFound {
                digest: "D1".to_string()
            })
        );
    }

    #[test]
    fn decode__rejects_missing_or_malformed_fields() {
        // given
        let missing = LedgerEvent {
            event_type: "0xabc::rps::GameResult".to_string(),
            payload: json!({ "outcome": 1 }),
        };
        let out_of_range = LedgerEvent {
            event_type: "0xabc::rps::GameResult".to_string(),
            payload: json!({ "outcome": 1, "house_choice": 300 }),
        };

        // then
        assert!(matches!(
            decode_event(&missing, MoveChoice::Rock),
            Err(Error::SchemaMismatch { field, .. }) if field == "house_choice"
        ));
        assert!(matches!(
            decode_event(&out_of_range, MoveChoice::Rock),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn decode__rejects_unknown_codes() {
        let event = LedgerEvent {
            event_type: "0xabc::rps::GameResult".to_string(),
            payload: json!({ "outcome": 5, "house_choice": 0 }),
        };
        assert_eq!(
            decode_event(&event, MoveChoice::Rock),
            Err(Error::UnknownOutcomeCode(5))
        );
    }

    #[test]
    fn decode__rejects_outcome_that_contradicts_the_moves() {
        // given: rock against scissors reported as a loss
        let event = game_result_event(2, 0);

        // when
        let result = decode_event(&event, MoveChoice::Rock);

        // then
        assert_eq!(
            result,
            Err(Error::InconsistentOutcome {
                player: MoveChoice::Rock,
                house: MoveChoice::Scissors,
                reported: Outcome::Lose,
            })
        );
    }

    #[test]
    fn decode__checks_echoed_player_choice_and_reads_amounts() {
        // given
        let event = LedgerEvent {
            event_type: "0xabc::rps::GameResult".to_string(),
            payload: json!({
                "player_choice": 2,
                "house_choice": "2",
                "outcome": 0,
                "bet_amount": "10000000000",
                "payout": "10000000000",
            }),
        };

        // when
        let decoded = decode_event(&event, MoveChoice::Paper).unwrap();
        let mismatch = decode_event(&event, MoveChoice::Rock);

        // then
        assert_eq!(decoded.outcome, Outcome::Draw);
        assert_eq!(decoded.bet_amount, Some(10_000_000_000));
        assert_eq!(decoded.payout, Some(10_000_000_000));
        assert!(matches!(
            mismatch,
            Err(Error::SchemaMismatch { field, .. }) if field == "player_choice"
        ));
    }
}
