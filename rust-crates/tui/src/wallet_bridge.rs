//! Signing through a locally running wallet bridge. The bridge holds the
//! keys; this side only asks which account is connected and hands it
//! transactions to sign and execute.

use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use tracing::{
    debug,
    warn,
};
use url::Url;
use wager::{
    Address,
    Error,
    Result,
    SigningProvider,
    ledger::{
        ExecutionResult,
        ExecutionStatus,
        LedgerEvent,
    },
    transaction::TransactionDescription,
};

const USER_REJECTED: &str = "USER_REJECTED";

#[derive(Clone, Debug)]
pub struct WalletBridge {
    base: Url,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    address: Option<String>,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    sender: &'a Address,
    transaction: &'a TransactionDescription,
    options: ExecuteOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteOptions {
    show_effects: bool,
    show_events: bool,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponseDto {
    digest: String,
    effects: Option<EffectsDto>,
    #[serde(default)]
    events: Vec<EventDto>,
}

#[derive(Debug, Deserialize)]
struct EffectsDto {
    status: StatusDto,
}

#[derive(Debug, Deserialize)]
struct StatusDto {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDto {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    parsed_json: Value,
}

#[derive(Debug, Default, Deserialize)]
struct BridgeErrorDto {
    code: Option<String>,
    message: Option<String>,
}

impl From<ExecuteResponseDto> for ExecutionResult {
    fn from(dto: ExecuteResponseDto) -> Self {
        let status = match dto.effects {
            Some(EffectsDto { status }) if status.status == "success" => {
                ExecutionStatus::Success
            }
            Some(EffectsDto { status }) => ExecutionStatus::Failure(
                status.error.unwrap_or_else(|| status.status.clone()),
            ),
            None => ExecutionStatus::Failure("no effects reported".to_string()),
        };
        ExecutionResult {
            digest: dto.digest,
            status,
            events: dto
                .events
                .into_iter()
                .map(|event| LedgerEvent {
                    event_type: event.event_type,
                    payload: event.parsed_json,
                })
                .collect(),
        }
    }
}

fn rejection(status: StatusCode, body: &[u8]) -> Error {
    let parsed: BridgeErrorDto = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    if status == StatusCode::FORBIDDEN || parsed.code.as_deref() == Some(USER_REJECTED) {
        Error::SigningDeclined(message)
    } else {
        Error::SubmissionFailed(format!("{status}: {message}"))
    }
}

impl WalletBridge {
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|err| Error::SubmissionFailed(format!("invalid wallet url: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().build().map_err(|err| {
            Error::SubmissionFailed(format!("failed to build HTTP client: {err}"))
        })?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|err| Error::SubmissionFailed(format!("invalid wallet path: {err}")))
    }

    /// The account the wallet currently exposes, if any.
    pub async fn connected_account(&self) -> Result<Option<Address>> {
        let url = self.endpoint("v1/account")?;
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| Error::Ledger(format!("wallet unreachable: {err}")))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(Error::Ledger(format!("wallet answered {}", res.status())));
        }
        let dto: AccountDto = res
            .json()
            .await
            .map_err(|err| Error::Ledger(format!("wallet account unreadable: {err}")))?;
        dto.address.map(|raw| raw.parse()).transpose()
    }
}

impl SigningProvider for WalletBridge {
    async fn sign_and_execute(
        &self,
        sender: &Address,
        transaction: &TransactionDescription,
    ) -> Result<ExecutionResult> {
        let url = self.endpoint("v1/sign-and-execute")?;
        let request = ExecuteRequest {
            sender,
            transaction,
            options: ExecuteOptions {
                show_effects: true,
                show_events: true,
            },
        };
        debug!(sender = %sender, commands = transaction.commands.len(), "requesting signature");
        let res = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::SubmissionFailed(format!("wallet unreachable: {err}")))?;
        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|err| Error::SubmissionFailed(format!("wallet reply unreadable: {err}")))?;
        if !status.is_success() {
            let err = rejection(status, &body);
            warn!(%status, ?err, "wallet refused transaction");
            return Err(err);
        }
        let dto: ExecuteResponseDto = serde_json::from_slice(&body).map_err(|err| {
            Error::SubmissionFailed(format!("wallet reply malformed: {err}"))
        })?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use serde_json::json;

    #[test]
    fn new__keeps_a_trailing_slash_for_joins() {
        let bridge = WalletBridge::new("http://127.0.0.1:9494/bridge").unwrap();

        let url = bridge.endpoint("v1/account").unwrap();

        assert_eq!(url.as_str(), "http://127.0.0.1:9494/bridge/v1/account");
    }

    #[test]
    fn execute_response__maps_status_and_events() {
        // given
        let dto: ExecuteResponseDto = serde_json::from_value(json!({
            "digest": "9xY",
            "effects": { "status": { "status": "success" } },
            "events": [{
                "type": "0xab::rps::GameResult",
                "parsedJson": { "outcome": 1, "house_choice": 0 }
            }]
        }))
        .unwrap();

        // when
        let result: ExecutionResult = dto.into();

        // then
        assert!(result.is_success());
        assert_eq!(result.digest, "9xY");
        assert_eq!(result.events[0].event_type, "0xab::rps::GameResult");
        assert_eq!(result.events[0].payload["outcome"], 1);
    }

    #[test]
    fn execute_response__reports_aborts_as_failures() {
        let dto: ExecuteResponseDto = serde_json::from_value(json!({
            "digest": "abc",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(5)" } }
        }))
        .unwrap();

        let result: ExecutionResult = dto.into();

        assert_eq!(
            result.status,
            ExecutionStatus::Failure("MoveAbort(5)".to_string())
        );
        assert!(result.events.is_empty());
    }

    #[test]
    fn rejection__distinguishes_declines_from_failures() {
        let declined = rejection(
            StatusCode::BAD_REQUEST,
            br#"{"code":"USER_REJECTED","message":"user closed the prompt"}"#,
        );
        let forbidden = rejection(StatusCode::FORBIDDEN, b"nope");
        let failed = rejection(StatusCode::BAD_GATEWAY, b"upstream down");

        assert_eq!(
            declined,
            Error::SigningDeclined("user closed the prompt".to_string())
        );
        assert!(matches!(forbidden, Error::SigningDeclined(_)));
        assert!(matches!(failed, Error::SubmissionFailed(msg) if msg.contains("upstream down")));
    }

    #[test]
    fn execute_request__serializes_sender_and_commands() {
        let sender: Address = "0x1".parse().unwrap();
        let transaction = TransactionDescription::default();
        let request = ExecuteRequest {
            sender: &sender,
            transaction: &transaction,
            options: ExecuteOptions {
                show_effects: true,
                show_events: true,
            },
        };

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["sender"], sender.as_str());
        assert_eq!(value["options"]["showEvents"], true);
        assert_eq!(value["transaction"]["commands"], json!([]));
    }
}
