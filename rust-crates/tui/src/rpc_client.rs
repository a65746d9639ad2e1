//! Ledger read path over the full node's JSON-RPC API.

use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use tracing::debug;
use wager::{
    Address,
    Error,
    LedgerReader,
    ObjectId,
    Result,
    ledger::{
        ObjectFields,
        OwnedObject,
        TokenObject,
    },
};

const PAGE_LIMIT: u32 = 50;

pub struct SuiRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceDto {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    data: Vec<T>,
    next_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinDto {
    coin_object_id: String,
    balance: String,
}

#[derive(Debug, Deserialize)]
struct ObjectResponseDto {
    data: Option<ObjectDataDto>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectDataDto {
    object_id: String,
    #[serde(rename = "type")]
    type_name: Option<String>,
    content: Option<ContentDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDto {
    data_type: String,
    #[serde(default)]
    fields: ObjectFields,
}

impl TryFrom<CoinDto> for TokenObject {
    type Error = Error;

    fn try_from(dto: CoinDto) -> Result<Self> {
        let balance = dto
            .balance
            .parse()
            .map_err(|_| Error::schema("balance", &dto.balance))?;
        Ok(TokenObject::new(dto.coin_object_id.parse()?, balance))
    }
}

impl ObjectDataDto {
    fn into_owned(self) -> Result<OwnedObject> {
        let content = self
            .content
            .filter(|content| content.data_type == "moveObject")
            .ok_or_else(|| Error::schema("content", "not a move object"))?;
        Ok(OwnedObject {
            id: self.object_id.parse()?,
            type_name: self.type_name.unwrap_or_default(),
            fields: content.fields,
        })
    }
}

impl SuiRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| Error::Ledger(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc call");
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Ledger(format!("{method} request failed: {err}")))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|err| Error::Ledger(format!("{method} body unreadable: {err}")))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(Error::Ledger(format!("{method} answered {status}: {body}")));
        }
        decode_response(method, &bytes)
    }

    async fn paged<T: DeserializeOwned>(
        &self,
        method: &str,
        leading: Vec<Value>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = leading.clone();
            params.push(json!(cursor));
            params.push(json!(PAGE_LIMIT));
            let page: Page<T> = self.call(method, Value::Array(params)).await?;
            items.extend(page.data);
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn decode_response<T: DeserializeOwned>(method: &str, bytes: &[u8]) -> Result<T> {
    let response: RpcResponse<T> = serde_json::from_slice(bytes)
        .map_err(|err| Error::Ledger(format!("{method} payload invalid: {err}")))?;
    if let Some(RpcError { code, message }) = response.error {
        return Err(Error::Ledger(format!("{method} failed ({code}): {message}")));
    }
    response
        .result
        .ok_or_else(|| Error::Ledger(format!("{method} returned no result")))
}

impl LedgerReader for SuiRpcClient {
    async fn get_balance(&self, owner: &Address, coin_type: &str) -> Result<u64> {
        let dto: BalanceDto = self
            .call("suix_getBalance", json!([owner.as_str(), coin_type]))
            .await?;
        dto.total_balance
            .parse()
            .map_err(|_| Error::schema("totalBalance", &dto.total_balance))
    }

    async fn get_coins(&self, owner: &Address, coin_type: &str) -> Result<Vec<TokenObject>> {
        let coins: Vec<CoinDto> = self
            .paged("suix_getCoins", vec![json!(owner.as_str()), json!(coin_type)])
            .await?;
        coins.into_iter().map(TokenObject::try_from).collect()
    }

    async fn get_object_fields(&self, id: &ObjectId) -> Result<ObjectFields> {
        let response: ObjectResponseDto = self
            .call(
                "sui_getObject",
                json!([id.as_str(), { "showContent": true, "showType": true }]),
            )
            .await?;
        if let Some(error) = response.error {
            return Err(Error::Ledger(format!("object {id} unavailable: {error}")));
        }
        let data = response
            .data
            .ok_or_else(|| Error::Ledger(format!("object {id} returned no data")))?;
        Ok(data.into_owned()?.fields)
    }

    async fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<OwnedObject>> {
        let query = json!({
            "filter": { "StructType": struct_type },
            "options": { "showContent": true, "showType": true },
        });
        let responses: Vec<ObjectResponseDto> = self
            .paged("suix_getOwnedObjects", vec![json!(owner.as_str()), query])
            .await?;
        Ok(responses
            .into_iter()
            .filter_map(|response| response.data)
            .filter_map(|data| data.into_owned().ok())
            .collect())
    }
}
