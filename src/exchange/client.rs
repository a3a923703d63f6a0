//! Exchange REST client.
//!
//! # Responsibilities
//! - Expose sequencing, address, fee, balance, account and submission calls
//! - Authenticate with `X-API-KEY` (and `X-API-SIG` for the API-key call)
//! - Report status plus decoded body or structured error for every call
//!
//! # Design Decisions
//! - Stateless per call; timeouts and retries belong to the caller's
//!   [`RetryPolicy`](crate::resilience::RetryPolicy)
//! - No idle connection pooling: a request owns its connection only for the
//!   duration of the call
//! - HTTP error statuses are data, not `Err`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ExchangeConfig;
use crate::exchange::types::{
    AccountInfo, ApiKey, CounterfactualNft, CounterfactualNftInfo, EnsResolution, ExchangeError,
    ExchangeResponse, ExchangeResult, MintRequest, NftBalance, OffchainFee, OffchainRequestType,
    StorageId, SubmissionReceipt, TransferRequest,
};
use crate::signing::EddsaSignature;

pub const STORAGE_ID_PATH: &str = "/api/v3/storageId";
pub const COMPUTE_TOKEN_ADDRESS_PATH: &str = "/api/v3/nft/info/computeTokenAddress";
pub const OFFCHAIN_FEE_PATH: &str = "/api/v3/user/nft/offchainFee";
pub const NFT_INFO_PATH: &str = "/api/v3/nft/info/nfts";
pub const MINT_PATH: &str = "/api/v3/nft/mint";
pub const API_KEY_PATH: &str = "/api/v3/apiKey";
pub const NFT_BALANCE_PATH: &str = "/api/v3/user/nft/balances";
pub const TRANSFER_PATH: &str = "/api/v3/nft/transfer";
pub const ACCOUNT_PATH: &str = "/api/v3/account";
pub const RESOLVE_ENS_PATH: &str = "/api/wallet/v3/resolveEns";

const API_KEY_HEADER: &str = "X-API-KEY";
const API_SIG_HEADER: &str = "X-API-SIG";

/// Narrow interface to the layer-2 exchange.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn next_storage_id(
        &self,
        api_key: &str,
        account_id: u64,
        sell_token_id: u64,
    ) -> ExchangeResult<ExchangeResponse<StorageId>>;

    async fn compute_token_address(
        &self,
        api_key: &str,
        info: &CounterfactualNftInfo,
    ) -> ExchangeResult<ExchangeResponse<CounterfactualNft>>;

    async fn offchain_fee(
        &self,
        api_key: &str,
        account_id: u64,
        request_type: OffchainRequestType,
        token_address: &str,
    ) -> ExchangeResult<ExchangeResponse<OffchainFee>>;

    /// NFT records whose nft data matches `nft_datas`.
    async fn nft_data(&self, nft_datas: &str) -> ExchangeResult<ExchangeResponse<Vec<Value>>>;

    async fn mint_nft(
        &self,
        api_key: &str,
        request: &MintRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>>;

    async fn user_api_key(
        &self,
        account_id: u64,
        signature: &EddsaSignature,
    ) -> ExchangeResult<ExchangeResponse<ApiKey>>;

    async fn nft_balance(
        &self,
        api_key: &str,
        account_id: u64,
    ) -> ExchangeResult<ExchangeResponse<NftBalance>>;

    async fn transfer_nft(
        &self,
        api_key: &str,
        request: &TransferRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>>;

    async fn account_by_owner(&self, owner: &str) -> ExchangeResult<ExchangeResponse<AccountInfo>>;

    async fn account_by_id(&self, account_id: u64) -> ExchangeResult<ExchangeResponse<AccountInfo>>;

    async fn resolve_ens(&self, full_name: &str) -> ExchangeResult<ExchangeResponse<EnsResolution>>;

    /// Absolute URL of `path`, as signed into `X-API-SIG`.
    fn endpoint(&self, path: &str) -> String;
}

/// `reqwest` implementation of [`ExchangeClient`].
#[derive(Clone)]
pub struct RestExchangeClient {
    client: Client,
    base_url: Url,
}

impl RestExchangeClient {
    pub fn new(config: &ExchangeConfig) -> ExchangeResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ExchangeError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(0)
            .build()?;

        tracing::info!(base_url = %base_url, "Exchange client initialized");
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> ExchangeResult<Url> {
        self.base_url.join(path).map_err(|e| ExchangeError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }

    fn get(&self, path: &str) -> ExchangeResult<RequestBuilder> {
        Ok(self.client.get(self.url(path)?))
    }

    fn post(&self, path: &str) -> ExchangeResult<RequestBuilder> {
        Ok(self.client.post(self.url(path)?))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        call: &'static str,
        request: RequestBuilder,
    ) -> ExchangeResult<ExchangeResponse<T>> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let decoded = decode_body(status, &text);
        if decoded.error.is_some() {
            tracing::debug!(call, status, error = ?decoded.error, "Exchange returned an error body");
        }
        Ok(decoded)
    }
}

impl std::fmt::Debug for RestExchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestExchangeClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// Decode a response body.
///
/// A 2xx body that fails to decode as `T` is a null result; its raw text is
/// kept as the error value.
pub fn decode_body<T: DeserializeOwned>(status: u16, text: &str) -> ExchangeResponse<T> {
    if (200..300).contains(&status) {
        match serde_json::from_str::<Option<T>>(text) {
            Ok(body) => ExchangeResponse {
                status,
                body,
                error: None,
            },
            Err(e) => ExchangeResponse::failed(
                status,
                Some(serde_json::json!({ "decode_error": e.to_string(), "body": text })),
            ),
        }
    } else {
        let error = serde_json::from_str::<Value>(text)
            .unwrap_or_else(|_| Value::String(text.to_string()));
        ExchangeResponse::failed(status, Some(error))
    }
}

#[async_trait]
impl ExchangeClient for RestExchangeClient {
    async fn next_storage_id(
        &self,
        api_key: &str,
        account_id: u64,
        sell_token_id: u64,
    ) -> ExchangeResult<ExchangeResponse<StorageId>> {
        let request = self
            .get(STORAGE_ID_PATH)?
            .header(API_KEY_HEADER, api_key)
            .query(&[("accountId", account_id), ("sellTokenId", sell_token_id)]);
        self.send("storage_id", request).await
    }

    async fn compute_token_address(
        &self,
        api_key: &str,
        info: &CounterfactualNftInfo,
    ) -> ExchangeResult<ExchangeResponse<CounterfactualNft>> {
        let request = self
            .get(COMPUTE_TOKEN_ADDRESS_PATH)?
            .header(API_KEY_HEADER, api_key)
            .query(&[
                ("nftFactory", info.nft_factory.as_str()),
                ("nftOwner", info.nft_owner.as_str()),
                ("nftBaseUri", info.nft_base_uri.as_str()),
            ]);
        self.send("compute_token_address", request).await
    }

    async fn offchain_fee(
        &self,
        api_key: &str,
        account_id: u64,
        request_type: OffchainRequestType,
        token_address: &str,
    ) -> ExchangeResult<ExchangeResponse<OffchainFee>> {
        let request = self
            .get(OFFCHAIN_FEE_PATH)?
            .header(API_KEY_HEADER, api_key)
            .query(&[
                ("accountId", account_id.to_string()),
                ("requestType", request_type.code().to_string()),
                ("tokenAddress", token_address.to_string()),
            ]);
        self.send("offchain_fee", request).await
    }

    async fn nft_data(&self, nft_datas: &str) -> ExchangeResult<ExchangeResponse<Vec<Value>>> {
        let request = self.get(NFT_INFO_PATH)?.query(&[("nftDatas", nft_datas)]);
        self.send("nft_data", request).await
    }

    async fn mint_nft(
        &self,
        api_key: &str,
        request: &MintRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>> {
        let request = self.post(MINT_PATH)?.header(API_KEY_HEADER, api_key).json(request);
        self.send("mint_nft", request).await
    }

    async fn user_api_key(
        &self,
        account_id: u64,
        signature: &EddsaSignature,
    ) -> ExchangeResult<ExchangeResponse<ApiKey>> {
        let request = self
            .get(API_KEY_PATH)?
            .header(API_SIG_HEADER, signature.0.as_str())
            .query(&[("accountId", account_id)]);
        self.send("user_api_key", request).await
    }

    async fn nft_balance(
        &self,
        api_key: &str,
        account_id: u64,
    ) -> ExchangeResult<ExchangeResponse<NftBalance>> {
        let request = self
            .get(NFT_BALANCE_PATH)?
            .header(API_KEY_HEADER, api_key)
            .query(&[("accountId", account_id)]);
        self.send("nft_balance", request).await
    }

    async fn transfer_nft(
        &self,
        api_key: &str,
        request: &TransferRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>> {
        let request = self.post(TRANSFER_PATH)?.header(API_KEY_HEADER, api_key).json(request);
        self.send("transfer_nft", request).await
    }

    async fn account_by_owner(&self, owner: &str) -> ExchangeResult<ExchangeResponse<AccountInfo>> {
        let request = self.get(ACCOUNT_PATH)?.query(&[("owner", owner)]);
        self.send("account_by_owner", request).await
    }

    async fn account_by_id(&self, account_id: u64) -> ExchangeResult<ExchangeResponse<AccountInfo>> {
        let request = self.get(ACCOUNT_PATH)?.query(&[("accountId", account_id)]);
        self.send("account_by_id", request).await
    }

    async fn resolve_ens(&self, full_name: &str) -> ExchangeResult<ExchangeResponse<EnsResolution>> {
        let request = self.get(RESOLVE_ENS_PATH)?.query(&[("fullName", full_name)]);
        self.send("resolve_ens", request).await
    }

    fn endpoint(&self, path: &str) -> String {
        self.url(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, path))
    }
}
