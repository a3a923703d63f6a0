//! Per-item state machines.
//!
//! # Responsibilities
//! - `bootstrap`: shared context before the first item (transfer: sender,
//!   API key, NFT selection, storage-id lease)
//! - `prepare`: Pending → Sequenced → AddressResolved → FeeQuoted
//! - `complete`: Approved → Signed → Submitted → Done*
//!
//! The fee gate between `prepare` and `complete` belongs to the orchestrator.
//!
//! # Design Decisions
//! - Reads go through the retry policy; submissions get a single bounded
//!   attempt because their storage id must not be consumed twice
//! - Sequencing, address and fee failures are fatal (`Err`); an unresolvable
//!   transfer recipient or a failed submission only fails the item
//! - The transfer lease is returned in [`Completion`], never mutated in place

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::batch::item::{response_snapshot, BatchItem, ItemOutcome, ItemStatus, ItemTrail, Subject};
use crate::batch::source::Recipient;
use crate::batch::{BatchError, Operation};
use crate::config::{BatchConfig, Secrets};
use crate::content::NftId;
use crate::exchange::client::API_KEY_PATH;
use crate::exchange::{
    CounterfactualNftInfo, ExchangeClient, ExchangeResponse, ExchangeResult, Fee, MaxFee, MintRequest,
    NftBalanceEntry, OffchainRequestType, StorageId, TransferRequest, TransferToken,
};
use crate::resilience::RetryPolicy;
use crate::signing::fields::{parse_decimal_field, parse_field, to_hex, to_hex_padded};
use crate::signing::{NftDataInputs, NftMintInputs, NftTransferInputs, OperationKind, SignatureEngine};

/// Shared context established before the first item.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    /// Storage-id lease shared by every item (transfer).
    pub lease: Option<StorageId>,
    /// Recorded in the audit header.
    pub context: Option<Value>,
}

/// Result of `prepare`.
#[derive(Debug)]
pub enum Preparation<P> {
    /// Fee quoted; waiting for the batch-level approval.
    Ready { prepared: P, fee: Fee },
    /// The item cannot proceed; the batch continues.
    Failed(String),
}

/// Result of `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub outcome: ItemOutcome,
    /// Updated lease, when the flow uses one.
    pub lease: Option<StorageId>,
}

/// Drives one item through its lifecycle.
#[async_trait]
pub trait ItemFlow: Send + Sync {
    /// State carried from `prepare` to `complete`.
    type Prepared: Send;

    fn operation(&self) -> Operation;

    async fn bootstrap(&mut self) -> Result<Bootstrap, BatchError>;

    async fn prepare(
        &self,
        item: &BatchItem,
        lease: Option<StorageId>,
        trail: &mut ItemTrail,
    ) -> Result<Preparation<Self::Prepared>, BatchError>;

    async fn complete(
        &self,
        item: &BatchItem,
        prepared: Self::Prepared,
        fee: &Fee,
        trail: &mut ItemTrail,
    ) -> Result<Completion, BatchError>;
}

/// Run a read under `policy` and require a successful, non-null result.
async fn fetch<T, F, Fut>(policy: &RetryPolicy, call: &'static str, op: F) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExchangeResult<ExchangeResponse<T>>>,
{
    match policy.run(call, op).await {
        Ok(Some(response)) => {
            let status = response.status;
            let error = response.error.clone();
            response.into_success().ok_or_else(|| match error {
                Some(error) => format!("{} returned status {}: {}", call, status, error),
                None => format!("{} returned status {} without a result", call, status),
            })
        }
        Ok(None) => Err(format!("{} gave no result after retries", call)),
        Err(e) => Err(format!("{}: {}", call, e)),
    }
}

/// Resolve a recipient to `(account id, address)`.
async fn resolve_account(
    exchange: &dyn ExchangeClient,
    policy: &RetryPolicy,
    recipient: &Recipient,
) -> Result<(u64, String), String> {
    let (account_id, address) = match recipient {
        Recipient::Address(address) => {
            let info = fetch(policy, "account_by_owner", || exchange.account_by_owner(address)).await?;
            (info.account_id, address.clone())
        }
        Recipient::Ens(name) => {
            let resolved = fetch(policy, "resolve_ens", || exchange.resolve_ens(name)).await?;
            let address = resolved.data;
            if address.is_empty() {
                return Err(format!("{} does not resolve to an address", name));
            }
            let info = fetch(policy, "account_by_owner", || exchange.account_by_owner(&address)).await?;
            (info.account_id, address)
        }
        Recipient::AccountId(id) => {
            let id = *id;
            let info = fetch(policy, "account_by_id", || exchange.account_by_id(id)).await?;
            (id, info.owner)
        }
    };

    if account_id == 0 || address.is_empty() {
        return Err(format!("invalid account {} (address {:?})", account_id, address));
    }
    Ok((account_id, address))
}

/// Advance a transfer lease after a successful submission.
pub fn advance_lease(lease: StorageId) -> StorageId {
    let next = StorageId {
        order_id: lease.order_id,
        offchain_id: lease.offchain_id + 2,
    };
    // Fixed step, not re-queried from the exchange.
    tracing::debug!(
        from = lease.offchain_id,
        to = next.offchain_id,
        "Advancing storage id lease without re-query"
    );
    next
}

fn require_api_key(secrets: &Secrets) -> Result<String, BatchError> {
    secrets
        .api_key()
        .map(str::to_string)
        .ok_or_else(|| BatchError::Config("missing API key (LOOPRING_API_KEY)".to_string()))
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

/// Self-mint of counterfactual NFTs, one per CID.
pub struct MintFlow {
    exchange: Arc<dyn ExchangeClient>,
    engine: SignatureEngine,
    policy: RetryPolicy,
    api_key: String,
    exchange_address: String,
    exchange_field: U256,
    minter_address: String,
    minter_field: U256,
    account_id: u64,
    nft_type: u8,
    royalty_percentage: u8,
    fee_token_id: u32,
    nft_factory: String,
    nft_base_uri: String,
    valid_until: u64,
}

/// Mint state between fee quote and signing.
#[derive(Debug, Clone)]
pub struct MintPrepared {
    storage_id: StorageId,
    info: CounterfactualNftInfo,
    token_address: String,
    token_field: U256,
}

impl MintFlow {
    pub fn new(
        config: &BatchConfig,
        secrets: &Secrets,
        exchange: Arc<dyn ExchangeClient>,
        engine: SignatureEngine,
        valid_until: u64,
    ) -> Result<Self, BatchError> {
        let account_id = config
            .mint
            .account_id
            .ok_or_else(|| BatchError::Config("missing account id (ACCT_ID)".to_string()))?;

        Ok(Self {
            exchange,
            engine,
            policy: RetryPolicy::from_config(&config.retries),
            api_key: require_api_key(secrets)?,
            exchange_address: config.exchange.exchange_address.clone(),
            exchange_field: parse_field(&config.exchange.exchange_address)?,
            minter_address: config.mint.minter_address.clone(),
            minter_field: parse_field(&config.mint.minter_address)?,
            account_id,
            nft_type: config.mint.nft_type,
            royalty_percentage: config.mint.royalty_percentage,
            fee_token_id: config.mint.fee_token_id,
            nft_factory: config.exchange.nft_factory.clone(),
            nft_base_uri: config.mint.nft_base_uri.clone(),
            valid_until,
        })
    }
}

#[async_trait]
impl ItemFlow for MintFlow {
    type Prepared = MintPrepared;

    fn operation(&self) -> Operation {
        Operation::Mint
    }

    async fn bootstrap(&mut self) -> Result<Bootstrap, BatchError> {
        Ok(Bootstrap {
            lease: None,
            context: None,
        })
    }

    async fn prepare(
        &self,
        item: &BatchItem,
        _lease: Option<StorageId>,
        trail: &mut ItemTrail,
    ) -> Result<Preparation<MintPrepared>, BatchError> {
        let exchange = self.exchange.as_ref();
        let api_key = self.api_key.as_str();
        let account_id = self.account_id;
        let sell_token_id = self.fee_token_id as u64;

        let storage_id = fetch(&self.policy, "storage_id", || {
            exchange.next_storage_id(api_key, account_id, sell_token_id)
        })
        .await
        .map_err(BatchError::Sequencing)?;
        tracing::debug!(id = item.id, offchain_id = storage_id.offchain_id, "Storage id obtained");
        trail.storage_id = Some(storage_id);
        trail.advance(ItemStatus::Sequenced);

        let info = CounterfactualNftInfo {
            nft_owner: self.minter_address.clone(),
            nft_factory: self.nft_factory.clone(),
            nft_base_uri: self.nft_base_uri.clone(),
        };
        let token = fetch(&self.policy, "compute_token_address", || {
            exchange.compute_token_address(api_key, &info)
        })
        .await
        .map_err(BatchError::AddressResolution)?;
        let token_field = parse_field(&token.token_address)
            .map_err(|e| BatchError::AddressResolution(e.to_string()))?;
        tracing::debug!(id = item.id, token_address = %token.token_address, "Token address computed");
        trail.counterfactual_nft_info = Some(info.clone());
        trail.counterfactual_nft = Some(token.clone());
        trail.advance(ItemStatus::AddressResolved);

        let token_address = token.token_address;
        let off_chain_fee = fetch(&self.policy, "offchain_fee", || {
            exchange.offchain_fee(api_key, account_id, OffchainRequestType::NftMint, &token_address)
        })
        .await
        .map_err(BatchError::FeeQuote)?;
        let fee = off_chain_fee
            .fee_for(self.fee_token_id)
            .cloned()
            .ok_or_else(|| BatchError::FeeQuote(format!("no quote for fee token {}", self.fee_token_id)))?;
        trail.off_chain_fee = Some(off_chain_fee);
        trail.advance(ItemStatus::FeeQuoted);

        Ok(Preparation::Ready {
            prepared: MintPrepared {
                storage_id,
                info,
                token_address,
                token_field,
            },
            fee,
        })
    }

    async fn complete(
        &self,
        item: &BatchItem,
        prepared: MintPrepared,
        fee: &Fee,
        trail: &mut ItemTrail,
    ) -> Result<Completion, BatchError> {
        let Subject::Cid(cid) = &item.subject else {
            return Err(BatchError::Config(format!("mint item {} has no CID", item.id)));
        };

        let nft_id = NftId::from_cid(cid)?;
        trail.nft_id = Some(nft_id.to_hex());

        let data_inputs = NftDataInputs {
            minter_address: self.minter_field,
            nft_type: self.nft_type,
            token_address: prepared.token_field,
            nft_id,
            royalty_percentage: self.royalty_percentage,
        };
        let nft_data_hash = self.engine.hash(OperationKind::NftData, &data_inputs.to_fields())?;
        let nft_data = to_hex(&nft_data_hash);
        trail.nft_data_poseidon_hash = Some(nft_data.clone());

        let fee_amount = parse_decimal_field(&fee.fee)?;
        let mint_inputs = NftMintInputs {
            exchange: self.exchange_field,
            minter_account_id: self.account_id,
            to_account_id: self.account_id,
            nft_data_hash,
            amount: item.amount,
            fee_token_id: self.fee_token_id,
            fee_amount,
            valid_until: self.valid_until,
            storage_id: prepared.storage_id.offchain_id,
        };
        let signed = self.engine.build_and_sign(OperationKind::NftMint, &mint_inputs.to_fields())?;
        trail.nft_poseidon_hash = Some(to_hex(&signed.hash));
        trail.eddsa_signature = Some(signed.signature.0.clone());
        trail.advance(ItemStatus::Signed);

        let exchange = self.exchange.as_ref();
        match self.policy.run("nft_data", || exchange.nft_data(&nft_data)).await {
            Ok(Some(response)) => {
                trail.nft_data = Some(response_snapshot(&response));
                let exists = response.status == 200
                    && response.body.as_ref().map_or(false, |records| !records.is_empty());
                if exists {
                    tracing::info!(id = item.id, cid = %cid, "NFT already exists, skipping mint");
                    trail.advance(ItemStatus::DoneExists);
                    return Ok(Completion {
                        outcome: ItemOutcome::Exists,
                        lease: None,
                    });
                }
            }
            Ok(None) => {
                tracing::warn!(id = item.id, "Existence check gave no result, minting");
            }
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "Existence check failed, minting");
            }
        }

        let request = MintRequest {
            exchange: self.exchange_address.clone(),
            minter_id: self.account_id,
            minter_address: self.minter_address.clone(),
            to_account_id: self.account_id,
            to_address: self.minter_address.clone(),
            nft_type: self.nft_type,
            token_address: prepared.token_address,
            nft_id: nft_id.to_hex(),
            amount: item.amount.to_string(),
            valid_until: self.valid_until,
            royalty_percentage: self.royalty_percentage,
            storage_id: prepared.storage_id.offchain_id,
            max_fee: MaxFee {
                token_id: self.fee_token_id,
                amount: fee.fee.clone(),
            },
            force_to_mint: false,
            counter_factual_nft_info: prepared.info,
            eddsa_signature: signed.signature.0,
        };

        trail.advance(ItemStatus::Submitted);
        let api_key = self.api_key.as_str();
        let outcome = match self
            .policy
            .single_attempt()
            .run("mint_nft", || exchange.mint_nft(api_key, &request))
            .await
        {
            Ok(Some(response)) => {
                trail.nft_mint_response = Some(response_snapshot(&response));
                if response.is_success() {
                    ItemOutcome::Succeeded
                } else {
                    trail.error = Some(format!("mint rejected with status {}", response.status));
                    ItemOutcome::Failed
                }
            }
            Ok(None) => {
                trail.error = Some("mint submission timed out".to_string());
                ItemOutcome::Failed
            }
            Err(e) => {
                trail.error = Some(e.to_string());
                ItemOutcome::Failed
            }
        };
        trail.advance(outcome.status());

        Ok(Completion { outcome, lease: None })
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

struct TransferContext {
    from_account: u64,
    from_address: String,
    api_key: String,
    nft: NftBalanceEntry,
}

/// Transfer of one held NFT to many recipients.
pub struct TransferFlow {
    exchange: Arc<dyn ExchangeClient>,
    engine: SignatureEngine,
    policy: RetryPolicy,
    exchange_address: String,
    exchange_field: U256,
    from: String,
    nft_id: String,
    fee_token_id: u32,
    nft_factory: String,
    memo: String,
    valid_until: u64,
    test_mode: bool,
    context: Option<TransferContext>,
}

/// Transfer state between fee quote and signing.
#[derive(Debug, Clone)]
pub struct TransferPrepared {
    storage_id: StorageId,
    to_account: u64,
    to_address: String,
    to_field: U256,
    info: CounterfactualNftInfo,
}

impl TransferFlow {
    /// `nft_id` selects the NFT in the sender's balance; `test_mode` does
    /// everything but the submission.
    pub fn new(
        config: &BatchConfig,
        exchange: Arc<dyn ExchangeClient>,
        engine: SignatureEngine,
        nft_id: &str,
        test_mode: bool,
        valid_until: u64,
    ) -> Result<Self, BatchError> {
        if nft_id.trim().is_empty() {
            return Err(BatchError::Config("missing NFT id (--nft)".to_string()));
        }

        Ok(Self {
            exchange,
            engine,
            policy: RetryPolicy::from_config(&config.retries),
            exchange_address: config.exchange.exchange_address.clone(),
            exchange_field: parse_field(&config.exchange.exchange_address)?,
            from: config.transfer.from.clone(),
            nft_id: nft_id.trim().to_string(),
            fee_token_id: config.transfer.fee_token_id,
            nft_factory: config.exchange.nft_factory.clone(),
            memo: config.transfer.memo.clone(),
            valid_until,
            test_mode,
            context: None,
        })
    }

    fn context(&self) -> Result<&TransferContext, BatchError> {
        self.context
            .as_ref()
            .ok_or_else(|| BatchError::Bootstrap("transfer flow used before bootstrap".to_string()))
    }
}

#[async_trait]
impl ItemFlow for TransferFlow {
    type Prepared = TransferPrepared;

    fn operation(&self) -> Operation {
        Operation::Transfer
    }

    async fn bootstrap(&mut self) -> Result<Bootstrap, BatchError> {
        let sender = Recipient::parse(&self.from)
            .ok_or_else(|| BatchError::Config(format!("invalid sender {:?} (FROM)", self.from)))?;

        let exchange = self.exchange.as_ref();
        let policy = &self.policy;

        let (from_account, from_address) = resolve_account(exchange, policy, &sender)
            .await
            .map_err(BatchError::Bootstrap)?;
        tracing::info!(from_account, from_address = %from_address, "Sender resolved");

        let url = exchange.endpoint(API_KEY_PATH);
        let signature = self
            .engine
            .sign_api_request("GET", &url, &[("accountId", from_account.to_string())])?;
        let api_key = fetch(policy, "user_api_key", || exchange.user_api_key(from_account, &signature))
            .await
            .map_err(BatchError::Bootstrap)?
            .api_key;
        tracing::info!(from_account, "User API key obtained");

        let balance = fetch(policy, "nft_balance", || exchange.nft_balance(&api_key, from_account))
            .await
            .map_err(BatchError::Bootstrap)?;
        let nft = balance.find(&self.nft_id).cloned().ok_or_else(|| {
            BatchError::Bootstrap(format!(
                "NFT {} not found in balance of account {}",
                self.nft_id, from_account
            ))
        })?;
        tracing::info!(token_id = nft.token_id, nft_id = %nft.nft_id, "NFT selected");

        let token_id = nft.token_id;
        let lease = fetch(policy, "storage_id", || {
            exchange.next_storage_id(&api_key, from_account, token_id)
        })
        .await
        .map_err(BatchError::Sequencing)?;
        tracing::debug!(offchain_id = lease.offchain_id, "Storage id lease acquired");

        let context = json!({
            "from_account": from_account,
            "from_address": from_address,
            "nft_info": nft,
            "storage_id": lease,
            "test_mode": self.test_mode,
        });

        self.context = Some(TransferContext {
            from_account,
            from_address,
            api_key,
            nft,
        });

        Ok(Bootstrap {
            lease: Some(lease),
            context: Some(context),
        })
    }

    async fn prepare(
        &self,
        item: &BatchItem,
        lease: Option<StorageId>,
        trail: &mut ItemTrail,
    ) -> Result<Preparation<TransferPrepared>, BatchError> {
        let ctx = self.context()?;
        let Subject::To(to) = &item.subject else {
            return Err(BatchError::Config(format!("transfer item {} has no recipient", item.id)));
        };
        let Some(recipient) = Recipient::parse(to) else {
            return Ok(Preparation::Failed(format!("invalid recipient {:?}", to)));
        };

        let exchange = self.exchange.as_ref();
        let (to_account, to_address) = match resolve_account(exchange, &self.policy, &recipient).await {
            Ok(resolved) => resolved,
            Err(reason) => {
                tracing::warn!(id = item.id, to = %to, reason = %reason, "Recipient could not be resolved");
                return Ok(Preparation::Failed(reason));
            }
        };
        let to_field = match parse_field(&to_address) {
            Ok(field) => field,
            Err(e) => return Ok(Preparation::Failed(e.to_string())),
        };
        trail.to_account = Some(to_account);
        trail.to_address = Some(to_address.clone());

        let storage_id = lease.ok_or_else(|| BatchError::Sequencing("no storage id lease".to_string()))?;
        trail.storage_id = Some(storage_id);
        trail.advance(ItemStatus::Sequenced);

        let api_key = ctx.api_key.as_str();
        let info = CounterfactualNftInfo {
            nft_owner: ctx.from_address.clone(),
            nft_factory: self.nft_factory.clone(),
            nft_base_uri: String::new(),
        };
        let token = fetch(&self.policy, "compute_token_address", || {
            exchange.compute_token_address(api_key, &info)
        })
        .await
        .map_err(BatchError::AddressResolution)?;
        trail.counterfactual_nft_info = Some(info.clone());
        trail.counterfactual_nft = Some(token.clone());
        trail.advance(ItemStatus::AddressResolved);

        let from_account = ctx.from_account;
        let token_address = token.token_address.as_str();
        let off_chain_fee = fetch(&self.policy, "offchain_fee", || {
            exchange.offchain_fee(api_key, from_account, OffchainRequestType::NftTransfer, token_address)
        })
        .await
        .map_err(BatchError::FeeQuote)?;
        let fee = off_chain_fee
            .fee_for(self.fee_token_id)
            .cloned()
            .ok_or_else(|| BatchError::FeeQuote(format!("no quote for fee token {}", self.fee_token_id)))?;
        trail.off_chain_fee = Some(off_chain_fee);
        trail.advance(ItemStatus::FeeQuoted);

        Ok(Preparation::Ready {
            prepared: TransferPrepared {
                storage_id,
                to_account,
                to_address,
                to_field,
                info,
            },
            fee,
        })
    }

    async fn complete(
        &self,
        item: &BatchItem,
        prepared: TransferPrepared,
        fee: &Fee,
        trail: &mut ItemTrail,
    ) -> Result<Completion, BatchError> {
        let ctx = self.context()?;
        let fee_amount = parse_decimal_field(&fee.fee)?;

        let inputs = NftTransferInputs {
            exchange: self.exchange_field,
            from_account_id: ctx.from_account,
            to_account_id: prepared.to_account,
            token_id: ctx.nft.token_id,
            amount: item.amount,
            fee_token_id: self.fee_token_id,
            fee_amount,
            to_address: prepared.to_field,
            valid_until: self.valid_until,
            storage_id: prepared.storage_id.offchain_id,
        };
        let signed = self.engine.build_and_sign(OperationKind::NftTransfer, &inputs.to_fields())?;
        trail.nft_poseidon_hash = Some(to_hex_padded(&signed.hash));
        trail.eddsa_signature = Some(signed.signature.0.clone());
        trail.advance(ItemStatus::Signed);

        if self.test_mode {
            tracing::info!(id = item.id, to = %item.subject, "Test mode, transfer not submitted");
            trail.advance(ItemStatus::DoneSimulated);
            return Ok(Completion {
                outcome: ItemOutcome::Simulated,
                lease: Some(prepared.storage_id),
            });
        }

        let request = TransferRequest {
            exchange: self.exchange_address.clone(),
            from_account_id: ctx.from_account,
            from_address: ctx.from_address.clone(),
            to_account_id: prepared.to_account,
            to_address: prepared.to_address,
            token: TransferToken {
                token_id: ctx.nft.token_id,
                nft_data: ctx.nft.nft_data.clone(),
                amount: item.amount.to_string(),
            },
            max_fee: MaxFee {
                token_id: self.fee_token_id,
                amount: fee.fee.clone(),
            },
            storage_id: prepared.storage_id.offchain_id,
            valid_until: self.valid_until,
            eddsa_signature: signed.signature.0,
            memo: self.memo.clone(),
            counter_factual_nft_info: prepared.info,
        };

        trail.advance(ItemStatus::Submitted);
        let exchange = self.exchange.as_ref();
        let api_key = ctx.api_key.as_str();
        let result = self
            .policy
            .single_attempt()
            .run("transfer_nft", || exchange.transfer_nft(api_key, &request))
            .await;

        let succeeded = match result {
            Ok(Some(response)) => {
                trail.nft_transfer_response = Some(response_snapshot(&response));
                if !response.is_success() {
                    trail.error = Some(format!("transfer rejected with status {}", response.status));
                }
                response.is_success()
            }
            Ok(None) => {
                trail.error = Some("transfer submission timed out".to_string());
                false
            }
            Err(e) => {
                trail.error = Some(e.to_string());
                false
            }
        };

        if succeeded {
            trail.advance(ItemStatus::DoneSuccess);
            Ok(Completion {
                outcome: ItemOutcome::Succeeded,
                lease: Some(advance_lease(prepared.storage_id)),
            })
        } else {
            trail.advance(ItemStatus::DoneFailed);
            Ok(Completion {
                outcome: ItemOutcome::Failed,
                lease: Some(prepared.storage_id),
            })
        }
    }
}
