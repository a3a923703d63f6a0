//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use nft_batch::batch::{BatchItem, SourceEntry, Subject};
use nft_batch::config::{BatchConfig, Secrets};
use nft_batch::exchange::{
    AccountInfo, ApiKey, CounterfactualNft, CounterfactualNftInfo, EnsResolution, ExchangeClient,
    ExchangeResponse, ExchangeResult, Fee, MintRequest, NftBalance, NftBalanceEntry, OffchainFee,
    OffchainRequestType, StorageId, SubmissionReceipt, TransferRequest,
};
use nft_batch::signing::{EddsaSignature, KeccakFieldHasher, L2KeyPair, SignatureEngine};

pub const MINTER: &str = "0x2222222222222222222222222222222222222222";
pub const SENDER: &str = "0x3333333333333333333333333333333333333333";
pub const TOKEN_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const NFT_ID: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";
pub const SENDER_ACCOUNT: u64 = 10_001;

/// A request as seen by the programmable backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every connection carries one request; `f` maps it to `(status, body)`.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request);
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}

/// A syntactically valid CIDv0 derived from `seed`.
pub fn cid(seed: u8) -> String {
    let mut bytes = vec![0x12, 0x20];
    bytes.extend_from_slice(&[seed; 32]);
    bs58::encode(bytes).into_string()
}

pub fn mint_entries(ids: impl IntoIterator<Item = u64>) -> Vec<SourceEntry> {
    ids.into_iter()
        .map(|id| SourceEntry {
            item: BatchItem {
                id,
                subject: Subject::Cid(cid(id as u8)),
                amount: 1,
            },
            skip: None,
        })
        .collect()
}

pub fn transfer_entries(recipients: &[&str]) -> Vec<SourceEntry> {
    recipients
        .iter()
        .enumerate()
        .map(|(i, to)| SourceEntry {
            item: BatchItem {
                id: i as u64 + 1,
                subject: Subject::To(to.to_string()),
                amount: 1,
            },
            skip: None,
        })
        .collect()
}

pub fn test_config() -> BatchConfig {
    let mut config = BatchConfig::default();
    config.mint.minter_address = MINTER.to_string();
    config.mint.account_id = Some(12_345);
    config.transfer.from = SENDER.to_string();
    config.batch.valid_until = Some(1_900_000_000);
    config.retries.timeout_ms = 200;
    config
}

pub fn test_secrets() -> Secrets {
    Secrets::new(Some("test-api-key".to_string()), "0x1").unwrap()
}

pub fn test_engine() -> SignatureEngine {
    let signer = L2KeyPair::from_private_key("0x1").unwrap();
    SignatureEngine::new(Arc::new(KeccakFieldHasher), Arc::new(signer))
}

#[derive(Default)]
pub(crate) struct MockState {
    calls: HashMap<&'static str, usize>,
    minted: HashSet<String>,
    last_nft_data: Option<String>,
    mint_requests: Vec<MintRequest>,
    transfer_requests: Vec<TransferRequest>,
}

/// In-memory exchange with call counters and failure injection.
pub struct MockExchange {
    pub initial_storage_id: StorageId,
    pub fee: Fee,
    /// `next_storage_id` fails from this call number on (1-based).
    pub fail_storage_id_from: Option<usize>,
    /// `next_storage_id` never answers.
    pub hang_storage_id: bool,
    /// Transfers to these addresses are rejected.
    pub reject_transfers_to: HashSet<String>,
    /// Address → account id.
    pub accounts: HashMap<String, u64>,
    /// ENS name → address.
    pub ens: HashMap<String, String>,
    pub(crate) state: Mutex<MockState>,
}

impl Default for MockExchange {
    fn default() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(SENDER.to_string(), SENDER_ACCOUNT);
        Self {
            initial_storage_id: StorageId {
                order_id: 0,
                offchain_id: 1001,
            },
            fee: Fee {
                token: "LRC".to_string(),
                fee: "100".to_string(),
                discount: 0.8,
            },
            fail_storage_id_from: None,
            hang_storage_id: false,
            reject_transfers_to: HashSet::new(),
            accounts,
            ens: HashMap::new(),
            state: Mutex::new(MockState::default()),
        }
    }
}

impl MockExchange {
    pub fn with_account(mut self, address: &str, account_id: u64) -> Self {
        self.accounts.insert(address.to_string(), account_id);
        self
    }

    pub fn with_ens(mut self, name: &str, address: &str) -> Self {
        self.ens.insert(name.to_string(), address.to_string());
        self
    }

    pub fn calls(&self, call: &str) -> usize {
        self.state.lock().unwrap().calls.get(call).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> usize {
        self.calls("mint_nft") + self.calls("transfer_nft")
    }

    pub fn mint_requests(&self) -> Vec<MintRequest> {
        self.state.lock().unwrap().mint_requests.clone()
    }

    pub fn transfer_requests(&self) -> Vec<TransferRequest> {
        self.state.lock().unwrap().transfer_requests.clone()
    }

    fn count(&self, call: &'static str) -> usize {
        let mut state = self.state.lock().unwrap();
        let n = state.calls.entry(call).or_insert(0);
        *n += 1;
        *n
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn next_storage_id(
        &self,
        _api_key: &str,
        _account_id: u64,
        _sell_token_id: u64,
    ) -> ExchangeResult<ExchangeResponse<StorageId>> {
        let n = self.count("storage_id");
        if self.hang_storage_id {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail_storage_id_from.map_or(false, |from| n >= from) {
            return Ok(ExchangeResponse::failed(500, Some(json!({"message": "unavailable"}))));
        }
        Ok(ExchangeResponse::ok(
            200,
            StorageId {
                order_id: self.initial_storage_id.order_id,
                offchain_id: self.initial_storage_id.offchain_id + 2 * (n as u64 - 1),
            },
        ))
    }

    async fn compute_token_address(
        &self,
        _api_key: &str,
        _info: &CounterfactualNftInfo,
    ) -> ExchangeResult<ExchangeResponse<CounterfactualNft>> {
        self.count("compute_token_address");
        Ok(ExchangeResponse::ok(
            200,
            CounterfactualNft {
                token_address: TOKEN_ADDRESS.to_string(),
            },
        ))
    }

    async fn offchain_fee(
        &self,
        _api_key: &str,
        _account_id: u64,
        _request_type: OffchainRequestType,
        _token_address: &str,
    ) -> ExchangeResult<ExchangeResponse<OffchainFee>> {
        self.count("offchain_fee");
        let eth = Fee {
            token: "ETH".to_string(),
            fee: "7".to_string(),
            discount: 1.0,
        };
        Ok(ExchangeResponse::ok(
            200,
            OffchainFee {
                gas_price: "1".to_string(),
                fees: vec![eth, self.fee.clone()],
            },
        ))
    }

    async fn nft_data(&self, nft_datas: &str) -> ExchangeResult<ExchangeResponse<Vec<Value>>> {
        self.count("nft_data");
        let mut state = self.state.lock().unwrap();
        state.last_nft_data = Some(nft_datas.to_string());
        let records = if state.minted.contains(nft_datas) {
            vec![json!({"nftData": nft_datas})]
        } else {
            Vec::new()
        };
        Ok(ExchangeResponse::ok(200, records))
    }

    async fn mint_nft(
        &self,
        _api_key: &str,
        request: &MintRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>> {
        self.count("mint_nft");
        let mut state = self.state.lock().unwrap();
        state.mint_requests.push(request.clone());
        if let Some(nft_data) = state.last_nft_data.take() {
            state.minted.insert(nft_data);
        }
        Ok(ExchangeResponse::ok(200, receipt("processing")))
    }

    async fn user_api_key(
        &self,
        _account_id: u64,
        _signature: &EddsaSignature,
    ) -> ExchangeResult<ExchangeResponse<ApiKey>> {
        self.count("user_api_key");
        Ok(ExchangeResponse::ok(
            200,
            ApiKey {
                api_key: "derived-api-key".to_string(),
            },
        ))
    }

    async fn nft_balance(&self, _api_key: &str, _account_id: u64) -> ExchangeResult<ExchangeResponse<NftBalance>> {
        self.count("nft_balance");
        let entry: NftBalanceEntry = serde_json::from_value(json!({
            "tokenId": 32769,
            "nftId": NFT_ID,
            "nftData": "0x1234",
            "tokenAddress": TOKEN_ADDRESS,
        }))
        .unwrap();
        Ok(ExchangeResponse::ok(
            200,
            NftBalance {
                total_num: 1,
                data: vec![entry],
            },
        ))
    }

    async fn transfer_nft(
        &self,
        _api_key: &str,
        request: &TransferRequest,
    ) -> ExchangeResult<ExchangeResponse<SubmissionReceipt>> {
        self.count("transfer_nft");
        self.state.lock().unwrap().transfer_requests.push(request.clone());
        if self.reject_transfers_to.contains(&request.to_address) {
            return Ok(ExchangeResponse::failed(400, Some(json!({"code": 114002}))));
        }
        Ok(ExchangeResponse::ok(200, receipt("received")))
    }

    async fn account_by_owner(&self, owner: &str) -> ExchangeResult<ExchangeResponse<AccountInfo>> {
        self.count("account_by_owner");
        match self.accounts.get(owner) {
            Some(id) => Ok(ExchangeResponse::ok(200, account(*id, owner))),
            None => Ok(ExchangeResponse::failed(404, Some(json!({"message": "account not found"})))),
        }
    }

    async fn account_by_id(&self, account_id: u64) -> ExchangeResult<ExchangeResponse<AccountInfo>> {
        self.count("account_by_id");
        match self.accounts.iter().find(|(_, id)| **id == account_id) {
            Some((owner, id)) => Ok(ExchangeResponse::ok(200, account(*id, owner))),
            None => Ok(ExchangeResponse::failed(404, None)),
        }
    }

    async fn resolve_ens(&self, full_name: &str) -> ExchangeResult<ExchangeResponse<EnsResolution>> {
        self.count("resolve_ens");
        let data = self.ens.get(full_name).cloned().unwrap_or_default();
        Ok(ExchangeResponse::ok(200, EnsResolution { data }))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("http://mock.exchange{}", path)
    }
}

fn receipt(status: &str) -> SubmissionReceipt {
    serde_json::from_value(json!({"hash": "0xfeed", "status": status})).unwrap()
}

fn account(id: u64, owner: &str) -> AccountInfo {
    serde_json::from_value(json!({"accountId": id, "owner": owner})).unwrap()
}
