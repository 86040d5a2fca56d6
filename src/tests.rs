//! Integration tests for the Contract Hub backend.
//!
//! Collaborators are replaced with in-process fakes so the tests exercise the
//! full HTTP surface, the lifecycle rules, and the flat-file store without
//! touching any external service.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::accounts::AccountRegistry;
use crate::clients::{
    sign_webhook_payload, AccountPage, AgreementSubmission, ConnectProfile, DocumentProvider,
    GeneratedDocument, ListedAccount, PageRenderer, PaymentProcessor, SignatureProvider,
};
use crate::config::Config;
use crate::contracts::ContractLifecycle;
use crate::errors::{AppError, UpstreamKind};
use crate::store::{AccountStore, ContractStore};
use crate::{create_router, AppState};

const WEBHOOK_SECRET: &str = "whsec_test";

/// Document provider fake: fixed doc id, real temp artifacts for export.
struct FakeDocuments {
    fail_create: AtomicBool,
    create_calls: AtomicU64,
    scratch: PathBuf,
    exported: Mutex<Vec<PathBuf>>,
}

impl FakeDocuments {
    fn new(scratch: PathBuf) -> Self {
        Self {
            fail_create: AtomicBool::new(false),
            create_calls: AtomicU64::new(0),
            scratch,
            exported: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentProvider for FakeDocuments {
    async fn create_document(
        &self,
        _source_url: &str,
        _participant_name: &str,
    ) -> Result<GeneratedDocument, AppError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_create.load(Ordering::Relaxed) {
            return Err(AppError::DocumentGeneration("conversion failed".into()));
        }
        Ok(GeneratedDocument {
            doc_id: "ABC".to_string(),
            doc_url: "https://docs.google.com/document/d/ABC/edit".to_string(),
        })
    }

    async fn export_pdf(&self, doc_id: &str) -> Result<PathBuf, AppError> {
        let path = self
            .scratch
            .join(format!("{}-{}.pdf", doc_id, uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"%PDF-1.4 fake").await.unwrap();
        self.exported.lock().await.push(path.clone());
        Ok(path)
    }
}

/// Signature provider fake with call counters and a failure switch.
struct FakeSignatures {
    fail_send: AtomicBool,
    send_calls: AtomicU64,
    get_calls: AtomicU64,
    /// Whether the artifact still existed when the provider saw it.
    artifact_present_at_send: AtomicBool,
}

impl FakeSignatures {
    fn new() -> Self {
        Self {
            fail_send: AtomicBool::new(false),
            send_calls: AtomicU64::new(0),
            get_calls: AtomicU64::new(0),
            artifact_present_at_send: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SignatureProvider for FakeSignatures {
    async fn send_for_signature(
        &self,
        pdf_path: &std::path::Path,
    ) -> Result<AgreementSubmission, AppError> {
        self.send_calls.fetch_add(1, Ordering::Relaxed);
        self.artifact_present_at_send
            .store(pdf_path.exists(), Ordering::Relaxed);
        if self.fail_send.load(Ordering::Relaxed) {
            return Err(AppError::Upstream {
                service: "signature",
                kind: UpstreamKind::Status,
                message: "agreement rejected".into(),
            });
        }
        Ok(AgreementSubmission {
            agreement_id: "agr-1".to_string(),
            provider: json!({
                "name": "Agreement to be signed",
                "agreement": { "status": "OUT_FOR_SIGNATURE" },
            }),
        })
    }

    async fn get_agreement(&self, agreement_id: &str) -> Result<Value, AppError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        Ok(json!({ "id": agreement_id, "status": "OUT_FOR_SIGNATURE" }))
    }
}

/// Payment processor fake backed by an in-memory account list.
struct FakePayments {
    accounts: Mutex<Vec<ListedAccount>>,
    fail_delete_ids: Mutex<Vec<String>>,
    delete_calls: AtomicU64,
    created: AtomicU64,
}

impl FakePayments {
    fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            fail_delete_ids: Mutex::new(Vec::new()),
            delete_calls: AtomicU64::new(0),
            created: AtomicU64::new(0),
        }
    }

    async fn seed_account(&self, id: &str, email: Option<&str>) {
        self.accounts.lock().await.push(ListedAccount {
            id: id.to_string(),
            email: email.map(|e| e.to_string()),
        });
    }
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    async fn create_connect_account(&self, profile: &ConnectProfile) -> Result<Value, AppError> {
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("acct_{}", n);
        self.seed_account(&id, Some(&profile.email)).await;
        Ok(json!({ "id": id, "email": profile.email }))
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> Result<Value, AppError> {
        Ok(json!({ "url": format!("https://connect.example.com/onboard/{}", account_id) }))
    }

    async fn create_login_link(&self, account_id: &str) -> Result<Value, AppError> {
        Ok(json!({ "url": format!("https://connect.example.com/login/{}", account_id) }))
    }

    async fn get_account(&self, account_id: &str) -> Result<Value, AppError> {
        Ok(json!({ "id": account_id, "charges_enabled": true }))
    }

    async fn get_balance(&self, _account_id: &str) -> Result<Value, AppError> {
        Ok(json!({ "available": [{ "amount": 1000, "currency": "usd" }] }))
    }

    async fn create_funding_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        _brand_account_id: &str,
        _metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        Ok(json!({
            "id": "pi_1",
            "client_secret": "pi_1_secret",
            "amount": amount,
            "currency": currency,
        }))
    }

    async fn create_influencer_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        _influencer_account_id: &str,
        _brand_account_id: &str,
        _metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        Ok(json!({
            "id": "pi_2",
            "client_secret": "pi_2_secret",
            "amount": amount,
            "currency": currency,
        }))
    }

    async fn create_payout(
        &self,
        amount: i64,
        currency: &str,
        _account_id: &str,
        _metadata: Option<&Value>,
    ) -> Result<Value, AppError> {
        Ok(json!({ "id": "po_1", "amount": amount, "currency": currency }))
    }

    async fn list_transfers(
        &self,
        _account_id: &str,
        _limit: u32,
        _starting_after: Option<&str>,
    ) -> Result<Value, AppError> {
        Ok(json!({ "data": [], "has_more": false }))
    }

    async fn list_accounts(
        &self,
        _limit: u32,
        _starting_after: Option<&str>,
    ) -> Result<AccountPage, AppError> {
        Ok(AccountPage {
            accounts: self.accounts.lock().await.clone(),
            has_more: false,
        })
    }

    async fn delete_account(&self, account_id: &str) -> Result<Value, AppError> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        if self
            .fail_delete_ids
            .lock()
            .await
            .iter()
            .any(|id| id == account_id)
        {
            return Err(AppError::Upstream {
                service: "payments",
                kind: UpstreamKind::Status,
                message: format!("cannot delete {}", account_id),
            });
        }
        self.accounts.lock().await.retain(|a| a.id != account_id);
        Ok(json!({ "id": account_id, "deleted": true }))
    }
}

struct FakeRenderer;

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render_page(&self, _url: &str, _token: &str) -> Result<PathBuf, AppError> {
        Ok(std::env::temp_dir().join("render-fake.pdf"))
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: reqwest::Client,
    base_url: String,
    contracts_path: PathBuf,
    accounts_path: PathBuf,
    documents: Arc<FakeDocuments>,
    signatures: Arc<FakeSignatures>,
    payments: Arc<FakePayments>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().to_path_buf();

        let config = Config {
            data_dir: data_dir.clone(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            payments_secret_key: "sk_test".to_string(),
            payments_api_base: "https://api.stripe.test".to_string(),
            payments_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            platform_fee_bps: 290,
            onboarding_refresh_url: "http://localhost:5173/settings/payments".to_string(),
            onboarding_return_url: "http://localhost:5173/settings/payments".to_string(),
            signature_integration_key: "key_test".to_string(),
            signature_api_base: "https://sign.test".to_string(),
            participant_signer_email: "participant@example.com".to_string(),
            countersigner_email: "contracts@example.com".to_string(),
            signature_webhook_url: None,
            documents_access_token: "token_test".to_string(),
            documents_folder_id: "folder_test".to_string(),
            documents_share_domain: None,
            document_anchor_text: "Accept changes".to_string(),
            render_service_url: "http://127.0.0.1:0/render".to_string(),
            operator_name: "ops".to_string(),
            upstream_timeout: Duration::from_secs(5),
            render_timeout: Duration::from_secs(5),
            cleanup_pace: Duration::from_millis(1),
            cleanup_page_size: 100,
        };

        let contract_store = ContractStore::new(config.contracts_path());
        contract_store.init().await.expect("Failed to init contracts");
        let account_store = AccountStore::new(config.accounts_path());
        account_store.init().await.expect("Failed to init accounts");

        let documents = Arc::new(FakeDocuments::new(data_dir.clone()));
        let signatures = Arc::new(FakeSignatures::new());
        let payments = Arc::new(FakePayments::new());

        let lifecycle = Arc::new(ContractLifecycle::new(
            contract_store,
            documents.clone(),
            signatures.clone(),
        ));
        let registry = Arc::new(AccountRegistry::new(
            account_store,
            payments.clone(),
            config.cleanup_pace,
            config.cleanup_page_size,
        ));

        let contracts_path = config.contracts_path();
        let accounts_path = config.accounts_path();

        let state = AppState {
            lifecycle,
            registry,
            payments: payments.clone(),
            renderer: Arc::new(FakeRenderer),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestFixture {
            client: reqwest::Client::new(),
            base_url,
            contracts_path,
            accounts_path,
            documents,
            signatures,
            payments,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn upload_contract(&self, participant_id: i64, name: &str) -> reqwest::Response {
        self.client
            .post(self.url("/upload-contract"))
            .json(&json!({
                "documentUrl": "https://files.example.com/doc.docx",
                "participantName": name,
                "participantId": participant_id,
            }))
            .send()
            .await
            .unwrap()
    }

    async fn update_contract(&self, participant_id: i64, status: &str) -> reqwest::Response {
        self.client
            .post(self.url("/update-contract"))
            .json(&json!({ "participantId": participant_id, "status": status }))
            .send()
            .await
            .unwrap()
    }

    async fn contracts_on_disk(&self) -> Value {
        let bytes = tokio::fs::read(&self.contracts_path).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn accounts_on_disk(&self) -> Value {
        let bytes = tokio::fs::read(&self.accounts_path).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_unknown_participant_is_null_without_provider_call() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/contracts?participantId=42"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "null");
    assert_eq!(fixture.signatures.get_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_upload_contract_then_lookup() {
    let fixture = TestFixture::new().await;

    let resp = fixture.upload_contract(42, "Jane").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["docUrl"], "https://docs.google.com/document/d/ABC/edit");
    assert!(body["message"].as_str().unwrap().contains("created"));

    let resp = fixture
        .client
        .get(fixture.url("/contracts?participantId=42"))
        .send()
        .await
        .unwrap();
    let contract: Value = resp.json().await.unwrap();
    assert_eq!(contract["status"], "pending_changes");
    assert_eq!(
        contract["docUrl"],
        "https://docs.google.com/document/d/ABC/edit"
    );
    // No agreement yet, and no provider call for one
    assert_eq!(contract["agreement"], Value::Null);
    assert_eq!(fixture.signatures.get_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_upload_contract_twice_keeps_single_record() {
    let fixture = TestFixture::new().await;

    assert_eq!(fixture.upload_contract(7, "Jane").await.status(), 200);
    assert_eq!(fixture.upload_contract(7, "Jane").await.status(), 200);

    let on_disk = fixture.contracts_on_disk().await;
    let contracts = on_disk["contracts"].as_array().unwrap();
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0]["participantId"], 7);
}

#[tokio::test]
async fn test_upload_contract_failure_creates_no_record() {
    let fixture = TestFixture::new().await;
    fixture.documents.fail_create.store(true, Ordering::Relaxed);

    let resp = fixture.upload_contract(7, "Jane").await;
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DOCUMENT_GENERATION_FAILED");

    let on_disk = fixture.contracts_on_disk().await;
    assert!(on_disk["contracts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_contract_walks_the_lifecycle() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;

    let resp = fixture
        .update_contract(7, "pending_fohr_to_initiate_signatures")
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.update_contract(7, "out_for_signature").await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.update_contract(7, "completed").await;
    assert_eq!(resp.status(), 200);

    let on_disk = fixture.contracts_on_disk().await;
    assert_eq!(on_disk["contracts"][0]["status"], "completed");
}

#[tokio::test]
async fn test_update_contract_rejects_illegal_transition() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;

    let resp = fixture.update_contract(7, "completed").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let on_disk = fixture.contracts_on_disk().await;
    assert_eq!(on_disk["contracts"][0]["status"], "pending_changes");
}

#[tokio::test]
async fn test_update_contract_rejects_unknown_status() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;

    let resp = fixture.update_contract(7, "shipped").await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_update_contract_unknown_participant_is_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .update_contract(99, "pending_fohr_to_initiate_signatures")
        .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let on_disk = fixture.contracts_on_disk().await;
    assert!(on_disk["contracts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_for_signature_happy_path() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;
    fixture
        .update_contract(7, "pending_fohr_to_initiate_signatures")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/upload-contract-for-signature"))
        .json(&json!({ "participantId": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "out_for_signature");
    assert_eq!(body["name"], "Agreement to be signed");

    // The provider saw a live artifact, which is gone now
    assert!(fixture
        .signatures
        .artifact_present_at_send
        .load(Ordering::Relaxed));
    let exported = fixture.documents.exported.lock().await;
    assert_eq!(exported.len(), 1);
    assert!(!exported[0].exists());

    let on_disk = fixture.contracts_on_disk().await;
    assert_eq!(on_disk["contracts"][0]["status"], "out_for_signature");
    assert_eq!(on_disk["contracts"][0]["agreementId"], "agr-1");
}

#[tokio::test]
async fn test_send_for_signature_failure_cleans_artifact_and_keeps_status() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;
    fixture
        .update_contract(7, "pending_fohr_to_initiate_signatures")
        .await;
    fixture.signatures.fail_send.store(true, Ordering::Relaxed);

    let resp = fixture
        .client
        .post(fixture.url("/upload-contract-for-signature"))
        .json(&json!({ "participantId": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    // Artifact deleted despite the failure; record untouched
    let exported = fixture.documents.exported.lock().await;
    assert_eq!(exported.len(), 1);
    assert!(!exported[0].exists());

    let on_disk = fixture.contracts_on_disk().await;
    assert_eq!(
        on_disk["contracts"][0]["status"],
        "pending_fohr_to_initiate_signatures"
    );
    assert_eq!(on_disk["contracts"][0]["agreementId"], Value::Null);
}

#[tokio::test]
async fn test_send_for_signature_unknown_participant_is_not_found() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/upload-contract-for-signature"))
        .json(&json!({ "participantId": 99 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(fixture.signatures.send_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_lookup_after_send_merges_live_agreement() {
    let fixture = TestFixture::new().await;
    fixture.upload_contract(7, "Jane").await;
    fixture
        .update_contract(7, "pending_fohr_to_initiate_signatures")
        .await;
    fixture
        .client
        .post(fixture.url("/upload-contract-for-signature"))
        .json(&json!({ "participantId": 7 }))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/contracts?participantId=7"))
        .send()
        .await
        .unwrap();
    let contract: Value = resp.json().await.unwrap();
    assert_eq!(contract["agreement"]["id"], "agr-1");
    assert_eq!(fixture.signatures.get_calls.load(Ordering::Relaxed), 1);

    // Read-through enrichment is not persisted
    let on_disk = fixture.contracts_on_disk().await;
    assert_eq!(on_disk["contracts"][0].get("agreement"), None);
}

#[tokio::test]
async fn test_adobe_webhook_echoes_client_id() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/adobe-webhook"))
        .header("x-adobesign-clientid", "client-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("X-AdobeSign-ClientId").unwrap(),
        "client-123"
    );

    let resp = fixture
        .client
        .post(fixture.url("/adobe-webhook"))
        .header("x-adobesign-clientid", "client-123")
        .json(&json!({ "event": "AGREEMENT_WORKFLOW_COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("X-AdobeSign-ClientId").unwrap(),
        "client-123"
    );
}

#[tokio::test]
async fn test_export_to_pdf_is_fire_and_forget() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/export-to-pdf"))
        .json(&json!({ "url": "http://localhost:5173/report", "token": "tok" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
}

#[tokio::test]
async fn test_payments_webhook_accepts_valid_signature() {
    let fixture = TestFixture::new().await;

    let payload = br#"{"type":"account.updated","data":{"object":{"id":"acct_1"}}}"#;
    let header = sign_webhook_payload(payload, "1700000000", WEBHOOK_SECRET);

    let resp = fixture
        .client
        .post(fixture.url("/stripe/webhook"))
        .header("stripe-signature", header)
        .body(payload.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn test_payments_webhook_rejects_bad_signature() {
    let fixture = TestFixture::new().await;

    let payload = br#"{"type":"account.updated"}"#;
    let header = sign_webhook_payload(payload, "1700000000", "whsec_wrong");

    let resp = fixture
        .client
        .post(fixture.url("/stripe/webhook"))
        .header("stripe-signature", header)
        .body(payload.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .post(fixture.url("/stripe/webhook"))
        .body(payload.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_create_account_links_creator_record() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/stripe/create-account"))
        .json(&json!({ "email": "jane@example.com", "name": "Jane" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["accountId"], "acct_1");
    assert_eq!(body["url"], "https://connect.example.com/onboard/acct_1");

    let on_disk = fixture.accounts_on_disk().await;
    let creators = on_disk["creators"].as_array().unwrap();
    assert_eq!(creators.len(), 1);
    assert_eq!(creators[0]["email"], "jane@example.com");
    assert_eq!(creators[0]["accountId"], "acct_1");
    assert_eq!(creators[0]["disconnectedBy"], Value::Null);
    assert_eq!(creators[0]["disconnectedOn"], Value::Null);
}

#[tokio::test]
async fn test_delete_account_unlinks_local_record() {
    let fixture = TestFixture::new().await;

    fixture
        .client
        .post(fixture.url("/stripe/create-account"))
        .json(&json!({ "email": "jane@example.com", "name": "Jane" }))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .delete(fixture.url("/stripe/account/acct_1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let on_disk = fixture.accounts_on_disk().await;
    let creator = &on_disk["creators"][0];
    assert_eq!(creator["accountId"], Value::Null);
    assert_eq!(creator["disconnectedBy"], "ops");
    assert!(creator["disconnectedOn"].as_str().is_some());
}

#[tokio::test]
async fn test_cleanup_by_domain_requires_confirmation() {
    let fixture = TestFixture::new().await;
    fixture
        .payments
        .seed_account("acct_x", Some("a@test.com"))
        .await;

    let resp = fixture
        .client
        .delete(fixture.url("/stripe/cleanup/by-domain"))
        .json(&json!({ "domain": "@test.com", "confirm": "YES_PLEASE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(fixture.payments.delete_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_cleanup_by_domain_deletes_only_matching_accounts() {
    let fixture = TestFixture::new().await;
    fixture
        .payments
        .seed_account("acct_a", Some("a@test.com"))
        .await;
    fixture
        .payments
        .seed_account("acct_b", Some("b@keep.com"))
        .await;
    fixture.payments.seed_account("acct_c", None).await;

    let resp = fixture
        .client
        .delete(fixture.url("/stripe/cleanup/by-domain"))
        .json(&json!({ "domain": "@test.com", "confirm": "DELETE_BY_DOMAIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let deleted = body["results"]["deleted"].as_array().unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["accountId"], "acct_a");
    assert_eq!(fixture.payments.delete_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_cleanup_all_accumulates_partial_failures() {
    let fixture = TestFixture::new().await;
    fixture
        .payments
        .seed_account("acct_a", Some("a@test.com"))
        .await;
    fixture
        .payments
        .seed_account("acct_b", Some("b@test.com"))
        .await;
    fixture
        .payments
        .seed_account("acct_c", Some("c@test.com"))
        .await;
    fixture
        .payments
        .fail_delete_ids
        .lock()
        .await
        .push("acct_b".to_string());

    let resp = fixture
        .client
        .delete(fixture.url("/stripe/cleanup/all"))
        .json(&json!({ "confirm": "DELETE_ALL_ACCOUNTS" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"]["deleted"].as_array().unwrap().len(), 2);
    let failed = body["results"]["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["accountId"], "acct_b");
}

#[tokio::test]
async fn test_cleanup_all_unlinks_deleted_local_records() {
    let fixture = TestFixture::new().await;

    fixture
        .client
        .post(fixture.url("/stripe/create-account"))
        .json(&json!({ "email": "jane@test.com", "name": "Jane" }))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .delete(fixture.url("/stripe/cleanup/all"))
        .json(&json!({ "confirm": "DELETE_ALL_ACCOUNTS" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let on_disk = fixture.accounts_on_disk().await;
    let creator = &on_disk["creators"][0];
    assert_eq!(creator["accountId"], Value::Null);
    assert_eq!(creator["disconnectedBy"], "ops");
}

#[tokio::test]
async fn test_get_account_returns_audit_pair_when_disconnected() {
    let fixture = TestFixture::new().await;

    fixture
        .client
        .post(fixture.url("/stripe/create-account"))
        .json(&json!({ "email": "jane@example.com", "name": "Jane" }))
        .send()
        .await
        .unwrap();
    fixture
        .client
        .delete(fixture.url("/stripe/account/acct_1"))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/stripe/account?email=jane@example.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["account"]["disconnectedBy"], "ops");
    assert!(body["account"].get("id").is_none());
}

#[tokio::test]
async fn test_funding_payment_returns_client_secret() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/stripe/create-funding-payment"))
        .json(&json!({
            "amount": 5000,
            "currency": "usd",
            "brandAccountId": "acct_brand",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["clientSecret"], "pi_1_secret");
    assert_eq!(body["paymentIntentId"], "pi_1");
}
