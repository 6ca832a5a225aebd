use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use pebble_core::config::ChainConfig;
use pebble_crypto::{Address, keccak256};
use serde_json::{Value, json};

use super::rpc::{address_word, encode_call, first_word};
use super::{OracleError, OwnershipOracle, RpcOwnershipOracle, TokenId};

type Responder = Arc<dyn Fn(&Value) -> (StatusCode, Value) + Send + Sync>;

const IOID: &str = "0x1111111111111111111111111111111111111111";
const REGISTRY: &str = "0x2222222222222222222222222222222222222222";

/// Serve `responder` as a JSON-RPC node on a random local port.
async fn spawn_node(responder: Responder) -> String {
    let app = Router::new()
        .route(
            "/",
            post(
                |State(responder): State<Responder>, Json(body): Json<Value>| async move {
                    let (status, value) = responder(&body);
                    (status, Json(value))
                },
            ),
        )
        .with_state(responder);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn chain_config(endpoint: String) -> ChainConfig {
    ChainConfig {
        rpc_endpoint: endpoint,
        ioid_contract: Some(IOID.to_string()),
        ioid_registry_contract: Some(REGISTRY.to_string()),
        request_timeout_secs: 5,
    }
}

fn word_result(word: [u8; 32]) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": format!("0x{}", hex::encode(word))})
}

fn selector_hex(signature: &str) -> String {
    hex::encode(&keccak256(signature.as_bytes())[..4])
}

#[test]
fn call_data_is_selector_plus_word() {
    let device: Address = "0x00000000000000000000000000000000000000ab".parse().unwrap();
    let data = encode_call("deviceTokenId(address)", address_word(&device));
    assert_eq!(data.len(), 36);
    assert_eq!(hex::encode(&data[..4]), selector_hex("deviceTokenId(address)"));
    assert_eq!(data[35], 0xab);
    assert!(data[4..35].iter().all(|b| *b == 0));
}

#[test]
fn short_output_is_data_error() {
    assert!(matches!(first_word(&[0u8; 31]), Err(OracleError::Data(_))));
    assert!(first_word(&[0u8; 64]).is_ok());
}

#[test]
fn missing_contract_is_config_error() {
    let mut config = chain_config("http://127.0.0.1:1".into());
    config.ioid_contract = None;
    assert!(matches!(
        RpcOwnershipOracle::new(&config),
        Err(OracleError::Config(_))
    ));
}

#[test]
fn malformed_contract_is_config_error() {
    let mut config = chain_config("http://127.0.0.1:1".into());
    config.ioid_registry_contract = Some("registry".into());
    assert!(matches!(
        RpcOwnershipOracle::new(&config),
        Err(OracleError::Config(_))
    ));
}

#[tokio::test]
async fn token_for_device_calls_registry() {
    let endpoint = spawn_node(Arc::new(|body: &Value| {
        let call = &body["params"][0];
        assert_eq!(body["method"], "eth_call");
        assert_eq!(body["params"][1], "latest");
        assert_eq!(call["to"], REGISTRY);
        let data = call["data"].as_str().unwrap();
        assert!(data.starts_with(&format!("0x{}", selector_hex("deviceTokenId(address)"))));
        (StatusCode::OK, word_result(TokenId::from(42).0))
    }))
    .await;

    let oracle = RpcOwnershipOracle::new(&chain_config(endpoint)).unwrap();
    let token = oracle.token_for_device(Address::ZERO).await.unwrap();
    assert_eq!(token, TokenId::from(42));
}

#[tokio::test]
async fn owner_of_calls_token_contract() {
    let owner: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
    let endpoint = spawn_node(Arc::new(move |body: &Value| {
        let call = &body["params"][0];
        assert_eq!(call["to"], IOID);
        let data = call["data"].as_str().unwrap();
        assert_eq!(&data[2..10], selector_hex("ownerOf(uint256)"));
        assert!(data.ends_with("07"));
        (StatusCode::OK, word_result(address_word(&owner)))
    }))
    .await;

    let oracle = RpcOwnershipOracle::new(&chain_config(endpoint)).unwrap();
    assert_eq!(oracle.owner_of(TokenId::from(7)).await.unwrap(), owner);
}

#[tokio::test]
async fn unregistered_device_is_data_error() {
    let endpoint = spawn_node(Arc::new(|_: &Value| {
        (StatusCode::OK, word_result([0u8; 32]))
    }))
    .await;

    let oracle = RpcOwnershipOracle::new(&chain_config(endpoint)).unwrap();
    assert!(matches!(
        oracle.token_for_device(Address::ZERO).await,
        Err(OracleError::Data(_))
    ));
}

#[tokio::test]
async fn revert_is_data_error() {
    let endpoint = spawn_node(Arc::new(|_: &Value| {
        (
            StatusCode::OK,
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 3, "message": "execution reverted"}}),
        )
    }))
    .await;

    let oracle = RpcOwnershipOracle::new(&chain_config(endpoint)).unwrap();
    let err = oracle.owner_of(TokenId::from(1)).await.unwrap_err();
    assert!(matches!(err, OracleError::Data(_)));
    assert!(err.to_string().contains("execution reverted"));
}

#[tokio::test]
async fn server_error_status_is_unavailable() {
    let endpoint = spawn_node(Arc::new(|_: &Value| {
        (StatusCode::BAD_GATEWAY, json!({}))
    }))
    .await;

    let oracle = RpcOwnershipOracle::new(&chain_config(endpoint)).unwrap();
    assert!(matches!(
        oracle.owner_of(TokenId::from(1)).await,
        Err(OracleError::Unavailable(_))
    ));
}

#[tokio::test]
async fn unreachable_node_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let oracle = RpcOwnershipOracle::new(&chain_config(format!("http://{addr}"))).unwrap();
    assert!(matches!(
        oracle.token_for_device(Address::ZERO).await,
        Err(OracleError::Unavailable(_))
    ));
}
