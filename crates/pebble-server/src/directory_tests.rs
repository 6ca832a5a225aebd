use std::sync::Arc;

use pebble_crypto::Address;
use pebble_crypto::test_utils::TestSigner;

use super::{DeviceDirectory, DirectoryError, device_address};
use crate::oracle::{InMemoryOracle, OracleError, TokenId};
use crate::storage::{DeviceStatus, NewDevice, PebbleDatabase};

const DEVICE_ID: &str = "did:io:0x00000000000000000000000000000000000000d1";

struct Fixture {
    db: PebbleDatabase,
    oracle: Arc<InMemoryOracle>,
    directory: DeviceDirectory,
}

async fn fixture() -> Fixture {
    let db = PebbleDatabase::open_in_memory().await.unwrap();
    let oracle = Arc::new(InMemoryOracle::new());
    let directory = DeviceDirectory::new(db.clone(), oracle.clone());
    Fixture {
        db,
        oracle,
        directory,
    }
}

async fn register_on_chain(oracle: &InMemoryOracle, owner: Address) {
    oracle
        .register(device_address(DEVICE_ID).unwrap(), TokenId::from(1), owner)
        .await;
}

async fn store_device(db: &PebbleDatabase, owner: Address) {
    db.upsert_device(&NewDevice {
        id: DEVICE_ID.to_string(),
        owner: owner.to_string(),
        address: device_address(DEVICE_ID).unwrap().to_string(),
        status: DeviceStatus::Confirmed,
        proposer: owner.to_string(),
    })
    .await
    .unwrap();
}

#[test]
fn device_address_strips_did_prefix() {
    let addr = device_address(DEVICE_ID).unwrap();
    let mut expected = [0u8; 20];
    expected[19] = 0xd1;
    assert_eq!(addr, Address::new(expected));
    assert_eq!(device_address("0xd1").unwrap(), addr);
    assert_eq!(device_address("d1").unwrap(), addr);
}

#[test]
fn non_hex_device_id_is_invalid() {
    assert!(matches!(
        device_address("did:io:pebble-7"),
        Err(DirectoryError::InvalidDeviceId { .. })
    ));
}

#[tokio::test]
async fn known_device_with_matching_owner_resolves_without_oracle() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    store_device(&f.db, owner).await;

    let device = f.directory.resolve(DEVICE_ID, &owner).await.unwrap();
    assert_eq!(device.owner, owner.to_string());
    assert_eq!(f.oracle.calls(), 0);
}

#[tokio::test]
async fn known_device_with_other_signer_is_denied() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    let intruder = TestSigner::new("intruder").address();
    store_device(&f.db, owner).await;

    assert!(matches!(
        f.directory.resolve(DEVICE_ID, &intruder).await,
        Err(DirectoryError::PermissionDenied { .. })
    ));
    assert!(matches!(
        f.directory.authorize(DEVICE_ID, &intruder).await,
        Err(DirectoryError::PermissionDenied { .. })
    ));
    assert_eq!(f.oracle.calls(), 0);
}

#[tokio::test]
async fn unknown_device_on_read_path_is_not_found() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    register_on_chain(&f.oracle, owner).await;

    assert!(matches!(
        f.directory.authorize(DEVICE_ID, &owner).await,
        Err(DirectoryError::NotFound(_))
    ));
    assert_eq!(f.oracle.calls(), 0);
    assert!(f.db.get_device(DEVICE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_device_is_bootstrapped_from_chain() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    register_on_chain(&f.oracle, owner).await;

    let device = f.directory.resolve(DEVICE_ID, &owner).await.unwrap();
    assert_eq!(device.owner, owner.to_string());
    assert_eq!(device.proposer, owner.to_string());
    assert_eq!(device.status(), Some(DeviceStatus::Confirmed));
    assert_eq!(device.address, device_address(DEVICE_ID).unwrap().to_string());
    assert_eq!(f.oracle.calls(), 2);

    // Second contact is served locally.
    f.directory.resolve(DEVICE_ID, &owner).await.unwrap();
    assert_eq!(f.oracle.calls(), 2);
}

#[tokio::test]
async fn bootstrap_by_non_holder_is_denied_and_not_stored() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    let intruder = TestSigner::new("intruder").address();
    register_on_chain(&f.oracle, owner).await;

    assert!(matches!(
        f.directory.resolve(DEVICE_ID, &intruder).await,
        Err(DirectoryError::PermissionDenied { .. })
    ));
    assert!(f.db.get_device(DEVICE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn oracle_failures_propagate() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();

    // Not registered on chain.
    assert!(matches!(
        f.directory.resolve(DEVICE_ID, &owner).await,
        Err(DirectoryError::Oracle(OracleError::Data(_)))
    ));

    register_on_chain(&f.oracle, owner).await;
    f.oracle.set_unavailable(true);
    assert!(matches!(
        f.directory.resolve(DEVICE_ID, &owner).await,
        Err(DirectoryError::Oracle(OracleError::Unavailable(_)))
    ));
    assert!(f.db.get_device(DEVICE_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_first_contact_leaves_one_row() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    register_on_chain(&f.oracle, owner).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let directory = f.directory.clone();
        handles.push(tokio::spawn(async move {
            directory.resolve(DEVICE_ID, &owner).await
        }));
    }
    for handle in handles {
        let device = handle.await.unwrap().unwrap();
        assert_eq!(device.owner, owner.to_string());
    }

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM devices")
        .fetch_one(f.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn later_chain_transfer_does_not_change_stored_owner() {
    let f = fixture().await;
    let owner = TestSigner::new("owner").address();
    let buyer = TestSigner::new("buyer").address();
    register_on_chain(&f.oracle, owner).await;
    f.directory.resolve(DEVICE_ID, &owner).await.unwrap();

    f.oracle.transfer(TokenId::from(1), buyer).await;
    assert!(matches!(
        f.directory.resolve(DEVICE_ID, &buyer).await,
        Err(DirectoryError::PermissionDenied { .. })
    ));
}
