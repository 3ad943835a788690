//! Integration tests for the storage crate.

use rsm_storage::{SledStore, StorageConfig, Store};
use tempfile::TempDir;

fn create_test_store() -> (SledStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SledStore::open(temp_dir.path()).unwrap();
    (store, temp_dir)
}

#[tokio::test]
async fn sled_basic_operations() {
    let (store, _temp_dir) = create_test_store();

    let key = b"test_key";
    let value = vec![1, 2, 3, 4, 5];

    store.put(key, value.clone()).await.unwrap();
    assert_eq!(store.get(key).await.unwrap(), Some(value));
    assert!(store.contains(key).await.unwrap());

    store.remove(key).await.unwrap();
    assert!(!store.contains(key).await.unwrap());
    assert_eq!(store.get(key).await.unwrap(), None);

    // Removing an absent key is not an error
    store.remove(key).await.unwrap();
}

#[tokio::test]
async fn sled_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = SledStore::open(temp_dir.path()).unwrap();
        store.put(b"rsm_done", 7i32.to_be_bytes().to_vec()).await.unwrap();
    }

    let store = SledStore::open(temp_dir.path()).unwrap();
    assert_eq!(
        store.get(b"rsm_done").await.unwrap(),
        Some(7i32.to_be_bytes().to_vec())
    );
}

#[tokio::test]
async fn sled_open_with_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        path: temp_dir.path().to_path_buf(),
        cache_capacity: Some(1024 * 1024),
    };

    let store = SledStore::open_with_config(&config).unwrap();
    store.put(b"k", vec![42]).await.unwrap();
    store.flush().await.unwrap();
    assert_eq!(store.get(b"k").await.unwrap(), Some(vec![42]));
}

#[tokio::test]
async fn stores_agree_on_contract() {
    let (sled, _tmp) = create_test_store();
    let memory = rsm_storage::MemoryStore::new();
    let stores: Vec<Box<dyn Store>> = vec![Box::new(sled), Box::new(memory)];

    for store in &stores {
        store.put(b"a", vec![1]).await.unwrap();
        store.put(b"a", vec![2]).await.unwrap();
        assert_eq!(store.get(b"a").await.unwrap(), Some(vec![2]));
        store.remove(b"a").await.unwrap();
        assert_eq!(store.get(b"a").await.unwrap(), None);
    }
}
