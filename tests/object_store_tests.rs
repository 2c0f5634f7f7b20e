use bytes::Bytes;
use sfx_share::object_store::{Folder, LocalStore, ObjectStore, ObjectStoreError};

const MP3: &str = "audio/mpeg";

#[tokio::test]
async fn test_local_store_put_get_nested_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let key = Folder::Store.key("abc123.mp3");
    let data = Bytes::from_static(b"ID3 fake clip");
    store.put(&key, data.clone(), MP3).await.unwrap();

    assert_eq!(store.get(&key).await.unwrap(), data);
    assert!(dir.path().join("store").join("abc123.mp3").is_file());
}

#[tokio::test]
async fn test_local_store_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    assert!(!store.exists("thumb/missing.png").await.unwrap());

    store
        .put("thumb/present.png", Bytes::from("data"), "image/png")
        .await
        .unwrap();
    assert!(store.exists("thumb/present.png").await.unwrap());
    // A folder is not an object
    assert!(!store.exists("thumb").await.unwrap());
}

#[tokio::test]
async fn test_local_store_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .put("avatars/u1.png", Bytes::from("data"), "image/png")
        .await
        .unwrap();
    store.delete("avatars/u1.png").await.unwrap();
    assert!(!store.exists("avatars/u1.png").await.unwrap());

    // Deleting a missing key is not an error
    store.delete("avatars/u1.png").await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.get("store/missing.mp3").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store.put("store/k.mp3", Bytes::from("first"), MP3).await.unwrap();
    store.put("store/k.mp3", Bytes::from("second"), MP3).await.unwrap();

    assert_eq!(store.get("store/k.mp3").await.unwrap(), Bytes::from("second"));
}

#[tokio::test]
async fn test_local_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    let store = LocalStore::new(&root).unwrap();

    for key in ["../outside.mp3", "store/../../outside.mp3", "/etc/passwd", "store//x", ""] {
        let result = store.put(key, Bytes::from("x"), MP3).await;
        assert!(
            matches!(result, Err(ObjectStoreError::InvalidKey(_))),
            "{key:?} should be rejected"
        );
    }
    assert!(!dir.path().join("outside.mp3").exists());
}
