//! Tests for the AES protection transformer

use super::*;
use crate::test_util::{context_with_store, test_context};
use edgeflow_secrets::MemorySecretStore;
use std::collections::BTreeMap;

fn key_hex(seed: u8) -> String {
    hex::encode((0u8..64).map(|b| b.wrapping_add(seed)).collect::<Vec<_>>())
}

fn store_with_key(value: &str) -> MemorySecretStore {
    let store = MemorySecretStore::new();
    store.seed("aes", BTreeMap::from([("key".to_string(), value.to_string())]));
    store
}

fn decrypt(seed: u8, encoded: &[u8]) -> Vec<u8> {
    let sealed = STANDARD.decode(encoded).unwrap();
    let key = hex::decode(key_hex(seed)).unwrap();
    Aes256CbcHmacSha512::new(&key).unwrap().open(&sealed, &[]).unwrap()
}

async fn encrypt(ctx: &mut FunctionContext, input: Payload) -> TransformResult<Bytes> {
    match AesProtection::new("aes", "key").transform(ctx, Some(input)).await? {
        Outcome::Continue(Some(Payload::Bytes(b))) => Ok(b),
        other => panic!("expected bytes, got {other:?}"),
    }
}

#[tokio::test]
async fn test_encrypt_decrypts_with_same_key() {
    let mut ctx = context_with_store(store_with_key(&key_hex(0)));
    let out = encrypt(&mut ctx, Payload::from("hello edge")).await.unwrap();

    assert_eq!(decrypt(0, &out), b"hello edge");
    assert_eq!(ctx.response_content_type(), Some("text/plain"));
}

#[tokio::test]
async fn test_fresh_iv_per_message() {
    let mut ctx = context_with_store(store_with_key(&key_hex(0)));
    let first = encrypt(&mut ctx, Payload::from("same")).await.unwrap();
    let second = encrypt(&mut ctx, Payload::from("same")).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_key_rotation_applies_next_call() {
    let store = store_with_key(&key_hex(0));
    let mut ctx = context_with_store(store.clone());
    let before = encrypt(&mut ctx, Payload::from("rotate")).await.unwrap();
    assert_eq!(decrypt(0, &before), b"rotate");

    store.seed("aes", BTreeMap::from([("key".to_string(), key_hex(7))]));
    let after = encrypt(&mut ctx, Payload::from("rotate")).await.unwrap();
    assert_eq!(decrypt(7, &after), b"rotate");
}

#[tokio::test]
async fn test_missing_key_fails() {
    let mut ctx = test_context();
    let err = encrypt(&mut ctx, Payload::from("x")).await.unwrap_err();
    assert!(matches!(err, TransformError::Secret(_)));
}

#[tokio::test]
async fn test_empty_key_fails() {
    let mut ctx = context_with_store(store_with_key(""));
    let err = encrypt(&mut ctx, Payload::from("x")).await.unwrap_err();
    assert!(err.to_string().contains("is empty"));
}

#[tokio::test]
async fn test_bad_key_fails() {
    let mut ctx = context_with_store(store_with_key("not-hex"));
    assert!(encrypt(&mut ctx, Payload::from("x")).await.is_err());

    let mut ctx = context_with_store(store_with_key("abcd"));
    let err = encrypt(&mut ctx, Payload::from("x")).await.unwrap_err();
    assert!(err.to_string().contains("invalid key length 2"));
}

#[tokio::test]
async fn test_no_data() {
    let mut ctx = test_context();
    let err = AesProtection::new("aes", "key")
        .transform(&mut ctx, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::NoData { .. }));
}

#[test]
fn test_factory_requires_secret_options() {
    let missing = FunctionConfig::new("encrypt_aes256").with_option("secret_path", "aes");
    assert!(EncryptionFactory.create(&missing).is_err());

    let config = FunctionConfig::new("encrypt_aes256")
        .with_option("secret_path", "aes")
        .with_option("secret_name", "key");
    assert_eq!(EncryptionFactory.create(&config).unwrap().name(), "encrypt_aes256");
}
