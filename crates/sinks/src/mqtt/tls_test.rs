//! Tests for PEM parsing and TLS transport selection

use super::*;

const CERT: &str = include_str!("testdata/cert.pem");
const KEY: &str = include_str!("testdata/key.pem");

#[test]
fn test_parse_ca_pool() {
    let roots = parse_ca_pool(CERT).unwrap();
    assert_eq!(roots.len(), 1);
}

#[test]
fn test_parse_ca_pool_bundle() {
    let bundle = format!("{CERT}{CERT}");
    assert_eq!(parse_ca_pool(&bundle).unwrap().len(), 2);
}

#[test]
fn test_parse_ca_pool_rejects_garbage() {
    assert!(parse_ca_pool("").is_err());
    assert!(parse_ca_pool("not a certificate").is_err());
    assert!(parse_ca_pool(KEY).is_err());
}

#[test]
fn test_parse_client_identity() {
    let (chain, _key) = parse_client_identity(CERT, KEY).unwrap();
    assert_eq!(chain.len(), 1);
}

#[test]
fn test_parse_client_identity_errors() {
    assert!(parse_client_identity("", KEY).is_err());
    assert!(parse_client_identity(CERT, "").is_err());
    assert!(parse_client_identity(CERT, CERT).is_err());
}

#[test]
fn test_half_identity_is_rejected() {
    let credentials = ClientCredentials {
        client_cert: Some(CERT.into()),
        ..Default::default()
    };
    let err = tls_transport(&credentials, false).err().unwrap();
    assert!(err.to_string().contains("provided together"));
}

#[test]
fn test_bad_ca_is_fatal() {
    let credentials = ClientCredentials {
        ca_cert: Some("garbage".into()),
        ..Default::default()
    };
    assert!(tls_transport(&credentials, true).is_err());
}
