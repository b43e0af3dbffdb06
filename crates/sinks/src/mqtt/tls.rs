//! TLS transport for broker connections
//!
//! Custom trust material (a CA pool, a client certificate, or disabled
//! verification) produces a dedicated rustls config. Otherwise the client's
//! default configuration with native roots is used.

use std::sync::Arc;

use edgeflow_transform::{TransformError, TransformResult};
use rumqttc::tokio_rustls::rustls;
use rumqttc::{TlsConfiguration, Transport};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::credentials::ClientCredentials;

#[cfg(test)]
#[path = "tls_test.rs"]
mod tests;

/// Build the TLS transport for `credentials`
///
/// # Errors
/// `TransformError::Tls` when PEM material does not parse, or when a client
/// certificate is given with neither a CA nor `skip_verify`
pub fn tls_transport(credentials: &ClientCredentials, skip_verify: bool) -> TransformResult<Transport> {
    if !credentials.has_tls_material() && !skip_verify {
        return Ok(Transport::tls_with_default_config());
    }
    let config = client_config(credentials, skip_verify)?;
    Ok(Transport::tls_with_config(TlsConfiguration::Rustls(Arc::new(config))))
}

fn client_config(credentials: &ClientCredentials, skip_verify: bool) -> TransformResult<ClientConfig> {
    let roots = credentials.ca_cert.as_deref().map(parse_ca_pool).transpose()?;
    let identity = match (&credentials.client_cert, &credentials.client_key) {
        (Some(cert), Some(key)) => Some(parse_client_identity(cert, key)?),
        (None, None) => None,
        _ => {
            return Err(TransformError::tls(
                "client certificate and key must be provided together",
            ));
        }
    };

    let builder = ClientConfig::builder();
    let builder = if skip_verify {
        tracing::warn!("mqtt server certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
    } else {
        let roots = roots.ok_or_else(|| {
            TransformError::tls("a client certificate requires 'cacert' or skip_verify")
        })?;
        builder.with_root_certificates(roots)
    };

    match identity {
        Some((chain, key)) => builder
            .with_client_auth_cert(chain, key)
            .map_err(|e| TransformError::tls(format!("invalid client certificate: {e}"))),
        None => Ok(builder.with_no_client_auth()),
    }
}

/// Parse every certificate in a PEM bundle into a trust pool
pub fn parse_ca_pool(pem: &str) -> TransformResult<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_bytes()) {
        let cert = cert.map_err(|e| TransformError::tls(format!("invalid cacert PEM: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| TransformError::tls(format!("invalid cacert: {e}")))?;
    }
    if roots.is_empty() {
        return Err(TransformError::tls("no certificates found in cacert"));
    }
    Ok(roots)
}

/// Parse a PEM certificate chain and its private key
pub fn parse_client_identity(
    cert_pem: &str,
    key_pem: &str,
) -> TransformResult<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let chain = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransformError::tls(format!("invalid clientcert PEM: {e}")))?;
    if chain.is_empty() {
        return Err(TransformError::tls("no certificates found in clientcert"));
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(|e| TransformError::tls(format!("invalid clientkey PEM: {e}")))?
        .ok_or_else(|| TransformError::tls("no private key found in clientkey"))?;

    Ok((chain, key))
}

/// Accepts any server certificate
#[derive(Debug)]
struct SkipServerVerification;

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
        ]
    }
}
