//! Broker credentials from the secret store
//!
//! | Mode | Required keys | Optional |
//! |------|---------------|----------|
//! | `none` | | `cacert` |
//! | `usernamepassword` | `username`, `password` | `cacert` |
//! | `clientcert` | `clientcert`, `clientkey` | `cacert` |
//! | `cacert` | `cacert` | |

use std::fmt;

use edgeflow_secrets::{SecretProvider, Secrets, SecretsError};
use edgeflow_transform::TransformResult;

use super::config::AuthMode;

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;

pub const SECRET_USERNAME: &str = "username";
pub const SECRET_PASSWORD: &str = "password";
pub const SECRET_CLIENT_CERT: &str = "clientcert";
pub const SECRET_CLIENT_KEY: &str = "clientkey";
pub const SECRET_CA_CERT: &str = "cacert";

/// Credentials and TLS material for one client
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
    pub ca_cert: Option<String>,
}

impl ClientCredentials {
    pub fn has_tls_material(&self) -> bool {
        self.ca_cert.is_some() || self.client_cert.is_some()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_cert", &self.client_cert.is_some())
            .field("client_key", &self.client_key.as_ref().map(|_| "<redacted>"))
            .field("ca_cert", &self.ca_cert.is_some())
            .finish()
    }
}

/// Read the secrets `mode` needs from `secret_path`
///
/// # Errors
/// - `TransformError::Secret` when the path or a required key is missing
pub async fn load_credentials(
    provider: &dyn SecretProvider,
    mode: AuthMode,
    secret_path: &str,
) -> TransformResult<ClientCredentials> {
    let mut secrets = match mode {
        AuthMode::None if secret_path.is_empty() => return Ok(ClientCredentials::default()),
        AuthMode::None => match provider.get_secrets(secret_path, &[]).await {
            Ok(secrets) => secrets,
            Err(SecretsError::NotFound { .. }) => return Ok(ClientCredentials::default()),
            Err(e) => return Err(e.into()),
        },
        _ => provider.get_secrets(secret_path, &[]).await?,
    };

    let required: &[&str] = match mode {
        AuthMode::None => &[],
        AuthMode::UsernamePassword => &[SECRET_USERNAME, SECRET_PASSWORD],
        AuthMode::ClientCert => &[SECRET_CLIENT_CERT, SECRET_CLIENT_KEY],
        AuthMode::CaCert => &[SECRET_CA_CERT],
    };
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| secrets.get(*key).is_none_or(|v| v.is_empty()))
        .collect();
    if !missing.is_empty() {
        return Err(SecretsError::missing_keys(secret_path, &missing).into());
    }

    let mut take = |key: &str| take_non_empty(&mut secrets, key);
    let credentials = match mode {
        AuthMode::UsernamePassword => ClientCredentials {
            username: take(SECRET_USERNAME),
            password: take(SECRET_PASSWORD),
            ca_cert: take(SECRET_CA_CERT),
            ..Default::default()
        },
        AuthMode::ClientCert => ClientCredentials {
            client_cert: take(SECRET_CLIENT_CERT),
            client_key: take(SECRET_CLIENT_KEY),
            ca_cert: take(SECRET_CA_CERT),
            ..Default::default()
        },
        AuthMode::None | AuthMode::CaCert => ClientCredentials {
            ca_cert: take(SECRET_CA_CERT),
            ..Default::default()
        },
    };

    tracing::debug!(
        auth_mode = %mode,
        secret.path = secret_path,
        tls = credentials.has_tls_material(),
        "mqtt credentials loaded"
    );
    Ok(credentials)
}

fn take_non_empty(secrets: &mut Secrets, key: &str) -> Option<String> {
    secrets.remove(key).filter(|v| !v.is_empty())
}
