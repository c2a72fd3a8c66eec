//! Classification service credentials.
//!
//! The credential payload is a Google credential JSON document, supplied
//! either as a file path or inline through an environment variable. Any
//! problem here is a startup error: the server refuses to run without it.

pub mod token;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{MaculaError, MaculaResult};

/// Environment variable holding a path to the credential file.
pub const CREDENTIALS_PATH_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable holding the credential JSON itself.
pub const CREDENTIALS_JSON_ENV: &str = "GOOGLE_CREDENTIALS";

/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A parsed credential document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    pub token_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub quota_project_id: Option<String>,
    pub token_uri: Option<String>,
}

/// Where the credentials were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Inline,
    File(PathBuf),
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "{} (inline JSON)", CREDENTIALS_JSON_ENV),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Credentials {
    /// Credential type as written in the JSON document.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(key) => key.quota_project_id.as_deref(),
        }
    }

    /// Service account email, or the OAuth client id for user credentials.
    pub fn principal(&self) -> &str {
        match self {
            Self::ServiceAccount(key) => &key.client_email,
            Self::AuthorizedUser(key) => &key.client_id,
        }
    }

    pub fn token_uri(&self) -> &str {
        let uri = match self {
            Self::ServiceAccount(key) => key.token_uri.as_deref(),
            Self::AuthorizedUser(key) => key.token_uri.as_deref(),
        };
        uri.unwrap_or(DEFAULT_TOKEN_URI)
    }

    fn validate(&self) -> MaculaResult<()> {
        match self {
            Self::ServiceAccount(key) => {
                if key.client_email.trim().is_empty() {
                    return Err(MaculaError::startup("credentials: client_email is empty"));
                }
                if !key.private_key.contains("PRIVATE KEY") {
                    return Err(MaculaError::startup(
                        "credentials: private_key is not a PEM-encoded key",
                    ));
                }
            }
            Self::AuthorizedUser(key) => {
                if key.client_id.trim().is_empty() || key.refresh_token.trim().is_empty() {
                    return Err(MaculaError::startup(
                        "credentials: client_id and refresh_token are required",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parse and validate a credential JSON document.
pub fn parse_credentials(json: &str) -> MaculaResult<Credentials> {
    let credentials: Credentials = serde_json::from_str(json)
        .map_err(|e| MaculaError::startup(format!("credentials are malformed: {}", e)))?;
    credentials.validate()?;
    Ok(credentials)
}

/// Read credentials from a file. Relative paths resolve against the working directory.
pub fn load_credentials_file(path: &Path) -> MaculaResult<Credentials> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MaculaError::startup(format!("cannot read credentials file {}: {}", path.display(), e))
    })?;
    parse_credentials(&content)
}

/// Pick the credential source. Inline JSON wins over a file path.
pub fn resolve_credentials(
    inline_json: Option<&str>,
    path: Option<&Path>,
) -> MaculaResult<(Credentials, CredentialSource)> {
    if let Some(json) = inline_json.filter(|j| !j.trim().is_empty()) {
        return Ok((parse_credentials(json)?, CredentialSource::Inline));
    }
    if let Some(path) = path {
        return Ok((load_credentials_file(path)?, CredentialSource::File(path.to_path_buf())));
    }
    Err(MaculaError::startup(format!(
        "no credentials configured: set {} or {}",
        CREDENTIALS_JSON_ENV, CREDENTIALS_PATH_ENV
    )))
}

/// Resolve credentials from the process environment.
pub fn credentials_from_env() -> MaculaResult<(Credentials, CredentialSource)> {
    let inline = std::env::var(CREDENTIALS_JSON_ENV).ok();
    let path = std::env::var(CREDENTIALS_PATH_ENV).ok().map(PathBuf::from);

    let (credentials, source) = resolve_credentials(inline.as_deref(), path.as_deref())?;
    info!(
        source = %source,
        kind = credentials.kind(),
        project = credentials.project_id().unwrap_or("-"),
        "Loaded classification credentials"
    );
    Ok((credentials, source))
}
