// ABOUTME: Access-token lifecycle backed by a persisted credential file
// ABOUTME: Refreshes via refresh-token grant and persists token rotation immediately

use crate::model::non_empty_string;
use crate::storage::write_json;
use crate::util::truncate_str;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const DEFAULT_TOKEN_URL: &str = "https://api.workos.com/user_management/authenticate";

/// Tokens this close to expiry are treated as already expired.
pub const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Lifetime assumed when the token endpoint does not report `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Contents of the credential file.
///
/// `refresh_token` and `client_id` are required for a refresh. The access
/// token and its expiry are a cache that can always be regenerated. Keys this
/// type does not know about are carried through `extra` so a save never drops
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialState {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_expiry")]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialState {
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some()
    }
}

fn lenient_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty_string(deserializer)?.and_then(|raw| {
        let parsed = parse_expiry(&raw);
        if parsed.is_none() {
            warn!("Ignoring unparseable token_expiry {:?}", raw);
        }
        parsed
    }))
}

/// Accepts RFC 3339, or an offset-less timestamp read as local time.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoCredentials,
    HasRefreshTokenOnly,
    Valid,
    Expired,
}

pub struct TokenManager {
    path: PathBuf,
    credentials: CredentialState,
    token_url: String,
    client: Client,
}

impl TokenManager {
    pub fn new(path: impl Into<PathBuf>, credentials: CredentialState) -> Self {
        TokenManager {
            path: path.into(),
            credentials,
            token_url: DEFAULT_TOKEN_URL.into(),
            client: Client::new(),
        }
    }

    /// Reads the credential file. A missing or malformed file is logged and
    /// leaves the manager without credentials; later refreshes then fail.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let credentials = read_credentials(&path).unwrap_or_default();
        TokenManager::new(path, credentials)
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn credentials(&self) -> &CredentialState {
        &self.credentials
    }

    pub fn state(&self) -> TokenState {
        self.state_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if !self.is_expired_at(now) {
            TokenState::Valid
        } else if !self.credentials.can_refresh() {
            TokenState::NoCredentials
        } else if self.credentials.access_token.is_some() {
            TokenState::Expired
        } else {
            TokenState::HasRefreshTokenOnly
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.credentials.access_token, self.credentials.token_expiry) {
            (Some(_), Some(expiry)) => now >= expiry - Duration::minutes(EXPIRY_BUFFER_MINUTES),
            _ => true,
        }
    }

    /// Exchanges the refresh token for a new access token and saves the
    /// result. A rotated refresh token is written to disk before this returns.
    pub fn refresh(&mut self) -> Result<()> {
        info!("Obtaining new access token from refresh token");

        let refresh_token = self.credentials.refresh_token.clone().ok_or_else(|| {
            Error::Config(format!(
                "No refresh token available in {}",
                self.path.display()
            ))
        })?;
        let client_id = self.credentials.client_id.clone().ok_or_else(|| {
            Error::Config(format!("No client_id found in {}", self.path.display()))
        })?;

        let body = json!({
            "client_id": client_id,
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });

        let response = self.client.post(&self.token_url).json(&body).send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            debug!("Token endpoint response body: {}", truncate_str(&text, 500));
            return Err(Error::Auth(format!(
                "token refresh rejected with status {}: {}",
                status.as_u16(),
                truncate_str(&text, 100)
            )));
        }

        let text = response.text()?;
        let grant: Value = serde_json::from_str(&text)?;
        self.apply_grant(&grant, Utc::now())
    }

    fn apply_grant(&mut self, grant: &Value, now: DateTime<Utc>) -> Result<()> {
        // The previous refresh token is invalid once the server rotates it,
        // so the new one is kept whatever else the grant contains.
        let rotated = grant
            .get("refresh_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty());
        if let Some(rotated) = rotated {
            self.credentials.refresh_token = Some(rotated.to_string());
            info!("Refresh token was rotated");
        }

        let Some(access_token) = grant.get("access_token").and_then(Value::as_str) else {
            if rotated.is_some() {
                self.save()?;
            }
            return Err(Error::DataShape(
                "token response is missing access_token".into(),
            ));
        };

        let expires_in = grant
            .get("expires_in")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expiry = expiry_after(now, expires_in).or_else(|| {
            warn!(
                "Token lifetime of {} seconds is out of range, assuming {} seconds",
                expires_in, DEFAULT_EXPIRES_IN_SECS
            );
            expiry_after(now, DEFAULT_EXPIRES_IN_SECS)
        });
        let Some(token_expiry) = expiry else {
            if rotated.is_some() {
                self.save()?;
            }
            return Err(Error::DataShape(
                "cannot compute token expiry from the current time".into(),
            ));
        };

        self.credentials.access_token = Some(access_token.to_string());
        self.credentials.token_expiry = Some(token_expiry);

        self.save()?;
        info!("Successfully obtained access token (expires at {})", token_expiry);
        Ok(())
    }

    /// Returns a usable access token, refreshing first when needed. `None`
    /// means no token could be obtained for this run.
    pub fn get_valid_token(&mut self) -> Option<String> {
        if self.is_expired() {
            if let Err(e) = self.refresh() {
                error!("Failed to obtain access token: {}", e);
                return None;
            }
        }

        self.credentials.access_token.clone()
    }

    pub fn save(&self) -> Result<()> {
        write_json(&self.path, &self.credentials)?;
        debug!("Credentials saved to {}", self.path.display());
        Ok(())
    }
}

/// `None` when `now + secs` does not fit in a timestamp.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

fn read_credentials(path: &Path) -> Option<CredentialState> {
    if !path.exists() {
        error!(
            "Credential file {} does not exist. Create it with your refresh_token and client_id",
            path.display()
        );
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Error reading credentials from {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<CredentialState>(&content) {
        Ok(credentials) => {
            debug!("Credentials loaded from {}", path.display());
            Some(credentials)
        }
        Err(e) => {
            error!("Error parsing credentials from {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials(access: Option<&str>, expiry: Option<DateTime<Utc>>) -> CredentialState {
        CredentialState {
            refresh_token: Some("refresh-1".into()),
            client_id: Some("client_abc".into()),
            access_token: access.map(str::to_string),
            token_expiry: expiry,
            extra: Map::new(),
        }
    }

    fn manager(state: CredentialState) -> (TempDir, TokenManager) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        (temp, TokenManager::new(path, state))
    }

    #[test]
    fn test_is_expired_without_token_or_expiry() {
        let now = Utc::now();
        let (_t, m) = manager(credentials(None, Some(now + Duration::hours(1))));
        assert!(m.is_expired_at(now));

        let (_t, m) = manager(credentials(Some("tok"), None));
        assert!(m.is_expired_at(now));
    }

    #[test]
    fn test_is_expired_buffer() {
        let now = Utc::now();

        let (_t, m) = manager(credentials(Some("tok"), Some(now)));
        assert!(m.is_expired_at(now), "expiry == now is expired");

        let (_t, m) = manager(credentials(Some("tok"), Some(now + Duration::minutes(4))));
        assert!(m.is_expired_at(now), "inside the five minute buffer");

        let (_t, m) = manager(credentials(Some("tok"), Some(now + Duration::minutes(5))));
        assert!(m.is_expired_at(now), "buffer boundary counts as expired");

        let (_t, m) = manager(credentials(Some("tok"), Some(now + Duration::minutes(10))));
        assert!(!m.is_expired_at(now));
    }

    #[test]
    fn test_state_transitions() {
        let now = Utc::now();

        let (_t, m) = manager(CredentialState::default());
        assert_eq!(m.state_at(now), TokenState::NoCredentials);

        let (_t, m) = manager(credentials(None, None));
        assert_eq!(m.state_at(now), TokenState::HasRefreshTokenOnly);

        let (_t, m) = manager(credentials(Some("tok"), Some(now - Duration::hours(1))));
        assert_eq!(m.state_at(now), TokenState::Expired);

        let (_t, m) = manager(credentials(Some("tok"), Some(now + Duration::hours(1))));
        assert_eq!(m.state_at(now), TokenState::Valid);

        let mut missing_client = credentials(None, None);
        missing_client.client_id = None;
        let (_t, m) = manager(missing_client);
        assert_eq!(m.state_at(now), TokenState::NoCredentials);
    }

    #[test]
    fn test_refresh_requires_refresh_token_and_client_id() {
        let mut no_refresh = credentials(None, None);
        no_refresh.refresh_token = None;
        let (_t, mut m) = manager(no_refresh);
        assert!(matches!(m.refresh(), Err(Error::Config(_))));
        assert!(!m.path().exists(), "nothing is written on a config error");

        let mut no_client = credentials(None, None);
        no_client.client_id = None;
        let (_t, mut m) = manager(no_client);
        assert!(matches!(m.refresh(), Err(Error::Config(_))));
        assert!(m.get_valid_token().is_none());
    }

    #[test]
    fn test_apply_grant_rotates_and_persists() {
        let now = Utc::now();
        let (_t, mut m) = manager(credentials(None, None));

        m.apply_grant(
            &json!({"access_token": "access-2", "refresh_token": "refresh-2", "expires_in": 600}),
            now,
        )
        .unwrap();

        assert_eq!(m.credentials().refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(m.credentials().token_expiry, Some(now + Duration::seconds(600)));

        let reloaded = TokenManager::load(m.path());
        assert_eq!(reloaded.credentials().refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(reloaded.credentials().access_token.as_deref(), Some("access-2"));
    }

    #[test]
    fn test_apply_grant_defaults_expiry_and_keeps_refresh_token() {
        let now = Utc::now();
        let (_t, mut m) = manager(credentials(None, None));

        m.apply_grant(&json!({"access_token": "access-2"}), now).unwrap();

        assert_eq!(m.credentials().refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(
            m.credentials().token_expiry,
            Some(now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS))
        );
        assert_eq!(m.state_at(now), TokenState::Valid);
    }

    #[test]
    fn test_apply_grant_without_access_token_keeps_rotation() {
        let (_t, mut m) = manager(credentials(None, None));

        let err = m
            .apply_grant(&json!({"refresh_token": "refresh-2"}), Utc::now())
            .unwrap_err();

        assert!(matches!(err, Error::DataShape(_)));
        assert!(m.credentials().access_token.is_none());
        let reloaded = TokenManager::load(m.path());
        assert_eq!(reloaded.credentials().refresh_token.as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_apply_grant_out_of_range_expiry_keeps_rotation() {
        let now = Utc::now();
        let fallback = Some(now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));

        for expires_in in [json!(10_000_000_000_000i64), json!(i64::MAX), json!(1e300)] {
            let (_t, mut m) = manager(credentials(None, None));

            m.apply_grant(
                &json!({"access_token": "access-2", "refresh_token": "refresh-2", "expires_in": expires_in}),
                now,
            )
            .unwrap();

            assert_eq!(m.credentials().token_expiry, fallback);
            assert_eq!(m.state_at(now), TokenState::Valid);

            let reloaded = TokenManager::load(m.path());
            assert_eq!(reloaded.credentials().refresh_token.as_deref(), Some("refresh-2"));
            assert_eq!(reloaded.credentials().access_token.as_deref(), Some("access-2"));
            assert_eq!(reloaded.credentials().token_expiry, fallback);
        }
    }

    #[test]
    fn test_get_valid_token_uses_cached_token() {
        let expiry = Utc::now() + Duration::hours(1);
        let (_t, mut m) = manager(credentials(Some("cached"), Some(expiry)));
        assert_eq!(m.get_valid_token().as_deref(), Some("cached"));
    }
}
