use anyhow::{Context, Result};
use google_sheets4::{hyper, hyper_rustls, oauth2, Sheets};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::cfg::CredentialsConfig;
use crate::sheets::{GoogleSheets, SheetsHub};

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const INLINE_ENV: [&str; 2] = ["GOOGLE_SHEETS_CREDENTIALS_JSON", "GOOGLE_SERVICE_ACCOUNT_JSON"];
const KEY_FILE_ENV: [&str; 3] = [
    "GOOGLE_SERVICE_ACCOUNT_KEY",
    "GOOGLE_SHEETS_KEY_FILE",
    "GOOGLE_APPLICATION_CREDENTIALS",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    pub fn read_only() -> Self {
        Self::new([SHEETS_READONLY_SCOPE])
    }

    pub fn read_write() -> Self {
        Self::new([SHEETS_SCOPE])
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Inline { var: &'static str, json: String },
    File(PathBuf),
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Inline { var, .. } => write!(f, "env:{}", var),
            CredentialSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Inline JSON env first, then key-file env (only if the file exists), then the fallback files.
pub fn resolve_credentials(env: impl Fn(&str) -> Option<String>, files: &[String]) -> Option<CredentialSource> {
    for var in INLINE_ENV {
        if let Some(json) = env(var).filter(|v| !v.trim().is_empty()) {
            return Some(CredentialSource::Inline { var, json });
        }
    }

    for var in KEY_FILE_ENV {
        if let Some(path) = env(var) {
            if Path::new(&path).exists() {
                return Some(CredentialSource::File(PathBuf::from(path)));
            }
        }
    }

    files
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .map(CredentialSource::File)
}

async fn load_key(source: &CredentialSource) -> Result<oauth2::ServiceAccountKey> {
    match source {
        CredentialSource::Inline { var, json } => {
            oauth2::parse_service_account_key(json).with_context(|| format!("Invalid service account JSON in {}", var))
        }
        CredentialSource::File(path) => oauth2::read_service_account_key(path)
            .await
            .with_context(|| format!("Could not read service account key {}", path.display())),
    }
}

pub async fn create_sheets_hub(key: oauth2::ServiceAccountKey) -> Result<SheetsHub> {
    info!("Initializing Google Sheets authentication");

    let auth = oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .context("Failed to build service account authenticator")?;

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()?
        .https_or_http()
        .enable_http1()
        .build();
    let client = hyper::Client::builder().build::<_, hyper::Body>(https);

    Ok(Sheets::new(client, auth))
}

/// Builds one Sheets client per distinct scope set and hands out the same
/// client for repeated requests. Created once in `main`.
pub struct ClientFactory {
    credentials: CredentialsConfig,
    clients: Mutex<HashMap<ScopeSet, Arc<GoogleSheets>>>,
}

impl ClientFactory {
    pub fn new(credentials: CredentialsConfig) -> Self {
        Self {
            credentials,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, scopes: &ScopeSet) -> Option<Arc<GoogleSheets>> {
        let clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.get(scopes).cloned()
    }

    pub async fn sheets(&self, scopes: &ScopeSet) -> Result<Arc<GoogleSheets>> {
        if let Some(client) = self.cached(scopes) {
            debug!("Reusing Sheets client for {:?}", scopes);
            return Ok(client);
        }

        let source = resolve_credentials(|var| std::env::var(var).ok(), &self.credentials.files)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No Google Sheets credentials found. Set GOOGLE_SERVICE_ACCOUNT_KEY or \
                     GOOGLE_SHEETS_CREDENTIALS_JSON, or place credentials.json in the working directory."
                )
            })?;
        info!("Using credentials from {}", source);

        let key = load_key(&source).await?;
        let client = Arc::new(GoogleSheets::new(create_sheets_hub(key).await?, scopes.clone()));

        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let client = clients.entry(scopes.clone()).or_insert(client).clone();
        Ok(client)
    }
}
