use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use crate::args::Args;
use tracing::{info, debug};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Cfg {
    pub audit: AuditConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuditConfig {
    // No audit spreadsheet means every audit append fails (and is suppressed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub actor: String,
    pub source: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CredentialsConfig {
    /// Service-account key files tried in order after the environment.
    pub files: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            sheet_name: "Audit_Log".to_string(),
            actor: "ASSISTANT".to_string(),
            source: "SYSTEM".to_string(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        let mut files = vec![
            "service-account.json".to_string(),
            "credentials.json".to_string(),
            "google-service-account.json".to_string(),
        ];
        if let Ok(home) = std::env::var("HOME") {
            files.push(format!("{}/.config/google-sheets/credentials.json", home));
        }
        Self { files }
    }
}

impl Cfg {
    pub fn load(args: &Args) -> Result<Self> {
        info!("Loading configuration from: {}", args.config);

        let mut cfg = Cfg::default();

        let mut builder = Config::builder();
        if std::path::Path::new(&args.config).exists() {
            builder = builder.add_source(File::with_name(&args.config).required(false));
        } else {
            debug!("Config file not found, using defaults");
        }
        let config = builder
            .add_source(
                Environment::with_prefix("SHEETS_CLI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        if let Ok(id) = config.get_string("audit.spreadsheet_id") {
            if !id.trim().is_empty() {
                cfg.audit.spreadsheet_id = Some(id);
            }
        }
        if let Ok(sheet_name) = config.get_string("audit.sheet_name") {
            cfg.audit.sheet_name = sheet_name;
        }
        if let Ok(actor) = config.get_string("audit.actor") {
            cfg.audit.actor = actor;
        }
        if let Ok(source) = config.get_string("audit.source") {
            cfg.audit.source = source;
        }
        if let Ok(files) = config.get_array("credentials.files") {
            let files: Result<Vec<String>, _> = files.into_iter().map(|v| v.into_string()).collect();
            cfg.credentials.files = files?;
        }

        // Command line wins
        if let Some(id) = &args.audit_spreadsheet {
            debug!("Overriding audit spreadsheet from command line");
            cfg.audit.spreadsheet_id = Some(id.clone());
        }

        debug!("Final configuration: {:?}", cfg);
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audit.sheet_name.trim().is_empty() {
            anyhow::bail!("audit.sheet_name cannot be empty");
        }
        if self.audit.actor.trim().is_empty() {
            anyhow::bail!("audit.actor cannot be empty");
        }
        if self.audit.spreadsheet_id.is_none() {
            info!("No audit spreadsheet configured; changes will not be audited");
        }
        Ok(())
    }
}
