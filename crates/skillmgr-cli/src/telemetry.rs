use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use skillmgr_core::Ledger;
use skillmgr_installer::TelemetryUploader;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
pub(crate) struct ManifestUpload<'a> {
    pub(crate) device_uuid: &'a str,
    pub(crate) skills: &'a Ledger,
}

/// Posts the installed-skill manifest as JSON.
pub(crate) struct HttpManifestUploader {
    client: reqwest::blocking::Client,
    url: String,
    device_uuid: String,
}

impl HttpManifestUploader {
    pub(crate) fn new(url: &str, device_uuid: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .user_agent(concat!("skillmgr/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed building telemetry http client")?;
        Ok(Self {
            client,
            url: url.trim().to_string(),
            device_uuid,
        })
    }
}

impl TelemetryUploader for HttpManifestUploader {
    fn upload(&self, ledger: &Ledger) -> Result<()> {
        let body = ManifestUpload {
            device_uuid: &self.device_uuid,
            skills: ledger,
        };
        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .with_context(|| format!("failed posting skills manifest to {}", self.url))?
            .error_for_status()
            .with_context(|| format!("skills manifest rejected by {}", self.url))?;
        Ok(())
    }
}
