//! Runs an external image scanner (trivy by default) and normalizes its report

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ScannerConfig;


const IMAGE_PLACEHOLDER: &str = "{image}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Vulnerability,
    License,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Vulnerability => write!(f, "vulnerability"),
            ScanKind::License => write!(f, "license"),
        }
    }
}

/// One normalized finding
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub package: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub severity: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "fixedIn", skip_serializing_if = "String::is_empty")]
    pub fixed_in: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Findings for one image
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub image: String,
    pub kind: ScanKind,
    #[serde(rename = "scannedAt")]
    pub scanned_at: String,
    pub items: Vec<Item>,
}

// trivy JSON report, only the parts we read
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Report {
    #[serde(default)]
    results: Vec<ReportResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportResult {
    #[serde(default)]
    target: String,
    #[serde(default)]
    vulnerabilities: Vec<ReportVulnerability>,
    #[serde(default)]
    licenses: Vec<ReportLicense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportVulnerability {
    #[serde(rename = "VulnerabilityID")]
    vulnerability_id: String,
    #[serde(default)]
    pkg_name: String,
    #[serde(default)]
    installed_version: String,
    #[serde(default)]
    fixed_version: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "PrimaryURL", default)]
    primary_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportLicense {
    name: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    pkg_name: String,
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    link: String,
}

/// External scanner invoked once per image
pub struct Scanner {
    program: String,
    vulnerability_args: Vec<String>,
    license_args: Vec<String>,
}

impl Scanner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            program: config.program.clone(),
            vulnerability_args: config.vulnerability_args.clone(),
            license_args: config.license_args.clone(),
        }
    }

    /// Fail early when the scanner binary is not on PATH
    pub fn ensure_available(&self) -> Result<PathBuf> {
        which::which(&self.program).with_context(|| {
            format!(
                "Scanner `{}` not found on PATH (install it, e.g. trivy, or set scanner.program in the config)",
                self.program
            )
        })
    }

    /// Arguments for `kind` with the placeholders filled in
    pub fn args(&self, kind: ScanKind, image: &str, output: &Path) -> Vec<String> {
        let template = match kind {
            ScanKind::Vulnerability => &self.vulnerability_args,
            ScanKind::License => &self.license_args,
        };
        let output = output.to_string_lossy();
        template
            .iter()
            .map(|arg| {
                arg.replace(IMAGE_PLACEHOLDER, image)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    /// Scan one image. Items for which `filter` returns true are dropped;
    /// `None` means nothing survived.
    pub async fn scan<F>(
        &self,
        kind: ScanKind,
        image: &str,
        output: &Path,
        filter: F,
    ) -> Result<Option<ItemReport>>
    where
        F: Fn(&str) -> bool,
    {
        let args = self.args(kind, image, output);
        info!("Scanning {} for {}s", image, kind);
        debug!("Running command: {} {}", self.program, args.join(" "));

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to execute scanner {}", self.program))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!(
                "Scanner {} failed for {}: {}",
                self.program,
                image,
                stderr.trim()
            );
        }

        let content = tokio::fs::read_to_string(output)
            .await
            .with_context(|| format!("Failed to read scanner report: {}", output.display()))?;
        let report: Report = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scanner report: {}", output.display()))?;

        let items: Vec<Item> = normalize(kind, report)
            .into_iter()
            .filter(|item| !filter(&item.id))
            .collect();

        if items.is_empty() {
            debug!("No {} findings left for {}", kind, image);
            return Ok(None);
        }

        Ok(Some(ItemReport {
            image: image.to_string(),
            kind,
            scanned_at: chrono::Utc::now().to_rfc3339(),
            items,
        }))
    }
}

fn normalize(kind: ScanKind, report: Report) -> Vec<Item> {
    let mut items = Vec::new();
    for result in report.results {
        match kind {
            ScanKind::Vulnerability => {
                items.extend(result.vulnerabilities.into_iter().map(|v| Item {
                    id: v.vulnerability_id,
                    package: v.pkg_name,
                    version: v.installed_version,
                    severity: v.severity,
                    title: v.title,
                    fixed_in: v.fixed_version,
                    target: result.target.clone(),
                    url: v.primary_url,
                }));
            }
            ScanKind::License => {
                items.extend(result.licenses.into_iter().map(|l| Item {
                    id: l.name,
                    package: l.pkg_name,
                    severity: l.severity,
                    title: l.category,
                    target: if l.file_path.is_empty() {
                        result.target.clone()
                    } else {
                        l.file_path
                    },
                    url: l.link,
                    ..Default::default()
                }));
            }
        }
    }
    items
}
