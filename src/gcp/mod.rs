//! Cloud Run, Resource Manager, Service Usage and Container Analysis surface
//!
//! The discovery service talks to the cloud only through [`CloudApi`], so
//! tests can swap in fixtures for the HTTPS client.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::image::ImageInfo;

mod client;

pub use client::GcpClient;


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projectNumber")]
    pub number: String,
    #[serde(rename = "projectId")]
    pub id: String,
    #[serde(rename = "lifecycleState", default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "locationId")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Cloud Run (Knative serving) service, reduced to what discovery needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    pub metadata: ServiceMetadata,
    #[serde(default)]
    pub spec: ServiceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub template: RevisionTemplate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisionTemplate {
    #[serde(default)]
    pub spec: RevisionSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisionSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Service {
    /// Images of every container in the service's current template
    pub fn images(&self) -> impl Iterator<Item = &str> + '_ {
        self.spec
            .template
            .spec
            .containers
            .iter()
            .map(|c| c.image.as_str())
            .filter(|image| !image.is_empty())
    }
}

/// Container Analysis occurrence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub name: String,
    #[serde(default)]
    pub resource_uri: String,
    #[serde(default)]
    pub note_name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default)]
    pub vulnerability: Vulnerability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub effective_severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<f64>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_issue: Vec<PackageIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageIssue {
    #[serde(default)]
    pub affected_package: String,
    #[serde(default)]
    pub affected_version: Version,
    #[serde(default)]
    pub fixed_version: Version,
    #[serde(default)]
    pub fix_available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub kind: String,
}

/// Everything discovery needs from the cloud
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// All projects visible to the caller
    async fn projects(&self) -> Result<Vec<Project>>;

    /// Cloud Run regions available to a project
    async fn locations(&self, project_number: &str) -> Result<Vec<Location>>;

    /// Cloud Run services deployed in one region
    async fn services(&self, project_number: &str, region: &str) -> Result<Vec<Service>>;

    /// Whether `api` (e.g. `run.googleapis.com`) is enabled in the project
    async fn is_api_enabled(&self, project_number: &str, api: &str) -> Result<bool>;

    /// Parse a deployed image reference, resolving the digest when it is missing
    async fn image_info(&self, image: &str) -> Result<ImageInfo>;

    /// Occurrences of one CVE across a project's images
    async fn cve_occurrences(&self, project_id: &str, cve: &str) -> Result<Vec<Occurrence>>;

    /// Vulnerability occurrences for a single image URL
    async fn image_occurrences(&self, project_id: &str, image_url: &str)
        -> Result<Vec<Occurrence>>;
}
