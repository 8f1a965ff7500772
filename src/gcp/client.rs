use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{CloudApi, Location, Occurrence, Project, Service};
use crate::auth::TokenSource;
use crate::config::Endpoints;
use crate::constants::api;
use crate::http::HttpClient;
use crate::image::ImageInfo;
use crate::registry::RegistryClient;

/// A list response that may continue on another page
trait Paged: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
    next_page_token: Option<String>,
}

impl Paged for ProjectList {
    type Item = Project;

    fn into_parts(self) -> (Vec<Project>, Option<String>) {
        (self.projects, self.next_page_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationList {
    #[serde(default)]
    locations: Vec<Location>,
    next_page_token: Option<String>,
}

impl Paged for LocationList {
    type Item = Location;

    fn into_parts(self) -> (Vec<Location>, Option<String>) {
        (self.locations, self.next_page_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceList {
    #[serde(default)]
    occurrences: Vec<Occurrence>,
    next_page_token: Option<String>,
}

impl Paged for OccurrenceList {
    type Item = Occurrence;

    fn into_parts(self) -> (Vec<Occurrence>, Option<String>) {
        (self.occurrences, self.next_page_token)
    }
}

#[derive(Deserialize)]
struct ServiceList {
    #[serde(default)]
    items: Vec<Service>,
}

#[derive(Deserialize)]
struct ServiceState {
    #[serde(default)]
    state: String,
}

/// HTTPS implementation of [`CloudApi`]
pub struct GcpClient {
    http: HttpClient,
    registry: RegistryClient,
    endpoints: Endpoints,
    token: String,
}

impl GcpClient {
    /// Create a client, obtaining the access token up front
    pub fn new(endpoints: Endpoints, tokens: &dyn TokenSource) -> Result<Self> {
        let token = tokens.token().context("Failed to obtain access token")?;
        Ok(Self::with_token(endpoints, token))
    }

    pub fn with_token(endpoints: Endpoints, token: impl Into<String>) -> Self {
        let http = HttpClient::new();
        Self {
            registry: RegistryClient::new(http.clone()).with_endpoint(endpoints.registry.clone()),
            http,
            endpoints,
            token: token.into(),
        }
    }

    async fn get_all<P: Paged>(&self, base: &str, params: &[(&str, &str)]) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = {
                let mut query = params.to_vec();
                if let Some(token) = page_token.as_deref() {
                    query.push(("pageToken", token));
                }
                build_url(base, &query)?
            };

            let page: P = self.http.get_json(&url, &self.token).await?;
            let (mut batch, next) = page.into_parts();
            items.append(&mut batch);

            match next {
                Some(next) if !next.is_empty() => {
                    debug!("Fetching next page of {}", base);
                    page_token = Some(next);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    async fn occurrences(&self, project_id: &str, filter: &str) -> Result<Vec<Occurrence>> {
        let base = format!("{}/projects/{}/occurrences", self.endpoints.analysis, project_id);
        debug!("Listing occurrences in {} with filter: {}", project_id, filter);
        self.get_all::<OccurrenceList>(&base, &[("filter", filter)])
            .await
    }
}

/// Append query parameters to `base`, leaving it untouched when there are none
pub(crate) fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String> {
    if params.is_empty() {
        return Ok(base.to_string());
    }
    let url = Url::parse_with_params(base, params)
        .with_context(|| format!("Invalid API URL: {}", base))?;
    Ok(url.to_string())
}

#[async_trait]
impl CloudApi for GcpClient {
    async fn projects(&self) -> Result<Vec<Project>> {
        self.get_all::<ProjectList>(&self.endpoints.projects, &[])
            .await
            .context("Failed to list projects")
    }

    async fn locations(&self, project_number: &str) -> Result<Vec<Location>> {
        let base = format!("{}/v1/projects/{}/locations", self.endpoints.run, project_number);
        self.get_all::<LocationList>(&base, &[])
            .await
            .with_context(|| format!("Failed to list locations for project {}", project_number))
    }

    async fn services(&self, project_number: &str, region: &str) -> Result<Vec<Service>> {
        let host = self.endpoints.run_regional.replace("{region}", region);
        let url = format!(
            "{}/apis/serving.knative.dev/v1/namespaces/{}/services",
            host, project_number
        );
        let list: ServiceList = self
            .http
            .get_json(&url, &self.token)
            .await
            .with_context(|| {
                format!(
                    "Failed to list services for project {} in {}",
                    project_number, region
                )
            })?;
        Ok(list.items)
    }

    async fn is_api_enabled(&self, project_number: &str, api_name: &str) -> Result<bool> {
        let url = format!(
            "{}/projects/{}/services/{}",
            self.endpoints.usage, project_number, api_name
        );
        let service: ServiceState = self
            .http
            .get_json(&url, &self.token)
            .await
            .with_context(|| format!("Failed to check {} in project {}", api_name, project_number))?;
        Ok(service.state == api::SERVICE_STATE_ENABLED)
    }

    async fn image_info(&self, image: &str) -> Result<ImageInfo> {
        let mut info = ImageInfo::parse(image)?;
        if info.digest.is_empty() {
            info.digest = self.registry.resolve_digest(&info, &self.token).await?;
        }
        Ok(info)
    }

    async fn cve_occurrences(&self, project_id: &str, cve: &str) -> Result<Vec<Occurrence>> {
        let filter = format!(
            r#"noteProjectId="{}" AND noteId="{}""#,
            api::VULNZ_NOTE_PROJECT,
            cve
        );
        self.occurrences(project_id, &filter)
            .await
            .with_context(|| format!("Failed to list occurrences of {} in {}", cve, project_id))
    }

    async fn image_occurrences(
        &self,
        project_id: &str,
        image_url: &str,
    ) -> Result<Vec<Occurrence>> {
        let filter = format!(r#"kind="VULNERABILITY" AND resourceUrl="{}""#, image_url);
        self.occurrences(project_id, &filter)
            .await
            .with_context(|| format!("Failed to list occurrences for {}", image_url))
    }
}
