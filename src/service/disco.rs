//! Discovery service: walks projects, regions and services to find deployed
//! images, then reports on them.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use super::query::{ImagesQuery, SimpleQuery, VulnsQuery};
use crate::constants::api;
use crate::gcp::{CloudApi, Occurrence, Project};
use crate::image::ImageInfo;
use crate::output::write_output;
use crate::scanner::{ItemReport, ScanKind, Scanner};

/// An image and where it runs
#[derive(Debug, Clone, Serialize)]
pub struct RunningImage {
    pub project: Project,
    pub location: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub image: ImageInfo,
}

/// Keep the first image seen for each URL, preserving discovery order
pub fn unique_images(images: Vec<RunningImage>) -> Vec<RunningImage> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .filter(|img| seen.insert(img.image.url()))
        .collect()
}

pub struct DiscoService {
    api: Box<dyn CloudApi>,
    scanner: Scanner,
    run_api: String,
}

impl DiscoService {
    pub fn new(api: Box<dyn CloudApi>, scanner: Scanner) -> Self {
        Self {
            api,
            scanner,
            run_api: api::CLOUD_RUN.to_string(),
        }
    }

    /// Override the API that marks a project as running services
    pub fn with_run_api(mut self, run_api: impl Into<String>) -> Self {
        self.run_api = run_api.into();
        self
    }

    /// The named project, or every active project
    pub async fn select_projects(&self, project_id: Option<&str>) -> Result<Vec<Project>> {
        let projects = self.api.projects().await.context("error getting projects")?;

        if let Some(id) = project_id {
            let project = projects
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| anyhow!("project not found or not accessible: {}", id))?;
            return Ok(vec![project]);
        }

        let active: Vec<Project> = projects
            .into_iter()
            .filter(|p| p.state == api::PROJECT_STATE_ACTIVE)
            .collect();
        info!("Found {} active projects", active.len());
        Ok(active)
    }

    /// Every container image deployed in scope, duplicates included
    pub async fn deployed_images(&self, project_id: Option<&str>) -> Result<Vec<RunningImage>> {
        let mut images = Vec::new();
        for project in self.select_projects(project_id).await? {
            images.extend(self.project_images(&project).await?);
        }
        info!("Found {} deployed images", images.len());
        Ok(images)
    }

    async fn project_images(&self, project: &Project) -> Result<Vec<RunningImage>> {
        let mut images = Vec::new();

        let enabled = self
            .api
            .is_api_enabled(&project.number, &self.run_api)
            .await
            .with_context(|| format!("error checking {} in project {}", self.run_api, project.id))?;
        if !enabled {
            debug!("{} not enabled in project {}, skipping", self.run_api, project.id);
            return Ok(images);
        }

        info!("Processing project: {}", project.id);
        let locations = self
            .api
            .locations(&project.number)
            .await
            .with_context(|| format!("error getting locations for project {}", project.id))?;

        for location in &locations {
            let services = self
                .api
                .services(&project.number, &location.id)
                .await
                .with_context(|| {
                    format!(
                        "error getting services for project {} in {}",
                        project.id, location.id
                    )
                })?;
            debug!(
                "Found {} services in {}/{}",
                services.len(),
                project.id,
                location.id
            );

            for service in &services {
                for image in service.images() {
                    let info = self
                        .api
                        .image_info(image)
                        .await
                        .with_context(|| format!("error getting image info for {}", image))?;
                    debug!(
                        "Service {} in {} runs {}",
                        service.metadata.name,
                        location.id,
                        info.uri()
                    );
                    images.push(RunningImage {
                        project: project.clone(),
                        location: location.id.clone(),
                        service: service.metadata.name.clone(),
                        url: service.status.as_ref().and_then(|s| s.url.clone()),
                        image: info,
                    });
                }
            }
        }

        Ok(images)
    }

    /// List the unique deployed images
    pub async fn discover_images(&self, query: Option<&ImagesQuery>) -> Result<()> {
        let query = query.ok_or_else(|| anyhow!("nil input"))?;
        debug!("Discovering images with: {}", query);
        print_project_scope(query.query.project_id.as_deref());

        let images = unique_images(
            self.deployed_images(query.query.project_id.as_deref())
                .await?,
        );
        info!("Found {} unique images", images.len());

        let out = query.query.output_path.as_deref();
        if query.only_digest {
            let digests: Vec<String> = images.iter().map(|img| img.image.uri()).collect();
            return write_output(out, query.query.output_fmt, &digests)
                .context("error writing output");
        }
        write_output(out, query.query.output_fmt, &images).context("error writing output")
    }

    /// Report vulnerabilities, locally or through Container Analysis
    pub async fn discover_vulns(&self, query: Option<&VulnsQuery>) -> Result<()> {
        let query = query.ok_or_else(|| anyhow!("nil input"))?;
        debug!("Discovering vulnerabilities with: {}", query);
        print_project_scope(query.query.project_id.as_deref());

        if !query.ca_api {
            let cve = query.cve.clone();
            let filter = move |id: &str| match &cve {
                None => false,
                Some(want) => {
                    let matched = want.eq_ignore_ascii_case(id);
                    debug!("CVE filter (want: {}, got: {}, filter out: {})", want, id, !matched);
                    !matched
                }
            };
            return self
                .scan(ScanKind::Vulnerability, Some(&query.query), filter)
                .await
                .context("error scanning for vulnerabilities");
        }

        let mut list: Vec<Occurrence> = Vec::new();
        for project in self.select_projects(query.query.project_id.as_deref()).await? {
            let found = match &query.cve {
                Some(cve) => self.project_cves(&project, cve).await,
                None => self.image_vulns(&project).await,
            }
            .with_context(|| {
                format!("error discovering vulnerabilities for project: {}", project.id)
            })?;
            list.extend(found);
        }

        info!("Found {} vulnerability occurrences", list.len());
        write_output(
            query.query.output_path.as_deref(),
            query.query.output_fmt,
            &list,
        )
        .context("error writing output")
    }

    async fn project_cves(&self, project: &Project, cve: &str) -> Result<Vec<Occurrence>> {
        let list = self
            .api
            .cve_occurrences(&project.id, cve)
            .await
            .with_context(|| {
                format!("error getting vulnerabilities for: {} in: {}", cve, project.id)
            })?;

        for o in &list {
            info!(
                "{} [{}] in {}",
                o.vulnerability.short_description, o.vulnerability.severity, o.resource_uri
            );
        }
        Ok(list)
    }

    async fn image_vulns(&self, project: &Project) -> Result<Vec<Occurrence>> {
        let images = unique_images(
            self.project_images(project)
                .await
                .context("error getting images")?,
        );
        info!("Found {} unique images in {}", images.len(), project.id);

        let mut list = Vec::new();
        for img in &images {
            let url = img.image.url();
            let found = match self.api.image_occurrences(&img.project.id, &url).await {
                Ok(found) => found,
                Err(e) => {
                    error!("error getting vulnerabilities for {}: {:#}", url, e);
                    continue;
                }
            };
            if found.is_empty() {
                debug!("No vulnerabilities found for: {}", url);
                continue;
            }
            for o in found {
                info!(
                    "{:<14} - {} in {} (Project: {}, Location: {})",
                    o.vulnerability.short_description,
                    o.vulnerability.severity,
                    img.service,
                    img.project.id,
                    img.location
                );
                list.push(o);
            }
        }
        Ok(list)
    }

    /// Report licenses found by the local scanner
    pub async fn discover_licenses(&self, query: Option<&SimpleQuery>) -> Result<()> {
        let query = query.ok_or_else(|| anyhow!("nil input"))?;
        debug!("Discovering licenses with: {}", query);
        print_project_scope(query.project_id.as_deref());

        self.scan(ScanKind::License, Some(query), |_: &str| false)
            .await
            .context("error scanning for licenses")
    }

    /// Run the local scanner over every unique deployed image. Items for
    /// which `filter` returns true are left out of the report.
    pub async fn scan<F>(&self, kind: ScanKind, query: Option<&SimpleQuery>, filter: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        let query = query.ok_or_else(|| anyhow!("nil input"))?;
        let scanner_path = self.scanner.ensure_available()?;
        debug!("Using scanner at {}", scanner_path.display());

        let images = unique_images(self.deployed_images(query.project_id.as_deref()).await?);
        info!("Scanning {} unique images", images.len());

        let dir = tempfile::Builder::new()
            .prefix("disco")
            .tempdir()
            .context("Failed to create temporary directory")?;

        let mut reports: Vec<ItemReport> = Vec::new();
        for img in &images {
            let uri = img.image.uri();
            info!("Processing image: {}", uri);

            let output = dir.path().join(format!("{}.json", sha256::digest(uri.as_str())));
            match self.scanner.scan(kind, &uri, &output, &filter).await {
                Ok(Some(report)) => {
                    info!("Found {} {} items in {}", report.items.len(), kind, uri);
                    reports.push(report);
                }
                Ok(None) => debug!("No {} items in {}", kind, uri),
                Err(e) => {
                    error!("error scanning {}: {:#}", uri, e);
                }
            }
        }

        if reports.is_empty() {
            warn!("No {} findings in {} images", kind, images.len());
        }

        write_output(query.output_path.as_deref(), query.output_fmt, &reports)
            .context("error writing output")
    }
}

fn print_project_scope(project_id: Option<&str>) {
    match project_id {
        Some(id) => info!("Scanning project: {}", id),
        None => info!("Scanning all projects accessible to current user"),
    }
}
