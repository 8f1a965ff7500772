//! Parser for images hosted in Container Registry (GCR) and Artifact Registry (AR)

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::constants::tag;


const SEGMENTS_GCR: usize = 3;
const SEGMENTS_AR: usize = 4;
const HOST_PARTS_GLOBAL: usize = 2;
const HOST_PARTS_REGIONAL: usize = 3;
const AR_HOST_SUFFIX: &str = "-docker";

/// Which registry layout an image reference uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryKind {
    /// `host/project/name`
    #[default]
    Gcr,
    /// `host/project/folder/name`
    Ar,
}

/// A deployed image reference decomposed into its registry parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    #[serde(skip)]
    pub kind: RegistryKind,
    pub is_latest: bool,
    pub deployed: String,
    pub name: String,
    pub tag: String,
    pub digest: String,
    pub region: String,
    pub registry: String,
    pub project: String,
    #[serde(rename = "registryFolder")]
    pub folder: String,
}

impl ImageInfo {
    /// Parse an image reference such as
    /// `us-west1-docker.pkg.dev/cloudy-demos/artomator/artomator@sha256:1234`
    /// or `gcr.io/cloudy-demos/hello-broken:v0.8.3`.
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.is_empty() {
            bail!("image is empty");
        }

        let parts: Vec<&str> = uri.split('/').collect();
        let kind = match parts.len() {
            SEGMENTS_GCR => RegistryKind::Gcr,
            SEGMENTS_AR => RegistryKind::Ar,
            _ => bail!("invalid image URI: {}", uri),
        };

        let mut info = ImageInfo {
            kind,
            deployed: uri.to_string(),
            ..Default::default()
        };

        if !info.parse_registry_and_region(parts[0]) {
            bail!("error parsing registry and region: {}", uri);
        }
        info.project = parts[1].to_string();

        let name = match kind {
            RegistryKind::Gcr => parts[2],
            RegistryKind::Ar => {
                info.folder = parts[2].to_string();
                parts[3]
            }
        };

        if info.project.is_empty() || (kind == RegistryKind::Ar && info.folder.is_empty()) {
            bail!("invalid image URI: {}", uri);
        }
        if !info.parse_name(name) {
            bail!("error parsing image name: {}", uri);
        }

        Ok(info)
    }

    pub fn is_gcr(&self) -> bool {
        self.kind == RegistryKind::Gcr
    }

    pub fn is_ar(&self) -> bool {
        self.kind == RegistryKind::Ar
    }

    /// Reference without scheme, pinned to the digest when one is known
    pub fn uri(&self) -> String {
        self.with_prefix("")
    }

    /// Reference with an `https://` scheme, as used for Container Analysis resource URLs
    pub fn url(&self) -> String {
        self.with_prefix("https://")
    }

    /// Registry v2 manifest URL for the image's tag (`latest` when untagged)
    pub fn manifest_url(&self) -> String {
        format!("https://{}{}", self.registry, self.manifest_path())
    }

    /// Manifest path below the registry root
    pub fn manifest_path(&self) -> String {
        let reference = if self.tag.is_empty() {
            tag::DEFAULT
        } else {
            self.tag.as_str()
        };
        format!("/v2/{}/manifests/{}", self.repository(), reference)
    }

    /// Repository path below the registry host
    pub fn repository(&self) -> String {
        match self.kind {
            RegistryKind::Gcr => format!("{}/{}", self.project, self.name),
            RegistryKind::Ar => format!("{}/{}/{}", self.project, self.folder, self.name),
        }
    }

    fn with_prefix(&self, prefix: &str) -> String {
        let base = format!("{}{}/{}", prefix, self.registry, self.repository());
        if self.digest.is_empty() {
            base
        } else {
            format!("{}@{}", base, self.digest)
        }
    }

    // name, name:tag, name@sha256:digest
    fn parse_name(&mut self, name: &str) -> bool {
        if let Some((image, digest)) = name.split_once('@') {
            self.name = image.to_string();
            self.digest = digest.to_string();
        } else if name.contains(':') {
            let mut parts = name.split(':');
            self.name = parts.next().unwrap_or_default().to_string();
            match parts.next() {
                Some(tag::DEFAULT) => self.is_latest = true,
                Some(value) => self.tag = value.to_string(),
                None => return false,
            }
        } else {
            self.name = name.to_string();
        }

        !self.name.is_empty()
    }

    // gcr.io, us.gcr.io, us-docker.pkg.dev, us-west1-docker.pkg.dev
    fn parse_registry_and_region(&mut self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        self.registry = host.to_string();

        let parts: Vec<&str> = host.split('.').collect();
        match parts.len() {
            HOST_PARTS_GLOBAL => true,
            HOST_PARTS_REGIONAL => {
                self.region = match self.kind {
                    RegistryKind::Gcr => parts[0].to_string(),
                    RegistryKind::Ar => parts[0].replace(AR_HOST_SUFFIX, ""),
                };
                true
            }
            _ => false,
        }
    }
}

impl FromStr for ImageInfo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}
