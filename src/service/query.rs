use std::fmt;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Scope and destination shared by every command
#[derive(Debug, Clone, Default)]
pub struct SimpleQuery {
    /// Limit discovery to one project; all projects when unset
    pub project_id: Option<String>,
    /// File to write the report to; stdout when unset
    pub output_path: Option<PathBuf>,
    pub output_fmt: OutputFormat,
}

#[derive(Debug, Clone, Default)]
pub struct ImagesQuery {
    pub query: SimpleQuery,
    /// Emit only digest-pinned image references
    pub only_digest: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VulnsQuery {
    pub query: SimpleQuery,
    /// Keep only this exposure, e.g. `CVE-2019-19378`
    pub cve: Option<String>,
    /// Ask Container Analysis instead of running the local scanner
    pub ca_api: bool,
}

fn or_all(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

impl fmt::Display for SimpleQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProjectID:{}, Output:{}, Format:{}",
            or_all(&self.project_id),
            self.output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            self.output_fmt
        )
    }
}

impl fmt::Display for ImagesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, OnlyDigest:{}", self.query, self.only_digest)
    }
}

impl fmt::Display for VulnsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, CVE:{}, CA-API:{}",
            self.query,
            or_all(&self.cve),
            self.ca_api
        )
    }
}
