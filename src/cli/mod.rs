use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::service::{ImagesQuery, SimpleQuery, VulnsQuery};

#[derive(Parser)]
#[command(name = "disco")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: <config dir>/disco/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cloud Run commands
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// List deployed container images
    #[command(visible_aliases = ["img", "i"])]
    Images {
        #[command(flatten)]
        common: CommonArgs,

        /// Output only image digests
        #[arg(long)]
        digest: bool,
    },

    /// Check for OS-level exposures in deployed images (supports specific CVE filter)
    #[command(visible_aliases = ["vul", "v"])]
    Vulnerabilities {
        #[command(flatten)]
        common: CommonArgs,

        /// Exposure ID (CVE number, e.g. CVE-2019-19378)
        #[arg(short = 'e', long)]
        cve: Option<String>,

        /// Invoke the Container Analysis API instead of the local scanner
        #[arg(long)]
        ca: bool,
    },

    /// Scan images for license types (requires OSS scanner, e.g. Trivy)
    #[command(visible_aliases = ["lic", "l"])]
    Licenses {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Project ID
    #[arg(short, long, env = crate::constants::env::PROJECT)]
    pub project: Option<String>,

    /// Path where to save the output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, yaml, raw)
    #[arg(short, long)]
    pub format: Option<String>,
}

impl CommonArgs {
    /// Build the query, filling unset flags from config defaults
    pub fn to_query(
        &self,
        default_project: Option<&str>,
        default_format: Option<&str>,
    ) -> SimpleQuery {
        let format = self.format.as_deref().or(default_format).unwrap_or_default();
        SimpleQuery {
            project_id: self
                .project
                .clone()
                .or_else(|| default_project.map(str::to_string))
                .filter(|p| !p.is_empty()),
            output_path: self.output.clone(),
            output_fmt: OutputFormat::parse_or_default(format),
        }
    }
}

impl ImagesQuery {
    pub fn from_args(query: SimpleQuery, digest: bool) -> Self {
        Self {
            query,
            only_digest: digest,
        }
    }
}

impl VulnsQuery {
    pub fn from_args(query: SimpleQuery, cve: Option<String>, ca: bool) -> Self {
        Self {
            query,
            cve: cve.filter(|c| !c.is_empty()),
            ca_api: ca,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_images_alias() {
        let cli = Cli::try_parse_from(["disco", "run", "img", "-p", "cloudy-demos", "--digest"])
            .unwrap();
        match cli.command {
            Commands::Run {
                command: RunCommands::Images { common, digest },
            } => {
                assert!(digest);
                assert_eq!(common.project.as_deref(), Some("cloudy-demos"));
            }
            _ => panic!("expected images command"),
        }
    }

    #[test]
    fn test_parse_vulnerabilities_flags() {
        let cli = Cli::try_parse_from([
            "disco", "run", "v", "-e", "CVE-2019-19378", "--ca", "-f", "yaml", "-o", "out.yaml",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                command: RunCommands::Vulnerabilities { common, cve, ca },
            } => {
                assert!(ca);
                assert_eq!(cve.as_deref(), Some("CVE-2019-19378"));
                assert_eq!(common.format.as_deref(), Some("yaml"));
                assert_eq!(common.output, Some(PathBuf::from("out.yaml")));
            }
            _ => panic!("expected vulnerabilities command"),
        }
    }

    #[test]
    fn test_project_flag_reads_env() {
        let cmd = Cli::command();
        let images = cmd
            .find_subcommand("run")
            .and_then(|run| run.find_subcommand("images"))
            .unwrap();
        let project = images
            .get_arguments()
            .find(|arg| arg.get_id() == "project")
            .unwrap();
        assert_eq!(
            project.get_env(),
            Some(std::ffi::OsStr::new(crate::constants::env::PROJECT))
        );
    }

    #[test]
    fn test_digest_flag_only_on_images() {
        assert!(Cli::try_parse_from(["disco", "run", "licenses", "--digest"]).is_err());
    }

    #[test]
    fn test_to_query_uses_defaults() {
        let args = CommonArgs::default();
        let query = args.to_query(Some("from-config"), Some("raw"));
        assert_eq!(query.project_id.as_deref(), Some("from-config"));
        assert_eq!(query.output_fmt, OutputFormat::Raw);
        assert!(query.output_path.is_none());

        let args = CommonArgs {
            project: Some("flag".to_string()),
            output: None,
            format: Some("json".to_string()),
        };
        let query = args.to_query(Some("from-config"), Some("raw"));
        assert_eq!(query.project_id.as_deref(), Some("flag"));
        assert_eq!(query.output_fmt, OutputFormat::Json);
    }

    #[test]
    fn test_vulns_query_drops_empty_cve() {
        let query = VulnsQuery::from_args(SimpleQuery::default(), Some(String::new()), false);
        assert!(query.cve.is_none());
    }
}
