use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::info;


/// Report serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Raw,
}

impl OutputFormat {
    /// Parse a format name, falling back to JSON for empty or unknown input
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            "raw" => OutputFormat::Raw,
            _ => OutputFormat::default(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Raw => write!(f, "raw"),
        }
    }
}

/// Render `data` in `format`
pub fn render<T>(format: OutputFormat, data: &T) -> Result<String>
where
    T: Serialize + fmt::Debug + ?Sized,
{
    if serde_json::to_value(data)
        .context("Failed to serialize output")?
        .is_null()
    {
        anyhow::bail!("nil data");
    }

    let mut rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).context("Failed to encode JSON output")?
        }
        OutputFormat::Yaml => serde_yaml::to_string(data).context("Failed to encode YAML output")?,
        OutputFormat::Raw => format!("{:#?}", data),
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Write `data` to `path`, or to stdout when there is none
pub fn write_output<T>(path: Option<&Path>, format: OutputFormat, data: &T) -> Result<()>
where
    T: Serialize + fmt::Debug + ?Sized,
{
    let rendered = render(format, data)?;

    let Some(path) = path else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .context("Failed to write output to stdout")?;
        stdout.flush()?;
        return Ok(());
    };

    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write output to {}", path.display()))?;
    info!("Output written to: {}", path.display());
    Ok(())
}
