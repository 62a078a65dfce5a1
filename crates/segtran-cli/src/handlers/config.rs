//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigInitArgs, ConfigShowArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use std::path::{Path, PathBuf};

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    match args.action {
        ConfigAction::Init(init_args) => handle_config_init(init_args, output),
        ConfigAction::Show(show_args) => handle_config_show(show_args, config, output),
    }
}

/// Handle config init subcommand
fn handle_config_init(args: ConfigInitArgs, output: &mut OutputWriter) -> Result<()> {
    let path = if args.user {
        Config::user_config_path()
            .ok_or_else(|| Error::config("Unable to determine user config directory"))?
    } else {
        PathBuf::from(".segtran.toml")
    };

    init_at(&path, args.force, output)
}

fn init_at(path: &Path, force: bool, output: &mut OutputWriter) -> Result<()> {
    if path.exists() && !force {
        output.warning(&format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ))?;
        return Ok(());
    }

    Config::write_default(path)?;
    output.success(&format!("✓ Created config at {}", path.display()))?;
    output.info("Set the proxy credential with --api-key or SEGTRAN_API_KEY.")?;
    Ok(())
}

/// Handle config show subcommand
fn handle_config_show(args: ConfigShowArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let content = render(config, args.format)?;
    output.write(&content)?;
    if !content.ends_with('\n') {
        output.writeln("")?;
    }
    Ok(())
}

fn render(config: &Config, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| Error::config(format!("Failed to serialize as TOML: {}", e))),
        ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        ConfigFormat::Yaml => Ok(serde_yaml::to_string(config)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use tempfile::TempDir;

    fn quiet_output() -> OutputWriter {
        OutputWriter::with_writers(
            OutputFormat::Human,
            false,
            true,
            Box::new(std::io::sink()),
            Box::new(std::io::sink()),
        )
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".segtran.toml");
        std::fs::write(&path, "default_model = \"claude\"\n").unwrap();

        init_at(&path, false, &mut quiet_output()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "default_model = \"claude\"\n");

        init_at(&path, true, &mut quiet_output()).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        assert!(render(&config, ConfigFormat::Toml).unwrap().contains("default_model = \"deepseek\""));
        assert!(render(&config, ConfigFormat::Yaml).unwrap().contains("default_model: deepseek"));
        let json: serde_json::Value =
            serde_json::from_str(&render(&config, ConfigFormat::Json).unwrap()).unwrap();
        assert_eq!(json["retry"]["max_retries"], 3);
    }
}
