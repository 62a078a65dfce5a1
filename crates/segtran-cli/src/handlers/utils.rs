//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::{Error, Result};
use segtran_core::ModelId;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Read the document to process; `-` reads standard input
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text.replace("\r\n", "\n"));
    }

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    Ok(segtran_core::extract_text(path)?)
}

/// `--model` if given, otherwise the configured default
pub fn resolve_model(requested: Option<&str>, config: &Config) -> Result<ModelId> {
    let name = requested.unwrap_or(&config.default_model);
    Ok(ModelId::from_str(name)?)
}

/// Convert a positive count from the command line
pub fn to_usize(value: u64, flag: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid_args(format!("{} is too large: {}", flag, value)))
}
