//! Models command handler

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use segtran_core::{BackendProfile, ModelId};
use serde::Serialize;
use std::str::FromStr;

/// One row of the model listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub model: ModelId,
    pub default: bool,
    /// Built-in profile with config overrides applied
    pub profile: BackendProfile,
}

/// Every supported model with its effective profile
pub fn model_entries(config: &Config) -> Vec<ModelEntry> {
    let default = ModelId::from_str(&config.default_model).ok();
    ModelId::all()
        .iter()
        .map(|&model| ModelEntry {
            model,
            default: Some(model) == default,
            profile: config.effective_profile(model),
        })
        .collect()
}

/// Handle the models command
pub async fn handle_models(config: &Config, output: &mut OutputWriter) -> Result<()> {
    let entries = model_entries(config);

    if !output.is_human() {
        return output.data(&entries);
    }

    let rows = entries
        .iter()
        .map(|entry| {
            vec![
                format!("{}{}", entry.model, if entry.default { " *" } else { "" }),
                entry.profile.default_segment_size.to_string(),
                entry.profile.concurrency_limit.to_string(),
                format!("{}s", entry.profile.request_timeout.as_secs()),
            ]
        })
        .collect();
    output.table(&["model", "segment size", "concurrency", "timeout"], rows)?;
    output.info("* default model")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn test_entries_mark_default_and_apply_overrides() {
        let mut config = Config::default();
        config.default_model = "gpt-4o".to_string();
        config.models.insert(
            "deepseek".to_string(),
            ModelConfig {
                concurrency: Some(5),
                ..Default::default()
            },
        );

        let entries = model_entries(&config);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e.model == ModelId::Gpt4o && e.default));
        assert_eq!(entries.iter().filter(|e| e.default).count(), 1);

        let deepseek = entries.iter().find(|e| e.model == ModelId::DeepSeek).unwrap();
        assert_eq!(deepseek.profile.concurrency_limit, 5);
        assert_eq!(deepseek.profile.default_segment_size, 4000);
    }
}
