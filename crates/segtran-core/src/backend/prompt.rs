//! System prompt selection

/// Instruction sent with every segment unless the caller supplies one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional academic translator. \
Translate the following Chinese academic text into fluent, formal English. \
Preserve paragraph breaks, citations, numbers and technical terminology. \
Lines of the form [Part i/n] are position markers: copy them unchanged and do not translate them. \
Output only the translation.";

/// Prompt to use: a non-blank custom prompt wins over the default
pub fn system_prompt(custom: Option<&str>) -> &str {
    match custom {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => DEFAULT_SYSTEM_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_custom_prompt_falls_back() {
        assert_eq!(system_prompt(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(system_prompt(Some("   ")), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(system_prompt(Some("Translate tersely.")), "Translate tersely.");
    }
}
