//! Translation request and instruction-prompt construction.

/// Default cap on generated tokens per translation.
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// A single translation request as seen by a [`TranslationEngine`].
///
/// [`TranslationEngine`]: super::TranslationEngine
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Source text.
    pub text: String,
    /// ISO-639-1 target language code (e.g. `"en"`).
    pub target_language: String,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build a chat-style instruction prompt for instruction-tuned models.
    ///
    /// ```
    /// use inference_offload::engine::TranslationRequest;
    ///
    /// let prompt = TranslationRequest::new("hola", "en").prompt();
    /// assert!(prompt.contains("to English"));
    /// assert!(prompt.contains("hola"));
    /// ```
    pub fn prompt(&self) -> String {
        let lang = language_display_name(&self.target_language);
        format!(
            "<|system|>\nYou are a professional translator. Translate the given text accurately \
             to {lang}. Output ONLY the translation, nothing else.<|end|>\n\
             <|user|>\nTranslate the following text to {lang}:\n\n{text}<|end|>\n\
             <|assistant|>\n",
            text = self.text
        )
    }
}

/// English name of an ISO-639-1 code; unknown codes are returned unchanged.
pub fn language_display_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "bn" => "Bengali",
        "ta" => "Tamil",
        "te" => "Telugu",
        "mr" => "Marathi",
        "gu" => "Gujarati",
        "kn" => "Kannada",
        "ml" => "Malayalam",
        "pa" => "Punjabi",
        "ur" => "Urdu",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "vi" => "Vietnamese",
        "th" => "Thai",
        "id" => "Indonesian",
        "ms" => "Malay",
        "tr" => "Turkish",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        "el" => "Greek",
        "cs" => "Czech",
        "ro" => "Romanian",
        "hu" => "Hungarian",
        "he" => "Hebrew",
        "fa" => "Persian",
        "sw" => "Swahili",
        _ => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_to_names() {
        assert_eq!(language_display_name("th"), "Thai");
        assert_eq!(language_display_name("sw"), "Swahili");
    }

    #[test]
    fn unknown_code_falls_back_to_code() {
        assert_eq!(language_display_name("xx"), "xx");
    }

    #[test]
    fn prompt_names_language_and_embeds_text() {
        let p = TranslationRequest::new("bonjour le monde", "de").prompt();
        assert!(p.contains("to German"));
        assert!(p.contains("bonjour le monde"));
        assert!(p.ends_with("<|assistant|>\n"));
    }

    #[test]
    fn default_token_budget() {
        let r = TranslationRequest::new("x", "en");
        assert_eq!(r.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(r.with_max_tokens(16).max_tokens, 16);
    }
}
