use crate::config::{SummaryConfig, DEFAULT_MAX_PROMPT_CHARS};
use crate::scraper::CleanText;

/// Instruction wrapped around the page text sent to the model.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub lines: usize,
    pub language: String,
    pub max_chars: usize,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            lines: 5,
            language: "Japanese".to_string(),
            max_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }
}

impl From<&SummaryConfig> for PromptTemplate {
    fn from(config: &SummaryConfig) -> Self {
        Self {
            lines: config.lines,
            language: config.language.clone(),
            max_chars: config.max_prompt_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    body_start: usize,
}

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The page text as it appears inside the prompt, after truncation.
    pub fn embedded_text(&self) -> &str {
        &self.text[self.body_start..]
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl PromptTemplate {
    pub fn instruction(&self) -> String {
        format!(
            "Summarize the following text concisely in {} lines, in {}.",
            self.lines, self.language
        )
    }

    /// Hard-cuts the text to `max_chars` characters and appends it to the
    /// instruction.
    pub fn build(&self, text: CleanText) -> Prompt {
        let content = truncate_chars(text.as_str(), self.max_chars);

        let mut result = self.instruction();
        result.reserve(content.len() + 2);
        result.push_str("\n\n");
        let body_start = result.len();
        result.push_str(content);

        Prompt {
            text: result,
            body_start,
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
