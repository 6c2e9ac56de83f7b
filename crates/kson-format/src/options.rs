//! `FormatOptions` and friends (spec §6's "FormatOptions recognized fields").
//!
//! Derives `serde::{Serialize, Deserialize}` with `#[serde(default,
//! rename_all = "camelCase")]` following `prettier_config::PrettierConfig`
//! exactly, so a `.ksonfmt` config file can deserialize partially-specified
//! options (SPEC_FULL §0).

use serde::{Deserialize, Serialize};

pub use crate::doc::IndentType;

/// The four formatter styles (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormattingStyle {
    /// Key-value pairs on their own lines, outer braces omitted at root,
    /// dash-style nested lists.
    Plain,
    /// Always emit outer `{ }`/`[ ]`.
    Delimited,
    /// Single line, minimal spacing, no outer braces.
    Compact,
    /// Pretty-printed JSON-compatible output.
    Classic,
}

impl Default for FormattingStyle {
    fn default() -> Self {
        Self::Plain
    }
}

/// One `(path_pattern, tag?)` rule steering the formatter to render a
/// matched string as an embed block instead of a quoted literal.
/// `path_pattern` is a JSON-Pointer-glob, e.g. `/a/b/*` or `/a/**`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbedBlockRule {
    pub path_pattern: String,
    pub tag: Option<String>,
}

impl Default for EmbedBlockRule {
    fn default() -> Self {
        Self {
            path_pattern: String::new(),
            tag: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatOptions {
    pub indent_type: IndentType,
    pub formatting_style: FormattingStyle,
    pub embed_block_rules: Vec<EmbedBlockRule>,
    pub print_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_type: IndentType::default(),
            formatting_style: FormattingStyle::default(),
            embed_block_rules: Vec::new(),
            print_width: 80,
        }
    }
}
