//! Styled Text Fragments
//!
//! Build log lines are assembled from fragments that each carry a color, so
//! the logger can apply markup without parsing strings back apart.

use serde::{Deserialize, Serialize};

/// Logical color of a text fragment. The concrete escape code comes from the
/// logger's color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Header,
    Success,
    Warning,
    Error,
    Details,
    Minor,
}

/// A single styled fragment of a build log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdOutText {
    pub text: String,
    #[serde(default)]
    pub color: Color,
}

impl StdOutText {
    /// Plain fragment in the default color.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Color::Default,
        }
    }

    /// Fragment in the given color.
    pub fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

impl From<&str> for StdOutText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for StdOutText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Join fragments into unstyled text.
pub fn plain_text(fragments: &[StdOutText]) -> String {
    fragments.iter().map(|f| f.text.as_str()).collect()
}
