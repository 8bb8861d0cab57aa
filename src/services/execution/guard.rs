//! Output Replacement
//!
//! Rewrites process output before it reaches the visible build log. The
//! result-event stream always carries the original text.

/// Turns one output line into the lines that are logged.
pub trait OutputReplacer: Send + Sync {
    fn replace(&self, text: &str) -> Vec<String>;
}

/// Logs text exactly as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentOutputReplacer;

impl OutputReplacer for TransparentOutputReplacer {
    fn replace(&self, text: &str) -> Vec<String> {
        vec![text.to_string()]
    }
}

pub const REDACTED: &str = "*******";

/// Hides secret values and splits embedded line breaks into separate lines.
#[derive(Debug, Clone, Default)]
pub struct MessagesGuard {
    secrets: Vec<String>,
}

impl MessagesGuard {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        // longest first so a secret containing another is hidden whole
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    fn redact(&self, line: &str) -> String {
        self.secrets
            .iter()
            .fold(line.to_string(), |line, secret| line.replace(secret.as_str(), REDACTED))
    }
}

impl OutputReplacer for MessagesGuard {
    fn replace(&self, text: &str) -> Vec<String> {
        text.split('\n')
            .map(|line| self.redact(line.strip_suffix('\r').unwrap_or(line)))
            .collect()
    }
}
