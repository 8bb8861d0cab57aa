//! Tool Versions
//!
//! [`Version`] is a dotted numeric version with an optional pre-release tag.
//! The empty version is the "nothing parsed" sentinel: a probe whose output
//! never yields a non-empty version means the tool was not found.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    components: Vec<u64>,
    pre_release: Option<String>,
}

impl Version {
    pub fn new(components: Vec<u64>) -> Self {
        Self {
            components,
            pre_release: None,
        }
    }

    /// The "no version" sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_pre_release(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.pre_release = if tag.is_empty() { None } else { Some(tag) };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn major(&self) -> u64 {
        self.components.first().copied().unwrap_or(0)
    }

    pub fn minor(&self) -> u64 {
        self.components.get(1).copied().unwrap_or(0)
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn pre_release(&self) -> Option<&str> {
        self.pre_release.as_deref()
    }

    /// Parse a single version token such as `8.0.100`, `v6.0` or
    /// `9.0.100-preview.7.24407.12`. Returns `None` for anything else.
    pub fn parse(token: &str) -> Option<Version> {
        let captures = version_token_regex()?.captures(token.trim())?;
        let numbers = captures.name("numbers")?.as_str();

        let mut components = Vec::new();
        for part in numbers.split('.') {
            components.push(part.parse::<u64>().ok()?);
        }

        let version = Version::new(components);
        Some(match captures.name("pre") {
            Some(pre) => version.with_pre_release(pre.as_str()),
            None => version,
        })
    }
}

fn version_token_regex() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"^v?(?P<numbers>\d+(?:\.\d+)+)(?:-(?P<pre>[\w.\-]+))?$").ok())
        .as_ref()
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let left = self.components.get(i).copied().unwrap_or(0);
            let right = other.components.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        // A release sorts after any of its pre-releases.
        match (&self.pre_release, &other.pre_release) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", numbers.join("."))?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

// ============================================================================
// Version Parser
// ============================================================================

/// Turns tool output into a version. Pure; returns [`Version::empty`] when
/// nothing in the input looks like a version.
pub trait VersionParser: Send + Sync {
    fn parse(&self, lines: &[String]) -> Version;
}

/// Parser for `dotnet --version` and `mono --version` style output.
///
/// Takes the first whitespace-separated token on any line that is a version;
/// `Mono JIT compiler version 6.12.0.182 (...)` yields `6.12.0.182`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotnetVersionParser;

impl VersionParser for DotnetVersionParser {
    fn parse(&self, lines: &[String]) -> Version {
        lines
            .iter()
            .flat_map(|line| line.split_whitespace())
            .find_map(Version::parse)
            .unwrap_or_default()
    }
}
