//! Path Virtualization
//!
//! When a step runs inside a container the paths the agent sees differ from
//! the paths the process sees. A [`VirtualContext`] maps local paths into the
//! execution environment, both for display and for building arguments.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Windows,
    Unix,
    Mac,
}

impl OsType {
    /// Operating system this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsType::Windows
        } else if cfg!(target_os = "macos") {
            OsType::Mac
        } else {
            OsType::Unix
        }
    }
}

pub trait VirtualContext: Send + Sync {
    /// Whether processes run under a path-virtualization layer.
    fn is_virtual(&self) -> bool;

    /// Operating system the processes run on.
    fn target_os(&self) -> OsType;

    /// Map a local path to its representation inside the execution environment.
    fn resolve_path(&self, path: &str) -> String;
}

/// Processes run directly on the agent; paths are used as they are.
#[derive(Debug, Clone)]
pub struct HostContext {
    os: OsType,
}

impl HostContext {
    pub fn new() -> Self {
        Self { os: OsType::current() }
    }

    pub fn with_os(os: OsType) -> Self {
        Self { os }
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualContext for HostContext {
    fn is_virtual(&self) -> bool {
        false
    }

    fn target_os(&self) -> OsType {
        self.os
    }

    fn resolve_path(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Processes run in a container with the agent's directory mounted at
/// `mount_point`.
#[derive(Debug, Clone)]
pub struct ContainerContext {
    os: OsType,
    host_root: String,
    mount_point: String,
}

impl ContainerContext {
    pub fn new(os: OsType, host_root: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            os,
            host_root: host_root.into(),
            mount_point: mount_point.into(),
        }
    }
}

impl VirtualContext for ContainerContext {
    fn is_virtual(&self) -> bool {
        true
    }

    fn target_os(&self) -> OsType {
        self.os
    }

    fn resolve_path(&self, path: &str) -> String {
        match path.strip_prefix(self.host_root.as_str()) {
            Some(rest) if !self.host_root.is_empty() => {
                let separator = if self.os == OsType::Windows { '\\' } else { '/' };
                let rest = rest.trim_start_matches(['/', '\\']);
                if rest.is_empty() {
                    self.mount_point.clone()
                } else {
                    format!(
                        "{}{}{}",
                        self.mount_point.trim_end_matches(['/', '\\']),
                        separator,
                        rest
                    )
                }
            }
            _ => path.to_string(),
        }
    }
}
