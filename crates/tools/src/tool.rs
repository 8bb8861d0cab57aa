//! Tool Catalogue
//!
//! Known build tools (Visual Studio, MSBuild, VSTest) with their version,
//! platform and bitness. Every tool has a stable id such as
//! `MSBuild_16_Windows_x64` or `VSTest_CrossPlatform` that configuration
//! refers to.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolType {
    VisualStudio,
    MSBuild,
    VSTest,
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolType::VisualStudio => write!(f, "VisualStudio"),
            ToolType::MSBuild => write!(f, "MSBuild"),
            ToolType::VSTest => write!(f, "VSTest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolPlatform {
    Windows,
    CrossPlatform,
    Mono,
}

impl fmt::Display for ToolPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolPlatform::Windows => write!(f, "Windows"),
            ToolPlatform::CrossPlatform => write!(f, "CrossPlatform"),
            ToolPlatform::Mono => write!(f, "Mono"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolBitness {
    Any,
    X64,
    X86,
}

impl fmt::Display for ToolBitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolBitness::Any => write!(f, "Any"),
            ToolBitness::X64 => write!(f, "x64"),
            ToolBitness::X86 => write!(f, "x86"),
        }
    }
}

// ============================================================================
// Tool
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    VisualStudioAny,
    VisualStudio2019,
    VisualStudio2017,
    VisualStudio2015,
    VisualStudio2013,
    VisualStudio2012,
    VisualStudio2010,

    MSBuildCrossPlatform,
    MSBuildMono,
    MSBuild16Windows,
    MSBuild16WindowsX64,
    MSBuild16WindowsX86,
    MSBuild15Windows,
    MSBuild15WindowsX64,
    MSBuild15WindowsX86,
    MSBuild14Windows,
    MSBuild14WindowsX64,
    MSBuild14WindowsX86,
    MSBuild12Windows,
    MSBuild12WindowsX64,
    MSBuild12WindowsX86,
    MSBuild4Windows,
    MSBuild4WindowsX64,
    MSBuild4WindowsX86,

    VSTestCrossPlatform,
    VSTest16Windows,
    VSTest15Windows,
    VSTest14Windows,
    VSTest12Windows,
}

/// Static attributes of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolInfo {
    pub version: u32,
    pub tool_type: ToolType,
    pub platform: ToolPlatform,
    pub bitness: ToolBitness,
    pub description: &'static str,
    /// Visual Studio release year, 0 when unrelated to Visual Studio.
    pub vs_version: u32,
}

const fn info(
    version: u32,
    tool_type: ToolType,
    platform: ToolPlatform,
    bitness: ToolBitness,
    description: &'static str,
    vs_version: u32,
) -> ToolInfo {
    ToolInfo {
        version,
        tool_type,
        platform,
        bitness,
        description,
        vs_version,
    }
}

impl Tool {
    pub const ALL: [Tool; 29] = [
        Tool::VisualStudioAny,
        Tool::VisualStudio2019,
        Tool::VisualStudio2017,
        Tool::VisualStudio2015,
        Tool::VisualStudio2013,
        Tool::VisualStudio2012,
        Tool::VisualStudio2010,
        Tool::MSBuildCrossPlatform,
        Tool::MSBuildMono,
        Tool::MSBuild16Windows,
        Tool::MSBuild16WindowsX64,
        Tool::MSBuild16WindowsX86,
        Tool::MSBuild15Windows,
        Tool::MSBuild15WindowsX64,
        Tool::MSBuild15WindowsX86,
        Tool::MSBuild14Windows,
        Tool::MSBuild14WindowsX64,
        Tool::MSBuild14WindowsX86,
        Tool::MSBuild12Windows,
        Tool::MSBuild12WindowsX64,
        Tool::MSBuild12WindowsX86,
        Tool::MSBuild4Windows,
        Tool::MSBuild4WindowsX64,
        Tool::MSBuild4WindowsX86,
        Tool::VSTestCrossPlatform,
        Tool::VSTest16Windows,
        Tool::VSTest15Windows,
        Tool::VSTest14Windows,
        Tool::VSTest12Windows,
    ];

    pub fn info(self) -> ToolInfo {
        use ToolBitness::*;
        use ToolPlatform::*;
        use ToolType::*;

        match self {
            Tool::VisualStudioAny => info(0, VisualStudio, Windows, Any, "Any", 0),
            Tool::VisualStudio2019 => info(16, VisualStudio, Windows, Any, "Visual Studio 2019", 2019),
            Tool::VisualStudio2017 => info(15, VisualStudio, Windows, Any, "Visual Studio 2017", 2017),
            Tool::VisualStudio2015 => info(14, VisualStudio, Windows, Any, "Visual Studio 2015", 2015),
            Tool::VisualStudio2013 => info(12, VisualStudio, Windows, Any, "Visual Studio 2013", 2013),
            Tool::VisualStudio2012 => info(11, VisualStudio, Windows, Any, "Visual Studio 2012", 2012),
            Tool::VisualStudio2010 => info(10, VisualStudio, Windows, Any, "Visual Studio 2010", 2010),

            Tool::MSBuildCrossPlatform => info(0, MSBuild, CrossPlatform, Any, "Cross-platform MSBuild", 0),
            Tool::MSBuildMono => info(0, MSBuild, Mono, Any, "Mono MSBuild", 0),
            Tool::MSBuild16Windows => info(16, MSBuild, Windows, Any, "MSBuild 2019", 2019),
            Tool::MSBuild16WindowsX64 => info(16, MSBuild, Windows, X64, "MSBuild 2019 x64", 2019),
            Tool::MSBuild16WindowsX86 => info(16, MSBuild, Windows, X86, "MSBuild 2019 x86", 2019),
            Tool::MSBuild15Windows => info(15, MSBuild, Windows, Any, "MSBuild 2017", 2017),
            Tool::MSBuild15WindowsX64 => info(15, MSBuild, Windows, X64, "MSBuild 2017 x64", 2017),
            Tool::MSBuild15WindowsX86 => info(15, MSBuild, Windows, X86, "MSBuild 2017 x86", 2017),
            Tool::MSBuild14Windows => info(14, MSBuild, Windows, Any, "MSBuild 2015", 2015),
            Tool::MSBuild14WindowsX64 => info(14, MSBuild, Windows, X64, "MSBuild 2015 x64", 2015),
            Tool::MSBuild14WindowsX86 => info(14, MSBuild, Windows, X86, "MSBuild 2015 x86", 2015),
            Tool::MSBuild12Windows => info(12, MSBuild, Windows, Any, "MSBuild 2013", 2013),
            Tool::MSBuild12WindowsX64 => info(12, MSBuild, Windows, X64, "MSBuild 2013 x64", 2013),
            Tool::MSBuild12WindowsX86 => info(12, MSBuild, Windows, X86, "MSBuild 2013 x86", 2013),
            Tool::MSBuild4Windows => info(4, MSBuild, Windows, Any, "MSBuild 4", 2010),
            Tool::MSBuild4WindowsX64 => info(4, MSBuild, Windows, X64, "MSBuild 4 x64", 2010),
            Tool::MSBuild4WindowsX86 => info(4, MSBuild, Windows, X86, "MSBuild 4 x86", 2010),

            Tool::VSTestCrossPlatform => info(0, VSTest, CrossPlatform, Any, "Cross-platform VSTest", 0),
            Tool::VSTest16Windows => info(16, VSTest, Windows, Any, "VSTest 2019", 2019),
            Tool::VSTest15Windows => info(15, VSTest, Windows, Any, "VSTest 2017", 2017),
            Tool::VSTest14Windows => info(14, VSTest, Windows, Any, "VSTest 2015", 2015),
            Tool::VSTest12Windows => info(12, VSTest, Windows, Any, "VSTest 2013", 2013),
        }
    }

    /// Stable identifier: type, version (when non-zero), platform and
    /// bitness (when not `Any`) joined with `_`.
    pub fn id(self) -> String {
        let info = self.info();
        let mut id = info.tool_type.to_string();
        if info.version != 0 {
            id.push_str(&format!("_{}", info.version));
        }
        id.push_str(&format!("_{}", info.platform));
        if info.bitness != ToolBitness::Any {
            id.push_str(&format!("_{}", info.bitness));
        }
        id
    }

    /// Case-insensitive lookup by [`Tool::id`].
    pub fn try_parse(id: &str) -> Option<Tool> {
        let id = id.trim();
        Tool::ALL.iter().copied().find(|tool| tool.id().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info().description)
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Target processor architecture passed to build tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    X86,
    X64,
    Arm,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::X86, Platform::X64, Platform::Arm];

    pub fn id(self) -> &'static str {
        match self {
            Platform::X86 => "x86",
            Platform::X64 => "x64",
            Platform::Arm => "ARM",
        }
    }

    pub fn try_parse(id: &str) -> Option<Platform> {
        let id = id.trim();
        Platform::ALL.iter().copied().find(|p| p.id().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tool_ids() {
        assert_eq!(Tool::MSBuild16WindowsX64.id(), "MSBuild_16_Windows_x64");
        assert_eq!(Tool::MSBuildCrossPlatform.id(), "MSBuild_CrossPlatform");
        assert_eq!(Tool::VSTest15Windows.id(), "VSTest_15_Windows");
        assert_eq!(Tool::VisualStudioAny.id(), "VisualStudio_Windows");
    }

    #[test]
    fn test_tool_ids_are_unique() {
        let ids: HashSet<String> = Tool::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), Tool::ALL.len());
    }

    #[test]
    fn test_try_parse_is_case_insensitive() {
        assert_eq!(Tool::try_parse("msbuild_16_windows_X64"), Some(Tool::MSBuild16WindowsX64));
        assert_eq!(Tool::try_parse(" VSTest_CrossPlatform "), Some(Tool::VSTestCrossPlatform));
        assert_eq!(Tool::try_parse("MSBuild_99_Windows"), None);
        assert_eq!(Tool::try_parse(""), None);
    }

    #[test]
    fn test_tool_info() {
        let info = Tool::MSBuild4WindowsX86.info();
        assert_eq!(info.version, 4);
        assert_eq!(info.vs_version, 2010);
        assert_eq!(info.bitness, ToolBitness::X86);
        assert_eq!(Tool::MSBuildMono.to_string(), "Mono MSBuild");
    }

    #[test]
    fn test_platform_try_parse() {
        assert_eq!(Platform::try_parse("x64"), Some(Platform::X64));
        assert_eq!(Platform::try_parse("arm"), Some(Platform::Arm));
        assert_eq!(Platform::try_parse("X86"), Some(Platform::X86));
        assert_eq!(Platform::try_parse("mips"), None);
    }
}
