//! Command line presentation for the build log.

use std::path::Path;
use std::sync::Arc;

use dotnet_workflow_core::{ArgumentType, Color, CommandLineArgument, StdOutText, VirtualContext};

pub struct CommandLinePresentationService {
    virtual_context: Arc<dyn VirtualContext>,
}

impl CommandLinePresentationService {
    pub fn new(virtual_context: Arc<dyn VirtualContext>) -> Self {
        Self { virtual_context }
    }

    /// The executable as the process sees it.
    pub fn build_executable_presentation(&self, executable: &Path) -> Vec<StdOutText> {
        let path = self.virtual_context.resolve_path(&executable.to_string_lossy());
        vec![StdOutText::colored(quote_argument(&path), Color::Header)]
    }

    pub fn build_args_presentation(&self, arguments: &[CommandLineArgument]) -> Vec<StdOutText> {
        arguments
            .iter()
            .flat_map(|argument| {
                let color = match argument.argument_type {
                    ArgumentType::Target => Color::Details,
                    ArgumentType::Mandatory | ArgumentType::Custom => Color::Default,
                };
                [StdOutText::new(" "), StdOutText::colored(quote_argument(&argument.value), color)]
            })
            .collect()
    }
}

/// Quote a value containing whitespace unless it is already quoted.
pub fn quote_argument(value: &str) -> String {
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if value.is_empty() {
        "\"\"".to_string()
    } else if !already_quoted && value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

/// Join values into one command line string.
pub fn combine_arguments<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(quote_argument)
        .collect::<Vec<_>>()
        .join(" ")
}
