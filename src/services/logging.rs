//! Build Log
//!
//! The human-facing log of a build step. It is separate from `tracing`,
//! which carries the runner's own diagnostics.
//!
//! ## Rendering
//!
//! Styled fragments are rendered with ANSI escapes: switching to a color
//! emits `ESC[<code>m`, switching back to the default color emits `ESC[0m`,
//! neighbouring fragments of the same color share one escape, and nothing is
//! appended after the last fragment.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dotnet_workflow_core::{Color, StdOutText, Subscription};

use crate::models::BuildProblem;

// ============================================================================
// Logger Service
// ============================================================================

pub trait LoggerService: Send + Sync {
    fn write_standard_output(&self, text: &[StdOutText]);

    fn write_warning(&self, text: &str);

    fn write_error_output(&self, text: &str);

    /// Diagnostics that stay out of the visible log.
    fn write_trace(&self, text: &str);

    /// Report a problem that fails the step. A problem whose identity was
    /// already reported is ignored.
    fn write_build_problem(&self, problem: BuildProblem);

    /// Open a collapsible group. Dropping the subscription closes it.
    fn write_block(&self, name: &str) -> Subscription;

    /// Problems reported so far, in report order.
    fn build_problems(&self) -> Vec<BuildProblem>;
}

// ============================================================================
// Color Theme
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorTheme {
    #[default]
    Ansi,
    /// No escapes at all, for logs captured to files.
    Plain,
}

impl ColorTheme {
    pub fn code(self, color: Color) -> Option<&'static str> {
        if self == ColorTheme::Plain {
            return None;
        }
        match color {
            Color::Default => Some("0"),
            Color::Header => Some("35;1"),
            Color::Success => Some("32;1"),
            Color::Warning => Some("33;1"),
            Color::Error => Some("31;1"),
            Color::Details => Some("36"),
            Color::Minor => Some("90"),
        }
    }

    pub fn render(self, fragments: &[StdOutText]) -> String {
        let mut line = String::new();
        let mut current = Color::Default;
        for fragment in fragments {
            if fragment.color != current {
                if let Some(code) = self.code(fragment.color) {
                    line.push_str(&format!("\u{1b}[{}m", code));
                }
                current = fragment.color;
            }
            line.push_str(&fragment.text);
        }
        line
    }
}

// ============================================================================
// Console Logger
// ============================================================================

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

pub struct ConsoleLoggerService {
    theme: ColorTheme,
    writer: SharedWriter,
    depth: Arc<AtomicUsize>,
    problems: Mutex<Vec<BuildProblem>>,
}

impl ConsoleLoggerService {
    /// Log to the process's stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            theme: ColorTheme::default(),
            writer: Arc::new(Mutex::new(writer)),
            depth: Arc::new(AtomicUsize::new(0)),
            problems: Mutex::new(Vec::new()),
        }
    }

    pub fn with_theme(mut self, theme: ColorTheme) -> Self {
        self.theme = theme;
        self
    }

    fn write_line(&self, fragments: &[StdOutText]) {
        write_indented(&self.writer, self.depth.load(Ordering::SeqCst), &self.theme.render(fragments));
    }
}

impl Default for ConsoleLoggerService {
    fn default() -> Self {
        Self::new()
    }
}

fn write_indented(writer: &SharedWriter, depth: usize, line: &str) {
    let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
    // write failures are not fatal
    if let Err(e) = writeln!(writer, "{}{}", "  ".repeat(depth), line) {
        tracing::debug!("[ConsoleLogger] Failed to write: {}", e);
    }
}

impl LoggerService for ConsoleLoggerService {
    fn write_standard_output(&self, text: &[StdOutText]) {
        self.write_line(text);
    }

    fn write_warning(&self, text: &str) {
        self.write_line(&[StdOutText::colored(text, Color::Warning)]);
    }

    fn write_error_output(&self, text: &str) {
        self.write_line(&[StdOutText::colored(text, Color::Error)]);
    }

    fn write_trace(&self, text: &str) {
        tracing::trace!("[BuildLog] {}", text);
    }

    fn write_build_problem(&self, problem: BuildProblem) {
        {
            let mut problems = self.problems.lock().unwrap_or_else(|e| e.into_inner());
            if problems.iter().any(|p| p.identity == problem.identity) {
                tracing::debug!("[ConsoleLogger] Build problem {} already reported", problem.identity);
                return;
            }
            problems.push(problem.clone());
        }

        self.write_line(&[
            StdOutText::colored("Build problem: ", Color::Error),
            StdOutText::colored(problem.description, Color::Error),
            StdOutText::colored(format!(" ({})", problem.identity), Color::Minor),
        ]);
    }

    fn write_block(&self, name: &str) -> Subscription {
        self.write_line(&[StdOutText::colored(name, Color::Header)]);
        self.depth.fetch_add(1, Ordering::SeqCst);

        let depth = self.depth.clone();
        Subscription::on_drop(move || {
            depth.fetch_sub(1, Ordering::SeqCst);
        })
    }

    fn build_problems(&self) -> Vec<BuildProblem> {
        self.problems.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
