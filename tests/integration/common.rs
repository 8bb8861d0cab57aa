//! Shared test fixtures.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use dotnet_workflow::models::BuildProblem;
use dotnet_workflow::services::logging::LoggerService;
use dotnet_workflow_core::{plain_text, StdOutText, Subscription};

// ============================================================================
// Build log
// ============================================================================

/// Logger that keeps every visible line and every trace line apart.
#[derive(Default)]
pub struct RecordingLogger {
    visible: Mutex<Vec<String>>,
    traces: Mutex<Vec<String>>,
    problems: Mutex<Vec<BuildProblem>>,
}

impl RecordingLogger {
    pub fn visible(&self) -> Vec<String> {
        self.visible.lock().unwrap().clone()
    }

    pub fn traces(&self) -> Vec<String> {
        self.traces.lock().unwrap().clone()
    }

    pub fn visible_text(&self) -> String {
        self.visible().join("\n")
    }
}

impl LoggerService for RecordingLogger {
    fn write_standard_output(&self, text: &[StdOutText]) {
        self.visible.lock().unwrap().push(plain_text(text));
    }

    fn write_warning(&self, text: &str) {
        self.visible.lock().unwrap().push(text.to_string());
    }

    fn write_error_output(&self, text: &str) {
        self.visible.lock().unwrap().push(text.to_string());
    }

    fn write_trace(&self, text: &str) {
        self.traces.lock().unwrap().push(text.to_string());
    }

    fn write_build_problem(&self, problem: BuildProblem) {
        let mut problems = self.problems.lock().unwrap();
        if !problems.iter().any(|p| p.identity == problem.identity) {
            problems.push(problem);
        }
    }

    fn write_block(&self, name: &str) -> Subscription {
        self.visible.lock().unwrap().push(name.to_string());
        Subscription::empty()
    }

    fn build_problems(&self) -> Vec<BuildProblem> {
        self.problems.lock().unwrap().clone()
    }
}

/// In-memory writer for the console logger.
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tracing capture
// ============================================================================

#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

struct MessageVisitor {
    fields: HashMap<String, String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }
}

/// Layer collecting every event for assertions.
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> (Self, Capture) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: events.clone(),
            },
            Capture { events },
        )
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor {
            fields: HashMap::new(),
        };
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.fields.remove("message").unwrap_or_default(),
        };
        self.events.lock().map(|mut events| events.push(captured)).ok();
    }
}

pub struct Capture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }
}
