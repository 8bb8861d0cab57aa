//! Service Messages
//!
//! Build tools report structured events inline on stdout as
//! `##teamcity[name key='value' ...]` or `##teamcity[name 'value']`. Values
//! escape special characters with `|`.
//!
//! The [`ServiceMessagesRegister`] maps message names to handlers; the
//! execution adapter feeds it every stdout line. A [`ServiceMessageSource`]
//! exposes one message kind as an observable stream and keeps its handler
//! registered only while someone is subscribed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};

use dotnet_workflow_core::{Observer, Subject, Subscription};
use regex::Regex;

pub const TEST_FAILED: &str = "testFailed";

// ============================================================================
// Message
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    pub name: String,
    /// Value of the single-argument form.
    pub argument: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

static MESSAGE_FRAME: OnceLock<Option<Regex>> = OnceLock::new();

fn message_frame() -> Option<&'static Regex> {
    MESSAGE_FRAME
        .get_or_init(|| Regex::new(r"^##teamcity\[(?P<name>[A-Za-z][\w.\-]*)(?P<body>.*)\]$").ok())
        .as_ref()
}

impl ServiceMessage {
    /// Parse one output line. Anything that is not a well-formed service
    /// message yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = message_frame()?.captures(line.trim())?;
        let name = captures.name("name")?.as_str().to_string();
        let body = captures.name("body").map(|m| m.as_str()).unwrap_or_default();

        let mut chars = body.trim().chars().peekable();
        let mut message = ServiceMessage {
            name,
            argument: None,
            attributes: BTreeMap::new(),
        };

        if chars.peek() == Some(&'\'') {
            chars.next();
            message.argument = Some(read_value(&mut chars)?);
            return chars.all(char::is_whitespace).then_some(message);
        }

        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            if chars.peek().is_none() {
                return Some(message);
            }

            let key: String = std::iter::from_fn(|| chars.next_if(|c| *c != '=' && !c.is_whitespace())).collect();
            if key.is_empty() || chars.next() != Some('=') || chars.next() != Some('\'') {
                return None;
            }
            let value = read_value(&mut chars)?;
            message.attributes.insert(key, value);
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Read up to the closing quote, resolving `|` escapes.
fn read_value(chars: &mut impl Iterator<Item = char>) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            '\'' => return Some(value),
            '|' => value.push(match chars.next()? {
                'n' => '\n',
                'r' => '\r',
                'x' => '\u{0085}',
                'l' => '\u{2028}',
                'p' => '\u{2029}',
                other => other,
            }),
            c => value.push(c),
        }
    }
}

// ============================================================================
// Register
// ============================================================================

pub trait ServiceMessageHandler: Send + Sync {
    fn handle(&self, message: &ServiceMessage);
}

impl<F> ServiceMessageHandler for F
where
    F: Fn(&ServiceMessage) + Send + Sync,
{
    fn handle(&self, message: &ServiceMessage) {
        self(message)
    }
}

#[derive(Default)]
pub struct ServiceMessagesRegister {
    handlers: Mutex<HashMap<String, Arc<dyn ServiceMessageHandler>>>,
}

impl ServiceMessagesRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(&self, name: impl Into<String>, handler: Arc<dyn ServiceMessageHandler>) {
        let name = name.into();
        tracing::debug!("[ServiceMessages] Handler registered for {}", name);
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, handler);
    }

    pub fn remove_handler(&self, name: &str) {
        tracing::debug!("[ServiceMessages] Handler removed for {}", name);
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Hand a stdout line to the handler of its message, if any.
    /// Returns whether a handler ran.
    pub fn dispatch(&self, line: &str) -> bool {
        if !line.trim_start().starts_with("##teamcity[") {
            return false;
        }
        let Some(message) = ServiceMessage::parse(line) else {
            tracing::debug!("[ServiceMessages] Malformed service message: {}", line);
            return false;
        };

        // handlers run without the lock so they may (un)register
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&message.name)
            .cloned();
        match handler {
            Some(handler) => {
                handler.handle(&message);
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Observable stream of one message kind.
///
/// The handler is registered when the first subscriber arrives and removed
/// when the last subscription is dropped.
pub struct ServiceMessageSource {
    name: String,
    register: Arc<ServiceMessagesRegister>,
    subject: Subject<ServiceMessage>,
    subscribers: Arc<Mutex<usize>>,
}

impl ServiceMessageSource {
    pub fn new(name: impl Into<String>, register: Arc<ServiceMessagesRegister>) -> Self {
        Self {
            name: name.into(),
            register,
            subject: Subject::new(),
            subscribers: Arc::new(Mutex::new(0)),
        }
    }

    /// Source of `testFailed` messages.
    pub fn test_failures(register: Arc<ServiceMessagesRegister>) -> Self {
        Self::new(TEST_FAILED, register)
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer<ServiceMessage>>) -> Subscription {
        let inner = self.subject.subscribe(observer);
        {
            let mut count = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            *count += 1;
            if *count == 1 {
                let subject = self.subject.clone();
                self.register.register_handler(
                    self.name.clone(),
                    Arc::new(move |message: &ServiceMessage| subject.publish(&mut message.clone())),
                );
            }
        }

        let name = self.name.clone();
        let register = self.register.clone();
        let subscribers = self.subscribers.clone();
        Subscription::on_drop(move || {
            drop(inner);
            let mut count = subscribers.lock().unwrap_or_else(|e| e.into_inner());
            *count = count.saturating_sub(1);
            if *count == 0 {
                register.remove_handler(&name);
            }
        })
    }

    pub fn is_active(&self) -> bool {
        *self.subscribers.lock().unwrap_or_else(|e| e.into_inner()) > 0
    }
}
