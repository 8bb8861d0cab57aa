//! Single-Assignment Slot
//!
//! [`OnceSlot`] holds a value that is published at most once. The first
//! successful `publish` stores the value and runs the optional callback;
//! every later call is a no-op that returns `false`. Safe to share across
//! threads.

use std::fmt;
use std::sync::{Arc, OnceLock};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct OnceSlot<T> {
    value: Arc<OnceLock<T>>,
    callback: Option<Callback<T>>,
}

impl<T: Send + Sync + 'static> OnceSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Arc::new(OnceLock::new()),
            callback: None,
        }
    }

    /// Slot that invokes `callback` with the value when it is first published.
    pub fn with_callback(callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            value: Arc::new(OnceLock::new()),
            callback: Some(Arc::new(callback)),
        }
    }

    /// Store `value` unless a value is already present.
    pub fn publish(&self, value: T) -> bool {
        let mut stored = false;
        let current = self.value.get_or_init(|| {
            stored = true;
            value
        });

        if stored {
            if let Some(callback) = &self.callback {
                callback(current);
            }
        }

        stored
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_published(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: Send + Sync + 'static> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for OnceSlot<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OnceSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceSlot").field("value", &self.value.get()).finish()
    }
}
