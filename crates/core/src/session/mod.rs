use std::collections::HashMap;

/// Key the scroll memo is stored under across a reload.
pub const SCROLL_POSITION_KEY: &str = "scrollPosition";

/// Ephemeral per-tab key/value storage.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }
}

pub fn save_scroll_position(store: &mut impl SessionStore, offset: f64) {
    store.set(SCROLL_POSITION_KEY, format!("{offset}"));
}

/// Reads and clears the memo. Unparseable values are dropped.
pub fn take_scroll_position(store: &mut impl SessionStore) -> Option<f64> {
    let raw = store.remove(SCROLL_POSITION_KEY)?;
    match raw.trim().parse::<f64>() {
        Ok(offset) if offset.is_finite() => Some(offset.max(0.0)),
        _ => {
            tracing::debug!(%raw, "discarding malformed scroll memo");
            None
        }
    }
}
