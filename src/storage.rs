use std::cell::RefCell;
use std::collections::HashMap;

use wasm_bindgen::JsValue;

/// Key-value persistence for the session identifier. Absence of the key
/// means "no session".
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// `window.localStorage` backed storage.
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let storage = window
            .local_storage()?
            .ok_or_else(|| JsValue::from_str("localStorage unavailable"))?;
        Ok(Self { storage })
    }
}

impl SessionStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        // Fails when storage is full or blocked; the in-memory copy still
        // works for the lifetime of the page.
        if let Err(err) = self.storage.set_item(key, value) {
            log::warn!("failed to persist session id: {:?}", err);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.storage.remove_item(key) {
            log::warn!("failed to remove persisted session id: {:?}", err);
        }
    }
}

/// In-memory storage for tests and for embedding the controller outside a
/// browser page.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}
