/// Widget configuration. The host page can point the widget at a different
/// origin; by default all endpoints are same-origin relative paths.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Base URL prepended to every endpoint path. Empty means same-origin.
    pub api_base: String,
    /// localStorage key holding the session identifier.
    pub storage_key: String,
}

pub const DEFAULT_STORAGE_KEY: &str = "chat_session_id";

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl WidgetConfig {
    pub fn new(api_base: Option<String>) -> Self {
        let api_base = api_base
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_default();
        Self {
            api_base,
            ..Self::default()
        }
    }

    /// Full URL for an endpoint path such as `/api/chat`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}
