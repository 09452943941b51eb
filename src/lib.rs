use wasm_bindgen::prelude::*;

mod api;
mod config;
mod controller;
mod dom;
mod error;
mod markdown;
mod protocol;
mod storage;
mod view;
mod widget;

pub use api::{ChatBackend, HttpBackend};
pub use config::WidgetConfig;
pub use controller::ChatController;
pub use error::ApiError;
pub use protocol::{
    ChatRequest, ChatResponse, HistoryResponse, NewSessionResponse, Sender, VisitPing,
    WireMessage,
};
pub use storage::{BrowserStorage, MemoryStorage, SessionStorage};
pub use view::{ConversationView, DomView};
pub use widget::ChatWidget;

/// Module initialization: panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    log::info!("chat panel module loaded");
}

/// Entry point for the host page. Wires the widget into the DOM and
/// restores or creates the chat session.
///
/// `api_base` overrides the backend origin; `None` keeps every endpoint
/// same-origin.
#[wasm_bindgen]
pub async fn start_widget(api_base: Option<String>) -> Result<(), JsValue> {
    let config = WidgetConfig::new(api_base);
    widget::ChatWidget::new(config)?.start().await
}
