use std::rc::Rc;

use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;
use web_sys::Document;

use crate::api::HttpBackend;
use crate::config::WidgetConfig;
use crate::controller::ChatController;
use crate::dom;
use crate::storage::BrowserStorage;
use crate::view::DomView;

/// Element ids the host page must provide.
pub const TOGGLE_BUTTON_ID: &str = "chatToggle";
pub const PANEL_ID: &str = "chatPanel";
pub const CLOSE_BUTTON_ID: &str = "closeButton";
pub const REFRESH_BUTTON_ID: &str = "refreshButton";
pub const MESSAGES_CONTAINER_ID: &str = "messagesContainer";
pub const MESSAGE_INPUT_ID: &str = "messageInput";
pub const SEND_BUTTON_ID: &str = "sendButton";

pub type WidgetController = ChatController<HttpBackend, BrowserStorage, DomView>;

/// Binds the controller to the host page: element lookup, event listeners,
/// input enable/disable around each send.
pub struct ChatWidget {
    document: Document,
    controller: Rc<WidgetController>,
}

impl ChatWidget {
    pub fn new(config: WidgetConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("No document"))?;

        let container = dom::get_element_by_id(&document, MESSAGES_CONTAINER_ID)?;
        let backend = HttpBackend::new(config.clone());
        let storage = BrowserStorage::new()?;
        let view = DomView::new(document.clone(), container);
        let controller = Rc::new(ChatController::new(config, backend, storage, view));

        Ok(Self {
            document,
            controller,
        })
    }

    pub async fn start(self) -> Result<(), JsValue> {
        self.wire_panel_toggle()?;
        self.wire_reset()?;
        self.wire_send()?;

        self.controller.init_session().await;
        if let Some(page) = current_page() {
            self.controller.record_visit(&page).await;
        }
        Ok(())
    }

    fn wire_panel_toggle(&self) -> Result<(), JsValue> {
        let toggle = dom::get_html_element_by_id(&self.document, TOGGLE_BUTTON_ID)?;
        let close = dom::get_html_element_by_id(&self.document, CLOSE_BUTTON_ID)?;

        let document = self.document.clone();
        dom::add_click_listener(&toggle, move || {
            if let Err(err) = open_panel(&document) {
                log::error!("failed to open chat panel: {:?}", err);
            }
        })?;

        let document = self.document.clone();
        dom::add_click_listener(&close, move || {
            if let Err(err) = close_panel(&document) {
                log::error!("failed to close chat panel: {:?}", err);
            }
        })?;

        Ok(())
    }

    fn wire_reset(&self) -> Result<(), JsValue> {
        let refresh = dom::get_element_by_id(&self.document, REFRESH_BUTTON_ID)?;
        let controller = self.controller.clone();

        dom::add_click_listener(&refresh, move || {
            let controller = controller.clone();
            spawn_local(async move {
                controller.reset_session().await;
            });
        })?;

        Ok(())
    }

    fn wire_send(&self) -> Result<(), JsValue> {
        let send = dom::get_element_by_id(&self.document, SEND_BUTTON_ID)?;
        let controller = self.controller.clone();
        let document = self.document.clone();

        dom::add_click_listener(&send, move || {
            let controller = controller.clone();
            let document = document.clone();
            spawn_local(async move {
                submit(controller, document).await;
            });
        })?;

        let input = dom::get_input_by_id(&self.document, MESSAGE_INPUT_ID)?;
        let controller = self.controller.clone();
        let document = self.document.clone();

        dom::add_keydown_listener(&input, move |event: web_sys::KeyboardEvent| {
            if event.key() == "Enter" && !event.shift_key() {
                event.prevent_default();
                let controller = controller.clone();
                let document = document.clone();
                spawn_local(async move {
                    submit(controller, document).await;
                });
            }
        })?;

        Ok(())
    }
}

fn open_panel(document: &Document) -> Result<(), JsValue> {
    let panel = dom::get_html_element_by_id(document, PANEL_ID)?;
    let toggle = dom::get_html_element_by_id(document, TOGGLE_BUTTON_ID)?;
    dom::show_element(&panel);
    dom::hide_element(&toggle);
    let input = dom::get_input_by_id(document, MESSAGE_INPUT_ID)?;
    let _ = input.focus();
    Ok(())
}

fn close_panel(document: &Document) -> Result<(), JsValue> {
    let panel = dom::get_html_element_by_id(document, PANEL_ID)?;
    let toggle = dom::get_html_element_by_id(document, TOGGLE_BUTTON_ID)?;
    dom::hide_element(&panel);
    dom::show_element(&toggle);
    Ok(())
}

async fn submit(controller: Rc<WidgetController>, document: Document) {
    if let Err(err) = try_submit(controller, document).await {
        log::error!("failed to send message: {:?}", err);
    }
}

async fn try_submit(
    controller: Rc<WidgetController>,
    document: Document,
) -> Result<(), JsValue> {
    let input = dom::get_input_by_id(&document, MESSAGE_INPUT_ID)?;
    let send = dom::get_button_by_id(&document, SEND_BUTTON_ID)?;

    let raw = input.value();
    if raw.trim().is_empty() {
        return Ok(());
    }

    input.set_value("");
    input.set_disabled(true);
    send.set_disabled(true);

    controller.send_message(&raw).await;

    // Cleanup runs for every outcome; send_message never unwinds.
    input.set_disabled(false);
    send.set_disabled(false);
    let _ = input.focus();

    Ok(())
}

fn current_page() -> Option<String> {
    web_sys::window()?.location().pathname().ok()
}
