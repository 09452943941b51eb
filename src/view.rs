use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

use crate::dom;
use crate::markdown;
use crate::protocol::Sender;

/// The conversation surface the controller renders into. Entries are
/// append-only; the typing placeholder occupies a single fixed slot and is
/// gone no later than the next append.
pub trait ConversationView {
    fn append(&self, sender: Sender, text: &str);
    fn show_typing(&self);
    fn hide_typing(&self);
    fn clear(&self);
}

const TYPING_ID: &str = "typingIndicator";

/// DOM-backed view rendering into the message container element.
///
/// Assistant text is expanded from markdown; everything else is escaped and
/// inserted literally.
pub struct DomView {
    document: Document,
    container: Element,
}

impl DomView {
    pub fn new(document: Document, container: Element) -> Self {
        Self {
            document,
            container,
        }
    }

    fn try_append(&self, sender: Sender, text: &str) -> Result<(), JsValue> {
        self.hide_typing();

        let entry = self.document.create_element("div")?;
        entry.set_class_name(&format!("message {}", sender.css_class()));

        match sender {
            Sender::Assistant => {
                entry.set_inner_html(&format!(
                    r#"<div class="message-role">{}</div><div class="message-content markdown">{}</div>"#,
                    sender.label(),
                    markdown::render_markdown(text)
                ));
            }
            Sender::User => {
                entry.set_inner_html(&format!(
                    r#"<div class="message-role">{}</div><div class="message-content">{}</div>"#,
                    sender.label(),
                    markdown::plain_text_html(text)
                ));
            }
            Sender::System => {
                entry.set_text_content(Some(text));
            }
        }

        self.container.append_child(&entry)?;
        dom::scroll_to_latest(&self.container);
        Ok(())
    }

    fn try_show_typing(&self) -> Result<(), JsValue> {
        self.hide_typing();

        let entry = self.document.create_element("div")?;
        entry.set_id(TYPING_ID);
        entry.set_class_name("message typing");
        entry.set_text_content(Some("Thinking"));

        self.container.append_child(&entry)?;
        dom::scroll_to_latest(&self.container);
        Ok(())
    }
}

impl ConversationView for DomView {
    fn append(&self, sender: Sender, text: &str) {
        if let Err(err) = self.try_append(sender, text) {
            log::error!("failed to render message: {:?}", err);
        }
    }

    fn show_typing(&self) {
        if let Err(err) = self.try_show_typing() {
            log::error!("failed to render typing indicator: {:?}", err);
        }
    }

    fn hide_typing(&self) {
        if let Some(existing) = self.document.get_element_by_id(TYPING_ID) {
            existing.remove();
        }
    }

    fn clear(&self) {
        self.container.set_inner_html("");
    }
}
