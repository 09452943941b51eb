use serde::{Deserialize, Serialize};

/// Who authored a rendered chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    /// Map the sender strings the history endpoint produces onto a typed
    /// sender. Unknown labels render as system entries rather than being
    /// dropped.
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "you" | "user" => Sender::User,
            "ai" | "assistant" => Sender::Assistant,
            _ => Sender::System,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "system",
        }
    }

    /// Label shown next to the message bubble.
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "AI",
            Sender::System => "",
        }
    }
}

/// `GET /api/new_session` response.
#[derive(Debug, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
}

/// One entry of the `GET /api/history` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
}

/// `GET /api/history` response. The server omits `messages` for sessions it
/// does not know about; both absent and null mean "empty".
#[derive(Debug, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
}

/// `POST /api/chat` request body.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<&'a [String]>,
}

/// `POST /api/chat` response.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// `POST /api/track_visit` request body. The widget reuses the session
/// identifier as the visitor identifier.
#[derive(Debug, Serialize)]
pub struct VisitPing<'a> {
    pub visitor_id: &'a str,
    pub page: &'a str,
}
