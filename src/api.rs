use async_trait::async_trait;
use gloo_net::http::Request;

use crate::config::WidgetConfig;
use crate::error::ApiError;
use crate::protocol::{
    ChatRequest, ChatResponse, HistoryResponse, NewSessionResponse, VisitPing, WireMessage,
};

/// The remote chat service, one method per endpoint. Injectable so the
/// controller can be exercised against a scripted fake.
#[async_trait(?Send)]
pub trait ChatBackend {
    /// `GET /api/new_session`: mint a fresh session identifier.
    async fn new_session(&self) -> Result<String, ApiError>;

    /// `GET /api/history?session_id=..`: full transcript, server order.
    async fn history(&self, session_id: &str) -> Result<Vec<WireMessage>, ApiError>;

    /// `POST /api/chat`: send one message, wait for the reply text.
    async fn chat(
        &self,
        session_id: &str,
        message: &str,
        image_urls: &[String],
    ) -> Result<String, ApiError>;

    /// `POST /api/track_visit`: fire-and-forget page-view ping.
    async fn track_visit(&self, visitor_id: &str, page: &str) -> Result<(), ApiError>;
}

/// `gloo-net` implementation used in the browser.
pub struct HttpBackend {
    config: WidgetConfig,
}

impl HttpBackend {
    pub fn new(config: WidgetConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl ChatBackend for HttpBackend {
    async fn new_session(&self) -> Result<String, ApiError> {
        let response = Request::get(&self.config.endpoint("/api/new_session"))
            .send()
            .await
            .map_err(transport)?;
        if !response.ok() {
            return Err(ApiError::Status(response.status()));
        }
        let body: NewSessionResponse = response.json().await.map_err(decode)?;
        Ok(body.session_id)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<WireMessage>, ApiError> {
        let url = format!(
            "{}?session_id={}",
            self.config.endpoint("/api/history"),
            session_id
        );
        let response = Request::get(&url).send().await.map_err(transport)?;
        if !response.ok() {
            return Err(ApiError::Status(response.status()));
        }
        let body: HistoryResponse = response.json().await.map_err(decode)?;
        Ok(body.messages.unwrap_or_default())
    }

    async fn chat(
        &self,
        session_id: &str,
        message: &str,
        image_urls: &[String],
    ) -> Result<String, ApiError> {
        let request = ChatRequest {
            session_id,
            message,
            image_urls: if image_urls.is_empty() {
                None
            } else {
                Some(image_urls)
            },
        };
        let response = Request::post(&self.config.endpoint("/api/chat"))
            .json(&request)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        if !response.ok() {
            return Err(ApiError::Status(response.status()));
        }
        let body: ChatResponse = response.json().await.map_err(decode)?;
        Ok(body.reply)
    }

    async fn track_visit(&self, visitor_id: &str, page: &str) -> Result<(), ApiError> {
        let ping = VisitPing { visitor_id, page };
        let response = Request::post(&self.config.endpoint("/api/track_visit"))
            .json(&ping)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        if !response.ok() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(())
    }
}

fn transport(err: gloo_net::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn decode(err: gloo_net::Error) -> ApiError {
    ApiError::Decode(err.to_string())
}
