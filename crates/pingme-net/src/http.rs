//! REST implementation of [`ChatApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use pingme_shared::{Message, Thread, ThreadId};

use crate::api::ChatApi;
use crate::dto::{CreateThreadRequest, MessageDto, SendMessageRequest, ThreadDto};
use crate::error::{NetError, Result};

/// Client for the chat routes (`…/api/chat/`).
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
    /// Bearer access token obtained by the surrounding auth layer.
    token: Option<String>,
}

impl HttpChatApi {
    /// Build a client rooted at `base_url`.
    ///
    /// A missing trailing slash is added so relative routes join under it.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url =
            Url::parse(&normalized).map_err(|e| NetError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NetError::from_reqwest)?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| NetError::InvalidUrl(format!("{path}: {e}")))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(NetError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat API request rejected");
            return Err(NetError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(NetError::from_reqwest)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let url = self.endpoint("")?;
        let threads: Vec<ThreadDto> = self.execute(self.client.get(url)).await?;
        debug!(count = threads.len(), "Fetched thread list");
        Ok(threads.into_iter().map(Thread::from).collect())
    }

    async fn list_messages(&self, thread_id: ThreadId) -> Result<Vec<Message>> {
        let url = self.endpoint(&format!("{}messages/", thread_id.to_path()))?;
        let dtos: Vec<MessageDto> = self.execute(self.client.get(url)).await?;

        let mut messages = Vec::with_capacity(dtos.len());
        for dto in dtos {
            match Message::try_from(dto) {
                Ok(m) => messages.push(m),
                Err(e) => debug!(thread = %thread_id, error = %e, "Skipping message"),
            }
        }
        debug!(thread = %thread_id, count = messages.len(), "Fetched transcript");
        Ok(messages)
    }

    async fn send_message(&self, thread_id: ThreadId, text: &str) -> Result<Message> {
        let url = self.endpoint(&format!("{}send/", thread_id.to_path()))?;
        let req = self.client.post(url).json(&SendMessageRequest { text });
        let dto: MessageDto = self.execute(req).await?;
        Ok(Message::try_from(dto)?)
    }

    async fn open_direct_thread(&self, username: &str) -> Result<Thread> {
        let url = self.endpoint("create/")?;
        let req = self.client.post(url).json(&CreateThreadRequest { username });
        let dto: ThreadDto = self.execute(req).await?;
        Ok(Thread::from(dto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpChatApi {
        HttpChatApi::new(base, None, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = api("http://localhost:8000/api/chat");
        assert_eq!(api.base_url().as_str(), "http://localhost:8000/api/chat/");
    }

    #[test]
    fn test_endpoints_join_under_base() {
        let api = api("http://localhost:8000/api/chat/");
        let messages = api
            .endpoint(&format!("{}messages/", ThreadId(4).to_path()))
            .unwrap();
        assert_eq!(messages.as_str(), "http://localhost:8000/api/chat/4/messages/");
        assert_eq!(
            api.endpoint("create/").unwrap().as_str(),
            "http://localhost:8000/api/chat/create/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpChatApi::new("not a url", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, NetError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let api = api("http://127.0.0.1:1/api/chat/");
        assert!(api.list_threads().await.is_err());
    }
}
