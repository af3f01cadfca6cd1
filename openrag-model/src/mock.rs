use openrag_core::{Llm, LlmRequest, LlmResponse, LlmResponseStream, OpenRagError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Arc<dyn Fn(&LlmRequest) -> Result<String> + Send + Sync>;

#[derive(Clone, Debug)]
enum Reply {
    Text(String),
    Error(String),
}

/// Scripted [`Llm`] for tests.
///
/// Replies are consumed in order, one per `generate_content` call; the last
/// reply keeps repeating once the script runs out. A handler built with
/// [`MockLlm::from_fn`] answers every call instead.
pub struct MockLlm {
    name: String,
    script: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            handler: None,
            latency: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request through `handler`.
    pub fn from_fn<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&LlmRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self { handler: Some(Arc::new(handler)), ..Self::new(name) }
    }

    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queues a model-level failure (`OpenRagError::Model`).
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Reply::Error(message.into()));
        self
    }

    /// Delays every reply, for exercising timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    fn next_reply(&self, req: &LlmRequest) -> Result<String> {
        if let Some(handler) = &self.handler {
            return handler(req);
        }

        let mut script = self
            .script
            .lock()
            .map_err(|_| OpenRagError::Model("mock script lock poisoned".to_string()))?;
        let reply = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Error(message)) => Err(OpenRagError::Model(message)),
            None => Err(OpenRagError::Model(format!("mock model '{}' has no replies", self.name))),
        }
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let text = self.next_reply(&req)?;
        let stream = async_stream::stream! {
            yield Ok(LlmResponse::text(text));
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrag_core::collect_text;

    async fn ask(mock: &MockLlm, prompt: &str) -> Result<String> {
        let stream = mock.generate_content(LlmRequest::from_prompt("mock", prompt), false).await?;
        collect_text(stream).await
    }

    #[test]
    fn test_mock_llm() {
        let mock = MockLlm::new("test-llm").with_response("hello");
        assert_eq!(mock.name(), "test-llm");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn replies_in_order_then_repeats_last() {
        let mock = MockLlm::new("m").with_response("first").with_response("second");

        assert_eq!(ask(&mock, "a").await.unwrap(), "first");
        assert_eq!(ask(&mock, "b").await.unwrap(), "second");
        assert_eq!(ask(&mock, "c").await.unwrap(), "second");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.requests()[1].contents[0].text(), "b");
    }

    #[tokio::test]
    async fn scripted_errors_surface_as_model_errors() {
        let mock = MockLlm::new("m").with_error("HTTP 503 unavailable").with_response("ok");

        assert!(matches!(ask(&mock, "a").await, Err(OpenRagError::Model(_))));
        assert_eq!(ask(&mock, "a").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn handler_sees_the_request() {
        let mock = MockLlm::from_fn("m", |req| Ok(req.contents[0].text().to_uppercase()));
        assert_eq!(ask(&mock, "cats").await.unwrap(), "CATS");
    }

    #[tokio::test]
    async fn empty_script_is_an_error() {
        let mock = MockLlm::new("m");
        assert!(ask(&mock, "a").await.is_err());
    }
}
