//! LLM client trait and the scripted mock used by tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{DealflowError, Result};
use crate::llm::types::{CompletionRequest, CompletionResponse, Usage};

/// Stateless LLM client. Each call is independent and returns a complete
/// result or an error; the pipeline never consumes partial output.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Scripted entry for the mock: a canned reply or a simulated failure.
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    Failure(String),
}

/// Mock client that replays scripted responses in order.
///
/// Requests beyond the script return a collaborator failure, which makes
/// tests that under-script fail loudly instead of silently looping.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor from plain reply strings.
    pub fn with_contents(contents: Vec<&str>) -> Self {
        Self::new(contents.into_iter().map(|c| MockReply::Content(c.to_string())).collect())
    }

    /// Requests seen so far, for asserting on prompts.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(MockReply::Content(content)) => Ok(CompletionResponse {
                content,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 10,
                },
            }),
            Some(MockReply::Failure(message)) => Err(DealflowError::collaborator("mock", message)),
            None => Err(DealflowError::collaborator("mock", "script exhausted")),
        }
    }
}
