//! Tool-calling agent: the general generation path.
//!
//! A bounded reasoning loop. Each round the model sees the full message
//! list and the tool catalog, then either answers or requests tool
//! invocations. Tool results are appended as labelled turns and the loop
//! continues. Tool order is model-driven; the knowledge tool's
//! description nudges the model to try it first, but nothing enforces it.

use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::history::StoredMessage;
use crate::llm::{ChatMessage, LlmProvider, ModelTurn, ToolSpec};
use crate::tools::{catalog, Tool};

use super::prompt::{non_empty_or_fallback, FALLBACK_ANSWER, SYSTEM_PROMPT};

pub struct AgentRunner {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<Arc<dyn Tool>>,
    tool_specs: Vec<ToolSpec>,
    max_rounds: usize,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<Arc<dyn Tool>>,
        max_rounds: usize,
    ) -> Self {
        let tool_specs = catalog(&tools);
        Self {
            provider,
            tools,
            tool_specs,
            max_rounds,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tool_specs.iter().map(|spec| spec.name.clone()).collect()
    }

    /// Run the loop over prior history plus the new user message and
    /// return the final answer. Exhausting the round budget is a
    /// recoverable condition that yields the fallback answer; only a
    /// failed model call is an error.
    pub async fn run(
        &self,
        history: &[StoredMessage],
        user_input: &str,
    ) -> Result<String, ApiError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        for stored in history {
            messages.push(ChatMessage {
                role: stored.role.clone(),
                content: stored.content.clone(),
            });
        }
        messages.push(ChatMessage::user(user_input));

        for round in 0..self.max_rounds {
            let turn = self
                .provider
                .chat_with_tools(&messages, &self.tool_specs)
                .await?;

            match turn {
                ModelTurn::Final(answer) => {
                    return Ok(non_empty_or_fallback(answer));
                }
                ModelTurn::ToolCalls(calls) => {
                    tracing::debug!(
                        round = round + 1,
                        calls = calls.len(),
                        "Agent requested tool invocations"
                    );
                    for call in calls {
                        let result = self.invoke_tool(&call.name, &call.query).await;
                        messages.push(ChatMessage::tool(format!(
                            "Tool `{}` result for \"{}\":\n{}",
                            call.name, call.query, result
                        )));
                    }
                }
            }
        }

        tracing::warn!(
            max_rounds = self.max_rounds,
            "Agent exceeded tool-call round budget; returning fallback"
        );
        Ok(FALLBACK_ANSWER.to_string())
    }

    /// A failed or unknown tool is never fatal: the model proceeds with
    /// an empty result.
    async fn invoke_tool(&self, name: &str, query: &str) -> String {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == name) else {
            tracing::warn!("Model requested unknown tool `{}`", name);
            return String::new();
        };

        match tool.invoke(query).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("Tool `{}` failed: {}", name, err);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Replays a scripted sequence of model turns.
    struct ScriptedProvider {
        turns: Mutex<Vec<ModelTurn>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(turns: Vec<ModelTurn>) -> Self {
            Self {
                turns: Mutex::new(turns),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn model_id(&self) -> &str {
            "test-model"
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, ApiError> {
            unreachable!("agent uses chat_with_tools")
        }

        async fn chat_with_tools(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ModelTurn, ApiError> {
            self.seen.lock().expect("lock").push(messages.to_vec());
            let mut turns = self.turns.lock().expect("lock");
            if turns.is_empty() {
                return Ok(ModelTurn::ToolCalls(vec![ToolCall {
                    name: "echo".to_string(),
                    query: "again".to_string(),
                }]));
            }
            Ok(turns.remove(0))
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|_| vec![1.0]).collect())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes the query"
        }

        async fn invoke(&self, query: &str) -> Result<String, ApiError> {
            Ok(format!("echo: {}", query))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _query: &str) -> Result<String, ApiError> {
            Err(ApiError::Internal("boom".to_string()))
        }
    }

    fn runner(provider: Arc<ScriptedProvider>) -> AgentRunner {
        AgentRunner::new(
            provider,
            vec![Arc::new(EchoTool), Arc::new(FailingTool)],
            5,
        )
    }

    #[tokio::test]
    async fn answers_directly_without_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelTurn::Final(
            "Just tap Book.".to_string(),
        )]));
        let agent = runner(provider);

        let answer = agent.run(&[], "How do I book?").await.expect("run");
        assert_eq!(answer, "Just tap Book.");
    }

    #[tokio::test]
    async fn tool_round_feeds_result_back_to_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelTurn::ToolCalls(vec![ToolCall {
                name: "echo".to_string(),
                query: "booking steps".to_string(),
            }]),
            ModelTurn::Final("Based on the tool output, tap Book.".to_string()),
        ]));
        let agent = runner(provider.clone());

        let answer = agent.run(&[], "How do I book?").await.expect("run");
        assert_eq!(answer, "Based on the tool output, tap Book.");

        let seen = provider.seen.lock().expect("lock").clone();
        assert_eq!(seen.len(), 2);
        let tool_turn = seen[1].last().expect("tool turn");
        assert_eq!(tool_turn.role, "tool");
        assert!(tool_turn.content.contains("echo: booking steps"));
    }

    #[tokio::test]
    async fn history_precedes_the_new_user_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelTurn::Final(
            "ok".to_string(),
        )]));
        let agent = runner(provider.clone());

        let history = vec![
            StoredMessage {
                role: "user".to_string(),
                content: "earlier question".to_string(),
                timestamp: Utc::now(),
            },
            StoredMessage {
                role: "assistant".to_string(),
                content: "earlier answer".to_string(),
                timestamp: Utc::now(),
            },
        ];
        agent.run(&history, "follow-up").await.expect("run");

        let seen = provider.seen.lock().expect("lock").clone();
        let messages = &seen[0];
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert_eq!(messages[3].content, "follow-up");
    }

    #[tokio::test]
    async fn failed_tool_is_replaced_with_empty_result() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelTurn::ToolCalls(vec![ToolCall {
                name: "broken".to_string(),
                query: "q".to_string(),
            }]),
            ModelTurn::Final("answered anyway".to_string()),
        ]));
        let agent = runner(provider);

        let answer = agent.run(&[], "q").await.expect("run");
        assert_eq!(answer, "answered anyway");
    }

    #[tokio::test]
    async fn unknown_tool_is_tolerated() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelTurn::ToolCalls(vec![ToolCall {
                name: "no_such_tool".to_string(),
                query: "q".to_string(),
            }]),
            ModelTurn::Final("still fine".to_string()),
        ]));
        let agent = runner(provider);

        let answer = agent.run(&[], "q").await.expect("run");
        assert_eq!(answer, "still fine");
    }

    #[tokio::test]
    async fn round_budget_exhaustion_yields_fallback() {
        // Empty script: the provider keeps requesting tools forever.
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let agent = runner(provider.clone());

        let answer = agent.run(&[], "q").await.expect("run");
        assert_eq!(answer, FALLBACK_ANSWER);
        assert_eq!(provider.seen.lock().expect("lock").len(), 5);
    }

    #[tokio::test]
    async fn empty_final_answer_yields_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![ModelTurn::Final(
            String::new(),
        )]));
        let agent = runner(provider);

        let answer = agent.run(&[], "q").await.expect("run");
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        struct FailingProvider;

        #[async_trait]
        impl LlmProvider for FailingProvider {
            fn model_id(&self) -> &str {
                "test-model"
            }

            async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, ApiError> {
                Err(ApiError::Upstream("down".to_string()))
            }

            async fn chat_with_tools(
                &self,
                _messages: &[ChatMessage],
                _tools: &[ToolSpec],
            ) -> Result<ModelTurn, ApiError> {
                Err(ApiError::Upstream("down".to_string()))
            }

            async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
                Err(ApiError::Upstream("down".to_string()))
            }
        }

        let agent = AgentRunner::new(Arc::new(FailingProvider), vec![Arc::new(EchoTool)], 5);
        let err = agent.run(&[], "q").await.expect_err("must fail");
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
