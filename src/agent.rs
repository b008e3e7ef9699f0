use anyhow::Result;
use uuid::Uuid;

use crate::environment::Environment;
use crate::llm::{ChatBackend, Message, OpenAiClient, ToolCall, WireMessage};

/// Instructions fixed at agent construction. The cross-verification and
/// refusal behavior lives entirely in this prompt; the code does not check
/// the model's output against it.
pub const SYSTEM_PROMPT: &str = "\
You are an intelligent location mapping agent. You will be given the title and \
description of a place. Your task is to find the latitude and longitude of the place.
1. Use the perplexity_search tool to search for the place and get its coordinates.
2. Use the duckduckgo_search tool to search for the place and cross-verify the results \
with the perplexity_search tool.
3. If the duckduckgo_search tool does not return any results, return \"I could not find the place.\"
4. If you find the place, return the coordinates in the format \"latitude, longitude\".
5. If the place is not accurate, return \"I could not find the place.\"
Make sure the place is accurate by checking the description and title. Use the tools to \
get the coordinates of the place and verify the place with the description and title.

Output format:
LATITUDE, LONGITUDE";

/// A new opaque session token for one chat exchange. Minted fresh per
/// submit; never reused.
pub fn mint_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// One conversational entity: an environment, a system prompt, and a name.
pub struct Agent {
    env: Environment,
    backend: Box<dyn ChatBackend>,
    system_prompt: String,
    name: String,
}

impl Agent {
    pub fn new(env: Environment, system_prompt: &str, name: &str) -> Self {
        let backend = Box::new(OpenAiClient::new(
            env.llm.api_key.clone(),
            &env.llm.model,
            env.llm.temperature,
            env.llm.top_p,
        ));
        Self {
            env,
            backend,
            system_prompt: system_prompt.to_string(),
            name: name.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_backend(
        env: Environment,
        backend: Box<dyn ChatBackend>,
        system_prompt: &str,
        name: &str,
    ) -> Self {
        Self {
            env,
            backend,
            system_prompt: system_prompt.to_string(),
            name: name.to_string(),
        }
    }

    /// Drive one chat exchange to completion and return the message list
    /// with the assistant's reply appended.
    ///
    /// Tool calls requested by the model are executed and fed back for at
    /// most `max_tries` rounds; tool failures come back as text, so only
    /// backend errors propagate.
    pub async fn chat(
        &self,
        user_id: &str,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<Vec<Message>> {
        tracing::info!(user_id, session_id, agent = %self.name, "chat started");

        let mut wire: Vec<WireMessage> = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage::system(self.system_prompt.clone()));
        wire.extend(
            messages
                .iter()
                .map(|m| WireMessage::plain(&m.role, m.content.clone())),
        );

        let specs = self.env.tool_specs();
        let max_tries = self.env.max_tool_tries();

        let mut response = self.backend.chat(&wire, &specs).await?;
        let mut rounds = 0;

        while !response.tool_calls.is_empty() && rounds < max_tries {
            wire.push(WireMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let output = self.run_tool(call).await;
                wire.push(WireMessage::tool_result(&call.id, output));
            }

            rounds += 1;
            response = self.backend.chat(&wire, &specs).await?;
        }

        let reply = response.content.unwrap_or_default();
        tracing::info!(session_id, rounds, "chat finished");

        let mut updated = messages;
        updated.push(Message::assistant(reply));
        Ok(updated)
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.env.tool(&call.function.name) else {
            return format!("An error occurred: unknown tool: {}", call.function.name);
        };

        let args: serde_json::Value =
            serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::Null);
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{DatastoreConfig, Feature, LlmConfig};
    use crate::llm::{FunctionCall, LlmResponse, ToolCall};
    use crate::tools::{Tool, ToolSpec};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Backend that replays a fixed list of responses and records how often
    /// it was called.
    struct ScriptedBackend {
        responses: Mutex<Vec<LlmResponse>>,
        calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(mut responses: Vec<LlmResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, _messages: &[WireMessage], _tools: &[ToolSpec]) -> Result<LlmResponse> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            Ok(responses.pop().unwrap_or_else(|| LlmResponse {
                content: None,
                tool_calls: vec![tool_call("echo", r#"{"query":"again"}"#)],
            }))
        }
    }

    struct EchoTool {
        queries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes the query"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }

        async fn execute(&self, args: serde_json::Value) -> String {
            let query = args
                .get("query")
                .and_then(|q| q.as_str())
                .unwrap_or_default()
                .to_string();
            self.queries.lock().unwrap().push(query.clone());
            format!("echo: {query}")
        }
    }

    fn tool_call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn test_agent(
        responses: Vec<LlmResponse>,
        queries: Arc<Mutex<Vec<String>>>,
    ) -> (Agent, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend::new(responses));
        let env = Environment {
            llm: LlmConfig::openai("gpt-4o", None),
            tools: vec![Arc::new(EchoTool { queries })],
            features: vec![
                Feature::ShortTermMemory,
                Feature::ToolCalling { max_tries: 3 },
            ],
            datastore: DatastoreConfig::default(),
        };

        struct SharedBackend(Arc<ScriptedBackend>);

        #[async_trait]
        impl ChatBackend for SharedBackend {
            async fn chat(&self, messages: &[WireMessage], tools: &[ToolSpec]) -> Result<LlmResponse> {
                self.0.chat(messages, tools).await
            }
        }

        let agent = Agent::with_backend(
            env,
            Box::new(SharedBackend(backend.clone())),
            SYSTEM_PROMPT,
            "jaunt bot",
        );
        (agent, backend)
    }

    #[tokio::test]
    async fn test_chat_appends_assistant_reply() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let (agent, _) = test_agent(
            vec![LlmResponse {
                content: Some("48.8584, 2.2945".to_string()),
                tool_calls: vec![],
            }],
            queries,
        );

        let messages = vec![Message::user("title: Eiffel Tower description: iron tower")];
        let updated = agent.chat("user1", "session1", messages).await.unwrap();

        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].role, "user");
        assert_eq!(updated[1].role, "assistant");
        assert_eq!(updated[1].content, "48.8584, 2.2945");
    }

    #[tokio::test]
    async fn test_chat_executes_requested_tools() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let (agent, backend) = test_agent(
            vec![
                LlmResponse {
                    content: None,
                    tool_calls: vec![tool_call("echo", r#"{"query":"Eiffel Tower"}"#)],
                },
                LlmResponse {
                    content: Some("48.8584, 2.2945".to_string()),
                    tool_calls: vec![],
                },
            ],
            queries.clone(),
        );

        let updated = agent
            .chat("user1", "session1", vec![Message::user("find it")])
            .await
            .unwrap();

        assert_eq!(queries.lock().unwrap().as_slice(), ["Eiffel Tower"]);
        assert_eq!(backend.call_count(), 2);
        assert_eq!(updated.last().unwrap().content, "48.8584, 2.2945");
    }

    #[tokio::test]
    async fn test_chat_stops_after_max_tries() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        // Empty script: the backend asks for a tool call on every turn.
        let (agent, backend) = test_agent(vec![], queries.clone());

        let updated = agent
            .chat("user1", "session1", vec![Message::user("loop forever")])
            .await
            .unwrap();

        // Initial call plus one per allowed round.
        assert_eq!(backend.call_count(), 4);
        assert_eq!(queries.lock().unwrap().len(), 3);
        assert_eq!(updated.last().unwrap().role, "assistant");
    }

    #[tokio::test]
    async fn test_chat_unknown_tool_becomes_textual_error() {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let (agent, _) = test_agent(
            vec![
                LlmResponse {
                    content: None,
                    tool_calls: vec![tool_call("no_such_tool", "{}")],
                },
                LlmResponse {
                    content: Some("I could not find the place.".to_string()),
                    tool_calls: vec![],
                },
            ],
            queries,
        );

        let updated = agent
            .chat("user1", "session1", vec![Message::user("find it")])
            .await
            .unwrap();

        assert_eq!(updated.last().unwrap().content, "I could not find the place.");
    }

    #[test]
    fn test_mint_session_id_is_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(mint_session_id()));
        }
    }

    #[test]
    fn test_session_ids_are_opaque_hex() {
        let id = mint_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
