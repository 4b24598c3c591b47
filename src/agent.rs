use crate::llm::LlmClient;
use crate::logger::AgentLogger;
use crate::observer::{AgentObserver, NullObserver};
use crate::tools::{ToolResult, Toolbox};
use serde_json::{Value, json};
use siumai::traits::ChatCapability;
use siumai::types::{ChatMessage, ChatRequest, ChatResponse, MessageContent};
use std::future::Future;
use std::sync::Arc;

const ARG_PREVIEW_CHARS: usize = 200;
const RESULT_PREVIEW_CHARS: usize = 300;

/// Whether a response ended the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Finished(String),
    Continue,
}

/// Message history plus everything needed to act on a model response.
/// Holds no LLM client, so the step logic runs against any response source.
pub struct Conversation {
    toolbox: Toolbox,
    messages: Vec<ChatMessage>,
    logger: AgentLogger,
    observer: Arc<dyn AgentObserver>,
}

impl Conversation {
    pub fn new(toolbox: Toolbox, logger: AgentLogger, observer: Arc<dyn AgentObserver>) -> Self {
        Self {
            toolbox,
            messages: Vec::new(),
            logger,
            observer,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Drive the conversation for `goal`, asking `complete` for each model
    /// turn. Stops on the first answer without tool calls, or after
    /// `max_steps` turns.
    pub async fn run<F, Fut>(
        &mut self,
        system_prompt: &str,
        goal: &str,
        max_steps: usize,
        mut complete: F,
    ) -> anyhow::Result<String>
    where
        F: FnMut(ChatRequest) -> Fut,
        Fut: Future<Output = anyhow::Result<ChatResponse>>,
    {
        self.messages = vec![
            ChatMessage::system(system_prompt.to_string()).build(),
            ChatMessage::user(goal.to_string()).build(),
        ];
        self.logger.start_new_run();
        if let Some(p) = self.logger.log_path() {
            self.observer.on_log_file(p);
        }

        for step in 1..=max_steps {
            self.observer.on_step(step, max_steps);
            let response = complete(self.next_request()).await?;
            if let StepOutcome::Finished(answer) = self.apply_response(&response).await {
                tracing::debug!(step, "model answered without tool calls");
                return Ok(answer);
            }
        }

        tracing::warn!(max_steps, "step budget exhausted");
        Ok(max_steps_message(max_steps))
    }

    /// Request for the current history, recorded in the run log.
    pub fn next_request(&mut self) -> ChatRequest {
        tracing::debug!(messages = self.messages.len(), "requesting completion");
        let history: Vec<Value> = self
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": format!("{:?}", m.role),
                    "text": m.content.all_text(),
                })
            })
            .collect();
        self.logger
            .log_request(&json!({"messages": history, "tools": self.toolbox.names()}));
        ChatRequest::new(self.messages.clone()).with_tools(self.toolbox.to_siumai_tools())
    }

    /// Fold one model response into the history. Tool calls run in the
    /// order issued and each gets exactly one result or error message under
    /// its call id.
    pub async fn apply_response(&mut self, response: &ChatResponse) -> StepOutcome {
        let answer = response.content.all_text();
        let calls = response.tool_calls();
        self.logger.log_response(&json!({
            "text": answer,
            "tool_calls": calls.len(),
            "finish_reason": response.finish_reason,
        }));

        for r in response.reasoning() {
            self.observer.on_thinking(r);
        }
        if !answer.trim().is_empty() {
            self.observer.on_assistant_text(&answer);
        }
        self.messages.push(assistant_message(&response.content));

        if calls.is_empty() {
            return StepOutcome::Finished(answer);
        }

        for call in calls {
            let Some(info) = call.as_tool_call() else {
                continue;
            };
            let result = self
                .execute_call(info.tool_name, info.arguments.clone())
                .await;
            let msg = if result.success {
                ChatMessage::tool_result_text(info.tool_call_id, info.tool_name, result.content)
            } else {
                let err = result
                    .error
                    .unwrap_or_else(|| "Tool execution failed".to_string());
                ChatMessage::tool_error(info.tool_call_id, info.tool_name, err)
            };
            self.messages.push(msg.build());
        }
        StepOutcome::Continue
    }

    async fn execute_call(&mut self, tool_name: &str, args: Value) -> ToolResult {
        let display_args = serde_json::to_string_pretty(&truncate_value(&args, ARG_PREVIEW_CHARS))
            .unwrap_or_default();
        self.observer.on_tool_call(tool_name, &display_args);
        tracing::debug!(tool = tool_name, "executing tool");

        let result = self.toolbox.execute(tool_name, args.clone()).await;

        self.logger.log_tool_result(&json!({
            "tool_name": tool_name,
            "arguments": args,
            "success": result.success,
            "result": if result.success { Some(result.content.clone()) } else { None::<String> },
            "error": result.error,
        }));

        if result.success {
            self.observer
                .on_tool_result(tool_name, true, &preview(&result.content, RESULT_PREVIEW_CHARS));
        } else {
            let err = result.error.as_deref().unwrap_or("Tool execution failed");
            tracing::debug!(tool = tool_name, error = err, "tool failed");
            self.observer.on_tool_result(tool_name, false, err);
        }
        result
    }
}

fn assistant_message(content: &MessageContent) -> ChatMessage {
    match content {
        MessageContent::MultiModal(parts) => {
            ChatMessage::assistant_with_content(parts.clone()).build()
        }
        other => ChatMessage::assistant(other.all_text()).build(),
    }
}

pub struct Agent {
    llm: LlmClient,
    conversation: Conversation,
    system_prompt: String,
    pub max_steps: usize,
}

impl Agent {
    pub fn builder(llm: LlmClient, system_prompt: String) -> AgentBuilder {
        AgentBuilder::new(llm, system_prompt)
    }

    pub fn toolbox(&self) -> &Toolbox {
        self.conversation.toolbox()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run one conversation for `goal`. Returns the model's final answer,
    /// or a notice when the step budget runs out first.
    pub async fn run(&mut self, goal: &str) -> anyhow::Result<String> {
        let llm = &self.llm;
        self.conversation
            .run(&self.system_prompt, goal, self.max_steps, move |req| async move {
                Ok::<_, anyhow::Error>(llm.inner().chat_request(req).await?)
            })
            .await
    }
}

pub fn max_steps_message(max_steps: usize) -> String {
    format!("Reached max_steps ({}) without completion.", max_steps)
}

/// First `max` characters of `s`, with an ellipsis when cut.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Shorten every string inside `v` for display.
pub fn truncate_value(v: &Value, max: usize) -> Value {
    match v {
        Value::String(s) => Value::String(preview(s, max)),
        Value::Array(a) => Value::Array(a.iter().map(|x| truncate_value(x, max)).collect()),
        Value::Object(m) => Value::Object(
            m.iter()
                .map(|(k, vv)| (k.clone(), truncate_value(vv, max)))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub struct AgentBuilder {
    llm: LlmClient,
    system_prompt: String,
    toolbox: Toolbox,
    max_steps: usize,
    logger: AgentLogger,
    observer: Arc<dyn AgentObserver>,
}

impl AgentBuilder {
    pub fn new(llm: LlmClient, system_prompt: String) -> Self {
        Self {
            llm,
            system_prompt,
            toolbox: Toolbox::default(),
            max_steps: 20,
            logger: AgentLogger::disabled(),
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_toolbox(mut self, toolbox: Toolbox) -> Self {
        self.toolbox = toolbox;
        self
    }
    pub fn with_max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }
    pub fn with_logger(mut self, logger: AgentLogger) -> Self {
        self.logger = logger;
        self
    }
    pub fn with_observer(mut self, o: Arc<dyn AgentObserver>) -> Self {
        self.observer = o;
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            llm: self.llm,
            conversation: Conversation::new(self.toolbox, self.logger, self.observer),
            system_prompt: self.system_prompt,
            max_steps: self.max_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use crate::tools::base::required_str;
    use async_trait::async_trait;
    use siumai::types::{ContentPart, MessageRole};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Echoes `text` and remembers the order it was called in.
    struct Echo {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text argument"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, args: Value) -> ToolResult {
            match required_str(&args, "text") {
                Ok(t) => {
                    self.seen.lock().unwrap().push(t.to_string());
                    ToolResult::ok(t)
                }
                Err(e) => ToolResult::failure(e),
            }
        }
    }

    fn conversation() -> (Conversation, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let toolbox = Toolbox::new(vec![Arc::new(Echo { seen: seen.clone() })]);
        let conv = Conversation::new(toolbox, AgentLogger::disabled(), Arc::new(NullObserver));
        (conv, seen)
    }

    fn call(id: &str, args: Value) -> ContentPart {
        ContentPart::tool_call(id, "echo", args, None)
    }

    fn tool_calls(parts: Vec<ContentPart>) -> ChatResponse {
        ChatResponse::new(MessageContent::MultiModal(parts))
    }

    fn answer(text: &str) -> ChatResponse {
        ChatResponse::new(MessageContent::Text(text.to_string()))
    }

    /// (call id, is_error, output) of every tool message, in order.
    fn tool_messages(messages: &[ChatMessage]) -> Vec<(String, bool, String)> {
        messages
            .iter()
            .filter(|m| matches!(m.role, MessageRole::Tool))
            .filter_map(|m| match &m.content {
                MessageContent::MultiModal(parts) => parts.first(),
                _ => None,
            })
            .filter_map(|p| p.as_tool_result())
            .map(|r| {
                (
                    r.tool_call_id.to_string(),
                    r.output.is_error(),
                    r.output.to_string_lossy(),
                )
            })
            .collect()
    }

    async fn run_scripted(
        conv: &mut Conversation,
        max_steps: usize,
        responses: Vec<ChatResponse>,
    ) -> anyhow::Result<String> {
        let mut queue: VecDeque<ChatResponse> = responses.into();
        conv.run("system", "goal", max_steps, move |_req| {
            let next = queue.pop_front();
            async move { next.ok_or_else(|| anyhow::anyhow!("script exhausted")) }
        })
        .await
    }

    #[tokio::test]
    async fn test_calls_run_in_order_with_one_message_each() {
        let (mut conv, seen) = conversation();
        let outcome = conv
            .apply_response(&tool_calls(vec![
                ContentPart::text("Listing first."),
                call("call_1", json!({"text": "a"})),
                call("call_2", json!({})),
                call("call_3", json!({"text": "c"})),
            ]))
            .await;
        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "c"]);

        let tools = tool_messages(conv.messages());
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0], ("call_1".to_string(), false, "a".to_string()));
        assert_eq!(tools[1].0, "call_2");
        assert!(tools[1].1);
        assert!(tools[1].2.contains("missing_argument"));
        assert_eq!(tools[2], ("call_3".to_string(), false, "c".to_string()));

        // assistant turn precedes its tool results
        assert!(matches!(conv.messages()[0].role, MessageRole::Assistant));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_under_call_id() {
        let (mut conv, _) = conversation();
        conv.apply_response(&tool_calls(vec![ContentPart::tool_call(
            "call_9",
            "delete_everything",
            json!({}),
            None,
        )]))
        .await;
        let tools = tool_messages(conv.messages());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].0, "call_9");
        assert!(tools[0].1);
        assert!(tools[0].2.contains("unknown_tool"));
    }

    #[tokio::test]
    async fn test_answer_without_calls_finishes() {
        let (mut conv, _) = conversation();
        let outcome = conv.apply_response(&answer("Docs are up to date.")).await;
        assert_eq!(outcome, StepOutcome::Finished("Docs are up to date.".into()));

        let outcome = conv.apply_response(&answer("")).await;
        assert_eq!(outcome, StepOutcome::Finished(String::new()));
    }

    #[tokio::test]
    async fn test_run_returns_final_answer() {
        let (mut conv, seen) = conversation();
        let out = run_scripted(
            &mut conv,
            5,
            vec![
                tool_calls(vec![call("call_1", json!({"text": "README.md"}))]),
                answer("Updated README.md"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(out, "Updated README.md");
        assert_eq!(*seen.lock().unwrap(), vec!["README.md"]);

        // system, user, assistant(call), tool, assistant(answer)
        let roles: Vec<_> = conv.messages().iter().map(|m| format!("{:?}", m.role)).collect();
        assert_eq!(roles, vec!["System", "User", "Assistant", "Tool", "Assistant"]);
    }

    #[tokio::test]
    async fn test_run_stops_at_step_budget() {
        let (mut conv, seen) = conversation();
        let looping: Vec<_> = (0..3)
            .map(|i| tool_calls(vec![call(&format!("call_{}", i), json!({"text": "again"}))]))
            .collect();
        let out = run_scripted(&mut conv, 2, looping).await.unwrap();
        assert_eq!(out, max_steps_message(2));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_propagates_llm_errors() {
        let (mut conv, _) = conversation();
        let err = run_scripted(&mut conv, 3, Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("script exhausted"));
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("abc", 5), "abc");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
    }

    #[test]
    fn test_truncate_value_nested() {
        let long = "x".repeat(250);
        let v = json!({"path": "README.md", "content": long, "list": [long.clone(), 3]});
        let t = truncate_value(&v, 200);
        assert_eq!(t["path"], "README.md");
        assert_eq!(t["content"].as_str().unwrap().len(), 203);
        assert_eq!(t["list"][0].as_str().unwrap().len(), 203);
        assert_eq!(t["list"][1], 3);
    }

    #[test]
    fn test_max_steps_message() {
        assert_eq!(
            max_steps_message(20),
            "Reached max_steps (20) without completion."
        );
    }
}
