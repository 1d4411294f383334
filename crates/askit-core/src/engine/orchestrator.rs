//! Conversation orchestrator
//!
//! Drives the bounded prompt / tool-call / tool-result loop:
//!
//! ```text
//!   ┌──────────────────────┐   no tool calls    ┌──────┐
//!   │  Awaiting-Response   │ ─────────────────▶ │ Done │
//!   └──────────────────────┘                    └──────┘
//!        ▲           │ tool calls, r < R
//!        │ r += 1    ▼
//!   ┌──────────────────────┐
//!   │  Dispatching-Tools   │      tool calls with r == R ──▶ Failed (Protocol)
//!   └──────────────────────┘
//! ```
//!
//! Tool schemas are offered only while `r < R`, so the request after the
//! `R`-th tool round must be answered with text.

use std::path::Path;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::config::{ConfigError, EngineSettings, SettingsOverrides};
use crate::log_info;
use crate::logging::SharedLogger;
use crate::mcp::{ConnectionStatus, McpConnector, McpPool, McpServersConfig, RmcpConnector};
use crate::providers::{create_provider, ChatOptions, Provider, ProviderModelConfig};
use crate::tools::{LocalTool, ToolRegistry};
use crate::types::{check_pairing, CancellationToken, Completion, Message, Role, ToolSchema};

use super::error::{EngineError, EngineResult};
use super::stream::{PromptEvent, PromptStream, ToolCallAssembler};

/// Per-call options for [`AskIt::prompt`] and friends
#[derive(Clone, Default)]
pub struct PromptOptions {
    /// Local tools for this call, registered before the engine's defaults
    pub tools: Vec<Arc<dyn LocalTool>>,
    /// Round bound `R`; falls back to the engine settings
    pub max_tool_calls: Option<usize>,
    /// Cancels the call from outside
    pub cancel: Option<CancellationToken>,
}

impl PromptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool: Arc<dyn LocalTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn LocalTool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = Some(max);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptOptions")
            .field("tools", &self.tools.iter().map(|t| &t.spec().name).collect::<Vec<_>>())
            .field("max_tool_calls", &self.max_tool_calls)
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// What a response means for the loop
enum Turn {
    /// Final answer, already appended
    Final(String),
    /// Tool calls to dispatch; nothing appended yet
    Calls(Completion),
}

/// State of one prompt call
struct Conversation {
    registry: ToolRegistry,
    schemas: Vec<ToolSchema>,
    transcript: Vec<Message>,
    round: usize,
    max_rounds: usize,
    logger: SharedLogger,
}

impl Conversation {
    fn start(
        registry: ToolRegistry,
        mut transcript: Vec<Message>,
        text: &str,
        system_prompt: Option<&str>,
        max_rounds: usize,
        logger: SharedLogger,
    ) -> Self {
        if let Err(e) = check_pairing(&transcript) {
            logger.warn(&format!("[AskIt] Supplied history is inconsistent: {}", e));
        }
        if let Some(system) = system_prompt {
            if !transcript.iter().any(|m| m.role == Role::System) {
                transcript.insert(0, Message::system(system));
            }
        }
        transcript.push(Message::user(text));

        Self {
            schemas: registry.schema_list(),
            registry,
            transcript,
            round: 0,
            max_rounds,
            logger,
        }
    }

    /// Request options for the current round
    fn options(&self) -> ChatOptions {
        let options = ChatOptions::new();
        if self.round < self.max_rounds {
            options.with_tools(self.schemas.clone())
        } else {
            options
        }
    }

    fn log_round(&self) {
        let tools = if self.round < self.max_rounds && !self.schemas.is_empty() {
            "offered"
        } else {
            "withheld"
        };
        log_info!(
            self.logger,
            "[AskIt] Round {} of {} ({} messages, tools {})",
            self.round + 1,
            self.max_rounds.saturating_add(1),
            self.transcript.len(),
            tools
        );
    }

    fn accept(&mut self, completion: Completion) -> EngineResult<Turn> {
        if !completion.has_tool_calls() {
            self.transcript.push(Message::assistant(completion.content.clone()));
            return Ok(Turn::Final(completion.content));
        }

        if self.round >= self.max_rounds {
            let calls: Vec<String> = completion
                .tool_calls
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            self.logger.error(&format!(
                "[AskIt] Provider requested [{}] after tools were withheld",
                calls.join(", ")
            ));
            return Err(EngineError::Protocol {
                round: self.round,
                calls,
            });
        }

        Ok(Turn::Calls(completion))
    }

    async fn dispatch(&self, completion: &Completion) -> Vec<Message> {
        log_info!(
            self.logger,
            "[AskIt] Dispatching {} tool call(s)",
            completion.tool_calls.len()
        );
        self.registry.execute_all(&completion.tool_calls).await
    }

    /// Append a finished round in one step
    fn commit(&mut self, completion: Completion, results: Vec<Message>) {
        self.transcript.push(Message::assistant_tool_calls(
            completion.content,
            completion.tool_calls,
        ));
        self.transcript.extend(results);
        self.round += 1;
    }
}

/// The tool orchestration engine
///
/// ```rust,ignore
/// let askit = AskIt::from_settings(EngineSettings::default(), logger);
/// askit.load_default_mcp_config().await?;
///
/// let answer = askit
///     .prompt("What is 2+3?", PromptOptions::new().tool(sum_tool()))
///     .await?;
/// ```
pub struct AskIt {
    provider: Arc<dyn Provider>,
    settings: EngineSettings,
    default_tools: Vec<Arc<dyn LocalTool>>,
    pool: Arc<McpPool>,
    logger: SharedLogger,
}

impl AskIt {
    pub fn new(provider: Arc<dyn Provider>, settings: EngineSettings, logger: SharedLogger) -> Self {
        let connector = Arc::new(RmcpConnector::new(Arc::clone(&logger)));
        Self {
            provider,
            settings,
            default_tools: Vec::new(),
            pool: Arc::new(McpPool::new(connector, Arc::clone(&logger))),
            logger,
        }
    }

    /// Engine with the provider named in `settings`
    pub fn from_settings(settings: EngineSettings, logger: SharedLogger) -> Self {
        let provider = create_provider(&settings, Arc::clone(&logger));
        Self::new(provider, settings, logger)
    }

    /// Engine configured from the environment and the user settings file
    pub fn from_env(overrides: SettingsOverrides, logger: SharedLogger) -> EngineResult<Self> {
        let settings = EngineSettings::load(overrides)?;
        Ok(Self::from_settings(settings, logger))
    }

    /// Local tools offered on every prompt, after the per-call ones
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn LocalTool>>) -> Self {
        self.default_tools.extend(tools);
        self
    }

    /// Use another way of reaching MCP servers; drops any existing connections
    pub fn with_mcp_connector(mut self, connector: Arc<dyn McpConnector>) -> Self {
        self.pool = Arc::new(McpPool::new(connector, Arc::clone(&self.logger)));
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Connect the servers listed in an MCP config file
    ///
    /// Servers that fail to connect are logged and left out; see
    /// [`AskIt::connection_statuses`].
    pub async fn load_mcp_config(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let config = McpServersConfig::load(path.as_ref())?;
        let ready = self.pool.connect_all(&config).await;
        self.logger.info(&format!(
            "[AskIt] {} of {} MCP server(s) ready from {}",
            ready,
            config.enabled().count(),
            path.as_ref().display()
        ));
        Ok(())
    }

    /// Load the configured MCP config file if it exists
    pub async fn load_default_mcp_config(&self) -> EngineResult<()> {
        match self.load_mcp_config(&self.settings.mcp_config_path).await {
            Err(EngineError::Config(ConfigError::NotFound { path })) => {
                self.logger.debug(&format!(
                    "[AskIt] No MCP config at {}, continuing without servers",
                    path.display()
                ));
                Ok(())
            }
            other => other,
        }
    }

    /// Names of tools currently served by MCP connections
    pub fn mcp_tool_names(&self) -> Vec<String> {
        self.pool.tool_names()
    }

    /// State of every configured MCP connection
    pub fn connection_statuses(&self) -> Vec<ConnectionStatus> {
        self.pool.statuses()
    }

    pub fn pool(&self) -> &Arc<McpPool> {
        &self.pool
    }

    /// Close every MCP connection
    pub async fn close(&self) -> EngineResult<()> {
        let failures = self.pool.close_all().await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Close(failures))
        }
    }

    fn conversation(&self, text: &str, history: Vec<Message>, options: &PromptOptions) -> Conversation {
        let tools: Vec<Arc<dyn LocalTool>> = options
            .tools
            .iter()
            .chain(self.default_tools.iter())
            .cloned()
            .collect();
        let registry = ToolRegistry::build(&tools, Some(&self.pool), Arc::clone(&self.logger));
        Conversation::start(
            registry,
            history,
            text,
            self.settings.system_prompt.as_deref(),
            options.max_tool_calls.unwrap_or(self.settings.max_tool_calls),
            Arc::clone(&self.logger),
        )
    }

    fn model(&self) -> ProviderModelConfig {
        ProviderModelConfig::from(&self.settings)
    }

    /// Ask once and return the final answer
    pub async fn prompt(&self, text: &str, options: PromptOptions) -> EngineResult<String> {
        let mut history = Vec::new();
        self.prompt_with_history(text, &mut history, options).await
    }

    /// Ask with a caller-owned transcript
    ///
    /// `history` receives every committed message, also when the call fails;
    /// it never holds a tool-call round without all of its results.
    pub async fn prompt_with_history(
        &self,
        text: &str,
        history: &mut Vec<Message>,
        options: PromptOptions,
    ) -> EngineResult<String> {
        let cancel = options.cancel.clone().unwrap_or_default();
        let mut conversation = self.conversation(text, std::mem::take(history), &options);
        let result = self.run(&mut conversation, &cancel).await;
        *history = conversation.transcript;
        result
    }

    async fn run(&self, conversation: &mut Conversation, cancel: &CancellationToken) -> EngineResult<String> {
        let model = self.model();
        loop {
            conversation.log_round();
            let request = self.provider.complete(
                conversation.transcript.clone(),
                model.clone(),
                conversation.options(),
                cancel.child_token(),
            );
            let completion = cancel
                .run_until_cancelled(request)
                .await
                .ok_or(EngineError::Cancelled)??;

            match conversation.accept(completion)? {
                Turn::Final(content) => return Ok(content),
                Turn::Calls(completion) => {
                    let results = cancel
                        .run_until_cancelled(conversation.dispatch(&completion))
                        .await
                        .ok_or(EngineError::Cancelled)?;
                    conversation.commit(completion, results);
                }
            }
        }
    }

    /// Ask and stream the answer
    ///
    /// Every round streams its text. After a tool round the stream yields
    /// each tool result, then continues with the next round.
    pub fn prompt_stream(
        &self,
        text: &str,
        history: Vec<Message>,
        options: PromptOptions,
    ) -> PromptStream {
        let cancel = options.cancel.clone().unwrap_or_default().child_token();
        let conversation = self.conversation(text, history, &options);
        let events = stream_rounds(
            Arc::clone(&self.provider),
            self.model(),
            conversation,
            cancel.clone(),
        );
        PromptStream::new(Box::pin(events), cancel)
    }
}

fn stream_rounds(
    provider: Arc<dyn Provider>,
    model: ProviderModelConfig,
    mut conversation: Conversation,
    token: CancellationToken,
) -> impl Stream<Item = EngineResult<PromptEvent>> + Send {
    async_stream::try_stream! {
        loop {
            conversation.log_round();
            let start = provider.stream_chat(
                conversation.transcript.clone(),
                model.clone(),
                conversation.options(),
                token.child_token(),
            );
            let mut chunks = token
                .run_until_cancelled(start)
                .await
                .ok_or(EngineError::Cancelled)??;

            let mut assembler = ToolCallAssembler::new();
            while let Some(chunk) = token
                .run_until_cancelled(chunks.next())
                .await
                .ok_or(EngineError::Cancelled)?
            {
                if let Some(text) = assembler.push(chunk?) {
                    yield PromptEvent::Text(text);
                }
            }

            match conversation.accept(assembler.finish())? {
                Turn::Final(content) => {
                    yield PromptEvent::Done {
                        content,
                        transcript: conversation.transcript.clone(),
                    };
                    break;
                }
                Turn::Calls(completion) => {
                    let results = token
                        .run_until_cancelled(conversation.dispatch(&completion))
                        .await
                        .ok_or(EngineError::Cancelled)?;
                    for result in &results {
                        yield PromptEvent::tool_result(result);
                    }
                    conversation.commit(completion, results);
                }
            }
        }
    }
}

impl std::fmt::Debug for AskIt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AskIt")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .field("default_tools", &self.default_tools.len())
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::DEFAULT_SYSTEM_PROMPT;
    use crate::logging::MemoryLogger;
    use crate::mcp::testing::{FakeConnection, FakeConnector};
    use crate::mcp::ConnectionState;
    use crate::providers::{MockProvider, MockTurn};
    use crate::tools::{builtin, FunctionTool, ParamSpec, ParamType, ToolSpec};
    use crate::types::ToolCallRequest;

    fn sum_tool() -> Arc<dyn LocalTool> {
        FunctionTool::new(
            ToolSpec::new("sum")
                .doc("Add two integers.")
                .param(ParamSpec::new("a", ParamType::Integer))
                .param(ParamSpec::new("b", ParamType::Integer)),
            |args| async move {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok(json!(a + b))
            },
        )
        .shared()
    }

    fn slow_tool() -> Arc<dyn LocalTool> {
        FunctionTool::new(ToolSpec::new("slow"), |_| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(json!("slow done"))
        })
        .shared()
    }

    struct Fixture {
        askit: AskIt,
        provider: Arc<MockProvider>,
        logger: Arc<MemoryLogger>,
    }

    fn fixture(turns: Vec<MockTurn>) -> Fixture {
        fixture_with(turns, EngineSettings::default().without_system_prompt())
    }

    fn fixture_with(turns: Vec<MockTurn>, settings: EngineSettings) -> Fixture {
        let logger = Arc::new(MemoryLogger::new());
        let provider = Arc::new(MockProvider::scripted(turns, logger.clone()));
        let askit = AskIt::new(provider.clone(), settings, logger.clone());
        Fixture {
            askit,
            provider,
            logger,
        }
    }

    const CALC_CONFIG: &str = r#"{
        "mcpServers": {
            "calc": { "command": "calc-server" },
            "down": { "transport": "http", "url": "http://127.0.0.1:9/mcp" }
        }
    }"#;

    fn calc_connector(tools: &[&str]) -> Arc<FakeConnector> {
        Arc::new(FakeConnector::default().with(FakeConnection::new("calc", tools)))
    }

    async fn connect(askit: &AskIt) {
        let config = McpServersConfig::parse(CALC_CONFIG).unwrap();
        askit.pool().connect_all(&config).await;
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let fx = fixture(vec![MockTurn::text(&["Hel", "lo"])]);
        let answer = fx.askit.prompt("Hi", PromptOptions::new()).await.unwrap();

        assert_eq!(answer, "Hello");
        let requests = fx.provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_none());
        assert_eq!(requests[0].messages, vec![Message::user("Hi")]);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let fx = fixture(vec![
            MockTurn::call("call_1", "sum", r#"{"a": 2, "b": 3}"#),
            MockTurn::text(&["The answer is 5"]),
        ]);
        let mut history = Vec::new();
        let answer = fx
            .askit
            .prompt_with_history("What is 2+3?", &mut history, PromptOptions::new().tool(sum_tool()))
            .await
            .unwrap();

        assert_eq!(answer, "The answer is 5");
        assert_eq!(
            history,
            vec![
                Message::user("What is 2+3?"),
                Message::assistant_tool_calls(
                    "",
                    vec![ToolCallRequest::new("call_1", "sum", r#"{"a": 2, "b": 3}"#)]
                ),
                Message::tool_result("call_1", "sum", "5"),
                Message::assistant("The answer is 5"),
            ]
        );
        assert!(check_pairing(&history).is_ok());

        let requests = fx.provider.requests();
        assert_eq!(requests[0].tool_names(), vec!["sum"]);
        assert_eq!(requests[1].messages.len(), 3);
        assert!(fx.logger.contains("info", "[AskIt] Round 1"));
    }

    #[tokio::test]
    async fn test_tools_withheld_after_bound() {
        let fx = fixture(vec![
            MockTurn::call("c1", "sum", r#"{"a": 1, "b": 1}"#),
            MockTurn::call("c2", "sum", r#"{"a": 2, "b": 2}"#),
            MockTurn::text(&["done"]),
        ]);
        let options = PromptOptions::new().tool(sum_tool()).max_tool_calls(2);
        let answer = fx.askit.prompt("count", options).await.unwrap();

        assert_eq!(answer, "done");
        let requests = fx.provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].tool_names(), vec!["sum"]);
        assert_eq!(requests[1].tool_names(), vec!["sum"]);
        assert!(requests[2].tools.is_none());
    }

    #[tokio::test]
    async fn test_zero_bound_never_offers_tools() {
        let fx = fixture(vec![MockTurn::text(&["no tools"])]);
        let options = PromptOptions::new().tool(sum_tool()).max_tool_calls(0);
        fx.askit.prompt("hi", options).await.unwrap();

        assert!(fx.provider.requests()[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_call_on_final_round_is_protocol_error() {
        let fx = fixture(vec![
            MockTurn::call("c1", "sum", r#"{"a": 1, "b": 1}"#),
            MockTurn::call("c2", "sum", r#"{"a": 2, "b": 2}"#),
        ]);
        let mut history = Vec::new();
        let options = PromptOptions::new().tool(sum_tool()).max_tool_calls(1);
        let err = fx
            .askit
            .prompt_with_history("loop", &mut history, options)
            .await
            .unwrap_err();

        match err {
            EngineError::Protocol { round, calls } => {
                assert_eq!(round, 1);
                assert_eq!(calls, vec!["sum"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Only the completed first round is committed
        assert_eq!(history.len(), 3);
        assert!(check_pairing(&history).is_ok());
        assert!(fx.logger.contains("error", "after tools were withheld"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_tool_error() {
        let fx = fixture(vec![
            MockTurn::call("call_1", "sum", r#"{"a": 2,"#),
            MockTurn::text(&["sorry"]),
        ]);
        let mut history = Vec::new();
        fx.askit
            .prompt_with_history("2+?", &mut history, PromptOptions::new().tool(sum_tool()))
            .await
            .unwrap();

        let result = &history[2];
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert!(result.content.starts_with("Error:"));
        assert!(result.content.contains("could not parse"));
        assert_eq!(history[1].requested_calls()[0].raw_arguments(), r#"{"a": 2,"#);
    }

    #[tokio::test]
    async fn test_panicking_tool_does_not_end_prompt() {
        let boom = FunctionTool::new(ToolSpec::new("boom"), |_| async move {
            let empty: Vec<i64> = Vec::new();
            Ok(json!(empty[3]))
        })
        .shared();
        let fx = fixture(vec![MockTurn::call("c1", "boom", "{}"), MockTurn::text(&["recovered"])]);
        let mut history = Vec::new();
        let answer = fx
            .askit
            .prompt_with_history("go", &mut history, PromptOptions::new().tool(boom))
            .await
            .unwrap();

        assert_eq!(answer, "recovered");
        assert_eq!(history[2].role, Role::Tool);
        assert!(history[2].content.starts_with("Error: tool `boom` failed: tool panicked"));
        assert!(check_pairing(&history).is_ok());
    }

    #[tokio::test]
    async fn test_unbounded_rounds_do_not_overflow() {
        let fx = fixture(vec![
            MockTurn::call("c1", "sum", r#"{"a": 2, "b": 3}"#),
            MockTurn::text(&["5"]),
        ]);
        let options = PromptOptions::new().tool(sum_tool()).max_tool_calls(usize::MAX);
        let answer = fx.askit.prompt("2+3", options).await.unwrap();

        assert_eq!(answer, "5");
        assert_eq!(fx.provider.requests()[1].tool_names(), vec!["sum"]);
        assert!(fx.logger.contains("info", &format!("of {}", usize::MAX)));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_raised() {
        let fx = fixture(vec![MockTurn::call("c1", "nope", "{}"), MockTurn::text(&["ok"])]);
        let mut history = Vec::new();
        fx.askit
            .prompt_with_history("x", &mut history, PromptOptions::new().tool(sum_tool()))
            .await
            .unwrap();

        assert_eq!(history[2].content, "Error: unknown tool `nope`");
    }

    #[tokio::test]
    async fn test_local_shadows_remote() {
        let fx = fixture(vec![
            MockTurn::calls(vec![
                ToolCallRequest::new("c1", "sum", r#"{"a": 2, "b": 3}"#),
                ToolCallRequest::new("c2", "ping", "{}"),
            ]),
            MockTurn::text(&["ok"]),
        ]);
        let askit = fx.askit.with_mcp_connector(calc_connector(&["sum", "ping"]));
        connect(&askit).await;

        let mut history = Vec::new();
        askit
            .prompt_with_history("go", &mut history, PromptOptions::new().tool(sum_tool()))
            .await
            .unwrap();

        assert_eq!(fx.provider.requests()[0].tool_names(), vec!["sum", "ping"]);
        assert_eq!(history[2].content, "5");
        assert_eq!(history[3].content, "calc:ping({})");
    }

    #[tokio::test]
    async fn test_failed_server_does_not_block_local_tools() {
        let fx = fixture(vec![
            MockTurn::call("c1", "sum", r#"{"a": 2, "b": 3}"#),
            MockTurn::text(&["5"]),
        ]);
        let askit = fx
            .askit
            .with_mcp_connector(calc_connector(&["ping"]))
            .with_tools([sum_tool()]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, CALC_CONFIG).unwrap();
        askit.load_mcp_config(&path).await.unwrap();

        assert_eq!(askit.mcp_tool_names(), vec!["ping"]);
        let statuses = askit.connection_statuses();
        assert_eq!(statuses[0].state, ConnectionState::Ready);
        assert!(matches!(statuses[1].state, ConnectionState::Failed(_)));
        assert!(fx.logger.contains("warn", "Failed to connect to down"));

        let answer = askit.prompt("2+3", PromptOptions::new()).await.unwrap();
        assert_eq!(answer, "5");
        assert_eq!(fx.provider.requests()[0].tool_names(), vec!["sum", "ping"]);
    }

    #[tokio::test]
    async fn test_builtin_file_tools_in_a_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture(vec![
            MockTurn::call("c1", "write_file", r#"{"filename": "todo.txt", "content": "ship it"}"#),
            MockTurn::call("c2", "read_file", r#"{"filename": "todo.txt"}"#),
            MockTurn::text(&["Your list says: ship it"]),
        ]);
        let askit = fx.askit.with_tools(builtin::all(dir.path()));

        let mut history = Vec::new();
        let answer = askit
            .prompt_with_history("What is on my list?", &mut history, PromptOptions::new().max_tool_calls(2))
            .await
            .unwrap();

        assert_eq!(answer, "Your list says: ship it");
        assert_eq!(
            fx.provider.requests()[0].tool_names(),
            vec!["get_current_time", "list_files", "read_file", "write_file"]
        );
        assert_eq!(history[2], Message::tool_result("c1", "write_file", "Successfully wrote to todo.txt"));
        assert_eq!(history[4], Message::tool_result("c2", "read_file", "ship it"));
        assert_eq!(std::fs::read_to_string(dir.path().join("todo.txt")).unwrap(), "ship it");
    }

    #[tokio::test]
    async fn test_dead_server_is_dropped_from_later_prompts() {
        let fx = fixture(vec![
            MockTurn::call("c1", "ping", "{}"),
            MockTurn::text(&["first"]),
            MockTurn::text(&["second"]),
        ]);
        let connector = calc_connector(&["ping"]);
        let askit = fx.askit.with_mcp_connector(connector.clone());
        connect(&askit).await;
        connector.connections["calc"].dead.store(true, Ordering::SeqCst);

        let mut history = Vec::new();
        askit
            .prompt_with_history("ping", &mut history, PromptOptions::new())
            .await
            .unwrap();
        assert!(history[2].content.starts_with("Error:"));
        assert!(matches!(
            askit.pool().state("calc"),
            Some(ConnectionState::Failed(_))
        ));

        askit.prompt("again", PromptOptions::new()).await.unwrap();
        assert!(fx.provider.requests()[2].tools.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let fx = fixture(vec![MockTurn::Fail("503 Service Unavailable".into())]);
        let err = fx.askit.prompt("hi", PromptOptions::new()).await.unwrap_err();

        assert!(matches!(err, EngineError::Transport(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_system_prompt_inserted_once() {
        let settings = EngineSettings::default().with_system_prompt("Be brief.");
        let fx = fixture_with(vec![], settings);

        fx.askit.prompt("one", PromptOptions::new()).await.unwrap();
        let mut history = vec![Message::system("Custom."), Message::user("earlier"), Message::assistant("ok")];
        fx.askit
            .prompt_with_history("two", &mut history, PromptOptions::new())
            .await
            .unwrap();

        let requests = fx.provider.requests();
        assert_eq!(requests[0].messages[0], Message::system("Be brief."));
        assert_eq!(requests[1].messages[0], Message::system("Custom."));
        assert_eq!(
            requests[1].messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
        assert_eq!(history.last(), Some(&Message::assistant("Echo: two")));
    }

    #[tokio::test]
    async fn test_default_system_prompt_leads_transcript() {
        let fx = fixture_with(vec![], EngineSettings::default());
        fx.askit.prompt("Hi", PromptOptions::new()).await.unwrap();

        let requests = fx.provider.requests();
        assert_eq!(
            requests[0].messages,
            vec![Message::system(DEFAULT_SYSTEM_PROMPT), Message::user("Hi")]
        );
    }

    #[tokio::test]
    async fn test_inconsistent_history_is_logged() {
        let fx = fixture(vec![]);
        let mut history = vec![Message::tool_result("ghost", "sum", "5")];
        fx.askit
            .prompt_with_history("hi", &mut history, PromptOptions::new())
            .await
            .unwrap();

        assert!(fx.logger.contains("warn", "Supplied history is inconsistent"));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_provider() {
        let fx = fixture(vec![MockTurn::Hang]);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let mut history = Vec::new();
        let err = fx
            .askit
            .prompt_with_history("wait", &mut history, PromptOptions::new().cancel_token(cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(history, vec![Message::user("wait")]);
    }

    #[tokio::test]
    async fn test_cancel_during_dispatch_commits_nothing() {
        let fx = fixture(vec![MockTurn::call("c1", "slow", "{}"), MockTurn::text(&["never"])]);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let mut history = Vec::new();
        let options = PromptOptions::new().tool(slow_tool()).cancel_token(cancel);
        let err = fx
            .askit
            .prompt_with_history("slow", &mut history, options)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(history.len(), 1);
        assert_eq!(fx.provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_text_tool_results_and_done() {
        let fx = fixture(vec![
            MockTurn::call("call_1", "sum", r#"{"a": 2, "b": 3}"#),
            MockTurn::text(&["Hel", "lo"]),
        ]);
        let stream = fx
            .askit
            .prompt_stream("2+3", Vec::new(), PromptOptions::new().tool(sum_tool()));
        let events: Vec<PromptEvent> = stream.map(|e| e.unwrap()).collect().await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            PromptEvent::ToolResult {
                call_id: "call_1".into(),
                name: "sum".into(),
                content: "5".into(),
            }
        );
        assert_eq!(events[1].as_text(), Some("Hel"));
        assert_eq!(events[2].as_text(), Some("lo"));
        match &events[3] {
            PromptEvent::Done { content, transcript } => {
                assert_eq!(content, "Hello");
                assert_eq!(transcript.len(), 4);
                assert_eq!(transcript.last(), Some(&Message::assistant("Hello")));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_ends_on_transport_error() {
        let fx = fixture(vec![MockTurn::Broken {
            text: vec!["partial".into()],
            message: "connection reset".into(),
        }]);
        let mut stream = fx.askit.prompt_stream("hi", Vec::new(), PromptOptions::new());

        assert_eq!(stream.next().await.unwrap().unwrap(), PromptEvent::Text("partial".into()));
        assert!(matches!(stream.next().await, Some(Err(EngineError::Transport(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_cancel() {
        let fx = fixture(vec![MockTurn::Hang]);
        let cancel = CancellationToken::new();
        let mut stream = fx.askit.prompt_stream(
            "wait",
            Vec::new(),
            PromptOptions::new().cancel_token(cancel.clone()),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert!(matches!(stream.next().await, Some(Err(EngineError::Cancelled))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_leaves_caller_token_alone() {
        let fx = fixture(vec![MockTurn::text(&["hi"])]);
        let cancel = CancellationToken::new();
        let stream = fx.askit.prompt_stream(
            "hi",
            Vec::new(),
            PromptOptions::new().cancel_token(cancel.clone()),
        );
        drop(stream);

        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_load_default_config_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EngineSettings {
            mcp_config_path: dir.path().join("missing.json"),
            ..Default::default()
        };
        let fx = fixture_with(vec![], settings);

        fx.askit.load_default_mcp_config().await.unwrap();
        assert!(fx.askit.connection_statuses().is_empty());

        let err = fx.askit.load_mcp_config(dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_close_reports_failures() {
        let mut conn = FakeConnection::new("calc", &["ping"]);
        conn.fail_close = true;
        let fx = fixture(vec![]);
        let askit = fx
            .askit
            .with_mcp_connector(Arc::new(FakeConnector::default().with(conn)));
        connect(&askit).await;

        match askit.close().await {
            Err(EngineError::Close(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "calc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
