mod common;

use common::{ScriptedProvider, reply_with_reason, text_reply, tool_reply};
use parley_agent::{Agent, AgentError, CancellationToken, Observer};
use parley_llm::{ChatResponse, FinishReason, GeminiClient, Role};
use parley_tools::{JsonSchema, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Serialize, Deserialize, JsonSchema)]
struct CityArgs {
    /// City to look up.
    city: String,
}

#[derive(Default, Serialize, Deserialize, JsonSchema)]
struct TopicArgs {
    topic: String,
}

fn get_weather(args: CityArgs) -> String {
    match args.city.as_str() {
        "Paris" => "Sunny, 22C".to_string(),
        other => format!("No data for {other}"),
    }
}

#[tokio::test]
async fn tool_round_then_answer_builds_linked_history() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[("call_1", "get_weather", r#"{"city":"Paris"}"#)]),
        text_reply("It is Sunny, 22C in Paris."),
    ]));
    let mut agent = Agent::builder(provider.clone()).build();
    agent
        .register_tool("get_weather", "Get current weather", get_weather)
        .expect("register");

    let answer = agent.run("weather in Paris?").await.expect("run");
    assert_eq!(answer, "It is Sunny, 22C in Paris.");

    let h = agent.history();
    let roles: Vec<Role> = h.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(h[0].content, "weather in Paris?");
    assert_eq!(h[1].tool_calls[0].name(), "get_weather");
    assert!(h[1].content.is_empty());
    assert_eq!(h[2].content, "Sunny, 22C");
    assert_eq!(h[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(h[2].name.as_deref(), Some("get_weather"));
    assert!(h[3].content.contains("Sunny, 22C"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "scripted-model");
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.7));
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].tools.len(), 1);

    let usage = agent.usage_totals();
    assert_eq!(usage.prompt_tokens, 18);
    assert_eq!(usage.completion_tokens, 8);
}

#[tokio::test]
async fn zero_choices_is_fatal_and_keeps_only_user_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(ChatResponse::default())]));
    let mut agent = Agent::new(provider);

    let err = agent.run("hello").await.unwrap_err();
    assert!(matches!(err, AgentError::NoChoices));
    assert_eq!(agent.history().len(), 1);
    assert_eq!(agent.history()[0].role, Role::User);
}

#[tokio::test]
async fn gemini_function_call_with_stop_reason_drives_tool_round() {
    let mut server = mockito::Server::new_async().await;
    let path = "/v1beta/models/gemini-2.5-flash:generateContent";
    let first = server
        .mock("POST", path)
        // Only the opening request has a single user turn in `contents`.
        .match_body(mockito::Matcher::Regex(
            r#"^\{"contents":\[\{"role":"user","parts":\[\{"text":"weather in Paris\?"\}\]\}\],"#
                .to_string(),
        ))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [
                        {"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}}
                    ]},
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", path)
        .match_body(mockito::Matcher::Regex("return_value".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Sunny, 22C."}]},
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let client = GeminiClient::new("g-test", "gemini-2.5-flash").with_base_url(&server.url());
    let mut agent = Agent::new(Arc::new(client));
    agent
        .register_tool("get_weather", "Get current weather", get_weather)
        .expect("register");

    let answer = agent.run("weather in Paris?").await.expect("run");
    first.assert_async().await;
    second.assert_async().await;

    assert_eq!(answer, "Sunny, 22C.");
    let h = agent.history();
    assert_eq!(h.len(), 4);
    let call_id = &h[1].tool_calls[0].id;
    assert!(call_id.starts_with("call_"));
    assert_eq!(h[2].tool_call_id.as_ref(), Some(call_id));
    assert_eq!(h[2].content, "Sunny, 22C");
}

#[tokio::test]
async fn sequential_calls_keep_request_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[
            ("call_a", "get_weather", r#"{"city":"Paris"}"#),
            ("call_b", "lookup_fact", r#"{"topic":"rust"}"#),
        ]),
        text_reply("done"),
    ]));
    let mut agent = Agent::new(provider);

    let seen = order.clone();
    agent
        .register_tool("get_weather", "weather", move |a: CityArgs| {
            seen.lock().expect("lock").push("get_weather");
            get_weather(a)
        })
        .expect("register");
    let seen = order.clone();
    agent
        .register_tool("lookup_fact", "facts", move |a: TopicArgs| {
            seen.lock().expect("lock").push("lookup_fact");
            format!("{} is a language", a.topic)
        })
        .expect("register");

    agent.run("two things").await.expect("run");

    assert_eq!(*order.lock().expect("lock"), ["get_weather", "lookup_fact"]);
    let h = agent.history();
    assert_eq!(h[1].tool_calls.len(), 2);
    assert_eq!(h[2].tool_call_id.as_deref(), Some("call_a"));
    assert_eq!(h[3].tool_call_id.as_deref(), Some("call_b"));
    assert_eq!(h[3].content, "rust is a language");
}

#[tokio::test]
async fn every_tool_result_answers_a_preceding_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[
            ("c1", "get_weather", r#"{"city":"Paris"}"#),
            ("c2", "missing_tool", "{}"),
        ]),
        tool_reply(&[("c3", "get_weather", r#"{"city": 5}"#)]),
        text_reply("ok"),
    ]));
    let mut agent = Agent::new(provider);
    agent
        .register_tool("get_weather", "weather", get_weather)
        .expect("register");

    agent.run("go").await.expect("run");

    let h = agent.history();
    for (i, m) in h.iter().enumerate() {
        if m.role != Role::Tool {
            continue;
        }
        let id = m.tool_call_id.as_deref().expect("tool result has call id");
        let answered = h[..i]
            .iter()
            .rev()
            .find(|p| p.role == Role::Assistant && !p.tool_calls.is_empty())
            .expect("preceding tool-call turn");
        assert!(answered.tool_calls.iter().any(|c| c.id == id), "{id}");
    }

    let unknown = h.iter().find(|m| m.tool_call_id.as_deref() == Some("c2"));
    assert!(unknown.is_some_and(|m| m.content.starts_with("Error executing tool: tool not found")));
    let mistyped = h.iter().find(|m| m.tool_call_id.as_deref() == Some("c3"));
    assert!(mistyped.is_some_and(|m| m.content.contains("invalid arguments")));
}

#[tokio::test]
async fn unexpected_finish_reason_is_reported() {
    let provider = Arc::new(ScriptedProvider::new(vec![reply_with_reason(
        FinishReason::Length,
    )]));
    let mut agent = Agent::new(provider);

    let err = agent.run("long story").await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::UnexpectedFinishReason(FinishReason::Length)
    ));
    assert_eq!(agent.history().len(), 1);
}

#[tokio::test]
async fn provider_errors_are_wrapped() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(
        parley_llm::LlmError::Status {
            vendor: "openai",
            status: 500,
            body: "boom".to_string(),
        },
    )]));
    let mut agent = Agent::new(provider);
    let err = agent.run("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(_)));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn tool_round_limit_stops_runaway_loops() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[("c1", "get_weather", "{}")]),
        tool_reply(&[("c2", "get_weather", "{}")]),
        tool_reply(&[("c3", "get_weather", "{}")]),
    ]));
    let mut agent = Agent::builder(provider).max_tool_rounds(2).build();
    agent
        .register_tool("get_weather", "weather", get_weather)
        .expect("register");

    let err = agent.run("loop").await.unwrap_err();
    assert!(matches!(err, AgentError::ToolRoundLimit(2)));
    // user + two committed rounds of (call, result)
    assert_eq!(agent.history().len(), 5);
}

#[tokio::test]
async fn empty_message_does_not_append_user_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_reply("hello again")]));
    let mut agent = Agent::builder(provider.clone())
        .system_prompt("Be brief.")
        .build();

    agent.run("").await.expect("run");
    let roles: Vec<Role> = agent.history().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::Assistant]);
    assert_eq!(provider.requests()[0].messages.len(), 1);
}

#[tokio::test]
async fn reset_keeps_system_prompt() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_reply("hi")]));
    let mut agent = Agent::builder(provider).system_prompt("Be brief.").build();
    agent.run("hello").await.expect("run");
    assert_eq!(agent.history().len(), 3);

    agent.reset();
    assert_eq!(agent.history().len(), 1);
    assert_eq!(agent.history()[0].role, Role::System);
    assert_eq!(agent.usage_totals().prompt_tokens, 0);
}

struct PendingProvider;

#[async_trait::async_trait]
impl parley_llm::ChatProvider for PendingProvider {
    async fn create_chat(
        &self,
        _req: &parley_llm::ChatRequest,
    ) -> parley_llm::Result<ChatResponse> {
        std::future::pending().await
    }

    fn model_name(&self) -> &str {
        "pending"
    }
}

#[tokio::test]
async fn cancellation_interrupts_provider_call() {
    let mut agent = Agent::new(Arc::new(PendingProvider));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = agent.run_with_cancel(&token, "hello").await.unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(agent.history().len(), 1);
}

#[tokio::test]
async fn cancellation_mid_round_discards_partial_results() {
    let provider = Arc::new(ScriptedProvider::new(vec![tool_reply(&[
        ("c1", "cancel_now", "{}"),
        ("c2", "get_weather", r#"{"city":"Paris"}"#),
    ])]));
    let token = CancellationToken::new();
    let mut agent = Agent::new(provider);

    let trigger = token.clone();
    agent
        .register_tool("cancel_now", "cancels the run", move |_: TopicArgs| {
            trigger.cancel();
            "cancelled"
        })
        .expect("register");
    agent
        .register_tool("get_weather", "weather", get_weather)
        .expect("register");

    let err = agent.run_with_cancel(&token, "go").await.unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(agent.history().len(), 1);
}

#[tokio::test]
async fn cancellation_interrupts_a_blocking_tool() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[("c1", "slow_lookup", r#"{"topic":"rust"}"#)]),
        text_reply("never sent"),
    ]));
    let mut agent = Agent::new(provider.clone());
    agent
        .register_tool("slow_lookup", "blocks for a while", |a: TopicArgs| {
            std::thread::sleep(Duration::from_millis(500));
            a.topic
        })
        .expect("register");

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = agent.run_with_cancel(&token, "go").await.unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(agent.history().len(), 1);
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn async_tools_join_the_tool_round() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[("c1", "fetch_fact", r#"{"topic":"rust"}"#)]),
        text_reply("Rust is memory safe."),
    ]));
    let mut agent = Agent::new(provider);
    agent
        .register_tool_async("fetch_fact", "async lookup", |a: TopicArgs| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            format!("{} fact", a.topic)
        })
        .expect("register");

    let reply = agent.run("tell me").await.expect("run");
    assert_eq!(reply, "Rust is memory safe.");
    let h = agent.history();
    assert_eq!(h[2].role, Role::Tool);
    assert_eq!(h[2].content, "rust fact");
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Observer for Recorder {
    fn on_llm_request(&self, req: &parley_llm::ChatRequest) {
        self.push(format!("request:{}", req.messages.len()));
    }

    fn on_llm_response(&self, resp: &ChatResponse, _elapsed: Duration) {
        self.push(format!("response:{}", resp.id));
    }

    fn on_tool_call(&self, name: &str, _arguments: &str) {
        self.push(format!("call:{name}"));
    }

    fn on_tool_result(&self, name: &str, result: Result<&str, &ToolError>, _elapsed: Duration) {
        self.push(format!("result:{name}:{}", result.is_ok()));
    }
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().expect("lock").push(event);
    }
}

#[tokio::test]
async fn observer_sees_requests_and_tool_traffic() {
    let recorder = Arc::new(Recorder::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_reply(&[("c1", "get_weather", r#"{"city":"Paris"}"#)]),
        text_reply("done"),
    ]));
    let mut agent = Agent::builder(provider)
        .observer(recorder.clone())
        .build();
    agent
        .register_tool("get_weather", "weather", get_weather)
        .expect("register");

    agent.run("hi").await.expect("run");

    assert_eq!(
        *recorder.events.lock().expect("lock"),
        [
            "request:1",
            "response:resp-tools",
            "call:get_weather",
            "result:get_weather:true",
            "request:3",
            "response:resp-text",
        ]
    );
}
