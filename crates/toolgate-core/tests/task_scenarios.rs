// End-to-end loop scenarios against the mock driver
//
// Covers the loop's observable contract: termination conditions, event
// pairing, the tool invocation budget, error propagation and cancellation.

use std::sync::Arc;

use serde_json::json;
use toolgate_core::memory::{CollectingEmitter, MockModelDriver, MockReply};
use toolgate_core::{
    build_toolset, CancelToken, ServerRegistry, StopReason, TaskConfig, TaskEvent, TaskRequest,
    TaskRunner, Tool, ToolCall, ToolServer, ToolStatus,
};

// ============================================================================
// Test fixtures
// ============================================================================

struct ListDirTool;

#[async_trait::async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List directory entries"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> toolgate_core::ToolExecution {
        toolgate_core::ToolExecution::success(json!({
            "entries": ["a.txt", "b.txt", "c.txt"]
        }))
    }
}

struct TestFsServer;

impl ToolServer for TestFsServer {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "Filesystem test tools"
    }

    fn tools(&self) -> Vec<Box<dyn Tool>> {
        vec![Box::new(ListDirTool)]
    }
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn runner_with_replies(replies: Vec<MockReply>) -> TaskRunner<MockModelDriver> {
    let mut servers = ServerRegistry::new();
    servers.register(TestFsServer);
    let toolset = build_toolset(
        "You are a helpful assistant.",
        &["filesystem".to_string()],
        &servers,
    );
    TaskRunner::new(
        TaskConfig::new("You are a helpful assistant.", "mock-model"),
        MockModelDriver::with_replies(replies),
        toolset,
    )
}

// ============================================================================
// Scenario A: no tool calls
// ============================================================================

#[tokio::test]
async fn no_tool_calls_terminates_after_one_round() {
    let runner = runner_with_replies(vec![MockReply::text("The answer is 42.")]);
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(
            &TaskRequest::new("What is the answer?"),
            &emitter,
            &CancelToken::new(),
        )
        .await;

    assert!(report.success);
    assert_eq!(report.stop_reason, StopReason::Done);
    assert_eq!(report.total_steps(), 0);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.result, "The answer is 42.");
    assert_eq!(emitter.kinds().await, vec!["start", "complete"]);
}

// ============================================================================
// Scenario B: one successful tool call
// ============================================================================

#[tokio::test]
async fn single_tool_call_produces_paired_events() {
    let runner = runner_with_replies(vec![
        MockReply::with_tools("", vec![call("call_1", "list_dir", json!({"path": "."}))]),
        MockReply::text("There are three files."),
    ]);
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(
            &TaskRequest::new("List the current directory"),
            &emitter,
            &CancelToken::new(),
        )
        .await;

    assert!(report.success);
    assert_eq!(report.total_steps(), 1);
    assert_eq!(report.rounds, 2);
    assert_eq!(
        emitter.kinds().await,
        vec!["start", "tool_start", "tool_result", "complete"]
    );

    let events = emitter.events().await;
    let TaskEvent::ToolResult { data, .. } = &events[2] else {
        panic!("Expected tool_result");
    };
    assert_eq!(data.status, ToolStatus::Success);
    assert_eq!(data.step_number, 1);
    assert_eq!(data.server_name, "filesystem");
    assert_eq!(data.result["entries"].as_array().unwrap().len(), 3);
}

// ============================================================================
// Scenario C: unknown tool name
// ============================================================================

#[tokio::test]
async fn unknown_tool_is_reported_and_loop_continues() {
    let runner = runner_with_replies(vec![
        MockReply::with_tools("", vec![call("call_1", "nonexistent_tool", json!({}))]),
        MockReply::text("I could not use that tool."),
    ]);
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(&TaskRequest::new("Use a made-up tool"), &emitter, &CancelToken::new())
        .await;

    // The failed call is reported inline and the loop proceeded to round 2
    assert!(report.success);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.total_steps(), 1);
    assert_eq!(report.steps[0].status, ToolStatus::Error);
    assert!(report.steps[0]
        .result
        .as_str()
        .unwrap()
        .contains("does not exist"));

    let events = emitter.events().await;
    let TaskEvent::ToolResult { data, .. } = &events[2] else {
        panic!("Expected tool_result");
    };
    assert_eq!(data.status, ToolStatus::Error);
}

// ============================================================================
// Scenario D: tool budget
// ============================================================================

#[tokio::test]
async fn eleventh_tool_call_is_dropped_and_loop_stops() {
    // Three rounds declaring 4 + 4 + 3 calls; the 11th must not run
    let round = |start: usize, n: usize| {
        let calls = (start..start + n)
            .map(|i| call(&format!("call_{i}"), "list_dir", json!({"path": "."})))
            .collect();
        MockReply::with_tools("", calls)
    };
    let runner = runner_with_replies(vec![
        round(1, 4),
        round(5, 4),
        round(9, 3),
        MockReply::text("never reached"),
    ]);
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(&TaskRequest::new("Do a lot of listing"), &emitter, &CancelToken::new())
        .await;

    assert!(!report.success);
    assert_eq!(report.stop_reason, StopReason::ToolBudget);
    assert_eq!(report.total_steps(), 10);

    let kinds = emitter.kinds().await;
    let starts = kinds.iter().filter(|k| **k == "tool_start").count();
    let results = kinds.iter().filter(|k| **k == "tool_result").count();
    assert_eq!(starts, 10);
    assert_eq!(results, 10);
    // Terminates without a final no-tool-call round
    assert_eq!(kinds.last(), Some(&"complete"));
}

#[tokio::test]
async fn every_tool_start_pairs_with_one_tool_result() {
    let runner = runner_with_replies(vec![
        MockReply::with_tools(
            "",
            vec![
                call("call_1", "list_dir", json!({"path": "."})),
                call("call_2", "nonexistent_tool", json!({})),
                call("call_3", "list_dir", json!({"path": "/"})),
            ],
        ),
        MockReply::text("done"),
    ]);
    let emitter = CollectingEmitter::new();

    runner
        .run(&TaskRequest::new("mixed calls"), &emitter, &CancelToken::new())
        .await;

    let mut open_steps = Vec::new();
    for event in emitter.events().await {
        match event {
            TaskEvent::ToolStart { data, .. } => open_steps.push(data.step_number),
            TaskEvent::ToolResult { data, .. } => {
                // Results pair with the most recent start, in order
                assert_eq!(open_steps.pop(), Some(data.step_number));
            }
            _ => {}
        }
    }
    assert!(open_steps.is_empty());
}

// ============================================================================
// Scenario E: model failure mid-task
// ============================================================================

#[tokio::test]
async fn model_failure_emits_single_error_and_stops() {
    let runner = runner_with_replies(vec![
        MockReply::with_tools("", vec![call("call_1", "list_dir", json!({"path": "."}))]),
        MockReply::failure("simulated network failure"),
    ]);
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(&TaskRequest::new("List files"), &emitter, &CancelToken::new())
        .await;

    assert!(!report.success);
    assert_eq!(report.stop_reason, StopReason::Error);
    // The partially built step list is preserved
    assert_eq!(report.total_steps(), 1);

    let kinds = emitter.kinds().await;
    assert_eq!(
        kinds,
        vec!["start", "tool_start", "tool_result", "error"]
    );

    let events = emitter.events().await;
    let TaskEvent::Error { data, .. } = events.last().unwrap() else {
        panic!("Expected error event");
    };
    assert_eq!(data.error_type, "model");
    assert!(data.message.contains("simulated network failure"));
}

// ============================================================================
// Round limit
// ============================================================================

#[tokio::test]
async fn round_exhaustion_is_reported_as_failure() {
    // Every round declares a tool call; the loop gives up after max_rounds
    let replies: Vec<MockReply> = (0..5)
        .map(|i| {
            MockReply::with_tools(
                "",
                vec![call(&format!("call_{i}"), "list_dir", json!({"path": "."}))],
            )
        })
        .collect();

    let mut servers = ServerRegistry::new();
    servers.register(TestFsServer);
    let toolset = build_toolset("sp", &["filesystem".to_string()], &servers);
    let runner = TaskRunner::new(
        TaskConfig::new("sp", "mock-model").with_max_rounds(3),
        MockModelDriver::with_replies(replies),
        toolset,
    );
    let emitter = CollectingEmitter::new();

    let report = runner
        .run(&TaskRequest::new("loop forever"), &emitter, &CancelToken::new())
        .await;

    assert!(!report.success);
    assert_eq!(report.stop_reason, StopReason::RoundLimit);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.total_steps(), 3);
    assert!(report.summary.contains("round limit reached"));
}

// ============================================================================
// Streaming and cancellation
// ============================================================================

#[tokio::test]
async fn spawned_task_streams_events_in_order() {
    let runner = Arc::new(runner_with_replies(vec![
        MockReply::with_tools("", vec![call("call_1", "list_dir", json!({"path": "."}))]),
        MockReply::text("There are three files."),
    ]));

    let (handle, events) = runner.spawn(TaskRequest::new("List files"));

    let collected = events.collect().await;
    let report = handle.join().await.unwrap();

    assert!(report.success);
    let kinds: Vec<_> = collected.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["start", "tool_start", "tool_result", "complete"]);
    assert!(collected.iter().all(|e| e.task_id() == report.task_id));
}

#[tokio::test]
async fn cancellation_stops_the_loop_before_the_next_round() {
    let runner = runner_with_replies(vec![
        MockReply::with_tools("", vec![call("call_1", "list_dir", json!({"path": "."}))]),
        MockReply::text("never reached"),
    ]);
    let emitter = CollectingEmitter::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = runner
        .run(&TaskRequest::new("List files"), &emitter, &cancel)
        .await;

    assert!(!report.success);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.rounds, 0);

    let events = emitter.events().await;
    let TaskEvent::Error { data, .. } = events.last().unwrap() else {
        panic!("Expected error event");
    };
    assert_eq!(data.error_type, "cancelled");
}

#[tokio::test]
async fn dropping_the_event_stream_cancels_the_task() {
    // A long script that would run many rounds if never cancelled
    let replies: Vec<MockReply> = (0..8)
        .map(|i| {
            MockReply::with_tools(
                "",
                vec![call(&format!("call_{i}"), "list_dir", json!({"path": "."}))],
            )
        })
        .collect();
    let runner = Arc::new(runner_with_replies(replies));

    let (handle, events) = runner.spawn(TaskRequest::new("List files"));
    drop(events);

    let report = handle.join().await.unwrap();
    assert!(!report.success);
    assert_eq!(report.stop_reason, StopReason::Cancelled);
}

// ============================================================================
// Usage aggregation
// ============================================================================

#[tokio::test]
async fn usage_metadata_is_folded_into_the_report() {
    let driver = MockModelDriver::with_replies(vec![MockReply::text("done")]);
    driver
        .set_usage(toolgate_core::CompletionMetadata {
            prompt_tokens: Some(120),
            completion_tokens: Some(30),
            total_tokens: Some(150),
            model: Some("mock-model".to_string()),
            finish_reason: Some("stop".to_string()),
        })
        .await;

    let mut servers = ServerRegistry::new();
    servers.register(TestFsServer);
    let toolset = build_toolset("sp", &["filesystem".to_string()], &servers);
    let runner = TaskRunner::new(TaskConfig::new("sp", "mock-model"), driver, toolset);

    let report = runner
        .run(&TaskRequest::new("quick"), &CollectingEmitter::new(), &CancelToken::new())
        .await;

    assert_eq!(report.usage.calls.len(), 1);
    assert_eq!(report.usage.total_tokens(), 150);
    let totals = report.usage.per_model.get("mock-model").unwrap();
    assert_eq!(totals.input_tokens, 120);
    assert_eq!(totals.output_tokens, 30);
    assert!(report.summary.contains("150 tokens"));
}
