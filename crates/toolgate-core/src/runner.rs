// Task Runner
//
// The main orchestrator for task execution. Drives the model through
// bounded rounds of generate → dispatch tools → feed results back, emitting
// progress events through the event channel and folding usage and step
// outcomes into a terminal report.
//
// Invariants upheld here:
// - every tool_start is followed by exactly one tool_result
// - round N's tool results are appended before round N+1 begins
// - at most one terminal event (complete or error) per task
// - total dispatched tool calls never exceed the configured budget

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::channel::{event_channel, EventEmitter, EventStream, DEFAULT_EVENT_CAPACITY};
use crate::config::TaskConfig;
use crate::dispatch::ToolDispatcher;
use crate::driver::{ModelCallConfig, ModelDriver, ModelMessage};
use crate::error::{Result, TaskError};
use crate::events::{StopReason, TaskEvent};
use crate::message::Message;
use crate::report::{StepRecord, TaskReport};
use crate::servers::TaskToolset;
use crate::tool_types::ToolDefinition;
use crate::usage::UsageAggregator;

/// One natural-language task submitted to the gateway
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Task identifier
    pub id: Uuid,
    /// The natural-language task text
    pub task: String,
}

impl TaskRequest {
    /// Create a request with a fresh time-ordered ID
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            task: task.into(),
        }
    }
}

/// Handle to a spawned task execution
pub struct TaskHandle {
    cancel: CancelToken,
    handle: tokio::task::JoinHandle<TaskReport>,
}

impl TaskHandle {
    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone the cancellation token
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Check whether the background task has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to finish and return its report
    pub async fn join(self) -> Result<TaskReport> {
        self.handle
            .await
            .map_err(|e| TaskError::Internal(anyhow::anyhow!("task panicked: {e}")))
    }
}

/// The task runner: owns one task's configuration, toolset and driver.
///
/// All collaborators are injected; there is no global state. The per-task
/// tool registry inside the dispatcher is read-only for the task's
/// duration.
pub struct TaskRunner<D: ModelDriver> {
    config: TaskConfig,
    driver: Arc<D>,
    dispatcher: ToolDispatcher,
    definitions: Vec<ToolDefinition>,
    system_prompt: String,
    servers: Vec<String>,
}

impl<D: ModelDriver> TaskRunner<D> {
    /// Create a runner from a config, driver and resolved toolset
    pub fn new(config: TaskConfig, driver: D, toolset: TaskToolset) -> Self {
        Self::with_arc(config, Arc::new(driver), toolset)
    }

    /// Create a runner with an Arc-wrapped driver
    pub fn with_arc(config: TaskConfig, driver: Arc<D>, toolset: TaskToolset) -> Self {
        Self {
            config,
            driver,
            dispatcher: ToolDispatcher::new(toolset.registry),
            definitions: toolset.definitions,
            system_prompt: toolset.system_prompt,
            servers: toolset.servers,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Run the complete loop for one task, emitting events as it goes.
    ///
    /// This never returns an error: model failures, cancellation and limit
    /// exhaustion are all folded into the returned report, with the
    /// corresponding terminal event emitted on the way out.
    pub async fn run(
        &self,
        request: &TaskRequest,
        emitter: &dyn EventEmitter,
        cancel: &CancelToken,
    ) -> TaskReport {
        let started = Instant::now();
        info!(task_id = %request.id, model = %self.config.model, "Starting task");

        let mut steps: Vec<StepRecord> = Vec::new();
        let mut usage = UsageAggregator::new();
        let mut final_text = String::new();
        let mut rounds = 0;

        if !self
            .try_emit(
                emitter,
                cancel,
                TaskEvent::start(
                    request.id,
                    &request.task,
                    &self.config.model,
                    self.servers.clone(),
                ),
            )
            .await
        {
            return self.finish(
                request.id,
                StopReason::Cancelled,
                final_text,
                steps,
                rounds,
                started,
                usage,
            );
        }

        let mut messages = vec![
            Message::system(&self.system_prompt),
            Message::user(&request.task),
        ];

        let call_config = ModelCallConfig::from_task(&self.config, self.definitions.clone());

        let stop_reason = 'outer: loop {
            if rounds >= self.config.max_rounds {
                warn!(
                    task_id = %request.id,
                    max = self.config.max_rounds,
                    "Round limit reached without a final answer"
                );
                break StopReason::RoundLimit;
            }

            if cancel.is_cancelled() {
                self.emit_cancelled(request.id, emitter).await;
                break StopReason::Cancelled;
            }

            rounds += 1;
            info!(task_id = %request.id, round = rounds, "Starting round");

            let model_messages: Vec<ModelMessage> =
                messages.iter().map(ModelMessage::from).collect();

            let response = match self.driver.generate(model_messages, &call_config).await {
                Ok(response) => response,
                Err(err) => {
                    error!(task_id = %request.id, round = rounds, error = %err, "Model generation failed");
                    self.try_emit(
                        emitter,
                        cancel,
                        TaskEvent::error(request.id, err.to_string(), "model"),
                    )
                    .await;
                    break StopReason::Error;
                }
            };

            usage.record(&call_config.model, &response.metadata);

            let has_tool_calls = response.has_tool_calls();

            if !response.text.is_empty() || has_tool_calls {
                let assistant_msg = if let Some(ref tool_calls) = response.tool_calls {
                    Message::assistant_with_tools(&response.text, tool_calls.clone())
                } else {
                    Message::assistant(&response.text)
                };
                if !response.text.is_empty() {
                    final_text = response.text.clone();
                }
                messages.push(assistant_msg);
            }

            // No tool calls: the response is the final answer
            if !has_tool_calls {
                break StopReason::Done;
            }

            let tool_calls = response.tool_calls.unwrap_or_default();

            for (index, call) in tool_calls.iter().enumerate() {
                if steps.len() >= self.config.max_tool_calls {
                    // Remaining calls in this round are dropped without events
                    warn!(
                        task_id = %request.id,
                        budget = self.config.max_tool_calls,
                        dropped = tool_calls.len() - index,
                        "Tool call budget exhausted; dropping remaining calls"
                    );
                    break 'outer StopReason::ToolBudget;
                }

                if cancel.is_cancelled() {
                    self.emit_cancelled(request.id, emitter).await;
                    break 'outer StopReason::Cancelled;
                }

                let step_number = steps.len() + 1;
                let server_name = self
                    .dispatcher
                    .server_of(&call.name)
                    .unwrap_or("unknown")
                    .to_string();

                if !self
                    .try_emit(
                        emitter,
                        cancel,
                        TaskEvent::tool_start(
                            request.id,
                            step_number,
                            &server_name,
                            &call.name,
                            call.arguments.clone(),
                        ),
                    )
                    .await
                {
                    break 'outer StopReason::Cancelled;
                }

                let result = self.dispatcher.dispatch(call).await;

                if !self
                    .try_emit(
                        emitter,
                        cancel,
                        TaskEvent::tool_result(
                            request.id,
                            step_number,
                            &server_name,
                            &call.name,
                            result.status,
                            result.result.clone(),
                            result.execution_time_ms,
                        ),
                    )
                    .await
                {
                    break 'outer StopReason::Cancelled;
                }

                messages.push(Message::tool_result(
                    &call.id,
                    result.result.clone(),
                    result.status,
                ));

                steps.push(StepRecord {
                    step_number,
                    server_name,
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result: result.result,
                    status: result.status,
                    execution_time_ms: result.execution_time_ms,
                });
            }
        };

        let report = self.finish(
            request.id,
            stop_reason,
            final_text,
            steps,
            rounds,
            started,
            usage,
        );

        // Terminal complete event; error paths already emitted theirs
        if !matches!(stop_reason, StopReason::Error | StopReason::Cancelled) {
            let event = TaskEvent::complete(
                request.id,
                report.success,
                report.stop_reason,
                report.result.clone(),
                report.total_steps(),
                report.total_execution_time_ms,
                report.usage.clone(),
            );
            if let Err(err) = emitter.emit(event).await {
                warn!(task_id = %request.id, error = %err, "Failed to emit complete event");
            }
        }

        info!(
            task_id = %request.id,
            success = report.success,
            rounds = report.rounds,
            steps = report.total_steps(),
            "Task finished"
        );

        report
    }

    /// Spawn the loop as a background task paired with a draining stream.
    ///
    /// The returned stream yields events in FIFO order and ends once the
    /// loop finishes and the queue is drained. Dropping the stream cancels
    /// the task at its next checkpoint.
    pub fn spawn(self: Arc<Self>, request: TaskRequest) -> (TaskHandle, EventStream)
    where
        D: 'static,
    {
        let (emitter, events) = event_channel(DEFAULT_EVENT_CAPACITY);
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move { self.run(&request, &emitter, &token).await });

        (TaskHandle { cancel, handle }, events)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        task_id: Uuid,
        stop_reason: StopReason,
        final_text: String,
        steps: Vec<StepRecord>,
        rounds: usize,
        started: Instant,
        usage: UsageAggregator,
    ) -> TaskReport {
        TaskReport::new(
            task_id,
            stop_reason == StopReason::Done,
            stop_reason,
            final_text,
            steps,
            rounds,
            started.elapsed().as_millis() as u64,
            usage.finish(),
        )
    }

    /// Emit an event; a failed emit means the consumer disconnected, which
    /// cancels the task so the producer never outlives its consumer.
    async fn try_emit(
        &self,
        emitter: &dyn EventEmitter,
        cancel: &CancelToken,
        event: TaskEvent,
    ) -> bool {
        match emitter.emit(event).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Event emission failed; cancelling task");
                cancel.cancel();
                false
            }
        }
    }

    async fn emit_cancelled(&self, task_id: Uuid, emitter: &dyn EventEmitter) {
        if let Err(err) = emitter
            .emit(TaskEvent::error(task_id, "task cancelled", "cancelled"))
            .await
        {
            warn!(task_id = %task_id, error = %err, "Failed to emit cancellation event");
        }
    }
}
