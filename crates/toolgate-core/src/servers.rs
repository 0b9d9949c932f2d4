// Tool server abstraction
//
// A tool server is a named bundle of tools with an optional system prompt
// addition. The gateway registers server implementations once at startup;
// each task builds its own read-only ToolRegistry from the servers the
// request names.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::tool_types::ToolDefinition;
use crate::tools::{Tool, ToolRegistry};

/// Trait for implementing tool servers that contribute tools to a task.
///
/// A server can contribute:
/// - Tools (added to the task's registry and advertised to the model)
/// - A system prompt addition describing how to use them
pub trait ToolServer: Send + Sync {
    /// Returns the unique server name (used in task requests)
    fn name(&self) -> &str;

    /// Returns a description of what this server provides
    fn description(&self) -> &str;

    /// Returns text to prepend to the task's system prompt (optional)
    fn system_prompt_addition(&self) -> Option<&str> {
        None
    }

    /// Returns the tools provided by this server
    fn tools(&self) -> Vec<Box<dyn Tool>>;
}

/// Registry holding all available tool server implementations
#[derive(Default)]
pub struct ServerRegistry {
    servers: HashMap<String, Arc<dyn ToolServer>>,
}

impl ServerRegistry {
    /// Create a new empty server registry
    pub fn new() -> Self {
        Self {
            servers: HashMap::new(),
        }
    }

    /// Register a tool server
    pub fn register(&mut self, server: impl ToolServer + 'static) {
        self.register_arc(Arc::new(server));
    }

    /// Register an Arc-wrapped tool server
    pub fn register_arc(&mut self, server: Arc<dyn ToolServer>) {
        self.servers.insert(server.name().to_string(), server);
    }

    /// Get a server by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolServer>> {
        self.servers.get(name)
    }

    /// Check if a server is registered
    pub fn has(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// All registered servers
    pub fn list(&self) -> Vec<&Arc<dyn ToolServer>> {
        self.servers.values().collect()
    }

    /// Number of registered servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl std::fmt::Debug for ServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.servers.keys().collect();
        f.debug_struct("ServerRegistry")
            .field("servers", &names)
            .finish()
    }
}

/// Everything a task needs from its requested tool servers
pub struct TaskToolset {
    /// Per-task tool registry (read-only for the task's duration)
    pub registry: ToolRegistry,
    /// Definitions advertised to the model
    pub definitions: Vec<ToolDefinition>,
    /// Final system prompt: server additions followed by the base prompt
    pub system_prompt: String,
    /// Names of the servers that resolved
    pub servers: Vec<String>,
}

/// Build the per-task toolset from the requested server names.
///
/// Servers are applied in request order. Unknown server names are skipped
/// with a warning; the task proceeds with the servers that resolved.
pub fn build_toolset(
    base_prompt: &str,
    requested: &[String],
    registry: &ServerRegistry,
) -> TaskToolset {
    let mut prompt_parts: Vec<String> = Vec::new();
    let mut tool_registry = ToolRegistry::new();
    let mut resolved: Vec<String> = Vec::new();

    for name in requested {
        let Some(server) = registry.get(name) else {
            warn!(server = %name, "Requested tool server is not registered; skipping");
            continue;
        };

        if let Some(addition) = server.system_prompt_addition() {
            prompt_parts.push(addition.to_string());
        }

        for tool in server.tools() {
            tool_registry.register_boxed(server.name(), tool);
        }

        resolved.push(server.name().to_string());
    }

    let mut system_prompt = String::new();
    if !prompt_parts.is_empty() {
        system_prompt.push_str(&prompt_parts.join("\n\n"));
        system_prompt.push_str("\n\n");
    }
    system_prompt.push_str(base_prompt);

    let definitions = tool_registry.definitions();

    TaskToolset {
        registry: tool_registry,
        definitions,
        system_prompt,
        servers: resolved,
    }
}
