// OpenAI-Protocol Model Driver
//
// Implementation of `toolgate_core::ModelDriver` for OpenAI-compatible chat
// completion endpoints with streaming responses and tool calls.

mod driver;

#[cfg(test)]
mod tests;

pub use driver::OpenAiDriver;
