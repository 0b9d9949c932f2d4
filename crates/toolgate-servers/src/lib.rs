// Built-in Tool Servers
//
// Each server is a named bundle of tools implementing
// `toolgate_core::ToolServer`. The gateway registers the servers it wants
// to expose; each task builds its registry from the servers it requests.

mod paths;

pub mod audio;
pub mod filesystem;
pub mod web_search;

pub use audio::AudioServer;
pub use filesystem::FilesystemServer;
pub use web_search::WebSearchServer;
