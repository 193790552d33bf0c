/// Services module
/// Behaviour behind the commands: processes, buffers, highlighting, plugins.
/// Nothing in here talks to the user directly.

pub mod buffer;
pub mod complete;
pub mod debug_session;
pub mod env;
pub mod explorer;
pub mod highlight;
pub mod plugins;
pub mod process;
pub mod runner;
pub mod tabs;

pub use buffer::EditorBuffer;
pub use debug_session::DebugBridge;
pub use highlight::{PythonTokenizer, Tokenizer};
pub use plugins::{Plugin, PluginHost, PluginRegistry};
pub use runner::RunLauncher;
pub use tabs::TabSet;
