// Adapters to the outside world: the PowerShell parse tool, the tree
// document codec, settings, logging and the worker pool.

pub mod concurrency;
pub mod config;
pub mod logging;
pub mod powershell_runner;
pub mod xml;

pub use config::Settings;
pub use powershell_runner::{ParserSettings, PowerShellParser};
pub use xml::{read_tree, read_tree_file, write_tree, XmlTreeCodec};
