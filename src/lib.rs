pub mod app;
pub mod config;
pub mod conversation;
pub mod handler;
pub mod logging;
pub mod markdown;
pub mod transport;
pub mod tui;
pub mod ui;
pub mod view;

// Re-export main types for convenience
pub use app::{App, Phase};
pub use config::Config;
pub use conversation::{Conversation, Role, Turn};
pub use markdown::{render_markdown, MarkdownOptions};
pub use transport::{ChatClient, ChatResponse, TransportError, TransportErrorKind};
