//! Pure projection of the conversation into what the UI draws
//!
//! `build` is called on every frame; the ratatui layer in `ui` only lays the
//! result out.

use ratatui::text::Text;

use crate::conversation::{Conversation, Role};
use crate::markdown::{render_markdown, MarkdownOptions};

pub const INPUT_PLACEHOLDER: &str = "Type a message...";
pub const SEND_LABEL: &str = "Send";
pub const SEND_LABEL_BUSY: &str = "...";

#[derive(Debug, Clone)]
pub struct Bubble {
    pub role: Role,
    pub body: Text<'static>,
}

#[derive(Debug, Clone)]
pub struct ViewModel {
    pub bubbles: Vec<Bubble>,
    /// Show the typing indicator under the last bubble
    pub typing: bool,
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub send_label: &'static str,
    pub placeholder: &'static str,
}

pub fn build(conversation: &Conversation, loading: bool, markdown: &MarkdownOptions) -> ViewModel {
    let bubbles = conversation
        .turns()
        .iter()
        .filter(|turn| !turn.content.is_empty())
        .map(|turn| Bubble {
            role: turn.role,
            body: match turn.role {
                Role::Assistant => render_markdown(&turn.content, markdown),
                // User text is shown exactly as typed
                Role::User => Text::raw(turn.content.clone()),
            },
        })
        .collect();

    ViewModel {
        bubbles,
        typing: loading,
        input_enabled: !loading,
        send_enabled: !loading,
        send_label: if loading { SEND_LABEL_BUSY } else { SEND_LABEL },
        placeholder: INPUT_PLACEHOLDER,
    }
}
