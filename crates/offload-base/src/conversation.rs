use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One piece of turn content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ContentPart {
    Text(String),
    /// Encoded image bytes (PNG, JPEG, ...), passed to the engine untouched
    Image(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: Vec<ContentPart>,
    /// Creation time (ms since UNIX epoch)
    #[serde(default)]
    pub timestamp_ms: u64,
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

impl ConversationTurn {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self { role: Role::User, content, timestamp_ms: now_ms() }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentPart::Text(text.into())])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: vec![ContentPart::Text(text.into())], timestamp_ms: now_ms() }
    }

    /// Empty assistant turn that streamed chunks are appended to
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// All text parts, joined with newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_text(&self) -> bool {
        self.content.iter().any(|part| matches!(part, ContentPart::Text(t) if !t.trim().is_empty()))
    }

    pub fn has_image(&self) -> bool {
        self.content.iter().any(|part| matches!(part, ContentPart::Image(bytes) if !bytes.is_empty()))
    }

    pub fn images(&self) -> impl Iterator<Item = &[u8]> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::Image(bytes) => Some(bytes.as_slice()),
            ContentPart::Text(_) => None,
        })
    }

    /// Concatenate a chunk onto the trailing text part
    pub fn append_text(&mut self, chunk: &str) {
        if let Some(ContentPart::Text(last)) = self.content.last_mut() {
            last.push_str(chunk);
        } else {
            self.content.push(ContentPart::Text(chunk.to_string()));
        }
    }

    /// Replace all content with a single text part
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = vec![ContentPart::Text(text.into())];
    }
}

/// The most recent user turn: the only one eligible to trigger generation
pub fn last_user_turn(turns: &[ConversationTurn]) -> Option<&ConversationTurn> {
    turns.iter().rev().find(|t| t.is_user())
}
