use serde::{Deserialize, Serialize};

/// Addresses one message previously posted to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    pub conversation_id: String,
    pub message_id: String,
}

impl MessageHandle {
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// One name/value row of a rich payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Structured message body (rendered as an embed on Discord).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichPayload {
    /// Plain text shown above the structured part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RichField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl RichPayload {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(RichField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Outbound message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Text { text: String },
    Rich(RichPayload),
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Rich(_) => None,
        }
    }

    /// Nothing the platform would render: blank text or a rich payload with
    /// no visible part.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text } => text.trim().is_empty(),
            Self::Rich(rich) => {
                rich.content.as_deref().is_none_or(|c| c.trim().is_empty())
                    && rich.title.is_none()
                    && rich.description.is_none()
                    && rich.fields.is_empty()
            },
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<RichPayload> for Payload {
    fn from(rich: RichPayload) -> Self {
        Self::Rich(rich)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_empty() {
        assert!(Payload::text("  \n").is_empty());
        assert!(!Payload::text("hi").is_empty());
    }

    #[test]
    fn rich_with_title_is_not_empty() {
        assert!(Payload::Rich(RichPayload::default()).is_empty());
        assert!(!Payload::from(RichPayload::titled("Information")).is_empty());
    }

    #[test]
    fn as_text_only_for_text() {
        assert_eq!(Payload::from("x").as_text(), Some("x"));
        assert_eq!(Payload::from(RichPayload::titled("t")).as_text(), None);
    }
}
