use serde::{Deserialize, Serialize};

/// A single message exchanged with a language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    /// Concatenates every text part of this message.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("")
    }
}

impl Part {
    /// Returns the text content if this is a Text part, None otherwise
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
        }
    }

    pub fn text_part(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_with_text() {
        let content = Content::new("user").with_text("Hello").with_text(", world");
        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 2);
        assert_eq!(content.text(), "Hello, world");
    }

    #[test]
    fn test_part_serializes_untagged() {
        let part = Part::text_part("hi");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hi" }));

        let decoded: Part = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.text(), Some("hi"));
    }
}
