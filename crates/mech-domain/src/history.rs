use serde::{Deserialize, Serialize};

/// Role of a `Message` history item (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Developer,
    System,
}

/// Message content: either plain text or a structured content array
/// (text/image parts). Tool calls and their outputs are never carried in
/// `MessageContent` — they are their own `HistoryItem` variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
}

impl MessageContent {
    /// Extract and join all text content, returning an owned String.
    pub fn extract_all_text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Status attached to a history item. `Incomplete` marks a synthesized
/// `FunctionCallOutput` produced by the repair pass (spec.md §4.A phase 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Completed,
    Incomplete,
}

/// One entry of the conversation history (spec.md §3 `HistoryItem`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryItem {
    #[serde(rename = "message")]
    Message {
        role: Role,
        content: MessageContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<HistoryStatus>,
    },
    #[serde(rename = "thinking")]
    Thinking {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<HistoryStatus>,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        call_id: String,
        name: String,
        /// Raw JSON as emitted by the LLM — parsed downstream by the
        /// dispatcher (spec.md §4.B step 1.a), never eagerly here.
        arguments: String,
    },
    #[serde(rename = "function_call_output")]
    FunctionCallOutput {
        call_id: String,
        name: String,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<HistoryStatus>,
    },
}

impl HistoryItem {
    pub fn user(text: impl Into<String>) -> Self {
        HistoryItem::Message {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            status: None,
        }
    }

    pub fn developer(text: impl Into<String>) -> Self {
        HistoryItem::Message {
            role: Role::Developer,
            content: MessageContent::Text(text.into()),
            status: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        HistoryItem::Message {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            status: None,
        }
    }

    pub fn function_call(call_id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        HistoryItem::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn function_call_output(call_id: impl Into<String>, name: impl Into<String>, output: impl Into<String>) -> Self {
        HistoryItem::FunctionCallOutput {
            call_id: call_id.into(),
            name: name.into(),
            output: output.into(),
            status: None,
        }
    }

    /// The call id this item carries, if it is a function call or output.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            HistoryItem::FunctionCall { call_id, .. } => Some(call_id),
            HistoryItem::FunctionCallOutput { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_all_text_from_text_variant() {
        let content = MessageContent::Text("hello world".into());
        assert_eq!(content.extract_all_text(), "hello world");
    }

    #[test]
    fn extract_all_text_from_parts_joins_with_newline() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "line one".into() },
            ContentPart::Image { url: "http://x".into(), media_type: None },
            ContentPart::Text { text: "line two".into() },
        ]);
        assert_eq!(content.extract_all_text(), "line one\nline two");
    }

    #[test]
    fn extract_all_text_empty_parts() {
        let content = MessageContent::Parts(vec![]);
        assert_eq!(content.extract_all_text(), "");
    }

    #[test]
    fn call_id_present_on_function_items_only() {
        let call = HistoryItem::function_call("c1", "exec", "{}");
        let output = HistoryItem::function_call_output("c1", "exec", "ok");
        let msg = HistoryItem::user("hi");
        assert_eq!(call.call_id(), Some("c1"));
        assert_eq!(output.call_id(), Some("c1"));
        assert_eq!(msg.call_id(), None);
    }
}
