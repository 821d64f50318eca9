use serde_json::Value;

/// Which accumulator is currently open (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBlock {
    None,
    Thinking,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Thinking,
    Output,
    ToolCall,
    Error,
    System,
}

/// A committed entry in the ordered structural message list.
#[derive(Debug, Clone)]
pub struct StructuralMessage {
    pub id: String,
    pub kind: MessageKind,
    pub text: String,
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    pub tool_result: Option<Value>,
    pub tool_error: Option<String>,
    pub tool_duration_ms: Option<u64>,
    pub done: bool,
}

impl StructuralMessage {
    pub fn text(id: String, kind: MessageKind, text: impl Into<String>, done: bool) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
            tool_call_id: None,
            tool_name: None,
            tool_result: None,
            tool_error: None,
            tool_duration_ms: None,
            done,
        }
    }

    pub fn tool_call(id: String, tool_call_id: String, name: Option<String>) -> Self {
        Self {
            id,
            kind: MessageKind::ToolCall,
            text: String::new(),
            tool_call_id: Some(tool_call_id),
            tool_name: name,
            tool_result: None,
            tool_error: None,
            tool_duration_ms: None,
            done: false,
        }
    }
}
