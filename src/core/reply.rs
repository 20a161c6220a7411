//! Turn whatever the chat backend returns into display text.
//!
//! Backends answer in several shapes. [`ReplyShape::classify`] checks them in
//! a fixed order and the first match wins.

use serde_json::Value;

pub const UNREADABLE_REPLY: &str = "[unreadable response]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape<'a> {
    /// The payload is a bare JSON string.
    Plain(&'a str),
    /// `{ "text": "..." }`
    Text(&'a str),
    /// `{ "content": "..." }`
    Content(&'a str),
    /// OpenAI style `{ "choices": [{ "message": { "content": "..." } }] }`
    Choices(&'a str),
    /// `{ "answer": "..." }`
    Answer(&'a str),
    Unreadable,
}

impl<'a> ReplyShape<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        if let Value::String(text) = payload {
            return ReplyShape::Plain(text);
        }
        if let Some(text) = non_empty_str(payload.get("text")) {
            return ReplyShape::Text(text);
        }
        if let Some(text) = non_empty_str(payload.get("content")) {
            return ReplyShape::Content(text);
        }
        if let Some(text) = non_empty_str(payload.pointer("/choices/0/message/content")) {
            return ReplyShape::Choices(text);
        }
        if let Some(text) = non_empty_str(payload.get("answer")) {
            return ReplyShape::Answer(text);
        }
        ReplyShape::Unreadable
    }

    pub fn text(self) -> &'a str {
        match self {
            ReplyShape::Plain(text)
            | ReplyShape::Text(text)
            | ReplyShape::Content(text)
            | ReplyShape::Choices(text)
            | ReplyShape::Answer(text) => text,
            ReplyShape::Unreadable => UNREADABLE_REPLY,
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

pub fn normalize_reply(payload: &Value) -> String {
    ReplyShape::classify(payload).text().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_shapes_are_recognized() {
        assert_eq!(normalize_reply(&json!("hello")), "hello");
        assert_eq!(normalize_reply(&json!({ "text": "a" })), "a");
        assert_eq!(normalize_reply(&json!({ "content": "c" })), "c");
        assert_eq!(
            normalize_reply(&json!({ "choices": [{ "message": { "content": "b" } }] })),
            "b"
        );
        assert_eq!(normalize_reply(&json!({ "answer": "42" })), "42");
        assert_eq!(normalize_reply(&json!({})), UNREADABLE_REPLY);
    }

    #[test]
    fn earlier_shapes_win() {
        let payload = json!({ "answer": "late", "content": "early", "text": "first" });
        assert_eq!(ReplyShape::classify(&payload), ReplyShape::Text("first"));

        let payload = json!({
            "answer": "late",
            "choices": [{ "message": { "content": "choice" } }]
        });
        assert_eq!(ReplyShape::classify(&payload), ReplyShape::Choices("choice"));
    }

    #[test]
    fn non_string_and_empty_fields_fall_through() {
        assert_eq!(
            normalize_reply(&json!({ "text": 7, "content": "fallback" })),
            "fallback"
        );
        assert_eq!(
            normalize_reply(&json!({ "text": "", "answer": "kept" })),
            "kept"
        );
        assert_eq!(
            normalize_reply(&json!({ "choices": [] })),
            UNREADABLE_REPLY
        );
        assert_eq!(
            normalize_reply(&json!({ "choices": [{ "message": { "content": null } }] })),
            UNREADABLE_REPLY
        );
    }

    #[test]
    fn non_object_payloads_are_unreadable() {
        assert_eq!(normalize_reply(&json!(12)), UNREADABLE_REPLY);
        assert_eq!(normalize_reply(&json!(["a"])), UNREADABLE_REPLY);
        assert_eq!(normalize_reply(&Value::Null), UNREADABLE_REPLY);
    }
}
