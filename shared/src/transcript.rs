//! Conversation payloads come back from the chat backend in one of two shapes: a JSON
//! list of `{sender, content}` objects, or a plain text blob with one `sender:content`
//! pair per line. The shape is resolved once, at the boundary, into [`RawTranscript`];
//! [`parse`] turns either variant into the canonical message sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::ChatMessage;
use crate::ErrorKind;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl RawMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            content: Some(content.into()),
        }
    }

    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "payload", rename_all = "snake_case")]
pub enum RawTranscript {
    Structured(Vec<RawMessage>),
    Delimited(String),
}

impl RawTranscript {
    /// Resolves a response body into one of the two transcript shapes.
    ///
    /// JSON arrays and `{"messages": [...]}` objects are structured; a JSON string
    /// literal is unquoted and treated as delimited text; everything else is taken
    /// verbatim as delimited text.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim_start();
        if !(trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.starts_with('"')) {
            return Self::Delimited(body.to_string());
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_json(value).unwrap_or_else(|| Self::Delimited(body.to_string())),
            Err(e) => {
                debug!(error = %e, "transcript body is not JSON, reading it as delimited text");
                Self::Delimited(body.to_string())
            }
        }
    }

    /// Returns `None` for JSON values that carry no recognisable transcript.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Self::Structured(
                items.into_iter().map(RawMessage::from_value).collect(),
            )),
            Value::Object(mut map) => match map.remove("messages") {
                Some(Value::Array(items)) => Some(Self::Structured(
                    items.into_iter().map(RawMessage::from_value).collect(),
                )),
                _ => None,
            },
            Value::String(text) => Some(Self::Delimited(text)),
            _ => None,
        }
    }
}

/// Normalizes a transcript into ordered chat messages. Never fails: incomplete
/// entries are dropped and absent input yields an empty sequence.
#[must_use]
pub fn parse(raw: Option<&RawTranscript>) -> Vec<ChatMessage> {
    let (messages, seen) = match raw {
        None => return Vec::new(),
        Some(RawTranscript::Structured(items)) => (parse_structured(items), items.len()),
        Some(RawTranscript::Delimited(text)) => (parse_delimited(text), text.split('\n').count()),
    };

    let dropped = seen.saturating_sub(messages.len());
    if dropped > 0 {
        warn!(
            code = ErrorKind::MalformedTranscript.code(),
            dropped,
            kept = messages.len(),
            "dropped transcript entries"
        );
    }

    messages
}

fn parse_structured(items: &[RawMessage]) -> Vec<ChatMessage> {
    items
        .iter()
        .filter_map(|item| match (&item.sender, &item.content) {
            (Some(sender), Some(content)) if !sender.is_empty() && !content.is_empty() => {
                Some(ChatMessage::new(sender.clone(), content.clone()))
            }
            _ => None,
        })
        .collect()
}

fn parse_delimited(text: &str) -> Vec<ChatMessage> {
    text.split('\n')
        .filter_map(|line| {
            let (sender, content) = line.split_once(':')?;
            if sender.is_empty() || content.is_empty() {
                return None;
            }
            Some(ChatMessage::new(sender, content))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(messages: &[ChatMessage]) -> Vec<(&str, &str)> {
        messages
            .iter()
            .map(|m| (m.from.as_str(), m.text.as_str()))
            .collect()
    }

    mod delimited_tests {
        use super::*;

        #[test]
        fn test_drops_lines_without_colon() {
            let raw = RawTranscript::Delimited("A:hi\nB:yo\nbadline\nC:ok".into());
            let messages = parse(Some(&raw));
            assert_eq!(pairs(&messages), vec![("A", "hi"), ("B", "yo"), ("C", "ok")]);
        }

        #[test]
        fn test_splits_on_first_colon_only() {
            let raw = RawTranscript::Delimited("Bob:meet at 10:30".into());
            assert_eq!(pairs(&parse(Some(&raw))), vec![("Bob", "meet at 10:30")]);
        }

        #[test]
        fn test_drops_empty_sides() {
            let raw = RawTranscript::Delimited(":orphan\nnobody:\n\nA:x\n".into());
            assert_eq!(pairs(&parse(Some(&raw))), vec![("A", "x")]);
        }

        #[test]
        fn test_whitespace_is_preserved() {
            let raw = RawTranscript::Delimited("Ann: hello there ".into());
            assert_eq!(pairs(&parse(Some(&raw))), vec![("Ann", " hello there ")]);
        }
    }

    mod structured_tests {
        use super::*;

        #[test]
        fn test_drops_incomplete_pairs() {
            let raw = RawTranscript::Structured(vec![
                RawMessage::new("A", "one"),
                RawMessage {
                    sender: None,
                    content: Some("lost".into()),
                },
                RawMessage {
                    sender: Some("B".into()),
                    content: None,
                },
                RawMessage::new("C", "three"),
            ]);
            assert_eq!(pairs(&parse(Some(&raw))), vec![("A", "one"), ("C", "three")]);
        }

        #[test]
        fn test_absent_input_is_empty() {
            assert!(parse(None).is_empty());
            assert!(parse(Some(&RawTranscript::Structured(vec![]))).is_empty());
            assert!(parse(Some(&RawTranscript::Delimited(String::new()))).is_empty());
        }
    }

    mod body_shape_tests {
        use super::*;

        #[test]
        fn test_json_array_is_structured() {
            let raw = RawTranscript::from_body(
                r#"[{"sender":"A","content":"hi"},{"sender":"B"},42,{"sender":"C","content":"ok"}]"#,
            );
            assert_matches_structured(&raw, 4);
            assert_eq!(pairs(&parse(Some(&raw))), vec![("A", "hi"), ("C", "ok")]);
        }

        #[test]
        fn test_messages_object_is_structured() {
            let raw = RawTranscript::from_body(r#"{"messages":[{"sender":"A","content":"hi"}]}"#);
            assert_eq!(pairs(&parse(Some(&raw))), vec![("A", "hi")]);
        }

        #[test]
        fn test_json_string_is_unquoted() {
            let raw = RawTranscript::from_body(r#""A:hi\nB:yo""#);
            assert_eq!(raw, RawTranscript::Delimited("A:hi\nB:yo".into()));
        }

        #[test]
        fn test_plain_text_is_delimited() {
            let raw = RawTranscript::from_body("A:hi\nB:yo");
            assert_eq!(raw, RawTranscript::Delimited("A:hi\nB:yo".into()));
        }

        #[test]
        fn test_bracketed_text_that_is_not_json_stays_delimited() {
            let raw = RawTranscript::from_body("[bot]:hello");
            assert_eq!(pairs(&parse(Some(&raw))), vec![("[bot]", "hello")]);
        }

        #[test]
        fn test_unrelated_json_object_stays_delimited() {
            let raw = RawTranscript::from_body(r#"{"error":"x"}"#);
            assert!(matches!(raw, RawTranscript::Delimited(_)));
        }

        fn assert_matches_structured(raw: &RawTranscript, len: usize) {
            match raw {
                RawTranscript::Structured(items) => assert_eq!(items.len(), len),
                RawTranscript::Delimited(_) => panic!("expected structured transcript"),
            }
        }
    }

    mod property_tests {
        use super::*;

        fn raw_message() -> impl Strategy<Value = RawMessage> {
            (
                proptest::option::of("[a-zA-Z]{0,6}"),
                proptest::option::of("[a-z :]{0,12}"),
            )
                .prop_map(|(sender, content)| RawMessage { sender, content })
        }

        proptest! {
            #[test]
            fn structured_keeps_complete_pairs_in_order(items in proptest::collection::vec(raw_message(), 0..32)) {
                let expected: Vec<(String, String)> = items
                    .iter()
                    .filter_map(|m| match (&m.sender, &m.content) {
                        (Some(s), Some(c)) if !s.is_empty() && !c.is_empty() => Some((s.clone(), c.clone())),
                        _ => None,
                    })
                    .collect();

                let parsed = parse(Some(&RawTranscript::Structured(items)));
                let actual: Vec<(String, String)> =
                    parsed.into_iter().map(|m| (m.from, m.text)).collect();
                prop_assert_eq!(actual, expected);
            }

            #[test]
            fn delimited_output_never_has_empty_sides(text in "[a-z:\n ]{0,64}") {
                let parsed = parse(Some(&RawTranscript::Delimited(text.clone())));
                prop_assert!(parsed.len() <= text.split('\n').count());
                for message in parsed {
                    prop_assert!(!message.from.is_empty());
                    prop_assert!(!message.text.is_empty());
                    prop_assert!(!message.from.contains(':'));
                }
            }
        }
    }
}
