//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::game::physics::PhysicsSystem;
use crate::game::{ArenaSnapshot, Participant};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Take a seat under a display name
    Register {
        #[serde(default)]
        name: String,
    },

    /// Move one step this tick
    Move {
        /// Direction in radians
        #[serde(default, deserialize_with = "deserialize_angle")]
        angle: f64,
    },

    /// Fire as soon as the cooldown allows
    Shoot {
        /// Direction in radians
        #[serde(default, deserialize_with = "deserialize_angle")]
        angle: f64,
    },

    /// Start (or resume) the tick loop
    Start,

    /// Pause the tick loop
    Stop,

    /// Reset the arena and drop every session's participant
    Rebuild,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Current world state
    Info { snapshot: ArenaSnapshot },

    /// Registration accepted
    Registered {
        participant: Participant,
        info: ArenaSnapshot,
    },

    /// Request rejected
    Error { code: String, message: String },

    /// Tick loop paused
    Stop { at: u64 },

    /// Session mappings are being dropped
    Close { at: u64 },

    /// Arena was reset
    Rebuild { at: u64 },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Coerce a client-supplied angle to radians.
///
/// Numbers pass through. Strings and arrays yield their leading numeric
/// prefix (`"1.5rad"` is 1.5, `[2]` is 2). Anything without one, NaN and
/// infinities become 0.
pub fn coerce_angle(value: &Value) -> f64 {
    let angle = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_float(s),
        Value::Array(_) => parse_leading_float(&text_form(value)),
        _ => 0.0,
    };
    PhysicsSystem::sanitize_angle(angle)
}

/// Text form of a JSON value as a browser would stringify it before parsing
fn text_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_form).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Parse the longest decimal number at the start of `s`, ignoring leading
/// whitespace and trailing garbage. Returns 0 when there is none.
fn parse_leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(0.0)
}

fn deserialize_angle<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_angle(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> ClientMsg {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_parse_register() {
        assert_eq!(
            parse(r#"{"type":"register","name":"于经文"}"#),
            ClientMsg::Register {
                name: "于经文".into()
            }
        );
        assert_eq!(
            parse(r#"{"type":"register"}"#),
            ClientMsg::Register {
                name: String::new()
            }
        );
    }

    #[test]
    fn test_angle_coercion() {
        assert_eq!(
            parse(r#"{"type":"move","angle":1.25}"#),
            ClientMsg::Move { angle: 1.25 }
        );
        assert_eq!(
            parse(r#"{"type":"move","angle":" 3.5 "}"#),
            ClientMsg::Move { angle: 3.5 }
        );
        assert_eq!(
            parse(r#"{"type":"move","angle":"1.5rad"}"#),
            ClientMsg::Move { angle: 1.5 }
        );
        assert_eq!(
            parse(r#"{"type":"shoot","angle":"left"}"#),
            ClientMsg::Shoot { angle: 0.0 }
        );
        assert_eq!(
            parse(r#"{"type":"shoot","angle":null}"#),
            ClientMsg::Shoot { angle: 0.0 }
        );
        assert_eq!(parse(r#"{"type":"shoot"}"#), ClientMsg::Shoot { angle: 0.0 });
    }

    #[test]
    fn test_coerce_angle_non_finite() {
        assert_eq!(coerce_angle(&json!("NaN")), 0.0);
        assert_eq!(coerce_angle(&json!("inf")), 0.0);
        assert_eq!(coerce_angle(&json!(true)), 0.0);
        assert_eq!(coerce_angle(&json!({"a": 1})), 0.0);
        assert_eq!(coerce_angle(&json!(-2)), -2.0);
    }

    #[test]
    fn test_coerce_angle_leading_number() {
        assert_eq!(coerce_angle(&json!("1.5rad")), 1.5);
        assert_eq!(coerce_angle(&json!("  -3e2x")), -300.0);
        assert_eq!(coerce_angle(&json!("2e")), 2.0);
        assert_eq!(coerce_angle(&json!(".5")), 0.5);
        assert_eq!(coerce_angle(&json!("7.")), 7.0);
        assert_eq!(coerce_angle(&json!("e5")), 0.0);
        assert_eq!(coerce_angle(&json!("-")), 0.0);
        assert_eq!(coerce_angle(&json!("")), 0.0);
        assert_eq!(coerce_angle(&json!([2])), 2.0);
        assert_eq!(coerce_angle(&json!([1, 2])), 1.0);
        assert_eq!(coerce_angle(&json!([["0.25"]])), 0.25);
        assert_eq!(coerce_angle(&json!([])), 0.0);
    }

    #[test]
    fn test_parse_unit_messages() {
        assert_eq!(parse(r#"{"type":"start"}"#), ClientMsg::Start);
        assert_eq!(parse(r#"{"type":"stop"}"#), ClientMsg::Stop);
        assert_eq!(parse(r#"{"type":"rebuild"}"#), ClientMsg::Rebuild);
        assert_eq!(parse(r#"{"type":"ping","t":9}"#), ClientMsg::Ping { t: 9 });
    }

    #[test]
    fn test_error_message_shape() {
        let json = serde_json::to_value(ServerMsg::error("arena_full", "arena is full")).unwrap();
        assert_eq!(
            json,
            json!({"type": "error", "code": "arena_full", "message": "arena is full"})
        );
    }
}
