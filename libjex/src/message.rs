//! Wire messages exchanged between a host application and the bridge.

use serde::Deserialize;
use serde_json::{json, Value};

// In
const STATEMENT_MSG: u64 = 0;
const EXPRESSION_MSG: u64 = 1;
const ASSIGNMENT_MSG: u64 = 2;
const EXPRESSION_STR_MSG: u64 = 3;

// Out
const SUCCESS_MSG: u64 = 0;
const ERROR_MSG: u64 = 1;

/// One decoded request, one per wire line
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Source run for side effect; its value is discarded
    Statement(String),
    /// Source run for its value, returned as JSON
    Expression(String),
    /// Bind a variable in the scope to a JSON value
    Assignment { var_name: String, value: Value },
    /// Source run for its value, returned as a diagnostic string
    ExpressionStringified(String),
}

/// One reply, written before the next request is read
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Error { message: String, detail: String },
}

/// Messages rejected before they reach the scope
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Bad message: invalid json")]
    InvalidJson(String),

    #[error("Bad message: no type and/or body")]
    NoTypeOrBody,

    #[error("Bad message type: {0}")]
    BadKind(Value),

    #[error("Bad message: body is not source text")]
    NonTextBody,

    #[error("Bad assignment: no varName and/or value")]
    BadAssignment,
}

/// Decoded wire frame. Only well-formed frames deserialize; requests are
/// instead shape-checked field by field so each defect gets its own error.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: u64,
    body: Value,
}

impl Request {
    /// Decode one wire line into a request
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let value = serde_json::from_str(line)
            .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode a JSON value into a request
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NoTypeOrBody);
        };
        let (Some(kind), Some(body)) = (fields.remove("type"), fields.remove("body")) else {
            return Err(ProtocolError::NoTypeOrBody);
        };
        match kind.as_u64() {
            Some(STATEMENT_MSG) => Ok(Request::Statement(source_of(body)?)),
            Some(EXPRESSION_MSG) => Ok(Request::Expression(source_of(body)?)),
            Some(ASSIGNMENT_MSG) => assignment_of(body),
            Some(EXPRESSION_STR_MSG) => Ok(Request::ExpressionStringified(source_of(body)?)),
            _ => Err(ProtocolError::BadKind(kind)),
        }
    }

    /// Encode a request as its wire value
    pub fn to_value(&self) -> Value {
        match self {
            Request::Statement(source) => json!({ "type": STATEMENT_MSG, "body": source }),
            Request::Expression(source) => json!({ "type": EXPRESSION_MSG, "body": source }),
            Request::Assignment { var_name, value } => json!({
                "type": ASSIGNMENT_MSG,
                "body": { "varName": var_name, "value": value },
            }),
            Request::ExpressionStringified(source) => {
                json!({ "type": EXPRESSION_STR_MSG, "body": source })
            }
        }
    }
}

fn source_of(body: Value) -> Result<String, ProtocolError> {
    match body {
        Value::String(source) => Ok(source),
        _ => Err(ProtocolError::NonTextBody),
    }
}

fn assignment_of(body: Value) -> Result<Request, ProtocolError> {
    let Value::Object(mut body) = body else {
        return Err(ProtocolError::BadAssignment);
    };
    match (body.remove("varName"), body.remove("value")) {
        (Some(Value::String(var_name)), Some(value)) => {
            Ok(Request::Assignment { var_name, value })
        }
        _ => Err(ProtocolError::BadAssignment),
    }
}

impl Response {
    /// Encode a response as its wire value
    pub fn to_value(&self) -> Value {
        match self {
            Response::Success(body) => json!({ "type": SUCCESS_MSG, "body": body }),
            Response::Error { message, detail } => json!({
                "type": ERROR_MSG,
                "body": { "message": message, "detail": detail },
            }),
        }
    }

    /// Decode one wire line into a response. `None` when the line is not a
    /// well-formed response frame
    pub fn parse(line: &str) -> Option<Self> {
        let frame: Frame = serde_json::from_str(line).ok()?;
        match frame.kind {
            SUCCESS_MSG => Some(Response::Success(frame.body)),
            ERROR_MSG => {
                let Value::Object(mut body) = frame.body else {
                    return None;
                };
                match (body.remove("message"), body.remove("detail")) {
                    (Some(Value::String(message)), Some(Value::String(detail))) => {
                        Some(Response::Error { message, detail })
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl ProtocolError {
    /// Longer diagnostic carried in the error response body
    pub fn detail(&self) -> String {
        match self {
            ProtocolError::InvalidJson(detail) => detail.clone(),
            _ => String::new(),
        }
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Response::Error {
            detail: err.detail(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_statement() {
        let req = Request::parse(r#"{"type":0,"body":"var x = 1;"}"#).unwrap();
        assert_eq!(req, Request::Statement("var x = 1;".to_string()));
    }

    #[test]
    fn parse_expression() {
        let req = Request::parse(r#"{"type":1,"body":"1+1"}"#).unwrap();
        assert_eq!(req, Request::Expression("1+1".to_string()));
    }

    #[test]
    fn parse_assignment() {
        let req = Request::parse(r#"{"type":2,"body":{"varName":"x","value":42}}"#).unwrap();
        assert_eq!(
            req,
            Request::Assignment {
                var_name: "x".to_string(),
                value: json!(42)
            }
        );
    }

    #[test]
    fn parse_stringified() {
        let req = Request::parse(r#"{"type":3,"body":"[1, 2]"}"#).unwrap();
        assert_eq!(req, Request::ExpressionStringified("[1, 2]".to_string()));
    }

    #[test]
    fn parse_invalid_json() {
        assert_matches!(
            Request::parse("{ not json"),
            Err(ProtocolError::InvalidJson(_))
        );
    }

    #[test]
    fn parse_missing_body() {
        assert_eq!(
            Request::parse(r#"{"type":1}"#),
            Err(ProtocolError::NoTypeOrBody)
        );
    }

    #[test]
    fn parse_missing_type() {
        assert_eq!(
            Request::parse(r#"{"body":"1+1"}"#),
            Err(ProtocolError::NoTypeOrBody)
        );
    }

    #[test]
    fn parse_non_object() {
        assert_eq!(Request::parse("[1, 2]"), Err(ProtocolError::NoTypeOrBody));
    }

    #[test]
    fn unknown_kind_names_the_kind() {
        let err = Request::parse(r#"{"type":99,"body":""}"#).unwrap_err();
        assert_eq!(err.to_string(), "Bad message type: 99");
        assert_eq!(err.detail(), "");
    }

    #[test]
    fn assignment_missing_value() {
        assert_eq!(
            Request::parse(r#"{"type":2,"body":{"varName":"x"}}"#),
            Err(ProtocolError::BadAssignment)
        );
    }

    #[test]
    fn assignment_non_string_name() {
        assert_eq!(
            Request::parse(r#"{"type":2,"body":{"varName":7,"value":1}}"#),
            Err(ProtocolError::BadAssignment)
        );
    }

    #[test]
    fn source_body_must_be_text() {
        assert_eq!(
            Request::parse(r#"{"type":1,"body":42}"#),
            Err(ProtocolError::NonTextBody)
        );
    }

    #[test]
    fn success_encoding() {
        let resp = Response::Success(json!(2));
        assert_eq!(resp.to_value(), json!({ "type": 0, "body": 2 }));
    }

    #[test]
    fn error_encoding() {
        let resp = Response::from(ProtocolError::NoTypeOrBody);
        assert_eq!(
            resp.to_value(),
            json!({
                "type": 1,
                "body": { "message": "Bad message: no type and/or body", "detail": "" },
            })
        );
    }

    #[test]
    fn response_parse() {
        let resp = Response::parse(r#"{"type":0,"body":42}"#).unwrap();
        assert_eq!(resp, Response::Success(json!(42)));
        assert_matches!(Response::parse(r#"{"type":7,"body":""}"#), None);
    }
}
