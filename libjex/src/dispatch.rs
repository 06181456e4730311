//! Routes decoded wire lines to a connection's scope.

use serde_json::json;

use crate::message::{Request, Response};
use crate::scope::{self, Scope};

/// Handle one wire line against the connection's scope, producing its
/// single response. Malformed messages and evaluation faults both become
/// error responses; nothing a request does propagates past here
pub async fn dispatch(scope: &Scope, line: &str) -> Response {
    match Request::parse(line) {
        Ok(req) => handle(scope, req).await.unwrap_or_else(Response::from),
        Err(err) => Response::from(err),
    }
}

async fn handle(scope: &Scope, req: Request) -> Result<Response, scope::Error> {
    match req {
        Request::Statement(source) => {
            scope.execute(&source).await?;
            Ok(Response::Success(json!("")))
        }
        Request::Expression(source) => {
            let value = scope.evaluate(&source).await?;
            Ok(Response::Success(value))
        }
        Request::ExpressionStringified(source) => {
            let rendered = scope.evaluate_display(&source).await?;
            Ok(Response::Success(json!(rendered)))
        }
        Request::Assignment { var_name, value } => {
            scope.bind(&var_name, value).await?;
            Ok(Response::Success(json!("")))
        }
    }
}

impl From<scope::Error> for Response {
    fn from(err: scope::Error) -> Self {
        match err {
            scope::Error::Fault { message, detail } => Response::Error { message, detail },
            scope::Error::Terminated => Response::Error {
                message: scope::Error::Terminated.to_string(),
                detail: String::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn statement_answers_empty_body() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":0,"body":"var a = 5;"}"#).await;
        assert_eq!(resp, Response::Success(json!("")));
    }

    #[tokio::test]
    async fn expression_answers_value() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":1,"body":"1+1"}"#).await;
        assert_eq!(resp, Response::Success(json!(2)));
    }

    #[tokio::test]
    async fn assignment_then_expression() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":2,"body":{"varName":"x","value":42}}"#).await;
        assert_eq!(resp, Response::Success(json!("")));

        let resp = dispatch(&scope, r#"{"type":1,"body":"x"}"#).await;
        assert_eq!(resp, Response::Success(json!(42)));
    }

    #[tokio::test]
    async fn stringified_answers_text() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":3,"body":"[1, 2, 3]"}"#).await;
        assert_matches!(resp, Response::Success(serde_json::Value::String(_)));
    }

    #[tokio::test]
    async fn fault_becomes_error_response_and_scope_survives() {
        let scope = Scope::spawn();
        dispatch(&scope, r#"{"type":0,"body":"var keep = 7;"}"#).await;

        let resp = dispatch(&scope, r#"{"type":1,"body":"no_such_binding"}"#).await;
        assert_matches!(resp, Response::Error { message, .. } => {
            assert!(message.contains("ReferenceError"), "message: {}", message);
        });

        let resp = dispatch(&scope, r#"{"type":1,"body":"keep"}"#).await;
        assert_eq!(resp, Response::Success(json!(7)));
    }

    #[tokio::test]
    async fn unknown_kind_answers_error() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":99,"body":""}"#).await;
        assert_eq!(
            resp,
            Response::Error {
                message: "Bad message type: 99".to_string(),
                detail: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn missing_fields_answer_error() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"body":"1+1"}"#).await;
        assert_eq!(
            resp,
            Response::Error {
                message: "Bad message: no type and/or body".to_string(),
                detail: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_assignment_answers_error() {
        let scope = Scope::spawn();
        let resp = dispatch(&scope, r#"{"type":2,"body":{"varName":"x"}}"#).await;
        assert_eq!(
            resp,
            Response::Error {
                message: "Bad assignment: no varName and/or value".to_string(),
                detail: String::new(),
            }
        );
    }
}
