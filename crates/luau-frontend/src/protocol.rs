//! JSON request/response messages for hosting a session out of process
//!
//! Requests are objects tagged by `op`; field names are camelCase:
//!
//! ```text
//! {"op":"setSource","name":"util","text":"return {}"}
//! {"op":"getDiagnostics","name":"main","text":"local x: number = 'hi'"}
//! {"op":"hover","name":"main","line":0,"col":6}
//! ```
//!
//! Query requests may carry the module's current `text`, which is stored
//! before the query runs. Every request gets exactly one response line.

use luau_ast::Position;
use luau_checker::{Diagnostic, Mode, Severity, SolverKind};
use serde::{Deserialize, Serialize};

use crate::config::ConfigState;
use crate::query::{CompletionItem, SignatureHelp};
use crate::session::{AnalysisSession, VERSION};

fn entry_module() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    SetSource {
        name: String,
        text: String,
    },
    /// 0 Nonstrict, 1 Strict, 2 NoCheck
    SetMode {
        mode: i64,
    },
    SetSolver {
        #[serde(rename = "useNew")]
        use_new: bool,
    },
    GetDiagnostics {
        #[serde(default = "entry_module")]
        name: String,
        #[serde(default)]
        text: Option<String>,
    },
    Autocomplete {
        #[serde(default = "entry_module")]
        name: String,
        #[serde(default)]
        text: Option<String>,
        line: u32,
        col: u32,
    },
    Hover {
        #[serde(default = "entry_module")]
        name: String,
        #[serde(default)]
        text: Option<String>,
        line: u32,
        col: u32,
    },
    SignatureHelp {
        #[serde(default = "entry_module")]
        name: String,
        #[serde(default)]
        text: Option<String>,
        line: u32,
        col: u32,
    },
    GetModules,
    GetConfig,
    Reset,
    Version,
}

/// A diagnostic as the protocol reports it, with flattened 0-indexed
/// positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl From<&Diagnostic> for DiagnosticEntry {
    fn from(diagnostic: &Diagnostic) -> Self {
        let range = diagnostic.range;
        Self {
            severity: diagnostic.severity,
            code: diagnostic.code.clone(),
            message: diagnostic.message.clone(),
            start_line: range.start.line,
            start_col: range.start.column,
            end_line: range.end.line,
            end_col: range.end.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ack { ok: bool },
    Diagnostics { diagnostics: Vec<DiagnosticEntry> },
    Completions { items: Vec<CompletionItem> },
    Hover { content: Option<String> },
    Signatures { signatures: Vec<SignatureHelp> },
    Modules { modules: Vec<String> },
    Config(ConfigState),
    Version { version: String },
    Error { error: String },
}

impl Response {
    fn ack() -> Self {
        Response::Ack { ok: true }
    }
}

/// Apply one request to the session
pub fn handle(session: &mut AnalysisSession, request: Request) -> Response {
    match request {
        Request::SetSource { name, text } => {
            session.set_source(&name, &text);
            Response::ack()
        }
        Request::SetMode { mode } => {
            session.set_mode(Mode::from_protocol(mode));
            Response::ack()
        }
        Request::SetSolver { use_new } => {
            session.set_solver(SolverKind::from_flag(use_new));
            Response::ack()
        }
        Request::GetDiagnostics { name, text } => {
            store_text(session, &name, text);
            let diagnostics = session.diagnostics(&name).iter().map(DiagnosticEntry::from).collect();
            Response::Diagnostics { diagnostics }
        }
        Request::Autocomplete { name, text, line, col } => {
            store_text(session, &name, text);
            Response::Completions {
                items: session.autocomplete(&name, Position::new(line, col)),
            }
        }
        Request::Hover { name, text, line, col } => {
            store_text(session, &name, text);
            Response::Hover {
                content: session.hover(&name, Position::new(line, col)),
            }
        }
        Request::SignatureHelp { name, text, line, col } => {
            store_text(session, &name, text);
            let signatures = session
                .signature_help(&name, Position::new(line, col))
                .into_iter()
                .collect();
            Response::Signatures { signatures }
        }
        Request::GetModules => Response::Modules {
            modules: session.modules(),
        },
        Request::GetConfig => Response::Config(session.config()),
        Request::Reset => {
            session.reset();
            Response::ack()
        }
        Request::Version => Response::Version {
            version: VERSION.to_string(),
        },
    }
}

/// Store query text unless it matches what the session already has, so an
/// unchanged module keeps its cached results
fn store_text(session: &mut AnalysisSession, name: &str, text: Option<String>) {
    let Some(text) = text else {
        return;
    };
    if session.get_source(name).ok() != Some(text.as_str()) {
        session.set_source(name, &text);
    }
}

/// Handle one JSON request line and return the JSON response line
pub fn handle_line(session: &mut AnalysisSession, line: &str) -> String {
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            tracing::debug!(?request, "request");
            handle(session, request)
        }
        Err(err) => {
            tracing::warn!(%err, "malformed request");
            Response::Error {
                error: format!("malformed request: {}", err),
            }
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|err| {
        format!("{{\"error\":\"failed to encode response: {}\"}}", err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn send(session: &mut AnalysisSession, request: Value) -> Value {
        let line = handle_line(session, &request.to_string());
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_parse_requests() {
        let request: Request = serde_json::from_str(r#"{"op":"setSolver","useNew":false}"#).unwrap();
        assert_eq!(request, Request::SetSolver { use_new: false });

        let request: Request = serde_json::from_str(r#"{"op":"hover","line":1,"col":2}"#).unwrap();
        assert_eq!(
            request,
            Request::Hover {
                name: "main".to_string(),
                text: None,
                line: 1,
                col: 2,
            }
        );
    }

    #[test]
    fn test_diagnostics_response() {
        let mut session = AnalysisSession::new();
        assert_eq!(send(&mut session, json!({"op": "setMode", "mode": 1})), json!({"ok": true}));
        let response = send(
            &mut session,
            json!({"op": "getDiagnostics", "name": "main", "text": "local x: number = 'hi'"}),
        );
        let diagnostics = response["diagnostics"].as_array().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0]["severity"], json!("error"));
        assert_eq!(diagnostics[0]["startLine"], json!(0));
        assert_eq!(diagnostics[0]["startCol"], json!(18));
        assert_eq!(diagnostics[0]["endCol"], json!(22));
    }

    #[test]
    fn test_config_and_version() {
        let mut session = AnalysisSession::new();
        send(&mut session, json!({"op": "setMode", "mode": 2}));
        send(&mut session, json!({"op": "setSolver", "useNew": false}));
        assert_eq!(
            send(&mut session, json!({"op": "getConfig"})),
            json!({"mode": "nocheck", "solver": "old"})
        );
        assert_eq!(send(&mut session, json!({"op": "version"})), json!({"version": VERSION}));
    }

    #[test]
    fn test_modules_and_reset() {
        let mut session = AnalysisSession::new();
        send(&mut session, json!({"op": "setSource", "name": "main", "text": ""}));
        send(&mut session, json!({"op": "setSource", "name": "util", "text": "return 1"}));
        assert_eq!(send(&mut session, json!({"op": "getModules"})), json!({"modules": ["util"]}));
        send(&mut session, json!({"op": "reset"}));
        assert_eq!(send(&mut session, json!({"op": "getModules"})), json!({"modules": []}));
    }

    #[test]
    fn test_hover_null_for_unknown_module() {
        let mut session = AnalysisSession::new();
        assert_eq!(
            send(&mut session, json!({"op": "hover", "name": "nope", "line": 0, "col": 0})),
            json!({"content": null})
        );
    }

    #[test]
    fn test_signature_help_response() {
        let mut session = AnalysisSession::new();
        let text = "local function f(a: number) return a end\nf(";
        let response = send(
            &mut session,
            json!({"op": "signatureHelp", "text": text, "line": 1, "col": 2}),
        );
        assert_eq!(response["signatures"][0]["parameters"], json!(["a: number"]));
        assert_eq!(response["signatures"][0]["activeParameter"], json!(0));
    }

    #[test]
    fn test_malformed_request() {
        let mut session = AnalysisSession::new();
        let response: Value = serde_json::from_str(&handle_line(&mut session, "{not json")).unwrap();
        assert!(response["error"].as_str().unwrap().starts_with("malformed request"));
        let response: Value = serde_json::from_str(&handle_line(&mut session, r#"{"op":"fly"}"#)).unwrap();
        assert!(response.get("error").is_some());
    }
}
