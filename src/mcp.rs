//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC 2.0 dispatch shared by two transports: stdio (one request per
//! line, see [`run_mcp_server`]) and streamable HTTP (`POST /mcp`, see
//! [`crate::server`]). Search is exposed as the `search_internal_codebase`
//! tool, plus two discovery tools for valid `language` and `role` values.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::models::{DirectoryRole, Language, SearchRequest, SearchResponse, SearchRole};
use crate::search::SearchEngine;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "codex-mcp";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// `value`/`label` pair returned by `get_supported_languages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageOption {
    pub value: String,
    pub label: String,
}

/// Search role with the directory role tags it covers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleOption {
    pub value: String,
    pub label: String,
    pub directory_roles: Vec<String>,
}

pub fn supported_languages() -> Vec<LanguageOption> {
    Language::all()
        .into_iter()
        .map(|lang| LanguageOption {
            value: lang.ripgrep_type().to_string(),
            label: lang.label().to_string(),
        })
        .collect()
}

pub fn supported_roles() -> Vec<RoleOption> {
    SearchRole::all()
        .into_iter()
        .map(|role| RoleOption {
            value: role.to_string(),
            label: role.label().to_string(),
            directory_roles: role.directory_roles().iter().map(|r| r.to_string()).collect(),
        })
        .collect()
}

/// Dispatches MCP requests against a shared search engine
#[derive(Clone)]
pub struct McpHandler {
    engine: Arc<SearchEngine>,
}

impl McpHandler {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Handle one raw JSON message; `None` means nothing should be sent back
    pub fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to parse JSON-RPC message: {}", e);
                return Some(JsonRpcResponse::failure(None, PARSE_ERROR, "Parse error"));
            }
        };
        self.handle_value(value)
    }

    /// Handle one already-parsed JSON message
    pub fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(_) => return Some(JsonRpcResponse::failure(id, INVALID_REQUEST, "Invalid Request")),
        };
        self.process_request(request)
    }

    /// Process a single JSON-RPC request
    pub fn process_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        log::debug!("MCP request: method={}", request.method);

        if request.jsonrpc != "2.0" || request.method.is_empty() {
            return Some(JsonRpcResponse::failure(
                request.id,
                INVALID_REQUEST,
                "Invalid Request",
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => handle_initialize(),
            "initialized" | "notifications/initialized" => return None,
            "tools/list" => handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params),
            method if method.starts_with("notifications/") => {
                log::debug!("Ignoring notification {}", method);
                return None;
            }
            _ => {
                return Some(JsonRpcResponse::failure(
                    request.id,
                    METHOD_NOT_FOUND,
                    "Method not found",
                ));
            }
        };

        Some(JsonRpcResponse::success(request.id, result))
    }

    fn handle_call_tool(&self, params: Option<Value>) -> Value {
        let Some(params) = params else {
            return tool_error("invalid params");
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return tool_error("invalid params");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match name {
            "search_internal_codebase" => self.handle_search(arguments),
            "get_supported_languages" => tool_json(&json!({ "languages": supported_languages() })),
            "get_supported_roles" => tool_json(&json!({
                "search_roles": supported_roles(),
                "directory_roles": DirectoryRole::all().iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            })),
            other => tool_error(&format!("unknown tool: {}", other)),
        }
    }

    fn handle_search(&self, arguments: Value) -> Value {
        let request: SearchRequest = if arguments.is_null() {
            SearchRequest::default()
        } else {
            match serde_json::from_value(arguments) {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("Invalid search arguments: {}", e);
                    return tool_error("invalid arguments");
                }
            }
        };

        match self.engine.search(&request) {
            Ok(matches) => tool_json(&SearchResponse { matches }),
            Err(e) => {
                log::error!("Search failed: {}", e);
                tool_error(&format!("search failed: {}", e))
            }
        }
    }
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_list_tools() -> Value {
    json!({
        "tools": [
            {
                "name": "search_internal_codebase",
                "description": "Search the configured codebase for exact text matches (case-insensitive). Use this before implementing or refactoring: find where logic already exists, how APIs are used, or which files contain a pattern.\n\n**Returns:** {\"matches\": [{path, line_start, line_end, snippet, match_reason}]}\n\nRead-only and deterministic. Call get_supported_languages and get_supported_roles for valid language and role values.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Required. Exact text to search for. Use concrete identifiers (function name, type name, error message)."
                        },
                        "language": {
                            "type": "string",
                            "description": "Optional. Language filter (e.g. go, py, java, js, ts). Omit to search all languages."
                        },
                        "path_hint": {
                            "type": "string",
                            "description": "Optional. Substring that a configured directory path must contain."
                        },
                        "role": {
                            "type": "string",
                            "description": "Optional. frontend or backend. Omit to search all directories."
                        },
                        "limit": {
                            "type": "number",
                            "description": "Optional. Max number of matches. Default 10, max 20."
                        }
                    },
                    "required": ["query"]
                }
            },
            {
                "name": "get_supported_languages",
                "description": "List the language values accepted by search_internal_codebase. Each item has value (pass this to search) and label.",
                "inputSchema": {
                    "type": "object",
                    "properties": {},
                    "required": []
                }
            },
            {
                "name": "get_supported_roles",
                "description": "List the role values accepted by search_internal_codebase (frontend, backend) and the directory role tags each one covers.",
                "inputSchema": {
                    "type": "object",
                    "properties": {},
                    "required": []
                }
            }
        ]
    })
}

fn tool_json<T: Serialize>(value: &T) -> Value {
    match serde_json::to_string(value) {
        Ok(text) => json!({
            "content": [{ "type": "text", "text": text }]
        }),
        Err(e) => tool_error(&format!("failed to encode result: {}", e)),
    }
}

fn tool_error(message: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": message }],
        "isError": true
    })
}

/// Run the MCP server on stdio
pub fn run_mcp_server(handler: &McpHandler) -> Result<()> {
    log::info!("Starting codex-mcp MCP server on stdio");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = line?;

        if line.trim().is_empty() {
            continue;
        }

        log::debug!("MCP input: {}", line);

        let Some(response) = handler.handle_message(&line) else {
            continue;
        };

        let response_json = serde_json::to_string(&response)?;
        writeln!(stdout, "{}", response_json)?;
        stdout.flush()?;

        log::debug!("MCP output: {}", response_json);
    }

    log::info!("codex-mcp MCP server stopped");
    Ok(())
}
