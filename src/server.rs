//! MCP request dispatch over a line-delimited JSON-RPC stream.

use anyhow::Result;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::consts::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use crate::protocol::{JSONRPC_VERSION, Request, Response, RpcError};
use crate::tools::{Outcome, ToolRegistry};

pub struct McpServer {
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Dispatch one request. Notifications return `None`.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        debug!(method = %request.method, id = ?request.id, "request");
        let id = request.id.clone();

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                RpcError::invalid_request(format!("unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => Response::success(id, self.initialize(request.params.as_ref())),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(id, self.list_tools().await),
            "tools/call" => match self.call_tool(request.params.as_ref()).await {
                Ok(result) => Response::success(id, result),
                Err(error) => Response::error(id, error),
            },
            method => Response::error(id, RpcError::method_not_found(method)),
        };
        Some(response)
    }

    /// Parse and dispatch one raw line. Blank lines and notifications yield `None`.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return Some(Response::error(None, RpcError::parse_error(e.to_string())));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(Response::error(id, RpcError::invalid_request(e.to_string()))),
        }
    }

    /// Serve until the reader hits EOF.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line).await,
                Err(e) => {
                    warn!(error = %e, "request is not valid UTF-8");
                    Some(Response::error(
                        None,
                        RpcError::parse_error(format!("invalid UTF-8: {e}")),
                    ))
                }
            };
            if let Some(response) = response {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
            }
        }
        info!("input closed, shutting down");
        Ok(())
    }

    /// Serve over the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("serving MCP over stdio");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, "client initialized");

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            },
            "capabilities": {
                "tools": { "listChanged": false }
            },
        })
    }

    async fn list_tools(&self) -> Value {
        json!({ "tools": self.tools.descriptions().await })
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params.ok_or_else(|| RpcError::invalid_params("missing params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("missing tool name"))?;

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => return Err(RpcError::invalid_params("arguments must be an object")),
        };

        info!(tool = name, "tool call");
        let result = self.tools.execute(name, &arguments).await;

        let (text, is_error) = match result.outcome {
            Outcome::Success(Value::String(s)) => (s, false),
            Outcome::Success(value) => (
                serde_json::to_string_pretty(&value)
                    .map_err(|e| RpcError::internal_error(e.to_string()))?,
                false,
            ),
            Outcome::Error(message) => (message, true),
        };

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
        }))
    }
}
