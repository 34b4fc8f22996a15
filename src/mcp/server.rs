//! MCP server implementation
//!
//! Serves the registered tools and resources as newline-delimited
//! JSON-RPC over stdio. `initialize` is answered inline; every other
//! request runs in its own task, inside a request context that carries the
//! client's progress token, so slow tools never block the read loop.

use crate::config::{RuntimeConfig, Transport};
use crate::context::{self, ProgressSession, RequestContext};
use crate::mcp::protocol::*;
use crate::mcp::session::StdioSession;
use crate::registry::{ResourceRegistry, ToolRegistry};
use crate::types::{Result, RuntimeError};
use futures::SinkExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::{debug, error, info, warn};

/// Maximum bytes per JSON-RPC message (1 MiB).
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

type PendingRequests = Arc<Mutex<HashMap<RpcId, AbortHandle>>>;

pub struct McpServer {
    config: Arc<RuntimeConfig>,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
}

impl McpServer {
    pub fn new(config: RuntimeConfig, tools: ToolRegistry, resources: ResourceRegistry) -> Self {
        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            resources: Arc::new(resources),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Serve on process stdio until the client closes stdin.
    pub async fn run(&self) -> Result<()> {
        match self.config.server().transport()? {
            Transport::Stdio => {
                info!("MCP server starting on stdio");
                self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
            }
        }
    }

    /// Serve on an arbitrary byte stream pair until `reader` hits EOF.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn run_with<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_loop(writer, outgoing_rx));
        let session = Arc::new(StdioSession::new(outgoing));

        let handler = Arc::new(RequestHandler {
            tools: Arc::clone(&self.tools),
            resources: Arc::clone(&self.resources),
            tool_timeout: self.config.tools().timeout(),
            session: Arc::clone(&session),
        });

        let pending: PendingRequests = Arc::default();
        let mut in_flight = JoinSet::new();
        let mut initialized = false;

        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = reader.read_until(b'\n', &mut raw).await?;
            if n == 0 {
                info!("Client closed connection");
                break;
            }

            while in_flight.try_join_next().is_some() {}

            let request = match parse_request(&raw) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(e) => {
                    warn!("{}", e.message);
                    reply(&session, JsonRpcResponse::error(None, e));
                    continue;
                }
            };

            if request.jsonrpc != JSONRPC_VERSION {
                if !request.is_notification() {
                    reply(
                        &session,
                        JsonRpcResponse::error(
                            request.id,
                            JsonRpcError::invalid_request("Invalid Request: jsonrpc must be \"2.0\""),
                        ),
                    );
                }
                continue;
            }

            match request.method.as_str() {
                "initialize" => {
                    let result = self.handle_initialize(request.params);
                    initialized |= result.is_ok();
                    if request.id.is_some() {
                        reply(&session, into_response(request.id, result));
                    }
                    continue;
                }
                "notifications/initialized" => {
                    debug!("Client finished initialization");
                    continue;
                }
                "notifications/cancelled" => {
                    cancel_request(&pending, request.params);
                    continue;
                }
                "ping" => {
                    if request.id.is_some() {
                        reply(&session, JsonRpcResponse::success(request.id, json!({})));
                    }
                    continue;
                }
                _ => {}
            }

            let Some(id) = request.id.clone() else {
                debug!("Ignoring notification: {}", request.method);
                continue;
            };

            if !initialized {
                reply(
                    &session,
                    JsonRpcResponse::error(
                        Some(id),
                        JsonRpcError::invalid_request("Server not initialized"),
                    ),
                );
                continue;
            }

            let task_handler = Arc::clone(&handler);
            let task_pending = Arc::clone(&pending);
            let task_id = id.clone();

            // Held across spawn so the task cannot deregister before it is registered.
            let accepted = {
                let mut registered = lock(&pending);
                if registered.contains_key(&id) {
                    false
                } else {
                    let abort = in_flight.spawn(async move {
                        let response = task_handler.handle(request).await;
                        lock(&task_pending).remove(&task_id);
                        reply(&task_handler.session, response);
                    });
                    registered.insert(id.clone(), abort);
                    true
                }
            };

            // A reused id would make cancellation ambiguous.
            if !accepted {
                warn!("Rejecting request {:?}: id is still in flight", id);
                reply(
                    &session,
                    JsonRpcResponse::error(
                        Some(id),
                        JsonRpcError::invalid_request(
                            "Invalid Request: id is already used by a pending request",
                        ),
                    ),
                );
            }
        }

        while in_flight.join_next().await.is_some() {}

        // The writer finishes once every sender is gone.
        drop(handler);
        drop(session);

        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(RuntimeError::Transport(format!("writer task failed: {}", e))),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            None | Some(Value::Null) => InitializeParams::default(),
            Some(params) => serde_json::from_value(params).map_err(|e| {
                JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e))
            })?,
        };

        if let Some(client) = &params.client_info {
            info!(
                "Client connected: {} {}",
                client.name.as_deref().unwrap_or("unknown"),
                client.version.as_deref().unwrap_or("")
            );
        }
        if let Some(version) = params.protocol_version.as_deref() {
            if version != PROTOCOL_VERSION {
                debug!("Client asked for protocol {}, offering {}", version, PROTOCOL_VERSION);
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(json!({})),
                resources: Some(json!({})),
            },
            server_info: ServerInfo {
                name: self.config.host().name,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_json(&result)
    }
}

/// Per-connection state shared by request tasks.
struct RequestHandler {
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    /// `None` lets tools run until they finish or are cancelled.
    tool_timeout: Option<Duration>,
    session: Arc<StdioSession>,
}

impl RequestHandler {
    async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = match request.method.as_str() {
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => self.list_resources(),
            "resources/read" => self.read_resource(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        into_response(request.id, result)
    }

    fn request_context(&self, meta: Option<RequestMeta>) -> RequestContext {
        let meta = meta.unwrap_or_default();
        let session: Arc<dyn ProgressSession> = self.session.clone();
        RequestContext::new(Some(session), meta.progress_token).with_metadata(meta.extra)
    }

    fn list_tools(&self) -> std::result::Result<Value, JsonRpcError> {
        if self.tools.is_empty() {
            warn!("No tools available");
        }
        to_json(&ListToolsResult {
            tools: self.tools.definitions(),
        })
    }

    /// Tool failures are reported inside the result (`isError`), never as
    /// JSON-RPC errors, so the model can see what went wrong.
    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let CallToolParams {
            name,
            arguments,
            meta,
        } = parse_params(params)?;

        let tools = &self.tools;
        let tool_timeout = self.tool_timeout;
        let tool_name = name.as_str();

        let outcome = context::activate(self.request_context(meta), |_| async move {
            let call = tools.call(tool_name, arguments);
            match tool_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(RuntimeError::Timeout(limit)),
                },
                None => call.await,
            }
        })
        .await;

        let result = match outcome {
            Ok(output) => CallToolResult::success(output.into_content()),
            Err(e) => {
                error!("Error processing tool '{}': {}", name, e);
                CallToolResult::error(format!("Tool execution error: {}", e))
            }
        };

        to_json(&result)
    }

    fn list_resources(&self) -> std::result::Result<Value, JsonRpcError> {
        to_json(&ListResourcesResult {
            resources: self.resources.definitions(),
        })
    }

    async fn read_resource(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let ReadResourceParams { uri, meta } = parse_params(params)?;

        let resources = &self.resources;
        let resource_uri = uri.as_str();

        let contents = context::activate(self.request_context(meta), |_| async move {
            resources.read(resource_uri).await
        })
        .await
        .map_err(|e| match e {
            RuntimeError::ResourceNotFound(_) => JsonRpcError::invalid_params(e.to_string()),
            other => {
                error!("Error reading resource '{}': {}", uri, other);
                JsonRpcError::internal_error(other.to_string())
            }
        })?;

        to_json(&ReadResourceResult {
            contents: vec![contents],
        })
    }
}

/// Decode one raw line. Blank lines yield `Ok(None)`.
fn parse_request(raw: &[u8]) -> std::result::Result<Option<JsonRpcRequest>, JsonRpcError> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(JsonRpcError::parse_error(format!(
            "message of {} bytes exceeds the {} byte limit",
            raw.len(),
            MAX_MESSAGE_BYTES
        )));
    }

    let line = std::str::from_utf8(raw).map_err(JsonRpcError::parse_error)?.trim();
    if line.is_empty() {
        return Ok(None);
    }

    debug!("Received request: {}", line);
    serde_json::from_str(line)
        .map(Some)
        .map_err(JsonRpcError::parse_error)
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
}

fn into_response(
    id: Option<RpcId>,
    result: std::result::Result<Value, JsonRpcError>,
) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::error(id, error),
    }
}

fn reply(session: &StdioSession, response: JsonRpcResponse) {
    if let Err(e) = session.send_message(&response) {
        error!("Failed to queue response: {}", e);
    }
}

fn lock(pending: &PendingRequests) -> MutexGuard<'_, HashMap<RpcId, AbortHandle>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

fn cancel_request(pending: &PendingRequests, params: Option<Value>) {
    let params: CancelledParams = match parse_params(params) {
        Ok(params) => params,
        Err(e) => {
            warn!("Ignoring malformed cancellation: {}", e.message);
            return;
        }
    };

    match lock(pending).remove(&params.request_id) {
        Some(handle) => {
            handle.abort();
            info!(
                "Cancelled request {:?}: {}",
                params.request_id,
                params.reason.as_deref().unwrap_or("no reason given")
            );
        }
        None => debug!(
            "Cancellation for unknown or finished request {:?}",
            params.request_id
        ),
    }
}

async fn write_loop<W>(writer: W, mut outgoing: mpsc::UnboundedReceiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    while let Some(message) = outgoing.recv().await {
        debug!("Sending: {}", message);
        sink.send(message)
            .await
            .map_err(|e| RuntimeError::Transport(e.to_string()))?;
    }

    Ok(())
}
