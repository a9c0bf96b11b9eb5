use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::planner::{plan_map, PlanReport};
use crate::scoring::{Strategy, YieldTable};
use crate::solver::LpSolver;
use crate::transport::wire::{decode_request, encode_map};

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
const RECENT_DURATIONS: usize = 100;

/// Shared server state accessible from all connection handlers.
///
/// Config and tables are read-only; only the health counters change.
pub struct ServerState {
    pub config: Arc<PlannerConfig>,
    pub tables: Arc<YieldTable>,
    pub health: RwLock<HealthData>,
}

/// Data needed for the health endpoint.
#[derive(Debug, Default)]
pub struct HealthData {
    pub requests: u64,
    pub failures: u64,
    pub last_duration_ms: f32,
    pub recent_durations_ms: Vec<f32>,
}

impl HealthData {
    pub fn avg_duration_ms(&self) -> f32 {
        if self.recent_durations_ms.is_empty() {
            return 0.0;
        }
        self.recent_durations_ms.iter().sum::<f32>() / self.recent_durations_ms.len() as f32
    }
}

/// Health endpoint response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub requests: u64,
    pub failures: u64,
    pub last_duration_ms: f32,
    pub avg_duration_ms: f32,
}

impl ServerState {
    pub fn new(config: PlannerConfig) -> Self {
        let tables = config.yield_table();
        ServerState {
            config: Arc::new(config),
            tables: Arc::new(tables),
            health: RwLock::new(HealthData::default()),
        }
    }

    /// Record one finished plan request.
    pub async fn on_request(&self, duration_ms: f32, failed: bool) {
        let mut health = self.health.write().await;
        health.requests += 1;
        if failed {
            health.failures += 1;
        }
        health.last_duration_ms = duration_ms;
        health.recent_durations_ms.push(duration_ms);
        // Keep only the most recent durations for the average
        if health.recent_durations_ms.len() > RECENT_DURATIONS {
            health.recent_durations_ms.remove(0);
        }
    }
}

/// A parsed HTTP/1.1 request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Value of a `key=value` query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Why a request could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    Malformed(String),
    /// Chunked bodies are not supported; clients must send `Content-Length`.
    LengthRequired,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Malformed(e) => f.write_str(e),
            RequestError::LengthRequired => {
                f.write_str("chunked bodies are not supported, send Content-Length")
            }
        }
    }
}

impl From<String> for RequestError {
    fn from(e: String) -> Self {
        RequestError::Malformed(e)
    }
}

struct HttpResponse {
    status: &'static str,
    content_type: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    fn text(status: &'static str, message: impl Into<String>) -> Self {
        HttpResponse {
            status,
            content_type: "text/plain; charset=utf-8",
            headers: Vec::new(),
            body: message.into().into_bytes(),
        }
    }

    fn json(body: String) -> Self {
        HttpResponse {
            status: "200 OK",
            content_type: "application/json",
            headers: Vec::new(),
            body: body.into_bytes(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// Start the HTTP server on the given address. Runs until the listener fails.
pub async fn start_server(
    state: Arc<ServerState>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Planner listening on http://{}", addr);
    serve(listener, state).await
}

/// Accept connections on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        let request_id = Uuid::new_v4();
        let span = info_span!("request", id = %request_id, %peer);
        tokio::spawn(
            async move {
                if let Err(e) = handle_connection(stream, state).await {
                    error!("Connection error: {}", e);
                }
            }
            .instrument(span),
        );
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let response = match read_request(&mut stream).await {
        Ok(request) => route(request, &state).await,
        Err(RequestError::LengthRequired) => {
            warn!("Chunked request rejected");
            HttpResponse::text("411 Length Required", RequestError::LengthRequired.to_string())
        }
        Err(e) => {
            warn!(error = %e, "Malformed request");
            HttpResponse::text("400 Bad Request", e.to_string())
        }
    };
    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn route(request: HttpRequest, state: &ServerState) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => health_response(state).await,
        ("POST", "/") | ("POST", "/plan") => plan_response(request, state).await,
        (method, path) => {
            info!(%method, %path, "No route");
            HttpResponse::text("404 Not Found", format!("No route for {} {}", method, path))
        }
    }
}

async fn health_response(state: &ServerState) -> HttpResponse {
    let health = state.health.read().await;
    let status = HealthStatus {
        status: "ok",
        requests: health.requests,
        failures: health.failures,
        last_duration_ms: health.last_duration_ms,
        avg_duration_ms: health.avg_duration_ms(),
    };
    match serde_json::to_string(&status) {
        Ok(body) => HttpResponse::json(body),
        Err(e) => HttpResponse::text("500 Internal Server Error", e.to_string()),
    }
}

async fn plan_response(request: HttpRequest, state: &ServerState) -> HttpResponse {
    let query_strategy = match request.query_param("strategy").map(str::parse::<Strategy>) {
        Some(Err(e)) => return HttpResponse::text("400 Bad Request", e),
        Some(Ok(s)) => Some(s),
        None => None,
    };

    let start = Instant::now();
    let config = Arc::clone(&state.config);
    let tables = Arc::clone(&state.tables);
    let body = request.body;
    let planned = tokio::task::spawn_blocking(move || {
        plan_body(&body, query_strategy, &config, &tables)
    })
    .await;
    let duration_ms = start.elapsed().as_secs_f32() * 1000.0;

    let response = match planned {
        Ok(Ok((bytes, report))) => {
            let report_json = serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string());
            info!(
                duration_ms,
                cities = report.cities,
                campuses = report.campuses,
                "Plan served"
            );
            HttpResponse {
                status: "200 OK",
                content_type: "application/octet-stream",
                headers: vec![("X-Plan-Report", report_json)],
                body: bytes,
            }
        }
        Ok(Err(e)) => {
            warn!(error = %e, duration_ms, "Plan rejected");
            HttpResponse::text("422 Unprocessable Entity", e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Planning task failed");
            HttpResponse::text("500 Internal Server Error", "planning task failed")
        }
    };
    state
        .on_request(duration_ms, !response.status.starts_with("200"))
        .await;
    response
}

/// Decode, plan and re-encode one request body. The query strategy wins
/// over the envelope's, which wins over the configured one.
fn plan_body(
    body: &[u8],
    query_strategy: Option<Strategy>,
    config: &PlannerConfig,
    tables: &YieldTable,
) -> Result<(Vec<u8>, PlanReport), PlanError> {
    let (mut map, envelope_strategy) = decode_request(body)?;
    let solver = LpSolver::new(config.solver_time_budget());
    let report = match query_strategy.or(envelope_strategy) {
        Some(strategy) if strategy != config.strategy => {
            let config = PlannerConfig {
                strategy,
                ..config.clone()
            };
            plan_map(&mut map, &config, tables, &solver)?
        }
        _ => plan_map(&mut map, config, tables, &solver)?,
    };
    Ok((encode_map(&map)?, report))
}

/// Read one request: head up to the blank line, then `Content-Length` bytes.
pub async fn read_request<R: AsyncRead + Unpin>(
    stream: &mut R,
) -> Result<HttpRequest, RequestError> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(RequestError::Malformed("request head too large".to_string()));
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| format!("read failed: {}", e))?;
        if n == 0 {
            return Err(RequestError::Malformed(
                "connection closed before end of request head".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| "request head is not UTF-8".to_string())?;
    let (method, target, content_length) = parse_head(head)?;
    if content_length > MAX_BODY_BYTES {
        return Err(RequestError::Malformed(format!(
            "body of {} bytes exceeds the {} byte limit",
            content_length, MAX_BODY_BYTES
        )));
    }

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| format!("read failed: {}", e))?;
        if n == 0 {
            return Err(RequestError::Malformed(format!(
                "body ended after {} of {} bytes",
                body.len(),
                content_length
            )));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        body,
    })
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Method, request target and content length from a request head.
fn parse_head(head: &str) -> Result<(&str, &str, usize), RequestError> {
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("malformed request line '{}'", request_line).into());
    };
    if !version.starts_with("HTTP/1.") {
        return Err(format!("unsupported protocol '{}'", version).into());
    }

    let mut content_length = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(format!("malformed header '{}'", line).into());
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid Content-Length '{}'", value.trim()))?;
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.trim().eq_ignore_ascii_case("identity")
        {
            return Err(RequestError::LengthRequired);
        }
    }
    Ok((method, target, content_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tile::{BaseTerrain, Improvement};
    use crate::map::Map;
    use crate::transport::wire::decode_map;
    use std::time::Duration;

    fn small_config() -> PlannerConfig {
        PlannerConfig {
            solver_time_budget_ms: 20_000,
            ..PlannerConfig::default()
        }
    }

    /// Bind an ephemeral port and serve until the test ends.
    async fn spawn_server() -> (SocketAddr, Arc<ServerState>) {
        let state = Arc::new(ServerState::new(small_config()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            let _ = serve(listener, server_state).await;
        });
        (addr, state)
    }

    /// Send raw bytes, return (head, body).
    async fn send(addr: SocketAddr, request: &[u8]) -> (String, Vec<u8>) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(60), stream.read_to_end(&mut response))
            .await
            .expect("timeout waiting for response")
            .unwrap();
        let split = find_head_end(&response).expect("response has a head");
        let head = String::from_utf8_lossy(&response[..split]).to_string();
        (head, response[split + 4..].to_vec())
    }

    fn post(path: &str, body: &[u8]) -> Vec<u8> {
        let mut request = format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n",
            path,
            body.len()
        )
        .into_bytes();
        request.extend_from_slice(body);
        request
    }

    fn plains_map() -> Vec<u8> {
        encode_map(&Map::filled(3, 3, BaseTerrain::Plains)).unwrap()
    }

    #[test]
    fn head_parsing() {
        let head = "POST /plan?strategy=max_food HTTP/1.1\r\nHost: x\r\ncontent-length: 12";
        assert_eq!(
            parse_head(head).unwrap(),
            ("POST", "/plan?strategy=max_food", 12)
        );
        assert!(parse_head("GARBAGE").is_err());
        assert!(parse_head("GET / SPDY/3").is_err());
        assert!(parse_head("POST / HTTP/1.1\r\nContent-Length: lots").is_err());
        assert_eq!(
            parse_head("POST / HTTP/1.1\r\nTransfer-Encoding: chunked"),
            Err(RequestError::LengthRequired)
        );
    }

    #[tokio::test]
    async fn request_body_read_to_content_length() {
        let raw = post("/plan?strategy=max_yield&x=1", b"abcdef");
        let request = read_request(&mut raw.as_slice()).await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/plan");
        assert_eq!(request.query_param("strategy"), Some("max_yield"));
        assert_eq!(request.query_param("x"), Some("1"));
        assert_eq!(request.query_param("y"), None);
        assert_eq!(request.body, b"abcdef");
    }

    #[tokio::test]
    async fn truncated_body_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc".to_vec();
        let err = read_request(&mut raw.as_slice()).await.unwrap_err();
        assert!(err.to_string().contains("3 of 10"));
    }

    #[tokio::test]
    async fn health_counts_requests() {
        let state = ServerState::new(small_config());
        state.on_request(100.0, false).await;
        state.on_request(300.0, true).await;
        let health = state.health.read().await;
        assert_eq!(health.requests, 2);
        assert_eq!(health.failures, 1);
        assert_eq!(health.last_duration_ms, 300.0);
        assert!((health.avg_duration_ms() - 200.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn recent_durations_capped() {
        let state = ServerState::new(small_config());
        for i in 0..150 {
            state.on_request(i as f32, false).await;
        }
        let health = state.health.read().await;
        assert_eq!(health.recent_durations_ms.len(), RECENT_DURATIONS);
        assert_eq!(health.requests, 150);
    }

    #[tokio::test]
    async fn plan_endpoint_returns_planned_map() {
        let (addr, state) = spawn_server().await;
        let (head, body) = send(addr, &post("/plan", &plains_map())).await;

        assert!(head.starts_with("HTTP/1.1 200 OK"), "{}", head);
        assert!(head.contains("application/octet-stream"));
        let report_line = head
            .lines()
            .find(|l| l.starts_with("X-Plan-Report: "))
            .expect("report header");
        let report: serde_json::Value =
            serde_json::from_str(report_line.trim_start_matches("X-Plan-Report: ")).unwrap();
        assert_eq!(report["cities"], 1);

        let map = decode_map(&body).unwrap();
        assert_eq!(map.count_improvement(Improvement::City), 1);
        assert!(map.tiles.iter().all(|t| t.yield_value == 2));
        assert_eq!(state.health.read().await.requests, 1);
    }

    #[tokio::test]
    async fn root_accepts_json_envelope() {
        let (addr, _) = spawn_server().await;
        let envelope = serde_json::json!({ "data": plains_map() }).to_string();
        let (head, body) = send(addr, &post("/", envelope.as_bytes())).await;
        assert!(head.starts_with("HTTP/1.1 200 OK"), "{}", head);
        assert_eq!(decode_map(&body).unwrap().tiles.len(), 9);
    }

    #[tokio::test]
    async fn strategy_query_overrides_config() {
        let (addr, _) = spawn_server().await;
        let (_, body) = send(addr, &post("/plan?strategy=max_food", &plains_map())).await;
        let map = decode_map(&body).unwrap();
        // Plains yield one food.
        assert!(map.tiles.iter().all(|t| t.yield_value == 1));
    }

    #[tokio::test]
    async fn unknown_strategy_is_bad_request() {
        let (addr, _) = spawn_server().await;
        let (head, body) = send(addr, &post("/plan?strategy=max_gold", &plains_map())).await;
        assert!(head.starts_with("HTTP/1.1 400"), "{}", head);
        assert!(String::from_utf8_lossy(&body).contains("max_gold"));
    }

    #[tokio::test]
    async fn undecodable_map_is_unprocessable() {
        let (addr, state) = spawn_server().await;
        let (head, body) = send(addr, &post("/plan", b"\x01\x02\x03")).await;
        assert!(head.starts_with("HTTP/1.1 422"), "{}", head);
        assert!(String::from_utf8_lossy(&body).contains("Decode error"));
        assert_eq!(state.health.read().await.failures, 1);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (addr, _) = spawn_server().await;
        let (head, _) = send(addr, b"GET /maps HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(head.starts_with("HTTP/1.1 404"), "{}", head);
    }

    #[tokio::test]
    async fn malformed_request_is_bad_request() {
        let (addr, _) = spawn_server().await;
        let (head, _) = send(addr, b"HELLO\r\n\r\n").await;
        assert!(head.starts_with("HTTP/1.1 400"), "{}", head);
    }

    #[tokio::test]
    async fn health_endpoint_returns_json() {
        let (addr, state) = spawn_server().await;
        state.on_request(42.0, false).await;

        let (head, body) = send(addr, b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(head.contains("200 OK"));
        assert!(head.contains("application/json"));
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["requests"], 1);
        assert_eq!(parsed["last_duration_ms"], 42.0);
    }

    #[tokio::test]
    async fn chunked_body_needs_length() {
        let (addr, state) = spawn_server().await;
        let request = b"POST /plan HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n";
        let (head, body) = send(addr, request).await;
        assert!(head.starts_with("HTTP/1.1 411"), "{}", head);
        assert!(String::from_utf8_lossy(&body).contains("Content-Length"));
        assert_eq!(state.health.read().await.requests, 0);
    }
}
