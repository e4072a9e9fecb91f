//! Policy sidecar HTTP server
//!
//! Exposes the gate over JSON so the API layer and the HQ app can ask
//! "may this session do X?" and "is this payload well-formed?" without
//! linking the crate.

use crate::gate::{AccessGate, GateError, ValidationErrors};
use crate::validation::{sanitize_input, validate_identifier_name_in, Locale, SignupPayload};
use anyhow::Result;
use bytes::Bytes;
use http::header::{HeaderValue, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Maximum request body size (64 KiB)
pub const MAX_REQUEST_SIZE: usize = 65_536;

#[derive(Debug, Deserialize)]
struct AuthorizeRequest {
    action: String,
}

#[derive(Debug, Deserialize)]
struct IdentifierRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SanitizeRequest {
    input: String,
}

/// Policy sidecar server
#[derive(Clone)]
pub struct GuardServer {
    addr: SocketAddr,
    gate: Arc<AccessGate>,
}

impl GuardServer {
    pub fn new(addr: SocketAddr, gate: Arc<AccessGate>) -> Self {
        Self { addr, gate }
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Guard server listening on {}", self.addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let gate = Arc::clone(&self.gate);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service =
                            service_fn(move |req| Self::handle_request(Arc::clone(&gate), req, addr));
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            debug!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    async fn handle_request(
        gate: Arc<AccessGate>,
        req: Request<Incoming>,
        addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();
        let client = addr.ip();

        let declared_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_length.is_some_and(|len| len > MAX_REQUEST_SIZE) {
            return Ok(refuse(&gate, path, client, payload_too_large()));
        }

        // Chunked bodies carry no length, so the cap is enforced while reading
        let body = match Limited::new(body, MAX_REQUEST_SIZE).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                return Ok(refuse(&gate, path, client, payload_too_large()));
            }
            Err(e) => {
                debug!("Failed to read request body from {}: {}", addr, e);
                return Ok(refuse(
                    &gate,
                    path,
                    client,
                    GateError::BadRequest(format!("Failed to read request body: {}", e)),
                ));
            }
        };

        Ok(route(&gate, &parts.method, path, &parts.headers, &body, client))
    }
}

fn payload_too_large() -> GateError {
    GateError::PayloadTooLarge {
        limit: MAX_REQUEST_SIZE,
    }
}

/// Refuse a request before routing. The refusal still counts against the
/// client's rate budget, and a client already over budget gets 429.
fn refuse(gate: &AccessGate, path: &str, client: IpAddr, err: GateError) -> Response<Full<Bytes>> {
    let err = if path == "/health" {
        err
    } else {
        gate.check_rate(client).err().unwrap_or(err)
    };
    debug!("Refused request to {} from {}: {}", path, client, err);
    error_response(&err)
}

/// Route one request through the gate.
///
/// Every path except `/health` is rate limited per client address.
pub fn route(
    gate: &AccessGate,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
    client: IpAddr,
) -> Response<Full<Bytes>> {
    let request_id = Uuid::new_v4().to_string();
    debug!("{} {} from {} (request_id: {})", method, path, client, &request_id[..8]);

    let result = if path == "/health" {
        health(method)
    } else {
        gate.check_rate(client)
            .and_then(|_| dispatch(gate, method, path, headers, body))
    };

    match result {
        Ok((status, value)) => json_response(status, &value),
        Err(err) => {
            if err.status().is_client_error() {
                debug!("Request {} refused: {}", &request_id[..8], err);
            } else {
                warn!("Request {} failed: {}", &request_id[..8], err);
            }
            error_response(&err)
        }
    }
}

fn health(method: &Method) -> Result<(StatusCode, Value), GateError> {
    if method != Method::GET {
        return Err(GateError::MethodNotAllowed);
    }
    Ok((StatusCode::OK, json!({ "status": "ok" })))
}

fn dispatch(
    gate: &AccessGate,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(StatusCode, Value), GateError> {
    let locale = Locale::from_accept_language(
        headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()),
    );

    let handler: fn(&AccessGate, &HeaderMap, &[u8], Locale) -> Result<(StatusCode, Value), GateError> =
        match path {
            "/v1/authorize" => authorize,
            "/v1/validate/identifier" => validate_identifier,
            "/v1/validate/signup" => validate_signup,
            "/v1/sanitize" => sanitize,
            _ => return Err(GateError::NotFound),
        };

    if method != Method::POST {
        return Err(GateError::MethodNotAllowed);
    }
    handler(gate, headers, body, locale)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, GateError> {
    if body.len() > MAX_REQUEST_SIZE {
        return Err(payload_too_large());
    }
    serde_json::from_slice(body).map_err(|e| GateError::BadRequest(format!("Invalid JSON: {}", e)))
}

fn authorize(
    gate: &AccessGate,
    headers: &HeaderMap,
    body: &[u8],
    _locale: Locale,
) -> Result<(StatusCode, Value), GateError> {
    let subject = gate.authenticate(headers).ok_or(GateError::Unauthenticated)?;
    let request: AuthorizeRequest = parse_body(body)?;
    gate.authorize(Some(&subject), &request.action)?;
    Ok((
        StatusCode::OK,
        json!({
            "allowed": true,
            "action": request.action,
            "subject": subject,
        }),
    ))
}

fn validate_identifier(
    _gate: &AccessGate,
    _headers: &HeaderMap,
    body: &[u8],
    locale: Locale,
) -> Result<(StatusCode, Value), GateError> {
    let request: IdentifierRequest = parse_body(body)?;
    let result = validate_identifier_name_in(&request.name, locale);
    if !result.is_valid {
        return Err(GateError::Validation(ValidationErrors::List(result.errors)));
    }
    Ok((StatusCode::OK, json!(result)))
}

fn validate_signup(
    gate: &AccessGate,
    _headers: &HeaderMap,
    body: &[u8],
    locale: Locale,
) -> Result<(StatusCode, Value), GateError> {
    let payload: SignupPayload = parse_body(body)?;
    gate.require_valid_signup(&payload, locale)?;
    Ok((StatusCode::OK, json!({ "isValid": true, "errors": {} })))
}

fn sanitize(
    _gate: &AccessGate,
    _headers: &HeaderMap,
    body: &[u8],
    _locale: Locale,
) -> Result<(StatusCode, Value), GateError> {
    let request: SanitizeRequest = parse_body(body)?;
    Ok((StatusCode::OK, json!({ "output": sanitize_input(&request.input) })))
}

fn json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(err: &GateError) -> Response<Full<Bytes>> {
    let mut response = json_response(err.status(), &err.to_json());
    if let Some(secs) = err.retry_after_secs() {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}
