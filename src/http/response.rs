//! Uniform response envelope.
//!
//! Every endpoint result is wrapped in the same body shape:
//!
//! ```text
//! { "meta": { requestId, apiVersion, responseType, ... },
//!   "message": "...",
//!   "errors": [ { message, reason? } ],
//!   "data": { ... } }
//! ```
//!
//! A response kind names one row of the status table; 2xx kinds render a
//! success envelope (data populated, errors empty), all others render an
//! error envelope (errors populated, data empty). The `reason` field of an
//! error detail is serialized only when the debug flag is enabled.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Fallback message for uncategorized failures.
pub const DEFAULT_ERROR_MESSAGE: &str = "Oops !!! Something went wrong.";

/// Named response category mapping to one HTTP status and default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Ok,
    BadRequest,
    Unauthorized,
    SessionExpired,
    TokenExpired,
    InvalidApiKey,
    AccountSuspended,
    PaymentRequired,
    PermissionDenied,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    ProxyAuthenticationRequired,
    RequestTimeout,
    PayloadTooLarge,
    UriTooLong,
    TooManyRequest,
    HeaderTooLarge,
    InternalServerError,
    ThirdPartyError,
    UncaughtError,
    NotImplemented,
    BadGateway,
    MaintenanceMode,
    GatewayTimeout,
    HttpVersionNotSupported,
}

impl ResponseKind {
    /// Every kind, in table order. Reverse status lookup takes the first match.
    pub const ALL: [ResponseKind; 26] = [
        ResponseKind::Ok,
        ResponseKind::BadRequest,
        ResponseKind::Unauthorized,
        ResponseKind::SessionExpired,
        ResponseKind::TokenExpired,
        ResponseKind::InvalidApiKey,
        ResponseKind::AccountSuspended,
        ResponseKind::PaymentRequired,
        ResponseKind::PermissionDenied,
        ResponseKind::NotFound,
        ResponseKind::MethodNotAllowed,
        ResponseKind::NotAcceptable,
        ResponseKind::ProxyAuthenticationRequired,
        ResponseKind::RequestTimeout,
        ResponseKind::PayloadTooLarge,
        ResponseKind::UriTooLong,
        ResponseKind::TooManyRequest,
        ResponseKind::HeaderTooLarge,
        ResponseKind::InternalServerError,
        ResponseKind::ThirdPartyError,
        ResponseKind::UncaughtError,
        ResponseKind::NotImplemented,
        ResponseKind::BadGateway,
        ResponseKind::MaintenanceMode,
        ResponseKind::GatewayTimeout,
        ResponseKind::HttpVersionNotSupported,
    ];

    /// HTTP status for this kind.
    pub fn status(self) -> StatusCode {
        match self {
            ResponseKind::Ok => StatusCode::OK,
            ResponseKind::BadRequest => StatusCode::BAD_REQUEST,
            ResponseKind::Unauthorized
            | ResponseKind::SessionExpired
            | ResponseKind::TokenExpired
            | ResponseKind::InvalidApiKey
            | ResponseKind::AccountSuspended => StatusCode::UNAUTHORIZED,
            ResponseKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            ResponseKind::PermissionDenied => StatusCode::FORBIDDEN,
            ResponseKind::NotFound => StatusCode::NOT_FOUND,
            ResponseKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ResponseKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ResponseKind::ProxyAuthenticationRequired => StatusCode::PROXY_AUTHENTICATION_REQUIRED,
            ResponseKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ResponseKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ResponseKind::UriTooLong => StatusCode::URI_TOO_LONG,
            ResponseKind::TooManyRequest => StatusCode::TOO_MANY_REQUESTS,
            ResponseKind::HeaderTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ResponseKind::InternalServerError
            | ResponseKind::ThirdPartyError
            | ResponseKind::UncaughtError => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ResponseKind::BadGateway => StatusCode::BAD_GATEWAY,
            ResponseKind::MaintenanceMode => StatusCode::SERVICE_UNAVAILABLE,
            ResponseKind::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            ResponseKind::HttpVersionNotSupported => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
        }
    }

    /// Message used when the caller supplies none.
    pub fn default_message(self) -> &'static str {
        match self {
            ResponseKind::Ok => "Success",
            ResponseKind::BadRequest => "Invalid data provided",
            ResponseKind::Unauthorized => "Unauthorized access",
            ResponseKind::SessionExpired => "Session has been expired",
            ResponseKind::TokenExpired => "Token has been expired",
            ResponseKind::InvalidApiKey => "Invalid api key provided",
            ResponseKind::AccountSuspended => "Account has been suspended",
            ResponseKind::PaymentRequired => "Payment is required",
            ResponseKind::PermissionDenied => "Permission denied",
            ResponseKind::NotFound => "Resource not found",
            ResponseKind::MethodNotAllowed => "Requested method is not allowed",
            ResponseKind::NotAcceptable => "Not acceptable request",
            ResponseKind::ProxyAuthenticationRequired => "Proxy authentication required",
            ResponseKind::RequestTimeout => "Request timeout",
            ResponseKind::PayloadTooLarge => "Payload too large",
            ResponseKind::UriTooLong => "URI too long",
            ResponseKind::TooManyRequest => "Too many request",
            ResponseKind::HeaderTooLarge => "Request header fields too large",
            ResponseKind::InternalServerError => DEFAULT_ERROR_MESSAGE,
            ResponseKind::ThirdPartyError => "Third party error",
            ResponseKind::UncaughtError => "Uncaught error",
            ResponseKind::NotImplemented => "Feature still now not implemented",
            ResponseKind::BadGateway => "Bad gateway",
            ResponseKind::MaintenanceMode => "This service is under maintenance",
            ResponseKind::GatewayTimeout => "Gateway timeout",
            ResponseKind::HttpVersionNotSupported => "HTTP version not supported",
        }
    }

    /// Wire name of this kind, used as `meta.responseType`.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Ok => "OK",
            ResponseKind::BadRequest => "BadRequest",
            ResponseKind::Unauthorized => "Unauthorized",
            ResponseKind::SessionExpired => "SessionExpired",
            ResponseKind::TokenExpired => "TokenExpired",
            ResponseKind::InvalidApiKey => "InvalidApiKey",
            ResponseKind::AccountSuspended => "AccountSuspended",
            ResponseKind::PaymentRequired => "PaymentRequired",
            ResponseKind::PermissionDenied => "PermissionDenied",
            ResponseKind::NotFound => "NotFound",
            ResponseKind::MethodNotAllowed => "MethodNotAllowed",
            ResponseKind::NotAcceptable => "NotAcceptable",
            ResponseKind::ProxyAuthenticationRequired => "ProxyAuthenticationRequired",
            ResponseKind::RequestTimeout => "RequestTimeout",
            ResponseKind::PayloadTooLarge => "PayloadTooLarge",
            ResponseKind::UriTooLong => "URITooLong",
            ResponseKind::TooManyRequest => "TooManyRequest",
            ResponseKind::HeaderTooLarge => "HeaderTooLarge",
            ResponseKind::InternalServerError => "InternalServerError",
            ResponseKind::ThirdPartyError => "ThirdPartyError",
            ResponseKind::UncaughtError => "UncaughtError",
            ResponseKind::NotImplemented => "NotImplemented",
            ResponseKind::BadGateway => "BadGateway",
            ResponseKind::MaintenanceMode => "MaintenanceMode",
            ResponseKind::GatewayTimeout => "GatewayTimeout",
            ResponseKind::HttpVersionNotSupported => "HTTPVersionNotSupported",
        }
    }

    /// Look up a kind by its wire name.
    pub fn parse(name: &str) -> Option<ResponseKind> {
        ResponseKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Reverse lookup from a status code; unknown codes map to `UncaughtError`.
    pub fn from_status(status: StatusCode) -> ResponseKind {
        ResponseKind::ALL
            .into_iter()
            .find(|kind| kind.status() == status)
            .unwrap_or(ResponseKind::UncaughtError)
    }

    /// Whether this kind renders a success envelope.
    pub fn is_success(self) -> bool {
        self.status().is_success()
    }
}

/// Envelope metadata. Optional fields are omitted from the body when unset.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_retry: Option<bool>,
    /// Suggested retry delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_rate_limit_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_rate_limit_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_rate_limit_reset: Option<u64>,
}

/// A single field-level error inside an error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Client-facing message; kind default when absent.
    pub message: Option<String>,
    /// Diagnostic detail, surfaced only under the debug flag.
    pub reason: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            reason: Some(reason.into()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            reason: None,
        }
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            message: None,
            reason: Some(reason.into()),
        }
    }
}

/// Payload of a reply: success data or an error list. Exactly one branch
/// is ever rendered into the envelope.
#[derive(Debug, Clone)]
pub enum ReplyBody {
    Success {
        message: Option<String>,
        data: Value,
    },
    Errors(Vec<ErrorDetail>),
}

/// A typed endpoint result, rendered into the envelope at the HTTP edge.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub kind: ResponseKind,
    pub body: ReplyBody,
    pub meta: Meta,
}

/// Failure to interpret a dynamic single-key reply object.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("reply object should have only one key, got {0}")]
    KeyCount(usize),
    #[error("invalid response type provided: {0}")]
    UnknownKind(String),
    #[error("reply payload is not an object")]
    NotAnObject,
    #[error("malformed reply payload for {0}")]
    MalformedPayload(&'static str),
}

impl ApiReply {
    /// Success reply with an optional message override.
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            kind: ResponseKind::Ok,
            body: ReplyBody::Success {
                message: Some(message.into()),
                data,
            },
            meta: Meta::default(),
        }
    }

    /// Error reply of the given kind.
    pub fn error(kind: ResponseKind, errors: Vec<ErrorDetail>) -> Self {
        Self {
            kind,
            body: ReplyBody::Errors(errors),
            meta: Meta::default(),
        }
    }

    /// Validation failure listing one message per failing field.
    pub fn bad_request(errors: Vec<ErrorDetail>) -> Self {
        Self::error(ResponseKind::BadRequest, errors)
    }

    /// Unexpected failure; `reason` is debug-only diagnostics.
    pub fn internal(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::error(
            ResponseKind::InternalServerError,
            vec![ErrorDetail::new(message, reason)],
        )
    }

    /// Attach metadata fields to this reply.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    /// Interpret a dynamic single-key object (`{"<Kind>": payload}`).
    ///
    /// Fails when the object has zero or more than one key, when the key is
    /// not a known response kind, or when the payload does not match the
    /// success/error branch of that kind.
    pub fn from_value(value: Value) -> Result<ApiReply, EnvelopeError> {
        let object = match value {
            Value::Object(map) => map,
            _ => return Err(EnvelopeError::NotAnObject),
        };
        if object.len() != 1 {
            return Err(EnvelopeError::KeyCount(object.len()));
        }
        // Single-entry map checked above.
        let (name, payload) = object.into_iter().next().ok_or(EnvelopeError::KeyCount(0))?;
        let kind =
            ResponseKind::parse(&name).ok_or_else(|| EnvelopeError::UnknownKind(name.clone()))?;

        if kind.is_success() {
            let mut payload = match payload {
                Value::Object(map) => map,
                _ => return Err(EnvelopeError::MalformedPayload("success payload")),
            };
            let message = match payload.remove("message") {
                Some(Value::String(s)) => Some(s),
                Some(_) => return Err(EnvelopeError::MalformedPayload("message")),
                None => None,
            };
            let data = payload.remove("data").unwrap_or(Value::Object(Default::default()));
            return Ok(ApiReply {
                kind,
                body: ReplyBody::Success { message, data },
                meta: Meta::default(),
            });
        }

        let entries = match payload {
            Value::Array(entries) => entries,
            _ => return Err(EnvelopeError::MalformedPayload("error list")),
        };
        let mut errors = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = match entry {
                Value::Object(map) => map,
                _ => return Err(EnvelopeError::MalformedPayload("error entry")),
            };
            let field = |map: &serde_json::Map<String, Value>, key: &str| {
                map.get(key).and_then(Value::as_str).map(str::to_string)
            };
            errors.push(ErrorDetail {
                message: field(&entry, "message"),
                reason: field(&entry, "reason"),
            });
        }
        Ok(ApiReply {
            kind,
            body: ReplyBody::Errors(errors),
            meta: Meta::default(),
        })
    }

    /// Render into an HTTP response: status from the kind table, envelope
    /// body with request metadata. `debug` gates the `reason` field.
    pub fn into_http(self, request_id: Option<Uuid>, debug: bool) -> Response {
        let kind = self.kind;
        let mut meta = self.meta;
        meta.api_version = Some(env!("CARGO_PKG_VERSION").to_string());
        meta.request_id = request_id;
        meta.response_type = Some(kind.as_str());

        let envelope = match self.body {
            ReplyBody::Success { message, data } => Envelope {
                meta,
                message: message.unwrap_or_else(|| kind.default_message().to_string()),
                errors: Vec::new(),
                data,
            },
            ReplyBody::Errors(details) => {
                let message = details
                    .first()
                    .and_then(|detail| detail.message.clone())
                    .unwrap_or_else(|| kind.default_message().to_string());
                let errors = details
                    .into_iter()
                    .map(|detail| ErrorOut {
                        message: detail
                            .message
                            .unwrap_or_else(|| kind.default_message().to_string()),
                        reason: if debug { detail.reason } else { None },
                    })
                    .collect();
                Envelope {
                    meta,
                    message,
                    errors,
                    data: Value::Object(Default::default()),
                }
            }
        };

        (kind.status(), Json(envelope)).into_response()
    }
}

/// Serialized envelope body.
#[derive(Debug, Serialize)]
struct Envelope {
    meta: Meta,
    message: String,
    errors: Vec<ErrorOut>,
    data: Value,
}

#[derive(Debug, Serialize)]
struct ErrorOut {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}
