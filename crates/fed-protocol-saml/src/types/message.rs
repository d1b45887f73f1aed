//! Protocol message envelope.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::status_codes;

/// Transport binding a message travelled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// HTTP-POST: the whole (possibly signed) document in the body.
    Post,
    /// HTTP-Redirect: deflated message in the query string, detached signature.
    Redirect,
}

impl Binding {
    /// Returns the binding URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Post => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::Redirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
        }
    }

    /// Parses a binding from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" => Some(Self::Post),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" => Some(Self::Redirect),
            _ => None,
        }
    }
}

/// Whether a message is being received or sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Received from a peer.
    Inbound,
    /// About to be sent to a peer.
    Outbound,
}

/// Message kind as seen by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A request (`AuthnRequest`, `LogoutRequest`, ...).
    Request,
    /// A status response (`Response`, `LogoutResponse`, ...).
    StatusResponse,
}

/// Type-erased handle on the externally parsed message object.
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
    /// Wraps a parsed object.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// An empty payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Returns whether a parsed object is attached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the parsed object as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_some() {
            f.write_str("Payload(..)")
        } else {
            f.write_str("Payload(empty)")
        }
    }
}

/// Fields common to every protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message identifier (`ID` attribute).
    pub id: String,
    /// Issuer entity identifier.
    pub issuer: String,
    /// Issue timestamp.
    pub issue_instant: DateTime<Utc>,
    /// Intended recipient endpoint.
    pub destination: Option<String>,
}

impl MessageHeader {
    /// Creates a header issued now.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            issuer: issuer.into(),
            issue_instant: Utc::now(),
            destination: None,
        }
    }

    /// Generates a message identifier. Identifiers must not start with a
    /// digit, hence the underscore.
    #[must_use]
    pub fn generate_id() -> String {
        format!("_{}", Uuid::new_v4().simple())
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the issue instant.
    #[must_use]
    pub const fn with_issue_instant(mut self, issue_instant: DateTime<Utc>) -> Self {
        self.issue_instant = issue_instant;
        self
    }
}

/// Request message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestType {
    /// Authentication request.
    AuthnRequest,
    /// Single logout request.
    LogoutRequest,
    /// Any other request, by element name.
    Other(String),
}

/// A request message.
#[derive(Debug, Clone)]
pub struct RequestMessage {
    /// Common fields.
    pub header: MessageHeader,
    /// Request type.
    pub request_type: RequestType,
    /// Subject name identifier (logout requests).
    pub subject: Option<String>,
    /// Session index (logout requests).
    pub session_index: Option<String>,
    /// Parsed message object.
    pub payload: Payload,
}

impl RequestMessage {
    /// Creates a request.
    #[must_use]
    pub fn new(header: MessageHeader, request_type: RequestType) -> Self {
        Self {
            header,
            request_type,
            subject: None,
            session_index: None,
            payload: Payload::empty(),
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the session index.
    #[must_use]
    pub fn with_session_index(mut self, session_index: impl Into<String>) -> Self {
        self.session_index = Some(session_index.into());
        self
    }

    /// Attaches the parsed object.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Status response message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseType {
    /// Authentication response carrying assertions.
    Response,
    /// Single logout response.
    LogoutResponse,
    /// Any other status response, by element name.
    Other(String),
}

/// A status response message.
#[derive(Debug, Clone)]
pub struct StatusResponseMessage {
    /// Common fields.
    pub header: MessageHeader,
    /// Response type.
    pub response_type: ResponseType,
    /// Top-level status code URI.
    pub status_code: String,
    /// Identifier of the request this answers.
    pub in_response_to: Option<String>,
    /// Parsed message object.
    pub payload: Payload,
}

impl StatusResponseMessage {
    /// Creates a successful response.
    #[must_use]
    pub fn new(header: MessageHeader, response_type: ResponseType) -> Self {
        Self {
            header,
            response_type,
            status_code: status_codes::SUCCESS.to_string(),
            in_response_to: None,
            payload: Payload::empty(),
        }
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status_code: impl Into<String>) -> Self {
        self.status_code = status_code.into();
        self
    }

    /// Sets the request this answers.
    #[must_use]
    pub fn with_in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Attaches the parsed object.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Returns whether the status is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == status_codes::SUCCESS
    }
}

/// A parsed protocol message. Immutable once built.
#[derive(Debug, Clone)]
pub enum ProtocolMessage {
    /// A request.
    Request(RequestMessage),
    /// A status response.
    Response(StatusResponseMessage),
}

impl ProtocolMessage {
    /// Returns the common fields.
    #[must_use]
    pub const fn header(&self) -> &MessageHeader {
        match self {
            Self::Request(r) => &r.header,
            Self::Response(r) => &r.header,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.header().id
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.header().issuer
    }

    /// Returns the issue instant.
    #[must_use]
    pub const fn issue_instant(&self) -> DateTime<Utc> {
        self.header().issue_instant
    }

    /// Returns the message kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Request(_) => MessageKind::Request,
            Self::Response(_) => MessageKind::StatusResponse,
        }
    }

    /// Returns whether this is a logout request or logout response.
    #[must_use]
    pub const fn is_logout(&self) -> bool {
        matches!(
            self,
            Self::Request(RequestMessage {
                request_type: RequestType::LogoutRequest,
                ..
            }) | Self::Response(StatusResponseMessage {
                response_type: ResponseType::LogoutResponse,
                ..
            })
        )
    }

    /// Returns the request, if this is one.
    #[must_use]
    pub const fn as_request(&self) -> Option<&RequestMessage> {
        match self {
            Self::Request(r) => Some(r),
            Self::Response(_) => None,
        }
    }

    /// Returns the status response, if this is one.
    #[must_use]
    pub const fn as_response(&self) -> Option<&StatusResponseMessage> {
        match self {
            Self::Response(r) => Some(r),
            Self::Request(_) => None,
        }
    }
}

impl From<RequestMessage> for ProtocolMessage {
    fn from(request: RequestMessage) -> Self {
        Self::Request(request)
    }
}

impl From<StatusResponseMessage> for ProtocolMessage {
    fn from(response: StatusResponseMessage) -> Self {
        Self::Response(response)
    }
}
