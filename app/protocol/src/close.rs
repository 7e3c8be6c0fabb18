//! WebSocket closure codes and their meaning for an RPC stream.
//!
//! See RFC 6455 §7.4.1. Code 1000 is the only code that signals a
//! successfully exhausted stream; everything else is an error.

use std::fmt;

/// Normal closure: the server sent every reply.
pub const NORMAL: u16 = 1000;
/// Endpoint received a frame it could not handle.
pub const PROTOCOL_ERROR: u16 = 1002;
/// Closure without a status code, e.g. a client-initiated close.
pub const NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame.
pub const ABNORMAL: u16 = 1006;
/// Text frame was not valid UTF-8.
pub const INVALID_PAYLOAD: u16 = 1007;
/// Frame exceeded the size limit.
pub const TOO_LARGE: u16 = 1009;

/// Why an RPC transport was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 1000: stream exhausted.
    Normal,
    /// 1001: endpoint going away.
    EndpointDisconnected,
    /// 1002: protocol error.
    ProtocolError,
    /// 1003: data of a type that cannot be accepted.
    IncorrectData,
    /// 1004: reserved.
    Reserved,
    /// 1005: no status code present.
    NoStatus,
    /// 1006: closed without a close frame.
    Abnormal,
    /// 1007: payload inconsistent with the message type.
    IncorrectMessageType,
    /// 1008: policy violation.
    PolicyViolation,
    /// 1009: message too large.
    TooLarge,
    /// 1010: required extension not negotiated.
    UnsupportedExtension,
    /// 1011: unexpected server condition.
    ServerError,
    /// 1015: TLS handshake failure.
    TlsFailure,
    /// Any other code.
    Unknown(u16),
}

impl CloseReason {
    /// Map a closure code onto the taxonomy.
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::EndpointDisconnected,
            1002 => Self::ProtocolError,
            1003 => Self::IncorrectData,
            1004 => Self::Reserved,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::IncorrectMessageType,
            1008 => Self::PolicyViolation,
            1009 => Self::TooLarge,
            1010 => Self::UnsupportedExtension,
            1011 => Self::ServerError,
            1015 => Self::TlsFailure,
            other => Self::Unknown(other),
        }
    }

    /// The closure code this reason stands for.
    pub fn code(&self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::EndpointDisconnected => 1001,
            Self::ProtocolError => 1002,
            Self::IncorrectData => 1003,
            Self::Reserved => 1004,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::IncorrectMessageType => 1007,
            Self::PolicyViolation => 1008,
            Self::TooLarge => 1009,
            Self::UnsupportedExtension => 1010,
            Self::ServerError => 1011,
            Self::TlsFailure => 1015,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether this closure signals a successfully completed stream.
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Human-readable description shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Normal => "Normal closure.",
            Self::EndpointDisconnected => "Endpoint disconnected.",
            Self::ProtocolError => "Protocol error.",
            Self::IncorrectData => "Incorrect data.",
            Self::Reserved => "Reserved.",
            Self::NoStatus => "No status code.",
            Self::Abnormal => "Connection closed abnormally.",
            Self::IncorrectMessageType => "Incorrect message type.",
            Self::PolicyViolation => "Message violates policy.",
            Self::TooLarge => "Message too large.",
            Self::UnsupportedExtension => "Protocol extension not supported.",
            Self::ServerError => "Unexpected server condition.",
            Self::TlsFailure => "Cannot verify server TLS certificate.",
            Self::Unknown(_) => "Unknown reason.",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<u16> for CloseReason {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_survive_mapping() {
        for code in 1000..=1015 {
            assert_eq!(CloseReason::from_code(code).code(), code);
        }
        assert_eq!(CloseReason::from_code(4000).code(), 4000);
    }

    #[test]
    fn only_normal_is_success() {
        assert!(CloseReason::from_code(NORMAL).is_normal());
        assert!(!CloseReason::from_code(NO_STATUS).is_normal());
        assert!(!CloseReason::from_code(ABNORMAL).is_normal());
    }
}
