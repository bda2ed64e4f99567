//! Error taxonomy shared by the proxy, the stubs and the controller.
//!
//! Every variant maps to a stable `i32` status via [`ImfError::code`] so a
//! binding layer can surface plain integers without matching on the enum.

use crate::parcel::ParcelError;
use crate::remote::TransportError;

/// Numeric status codes returned across the binding boundary.
pub mod code {
    pub const NO_ERROR: i32 = 0;
    pub const ERROR_STATUS_UNKNOWN: i32 = 1;
    pub const ERROR_SERVICE_START_FAILED: i32 = 2;
    pub const ERROR_CLIENT_NOT_BOUND: i32 = 3;
    pub const ERROR_CLIENT_NOT_EDITABLE: i32 = 4;
    pub const ERROR_NULL_AGENT: i32 = 5;
    pub const ERROR_BAD_PARAMETERS: i32 = 6;
    pub const ERROR_EX_ILLEGAL_ARGUMENT: i32 = 7;
    pub const ERROR_EX_PARCELABLE: i32 = 8;
    pub const ERROR_EX_REPLY_PARCELABLE: i32 = 9;
    pub const ERROR_WORKER_SPAWN: i32 = 10;
    /// Transport-level failures are offset so they never collide with
    /// service statuses.
    pub const ERROR_TRANSPORT_BASE: i32 = 1000;
}

#[derive(Debug, thiserror::Error)]
pub enum ImfError {
    #[error("client is not bound to the input method service")]
    NotBound,
    #[error("client is not in editable state")]
    NotEditable,
    #[error("input method service is unavailable")]
    ServiceUnavailable,
    #[error("no input method agent attached")]
    NullAgent,
    #[error("bad parameters: {0}")]
    BadParameters(String),
    #[error("failed to write interface token")]
    InterfaceToken,
    #[error("failed to encode request: {0}")]
    Encode(ParcelError),
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("failed to decode reply: {0}")]
    Decode(ParcelError),
    #[error("service returned status {0}")]
    Remote(i32),
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
}

impl ImfError {
    /// Stable status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotBound => code::ERROR_CLIENT_NOT_BOUND,
            Self::NotEditable => code::ERROR_CLIENT_NOT_EDITABLE,
            Self::ServiceUnavailable => code::ERROR_SERVICE_START_FAILED,
            Self::NullAgent => code::ERROR_NULL_AGENT,
            Self::BadParameters(_) => code::ERROR_BAD_PARAMETERS,
            Self::InterfaceToken => code::ERROR_EX_ILLEGAL_ARGUMENT,
            Self::Encode(_) => code::ERROR_EX_PARCELABLE,
            Self::Transport(e) => code::ERROR_TRANSPORT_BASE + e.0.abs(),
            Self::Decode(_) => code::ERROR_EX_REPLY_PARCELABLE,
            Self::Remote(status) => *status,
            Self::Spawn(_) => code::ERROR_WORKER_SPAWN,
        }
    }

    /// Interpret a reply status: `NO_ERROR` is success, anything else is
    /// passed through verbatim.
    pub fn check_status(status: i32) -> Result<(), ImfError> {
        if status == code::NO_ERROR {
            Ok(())
        } else {
            Err(ImfError::Remote(status))
        }
    }

    /// Whether the error came from local state validation and never reached
    /// the remote side.
    pub fn is_client_state(&self) -> bool {
        matches!(self, Self::NotBound | Self::NotEditable | Self::NullAgent)
    }
}

/// Flatten a result into the status code the binding layer expects.
pub fn status_of<T>(result: &Result<T, ImfError>) -> i32 {
    match result {
        Ok(_) => code::NO_ERROR,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_status_is_verbatim() {
        assert_eq!(ImfError::Remote(42).code(), 42);
        assert!(matches!(ImfError::check_status(42), Err(ImfError::Remote(42))));
        assert!(ImfError::check_status(code::NO_ERROR).is_ok());
    }

    #[test]
    fn encode_transport_decode_are_distinct() {
        let encode = ImfError::Encode(ParcelError::Overflow {
            needed: 8,
            capacity: 4,
        });
        let transport = ImfError::Transport(TransportError(-32));
        let decode = ImfError::Decode(ParcelError::Underflow {
            needed: 4,
            available: 0,
        });
        let codes = [encode.code(), transport.code(), decode.code()];
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
        assert_ne!(codes[0], codes[2]);
    }

    #[test]
    fn status_of_flattens() {
        let ok: Result<(), ImfError> = Ok(());
        assert_eq!(status_of(&ok), code::NO_ERROR);
        let err: Result<(), ImfError> = Err(ImfError::NotEditable);
        assert_eq!(status_of(&err), code::ERROR_CLIENT_NOT_EDITABLE);
        assert!(ImfError::NotBound.is_client_state());
        assert!(!ImfError::Remote(1).is_client_state());
    }
}
