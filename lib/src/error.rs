// Copyright (c) 2026 The BitSafe Developers

use bitsafe_proto::{FrameError, MessageKind};

/// BitSafe API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HID Init Error
    #[cfg(feature = "transport_hid")]
    #[error("could not create HidApi instance")]
    HidInit,

    /// HID Error
    #[cfg(feature = "transport_hid")]
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// No BitSafe device available
    #[error("No device found")]
    NoDevice,

    /// Failure reading or writing reports
    #[error("Transport error: {0}")]
    Transport(anyhow::Error),

    /// Malformed framing, host and device are out of step
    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    /// Malformed message payload
    #[error("Message decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Device rejected the request
    #[error("Device error {code}: {message}")]
    Device { code: u32, message: String },

    /// Device replied with a message kind not valid for the request
    #[error("Unexpected response 0x{kind:02x} to {request} request")]
    UnexpectedResponse { kind: u16, request: MessageKind },

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Key hash controlling an input is not in the address cache
    #[error("Unknown address {0} (address cache may be stale)")]
    UnknownAddress(String),

    /// Device holds fewer addresses than the cache, the cache belongs to
    /// another wallet and must be discarded
    #[error("Stale address cache (device holds {count} addresses, cache {cached})")]
    StaleCache { count: u32, cached: usize },

    /// Address handle out of sequence
    #[error("Invalid address handle (actual: {actual}, expected: {expected})")]
    InvalidHandle { actual: u32, expected: u32 },

    /// Transaction cannot be signed
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(&'static str),

    /// Signature returned by the device is not bitcoin encoded
    #[error("Invalid signature encoding")]
    InvalidSignature,

    /// Address cache storage error
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address cache encoding error
    #[error("Cache encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an underlying transport error
    pub fn transport(e: impl Into<anyhow::Error>) -> Self {
        Error::Transport(e.into())
    }

    /// Check whether the error leaves the channel to the device in an unknown state
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Frame(_) | Error::RequestTimeout | Error::UserTimeout
        ) || self.is_hid()
    }

    #[cfg(feature = "transport_hid")]
    fn is_hid(&self) -> bool {
        matches!(self, Error::Hid(_))
    }

    #[cfg(not(feature = "transport_hid"))]
    fn is_hid(&self) -> bool {
        false
    }
}

impl From<bitsafe_proto::messages::Failure> for Error {
    fn from(f: bitsafe_proto::messages::Failure) -> Self {
        Error::Device {
            code: f.error_code,
            message: f.error_message,
        }
    }
}
