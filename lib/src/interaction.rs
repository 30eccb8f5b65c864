// Copyright (c) 2026 The BitSafe Developers

//! User interaction hooks for device interjections
//!
//! The device may interrupt a request to wait for a button press or to ask
//! for a password before answering. [Interaction] lets the application
//! decide how each interjection is answered.

use async_trait::async_trait;
use zeroize::Zeroizing;

use bitsafe_proto::MessageKind;

/// Device-initiated sub-exchange inserted before the reply to a request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interjection {
    /// Device waits for a button press (`ButtonRequest`)
    Button,
    /// Device requires a wallet password (`PinRequest`)
    Pin,
    /// Device requires a one-time password (`OtpRequest`)
    Otp,
}

impl Interjection {
    /// Map a received message kind to an interjection
    pub fn from_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::ButtonRequest => Some(Self::Button),
            MessageKind::PinRequest => Some(Self::Pin),
            MessageKind::OtpRequest => Some(Self::Otp),
            _ => None,
        }
    }
}

/// Application hooks for answering interjections
///
/// `request` is the kind of the request being processed.
/// The defaults approve button presses and decline password requests.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Device is waiting for a button press, return `false` to cancel it
    async fn button(&self, request: MessageKind) -> bool {
        let _ = request;
        true
    }

    /// Device requires a wallet password, `None` cancels
    async fn pin(&self, request: MessageKind) -> Option<Zeroizing<Vec<u8>>> {
        let _ = request;
        None
    }

    /// Device requires a one-time password, `None` cancels
    async fn otp(&self, request: MessageKind) -> Option<Zeroizing<String>> {
        let _ = request;
        None
    }
}

/// Approve every button request, decline passwords
#[derive(Copy, Clone, Debug, Default)]
pub struct AutoApprove;

impl Interaction for AutoApprove {}

/// Answer interjections with fixed secrets
#[derive(Clone, Default)]
pub struct StaticSecrets {
    /// Wallet password supplied on `PinRequest`
    pub pin: Option<Zeroizing<Vec<u8>>>,
    /// One-time password supplied on `OtpRequest`
    pub otp: Option<Zeroizing<String>>,
    /// Cancel button requests instead of approving them
    pub deny_button: bool,
}

impl StaticSecrets {
    pub fn new(pin: Option<&[u8]>, otp: Option<&str>) -> Self {
        Self {
            pin: pin.map(|p| Zeroizing::new(p.to_vec())),
            otp: otp.map(|o| Zeroizing::new(o.to_string())),
            deny_button: false,
        }
    }
}

#[async_trait]
impl Interaction for StaticSecrets {
    async fn button(&self, _request: MessageKind) -> bool {
        !self.deny_button
    }

    async fn pin(&self, _request: MessageKind) -> Option<Zeroizing<Vec<u8>>> {
        self.pin.clone()
    }

    async fn otp(&self, _request: MessageKind) -> Option<Zeroizing<String>> {
        self.otp.clone()
    }
}
