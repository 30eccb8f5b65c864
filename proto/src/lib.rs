// Copyright (c) 2026 The BitSafe Developers

//! Protocol / message definitions for BitSafe hardware wallet communication
//!
//! Messages are protocol buffers (see [messages]) tagged with a [MessageKind],
//! because an encoded protobuf does not identify its own type. A tagged message
//! is carried in a [Frame], which in turn is split into length-prefixed reports
//! sized for the 64-byte USB HID interrupt endpoint (see [frame]).
//!
//! Framing is sans-IO: [Frame::reports] yields the reports to write and
//! [Reassembler] consumes received reports, so the same code serves hosts,
//! simulators and tests regardless of how reports are moved.

use num_enum::TryFromPrimitive;
use strum::Display;

pub mod frame;
pub use frame::{Frame, FrameError, FrameHeader, Reassembler, Reports};

pub mod messages;

pub mod prelude;

/// BitSafe message kinds, shared by host and device firmware
///
/// Requests are issued by the host, responses and interjection requests
/// (`*Request`) by the device, interjection answers (`*Ack` / `*Cancel`)
/// by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, TryFromPrimitive)]
#[repr(u16)]
pub enum MessageKind {
    /// Request a response from the device
    Ping = 0x00,
    /// Create a new wallet
    NewWallet = 0x04,
    /// Create a new address in the loaded wallet
    NewAddress = 0x05,
    /// Fetch the number of addresses in the loaded wallet
    GetNumberOfAddresses = 0x06,
    /// Fetch an address and its public key by handle
    GetAddressAndPublicKey = 0x09,
    /// Sign one input of a transaction
    SignTransaction = 0x0A,
    /// Load (unlock) a wallet
    LoadWallet = 0x0B,
    /// Format the storage area, erasing every wallet
    FormatWalletArea = 0x0D,
    /// Change the encryption key of the loaded wallet
    ChangeEncryptionKey = 0x0E,
    /// Change the name of the loaded wallet
    ChangeWalletName = 0x0F,
    /// List all wallets
    ListWallets = 0x10,
    /// Backup the loaded wallet
    BackupWallet = 0x11,
    /// Restore a wallet from a backup seed
    RestoreWallet = 0x12,
    /// Fetch the device UUID
    GetDeviceUuid = 0x13,
    /// Fetch bytes of entropy
    GetEntropy = 0x14,
    /// Fetch the master public key of the loaded wallet
    GetMasterPublicKey = 0x15,
    /// Delete a wallet
    DeleteWallet = 0x16,
    /// Initialise device session state
    Initialize = 0x17,

    /// Address and public key (response to `NewAddress` / `GetAddressAndPublicKey`)
    Address = 0x30,
    /// Number of addresses (response to `GetNumberOfAddresses`)
    NumberOfAddresses = 0x31,
    /// Public information about all wallets (response to `ListWallets`)
    Wallets = 0x32,
    /// Response to `Ping`
    PingResponse = 0x33,
    /// Successful completion of an operation
    Success = 0x34,
    /// Failure of an operation
    Failure = 0x35,
    /// Device UUID (response to `GetDeviceUuid`)
    DeviceUuid = 0x36,
    /// Entropy bytes (response to `GetEntropy`)
    Entropy = 0x37,
    /// Master public key (response to `GetMasterPublicKey`)
    MasterPublicKey = 0x38,
    /// Signature (response to `SignTransaction`)
    Signature = 0x39,
    /// Version information and feature list (response to `Initialize`)
    Features = 0x3A,

    /// Device is waiting for a button press
    ButtonRequest = 0x50,
    /// Host allows the button press
    ButtonAck = 0x51,
    /// Host refuses the button press
    ButtonCancel = 0x52,
    /// Device requires a wallet password
    PinRequest = 0x53,
    /// Host supplies the password
    PinAck = 0x54,
    /// Host declines to supply a password
    PinCancel = 0x55,
    /// Device requires a one-time password
    OtpRequest = 0x56,
    /// Host supplies the one-time password
    OtpAck = 0x57,
    /// Host declines to supply a one-time password
    OtpCancel = 0x58,
}

/// Binds a protobuf message type to the [MessageKind] used to tag it on the wire
pub trait MessageType: prost::Message + Default {
    const KIND: MessageKind;
}

/// Helper macro for binding message types to their kinds
#[macro_export]
macro_rules! message_kind {
    ($($t:ty => $k:ident),* $(,)?) => {
        $(
            impl $crate::MessageType for $t {
                const KIND: $crate::MessageKind = $crate::MessageKind::$k;
            }
        )*
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_kind_values() {
        assert_eq!(MessageKind::try_from(0x17u16).ok(), Some(MessageKind::Initialize));
        assert_eq!(MessageKind::try_from(0x3au16).ok(), Some(MessageKind::Features));
        assert_eq!(MessageKind::OtpCancel as u16, 0x58);

        // Gaps in the catalogue are not valid kinds
        assert!(MessageKind::try_from(0x01u16).is_err());
        assert!(MessageKind::try_from(0x0Cu16).is_err());
    }

    #[test]
    fn message_kind_binding() {
        assert_eq!(messages::Ping::KIND, MessageKind::Ping);
        assert_eq!(messages::Address::KIND, MessageKind::Address);
        assert_eq!(messages::OtpAck::KIND, MessageKind::OtpAck);
    }
}
