// Copyright (c) 2026 The BitSafe Developers

//! BitSafe protocol buffer messages
//!
//! Field numbers follow the device firmware `messages.proto`, message kinds
//! are bound in the table at the end of this module.

use crate::message_kind;

/// Request: reset session state and fetch device features
#[derive(Clone, PartialEq, prost::Message)]
pub struct Initialize {
    /// Session identifier, echoed by [PingResponse]
    #[prost(bytes = "vec", required, tag = "1")]
    pub session_id: Vec<u8>,
}

/// Response: device version information and capabilities
#[derive(Clone, PartialEq, prost::Message)]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub minor_version: Option<u32>,
    /// Firmware build configuration string
    #[prost(string, optional, tag = "4")]
    pub config: Option<String>,
    /// One-time passwords are enabled
    #[prost(bool, optional, tag = "5")]
    pub otp: Option<bool>,
    /// Wallet passwords are supported
    #[prost(bool, optional, tag = "6")]
    pub pin: Option<bool>,
    /// Device verifies supporting transactions
    #[prost(bool, optional, tag = "7")]
    pub spv: Option<bool>,
    /// Supported signing algorithms
    #[prost(uint32, repeated, packed = "false", tag = "8")]
    pub algo: Vec<u32>,
    #[prost(bool, optional, tag = "9")]
    pub debug_link: Option<bool>,
}

/// Request: ask the device to respond
#[derive(Clone, PartialEq, prost::Message)]
pub struct Ping {
    #[prost(string, optional, tag = "1")]
    pub greeting: Option<String>,
}

/// Response: echo of [Ping]
#[derive(Clone, PartialEq, prost::Message)]
pub struct PingResponse {
    #[prost(string, optional, tag = "1")]
    pub echoed_greeting: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub echoed_session_id: Option<Vec<u8>>,
}

/// Request: create a new wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct NewWallet {
    #[prost(uint32, optional, tag = "1")]
    pub wallet_number: Option<u32>,
    /// Encryption password, the wallet is unencrypted if absent
    #[prost(bytes = "vec", optional, tag = "2")]
    pub password: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub wallet_name: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "4")]
    pub is_hidden: Option<bool>,
}

/// Request: load (unlock) a wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct LoadWallet {
    #[prost(uint32, optional, tag = "1")]
    pub wallet_number: Option<u32>,
}

/// Request: delete a wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteWallet {
    #[prost(uint32, optional, tag = "1")]
    pub wallet_handle: Option<u32>,
}

/// Request: format the wallet storage area
#[derive(Clone, PartialEq, prost::Message)]
pub struct FormatWalletArea {
    /// Host entropy mixed into the device entropy pool
    #[prost(bytes = "vec", required, tag = "1")]
    pub initial_entropy_pool: Vec<u8>,
}

/// Request: change the encryption key of the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChangeEncryptionKey {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub password: Option<Vec<u8>>,
}

/// Request: rename the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChangeWalletName {
    #[prost(bytes = "vec", required, tag = "1")]
    pub wallet_name: Vec<u8>,
}

/// Request: list all wallets
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListWallets {}

/// Public information about one wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct WalletInfo {
    #[prost(uint32, required, tag = "1")]
    pub wallet_number: u32,
    #[prost(bytes = "vec", required, tag = "2")]
    pub wallet_name: Vec<u8>,
    #[prost(bytes = "vec", required, tag = "3")]
    pub wallet_uuid: Vec<u8>,
    #[prost(uint32, optional, tag = "4")]
    pub version: Option<u32>,
}

/// Response: all wallets on the device
#[derive(Clone, PartialEq, prost::Message)]
pub struct Wallets {
    #[prost(message, repeated, tag = "1")]
    pub wallet_info: Vec<WalletInfo>,
}

/// Request: backup the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct BackupWallet {
    #[prost(bool, optional, tag = "1")]
    pub is_encrypted: Option<bool>,
    /// Output device for the backup seed
    #[prost(uint32, optional, tag = "2")]
    pub device: Option<u32>,
}

/// Request: restore a wallet from a seed
#[derive(Clone, PartialEq, prost::Message)]
pub struct RestoreWallet {
    #[prost(message, required, tag = "1")]
    pub new_wallet: NewWallet,
    #[prost(bytes = "vec", required, tag = "2")]
    pub seed: Vec<u8>,
}

/// Request: fetch the device UUID
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetDeviceUuid {}

/// Response: device UUID
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceUuid {
    #[prost(bytes = "vec", required, tag = "1")]
    pub device_uuid: Vec<u8>,
}

/// Request: fetch entropy from the device
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetEntropy {
    #[prost(uint32, required, tag = "1")]
    pub number_of_bytes: u32,
}

/// Response: entropy bytes
#[derive(Clone, PartialEq, prost::Message)]
pub struct Entropy {
    #[prost(bytes = "vec", required, tag = "1")]
    pub entropy: Vec<u8>,
}

/// Request: fetch the master public key of the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetMasterPublicKey {}

/// Response: master public key and chain code
#[derive(Clone, PartialEq, prost::Message)]
pub struct MasterPublicKey {
    #[prost(bytes = "vec", required, tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub chain_code: Vec<u8>,
}

/// Request: create a new address in the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct NewAddress {}

/// Request: fetch the number of addresses in the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetNumberOfAddresses {}

/// Response: number of addresses in the loaded wallet
#[derive(Clone, PartialEq, prost::Message)]
pub struct NumberOfAddresses {
    #[prost(uint32, required, tag = "1")]
    pub number_of_addresses: u32,
}

/// Request: fetch an address and its public key
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAddressAndPublicKey {
    #[prost(uint32, required, tag = "1")]
    pub address_handle: u32,
}

/// Response: address, with its handle and public key
#[derive(Clone, PartialEq, prost::Message)]
pub struct Address {
    #[prost(uint32, required, tag = "1")]
    pub address_handle: u32,
    #[prost(bytes = "vec", required, tag = "2")]
    pub public_key: Vec<u8>,
    /// 20-byte HASH160 of the public key
    #[prost(bytes = "vec", required, tag = "3")]
    pub address: Vec<u8>,
}

/// Request: sign one transaction input
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignTransaction {
    #[prost(uint32, required, tag = "1")]
    pub address_handle: u32,
    /// Signable stream for the input
    #[prost(bytes = "vec", required, tag = "2")]
    pub transaction_data: Vec<u8>,
}

/// Response: bitcoin encoded signature (DER + hash type)
#[derive(Clone, PartialEq, prost::Message)]
pub struct Signature {
    #[prost(bytes = "vec", required, tag = "1")]
    pub signature_data: Vec<u8>,
}

/// Response: operation completed
#[derive(Clone, PartialEq, prost::Message)]
pub struct Success {}

/// Response: operation failed
#[derive(Clone, PartialEq, prost::Message)]
pub struct Failure {
    #[prost(uint32, required, tag = "1")]
    pub error_code: u32,
    #[prost(string, required, tag = "2")]
    pub error_message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonAck {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonCancel {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PinRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PinAck {
    #[prost(bytes = "vec", required, tag = "1")]
    pub password: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PinCancel {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OtpRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OtpAck {
    #[prost(string, required, tag = "1")]
    pub otp: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OtpCancel {}

message_kind!(
    Initialize => Initialize,
    Features => Features,
    Ping => Ping,
    PingResponse => PingResponse,
    NewWallet => NewWallet,
    LoadWallet => LoadWallet,
    DeleteWallet => DeleteWallet,
    FormatWalletArea => FormatWalletArea,
    ChangeEncryptionKey => ChangeEncryptionKey,
    ChangeWalletName => ChangeWalletName,
    ListWallets => ListWallets,
    Wallets => Wallets,
    BackupWallet => BackupWallet,
    RestoreWallet => RestoreWallet,
    GetDeviceUuid => GetDeviceUuid,
    DeviceUuid => DeviceUuid,
    GetEntropy => GetEntropy,
    Entropy => Entropy,
    GetMasterPublicKey => GetMasterPublicKey,
    MasterPublicKey => MasterPublicKey,
    NewAddress => NewAddress,
    GetNumberOfAddresses => GetNumberOfAddresses,
    NumberOfAddresses => NumberOfAddresses,
    GetAddressAndPublicKey => GetAddressAndPublicKey,
    Address => Address,
    SignTransaction => SignTransaction,
    Signature => Signature,
    Success => Success,
    Failure => Failure,
    ButtonRequest => ButtonRequest,
    ButtonAck => ButtonAck,
    ButtonCancel => ButtonCancel,
    PinRequest => PinRequest,
    PinAck => PinAck,
    PinCancel => PinCancel,
    OtpRequest => OtpRequest,
    OtpAck => OtpAck,
    OtpCancel => OtpCancel,
);
