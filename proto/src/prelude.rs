// Copyright (c) 2026 The BitSafe Developers

//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    frame::{Frame, FrameError, Reassembler, MAX_REPORT_CONTENT, REPORT_LEN},
    messages::{
        Address, BackupWallet, ButtonAck, ButtonCancel, ButtonRequest, ChangeEncryptionKey,
        ChangeWalletName, DeleteWallet, DeviceUuid, Entropy, Failure, Features, FormatWalletArea,
        GetAddressAndPublicKey, GetDeviceUuid, GetEntropy, GetMasterPublicKey,
        GetNumberOfAddresses, Initialize, ListWallets, LoadWallet, MasterPublicKey, NewAddress,
        NewWallet, NumberOfAddresses, OtpAck, OtpCancel, OtpRequest, PinAck, PinCancel,
        PinRequest, Ping, PingResponse, RestoreWallet, SignTransaction, Signature, Success,
        WalletInfo, Wallets,
    },
    MessageKind, MessageType,
};
