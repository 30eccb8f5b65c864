// Copyright (c) 2026 The BitSafe Developers

//! BitSafe Hardware Wallet API Library (and CLI)
//!
//! Messages are exchanged with the device as framed protobuf payloads,
//! see [bitsafe_proto] for the wire format. [DeviceHandle] issues requests
//! and answers device interjections, [WalletHandle] maintains the address
//! cache for a loaded wallet and drives transaction signing.

/// Re-export transports for consumer use
pub mod transport;
pub use transport::Transport;

/// Re-export `bitsafe-proto` for consumers
pub use bitsafe_proto::{self as proto};

/// Re-export `bitcoin` for transaction construction
pub use bitcoin;

mod codec;
pub use codec::FrameCodec;

mod handle;
pub use handle::{DeviceHandle, WalletOptions, DEFAULT_MAX_PAYLOAD};

mod error;
pub use error::Error;

pub mod interaction;
pub use interaction::{AutoApprove, Interaction, Interjection, StaticSecrets};

pub mod cache;
pub use cache::{wallet_cache_path, Address, AddressCache};

mod wallet;
pub use wallet::{SignRequest, WalletHandle};

pub mod tx;
pub use tx::UnsignedTransaction;

#[cfg(feature = "transport_hid")]
pub use provider::{BitSafeInfo, BitSafeProvider};

#[cfg(feature = "transport_hid")]
mod provider {
    use hidapi::HidApi;

    use crate::{transport::HidTransport, DeviceHandle, Error};

    /// BitSafe provider manages device discovery and connections
    pub struct BitSafeProvider {
        hid_api: HidApi,
    }

    /// BitSafe device information for listing, used by connect
    #[derive(Clone, Debug)]
    pub struct BitSafeInfo(pub hidapi::DeviceInfo);

    impl BitSafeProvider {
        /// Create a new provider
        /// NOTE: only one provider may exist at a time (global HID context on macos)
        pub fn new() -> Result<Self, Error> {
            let hid_api = HidApi::new().map_err(|_| Error::HidInit)?;
            Ok(Self { hid_api })
        }

        /// List available BitSafe devices
        pub fn list_devices(&self) -> Vec<BitSafeInfo> {
            let devices: Vec<_> = HidTransport::list(&self.hid_api)
                .cloned()
                .map(BitSafeInfo)
                .collect();

            log::debug!("Found {} devices: {:?}", devices.len(), devices);

            devices
        }

        /// Connect to the specified device
        pub fn connect(&self, info: &BitSafeInfo) -> Result<DeviceHandle<HidTransport>, Error> {
            let t = HidTransport::open(&self.hid_api, &info.0)?;

            Ok(DeviceHandle::from(t))
        }

        /// Connect to the first available device
        pub fn connect_first(&self) -> Result<DeviceHandle<HidTransport>, Error> {
            match self.list_devices().first() {
                Some(i) => self.connect(i),
                None => Err(Error::NoDevice),
            }
        }
    }

    impl std::fmt::Display for BitSafeInfo {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "{:16} (USB, {:04x}:{:04x}, {})",
                self.0.product_string().unwrap_or("UNKNOWN"),
                self.0.vendor_id(),
                self.0.product_id(),
                self.0.serial_number().unwrap_or("UNKNOWN"),
            )
        }
    }
}
