// Copyright (c) 2026 The BitSafe Developers

//! Report transport abstraction and USB HID implementation

use async_trait::async_trait;

#[cfg(feature = "transport_hid")]
pub use hid::HidTransport;

use crate::Error;

/// Report-level transport to a BitSafe device
///
/// Reports are at most [REPORT_LEN](bitsafe_proto::frame::REPORT_LEN) bytes,
/// the first byte holding the content length. Both operations may block
/// indefinitely, callers bound them with timeouts.
#[async_trait]
pub trait Transport: Send {
    /// Write a single report
    async fn send_report(&mut self, report: &[u8]) -> Result<(), Error>;

    /// Read a single report
    async fn receive_report(&mut self) -> Result<Vec<u8>, Error>;
}

/// Forward [Transport] through boxed implementations
#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), Error> {
        (**self).send_report(report).await
    }

    async fn receive_report(&mut self) -> Result<Vec<u8>, Error> {
        (**self).receive_report().await
    }
}

#[cfg(feature = "transport_hid")]
mod hid {
    use hidapi::{DeviceInfo, HidApi, HidDevice};
    use log::trace;

    use bitsafe_proto::frame::REPORT_LEN;

    use super::*;

    /// USB HID transport for BitSafe devices
    ///
    /// BitSafe uses numbered HID reports where the report ID is the content
    /// length, so reports are written and read without an additional ID byte.
    pub struct HidTransport {
        device: HidDevice,
        poll_ms: i32,
    }

    impl HidTransport {
        /// USB vendor ID of BitSafe devices
        pub const VENDOR_ID: u16 = 0x04f3;

        /// USB product ID of BitSafe devices
        pub const PRODUCT_ID: u16 = 0x0210;

        /// List available BitSafe devices
        pub fn list(api: &HidApi) -> impl Iterator<Item = &DeviceInfo> {
            api.device_list().filter(|d| {
                d.vendor_id() == Self::VENDOR_ID && d.product_id() == Self::PRODUCT_ID
            })
        }

        /// Open the provided device
        pub fn open(api: &HidApi, info: &DeviceInfo) -> Result<Self, Error> {
            let device = info.open_device(api)?;

            Ok(Self { device, poll_ms: 10 })
        }
    }

    #[async_trait]
    impl Transport for HidTransport {
        async fn send_report(&mut self, report: &[u8]) -> Result<(), Error> {
            trace!("HID write: {:02x?}", report);

            self.device.write(report)?;

            Ok(())
        }

        async fn receive_report(&mut self) -> Result<Vec<u8>, Error> {
            let mut buff = [0u8; REPORT_LEN];

            // Poll with a short timeout so the task remains cancellable
            loop {
                let n = self.device.read_timeout(&mut buff, self.poll_ms)?;
                if n > 0 {
                    trace!("HID read: {:02x?}", &buff[..n]);
                    return Ok(buff[..n].to_vec());
                }

                tokio::task::yield_now().await;
            }
        }
    }
}
