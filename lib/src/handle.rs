// Copyright (c) 2026 The BitSafe Developers

//! Handle for connected BitSafe devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Transport]

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::sync::{Mutex, MutexGuard};
use zeroize::{Zeroize, Zeroizing};

use bitsafe_proto::{prelude::*, MessageType};

use crate::{
    cache::Address,
    codec::FrameCodec,
    interaction::{AutoApprove, Interaction, Interjection},
    transport::Transport,
    wallet::WalletHandle,
    Error,
};

/// Default payload limit for received frames
pub const DEFAULT_MAX_PAYLOAD: usize = 1 << 20;

/// Quiet period used to drain stale reports after an interrupted exchange
const RESYNC_QUIET: Duration = Duration::from_millis(100);

/// BitSafe handle for a connected device.
///
/// Each request holds the device lock until its terminal reply is received,
/// so clones of a handle never interleave exchanges.
pub struct DeviceHandle<T: Transport> {
    /// Frame codec for communication
    codec: Arc<Mutex<FrameCodec<T>>>,
    /// Hooks for button / PIN / OTP interjections
    interaction: Arc<dyn Interaction>,
    /// Timeout for device replies and for each report write
    request_timeout: Duration,
    /// Timeout for replies that wait on the user
    user_timeout: Duration,
}

impl<T: Transport> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            interaction: self.interaction.clone(),
            request_timeout: self.request_timeout,
            user_timeout: self.user_timeout,
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Transport]
impl<T: Transport> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            codec: Arc::new(Mutex::new(FrameCodec::with_max_payload(
                t,
                DEFAULT_MAX_PAYLOAD,
            ))),
            interaction: Arc::new(AutoApprove),
            request_timeout: Duration::from_secs(2),
            user_timeout: Duration::from_secs(60),
        }
    }
}

/// Options for creating or restoring a wallet
#[derive(Clone, Default)]
pub struct WalletOptions {
    /// Wallet slot on the device
    pub number: u32,
    /// Human readable wallet name
    pub name: Option<String>,
    /// Encryption password, the wallet is stored unencrypted if `None`
    pub password: Option<Zeroizing<Vec<u8>>>,
    /// Hide the wallet from listings
    pub hidden: bool,
}

impl WalletOptions {
    fn to_message(&self) -> NewWallet {
        NewWallet {
            wallet_number: Some(self.number),
            password: self.password.as_ref().map(|p| p.to_vec()),
            wallet_name: self.name.as_ref().map(|n| n.as_bytes().to_vec()),
            is_hidden: Some(self.hidden),
        }
    }
}

impl<T: Transport> DeviceHandle<T> {
    /// Create a new device handle with the provided interaction hooks
    pub fn new(t: T, interaction: impl Interaction + 'static) -> Self {
        Self::from(t).with_interaction(interaction)
    }

    /// Replace interaction hooks
    pub fn with_interaction(mut self, interaction: impl Interaction + 'static) -> Self {
        self.interaction = Arc::new(interaction);
        self
    }

    /// Set timeout for device replies, also bounding each report write
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set timeout for replies following a user interaction
    pub fn with_user_timeout(mut self, timeout: Duration) -> Self {
        self.user_timeout = timeout;
        self
    }

    /// Set the payload limit for received frames
    ///
    /// Applies only while the handle is not shared with clones.
    pub fn with_max_payload(mut self, max: usize) -> Self {
        match Arc::get_mut(&mut self.codec) {
            Some(c) => c.get_mut().set_max_payload(max),
            None => warn!("handle is shared, payload limit not applied"),
        }
        self
    }

    /// Lock the underlying codec for direct access
    pub async fn lock(&self) -> MutexGuard<'_, FrameCodec<T>> {
        self.codec.lock().await
    }

    /// Issue a request and await its terminal reply
    ///
    /// Button, PIN and OTP interjections are answered through the configured
    /// [Interaction] while waiting. `Failure` replies are returned as
    /// [Error::Device], reply kinds other than `RESP` or an interjection as
    /// [Error::UnexpectedResponse].
    pub async fn request<REQ: MessageType, RESP: MessageType>(
        &self,
        req: &REQ,
    ) -> Result<RESP, Error> {
        let mut codec = self.codec.lock().await;

        // Drop leftovers from an interrupted exchange
        if codec.is_dirty() {
            let n = codec.resync(RESYNC_QUIET).await?;
            warn!("resynchronised device channel ({} stale reports)", n);
        }

        debug!("Issuing {} request", REQ::KIND);

        self.send(&mut codec, &Frame::from_message(req)).await?;

        let mut user_wait = false;

        loop {
            let (timeout, timeout_err) = match user_wait {
                true => (self.user_timeout, Error::UserTimeout),
                false => (self.request_timeout, Error::RequestTimeout),
            };

            let frame = match tokio::time::timeout(timeout, codec.receive()).await {
                Ok(r) => r?,
                Err(_) => return Err(timeout_err),
            };

            let kind = match frame.message_kind() {
                Some(k) => k,
                None => {
                    return Err(Error::UnexpectedResponse {
                        kind: frame.kind,
                        request: REQ::KIND,
                    })
                }
            };

            if kind == RESP::KIND {
                debug!("Received {} response", kind);
                return Ok(frame.decode::<RESP>()?);
            }

            if kind == MessageKind::Failure {
                let f = frame.decode::<Failure>()?;
                debug!(
                    "{} request failed: {} ({})",
                    REQ::KIND,
                    f.error_message,
                    f.error_code
                );
                return Err(f.into());
            }

            let i = match Interjection::from_kind(kind) {
                Some(i) => i,
                None => {
                    return Err(Error::UnexpectedResponse {
                        kind: frame.kind,
                        request: REQ::KIND,
                    })
                }
            };

            debug!("{} request interjection: {:?}", REQ::KIND, i);

            let mut answer = match i {
                Interjection::Button => match self.interaction.button(REQ::KIND).await {
                    true => Frame::from_message(&ButtonAck {}),
                    false => Frame::from_message(&ButtonCancel {}),
                },
                Interjection::Pin => match self.interaction.pin(REQ::KIND).await {
                    Some(p) => {
                        let mut m = PinAck {
                            password: p.to_vec(),
                        };
                        let f = Frame::from_message(&m);
                        m.password.zeroize();
                        f
                    }
                    None => Frame::from_message(&PinCancel {}),
                },
                Interjection::Otp => match self.interaction.otp(REQ::KIND).await {
                    Some(o) => {
                        let mut m = OtpAck { otp: o.to_string() };
                        let f = Frame::from_message(&m);
                        m.otp.zeroize();
                        f
                    }
                    None => Frame::from_message(&OtpCancel {}),
                },
            };

            let r = self.send(&mut codec, &answer).await;
            answer.payload.zeroize();
            r?;

            // The device now waits on the user before replying
            user_wait = true;
        }
    }

    /// Send a frame with the request timeout applied to each report
    async fn send(&self, codec: &mut FrameCodec<T>, frame: &Frame) -> Result<(), Error> {
        codec.send_timeout(frame, self.request_timeout).await
    }

    /// Initialise the device session, returning device features
    pub async fn initialize(&self, session_id: &[u8]) -> Result<Features, Error> {
        let req = Initialize {
            session_id: session_id.to_vec(),
        };

        self.request::<_, Features>(&req).await
    }

    /// Initialise the device session with a random session ID
    pub async fn initialize_random(&self) -> Result<Features, Error> {
        let session_id: [u8; 16] = rand::random();
        self.initialize(&session_id).await
    }

    /// Ping the device
    pub async fn ping(&self, greeting: &str) -> Result<PingResponse, Error> {
        let req = Ping {
            greeting: Some(greeting.to_string()),
        };

        self.request::<_, PingResponse>(&req).await
    }

    /// List wallets stored on the device
    pub async fn list_wallets(&self) -> Result<Vec<WalletInfo>, Error> {
        let resp = self.request::<_, Wallets>(&ListWallets {}).await?;
        Ok(resp.wallet_info)
    }

    /// Create a new wallet, returning a handle to the loaded wallet
    pub async fn new_wallet(&self, opts: &WalletOptions) -> Result<WalletHandle<T>, Error> {
        debug!("Creating wallet {}", opts.number);

        let mut req = opts.to_message();
        let r = self.request::<_, Success>(&req).await;
        req.password.zeroize();
        r?;

        Ok(WalletHandle::new(self.clone(), opts.number))
    }

    /// Load (unlock) a wallet, returning a handle to the loaded wallet
    ///
    /// Encrypted wallets answer with a `PinRequest`, handled via [Interaction::pin]
    pub async fn load_wallet(&self, wallet_number: u32) -> Result<WalletHandle<T>, Error> {
        debug!("Loading wallet {}", wallet_number);

        let req = LoadWallet {
            wallet_number: Some(wallet_number),
        };
        self.request::<_, Success>(&req).await?;

        Ok(WalletHandle::new(self.clone(), wallet_number))
    }

    /// Delete a wallet
    pub async fn delete_wallet(&self, wallet_number: u32) -> Result<(), Error> {
        debug!("Deleting wallet {}", wallet_number);

        let req = DeleteWallet {
            wallet_handle: Some(wallet_number),
        };
        self.request::<_, Success>(&req).await?;

        Ok(())
    }

    /// Format the wallet storage area, erasing all wallets
    pub async fn format(&self, entropy: &[u8]) -> Result<(), Error> {
        let req = FormatWalletArea {
            initial_entropy_pool: entropy.to_vec(),
        };
        self.request::<_, Success>(&req).await?;

        Ok(())
    }

    /// Change the encryption password of the loaded wallet
    pub async fn change_wallet_key(&self, password: Option<&[u8]>) -> Result<(), Error> {
        let mut req = ChangeEncryptionKey {
            password: password.map(|p| p.to_vec()),
        };
        let r = self.request::<_, Success>(&req).await;
        req.password.zeroize();
        r?;

        Ok(())
    }

    /// Rename the loaded wallet
    pub async fn change_wallet_name(&self, name: &str) -> Result<(), Error> {
        let req = ChangeWalletName {
            wallet_name: name.as_bytes().to_vec(),
        };
        self.request::<_, Success>(&req).await?;

        Ok(())
    }

    /// Backup the loaded wallet to the provided output device
    pub async fn backup_wallet(&self, encrypted: bool, device: u32) -> Result<(), Error> {
        let req = BackupWallet {
            is_encrypted: Some(encrypted),
            device: Some(device),
        };
        self.request::<_, Success>(&req).await?;

        Ok(())
    }

    /// Restore a wallet from a backup seed, returning a handle to the loaded wallet
    pub async fn restore_wallet(
        &self,
        opts: &WalletOptions,
        seed: &[u8],
    ) -> Result<WalletHandle<T>, Error> {
        debug!("Restoring wallet {}", opts.number);

        let mut req = RestoreWallet {
            new_wallet: opts.to_message(),
            seed: seed.to_vec(),
        };
        let r = self.request::<_, Success>(&req).await;
        req.seed.zeroize();
        req.new_wallet.password.zeroize();
        r?;

        Ok(WalletHandle::new(self.clone(), opts.number))
    }

    /// Fetch the device UUID
    pub async fn device_uuid(&self) -> Result<Vec<u8>, Error> {
        let resp = self.request::<_, DeviceUuid>(&GetDeviceUuid {}).await?;
        Ok(resp.device_uuid)
    }

    /// Fetch `n` bytes of entropy from the device
    pub async fn entropy(&self, n: u32) -> Result<Vec<u8>, Error> {
        let req = GetEntropy { number_of_bytes: n };
        let resp = self.request::<_, Entropy>(&req).await?;
        Ok(resp.entropy)
    }

    /// Fetch the master public key of the loaded wallet
    pub async fn master_public_key(&self) -> Result<MasterPublicKey, Error> {
        self.request::<_, MasterPublicKey>(&GetMasterPublicKey {})
            .await
    }

    /// Fetch the number of addresses in the loaded wallet
    pub async fn address_count(&self) -> Result<u32, Error> {
        let resp = self
            .request::<_, NumberOfAddresses>(&GetNumberOfAddresses {})
            .await?;
        Ok(resp.number_of_addresses)
    }

    /// Fetch an address of the loaded wallet by handle
    pub async fn address(&self, address_handle: u32) -> Result<Address, Error> {
        let req = GetAddressAndPublicKey { address_handle };
        let resp = self.request::<_, bitsafe_proto::messages::Address>(&req).await?;

        if resp.address_handle != address_handle {
            return Err(Error::InvalidHandle {
                actual: resp.address_handle,
                expected: address_handle,
            });
        }

        Ok(resp.into())
    }

    /// Generate a new address in the loaded wallet
    pub async fn new_address(&self) -> Result<Address, Error> {
        let resp = self
            .request::<_, bitsafe_proto::messages::Address>(&NewAddress {})
            .await?;
        Ok(resp.into())
    }

    /// Sign one transaction input using the key for `address_handle`
    ///
    /// `transaction_data` is the signable stream for the input,
    /// see [UnsignedTransaction::signable_stream](crate::tx::UnsignedTransaction::signable_stream).
    pub async fn sign_input(
        &self,
        address_handle: u32,
        transaction_data: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        let req = SignTransaction {
            address_handle,
            transaction_data,
        };
        let resp = self.request::<_, Signature>(&req).await?;
        Ok(resp.signature_data)
    }
}
