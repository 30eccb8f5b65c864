#![allow(dead_code)]

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use bitsafe::{
    bitcoin::{
        absolute::LockTime,
        hashes::{hash160, sha256d, Hash},
        script::Builder,
        secp256k1::{Message, PublicKey, Secp256k1, SecretKey},
        transaction::Version,
        Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
    },
    proto::{prelude::*, MessageType},
    tx::script::p2pkh,
    DeviceHandle, Error, Transport,
};

/// Setup logging from `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Setup a simulated device, returning a handle, a transport probe and the
/// simulator state
pub fn setup(sim: Sim) -> (DeviceHandle<MockTransport>, MockTransport, Arc<Mutex<Sim>>) {
    setup_logging();

    let sim = Arc::new(Mutex::new(sim));

    let s = sim.clone();
    let t = MockTransport::new(move |f| s.lock().unwrap().handle(f));

    (DeviceHandle::from(t.clone()), t, sim)
}

type Handler = Box<dyn FnMut(&Frame) -> Vec<Frame> + Send>;

struct MockInner {
    handler: Handler,
    reassembler: Reassembler,
    outbound: VecDeque<Vec<u8>>,
    sent: Vec<Frame>,
    report_delay: Option<Duration>,
}

/// In-memory transport, frames written by the host are passed to a handler
/// and the handler replies queued for reading
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new(handler: impl FnMut(&Frame) -> Vec<Frame> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                handler: Box::new(handler),
                reassembler: Reassembler::new(),
                outbound: VecDeque::new(),
                sent: vec![],
                report_delay: None,
            })),
        }
    }

    /// Frames received from the host
    pub fn sent(&self) -> Vec<Frame> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Kinds of frames received from the host
    pub fn sent_kinds(&self) -> Vec<Option<MessageKind>> {
        self.sent().iter().map(|f| f.message_kind()).collect()
    }

    pub fn clear_sent(&self) {
        self.inner.lock().unwrap().sent.clear();
    }

    /// Delay each report written by the host, as a slow endpoint would
    pub fn set_report_delay(&self, d: Duration) {
        self.inner.lock().unwrap().report_delay = Some(d);
    }

    /// Queue a frame for reading by the host
    pub fn queue(&self, f: &Frame) {
        self.inner.lock().unwrap().outbound.extend(f.reports());
    }

    /// Queue a raw report for reading by the host
    pub fn queue_report(&self, r: &[u8]) {
        self.inner.lock().unwrap().outbound.push_back(r.to_vec());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_report(&mut self, report: &[u8]) -> Result<(), Error> {
        let delay = self.inner.lock().unwrap().report_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let mut inner = self.inner.lock().unwrap();

        if let Some(f) = inner.reassembler.push(report)? {
            debug!("device received: {:?}", f.message_kind());

            let replies = (inner.handler)(&f);
            inner.sent.push(f);

            for r in replies {
                let reports = r.reports();
                inner.outbound.extend(reports);
            }
        }

        Ok(())
    }

    async fn receive_report(&mut self) -> Result<Vec<u8>, Error> {
        let r = self.inner.lock().unwrap().outbound.pop_front();

        match r {
            // Pad to the full report size as HID drivers do
            Some(mut r) => {
                r.resize(64, 0);
                Ok(r)
            }
            None => std::future::pending().await,
        }
    }
}

/// Encode a reply message
pub fn reply<M: MessageType>(m: M) -> Frame {
    Frame::from_message(&m)
}

/// Encode a failure reply
pub fn failure(code: u32, message: &str) -> Frame {
    reply(Failure {
        error_code: code,
        error_message: message.to_string(),
    })
}

/// Simulated BitSafe device
#[derive(Default)]
pub struct Sim {
    /// Address keys, handle `i + 1` uses `keys[i]`
    pub keys: Vec<SecretKey>,
    /// Number of button requests issued before each confirmed operation
    pub buttons: usize,
    /// Wallet password, `LoadWallet` requests it when set
    pub password: Option<Vec<u8>>,
    /// One-time password, `SignTransaction` requests it when set
    pub otp: Option<String>,
    /// Fail the n-th (zero indexed) signing request
    pub fail_sign_at: Option<usize>,
    /// Fail the next fetch of this address handle
    pub fail_address: Option<u32>,
    /// Signing requests received
    pub signed: Vec<SignTransaction>,
    /// Wallet loaded
    pub loaded: Option<u32>,

    pub pending: Option<Frame>,
    pub buttons_remaining: usize,
}

/// Secret key for the simulated address at `handle`
pub fn address_key(handle: u32) -> SecretKey {
    let mut b = [0x5au8; 32];
    b[..4].copy_from_slice(&handle.to_be_bytes());
    SecretKey::from_slice(&b).unwrap()
}

/// Public key and address hash for a secret key
pub fn address_of(k: &SecretKey) -> (Vec<u8>, [u8; 20]) {
    let secp = Secp256k1::new();
    let pk = PublicKey::from_secret_key(&secp, k).serialize();
    let h = hash160::Hash::hash(&pk);

    (pk.to_vec(), h.to_byte_array())
}

impl Sim {
    /// Create a simulator holding `n` addresses
    pub fn with_addresses(n: u32) -> Self {
        Self {
            keys: (1..=n).map(address_key).collect(),
            ..Default::default()
        }
    }

    /// Address hash for a handle
    pub fn address_hash(&self, handle: u32) -> [u8; 20] {
        address_of(&self.keys[handle as usize - 1]).1
    }

    fn key(&self, handle: u32) -> Option<&SecretKey> {
        handle
            .checked_sub(1)
            .and_then(|i| self.keys.get(i as usize))
    }

    fn address(&self, handle: u32) -> Frame {
        match self.key(handle) {
            Some(k) => {
                let (public_key, address) = address_of(k);
                reply(Address {
                    address_handle: handle,
                    public_key,
                    address: address.to_vec(),
                })
            }
            None => failure(4, "invalid address handle"),
        }
    }

    /// Handle a frame from the host
    pub fn handle(&mut self, f: &Frame) -> Vec<Frame> {
        match f.message_kind() {
            Some(MessageKind::ButtonAck) if self.buttons_remaining > 0 => {
                self.buttons_remaining -= 1;
                if self.buttons_remaining > 0 {
                    return vec![reply(ButtonRequest {})];
                }
                match self.pending.take() {
                    Some(p) => self.confirmed(&p),
                    None => vec![failure(1, "no pending request")],
                }
            }
            Some(MessageKind::ButtonCancel) => {
                self.pending = None;
                vec![failure(9, "action cancelled by user")]
            }
            Some(MessageKind::PinAck) => {
                let ack: PinAck = f.decode().unwrap();
                match self.pending.take() {
                    Some(p) if Some(&ack.password) == self.password.as_ref() => {
                        self.confirmed(&p)
                    }
                    _ => vec![failure(6, "invalid password")],
                }
            }
            Some(MessageKind::PinCancel) => {
                self.pending = None;
                vec![failure(9, "password cancelled by user")]
            }
            Some(MessageKind::OtpAck) => {
                let ack: OtpAck = f.decode().unwrap();
                match self.pending.take() {
                    Some(p) if Some(&ack.otp) == self.otp.as_ref() => self.confirm(&p, true),
                    _ => vec![failure(7, "invalid one-time password")],
                }
            }
            Some(MessageKind::OtpCancel) => {
                self.pending = None;
                vec![failure(9, "one-time password cancelled by user")]
            }
            Some(MessageKind::Ping) => {
                let p: Ping = f.decode().unwrap();
                vec![reply(PingResponse {
                    echoed_greeting: p.greeting,
                    echoed_session_id: None,
                })]
            }
            Some(MessageKind::Initialize) => vec![reply(Features {
                vendor: Some("BitSafe".to_string()),
                major_version: Some(0),
                minor_version: Some(1),
                otp: Some(self.otp.is_some()),
                pin: Some(true),
                ..Default::default()
            })],
            Some(MessageKind::LoadWallet) if self.password.is_some() => {
                self.pending = Some(f.clone());
                vec![reply(PinRequest {})]
            }
            Some(MessageKind::LoadWallet) => self.confirmed(f),
            Some(MessageKind::ListWallets) => vec![reply(Wallets {
                wallet_info: vec![WalletInfo {
                    wallet_number: 0,
                    wallet_name: b"main".to_vec(),
                    wallet_uuid: vec![0xaa; 16],
                    version: Some(2),
                }],
            })],
            Some(MessageKind::GetDeviceUuid) => vec![reply(DeviceUuid {
                device_uuid: vec![0x0d; 16],
            })],
            Some(MessageKind::GetNumberOfAddresses) => vec![reply(NumberOfAddresses {
                number_of_addresses: self.keys.len() as u32,
            })],
            Some(MessageKind::GetAddressAndPublicKey) => {
                let r: GetAddressAndPublicKey = f.decode().unwrap();
                if self.fail_address == Some(r.address_handle) {
                    self.fail_address = None;
                    return vec![failure(5, "address read failed")];
                }
                vec![self.address(r.address_handle)]
            }
            Some(MessageKind::NewAddress) | Some(MessageKind::SignTransaction) => {
                self.confirm(f, false)
            }
            _ => vec![failure(1, "unsupported request")],
        }
    }

    /// Start confirmation for a request, issuing an OTP request for signing
    /// then button requests as configured
    fn confirm(&mut self, f: &Frame, otp_ok: bool) -> Vec<Frame> {
        if f.message_kind() == Some(MessageKind::SignTransaction) && self.otp.is_some() && !otp_ok
        {
            self.pending = Some(f.clone());
            return vec![reply(OtpRequest {})];
        }

        if self.buttons > 0 {
            self.pending = Some(f.clone());
            self.buttons_remaining = self.buttons;
            return vec![reply(ButtonRequest {})];
        }

        self.confirmed(f)
    }

    /// Execute a confirmed request
    fn confirmed(&mut self, f: &Frame) -> Vec<Frame> {
        match f.message_kind() {
            Some(MessageKind::LoadWallet) => {
                let r: LoadWallet = f.decode().unwrap();
                self.loaded = r.wallet_number;
                vec![reply(Success {})]
            }
            Some(MessageKind::NewAddress) => {
                let handle = self.keys.len() as u32 + 1;
                self.keys.push(address_key(handle));
                vec![self.address(handle)]
            }
            Some(MessageKind::SignTransaction) => {
                let r: SignTransaction = f.decode().unwrap();
                let n = self.signed.len();
                self.signed.push(r.clone());

                if self.fail_sign_at == Some(n) {
                    return vec![failure(8, "signing failed")];
                }

                let k = match self.key(r.address_handle) {
                    Some(k) => *k,
                    None => return vec![failure(4, "invalid address handle")],
                };

                let secp = Secp256k1::new();
                let digest = sha256d::Hash::hash(&r.transaction_data);
                let sig = secp.sign_ecdsa(&Message::from_digest(digest.to_byte_array()), &k);

                let mut signature_data = sig.serialize_der().to_vec();
                signature_data.push(0x01);

                vec![reply(Signature { signature_data })]
            }
            _ => vec![failure(1, "unsupported request")],
        }
    }
}

/// Build a transaction paying `value` to the provided key hash at output 1
pub fn funding(n: u8, hash: &[u8; 20]) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: Builder::new().push_int(n as i64 + 1).into_script(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(10_000),
                script_pubkey: ScriptBuf::new(),
            },
            TxOut {
                value: Amount::from_sat(100_000),
                script_pubkey: p2pkh(hash),
            },
        ],
    }
}

/// Build a transaction spending output 1 of each previous transaction
pub fn spend(previous: &[Transaction]) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: previous
            .iter()
            .map(|p| TxIn {
                previous_output: OutPoint::new(p.txid(), 1),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
            .collect(),
        output: vec![TxOut {
            value: Amount::from_sat(100_000 * previous.len() as u64 - 1_000),
            script_pubkey: p2pkh(&[0xee; 20]),
        }],
    }
}
