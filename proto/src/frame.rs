// Copyright (c) 2026 The BitSafe Developers

//! Message framing and HID report segmentation
//!
//! Each message is sent as a [Frame]: a fixed 8-byte [FrameHeader]
//! followed by the encoded protobuf payload.
//!
//! ## Frame encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    MAGIC '#'  |    MAGIC '#'  |       MESSAGE_KIND (BE)       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      PAYLOAD_LENGTH (BE)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                          PAYLOAD...                           /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Frames are then cut into reports of at most [MAX_REPORT_CONTENT] bytes,
//! each prefixed by a single byte holding the content length. Report
//! boundaries carry no meaning beyond chunking.

use byteorder::{BigEndian, ByteOrder};

use crate::{MessageKind, MessageType};

/// Frame magic marker
pub const MAGIC: [u8; 2] = *b"##";

/// Encoded [FrameHeader] length
pub const HEADER_LEN: usize = 8;

/// Maximum content bytes per report
pub const MAX_REPORT_CONTENT: usize = 63;

/// Maximum report size including the length prefix
pub const REPORT_LEN: usize = MAX_REPORT_CONTENT + 1;

/// Framing errors, these indicate the host and device are out of step
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("empty report")]
    EmptyReport,

    #[error("invalid report length: {0}")]
    InvalidReportLength(u8),

    #[error("truncated report (declared {declared} bytes, received {received})")]
    TruncatedReport { declared: usize, received: usize },

    #[error("short frame header ({0} bytes)")]
    ShortHeader(usize),

    #[error("frame magic not found (received {0:02x?})")]
    InvalidMagic([u8; 2]),

    #[error("frame payload of {len} bytes exceeds limit of {max} bytes")]
    TooLarge { len: usize, max: usize },
}

/// Frame header, preceding every payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw message kind, see [MessageKind]
    pub kind: u16,
    /// Payload length in bytes
    pub len: u32,
}

impl FrameHeader {
    /// Encode the header
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buff = [0u8; HEADER_LEN];
        buff[..2].copy_from_slice(&MAGIC);
        BigEndian::write_u16(&mut buff[2..4], self.kind);
        BigEndian::write_u32(&mut buff[4..8], self.len);
        buff
    }

    /// Parse a header from the first [HEADER_LEN] bytes of `buff`
    pub fn parse(buff: &[u8]) -> Result<Self, FrameError> {
        if buff.len() < HEADER_LEN {
            return Err(FrameError::ShortHeader(buff.len()));
        }

        let magic = [buff[0], buff[1]];
        if magic != MAGIC {
            return Err(FrameError::InvalidMagic(magic));
        }

        Ok(Self {
            kind: BigEndian::read_u16(&buff[2..4]),
            len: BigEndian::read_u32(&buff[4..8]),
        })
    }
}

/// A tagged message, the unit exchanged between host and device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Raw message kind, kept as received so unknown kinds can be reported
    pub kind: u16,
    /// Encoded message
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame from a raw kind and payload
    pub fn new(kind: u16, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    /// Encode a typed message into a frame
    pub fn from_message<M: MessageType>(m: &M) -> Self {
        Self {
            kind: M::KIND as u16,
            payload: m.encode_to_vec(),
        }
    }

    /// Resolve the frame [MessageKind], `None` for kinds outside the catalogue
    pub fn message_kind(&self) -> Option<MessageKind> {
        MessageKind::try_from(self.kind).ok()
    }

    /// Decode the payload as `M`
    ///
    /// This does not check the frame kind, callers dispatch on
    /// [Frame::message_kind] first.
    pub fn decode<M: MessageType>(&self) -> Result<M, prost::DecodeError> {
        M::decode(&self.payload[..])
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            kind: self.kind,
            len: self.payload.len() as u32,
        }
    }

    /// Encoded frame length (header and payload)
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Encode header and payload into a contiguous buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buff = vec![0u8; self.encoded_len()];
        buff[..HEADER_LEN].copy_from_slice(&self.header().encode());
        buff[HEADER_LEN..].copy_from_slice(&self.payload);
        buff
    }

    /// Split the encoded frame into length-prefixed reports
    pub fn reports(&self) -> Reports {
        Reports {
            buff: self.to_bytes(),
            index: 0,
        }
    }
}

/// Iterator over the reports carrying one [Frame], see [Frame::reports]
pub struct Reports {
    buff: Vec<u8>,
    index: usize,
}

impl Iterator for Reports {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.buff.len() - self.index;
        if remaining == 0 {
            return None;
        }

        let n = remaining.min(MAX_REPORT_CONTENT);

        let mut report = Vec::with_capacity(n + 1);
        report.push(n as u8);
        report.extend_from_slice(&self.buff[self.index..][..n]);

        self.index += n;

        Some(report)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.buff.len() - self.index).div_ceil(MAX_REPORT_CONTENT);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Reports {}

/// Reassembles frames from received reports
///
/// Reports are pushed one at a time; a complete [Frame] is returned once
/// the header and declared payload length have been accumulated. Any error
/// resets the reassembler so the next report is treated as a frame start.
#[derive(Clone, Debug, Default)]
pub struct Reassembler {
    buff: Vec<u8>,
    header: Option<FrameHeader>,
    max_payload: Option<usize>,
}

impl Reassembler {
    /// Create a reassembler with no payload limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reassembler rejecting payloads longer than `max` bytes
    pub fn with_max_payload(max: usize) -> Self {
        Self {
            max_payload: Some(max),
            ..Default::default()
        }
    }

    /// Update the payload limit, applied from the next frame header
    pub fn set_max_payload(&mut self, max: usize) {
        self.max_payload = Some(max);
    }

    /// Check whether a frame is partially received
    pub fn is_idle(&self) -> bool {
        self.buff.is_empty()
    }

    /// Discard any partially received frame
    pub fn reset(&mut self) {
        self.buff.clear();
        self.header = None;
    }

    /// Push a received report, returning a frame once complete
    pub fn push(&mut self, report: &[u8]) -> Result<Option<Frame>, FrameError> {
        let r = self.push_inner(report);
        if r.is_err() {
            self.reset();
        }
        r
    }

    fn push_inner(&mut self, report: &[u8]) -> Result<Option<Frame>, FrameError> {
        let (n, content) = match report.split_first() {
            Some((n, c)) => (*n, c),
            None => return Err(FrameError::EmptyReport),
        };

        if n == 0 || n as usize > MAX_REPORT_CONTENT {
            return Err(FrameError::InvalidReportLength(n));
        }

        // Drivers may pad reports to the full endpoint size, only the
        // declared content is used
        let n = n as usize;
        if content.len() < n {
            return Err(FrameError::TruncatedReport {
                declared: n,
                received: content.len(),
            });
        }
        self.buff.extend_from_slice(&content[..n]);

        // Parse header once enough bytes are available
        let header = match self.header {
            Some(h) => h,
            None if self.buff.len() >= HEADER_LEN => {
                let h = FrameHeader::parse(&self.buff[..HEADER_LEN])?;

                if let Some(max) = self.max_payload {
                    if h.len as usize > max {
                        return Err(FrameError::TooLarge {
                            len: h.len as usize,
                            max,
                        });
                    }
                }

                self.header = Some(h);
                h
            }
            None => return Ok(None),
        };

        let total = HEADER_LEN + header.len as usize;
        if self.buff.len() < total {
            return Ok(None);
        }

        // Bytes past the end of the frame are padding
        let mut buff = core::mem::take(&mut self.buff);
        buff.truncate(total);
        self.header = None;

        Ok(Some(Frame {
            kind: header.kind,
            payload: buff.split_off(HEADER_LEN),
        }))
    }
}

#[cfg(test)]
mod test {
    use rand::{random, Rng};

    use super::*;
    use crate::messages::{Failure, Ping};

    fn reassemble(reports: impl Iterator<Item = Vec<u8>>) -> Result<Option<Frame>, FrameError> {
        let mut r = Reassembler::new();
        let mut out = None;

        for report in reports {
            if let Some(f) = r.push(&report)? {
                out = Some(f);
            }
        }

        Ok(out)
    }

    #[test]
    fn header_encoding() {
        let f = Frame::new(0x0A, vec![0xde, 0xad]);

        assert_eq!(
            f.to_bytes(),
            vec![b'#', b'#', 0x00, 0x0A, 0x00, 0x00, 0x00, 0x02, 0xde, 0xad]
        );
    }

    #[test]
    fn short_header() {
        let b = Frame::new(0x0A, vec![]).to_bytes();
        assert_eq!(
            FrameHeader::parse(&b[..5]),
            Err(FrameError::ShortHeader(5))
        );
        assert_eq!(FrameHeader::parse(&[]), Err(FrameError::ShortHeader(0)));

        let h = FrameHeader::parse(&b).unwrap();
        assert_eq!(h, FrameHeader { kind: 0x0A, len: 0 });
        assert_eq!(h.encode(), b[..]);
    }

    #[test]
    fn frame_round_trip() {
        let mut rng = rand::thread_rng();

        for len in [0, 1, 54, 55, 56, 118, 119, 1000, 10_000] {
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let f = Frame::new(random(), payload);

            let d = reassemble(f.reports()).unwrap();
            assert_eq!(d.as_ref(), Some(&f), "round trip failed for {len} bytes");
        }
    }

    #[test]
    fn report_chunking() {
        for len in [0usize, 55, 56, 200, 10_000] {
            let f = Frame::new(MessageKind::SignTransaction as u16, vec![0x5a; len]);

            let reports: Vec<_> = f.reports().collect();

            let total = len + HEADER_LEN;
            let expected = total.div_ceil(MAX_REPORT_CONTENT);
            assert_eq!(reports.len(), expected);
            assert_eq!(f.reports().len(), expected);

            for r in &reports {
                assert!(r.len() <= REPORT_LEN);
                assert_eq!(r[0] as usize, r.len() - 1);
            }

            let last = reports.last().unwrap();
            let remainder = total - (expected - 1) * MAX_REPORT_CONTENT;
            assert_eq!(last[0] as usize, remainder);
        }
    }

    #[test]
    fn typed_round_trip() {
        let p = Ping {
            greeting: Some("hello".to_string()),
        };
        let f = Frame::from_message(&p);

        assert_eq!(f.message_kind(), Some(MessageKind::Ping));
        assert_eq!(f.decode::<Ping>().unwrap(), p);
    }

    #[test]
    fn padded_reports() {
        let f = Frame::from_message(&Failure {
            error_code: 7,
            error_message: "nope".to_string(),
        });

        // Pad every report to the full HID report size
        let padded = f.reports().map(|mut r| {
            r.resize(REPORT_LEN, 0xff);
            r
        });

        assert_eq!(reassemble(padded).unwrap(), Some(f));
    }

    #[test]
    fn split_header() {
        // Header split across single-byte reports
        let f = Frame::new(0x33, b"pong".to_vec());
        let reports = f.to_bytes().into_iter().map(|b| vec![1, b]);

        assert_eq!(reassemble(reports).unwrap(), Some(f));
    }

    #[test]
    fn zero_length_report() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(&[0x00]), Err(FrameError::InvalidReportLength(0)));
        assert_eq!(r.push(&[]), Err(FrameError::EmptyReport));
    }

    #[test]
    fn oversized_report() {
        let mut r = Reassembler::new();
        let mut report = vec![64u8];
        report.extend_from_slice(&[0u8; 64]);

        assert_eq!(r.push(&report), Err(FrameError::InvalidReportLength(64)));
    }

    #[test]
    fn truncated_report() {
        let mut r = Reassembler::new();
        assert_eq!(
            r.push(&[10, b'#', b'#']),
            Err(FrameError::TruncatedReport {
                declared: 10,
                received: 2
            })
        );
    }

    #[test]
    fn invalid_magic() {
        let mut r = Reassembler::new();
        let report = [8, b'#', b'!', 0, 0, 0, 0, 0, 0];

        assert_eq!(r.push(&report), Err(FrameError::InvalidMagic([b'#', b'!'])));
        assert!(r.is_idle());
    }

    #[test]
    fn payload_limit() {
        let mut r = Reassembler::with_max_payload(100);
        let f = Frame::new(0x39, vec![0u8; 101]);

        let first = f.reports().next().unwrap();
        assert_eq!(
            r.push(&first),
            Err(FrameError::TooLarge { len: 101, max: 100 })
        );
    }

    #[test]
    fn consecutive_frames() {
        let a = Frame::new(0x50, vec![]);
        let b = Frame::new(0x39, vec![1u8; 70]);

        let mut r = Reassembler::new();

        let mut out = vec![];
        for report in a.reports().chain(b.reports()) {
            if let Some(f) = r.push(&report).unwrap() {
                out.push(f);
            }
        }

        assert_eq!(out, vec![a, b]);
        assert!(r.is_idle());
    }
}
