// Copyright (c) 2026 The BitSafe Developers

//! Frame codec, moving [Frame]s over a report [Transport]

use std::time::Duration;

use log::{trace, warn};

use bitsafe_proto::{Frame, Reassembler};

use crate::{transport::Transport, Error};

/// Frame codec over a report transport
///
/// The codec is marked dirty while a frame is in flight and stays dirty if
/// the operation fails or is cancelled, so callers can [resync](Self::resync)
/// before starting the next exchange.
pub struct FrameCodec<T: Transport> {
    t: T,
    reassembler: Reassembler,
    dirty: bool,
}

impl<T: Transport> FrameCodec<T> {
    /// Create a new codec with no payload limit
    pub fn new(t: T) -> Self {
        Self {
            t,
            reassembler: Reassembler::new(),
            dirty: false,
        }
    }

    /// Create a new codec rejecting received payloads over `max` bytes
    pub fn with_max_payload(t: T, max: usize) -> Self {
        Self {
            t,
            reassembler: Reassembler::with_max_payload(max),
            dirty: false,
        }
    }

    /// Reject received payloads over `max` bytes
    pub fn set_max_payload(&mut self, max: usize) {
        self.reassembler.set_max_payload(max);
    }

    /// Check whether a previous send / receive did not complete
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn transport(&self) -> &T {
        &self.t
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.t
    }

    pub fn into_inner(self) -> T {
        self.t
    }

    /// Send a frame as a sequence of reports
    ///
    /// A failure part way through leaves the device with a partial frame,
    /// the codec remains dirty.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), Error> {
        self.dirty = true;

        for report in frame.reports() {
            trace!("send report: {:02x?}", report);
            self.t.send_report(&report).await?;
        }

        self.dirty = false;

        Ok(())
    }

    /// Send a frame, bounding each report write by `timeout`
    ///
    /// Large frames take as long as they need provided the transport
    /// keeps accepting reports.
    pub async fn send_timeout(&mut self, frame: &Frame, timeout: Duration) -> Result<(), Error> {
        self.dirty = true;

        for report in frame.reports() {
            trace!("send report: {:02x?}", report);
            match tokio::time::timeout(timeout, self.t.send_report(&report)).await {
                Ok(r) => r?,
                Err(_) => return Err(Error::RequestTimeout),
            }
        }

        self.dirty = false;

        Ok(())
    }

    /// Receive reports until a complete frame has been reassembled
    pub async fn receive(&mut self) -> Result<Frame, Error> {
        self.dirty = true;

        loop {
            let report = self.t.receive_report().await?;
            trace!("receive report: {:02x?}", report);

            if let Some(f) = self.reassembler.push(&report)? {
                self.dirty = false;
                return Ok(f);
            }
        }
    }

    /// Discard partial frames and any reports received until the transport
    /// has been quiet for `quiet`, returning the number of discarded reports
    pub async fn resync(&mut self, quiet: Duration) -> Result<usize, Error> {
        if !self.reassembler.is_idle() {
            warn!("discarding partially received frame");
        }
        self.reassembler.reset();

        let mut n = 0;
        while let Ok(r) = tokio::time::timeout(quiet, self.t.receive_report()).await {
            trace!("discard report: {:02x?}", r?);
            n += 1;
        }

        self.dirty = false;

        Ok(n)
    }
}
