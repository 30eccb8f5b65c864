// Copyright (c) 2026 The BitSafe Developers

//! [WalletHandle] for address and signing operations on a loaded wallet

use std::path::Path;

use bitcoin::Transaction;
use log::{debug, warn};

use crate::{
    cache::{Address, AddressCache},
    tx::UnsignedTransaction,
    DeviceHandle, Error, Transport,
};

/// Handle to a loaded wallet, holding the wallet address cache
///
/// See [DeviceHandle::load_wallet] to create a [WalletHandle]
pub struct WalletHandle<T: Transport> {
    device: DeviceHandle<T>,
    wallet_number: u32,
    cache: AddressCache,
}

/// Pending request to sign one transaction input
#[derive(Clone, Debug, PartialEq)]
pub struct SignRequest {
    /// Input index
    pub index: usize,
    /// Handle of the address controlling the input
    pub address_handle: u32,
    /// Signable stream for the input
    pub data: Vec<u8>,
}

impl<T: Transport> WalletHandle<T> {
    pub(crate) fn new(device: DeviceHandle<T>, wallet_number: u32) -> Self {
        Self {
            device,
            wallet_number,
            cache: AddressCache::new(),
        }
    }

    /// Replace the address cache, for example with one loaded from disk
    pub fn with_cache(mut self, cache: AddressCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn wallet_number(&self) -> u32 {
        self.wallet_number
    }

    pub fn device(&self) -> &DeviceHandle<T> {
        &self.device
    }

    /// Fetch the address cache
    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    pub fn into_cache(self) -> AddressCache {
        self.cache
    }

    /// Load the address cache from a file, missing files give an empty cache
    pub fn load_cache(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.cache = AddressCache::load_or_default(path)?;
        Ok(())
    }

    /// Write the address cache to a file
    pub fn save_cache(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.cache.save(path)
    }

    /// Fetch addresses missing from the cache, returning the number added
    ///
    /// Addresses fetched before a failure remain cached. A device holding
    /// fewer addresses than the cache fails with [Error::StaleCache],
    /// leaving the cache untouched.
    pub async fn synchronize(&mut self) -> Result<usize, Error> {
        let count = self.device.address_count().await?;

        if (count as usize) < self.cache.len() {
            warn!(
                "Device holds {} addresses, cache holds {}",
                count,
                self.cache.len()
            );
            return Err(Error::StaleCache {
                count,
                cached: self.cache.len(),
            });
        }
        self.cache.set_device_count(count);

        let start = self.cache.next_handle();
        if start > count {
            debug!("Address cache up to date ({} addresses)", self.cache.len());
            return Ok(0);
        }

        debug!("Fetching addresses {}..={}", start, count);

        for handle in start..=count {
            let a = self.device.address(handle).await?;
            self.cache.push(a)?;
        }

        Ok((count - start + 1) as usize)
    }

    /// Generate a new address and add it to the cache
    pub async fn new_address(&mut self) -> Result<Address, Error> {
        let a = self.device.new_address().await?;

        let expected = self.cache.next_handle();
        if a.handle == expected {
            self.cache.push(a.clone())?;
            return Ok(a);
        }

        // Cache is stale, catch up then check the new address landed in place
        warn!(
            "New address handle {} out of sequence (expected {}), synchronising",
            a.handle, expected
        );

        self.synchronize().await?;

        match self.cache.get(a.handle) {
            Some(c) if c == &a => Ok(a),
            _ => Err(Error::InvalidHandle {
                actual: a.handle,
                expected,
            }),
        }
    }

    /// Build sign requests for each transaction input
    ///
    /// Fails with [Error::UnknownAddress] if an input is controlled by an
    /// address missing from the cache, [synchronize](Self::synchronize)
    /// before retrying.
    pub fn sign_requests(&self, unsigned: &UnsignedTransaction) -> Result<Vec<SignRequest>, Error> {
        let mut requests = Vec::with_capacity(unsigned.input_count());

        for index in 0..unsigned.input_count() {
            let hash = unsigned.key_hash(index)?;

            let address = self
                .cache
                .find_by_address(&hash)
                .ok_or_else(|| Error::UnknownAddress(hex::encode(hash)))?;

            requests.push(SignRequest {
                index,
                address_handle: address.handle,
                data: unsigned.signable_stream(index)?,
            });
        }

        Ok(requests)
    }

    /// Sign every input of a transaction, returning the signed transaction
    ///
    /// Any failure aborts signing, `unsigned` is never modified.
    pub async fn sign(&self, unsigned: &UnsignedTransaction) -> Result<Transaction, Error> {
        let requests = self.sign_requests(unsigned)?;

        let mut signatures = Vec::with_capacity(requests.len());

        for r in requests {
            debug!(
                "Signing input {} with address {}",
                r.index, r.address_handle
            );

            let sig = self.device.sign_input(r.address_handle, r.data).await?;

            // Lookup succeeded while building requests
            let public_key = self
                .cache
                .get(r.address_handle)
                .map(|a| a.public_key.clone())
                .ok_or(Error::InvalidHandle {
                    actual: r.address_handle,
                    expected: self.cache.len() as u32,
                })?;

            signatures.push((sig, public_key));
        }

        unsigned.apply_signatures(&signatures)
    }
}
