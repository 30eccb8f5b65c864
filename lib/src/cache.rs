// Copyright (c) 2026 The BitSafe Developers

//! Address cache
//!
//! Addresses are issued by the device with sequential handles starting
//! from 1, the cache holds them in handle order alongside the device
//! reported address count.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Address record issued by the device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Device assigned handle
    pub handle: u32,
    /// Public key for the address
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
    /// HASH160 of the public key
    #[serde(with = "hex")]
    pub address: Vec<u8>,
}

impl From<bitsafe_proto::messages::Address> for Address {
    fn from(a: bitsafe_proto::messages::Address) -> Self {
        Self {
            handle: a.address_handle,
            public_key: a.public_key,
            address: a.address,
        }
    }
}

/// Ordered cache of device addresses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCache {
    /// Address count last reported by the device
    device_count: u32,
    /// Addresses in handle order
    addresses: Vec<Address>,
}

impl AddressCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached addresses
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Address count last reported by the device
    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    /// Update the device reported address count
    pub(crate) fn set_device_count(&mut self, n: u32) {
        self.device_count = n;
    }

    /// Handle expected for the next appended address
    pub fn next_handle(&self) -> u32 {
        self.addresses.len() as u32 + 1
    }

    /// Fetch an address by handle
    pub fn get(&self, handle: u32) -> Option<&Address> {
        match handle {
            0 => None,
            _ => self.addresses.get(handle as usize - 1),
        }
    }

    /// Find the address record matching the provided address bytes
    pub fn find_by_address(&self, address: &[u8]) -> Option<&Address> {
        self.addresses.iter().find(|a| a.address == address)
    }

    /// Iterate over cached addresses in handle order
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    /// Append an address, handles must be sequential
    pub fn push(&mut self, address: Address) -> Result<(), Error> {
        let expected = self.next_handle();
        if address.handle != expected {
            return Err(Error::InvalidHandle {
                actual: address.handle,
                expected,
            });
        }

        self.addresses.push(address);
        if self.device_count < expected {
            self.device_count = expected;
        }

        Ok(())
    }

    /// Load a cache from the provided file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("Loading address cache from {}", path.display());

        let s = fs::read_to_string(path)?;
        let c: AddressCache = serde_json::from_str(&s)?;

        // Rebuild via push to check handle sequencing
        let mut cache = AddressCache::new();
        for a in c.addresses {
            cache.push(a)?;
        }
        cache.device_count = cache.device_count.max(c.device_count);

        Ok(cache)
    }

    /// Load a cache from the provided file, returning an empty cache if
    /// the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        match Self::load(path) {
            Ok(c) => Ok(c),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Write the cache to the provided file
    ///
    /// The cache is written to a temporary file alongside `path` then
    /// renamed into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        debug!(
            "Saving {} addresses to {}",
            self.addresses.len(),
            path.display()
        );

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let s = serde_json::to_string_pretty(self)?;

        let mut f = fs::File::create(&tmp)?;
        f.write_all(s.as_bytes())?;
        f.sync_all()?;
        drop(f);

        fs::rename(&tmp, path)?;

        Ok(())
    }
}

/// Path for the address cache of a wallet, `<prefix>.addresses<wallet_number>`
pub fn wallet_cache_path(dir: impl AsRef<Path>, prefix: &str, wallet_number: u32) -> PathBuf {
    dir.as_ref()
        .join(format!("{prefix}.addresses{wallet_number}"))
}

#[cfg(test)]
mod test {
    use super::*;

    fn address(handle: u32) -> Address {
        Address {
            handle,
            public_key: vec![0x02; 33],
            address: vec![handle as u8; 20],
        }
    }

    #[test]
    fn push_sequential() {
        let mut c = AddressCache::new();

        c.push(address(1)).unwrap();
        c.push(address(2)).unwrap();

        assert_eq!(c.len(), 2);
        assert_eq!(c.device_count(), 2);
        assert_eq!(c.get(2), Some(&address(2)));
        assert_eq!(c.get(0), None);
        assert_eq!(c.get(3), None);
    }

    #[test]
    fn push_out_of_order() {
        let mut c = AddressCache::new();
        c.push(address(1)).unwrap();

        assert!(matches!(
            c.push(address(3)),
            Err(Error::InvalidHandle {
                actual: 3,
                expected: 2
            })
        ));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn find_by_address() {
        let mut c = AddressCache::new();
        for i in 1..=4 {
            c.push(address(i)).unwrap();
        }

        assert_eq!(c.find_by_address(&[3u8; 20]).map(|a| a.handle), Some(3));
        assert_eq!(c.find_by_address(&[9u8; 20]), None);
    }

    #[test]
    fn save_load() {
        let d = tempfile::tempdir().unwrap();
        let p = wallet_cache_path(d.path(), "bitsafe", 2);
        assert!(p.ends_with("bitsafe.addresses2"));

        let mut c = AddressCache::new();
        c.set_device_count(5);
        for i in 1..=3 {
            c.push(address(i)).unwrap();
        }

        c.save(&p).unwrap();
        let l = AddressCache::load(&p).unwrap();
        assert_eq!(l, c);
        assert_eq!(l.device_count(), 5);

        // Saving again replaces the file
        c.push(address(4)).unwrap();
        c.save(&p).unwrap();
        assert_eq!(AddressCache::load(&p).unwrap().len(), 4);
    }

    #[test]
    fn load_missing() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("missing");

        assert!(matches!(AddressCache::load(&p), Err(Error::Io(_))));
        assert_eq!(AddressCache::load_or_default(&p).unwrap().len(), 0);
    }

    #[test]
    fn load_rejects_gaps() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("cache");

        let s = serde_json::json!({
            "device_count": 2,
            "addresses": [
                { "handle": 2, "public_key": "02", "address": "00" },
            ]
        });
        fs::write(&p, s.to_string()).unwrap();

        assert!(matches!(
            AddressCache::load(&p),
            Err(Error::InvalidHandle { .. })
        ));
    }
}
