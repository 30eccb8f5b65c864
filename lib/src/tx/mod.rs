// Copyright (c) 2026 The BitSafe Developers

//! Transaction signing support
//!
//! The device signs one input at a time. For each input it is sent a
//! signable stream containing every transaction spent by the inputs,
//! so it can check output values and build the signature hash itself.
//!
//! ## Signable stream:
//! ```text
//! for each input:
//!   0x01 | spent output index (u32 LE) | previous transaction
//! 0x00
//! transaction (input scripts blanked, signed input holds the spent script)
//! hash type (u32 LE)
//! ```

use bitcoin::{
    consensus::encode::serialize, secp256k1::ecdsa, OutPoint, ScriptBuf, Transaction, TxOut,
};

use crate::Error;

pub mod script;
use script::{p2pkh_hash, spend_p2pkh, without_code_separators};

/// Hash type appended to every signature
pub const SIGHASH_ALL: u32 = 1;

/// Transaction to be signed, with the previous transactions spent by
/// each of its inputs
#[derive(Clone, Debug, PartialEq)]
pub struct UnsignedTransaction {
    tx: Transaction,
    previous: Vec<Transaction>,
}

impl UnsignedTransaction {
    /// Create an unsigned transaction, `previous[i]` must be the transaction
    /// spent by input `i`
    pub fn new(tx: Transaction, previous: Vec<Transaction>) -> Result<Self, Error> {
        if tx.input.is_empty() {
            return Err(Error::InvalidTransaction("no inputs"));
        }

        if previous.len() != tx.input.len() {
            return Err(Error::InvalidTransaction(
                "previous transaction count does not match inputs",
            ));
        }

        for (i, p) in tx.input.iter().zip(previous.iter()) {
            check_outpoint(&i.previous_output, p)?;
        }

        Ok(Self { tx, previous })
    }

    /// Fetch the transaction being signed
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Fetch the transaction spent by input `index`
    pub fn previous(&self, index: usize) -> Option<&Transaction> {
        self.previous.get(index)
    }

    /// Number of inputs to be signed
    pub fn input_count(&self) -> usize {
        self.tx.input.len()
    }

    /// Fetch the output spent by input `index`
    pub fn spent_output(&self, index: usize) -> Result<&TxOut, Error> {
        let input = self
            .tx
            .input
            .get(index)
            .ok_or(Error::InvalidTransaction("input index out of range"))?;

        // Linkage is checked on construction
        self.previous[index]
            .output
            .get(input.previous_output.vout as usize)
            .ok_or(Error::InvalidTransaction("spent output out of range"))
    }

    /// Key hash controlling input `index`
    pub fn key_hash(&self, index: usize) -> Result<[u8; 20], Error> {
        let o = self.spent_output(index)?;

        p2pkh_hash(&o.script_pubkey)
            .ok_or(Error::InvalidTransaction("spent output is not pay-to-pubkey-hash"))
    }

    /// Build the signable stream for input `index`
    pub fn signable_stream(&self, index: usize) -> Result<Vec<u8>, Error> {
        let spent = self.spent_output(index)?;

        let mut buff = Vec::new();

        for (input, prev) in self.tx.input.iter().zip(self.previous.iter()) {
            buff.push(0x01);
            buff.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            buff.extend_from_slice(&serialize(prev));
        }
        buff.push(0x00);

        // Blank input scripts on a copy, the signed input carries the spent script
        let mut tx = self.tx.clone();
        for (i, input) in tx.input.iter_mut().enumerate() {
            input.script_sig = match i == index {
                true => without_code_separators(&spent.script_pubkey)?,
                false => ScriptBuf::new(),
            };
        }
        buff.extend_from_slice(&serialize(&tx));

        buff.extend_from_slice(&SIGHASH_ALL.to_le_bytes());

        Ok(buff)
    }

    /// Apply signatures and public keys to each input, returning the signed
    /// transaction
    ///
    /// `signatures[i]` holds the signature and public key for input `i`.
    pub fn apply_signatures(
        &self,
        signatures: &[(Vec<u8>, Vec<u8>)],
    ) -> Result<Transaction, Error> {
        if signatures.len() != self.tx.input.len() {
            return Err(Error::InvalidTransaction(
                "signature count does not match inputs",
            ));
        }

        let mut tx = self.tx.clone();
        for (input, (sig, public_key)) in tx.input.iter_mut().zip(signatures.iter()) {
            check_signature(sig)?;
            input.script_sig = spend_p2pkh(sig, public_key)?;
        }

        Ok(tx)
    }
}

/// Helper to check a previous transaction matches the outpoint spending it
pub(crate) fn check_outpoint(outpoint: &OutPoint, previous: &Transaction) -> Result<(), Error> {
    if previous.txid() != outpoint.txid {
        return Err(Error::InvalidTransaction(
            "previous transaction does not match outpoint",
        ));
    }

    if outpoint.vout as usize >= previous.output.len() {
        return Err(Error::InvalidTransaction("spent output out of range"));
    }

    Ok(())
}

/// Check a signature is bitcoin encoded, a strict DER signature followed
/// by the `SIGHASH_ALL` hash type
pub fn check_signature(sig: &[u8]) -> Result<(), Error> {
    let (hash_type, der) = match sig.split_last() {
        Some(v) => v,
        None => return Err(Error::InvalidSignature),
    };

    if *hash_type as u32 != SIGHASH_ALL {
        return Err(Error::InvalidSignature);
    }

    ecdsa::Signature::from_der(der).map_err(|_| Error::InvalidSignature)?;

    Ok(())
}
