// Copyright (c) 2026 The BitSafe Developers

//! Script helpers for pay-to-pubkey-hash spends

use bitcoin::{
    opcodes::all::{OP_CHECKSIG, OP_CODESEPARATOR, OP_DUP, OP_EQUALVERIFY, OP_HASH160},
    script::{Builder, Instruction, PushBytesBuf},
    Script, ScriptBuf,
};

use crate::Error;

/// Build a pay-to-pubkey-hash output script for the provided key hash
pub fn p2pkh(hash: &[u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// Extract the key hash from a pay-to-pubkey-hash output script
pub fn p2pkh_hash(script: &Script) -> Option<[u8; 20]> {
    if !script.is_p2pkh() {
        return None;
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script.as_bytes()[3..23]);
    Some(hash)
}

/// Build the input script spending a pay-to-pubkey-hash output
pub fn spend_p2pkh(signature: &[u8], public_key: &[u8]) -> Result<ScriptBuf, Error> {
    let sig = PushBytesBuf::try_from(signature.to_vec()).map_err(|_| Error::InvalidSignature)?;
    let key = PushBytesBuf::try_from(public_key.to_vec())
        .map_err(|_| Error::InvalidTransaction("public key too long"))?;

    Ok(Builder::new().push_slice(sig).push_slice(key).into_script())
}

/// Copy a script with every `OP_CODESEPARATOR` removed
pub fn without_code_separators(script: &Script) -> Result<ScriptBuf, Error> {
    let mut b = Builder::new();

    for i in script.instructions() {
        b = match i.map_err(|_| Error::InvalidTransaction("malformed script"))? {
            Instruction::Op(op) if op == OP_CODESEPARATOR => b,
            Instruction::Op(op) => b.push_opcode(op),
            Instruction::PushBytes(p) => b.push_slice(p),
        };
    }

    Ok(b.into_script())
}
