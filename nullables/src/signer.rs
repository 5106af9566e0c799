//! Nullable multi-signer — records re-keying and fakes shares.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use spos_consensus::MultiSigner;
use spos_types::PublicKey;

use crate::locked;

/// Produces deterministic fake signatures and remembers what it was asked to do.
#[derive(Default)]
pub struct NullMultiSigner {
    resets: AtomicUsize,
    fail_reset: AtomicBool,
    last_group: Mutex<Vec<PublicKey>>,
    last_self_index: Mutex<Option<u16>>,
    stored: Mutex<Vec<u16>>,
}

impl NullMultiSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `reset` fail.
    pub fn fail_resets(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn last_group(&self) -> Vec<PublicKey> {
        locked(&self.last_group).clone()
    }

    pub fn last_self_index(&self) -> Option<u16> {
        *locked(&self.last_self_index)
    }

    pub fn stored_shares(&self) -> Vec<u16> {
        locked(&self.stored).clone()
    }
}

impl MultiSigner for NullMultiSigner {
    fn reset(&self, public_keys: &[PublicKey], self_index: Option<u16>) -> Result<(), String> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err("null multi-signer: reset refused".to_string());
        }
        *locked(&self.last_group) = public_keys.to_vec();
        *locked(&self.last_self_index) = self_index;
        locked(&self.stored).clear();
        Ok(())
    }

    fn create_signature_share(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        let index = self.last_self_index().unwrap_or(u16::MAX);
        let mut share = index.to_be_bytes().to_vec();
        share.extend(message.iter().take(8));
        Ok(share)
    }

    fn store_signature_share(&self, index: u16, share: &[u8]) -> Result<(), String> {
        if share.is_empty() {
            return Err("null multi-signer: empty share".to_string());
        }
        locked(&self.stored).push(index);
        Ok(())
    }

    fn aggregate(&self, signers: &[u16]) -> Result<Vec<u8>, String> {
        if signers.is_empty() {
            return Err("null multi-signer: nothing to aggregate".to_string());
        }
        Ok(signers.iter().flat_map(|index| index.to_be_bytes()).collect())
    }
}
