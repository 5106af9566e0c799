//! Nullable chain state and bootstrapper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use spos_consensus::{Bootstrapper, ChainHandler};
use spos_types::{BlockHeader, RandomSeed};

use crate::locked;

/// Chain with a settable tip and genesis.
pub struct NullChain {
    current: Mutex<Option<BlockHeader>>,
    genesis: Mutex<Option<BlockHeader>>,
}

impl NullChain {
    /// A freshly started chain: no tip yet, genesis seeded with `seed`.
    pub fn with_genesis_seed(seed: &[u8]) -> Self {
        let genesis = BlockHeader {
            rand_seed: RandomSeed::new(seed.to_vec()),
            ..BlockHeader::default()
        };
        Self {
            current: Mutex::new(None),
            genesis: Mutex::new(Some(genesis)),
        }
    }

    /// A chain without any header.
    pub fn empty() -> Self {
        Self {
            current: Mutex::new(None),
            genesis: Mutex::new(None),
        }
    }

    pub fn set_current(&self, header: BlockHeader) {
        *locked(&self.current) = Some(header);
    }
}

impl ChainHandler for NullChain {
    fn current_block_header(&self) -> Option<BlockHeader> {
        locked(&self.current).clone()
    }

    fn genesis_header(&self) -> Option<BlockHeader> {
        locked(&self.genesis).clone()
    }
}

/// Bootstrapper whose sync state is set by the test.
#[derive(Default)]
pub struct NullBootstrapper {
    syncing: AtomicBool,
}

impl NullBootstrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_syncing(&self, syncing: bool) {
        self.syncing.store(syncing, Ordering::SeqCst);
    }
}

impl Bootstrapper for NullBootstrapper {
    fn should_sync(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }
}
