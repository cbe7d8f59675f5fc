pub mod genesis;
pub mod params;

pub use params::Params;

use std::sync::Arc;

/// Node-level configuration wrapping the network consensus [`Params`]
#[derive(Clone, Debug)]
pub struct Config {
    /// Consensus parameters of the active network
    pub params: Params,

    /// Skip the proof-of-work check. Used by simulation and test block builders only
    pub skip_proof_of_work: bool,
}

impl Config {
    pub fn new(params: Params) -> Self {
        Self { params, skip_proof_of_work: false }
    }

    pub fn to_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl AsRef<Params> for Config {
    fn as_ref(&self) -> &Params {
        &self.params
    }
}

impl std::ops::Deref for Config {
    type Target = Params;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}
