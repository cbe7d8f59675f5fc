pub mod acceptance_data;
pub mod block_locations;
pub mod ghostdag;
pub mod headers;
pub mod pruning;
pub mod reachability;
pub mod relations;
pub mod statuses;
pub mod tips;
pub mod utxo_diffs;
pub mod utxo_multisets;
pub mod utxo_set;
pub mod virtual_state;

pub use kaspad_database::prelude::{DbKey, StoreError, StoreResult, StoreResultExtensions, DB};
