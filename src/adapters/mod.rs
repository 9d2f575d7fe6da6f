// Adapters layer: concrete implementations of the domain ports (cache storage, TRA signing).

pub mod signer;
pub mod storage;

pub use signer::OpensslSigner;
pub use storage::LocalStorage;
