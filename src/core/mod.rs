pub mod codec;
pub mod report;
pub mod soap;
pub mod wsaa;
pub mod wslpg;

pub use crate::domain::ports::{Storage, TraSigner};
pub use crate::utils::error::Result;
