pub mod extractors;

pub use extractors::{BearerCredential, RequesterIdentity};
