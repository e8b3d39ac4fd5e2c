pub mod xxhash;

pub use xxhash::content_fingerprint;
