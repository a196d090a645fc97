mod server;

pub use server::{BlobConfig, ServerConfig};
