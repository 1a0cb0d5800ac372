//! Loading of external files: raw bytes, shader text and glTF assets.

use std::path::Path;

pub mod library;

pub use library::ModelLibrary;

pub async fn load_string(path: impl AsRef<Path>) -> std::io::Result<String> {
    let path = path.as_ref();
    log::debug!("reading {}", path.display());
    tokio::fs::read_to_string(path).await
}

pub async fn load_binary(path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
    let path = path.as_ref();
    log::debug!("reading {}", path.display());
    tokio::fs::read(path).await
}
