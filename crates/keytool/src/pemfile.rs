//! PEM files on disk: no terminator in the file, one in memory.

use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Read a PEM file and append the null terminator the key manager expects.
pub fn load(path: &Path) -> Result<Vec<u8>> {
    let mut data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if data.contains(&0) {
        bail!("{} contains a null byte", path.display());
    }
    data.push(0);
    Ok(data)
}

/// Drop the trailing null terminator of exported PEM.
pub fn strip_terminator(pem: &[u8]) -> &[u8] {
    match pem.split_last() {
        Some((0, text)) => text,
        _ => pem,
    }
}

/// Write exported PEM without its terminator. Private keys get mode 0600.
pub fn save(path: &Path, pem: &[u8], private: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(strip_terminator(pem))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Signature file contents: hex text if it decodes as such, raw bytes otherwise.
pub fn load_signature(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if let Ok(text) = std::str::from_utf8(&data) {
        if let Ok(bytes) = hex::decode(text.trim()) {
            return Ok(bytes);
        }
    }
    Ok(data)
}
