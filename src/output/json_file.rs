//! JSON node file (`{"nodes": [...]}`).

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::IdentityBundle;

use super::OutputError;

/// On-disk shape of a JSON node file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFile {
    pub nodes: Vec<IdentityBundle>,
}

/// Writes bundles as a pretty-printed node file with a trailing newline.
pub fn write_json<W: Write>(mut writer: W, bundles: &[IdentityBundle]) -> Result<(), OutputError> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        nodes: &'a [IdentityBundle],
    }

    serde_json::to_writer_pretty(&mut writer, &Borrowed { nodes: bundles })?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads the nodes of a JSON node file.
pub fn read_json(path: &Path) -> Result<Vec<IdentityBundle>, OutputError> {
    let bytes = fs::read(path)?;
    let file: NodeFile = serde_json::from_slice(&bytes)?;
    Ok(file.nodes)
}
