//! Staking directory layout consumed by a validator node.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::crypto::IdentityBundle;

use super::OutputError;

pub const STAKER_CERT_FILE: &str = "staker.crt";
pub const STAKER_KEY_FILE: &str = "staker.key";
/// Holds the raw 32-byte BLS secret key, not its hex text.
pub const SIGNER_KEY_FILE: &str = "signer.key";

/// Writes one node's staking files into `dir`, creating it if needed.
pub fn write_staking_dir(dir: &Path, bundle: &IdentityBundle) -> Result<(), OutputError> {
    // Decode first so a bad key never leaves a half-written directory
    let signer_key = bundle
        .bls_private_bytes()
        .map_err(|source| OutputError::Hex {
            node_id: bundle.node_id.clone(),
            source,
        })?;

    fs::create_dir_all(dir)?;
    fs::write(dir.join(STAKER_CERT_FILE), &bundle.cert)?;
    fs::write(dir.join(STAKER_KEY_FILE), &bundle.key)?;
    fs::write(dir.join(SIGNER_KEY_FILE), signer_key)?;

    debug!(node_id = %bundle.node_id, dir = %dir.display(), "wrote staking directory");
    Ok(())
}

/// Writes `root/<node_id>/` staking directories for every bundle.
///
/// Returns the number of directories written.
pub fn convert_to_staking_dirs(root: &Path, bundles: &[IdentityBundle]) -> Result<usize, OutputError> {
    fs::create_dir_all(root)?;
    for bundle in bundles {
        write_staking_dir(&root.join(&bundle.node_id), bundle)?;
    }
    Ok(bundles.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::bundle;

    #[test]
    fn test_signer_key_is_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let node = bundle("NodeID-abc".into());

        write_staking_dir(dir.path(), &node).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join(STAKER_CERT_FILE)).unwrap(), node.cert);
        assert_eq!(fs::read_to_string(dir.path().join(STAKER_KEY_FILE)).unwrap(), node.key);
        let signer = fs::read(dir.path().join(SIGNER_KEY_FILE)).unwrap();
        assert_eq!(signer.len(), 32);
        assert_eq!(hex::encode(&signer), node.bls_private);
    }

    #[test]
    fn test_bad_hex_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("node");
        let mut node = bundle("NodeID-abc".into());
        node.bls_private = "not hex".into();

        assert!(matches!(
            write_staking_dir(&target, &node),
            Err(OutputError::Hex { .. })
        ));
        assert!(!target.exists());
    }

    #[test]
    fn test_convert_one_directory_per_node() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = vec![bundle("NodeID-one".into()), bundle("NodeID-two".into())];

        let written = convert_to_staking_dirs(dir.path(), &nodes).unwrap();

        assert_eq!(written, 2);
        for node in &nodes {
            let node_dir = dir.path().join(&node.node_id);
            assert!(node_dir.join(STAKER_CERT_FILE).is_file());
            assert!(node_dir.join(STAKER_KEY_FILE).is_file());
            assert!(node_dir.join(SIGNER_KEY_FILE).is_file());
        }
    }
}
