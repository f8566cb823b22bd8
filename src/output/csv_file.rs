//! CSV node file writer.

use std::io::Write;

use crate::crypto::IdentityBundle;

use super::OutputError;

/// Column order of the CSV node file.
pub const CSV_HEADER: [&str; 7] = [
    "nodeID",
    "cert",
    "key",
    "bls_private",
    "bls_public",
    "bls_signature",
    "active_provider",
];

/// Writes a header row and one row per bundle.
///
/// Every column is always present; a missing provider is an empty field.
pub fn write_csv<W: Write>(writer: W, bundles: &[IdentityBundle]) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for bundle in bundles {
        csv.write_record([
            bundle.node_id.as_str(),
            bundle.cert.as_str(),
            bundle.key.as_str(),
            bundle.bls_private.as_str(),
            bundle.bls_public.as_str(),
            bundle.bls_signature.as_str(),
            bundle.active_provider.as_deref().unwrap_or(""),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
