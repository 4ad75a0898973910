//! Scanning zipped GitHub Actions log archives.

use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use crate::error::CorrelationError;

use super::pattern::CloudUrlPattern;

/// First cloud run URL found in the archive's file entries, in archive order.
///
/// Stops at the first entry that contains a match. Non-UTF-8 content is
/// scanned lossily.
pub fn scan_log_archive(
    archive: &[u8],
    pattern: &CloudUrlPattern,
) -> Result<Option<String>, CorrelationError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut buf = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        buf.clear();
        entry.read_to_end(&mut buf)?;
        let text = String::from_utf8_lossy(&buf);

        if let Some(url) = pattern.find(&text) {
            debug!(entry = entry.name(), "Cloud run URL found in log entry");
            return Ok(Some(url.to_string()));
        }
    }

    Ok(None)
}
