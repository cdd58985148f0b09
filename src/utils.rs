//! Utility functions for file names and paths

use std::path::Path;

/// Suffix appended to the stem of a downloaded document
pub const ANONYMIZED_SUFFIX: &str = "_anonymized";

/// Derive the local file name of an anonymized document
///
/// Only the final path component of `document_name` is used, so a name sent
/// by the server can never point outside the download directory. The suffix
/// is inserted before the extension.
///
/// # Examples
///
/// ```
/// use anonymizer_client::utils::download_file_name;
///
/// assert_eq!(download_file_name("contract.docx"), "contract_anonymized.docx");
/// assert_eq!(download_file_name("notes"), "notes_anonymized");
/// assert_eq!(download_file_name("../../etc/passwd"), "passwd_anonymized");
/// ```
pub fn download_file_name(document_name: &str) -> String {
    // Accept both separators regardless of platform
    let base = document_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(document_name)
        .trim();

    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "..")
        .unwrap_or("document");

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{stem}{ANONYMIZED_SUFFIX}.{ext}"),
        _ => format!("{stem}{ANONYMIZED_SUFFIX}"),
    }
}
