//! File and folder name checks.

use crate::{DriveError, Result};

/// Maximum name length in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Name given to uploads that arrive without a usable one.
pub const UNNAMED_UPLOAD: &str = "unknown_file";

/// Trim `raw` and strip control characters.
///
/// Fails with `InvalidName` if nothing is left, the name is too long, or it
/// contains a path separator.
pub fn sanitize(raw: &str) -> Result<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(DriveError::InvalidName("name must not be empty".to_string()));
    }
    if cleaned.chars().count() > MAX_NAME_LENGTH {
        return Err(DriveError::InvalidName(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if cleaned.contains('/') || cleaned.contains('\\') {
        return Err(DriveError::InvalidName(
            "name must not contain path separators".to_string(),
        ));
    }
    if cleaned == "." || cleaned == ".." {
        return Err(DriveError::InvalidName(format!("'{cleaned}' is reserved")));
    }

    Ok(cleaned.to_string())
}

/// Name for an uploaded file.
///
/// Browsers may send a full client path, so only the last component is kept.
/// Uploads never fail on their name: anything unusable becomes
/// [`UNNAMED_UPLOAD`].
pub fn upload_name(raw: Option<&str>) -> String {
    let last = raw
        .unwrap_or_default()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    match sanitize(last) {
        Ok(name) => name,
        Err(DriveError::InvalidName(_)) if last.chars().count() > MAX_NAME_LENGTH => {
            truncate(last)
        }
        Err(_) => UNNAMED_UPLOAD.to_string(),
    }
}

/// Keep the extension while cutting a long name down to size.
fn truncate(name: &str) -> String {
    let name: String = name.chars().filter(|c| !c.is_control()).collect();
    let name = name.trim();
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 && name.len() - pos <= 16 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };
    let keep = MAX_NAME_LENGTH.saturating_sub(ext.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    let truncated = format!("{}{ext}", stem.trim_end());
    if truncated.trim().is_empty() {
        UNNAMED_UPLOAD.to_string()
    } else {
        truncated
    }
}
