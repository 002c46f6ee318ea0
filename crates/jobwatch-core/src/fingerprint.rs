use crate::models::{Fingerprint, JobRecord, compute_hash};
use crate::normalize::collapse_whitespace;
use crate::rule::FingerprintMode;

/// Separator between hashed fields; never produced by normalization.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Fingerprint a record anchored on company, title and URL.
pub fn fingerprint(record: &JobRecord) -> Fingerprint {
    fingerprint_with(record, FingerprintMode::TitleUrl)
}

/// Fingerprint a record using the given anchor.
///
/// Fields are re-normalized here so records built by hand hash the same as
/// records coming out of the normalizer.
pub fn fingerprint_with(record: &JobRecord, mode: FingerprintMode) -> Fingerprint {
    let mut key = collapse_whitespace(&record.company);
    key.push(FIELD_SEPARATOR);
    key.push_str(&collapse_whitespace(&record.title).to_lowercase());
    if mode == FingerprintMode::TitleUrl {
        key.push(FIELD_SEPARATOR);
        key.push_str(&record.url.trim().to_lowercase());
    }
    Fingerprint::from_digest(compute_hash(&key))
}
