//! Application-wide constants

/// Maximum length of an article title in characters
pub const MAX_TITLE_LENGTH: u64 = 200;

/// Maximum length of a stored slug.
/// Derived slugs are truncated to leave room for a `-N` suffix.
pub const MAX_SLUG_LENGTH: usize = 200;

/// Maximum length of a category or tag name
pub const MAX_NAME_LENGTH: u64 = 100;

/// Separators accepted in free-text tag input: ASCII and fullwidth comma
pub const TAG_SEPARATORS: &[char] = &[',', '，'];

/// Prefix of the placeholder slug an article holds until its id is known
pub const PENDING_SLUG_PREFIX: &str = "pending-";
