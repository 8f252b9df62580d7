//! Entity ID generation.

use uuid::Uuid;

/// Generates string primary keys for new rows.
///
/// IDs are random UUID v4s in hyphenated form, sized for the
/// 36-character key columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generate a fresh entity ID.
    #[must_use]
    pub fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Whether a string parses as a version 4 UUID, the shape [`IdGenerator`]
/// produces.
#[must_use]
pub fn is_v4_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok_and(|u| u.get_version_num() == 4)
}
