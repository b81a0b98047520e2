//! Sanity checks for target identifiers before a proposal is created.
//!
//! The protocol itself treats `table` and `record_id` as opaque; these checks
//! run at the edge so malformed targets never reach the store.

/// Maximum table name length.
pub const MAX_TABLE_NAME_LEN: usize = 256;

/// Hex digit counts of the hyphen-separated GUID groups.
const GUID_GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid GUID format: '{0}'. Expected format: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx")]
    InvalidGuid(String),

    #[error("Table name must not be empty.")]
    EmptyTableName,

    #[error("Table name too long ({len} chars, max {max}).")]
    TableNameTooLong { len: usize, max: usize },

    #[error(
        "Invalid table name: '{0}'. Only alphanumeric characters and underscores are allowed."
    )]
    InvalidTableName(String),
}

/// Accept exactly `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (hex, either case, no braces).
pub fn validate_guid(value: &str) -> Result<&str, ValidationError> {
    let groups: Vec<&str> = value.split('-').collect();
    let well_formed = groups.len() == GUID_GROUPS.len()
        && groups
            .iter()
            .zip(GUID_GROUPS)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()));

    if well_formed {
        Ok(value)
    } else {
        Err(ValidationError::InvalidGuid(value.to_string()))
    }
}

/// Accept non-empty names of ASCII alphanumerics and underscores, at most
/// [`MAX_TABLE_NAME_LEN`] characters.
pub fn validate_table_name(value: &str) -> Result<&str, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyTableName);
    }

    let len = value.chars().count();
    if len > MAX_TABLE_NAME_LEN {
        return Err(ValidationError::TableNameTooLong {
            len,
            max: MAX_TABLE_NAME_LEN,
        });
    }

    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidTableName(value.to_string()));
    }

    Ok(value)
}
