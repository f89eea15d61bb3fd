//! Domain-level constants.
//!
//! These constants define the naming conventions shared by parameter
//! parsing and schema validation.

// =============================================================================
// Identity
// =============================================================================

/// Default name of the identity field
pub const DEFAULT_IDENTITY_FIELD: &str = "id";

// =============================================================================
// Parameters
// =============================================================================

/// Separator between a field name and a lookup operator (`id__in`)
pub const LOOKUP_SEPARATOR: &str = "__";

/// Sort key prefix marking descending order (`-id`)
pub const DESCENDING_PREFIX: char = '-';

/// Default page size used by `SlicingParams::page`
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum page size accepted by `SlicingParams::page`
pub const MAX_PAGE_SIZE: u64 = 100;

// =============================================================================
// Keys
// =============================================================================

/// Reserved words that can not be used as keys or field names.
/// Append an underscore instead (`type_`, `fn_`).
pub const RESERVED_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

/// Check if a key is a reserved word
pub fn is_reserved_keyword(key: &str) -> bool {
    RESERVED_KEYWORDS.contains(&key)
}
