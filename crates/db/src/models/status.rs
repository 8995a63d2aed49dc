//! Lookup-table id type.
//!
//! Status and role enums live in `schoolhub_core`; their discriminants match
//! the seed order (1-based) of the corresponding lookup tables.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;
