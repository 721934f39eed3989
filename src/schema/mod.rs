//! Table schemas
//!
//! A schema states, per output column, where the value comes from, what
//! kind of value it is and what to use when it is absent. The kind tag is
//! what decides whether an object is multilingual text or structure.

pub mod catalog;
pub mod column;
pub mod table;

pub use column::{lookup_path, ColumnDefault, ColumnKind, ColumnSpec, Derive};
pub use table::{is_identifier, TableSchema, UPDATED_AT};
