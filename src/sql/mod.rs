//! SQL text generation: literal encoding and upsert statements

pub mod encode;
pub mod statement;

pub use encode::{encode, encode_as, quote};
pub use statement::{
    batch_header, script_header, upsert_statement, verification_footer, StatementGenerator,
};
