//! The statement parser: recognizes `INSERT <id> <username> <email>` and
//! `SELECT`, the only two statements this store's front-end supports.
pub mod parser;
pub mod statement;

pub use parser::parse;
pub use statement::Statement;
