//! The two statements this store's front-end recognizes. `CREATE`/`DROP`/
//! `UPDATE`/`DELETE`/multi-table `SELECT` are explicitly out of scope (see
//! spec's Non-goals on multi-table schemas and deletion); this parser
//! recognizes exactly `INSERT <id> <username> <email>` and `SELECT`.
use crate::storage::Row;

/// A parsed statement, ready for the façade to execute.
#[derive(Debug)]
pub enum Statement {
    Insert(Row),
    Select,
}
