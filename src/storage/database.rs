//! # Database façade
//!
//! The top-level handle a front-end talks to: opens the pager, makes sure
//! page 0 is initialized as a leaf root on a virgin file, and exposes
//! `insert`/`select_all`/diagnostic dumps over the B+Tree underneath. This is
//! the only module that knows the on-disk root page index never moves.
use std::path::Path;

use tracing::info;

use crate::errors::Error;

use super::btree::{self, ROOT_PAGE_IDX};
use super::cursor::Cursor;
use super::page::{
    self, INTERNAL_NODE_CELL_SIZE, INTERNAL_NODE_HEADER_SIZE, INTERNAL_NODE_MAX_CELLS,
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
};
use super::pager::Pager;
use super::row::{Row, ROW_SIZE};

/// The layout constants dumped by the `.constants` meta-command.
#[derive(Debug, Clone, Copy)]
pub struct LayoutConstants {
    pub row_size: usize,
    pub common_node_header_size: usize,
    pub leaf_node_header_size: usize,
    pub leaf_node_cell_size: usize,
    pub leaf_node_max_cells: usize,
    pub internal_node_header_size: usize,
    pub internal_node_cell_size: usize,
    pub internal_node_max_cells: usize,
}

impl LayoutConstants {
    fn current() -> Self {
        LayoutConstants {
            row_size: ROW_SIZE,
            common_node_header_size: page::COMMON_NODE_HEADER_SIZE,
            leaf_node_header_size: LEAF_NODE_HEADER_SIZE,
            leaf_node_cell_size: LEAF_NODE_CELL_SIZE,
            leaf_node_max_cells: LEAF_NODE_MAX_CELLS,
            internal_node_header_size: INTERNAL_NODE_HEADER_SIZE,
            internal_node_cell_size: INTERNAL_NODE_CELL_SIZE,
            internal_node_max_cells: INTERNAL_NODE_MAX_CELLS,
        }
    }
}

impl std::fmt::Display for LayoutConstants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ROW_SIZE: {}", self.row_size)?;
        writeln!(f, "COMMON_NODE_HEADER_SIZE: {}", self.common_node_header_size)?;
        writeln!(f, "LEAF_NODE_HEADER_SIZE: {}", self.leaf_node_header_size)?;
        writeln!(f, "LEAF_NODE_CELL_SIZE: {}", self.leaf_node_cell_size)?;
        writeln!(f, "LEAF_NODE_MAX_CELLS: {}", self.leaf_node_max_cells)?;
        writeln!(
            f,
            "INTERNAL_NODE_HEADER_SIZE: {}",
            self.internal_node_header_size
        )?;
        writeln!(f, "INTERNAL_NODE_CELL_SIZE: {}", self.internal_node_cell_size)?;
        write!(f, "INTERNAL_NODE_MAX_CELLS: {}", self.internal_node_max_cells)
    }
}

/// The single table this store holds, backed by one file and one B+Tree
/// rooted at page 0.
pub struct Database {
    pager: Pager,
}

impl Database {
    /// Opens `path`, creating it if it doesn't exist. On a fresh (zero-page)
    /// file, page 0 is initialized as the root leaf.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        info!(path = %path.as_ref().display(), "opening database");
        let mut pager = Pager::open(path)?;
        if pager.num_pages() == 0 {
            let root = pager.get_page_mut(ROOT_PAGE_IDX)?;
            root.initialize_leaf();
            root.set_is_root(true);
        }
        Ok(Database { pager })
    }

    /// Inserts `row`, returning `Error::Duplicate` if its id already exists.
    pub fn insert(&mut self, row: Row) -> Result<(), Error> {
        btree::insert(&mut self.pager, row)
    }

    /// Returns every row in ascending key order.
    pub fn select_all(&mut self) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::table_start(&mut self.pager)?;
        while !cursor.end_of_table {
            rows.push(cursor.value(&mut self.pager)?);
            cursor.advance(&mut self.pager)?;
        }
        Ok(rows)
    }

    /// The layout constants for the `.constants` meta-command.
    pub fn constants(&self) -> LayoutConstants {
        LayoutConstants::current()
    }

    /// An indented pre-order dump of the tree for the `.btree` meta-command.
    pub fn dump_tree(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        btree::dump_tree(&mut self.pager, ROOT_PAGE_IDX, 0, &mut out)?;
        Ok(out)
    }

    /// Flushes every resident page and closes the file. Only after this
    /// returns is the file guaranteed durable.
    pub fn close(mut self) -> Result<(), Error> {
        self.pager.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn row(id: u32) -> Row {
        Row::new(id, &format!("user{id}"), &format!("user{id}@example.com")).unwrap()
    }

    #[test]
    fn fresh_database_has_no_rows() {
        let tmp = NamedTempFile::new().unwrap();
        let mut db = Database::open(tmp.path()).unwrap();
        assert!(db.select_all().unwrap().is_empty());
    }

    #[test]
    fn insert_then_select_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let mut db = Database::open(tmp.path()).unwrap();
        db.insert(Row::new(1, "alice", "alice@x").unwrap()).unwrap();
        let rows = db.select_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].username_str(), "alice");
        assert_eq!(rows[0].email_str(), "alice@x");
    }

    #[test]
    fn duplicate_insert_is_rejected_and_store_is_unchanged() {
        let tmp = NamedTempFile::new().unwrap();
        let mut db = Database::open(tmp.path()).unwrap();
        db.insert(row(1)).unwrap();
        let before = db.dump_tree().unwrap();
        assert!(matches!(db.insert(row(1)), Err(Error::Duplicate(1))));
        let after = db.dump_tree().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn persists_across_close_and_reopen() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        {
            let mut db = Database::open(&path).unwrap();
            db.insert(Row::new(1, "a", "a@x").unwrap()).unwrap();
            db.close().unwrap();
        }
        {
            let mut db = Database::open(&path).unwrap();
            db.insert(Row::new(2, "b", "b@x").unwrap()).unwrap();
            db.close().unwrap();
        }
        {
            let mut db = Database::open(&path).unwrap();
            let rows = db.select_all().unwrap();
            assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        }
    }

    #[test]
    fn reverse_insert_order_still_scans_ascending() {
        let tmp = NamedTempFile::new().unwrap();
        let mut db = Database::open(tmp.path()).unwrap();
        for id in (1..=14u32).rev() {
            db.insert(row(id)).unwrap();
        }
        let rows = db.select_all().unwrap();
        assert_eq!(
            rows.iter().map(|r| r.id).collect::<Vec<_>>(),
            (1..=14).collect::<Vec<_>>()
        );
    }
}
