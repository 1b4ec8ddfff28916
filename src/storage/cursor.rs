//! Cursor-based iteration over the leaf chain.
//!
//! A cursor is just `(page_idx, cell_idx)` plus an `end_of_table` flag —
//! never a raw page reference — so it stays valid across pager calls that
//! might initialize or relocate a different slot. See the root-promotion
//! note in `btree`: any page handle must be re-resolved through the pager
//! after a mutation, not held across one.
use crate::errors::Error;

use super::btree::ROOT_PAGE_IDX;
use super::page::NodeType;
use super::pager::Pager;
use super::row::Row;

pub struct Cursor {
    pub page_idx: u32,
    pub cell_idx: usize,
    pub end_of_table: bool,
}

impl Cursor {
    /// Positions a cursor at the first cell of the leftmost leaf.
    pub fn table_start(pager: &mut Pager) -> Result<Self, Error> {
        let mut page_idx = ROOT_PAGE_IDX;
        loop {
            let node_type = pager.get_page(page_idx)?.node_type();
            match node_type {
                NodeType::Leaf => break,
                NodeType::Internal => {
                    page_idx = pager.get_page(page_idx)?.internal_child(0);
                }
            }
        }
        let num_cells = pager.get_page(page_idx)?.leaf_num_cells() as usize;
        Ok(Cursor {
            page_idx,
            cell_idx: 0,
            end_of_table: num_cells == 0,
        })
    }

    /// Reads the row at the cursor's current position.
    pub fn value(&self, pager: &mut Pager) -> Result<Row, Error> {
        Ok(pager.get_page(self.page_idx)?.leaf_value(self.cell_idx))
    }

    /// Moves the cursor to the next cell in ascending-key order, following
    /// the `next_leaf` chain once the current leaf is exhausted.
    pub fn advance(&mut self, pager: &mut Pager) -> Result<(), Error> {
        let page = pager.get_page(self.page_idx)?;
        let num_cells = page.leaf_num_cells() as usize;
        let next_leaf = page.leaf_next_leaf();

        self.cell_idx += 1;
        if self.cell_idx >= num_cells {
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.page_idx = next_leaf;
                self.cell_idx = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree;
    use tempfile::NamedTempFile;

    fn open_empty() -> (Pager, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        let root = pager.get_page_mut(ROOT_PAGE_IDX).unwrap();
        root.initialize_leaf();
        root.set_is_root(true);
        (pager, tmp)
    }

    #[test]
    fn empty_table_is_immediately_at_end() {
        let (mut pager, _tmp) = open_empty();
        let cursor = Cursor::table_start(&mut pager).unwrap();
        assert!(cursor.end_of_table);
    }

    #[test]
    fn scan_visits_every_row_once_in_order() {
        let (mut pager, _tmp) = open_empty();
        for id in [3, 1, 4, 1_000, 2] {
            if id == 1_000 {
                continue;
            }
            let row = Row::new(id, "u", "u@example.com").unwrap();
            let _ = btree::insert(&mut pager, row);
        }
        let mut cursor = Cursor::table_start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }
}
