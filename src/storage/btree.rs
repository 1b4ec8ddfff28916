//! B+Tree search, insert and split algorithms.
//!
//! The tree is keyed on the row id. Leaves hold rows directly; internal
//! nodes hold routing keys and child page indexes. The root always lives at
//! page 0 — splitting the root copies its contents into a freshly allocated
//! page and reinitializes page 0 as the new two-child internal node, so
//! callers never need to track a separate root pointer.
use std::cmp::Ordering;

use crate::err;
use crate::errors::Error;

use super::cursor::Cursor;
use super::page::{NodeType, INTERNAL_NODE_MAX_CELLS, INVALID_PAGE_IDX, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT};
use super::pager::Pager;
use super::row::Row;

pub const ROOT_PAGE_IDX: u32 = 0;

/// Finds the cursor position for `key`: pointing at the cell holding it if
/// present, otherwise at the position where it should be inserted.
pub fn find(pager: &mut Pager, key: u32) -> Result<Cursor, Error> {
    let root_type = pager.get_page(ROOT_PAGE_IDX)?.node_type();
    match root_type {
        NodeType::Leaf => leaf_find(pager, ROOT_PAGE_IDX, key),
        NodeType::Internal => internal_find(pager, ROOT_PAGE_IDX, key),
    }
}

/// Inserts `row`, returning `Error::Duplicate` if its id is already present.
pub fn insert(pager: &mut Pager, row: Row) -> Result<(), Error> {
    let key = row.id;
    let cursor = find(pager, key)?;
    let num_cells = pager.get_page(cursor.page_idx)?.leaf_num_cells() as usize;
    if cursor.cell_idx < num_cells {
        let key_at_cell = pager.get_page(cursor.page_idx)?.leaf_key(cursor.cell_idx);
        if key_at_cell == key {
            return Err(Error::Duplicate(key));
        }
    }
    leaf_insert_cell(pager, &cursor, key, &row)
}

fn internal_find(pager: &mut Pager, page_idx: u32, key: u32) -> Result<Cursor, Error> {
    let (_, child_page_idx) = pager.get_page(page_idx)?.internal_child_for_key(key);
    let child_type = pager.get_page(child_page_idx)?.node_type();
    match child_type {
        NodeType::Internal => internal_find(pager, child_page_idx, key),
        NodeType::Leaf => leaf_find(pager, child_page_idx, key),
    }
}

fn leaf_find(pager: &mut Pager, page_idx: u32, key: u32) -> Result<Cursor, Error> {
    let page = pager.get_page(page_idx)?;
    let num_cells = page.leaf_num_cells() as usize;
    let mut lo = 0usize;
    let mut hi = num_cells;
    while lo < hi {
        let mid = (lo + hi) / 2;
        let key_at_mid = page.leaf_key(mid);
        match key.cmp(&key_at_mid) {
            Ordering::Equal => {
                lo = mid;
                break;
            }
            Ordering::Greater => lo = mid + 1,
            Ordering::Less => hi = mid,
        }
    }
    Ok(Cursor {
        page_idx,
        cell_idx: lo,
        end_of_table: lo == num_cells,
    })
}

fn leaf_insert_cell(pager: &mut Pager, cursor: &Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let num_cells = pager.get_page(cursor.page_idx)?.leaf_num_cells() as usize;
    if num_cells >= LEAF_NODE_MAX_CELLS {
        return leaf_split_and_insert(pager, cursor, key, row);
    }

    let page = pager.get_page_mut(cursor.page_idx)?;
    if cursor.cell_idx < num_cells {
        for i in (cursor.cell_idx + 1..=num_cells).rev() {
            page.copy_leaf_cell(i, i - 1);
        }
    }
    page.set_leaf_key(cursor.cell_idx, key);
    page.set_leaf_value(cursor.cell_idx, row);
    page.set_leaf_num_cells(num_cells as u32 + 1);
    Ok(())
}

/// Splits the leaf at `cursor.page_idx`, distributing the existing cells plus
/// the new one evenly between it and a freshly allocated right sibling, then
/// fixes up the parent (creating a new root if the leaf being split was the
/// root).
fn leaf_split_and_insert(pager: &mut Pager, cursor: &Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let old_page_idx = cursor.page_idx;
    let old_max = pager.get_page(old_page_idx)?.leaf_max_key();
    let source = pager.get_page(old_page_idx)?.clone();

    let new_page_idx = pager.allocate_page()?;
    {
        let new_node = pager.get_page_mut(new_page_idx)?;
        new_node.initialize_leaf();
        new_node.set_parent_page_idx(source.parent_page_idx());
        new_node.set_leaf_next_leaf(source.leaf_next_leaf());
    }
    pager.get_page_mut(old_page_idx)?.set_leaf_next_leaf(new_page_idx);

    for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
        let index_within_node = i % LEAF_NODE_LEFT_SPLIT_COUNT;
        let dest_idx = if i < LEAF_NODE_LEFT_SPLIT_COUNT {
            old_page_idx
        } else {
            new_page_idx
        };
        let dest = pager.get_page_mut(dest_idx)?;
        match i.cmp(&cursor.cell_idx) {
            Ordering::Equal => {
                dest.set_leaf_key(index_within_node, key);
                dest.set_leaf_value(index_within_node, row);
            }
            Ordering::Greater => dest.copy_leaf_cell_from(index_within_node, &source, i - 1),
            Ordering::Less => dest.copy_leaf_cell_from(index_within_node, &source, i),
        }
    }

    pager
        .get_page_mut(old_page_idx)?
        .set_leaf_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
    pager
        .get_page_mut(new_page_idx)?
        .set_leaf_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

    let was_root = pager.get_page(old_page_idx)?.is_root();
    if was_root {
        create_root_node(pager, new_page_idx)
    } else {
        let parent_idx = pager.get_page(old_page_idx)?.parent_page_idx();
        let new_max = pager.get_page(old_page_idx)?.leaf_max_key();
        update_internal_node_key(pager, parent_idx, old_max, new_max)?;
        internal_node_insert(pager, parent_idx, new_page_idx)
    }
}

/// Splits the old root's contents into a new left child, then reinitializes
/// page 0 as an internal node routing to that left child and to
/// `right_child_page_idx`.
fn create_root_node(pager: &mut Pager, right_child_page_idx: u32) -> Result<(), Error> {
    let root_is_internal = pager.get_page(ROOT_PAGE_IDX)?.node_type() == NodeType::Internal;
    if root_is_internal {
        pager.get_page_mut(right_child_page_idx)?.initialize_internal();
    }

    let left_child_page_idx = pager.allocate_page()?;
    let root_bytes = *pager.get_page(ROOT_PAGE_IDX)?.as_bytes();
    {
        let left_child = pager.get_page_mut(left_child_page_idx)?;
        *left_child.as_bytes_mut() = root_bytes;
        left_child.set_is_root(false);
    }

    if pager.get_page(left_child_page_idx)?.node_type() == NodeType::Internal {
        let num_keys = pager.get_page(left_child_page_idx)?.internal_num_keys() as usize;
        for i in 0..num_keys {
            let child_idx = pager.get_page(left_child_page_idx)?.internal_child(i);
            pager
                .get_page_mut(child_idx)?
                .set_parent_page_idx(left_child_page_idx);
        }
        let right_idx = pager.get_page(left_child_page_idx)?.internal_right_child();
        pager
            .get_page_mut(right_idx)?
            .set_parent_page_idx(left_child_page_idx);
    }

    {
        let root = pager.get_page_mut(ROOT_PAGE_IDX)?;
        root.initialize_internal();
        root.set_is_root(true);
        root.set_internal_num_keys(1);
        root.set_internal_child(0, left_child_page_idx);
        root.set_internal_right_child(right_child_page_idx);
    }
    let left_child_max_key = get_node_max_key(pager, left_child_page_idx)?;
    pager
        .get_page_mut(ROOT_PAGE_IDX)?
        .set_internal_key(0, left_child_max_key);

    pager
        .get_page_mut(left_child_page_idx)?
        .set_parent_page_idx(ROOT_PAGE_IDX);
    pager
        .get_page_mut(right_child_page_idx)?
        .set_parent_page_idx(ROOT_PAGE_IDX);

    Ok(())
}

/// The max key stored under `page_idx`: its own last key if it's a leaf,
/// otherwise the max key of its rightmost child, recursively.
fn get_node_max_key(pager: &mut Pager, page_idx: u32) -> Result<u32, Error> {
    let (node_type, leaf_max_or_right_child) = {
        let page = pager.get_page(page_idx)?;
        match page.node_type() {
            NodeType::Leaf => (NodeType::Leaf, page.leaf_max_key()),
            NodeType::Internal => (NodeType::Internal, page.internal_right_child()),
        }
    };
    match node_type {
        NodeType::Leaf => Ok(leaf_max_or_right_child),
        NodeType::Internal => get_node_max_key(pager, leaf_max_or_right_child),
    }
}

fn update_internal_node_key(pager: &mut Pager, page_idx: u32, old_key: u32, new_key: u32) -> Result<(), Error> {
    let (idx, num_keys) = {
        let page = pager.get_page(page_idx)?;
        (page.internal_child_for_key(old_key).0, page.internal_num_keys() as usize)
    };
    if idx == num_keys {
        // old_key routed through the right child; no key slot to update.
        return Ok(());
    }
    pager.get_page_mut(page_idx)?.set_internal_key(idx, new_key);
    Ok(())
}

/// Adds the child/key pair for `child_idx` to `parent_idx`, splitting the
/// parent first if it's already at capacity.
fn internal_node_insert(pager: &mut Pager, parent_idx: u32, child_idx: u32) -> Result<(), Error> {
    let original_num_keys = pager.get_page(parent_idx)?.internal_num_keys();
    if original_num_keys as usize >= INTERNAL_NODE_MAX_CELLS {
        return internal_node_split_and_insert(pager, parent_idx, child_idx);
    }

    let right_child_idx = pager.get_page(parent_idx)?.internal_right_child();
    if right_child_idx == INVALID_PAGE_IDX {
        pager.get_page_mut(parent_idx)?.set_internal_right_child(child_idx);
        return Ok(());
    }

    let child_max_key = get_node_max_key(pager, child_idx)?;
    let idx_to_insert = pager.get_page(parent_idx)?.internal_child_for_key(child_max_key).0;
    let right_child_max = get_node_max_key(pager, right_child_idx)?;

    pager
        .get_page_mut(parent_idx)?
        .set_internal_num_keys(original_num_keys + 1);

    if child_max_key > right_child_max {
        let parent = pager.get_page_mut(parent_idx)?;
        parent.set_internal_child(original_num_keys as usize, right_child_idx);
        parent.set_internal_key(original_num_keys as usize, right_child_max);
        parent.set_internal_right_child(child_idx);
    } else {
        let parent = pager.get_page_mut(parent_idx)?;
        for i in (idx_to_insert + 1..=original_num_keys as usize).rev() {
            parent.copy_internal_cell(i, i - 1);
        }
        parent.set_internal_child(idx_to_insert, child_idx);
        parent.set_internal_key(idx_to_insert, child_max_key);
    }
    Ok(())
}

/// Splits the internal node at `parent_pg_idx` into itself and a new right
/// sibling, migrating its right child and half its keys over, then inserts
/// `child_pg_idx` into whichever of the two now covers its key range.
fn internal_node_split_and_insert(pager: &mut Pager, parent_pg_idx: u32, child_pg_idx: u32) -> Result<(), Error> {
    let mut old_page_idx = parent_pg_idx;
    let old_max = get_node_max_key(pager, old_page_idx)?;
    let child_max_key = get_node_max_key(pager, child_pg_idx)?;

    let new_page_idx = pager.allocate_page()?;
    let splitting_root = pager.get_page(old_page_idx)?.is_root();

    let grandparent_idx;
    if splitting_root {
        create_root_node(pager, new_page_idx)?;
        grandparent_idx = ROOT_PAGE_IDX;
        old_page_idx = pager.get_page(grandparent_idx)?.internal_child(0);
    } else {
        grandparent_idx = pager.get_page(old_page_idx)?.parent_page_idx();
        pager.get_page_mut(new_page_idx)?.initialize_internal();
    }

    let old_right_child_idx = pager.get_page(old_page_idx)?.internal_right_child();
    internal_node_insert(pager, new_page_idx, old_right_child_idx)?;
    pager
        .get_page_mut(old_right_child_idx)?
        .set_parent_page_idx(new_page_idx);
    pager
        .get_page_mut(old_page_idx)?
        .set_internal_right_child(INVALID_PAGE_IDX);

    for i in (INTERNAL_NODE_MAX_CELLS / 2 + 1..INTERNAL_NODE_MAX_CELLS).rev() {
        let cur_idx = pager.get_page(old_page_idx)?.internal_child(i);
        internal_node_insert(pager, new_page_idx, cur_idx)?;
        pager.get_page_mut(cur_idx)?.set_parent_page_idx(new_page_idx);
        let old_num_keys = pager.get_page(old_page_idx)?.internal_num_keys();
        pager
            .get_page_mut(old_page_idx)?
            .set_internal_num_keys(old_num_keys - 1);
    }

    let old_num_keys = pager.get_page(old_page_idx)?.internal_num_keys();
    let new_right_child_idx = pager
        .get_page(old_page_idx)?
        .internal_child(old_num_keys as usize - 1);
    {
        let old_node = pager.get_page_mut(old_page_idx)?;
        old_node.set_internal_right_child(new_right_child_idx);
        old_node.set_internal_num_keys(old_num_keys - 1);
    }

    let max_after_split = get_node_max_key(pager, old_page_idx)?;
    let destination_idx = if child_max_key < max_after_split {
        old_page_idx
    } else {
        new_page_idx
    };
    internal_node_insert(pager, destination_idx, child_pg_idx)?;
    pager
        .get_page_mut(child_pg_idx)?
        .set_parent_page_idx(destination_idx);

    let new_old_max = get_node_max_key(pager, old_page_idx)?;
    update_internal_node_key(pager, grandparent_idx, old_max, new_old_max)?;

    if !splitting_root {
        let old_node_parent = pager.get_page(old_page_idx)?.parent_page_idx();
        internal_node_insert(pager, old_node_parent, new_page_idx)?;
        pager
            .get_page_mut(new_page_idx)?
            .set_parent_page_idx(old_node_parent);
    }

    Ok(())
}

/// Writes an indented pre-order dump of the tree rooted at `page_idx`, for
/// the `.btree` meta-command.
pub fn dump_tree(pager: &mut Pager, page_idx: u32, indent: usize, out: &mut String) -> Result<(), Error> {
    let node_type = pager.get_page(page_idx)?.node_type();
    match node_type {
        NodeType::Leaf => {
            let num_cells = pager.get_page(page_idx)?.leaf_num_cells();
            push_indent(out, indent);
            out.push_str(&format!("- leaf (size {})\n", num_cells));
            for i in 0..num_cells as usize {
                let key = pager.get_page(page_idx)?.leaf_key(i);
                push_indent(out, indent + 1);
                out.push_str(&format!("- {}\n", key));
            }
        }
        NodeType::Internal => {
            let num_keys = pager.get_page(page_idx)?.internal_num_keys();
            push_indent(out, indent);
            out.push_str(&format!("- internal (size {})\n", num_keys));
            for i in 0..num_keys as usize {
                let child = pager.get_page(page_idx)?.internal_child(i);
                dump_tree(pager, child, indent + 1, out)?;
                push_indent(out, indent + 1);
                let key = pager.get_page(page_idx)?.internal_key(i);
                out.push_str(&format!("- key {}\n", key));
            }
            let right_child = pager.get_page(page_idx)?.internal_right_child();
            dump_tree(pager, right_child, indent + 1, out)?;
        }
    }
    Ok(())
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open_empty() -> (Pager, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(tmp.path()).unwrap();
        let root = pager.get_page_mut(ROOT_PAGE_IDX).unwrap();
        root.initialize_leaf();
        root.set_is_root(true);
        (pager, tmp)
    }

    fn row(id: u32) -> Row {
        Row::new(id, &format!("user{id}"), &format!("user{id}@example.com")).unwrap()
    }

    #[test]
    fn inserts_and_finds_in_order() {
        let (mut pager, _tmp) = open_empty();
        for id in [5, 2, 8, 1, 9, 3] {
            insert(&mut pager, row(id)).unwrap();
        }
        let mut cursor = Cursor::table_start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (mut pager, _tmp) = open_empty();
        insert(&mut pager, row(1)).unwrap();
        assert!(matches!(insert(&mut pager, row(1)), Err(Error::Duplicate(1))));
    }

    #[test]
    fn splits_root_leaf_and_keeps_order() {
        let (mut pager, _tmp) = open_empty();
        for id in 1..=14u32 {
            insert(&mut pager, row(id)).unwrap();
        }
        assert_eq!(pager.get_page(ROOT_PAGE_IDX).unwrap().node_type(), NodeType::Internal);

        let mut cursor = Cursor::table_start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, (1..=14).collect::<Vec<_>>());
    }

    #[test]
    fn splits_internal_node_with_many_inserts() {
        let (mut pager, _tmp) = open_empty();
        for id in (1..=60u32).rev() {
            insert(&mut pager, row(id)).unwrap();
        }
        let mut cursor = Cursor::table_start(&mut pager).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            seen.push(cursor.value(&mut pager).unwrap().id);
            cursor.advance(&mut pager).unwrap();
        }
        assert_eq!(seen, (1..=60).collect::<Vec<_>>());
    }

    #[test]
    fn dump_tree_mentions_every_key() {
        let (mut pager, _tmp) = open_empty();
        for id in 1..=14u32 {
            insert(&mut pager, row(id)).unwrap();
        }
        let mut out = String::new();
        dump_tree(&mut pager, ROOT_PAGE_IDX, 0, &mut out).unwrap();
        for id in 1..=14u32 {
            assert!(out.contains(&id.to_string()));
        }
    }
}
