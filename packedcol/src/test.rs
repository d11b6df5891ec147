use ordered_float::OrderedFloat;
use tempfile::tempdir;
use test_log::test;

use crate::{BitVecColumn, Column, DictColumn, RunColumn};

// Exercises one encoding against the shared scenario every `Column<i64>`
// impl must satisfy: append, point update, subscript round-trip, then
// removal, checking `size`/`get` stay consistent throughout.
fn scenario_basic<C: Column<i64>>(mut col: C) {
    for v in [1, 1, 2, 2, 2, 3] {
        col.append(v).unwrap();
    }
    assert_eq!(col.size(), 6);
    assert_eq!(col.get(0), Some(crate::Value::Int(1)));
    assert_eq!(col.get(5), Some(crate::Value::Int(3)));
    assert_eq!(col.get(6), None);

    col.update(1, 9).unwrap();
    assert_eq!(col.get(1), Some(crate::Value::Int(9)));
    assert_eq!(col.get(0), Some(crate::Value::Int(1)));

    {
        let mut sub = col.subscript(2).unwrap();
        *sub += 100;
        sub.commit().unwrap();
    }
    assert_eq!(col.get(2), Some(crate::Value::Int(102)));

    col.remove(0).unwrap();
    assert_eq!(col.size(), 5);
    assert_eq!(col.get(0), Some(crate::Value::Int(9)));
}

#[test]
fn dict_basic() {
    scenario_basic(DictColumn::<i64>::new("col"));
}

#[test]
fn runs_basic() {
    scenario_basic(RunColumn::<i64>::new("col"));
}

#[test]
fn bitvec_basic() {
    scenario_basic(BitVecColumn::<i64>::new("col"));
}

// Dictionary invariants: every code is in-bounds and every entry has at
// least one reference, checked after a sequence of mutations chosen to
// exercise the rename, new-entry, and excise branches of update.
#[test]
fn dict_invariants_after_mutation() {
    let mut col = DictColumn::<i64>::new("col");
    for v in [10, 20, 10, 30, 20] {
        col.append(v).unwrap();
    }
    col.update(0, 99).unwrap(); // 10 was referenced twice: new entry, not rename
    col.update(1, 20).unwrap(); // already 20: no-op
    col.update(3, 10).unwrap(); // 30 was singly-referenced: excise 30, repoint to 10... actually renames in place
    col.remove(4).unwrap();

    check_dict_invariants(&col);
}

// D1: every code is a valid index into dict. D2: every dict entry is
// referenced by at least one code (no orphans left behind by update/remove).
fn check_dict_invariants(col: &DictColumn<i64>) {
    let dict_len = col.dict_len();
    let codes = col.codes();
    assert_eq!(codes.len(), col.size());

    let mut referenced = vec![false; dict_len];
    for &c in codes {
        assert!((c as usize) < dict_len, "code {c} out of bounds for dict of length {dict_len}");
        referenced[c as usize] = true;
    }
    for (idx, is_referenced) in referenced.iter().enumerate() {
        assert!(*is_referenced, "dict entry {idx} is orphaned: referenced by no code");
    }
}

// The self-update-to-current-value case must be a true no-op: it must not
// excise the dictionary entry the row still depends on.
#[test]
fn dict_self_update_is_noop() {
    let mut col = DictColumn::<i64>::new("col");
    col.append(7).unwrap();
    col.update(0, 7).unwrap();
    assert_eq!(col.get(0), Some(crate::Value::Int(7)));
    assert_eq!(col.size(), 1);
}

// R1: no two adjacent runs share a value, after updates and removals that
// would otherwise leave a run of count zero or two equal neighbors.
#[test]
fn runs_remerge_after_remove() {
    let mut col = RunColumn::<i64>::new("col");
    for v in [1, 1, 2, 1, 1] {
        col.append(v).unwrap();
    }
    // Removing the lone middle `2` should merge the two `1`-runs around it.
    col.remove(2).unwrap();
    assert_eq!(col.size(), 4);
    for tid in 0..4 {
        assert_eq!(col.get(tid), Some(crate::Value::Int(1)));
    }
}

#[test]
fn runs_update_merges_with_neighbor() {
    let mut col = RunColumn::<i64>::new("col");
    for v in [1, 2, 1] {
        col.append(v).unwrap();
    }
    col.update(1, 1).unwrap();
    assert_eq!(col.size(), 3);
    for tid in 0..3 {
        assert_eq!(col.get(tid), Some(crate::Value::Int(1)));
    }
}

// B1/B2: planes partition every row and no plane is left at zero
// references after an update moves every row off of it.
#[test]
fn bitvec_plane_excised_when_orphaned() {
    let mut col = BitVecColumn::<i64>::new("col");
    col.append(5).unwrap();
    col.append(6).unwrap();
    col.update(0, 6).unwrap();
    assert_eq!(col.get(0), Some(crate::Value::Int(6)));
    assert_eq!(col.get(1), Some(crate::Value::Int(6)));
    // Only one distinct value should remain live.
    col.print();
}

// Updating the sole row referencing a dictionary entry to a value that is
// already present must collapse the orphaned entry out of `dict`.
#[test]
fn dict_update_collapses_orphaned_entry() {
    let mut col = DictColumn::<i64>::new("col");
    for v in [1, 2, 1, 3, 1] {
        col.append(v).unwrap();
    }
    col.update(3, 2).unwrap(); // 3 was singly-referenced; collapses into 2
    assert_eq!(col.size(), 5);
    for (tid, expected) in [1, 2, 1, 2, 1].into_iter().enumerate() {
        assert_eq!(col.get(tid), Some(crate::Value::Int(expected)));
    }
    check_dict_invariants(&col);
}

// Updating a value strictly inside a run to something that matches neither
// neighbor must split the run into three.
#[test]
fn runs_update_splits_run() {
    let mut col = RunColumn::<i64>::new("col");
    for _ in 0..4 {
        col.append(1).unwrap();
    }
    col.update(1, 2).unwrap();
    assert_eq!(col.size(), 4);
    for (tid, expected) in [1, 2, 1, 1].into_iter().enumerate() {
        assert_eq!(col.get(tid), Some(crate::Value::Int(expected)));
    }
}

// Updating a run's lone interior value back to its neighbors' shared value
// must merge all three runs into one.
#[test]
fn runs_update_merges_three_runs() {
    let mut col = RunColumn::<i64>::new("col");
    for v in [1, 1, 2, 1, 1] {
        col.append(v).unwrap();
    }
    col.update(2, 1).unwrap();
    assert_eq!(col.size(), 5);
    for tid in 0..5 {
        assert_eq!(col.get(tid), Some(crate::Value::Int(1)));
    }
}

// Appending 16 distinct values forces two byte planes; removing the first
// eight rows empties plane 0 entirely and must trigger compaction, shifting
// the surviving rows' effective TIDs down by one plane width.
#[test]
fn bitvec_plane_compaction_reclaims_bytes() {
    let mut col = BitVecColumn::<i64>::new("col");
    for v in 0..16 {
        col.append(v).unwrap();
    }
    assert_eq!(col.size(), 16);

    for _ in 0..8 {
        col.remove(0).unwrap();
    }
    assert_eq!(col.size(), 8);
    // Original TID 8's value must now be at TID 0 post-compaction.
    assert_eq!(col.get(0), Some(crate::Value::Int(8)));
    for (tid, expected) in (8..16).enumerate() {
        assert_eq!(col.get(tid), Some(crate::Value::Int(expected)));
    }
}

// Removing rows out of byte-plane order still compacts correctly once the
// low plane's last live bit is cleared.
#[test]
fn bitvec_plane_compaction_is_order_independent() {
    let mut col = BitVecColumn::<i64>::new("col");
    for v in 0..16 {
        col.append(v).unwrap();
    }
    // Removes original rows 3, 0, 7, 1, 6, 2, 5, 4 - out of order, same set -
    // expressed as the live tid each removal resolves to once earlier
    // removals have shifted the surviving rows down.
    for &tid in &[3usize, 0, 5, 0, 3, 0, 1, 0] {
        col.remove(tid).unwrap();
    }
    assert_eq!(col.size(), 8);
    assert_eq!(col.get(0), Some(crate::Value::Int(8)));
}

#[test]
fn update_positions_applies_in_order() {
    let mut col = DictColumn::<i64>::new("col");
    for v in [1, 2, 3] {
        col.append(v).unwrap();
    }
    col.update_positions(&[0, 1, 2], 9).unwrap();
    for tid in 0..3 {
        assert_eq!(col.get(tid), Some(crate::Value::Int(9)));
    }
}

#[test]
fn remove_positions_requires_descending_order() {
    let mut col = DictColumn::<i64>::new("col");
    for v in [1, 2, 3, 4] {
        col.append(v).unwrap();
    }
    assert!(col.remove_positions(&[3, 1]).is_ok());
    assert_eq!(col.size(), 2);

    let mut col = DictColumn::<i64>::new("col");
    for v in [1, 2, 3, 4] {
        col.append(v).unwrap();
    }
    assert!(col.remove_positions(&[1, 3]).is_err());
}

#[test]
fn append_range_rejects_empty_slice() {
    let mut col = DictColumn::<i64>::new("col");
    let empty: &[i64] = &[];
    assert!(col.append_range(empty).is_err());
}

#[test]
fn append_value_rejects_type_mismatch_and_empty() {
    let mut col = DictColumn::<i64>::new("col");
    assert!(col.append_value(None).is_err());
    assert!(col.append_value(Some(crate::Value::Str("x".into()))).is_err());
    assert!(col.append_value(Some(crate::Value::Int(1))).is_ok());
}

// Same logical sequence of values should read back identically regardless
// of which encoding stored it.
#[test]
fn cross_encoding_equivalence() {
    let rows = [1, 1, 2, 3, 3, 3, 1];

    let mut dict = DictColumn::<i64>::new("col");
    let mut runs = RunColumn::<i64>::new("col");
    let mut bv = BitVecColumn::<i64>::new("col");
    for &v in &rows {
        dict.append(v).unwrap();
        runs.append(v).unwrap();
        bv.append(v).unwrap();
    }

    for tid in 0..rows.len() {
        let expected = Some(crate::Value::Int(rows[tid]));
        assert_eq!(dict.get(tid), expected);
        assert_eq!(runs.get(tid), expected);
        assert_eq!(bv.get(tid), expected);
    }
}

#[test]
fn float_and_varchar_elements_round_trip_through_encodings() {
    let mut floats = DictColumn::<OrderedFloat<f64>>::new("col");
    floats.append(OrderedFloat(1.5)).unwrap();
    floats.append(OrderedFloat(1.5)).unwrap();
    floats.append(OrderedFloat(2.25)).unwrap();
    assert_eq!(floats.get(2), Some(crate::Value::Float(2.25)));

    let mut strings = RunColumn::<String>::new("col");
    strings.append("a".to_string()).unwrap();
    strings.append("a".to_string()).unwrap();
    strings.append("b".to_string()).unwrap();
    assert_eq!(strings.get(1), Some(crate::Value::Str("a".to_string())));
    assert_eq!(strings.size(), 3);
}

#[test]
fn dict_store_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let mut col = DictColumn::<i64>::new("rowid");
    for v in [1, 2, 1, 3] {
        col.append(v).unwrap();
    }
    col.store(dir.path()).unwrap();
    let loaded = DictColumn::<i64>::load("rowid", dir.path()).unwrap();
    assert_eq!(loaded.size(), col.size());
    for tid in 0..col.size() {
        assert_eq!(loaded.get(tid), col.get(tid));
    }
}

#[test]
fn runs_store_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let mut col = RunColumn::<i64>::new("rowid");
    for v in [1, 1, 2, 2, 2, 3] {
        col.append(v).unwrap();
    }
    col.store(dir.path()).unwrap();
    let loaded = RunColumn::<i64>::load("rowid", dir.path()).unwrap();
    assert_eq!(loaded.size(), col.size());
    for tid in 0..col.size() {
        assert_eq!(loaded.get(tid), col.get(tid));
    }
}

#[test]
fn bitvec_store_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let mut col = BitVecColumn::<String>::new("rowid");
    for v in ["x", "y", "x", "z"] {
        col.append(v.to_string()).unwrap();
    }
    col.store(dir.path()).unwrap();
    let loaded = BitVecColumn::<String>::load("rowid", dir.path()).unwrap();
    assert_eq!(loaded.size(), col.size());
    for tid in 0..col.size() {
        assert_eq!(loaded.get(tid), col.get(tid));
    }
}

#[test]
fn copy_is_independent_of_original() {
    let mut col = DictColumn::<i64>::new("col");
    col.append(1).unwrap();
    let snapshot = col.copy();
    col.append(2).unwrap();
    assert_eq!(snapshot.size(), 1);
    assert_eq!(col.size(), 2);
}

#[test]
fn clear_resets_size_and_bytes() {
    let mut col = RunColumn::<i64>::new("col");
    for v in [1, 1, 2] {
        col.append(v).unwrap();
    }
    col.clear();
    assert_eq!(col.size(), 0);
    assert_eq!(col.get(0), None);
}
