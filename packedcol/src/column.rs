use std::ops::{Deref, DerefMut};
use std::path::Path;

use packedcol_base::{err, Result};

use crate::value::{ColumnElement, ElementKind, Value};

/// The abstract positional-column contract every encoding in this crate
/// implements. `T` is the element type fixed per instance; `Value` plays
/// the role of the dynamically-typed "any" container an external caller
/// would otherwise hand us.
pub trait Column<T: ColumnElement>: Sized {
    fn name(&self) -> &str;

    fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Appends at TID = size(), incrementing size().
    fn append(&mut self, value: T) -> Result<()>;

    /// Appends a dynamically-typed value, failing on type mismatch or an
    /// absent value.
    fn append_value(&mut self, value: Option<Value>) -> Result<()> {
        match value {
            None => Err(err("append_value: value is empty")),
            Some(v) => match T::from_value(&v) {
                Some(t) => self.append(t),
                None => Err(err("append_value: dynamic type does not match column element type")),
            },
        }
    }

    /// Appends every element in order, stopping at the first failure.
    /// An empty range is itself a failure.
    fn append_range(&mut self, values: &[T]) -> Result<()> {
        if values.is_empty() {
            return Err(err("append_range: empty range"));
        }
        for v in values {
            self.append(v.clone())?;
        }
        Ok(())
    }

    /// Returns the value at `tid`, or `None` if `tid >= size()`.
    fn get(&self, tid: usize) -> Option<Value>;

    fn update(&mut self, tid: usize, value: T) -> Result<()>;

    fn update_value(&mut self, tid: usize, value: Option<Value>) -> Result<()> {
        match value {
            None => Err(err("update_value: value is empty")),
            Some(v) => match T::from_value(&v) {
                Some(t) => self.update(tid, t),
                None => Err(err("update_value: dynamic type does not match column element type")),
            },
        }
    }

    /// Applies `update` for each tid in the given order; any failure aborts.
    fn update_positions(&mut self, tids: &[usize], value: T) -> Result<()> {
        for &tid in tids {
            self.update(tid, value.clone())?;
        }
        Ok(())
    }

    fn remove(&mut self, tid: usize) -> Result<()>;

    /// Removes each tid in the order given. Correct bulk removal requires
    /// the caller to pass tids in strictly descending order (removing low
    /// tids first would shift the positions of tids still to come); this is
    /// validated rather than silently tolerated.
    fn remove_positions(&mut self, tids: &[usize]) -> Result<()> {
        let mut prev: Option<usize> = None;
        for &tid in tids {
            if let Some(p) = prev {
                if tid >= p {
                    return Err(err(
                        "remove_positions: positions must be strictly descending",
                    ));
                }
            }
            self.remove(tid)?;
            prev = Some(tid);
        }
        Ok(())
    }

    fn clear(&mut self);

    fn size(&self) -> usize;

    /// Approximate resident bytes, computed from the encoded state.
    fn bytes_used(&self) -> usize;

    /// Deep copy of state.
    fn copy(&self) -> Self
    where
        Self: Clone,
    {
        self.clone()
    }

    /// Emits a human-readable dump to standard output, showing every
    /// distinct value and the logical column. The exact format is
    /// unspecified.
    fn print(&self);

    fn store(&self, dir: &Path) -> Result<()>;

    /// Returns a mutable handle to a stored representative of the value at
    /// `index`. See [`Subscript`] for how the write-through hazard is
    /// resolved.
    fn subscript(&mut self, index: usize) -> Result<Subscript<'_, Self, T>> {
        let current = self
            .get(index)
            .and_then(|v| T::from_value(&v))
            .ok_or_else(|| err("subscript: index out of range"))?;
        Ok(Subscript {
            owner: self,
            tid: index,
            value: current,
            committed: false,
        })
    }
}

/// A guard returned by [`Column::subscript`]. It snapshots the value at the
/// subscripted position and lets the caller mutate the snapshot through
/// `Deref`/`DerefMut`. The snapshot is fed back through the owning column's
/// own `update` on `commit()`, or automatically on `Drop` if the caller
/// never calls `commit()` explicitly.
///
/// Rather than handing out a raw reference into dictionary or bit-vector
/// storage (which a careless write could use to silently collide two
/// distinct values and corrupt the encoding's own bookkeeping), every write
/// through a `Subscript` re-enters `update`, which always re-establishes the
/// encoding's invariants.
pub struct Subscript<'a, C: Column<T>, T: ColumnElement> {
    owner: &'a mut C,
    tid: usize,
    value: T,
    committed: bool,
}

impl<'a, C: Column<T>, T: ColumnElement> Subscript<'a, C, T> {
    /// Writes the (possibly mutated) snapshot back through `update` and
    /// reports failure, rather than swallowing it as `Drop` must.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        self.owner.update(self.tid, self.value.clone())
    }
}

impl<'a, C: Column<T>, T: ColumnElement> Deref for Subscript<'a, C, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<'a, C: Column<T>, T: ColumnElement> DerefMut for Subscript<'a, C, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<'a, C: Column<T>, T: ColumnElement> Drop for Subscript<'a, C, T> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.owner.update(self.tid, self.value.clone()) {
            tracing::error!(target: "packedcol", error = ?e, "subscript write-back on drop failed");
        }
    }
}
