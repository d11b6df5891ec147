use std::path::Path;

use packedcol_base::{err, Result};

use crate::column::Column;
use crate::ioutil::{ReaderExt, WriterExt};
use crate::value::{ColumnElement, Value};

/// Run-length-encoded column: `runs` is a sequence of maximal `(count,
/// value)` pairs — no two adjacent runs ever share a value — and
/// `cached_size` tracks their count sum.
///
/// `update` rebuilds the up-to-three runs touching a TID by flattening them
/// to a row sequence, overwriting the one row, and re-compressing — the same
/// shape as a run-end-encode scan that detects value-change boundaries in a
/// flat sequence. `remove` re-merges the neighbors of an excised run so two
/// adjacent runs never end up sharing a value.
#[derive(Clone, Debug)]
pub struct RunColumn<T: ColumnElement> {
    name: String,
    runs: Vec<(u64, T)>,
    cached_size: u64,
}

impl<T: ColumnElement> RunColumn<T> {
    pub fn new(name: impl Into<String>) -> Self {
        RunColumn {
            name: name.into(),
            runs: Vec::new(),
            cached_size: 0,
        }
    }

    /// Locates the run containing TID `t` and `t`'s offset within it.
    fn locate(&self, t: usize) -> Option<usize> {
        let mut base = 0u64;
        for (i, (count, _)) in self.runs.iter().enumerate() {
            if (t as u64) < base + count {
                return Some(i);
            }
            base += count;
        }
        None
    }

    fn expand_into(&self, run_idx: usize, out: &mut Vec<T>) {
        let (count, value) = &self.runs[run_idx];
        for _ in 0..*count {
            out.push(value.clone());
        }
    }

    /// Re-compresses a flat row sequence into maximal runs.
    fn compress(flat: &[T]) -> Vec<(u64, T)> {
        let mut out: Vec<(u64, T)> = Vec::new();
        for v in flat {
            if let Some(last) = out.last_mut() {
                if last.1 == *v {
                    last.0 += 1;
                    continue;
                }
            }
            out.push((1, v.clone()));
        }
        out
    }
}

impl<T: ColumnElement> Column<T> for RunColumn<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, value: T) -> Result<()> {
        match self.runs.last_mut() {
            Some(last) if last.1 == value => last.0 += 1,
            _ => self.runs.push((1, value)),
        }
        self.cached_size += 1;
        Ok(())
    }

    fn get(&self, tid: usize) -> Option<Value> {
        if tid as u64 >= self.cached_size {
            return None;
        }
        let i = self.locate(tid)?;
        Some(self.runs[i].1.to_value())
    }

    fn update(&mut self, tid: usize, value: T) -> Result<()> {
        if tid as u64 >= self.cached_size {
            return Err(err("update: tid out of range"));
        }
        let i = self.locate(tid).expect("tid within cached_size must locate a run");
        if self.runs[i].1 == value {
            return Ok(());
        }

        let lo = if i > 0 { i - 1 } else { i };
        let hi = if i + 1 < self.runs.len() { i + 1 } else { i };

        let mut flat = Vec::new();
        for r in lo..=hi {
            self.expand_into(r, &mut flat);
        }

        // Position of `tid` within the flattened window.
        let mut base = 0u64;
        for r in 0..lo {
            base += self.runs[r].0;
        }
        let offset = (tid as u64 - base) as usize;
        flat[offset] = value;

        let recompressed = Self::compress(&flat);
        self.runs.splice(lo..=hi, recompressed);
        Ok(())
    }

    fn remove(&mut self, tid: usize) -> Result<()> {
        if tid as u64 >= self.cached_size {
            return Err(err("remove: tid out of range"));
        }
        let i = self.locate(tid).expect("tid within cached_size must locate a run");
        self.runs[i].0 -= 1;
        self.cached_size -= 1;
        if self.runs[i].0 == 0 {
            self.runs.remove(i);
            // Re-merge the neighbors that are now adjacent, if they match.
            if i > 0 && i < self.runs.len() && self.runs[i - 1].1 == self.runs[i].1 {
                tracing::trace!(target: "packedcol", i, "runs: re-merging neighbors after excision");
                let merged_count = self.runs[i - 1].0 + self.runs[i].0;
                self.runs[i - 1].0 = merged_count;
                self.runs.remove(i);
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.runs.clear();
        self.cached_size = 0;
    }

    fn size(&self) -> usize {
        self.cached_size as usize
    }

    fn bytes_used(&self) -> usize {
        let per_run = std::mem::size_of::<u64>()
            + self
                .runs
                .first()
                .map(|(_, v)| v.approx_size())
                .unwrap_or_else(|| std::mem::size_of::<T>());
        self.runs.capacity() * per_run
    }

    fn print(&self) {
        println!("| runs column \"{}\" |", self.name);
        println!("________________________");
        for (count, value) in &self.runs {
            println!("| {} | {:?} |", count, value);
        }
        println!("| rows |");
        println!("________________________");
        let mut tid = 0usize;
        for (count, value) in &self.runs {
            for _ in 0..*count {
                println!("| {} | {:?} |", tid, value);
                tid += 1;
            }
        }
    }

    fn store(&self, dir: &Path) -> Result<()> {
        let mut wr = crate::ioutil::create_column_file(dir, &self.name)?;
        wr.write_u32(self.runs.len() as u32)?;
        for (count, value) in &self.runs {
            wr.write_u64(*count)?;
            value.write_to(&mut wr)?;
        }
        Ok(())
    }
}

impl<T: ColumnElement> RunColumn<T> {
    pub fn load(name: impl Into<String>, dir: &Path) -> Result<Self> {
        let name = name.into();
        let mut rd = crate::ioutil::open_column_file(dir, &name)?;
        let run_count = rd.read_u32()? as usize;
        let mut runs = Vec::with_capacity(run_count);
        let mut cached_size = 0u64;
        for _ in 0..run_count {
            let count = rd.read_u64()?;
            let value = T::read_from(&mut rd)?;
            cached_size += count;
            runs.push((count, value));
        }
        Ok(RunColumn {
            name,
            runs,
            cached_size,
        })
    }
}
