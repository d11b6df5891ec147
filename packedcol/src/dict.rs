use std::path::Path;

use packedcol_base::{err, Result};

use crate::column::Column;
use crate::ioutil::{ReaderExt, WriterExt};
use crate::value::{ColumnElement, Value};

/// Dictionary-encoded column: `dict` holds distinct values, `code[i]` is the
/// index into `dict` for logical row `i`. Every code stays a valid dict
/// index and every dict entry stays referenced by at least one code; both
/// are re-established by `update`/`remove` after every mutation.
///
/// Reference counts are computed by a linear scan of `code` — no separate
/// counter is maintained — which keeps `append` and `update`
/// O(|dict|)/O(|code|) rather than introducing a reverse index (see
/// DESIGN.md).
#[derive(Clone, Debug)]
pub struct DictColumn<T: ColumnElement> {
    name: String,
    dict: Vec<T>,
    code: Vec<u32>,
}

impl<T: ColumnElement> DictColumn<T> {
    pub fn new(name: impl Into<String>) -> Self {
        DictColumn {
            name: name.into(),
            dict: Vec::new(),
            code: Vec::new(),
        }
    }

    fn reference_count(&self, dict_idx: u32) -> usize {
        self.code.iter().filter(|&&c| c == dict_idx).count()
    }

    /// Exposed for invariant assertions (D1/D2) in the test module, which
    /// has no other way to inspect `dict`/`code` from outside this file.
    #[cfg(test)]
    pub(crate) fn dict_len(&self) -> usize {
        self.dict.len()
    }

    #[cfg(test)]
    pub(crate) fn codes(&self) -> &[u32] {
        &self.code
    }

    /// Removes `dict[idx]` and shifts every code greater than `idx` down by
    /// one, keeping every remaining code a valid dict index.
    fn excise_dict_entry(&mut self, idx: u32) {
        self.dict.remove(idx as usize);
        for c in self.code.iter_mut() {
            if *c > idx {
                *c -= 1;
            }
        }
    }
}

impl<T: ColumnElement> Column<T> for DictColumn<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, value: T) -> Result<()> {
        match self.dict.iter().position(|d| *d == value) {
            Some(k) => self.code.push(k as u32),
            None => {
                self.dict.push(value);
                self.code.push((self.dict.len() - 1) as u32);
            }
        }
        Ok(())
    }

    fn get(&self, tid: usize) -> Option<Value> {
        self.code
            .get(tid)
            .map(|&c| self.dict[c as usize].to_value())
    }

    fn update(&mut self, tid: usize, value: T) -> Result<()> {
        if tid >= self.code.len() {
            return Err(err("update: tid out of range"));
        }
        let old = self.code[tid];
        if self.dict[old as usize] == value {
            // Updating a row to the value it already holds. Falling through
            // to the general algorithm below would, when `old` is
            // singly-referenced, excise the very entry `code[tid]` still
            // points at (since `j == old` is not `> old`) and leave a
            // dangling code — a latent bug in the source this crate does
            // not reproduce. See DESIGN.md.
            return Ok(());
        }
        match self.dict.iter().position(|d| *d == value) {
            None => {
                if self.reference_count(old) == 1 {
                    tracing::trace!(target: "packedcol", tid, "dict: in-place rename of singly-referenced entry");
                    self.dict[old as usize] = value;
                } else {
                    self.dict.push(value);
                    self.code[tid] = (self.dict.len() - 1) as u32;
                }
            }
            Some(j) => {
                let j = j as u32;
                self.code[tid] = j;
                if self.reference_count(old) == 0 {
                    tracing::trace!(target: "packedcol", tid, old, "dict: compacting orphaned entry");
                    self.excise_dict_entry(old);
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, tid: usize) -> Result<()> {
        if tid >= self.code.len() {
            return Err(err("remove: tid out of range"));
        }
        let old = self.code[tid];
        self.code.remove(tid);
        if self.reference_count(old) == 0 {
            self.excise_dict_entry(old);
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.dict.clear();
        self.code.clear();
    }

    fn size(&self) -> usize {
        self.code.len()
    }

    fn bytes_used(&self) -> usize {
        let dict_bytes: usize = self.dict.iter().map(|v| v.approx_size()).sum();
        let dict_cap_overhead = self.dict.capacity().saturating_sub(self.dict.len())
            * std::mem::size_of::<T>().max(1);
        let code_bytes = self.code.capacity() * std::mem::size_of::<u32>();
        dict_bytes + dict_cap_overhead + code_bytes
    }

    fn print(&self) {
        println!("| dict column \"{}\" |", self.name);
        println!("________________________");
        for (i, v) in self.dict.iter().enumerate() {
            println!("| {} | {:?} |", i, v);
        }
        println!("| rows |");
        println!("________________________");
        for (tid, &c) in self.code.iter().enumerate() {
            println!("| {} | {:?} |", tid, self.dict[c as usize]);
        }
    }

    fn store(&self, dir: &Path) -> Result<()> {
        let mut wr = crate::ioutil::create_column_file(dir, &self.name)?;
        wr.write_u32(self.dict.len() as u32)?;
        for v in &self.dict {
            v.write_to(&mut wr)?;
        }
        wr.write_u32(self.code.len() as u32)?;
        for &c in &self.code {
            wr.write_u32(c)?;
        }
        Ok(())
    }
}

impl<T: ColumnElement> DictColumn<T> {
    pub fn load(name: impl Into<String>, dir: &Path) -> Result<Self> {
        let name = name.into();
        let mut rd = crate::ioutil::open_column_file(dir, &name)?;
        let dict_len = rd.read_u32()? as usize;
        let mut dict = Vec::with_capacity(dict_len);
        for _ in 0..dict_len {
            dict.push(T::read_from(&mut rd)?);
        }
        let code_len = rd.read_u32()? as usize;
        let mut code = Vec::with_capacity(code_len);
        for _ in 0..code_len {
            code.push(rd.read_u32()?);
        }
        Ok(DictColumn { name, dict, code })
    }
}
