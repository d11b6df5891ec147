use ordered_float::OrderedFloat;
use std::io::Result as IoResult;

use crate::ioutil::{Reader, ReaderExt, Writer, WriterExt};

/// The element-type tag an abstract column is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Int,
    Float,
    Varchar,
}

/// A dynamically-typed value, standing in for the "any" container the
/// external column base would otherwise hand us. `None` is the "empty"
/// case the spec calls out for `append_any`/`update`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> ElementKind {
        match self {
            Value::Int(_) => ElementKind::Int,
            Value::Float(_) => ElementKind::Float,
            Value::Str(_) => ElementKind::Varchar,
        }
    }
}

/// The element type of one column instance. Implemented for the three
/// payload types the test harness drives: `i64`, `OrderedFloat<f64>`, and
/// `String`.
pub trait ColumnElement: Clone + Eq + Ord + std::fmt::Debug + Sized {
    const KIND: ElementKind;

    fn from_value(v: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;

    /// Approximate resident bytes for one stored copy of this value,
    /// used by `bytes_used`.
    fn approx_size(&self) -> usize;

    /// Persistence codec, grounded in the teacher's length-prefixed /
    /// fixed-width little-endian primitive encoding idiom (see ioutil.rs).
    fn write_to(&self, wr: &mut impl Writer) -> IoResult<()>;
    fn read_from(rd: &mut impl Reader) -> IoResult<Self>;
}

impl ColumnElement for i64 {
    const KIND: ElementKind = ElementKind::Int;

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
    fn approx_size(&self) -> usize {
        std::mem::size_of::<i64>()
    }
    fn write_to(&self, wr: &mut impl Writer) -> IoResult<()> {
        wr.write_i64(*self)
    }
    fn read_from(rd: &mut impl Reader) -> IoResult<Self> {
        rd.read_i64()
    }
}

impl ColumnElement for OrderedFloat<f64> {
    const KIND: ElementKind = ElementKind::Float;

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Float(f) => Some(OrderedFloat(*f)),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Float(self.0)
    }
    fn approx_size(&self) -> usize {
        std::mem::size_of::<f64>()
    }
    fn write_to(&self, wr: &mut impl Writer) -> IoResult<()> {
        wr.write_f64(self.0)
    }
    fn read_from(rd: &mut impl Reader) -> IoResult<Self> {
        Ok(OrderedFloat(rd.read_f64()?))
    }
}

impl ColumnElement for String {
    const KIND: ElementKind = ElementKind::Varchar;

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
    fn approx_size(&self) -> usize {
        std::mem::size_of::<String>() + self.capacity()
    }
    fn write_to(&self, wr: &mut impl Writer) -> IoResult<()> {
        wr.write_str(self)
    }
    fn read_from(rd: &mut impl Reader) -> IoResult<Self> {
        rd.read_str()
    }
}
