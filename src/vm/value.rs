//! Runtime values

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::ast::FunctionDef;
use super::errors::{RuntimeError, VMResult};
use super::Vm;

/// Shared, mutable array
pub type Array = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable table; iteration follows insertion order
pub type Table = Rc<RefCell<IndexMap<TableKey, Value>>>;

/// Host function callable from scripts. `args[0]` is the receiver.
pub type NativeFn = fn(&mut Vm, &[Value]) -> VMResult<Value>;

/// Runtime value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(Rc<str>),
    Array(Array),
    Table(Table),
    Closure(Rc<Closure>),
    Native(NativeFunction),
}

/// Script function value
#[derive(Debug)]
pub struct Closure {
    pub def: Rc<FunctionDef>,
    /// Label of the source the function was compiled from
    pub source: Rc<str>,
}

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Hashable subset of values usable as table keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Integer(i64),
    Bool(bool),
    String(Rc<str>),
}

impl TableKey {
    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Integer(i) => Value::Integer(*i),
            TableKey::Bool(b) => Value::Bool(*b),
            TableKey::String(s) => Value::String(Rc::clone(s)),
        }
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        TableKey::String(Rc::from(s))
    }
}

impl fmt::Display for TableKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            TableKey::Integer(i) => write!(f, "{}", i),
            TableKey::Bool(b) => write!(f, "{}", b),
            TableKey::String(s) => f.write_str(s),
        }
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    pub fn new_array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn new_table() -> Self {
        Value::Table(Rc::new(RefCell::new(IndexMap::new())))
    }

    /// Name reported by `typeof`
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Closure(_) | Value::Native(_) => "function",
        }
    }

    /// `null`, `false` and numeric zero are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            _ => true,
        }
    }

    pub fn to_key(&self) -> VMResult<TableKey> {
        match self {
            Value::Integer(i) => Ok(TableKey::Integer(*i)),
            Value::Bool(b) => Ok(TableKey::Bool(*b)),
            Value::String(s) => Ok(TableKey::String(Rc::clone(s))),
            other => Err(RuntimeError::InvalidKey(other.type_name())),
        }
    }

    /// Identity for reference types, value equality for the rest
    pub fn raw_equals(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Containers nested deeper than this render as `...`
pub const MAX_RENDER_DEPTH: usize = 64;

/// Console rendering: strings raw, containers expanded
impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

impl Value {
    /// `open` holds the containers currently being written; one that shows
    /// up again inside itself renders as `(cycle)`
    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        open: &mut Vec<*const ()>,
    ) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if open.contains(&ptr) {
                    return f.write_str("(cycle)");
                }
                if open.len() >= MAX_RENDER_DEPTH {
                    return f.write_str("...");
                }
                open.push(ptr);
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.render(f, open)?;
                }
                open.pop();
                f.write_str("]")
            }
            Value::Table(slots) => {
                let ptr = Rc::as_ptr(slots) as *const ();
                if open.contains(&ptr) {
                    return f.write_str("(cycle)");
                }
                if open.len() >= MAX_RENDER_DEPTH {
                    return f.write_str("...");
                }
                open.push(ptr);
                f.write_str("{")?;
                for (i, (key, value)) in slots.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}=", key)?;
                    value.render(f, open)?;
                }
                open.pop();
                f.write_str("}")
            }
            Value::Closure(c) => match &c.def.name {
                Some(name) => write!(f, "(function : {})", name),
                None => write!(f, "(function : {:p})", Rc::as_ptr(c)),
            },
            Value::Native(n) => write!(f, "(native function : {})", n.name),
        }
    }
}

/// `%g`-style float formatting: six significant digits, no trailing zeros
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let exponent = x.abs().log10().floor() as i32;
    if !(-4..6).contains(&exponent) {
        let formatted = format!("{:.5e}", x);
        let (mantissa, exp) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs());
    }

    let decimals = (5 - exponent).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, x)).to_string()
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
