//! Functions registered in every root table

use super::errors::{RuntimeError, VMResult};
use super::value::{NativeFn, Value};
use super::Vm;

/// Largest array `array(n)` will allocate
pub const MAX_ARRAY_LEN: usize = 1 << 24;

pub(crate) const BUILTINS: &[(&str, NativeFn)] = &[
    ("print", print),
    ("error", error),
    ("type", type_of),
    ("len", len),
    ("tostring", tostring),
    ("array", array),
    ("assert", assert),
];

/// Arguments after the receiver
fn params(args: &[Value]) -> &[Value] {
    args.get(1..).unwrap_or_default()
}

fn single(args: &[Value]) -> VMResult<&Value> {
    match params(args) {
        [value] => Ok(value),
        _ => Err(RuntimeError::WrongParameterCount),
    }
}

fn joined(args: &[Value]) -> String {
    params(args).iter().map(ToString::to_string).collect()
}

fn print(
    vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    if let Some(handler) = vm.print_handler() {
        handler.on_print(&joined(args));
    }
    Ok(Value::Null)
}

fn error(
    vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    if let Some(handler) = vm.print_handler() {
        handler.on_error(&joined(args));
    }
    Ok(Value::Null)
}

fn type_of(
    _vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    Ok(Value::string(single(args)?.type_name()))
}

fn len(
    _vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    let n = match single(args)? {
        Value::String(s) => s.len(),
        Value::Array(items) => items.borrow().len(),
        Value::Table(slots) => slots.borrow().len(),
        other => {
            return Err(RuntimeError::Custom(format!(
                "len: '{}' has no length",
                other.type_name()
            )))
        }
    };
    Ok(Value::Integer(n as i64))
}

fn tostring(
    _vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    Ok(Value::string(&single(args)?.to_string()))
}

fn array(
    _vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    let (size, fill) = match params(args) {
        [size] => (size, Value::Null),
        [size, fill] => (size, fill.clone()),
        _ => return Err(RuntimeError::WrongParameterCount),
    };
    match size {
        Value::Integer(n) if *n >= 0 => {
            let len = usize::try_from(*n)
                .ok()
                .filter(|&len| len <= MAX_ARRAY_LEN)
                .ok_or_else(|| RuntimeError::Custom("array: size too large".to_string()))?;
            let mut items = Vec::new();
            items
                .try_reserve_exact(len)
                .map_err(|_| RuntimeError::Custom("array: size too large".to_string()))?;
            items.resize(len, fill);
            Ok(Value::new_array(items))
        }
        other => Err(RuntimeError::Custom(format!(
            "array: invalid size of type '{}'",
            other.type_name()
        ))),
    }
}

fn assert(
    _vm: &mut Vm,
    args: &[Value],
) -> VMResult<Value> {
    match params(args) {
        [cond] if cond.is_truthy() => Ok(Value::Null),
        [cond, _] if cond.is_truthy() => Ok(Value::Null),
        [_] => Err(RuntimeError::Custom("assertion failed".to_string())),
        [_, message] => Err(RuntimeError::Custom(format!("assertion failed: {}", message))),
        _ => Err(RuntimeError::WrongParameterCount),
    }
}
