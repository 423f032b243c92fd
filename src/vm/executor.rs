//! Tree-walking executor
//!
//! Every expression leaves exactly one value on the VM's working stack, so
//! operands, call arguments and container elements all live there while they
//! are being built. An error aborts evaluation where it happens and may leave
//! partial values behind; callers that care restore the stack depth.

use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::ast::{AssignOp, BinOp, Expr, Literal, Stmt, UnOp};
use super::errors::{RuntimeError, VMResult};
use super::value::{Closure, TableKey, Value};
use super::Vm;
use crate::util::stack::ensure_sufficient_stack;

/// Activation of one script function
struct Frame {
    this: Value,
    locals: Vec<(Rc<str>, Value)>,
    /// Source label inherited by closures created in this frame
    source: Rc<str>,
}

/// How a statement finished
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl Vm {
    /// Pop the callee and `params` arguments; push the result if asked.
    pub(crate) fn call_on_stack(
        &mut self,
        params: usize,
        want_return: bool,
    ) -> VMResult<()> {
        let base = self
            .stack
            .len()
            .checked_sub(params + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        let args = self.stack.split_off(base + 1);
        let callee = self.stack.pop().unwrap_or_default();

        let result = self.invoke(callee, args)?;
        if want_return {
            self.stack.push(result);
        }
        Ok(())
    }

    /// Call `callee`; `args[0]` is the receiver
    pub(crate) fn invoke(
        &mut self,
        callee: Value,
        args: Vec<Value>,
    ) -> VMResult<Value> {
        match callee {
            Value::Closure(closure) => self.invoke_closure(&closure, args),
            Value::Native(native) => (native.func)(self, &args),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn invoke_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
    ) -> VMResult<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow);
        }

        let def = &closure.def;
        let mut args = args.into_iter();
        let this = args.next().unwrap_or_default();
        let rest: Vec<Value> = args.collect();
        let arity_ok = if def.variadic {
            rest.len() >= def.params.len()
        } else {
            rest.len() == def.params.len()
        };
        if !arity_ok {
            return Err(RuntimeError::WrongParameterCount);
        }

        let mut frame = Frame {
            this,
            locals: def.params.iter().cloned().zip(rest).collect(),
            source: Rc::clone(&closure.source),
        };

        trace!(depth = self.depth, name = ?def.name, "entering function");
        self.depth += 1;
        let flow = self.exec_block(&def.body, &mut frame);
        self.depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    fn exec_block(
        &mut self,
        stmts: &[Stmt],
        frame: &mut Frame,
    ) -> VMResult<Flow> {
        let mark = frame.locals.len();
        let mut flow = Flow::Normal;
        for stmt in stmts {
            flow = self.exec_stmt(stmt, frame)?;
            if !matches!(flow, Flow::Normal) {
                break;
            }
        }
        frame.locals.truncate(mark);
        Ok(flow)
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
        frame: &mut Frame,
    ) -> VMResult<Flow> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(stmt, frame))
    }

    fn exec_stmt_inner(
        &mut self,
        stmt: &Stmt,
        frame: &mut Frame,
    ) -> VMResult<Flow> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval_value(expr, frame)?;
            }
            Stmt::Local(decls) => {
                for (name, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval_value(expr, frame)?,
                        None => Value::Null,
                    };
                    frame.locals.push((Rc::clone(name), value));
                }
            }
            Stmt::Function(def) => {
                let name = def.name.as_deref().unwrap_or_default();
                let closure = Value::Closure(Rc::new(Closure {
                    def: Rc::clone(def),
                    source: Rc::clone(&frame.source),
                }));
                set_slot(&frame.this, Value::string(name), closure, true)?;
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_value(expr, frame)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_value(cond, frame)?.is_truthy() {
                    return self.exec_stmt(then, frame);
                } else if let Some(otherwise) = otherwise {
                    return self.exec_stmt(otherwise, frame);
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_value(cond, frame)?.is_truthy() {
                    match self.exec_stmt(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                let mark = frame.locals.len();
                let flow = self.exec_for(init.as_deref(), cond.as_ref(), step.as_ref(), body, frame);
                frame.locals.truncate(mark);
                return flow;
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Block(stmts) => return self.exec_block(stmts, frame),
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        frame: &mut Frame,
    ) -> VMResult<Flow> {
        if let Some(init) = init {
            self.exec_stmt(init, frame)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.eval_value(cond, frame)?.is_truthy() {
                    break;
                }
            }
            match self.exec_stmt(body, frame)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            if let Some(step) = step {
                self.eval_value(step, frame)?;
            }
        }
        Ok(Flow::Normal)
    }

    /// Evaluate and take the result back off the stack
    fn eval_value(
        &mut self,
        expr: &Expr,
        frame: &mut Frame,
    ) -> VMResult<Value> {
        self.eval_expr(expr, frame)?;
        self.pop()
    }

    /// Evaluate `expr`, pushing exactly one value on success
    fn eval_expr(
        &mut self,
        expr: &Expr,
        frame: &mut Frame,
    ) -> VMResult<()> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr, frame))
    }

    fn eval_expr_inner(
        &mut self,
        expr: &Expr,
        frame: &mut Frame,
    ) -> VMResult<()> {
        match expr {
            Expr::Lit(lit) => self.stack.push(literal_value(lit)),
            Expr::Ident(name) => {
                let value = self.lookup(frame, name)?;
                self.stack.push(value);
            }
            Expr::This => self.stack.push(frame.this.clone()),
            Expr::Array(items) => {
                for item in items {
                    self.eval_expr(item, frame)?;
                }
                let values = self.pop_n(items.len())?;
                self.stack.push(Value::new_array(values));
            }
            Expr::Table(slots) => {
                for (key, value) in slots {
                    self.eval_expr(key, frame)?;
                    self.eval_expr(value, frame)?;
                }
                let values = self.pop_n(slots.len() * 2)?;
                let mut table = IndexMap::with_capacity(slots.len());
                let mut values = values.into_iter();
                while let (Some(key), Some(value)) = (values.next(), values.next()) {
                    table.insert(key.to_key()?, value);
                }
                self.stack
                    .push(Value::Table(Rc::new(std::cell::RefCell::new(table))));
            }
            Expr::Function(def) => {
                self.stack.push(Value::Closure(Rc::new(Closure {
                    def: Rc::clone(def),
                    source: Rc::clone(&frame.source),
                })));
            }
            Expr::UnOp { op, expr } => {
                self.eval_expr(expr, frame)?;
                let operand = self.pop()?;
                self.stack.push(unary(*op, &operand)?);
            }
            Expr::BinOp {
                op: op @ (BinOp::And | BinOp::Or),
                lhs,
                rhs,
            } => {
                self.eval_expr(lhs, frame)?;
                let lhs_truthy = self.peek_top().is_some_and(Value::is_truthy);
                let short_circuit = if *op == BinOp::And {
                    !lhs_truthy
                } else {
                    lhs_truthy
                };
                if !short_circuit {
                    self.pop()?;
                    self.eval_expr(rhs, frame)?;
                }
            }
            Expr::BinOp { op, lhs, rhs } => {
                self.eval_expr(lhs, frame)?;
                self.eval_expr(rhs, frame)?;
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.stack.push(binary(*op, &lhs, &rhs)?);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_value(cond, frame)?.is_truthy() {
                    self.eval_expr(then, frame)?;
                } else {
                    self.eval_expr(otherwise, frame)?;
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, frame)?,
            Expr::Call { callee, args } => {
                match callee.as_ref() {
                    Expr::Field { object, name } => {
                        let receiver = self.eval_value(object, frame)?;
                        let function = get_slot(&receiver, &Value::String(Rc::clone(name)))?;
                        self.stack.push(function);
                        self.stack.push(receiver);
                    }
                    Expr::Index { object, index } => {
                        let receiver = self.eval_value(object, frame)?;
                        let key = self.eval_value(index, frame)?;
                        let function = get_slot(&receiver, &key)?;
                        self.stack.push(function);
                        self.stack.push(receiver);
                    }
                    other => {
                        self.eval_expr(other, frame)?;
                        self.stack.push(frame.this.clone());
                    }
                }
                for arg in args {
                    self.eval_expr(arg, frame)?;
                }
                self.call_on_stack(args.len() + 1, true)?;
            }
            Expr::Field { object, name } => {
                let object = self.eval_value(object, frame)?;
                let value = get_slot(&object, &Value::String(Rc::clone(name)))?;
                self.stack.push(value);
            }
            Expr::Index { object, index } => {
                self.eval_expr(object, frame)?;
                self.eval_expr(index, frame)?;
                let key = self.pop()?;
                let object = self.pop()?;
                self.stack.push(get_slot(&object, &key)?);
            }
        }
        Ok(())
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        frame: &mut Frame,
    ) -> VMResult<()> {
        match target {
            Expr::Ident(name) => {
                let new_value = match op {
                    AssignOp::Compound(bin) => {
                        let current = self.lookup(frame, name)?;
                        let rhs = self.eval_value(value, frame)?;
                        binary(bin, &current, &rhs)?
                    }
                    _ => self.eval_value(value, frame)?,
                };
                if op == AssignOp::NewSlot {
                    set_slot(&frame.this, Value::String(Rc::clone(name)), new_value.clone(), true)?;
                } else {
                    self.assign_name(frame, name, new_value.clone())?;
                }
                self.stack.push(new_value);
            }
            Expr::Field { object, name } => {
                let object = self.eval_value(object, frame)?;
                let key = Value::String(Rc::clone(name));
                let new_value = self.assigned_value(op, &object, &key, value, frame)?;
                set_slot(&object, key, new_value.clone(), op == AssignOp::NewSlot)?;
                self.stack.push(new_value);
            }
            Expr::Index { object, index } => {
                let object = self.eval_value(object, frame)?;
                let key = self.eval_value(index, frame)?;
                let new_value = self.assigned_value(op, &object, &key, value, frame)?;
                set_slot(&object, key, new_value.clone(), op == AssignOp::NewSlot)?;
                self.stack.push(new_value);
            }
            _ => return Err(RuntimeError::Custom("can't assign expression".to_string())),
        }
        Ok(())
    }

    fn assigned_value(
        &mut self,
        op: AssignOp,
        object: &Value,
        key: &Value,
        value: &Expr,
        frame: &mut Frame,
    ) -> VMResult<Value> {
        match op {
            AssignOp::Compound(bin) => {
                let current = get_slot(object, key)?;
                let rhs = self.eval_value(value, frame)?;
                binary(bin, &current, &rhs)
            }
            _ => self.eval_value(value, frame),
        }
    }

    /// Locals, then the receiver, then the root table
    fn lookup(
        &self,
        frame: &Frame,
        name: &Rc<str>,
    ) -> VMResult<Value> {
        if let Some((_, value)) = frame.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        let key = TableKey::String(Rc::clone(name));
        if let Value::Table(this) = &frame.this {
            if let Some(value) = this.borrow().get(&key) {
                return Ok(value.clone());
            }
        }
        self.root
            .borrow()
            .get(&key)
            .cloned()
            .ok_or_else(|| RuntimeError::IndexNotFound(name.to_string()))
    }

    fn assign_name(
        &mut self,
        frame: &mut Frame,
        name: &Rc<str>,
        value: Value,
    ) -> VMResult<()> {
        if let Some((_, slot)) = frame.locals.iter_mut().rev().find(|(n, _)| n == name) {
            *slot = value;
            return Ok(());
        }
        let key = TableKey::String(Rc::clone(name));
        if let Value::Table(this) = &frame.this {
            if let Some(slot) = this.borrow_mut().get_mut(&key) {
                *slot = value;
                return Ok(());
            }
        }
        match self.root.borrow_mut().get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::IndexNotFound(name.to_string())),
        }
    }

    fn peek_top(&self) -> Option<&Value> {
        self.stack.last()
    }

    fn pop_n(
        &mut self,
        n: usize,
    ) -> VMResult<Vec<Value>> {
        let base = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(base))
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(Rc::clone(s)),
    }
}

/// Read `object[key]`
pub(crate) fn get_slot(
    object: &Value,
    key: &Value,
) -> VMResult<Value> {
    match object {
        Value::Table(table) => {
            let key = key.to_key()?;
            table
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| RuntimeError::IndexNotFound(key.to_string()))
        }
        Value::Array(items) => {
            let items = items.borrow();
            array_index(key, items.len()).map(|i| items[i].clone())
        }
        Value::String(s) => {
            let bytes = s.as_bytes();
            array_index(key, bytes.len()).map(|i| Value::Integer(i64::from(bytes[i])))
        }
        other => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

/// Write `object[key]`; `create` allows new table slots
pub(crate) fn set_slot(
    object: &Value,
    key: Value,
    value: Value,
    create: bool,
) -> VMResult<()> {
    match object {
        Value::Table(table) => {
            let key = key.to_key()?;
            let mut table = table.borrow_mut();
            if create || table.contains_key(&key) {
                table.insert(key, value);
                Ok(())
            } else {
                Err(RuntimeError::IndexNotFound(key.to_string()))
            }
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = array_index(&key, items.len())?;
            items[i] = value;
            Ok(())
        }
        other => Err(RuntimeError::NotIndexable(other.type_name())),
    }
}

fn array_index(
    key: &Value,
    len: usize,
) -> VMResult<usize> {
    match key {
        Value::Integer(i) if *i >= 0 && (*i as usize) < len => Ok(*i as usize),
        Value::Integer(i) => Err(RuntimeError::IndexNotFound(i.to_string())),
        other => Err(RuntimeError::InvalidKey(other.type_name())),
    }
}

fn unary(
    op: UnOp,
    operand: &Value,
) -> VMResult<Value> {
    match (op, operand) {
        (UnOp::Neg, Value::Integer(i)) => Ok(Value::Integer(i.wrapping_neg())),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Neg, other) => Err(RuntimeError::Unary {
            op: "-",
            operand: other.type_name(),
        }),
        (UnOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnOp::Typeof, value) => Ok(Value::string(value.type_name())),
    }
}

pub(crate) fn binary(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
) -> VMResult<Value> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(lhs.raw_equals(rhs))),
        BinOp::Neq => return Ok(Value::Bool(!lhs.raw_equals(rhs))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(lhs, rhs)?;
            let result = match op {
                BinOp::Lt => ordering == Some(Ordering::Less),
                BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinOp::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };
            return Ok(Value::Bool(result));
        }
        BinOp::And => {
            return Ok(if lhs.is_truthy() { rhs.clone() } else { lhs.clone() });
        }
        BinOp::Or => {
            return Ok(if lhs.is_truthy() { lhs.clone() } else { rhs.clone() });
        }
        BinOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            return Ok(Value::string(&format!("{}{}", lhs, rhs)));
        }
        _ => {}
    }

    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => integer_arith(op, *a, *b),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let a = as_float(lhs);
            let b = as_float(rhs);
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Float(result))
        }
        _ => Err(RuntimeError::Arithmetic {
            op: op.symbol(),
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

fn integer_arith(
    op: BinOp,
    a: i64,
    b: i64,
) -> VMResult<Value> {
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Mod if b == 0 => return Err(RuntimeError::DivisionByZero),
        BinOp::Div => a.wrapping_div(b),
        _ => a.wrapping_rem(b),
    };
    Ok(Value::Integer(result))
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        _ => 0.0,
    }
}

fn compare(
    lhs: &Value,
    rhs: &Value,
) -> VMResult<Option<Ordering>> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            Ok(as_float(lhs).partial_cmp(&as_float(rhs)))
        }
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => Err(RuntimeError::Comparison(lhs.type_name(), rhs.type_name())),
    }
}
