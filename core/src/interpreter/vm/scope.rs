//! Variable scopes
//!
//! A scope owns the variable slots of one activation (the top level or a
//! function call). Slots stay `None` until assigned; reading an unassigned
//! slot falls through to the enclosing scope by name.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::types::{Closure, Value};

#[derive(Debug)]
pub struct Scope {
    names: Rc<Vec<String>>,
    vars: Vec<Option<Value>>,
    parent: Option<Rc<RefCell<Scope>>>,
}

impl Scope {
    pub fn new(names: Rc<Vec<String>>, parent: Option<Rc<RefCell<Scope>>>) -> Self {
        let vars = vec![None; names.len()];
        Self {
            names,
            vars,
            parent,
        }
    }

    pub fn names(&self) -> &Rc<Vec<String>> {
        &self.names
    }

    /// Value assigned to a slot in this scope only
    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.vars.get(slot).and_then(Option::as_ref)
    }

    pub fn set(&mut self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        let var = self.vars.get_mut(slot).ok_or_else(|| {
            RuntimeError::InvalidBytecode(format!("variable slot {} out of range", slot))
        })?;
        *var = Some(value);
        Ok(())
    }

    /// Resolve a slot: local value first, then enclosing scopes by name
    pub fn lookup(&self, slot: usize) -> Option<Value> {
        if let Some(value) = self.get(slot) {
            return Some(value.clone());
        }
        let name = self.names.get(slot)?;
        self.parent.as_ref()?.borrow().lookup_by_name(name)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Value> {
        // linear search, scopes are small
        let local = self
            .names
            .iter()
            .position(|n| n == name)
            .and_then(|slot| self.get(slot));
        if let Some(value) = local {
            return Some(value.clone());
        }
        self.parent.as_ref()?.borrow().lookup_by_name(name)
    }

    /// Switch to another slot layout, keeping values by name
    ///
    /// The persistent top-level scope does this before running newly
    /// compiled code. Code compiled against the current names only appends
    /// slots, which is the cheap path.
    pub fn adopt_layout(&mut self, names: Rc<Vec<String>>) {
        if names.starts_with(&self.names) {
            self.vars.resize(names.len(), None);
        } else {
            self.vars = names
                .iter()
                .map(|name| {
                    self.names
                        .iter()
                        .position(|n| n == name)
                        .and_then(|slot| self.vars[slot].clone())
                })
                .collect();
        }
        self.names = names;
    }

    /// True when nothing but the caller's handle and this scope's own
    /// functions refer to `scope`
    ///
    /// Functions stored in the scope they were created in form a cycle, so
    /// such a scope stays allocated until it is cleared.
    pub fn only_self_referenced(scope: &Rc<RefCell<Scope>>) -> bool {
        let inner = scope.borrow();
        // (function, times held here, strong count)
        let mut held: Vec<(*const Closure, usize, usize)> = Vec::new();
        for value in inner.vars.iter().flatten() {
            let Value::Function(closure) = value else {
                continue;
            };
            if !Rc::ptr_eq(&closure.scope, scope) {
                continue;
            }
            let ptr = Rc::as_ptr(closure);
            match held.iter_mut().find(|(p, ..)| *p == ptr) {
                Some(entry) => entry.1 += 1,
                None => held.push((ptr, 1, Rc::strong_count(closure))),
            }
        }
        Rc::strong_count(scope) == 1 + held.len()
            && held.iter().all(|(_, seen, strong)| seen == strong)
    }

    /// Drop every assigned value
    pub fn clear(&mut self) {
        self.vars.iter_mut().for_each(|var| *var = None);
    }
}
