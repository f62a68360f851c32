use core::fmt;
use std::{collections::HashMap, mem};

use itertools::Itertools;

use crate::{error::LambError, interpreter::{Function, LambValue}};


/// Handle to one scope of an [Environment]. A handle to a scope that has
/// since been released resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

const ROOT: ScopeId = ScopeId { index: 0, generation: 0 };

struct Frame {
    bindings: HashMap<String, LambValue>,
    parent: Option<ScopeId>,
    // Set once a closure is created in this scope
    captured: bool,
}

impl Frame {
    fn new(parent: Option<ScopeId>) -> Self {
        Self { bindings: HashMap::new(), parent, captured: false }
    }
}

struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

/// Arena of every live scope, the root scope first.
///
/// Scopes point at their parent and closures at the scope they were
/// created in by [ScopeId] only, so no scope ever owns another. A call
/// scope that no closure captured is released when the call returns;
/// captured scopes stay until [Environment::collect] finds them
/// unreachable.
pub struct Environment {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Environment {
    /// Creates an arena holding only the root scope, which doubles as the
    /// implicit global namespace
    pub fn new() -> Self {
        Self {
            slots: vec![Slot { generation: 0, frame: Some(Frame::new(None)) }],
            free: vec![],
        }
    }

    pub fn root(&self) -> ScopeId {
        ROOT
    }

    fn frame(&self, scope: ScopeId) -> Option<&Frame> {
        self.slots.get(scope.index as usize)
            .filter(|slot| slot.generation == scope.generation)
            .and_then(|slot| slot.frame.as_ref())
    }

    fn frame_mut(&mut self, scope: ScopeId) -> Option<&mut Frame> {
        self.slots.get_mut(scope.index as usize)
            .filter(|slot| slot.generation == scope.generation)
            .and_then(|slot| slot.frame.as_mut())
    }

    /// Creates an empty scope whose parent is `parent`.
    pub fn extend(&mut self, parent: ScopeId) -> ScopeId {
        let frame = Frame::new(Some(parent));
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.frame = Some(frame);
                ScopeId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(Slot { generation: 0, frame: Some(frame) });
                ScopeId { index: (self.slots.len() - 1) as u32, generation: 0 }
            }
        }
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frame(scope)?.parent
    }

    pub fn is_root(&self, scope: ScopeId) -> bool {
        self.frame(scope).is_some_and(|frame| frame.parent.is_none())
    }

    /// Finds the innermost scope that directly binds `name`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = self.frame(id)?;
            if frame.bindings.contains_key(name) {
                return Some(id);
            }
            current = frame.parent;
        }
        None
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> Result<LambValue, LambError> {
        self.lookup(scope, name)
            .and_then(|id| self.frame(id))
            .and_then(|frame| frame.bindings.get(name))
            .cloned()
            .ok_or_else(|| LambError::UndefinedVariable(name.to_owned()))
    }

    /// Rebinds `name` in the scope that defines it. Only the root scope may
    /// create a binding this way.
    pub fn set(&mut self, scope: ScopeId, name: &str, value: LambValue) -> Result<LambValue, LambError> {
        let target = match self.lookup(scope, name) {
            Some(target) => target,
            None if self.is_root(scope) => scope,
            None => return Err(LambError::UndefinedVariable(name.to_owned())),
        };
        Ok(self.def(target, name, value))
    }

    /// Binds `name` in `scope`, shadowing any outer binding. Has no effect
    /// on a released scope.
    pub fn def(&mut self, scope: ScopeId, name: &str, value: LambValue) -> LambValue {
        if let Some(frame) = self.frame_mut(scope) {
            frame.bindings.insert(name.to_owned(), value.clone());
        }
        value
    }

    pub(crate) fn capture(&mut self, scope: ScopeId) {
        if let Some(frame) = self.frame_mut(scope) {
            frame.captured = true;
        }
    }

    /// Frees a call scope whose call returned, unless a closure was created
    /// in it.
    pub(crate) fn release(&mut self, scope: ScopeId) {
        if self.frame(scope).is_some_and(|frame| !frame.captured && frame.parent.is_some()) {
            self.free_slot(scope.index);
        }
    }

    fn free_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.frame = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    /// Releases every scope that is reachable neither from the root scope
    /// nor from a closure among `values`, and returns how many were freed.
    ///
    /// Must not run while an evaluation is in progress: the scopes of
    /// pending calls are not reachable from the root.
    pub fn collect<'a>(&mut self, values: impl IntoIterator<Item = &'a LambValue>) -> usize {
        let mut marked = vec![false; self.slots.len()];
        let mut pending = vec![ROOT];
        pending.extend(values.into_iter().filter_map(closure_scope));

        while let Some(scope) = pending.pop() {
            let Some(frame) = self.frame(scope) else { continue };
            if mem::replace(&mut marked[scope.index as usize], true) {
                continue;
            }
            pending.extend(frame.parent);
            pending.extend(frame.bindings.values().filter_map(closure_scope));
        }

        let unreachable = self.slots.iter()
            .enumerate()
            .filter(|(index, slot)| slot.frame.is_some() && !marked[*index])
            .map(|(index, _)| index as u32)
            .collect_vec();
        for index in &unreachable {
            self.free_slot(*index);
        }

        tracing::debug!(released = unreachable.len(), live = self.live_scopes(), "collected scopes");
        unreachable.len()
    }

    /// Number of scopes currently allocated, the root included
    pub fn live_scopes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.frame.is_some()).count()
    }
}

fn closure_scope(value: &LambValue) -> Option<ScopeId> {
    match value {
        LambValue::Function(Function::Lambda(closure)) => Some(closure.scope()),
        _ => None,
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scopes = self.slots.iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let frame = slot.frame.as_ref()?;
                Some(format!("{}[{}]", index, frame.bindings.keys().sorted().join(", ")))
            })
            .join(" ");
        write!(f, "Environment {{ {} }}", scopes)
    }
}
