use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ensure;
use crate::protocol::ContextError;

/// Opaque resume marker a handler pushes before suspending.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CtxState(u64);

impl CtxState {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for CtxState {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CtxState> for u64 {
    fn from(state: CtxState) -> Self {
        state.0
    }
}

/// Handler execution context: a bounded stack of [`CtxState`]s plus the
/// server configuration.
///
/// The stack never grows past the capacity it was created with; `push` on a
/// full stack and `pop`/`peek` on an empty one return [`ContextError`] and
/// leave the stack untouched.
#[derive(Debug)]
pub struct Context {
    stack: Vec<CtxState>,
    capacity: usize,
    conf: Option<Arc<ServerConfig>>,
}

impl Context {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { stack: Vec::with_capacity(capacity), capacity, conf: None }
    }

    pub fn push(&mut self, state: impl Into<CtxState>) -> Result<(), ContextError> {
        ensure!(self.stack.len() < self.capacity, ContextError::Overflow { capacity: self.capacity });
        self.stack.push(state.into());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<CtxState, ContextError> {
        self.stack.pop().ok_or(ContextError::Empty)
    }

    pub fn peek(&self) -> Result<CtxState, ContextError> {
        self.stack.last().copied().ok_or(ContextError::Empty)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// The ambient configuration, `None` between a reset and the next attach.
    pub fn conf(&self) -> Option<&ServerConfig> {
        self.conf.as_deref()
    }

    pub fn attach(&mut self, conf: Arc<ServerConfig>) {
        self.conf = Some(conf);
    }

    /// Empties the stack and detaches the configuration.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.conf = None;
    }
}
