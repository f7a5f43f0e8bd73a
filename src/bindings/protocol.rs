//! Engine Boundary Protocol
//!
//! This protocol defines the only two operations the bridge needs from the
//! embedding collaborator (evaluate / execute) and the restricted value shape
//! that crosses the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{EngineError, EngineResult};

/// Prefix of the reference token that names a script-side object.
pub const HANDLE_TOKEN_PREFIX: &str = "nsiId=";

/// Integer identifier naming a script-side object for the duration of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    /// Handle of the well-known root object, pre-registered by the bootstrap.
    pub const ROOT: Handle = Handle(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    /// Renders the wire token `nsiId=<handle>`.
    pub fn to_token(self) -> String {
        format!("{}{}", HANDLE_TOKEN_PREFIX, self.0)
    }

    /// Parses a wire token. Returns `None` when the prefix is missing or the
    /// suffix is not a non-negative decimal integer.
    pub fn from_token(token: &str) -> Option<Self> {
        let digits = token.strip_prefix(HANDLE_TOKEN_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value as it crosses the engine boundary.
///
/// Numbers have no integer kind: everything is a double. Opaque objects
/// travel as `String` tokens produced by the script-side converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<WireValue>),
}

impl WireValue {
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// The handle carried by a reference token, if this is one.
    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            WireValue::String(s) => Handle::from_token(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Number(_) => "number",
            WireValue::String(_) => "string",
            WireValue::Array(_) => "array",
        }
    }
}

impl From<Handle> for WireValue {
    fn from(handle: Handle) -> Self {
        WireValue::String(handle.to_token())
    }
}

/// Trait for the embedded script engine the bridge talks to.
///
/// The bridge is single-threaded: implementations are driven only from the
/// thread that owns the engine, and every call blocks until the engine is done.
pub trait ScriptEngine {
    /// Evaluates `script` as a function body and returns the value of its
    /// `return` statement (`Null` when there is none).
    fn evaluate(&self, script: &str) -> EngineResult<WireValue>;

    /// Runs `script` in the global scope, discarding any result.
    fn execute(&self, script: &str) -> EngineResult<()>;
}

impl<E: ScriptEngine + ?Sized> ScriptEngine for std::rc::Rc<E> {
    fn evaluate(&self, script: &str) -> EngineResult<WireValue> {
        (**self).evaluate(script)
    }

    fn execute(&self, script: &str) -> EngineResult<()> {
        (**self).execute(script)
    }
}

/// A weak connection: the bridge references the engine without keeping it
/// alive. Once the embedding side drops the engine every call reports
/// `EngineError::Disconnected`.
impl<E: ScriptEngine + ?Sized> ScriptEngine for std::rc::Weak<E> {
    fn evaluate(&self, script: &str) -> EngineResult<WireValue> {
        match self.upgrade() {
            Some(engine) => engine.evaluate(script),
            None => Err(EngineError::Disconnected),
        }
    }

    fn execute(&self, script: &str) -> EngineResult<()> {
        match self.upgrade() {
            Some(engine) => engine.execute(script),
            None => Err(EngineError::Disconnected),
        }
    }
}
