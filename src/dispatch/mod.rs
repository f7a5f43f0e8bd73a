//! Remote Dispatcher
//!
//! Turns one member call on a stand-in into one engine round trip:
//!
//! ```text
//! BUILD ──> SEND ──> CONVERT ──> RETURN
//!             │
//!             └────> FAIL
//! ```
//!
//! Identity members are answered during BUILD without touching the engine.

use std::fmt;
use std::rc::Rc;

use crate::codec::{from_wire, NativeValue, Shape};
use crate::core::error::BridgeResult;
use crate::expr::ExpressionBuilder;
use crate::proxy::RemoteRef;
use crate::session::Session;

/// Member answering the handle a stand-in references.
pub const HANDLE_MEMBER: &str = "getNsiId";
/// Member answering the stand-in's hash, the handle value.
pub const HASH_MEMBER: &str = "hashCode";
/// Member answering structural equality with another stand-in.
pub const EQUALS_MEMBER: &str = "equals";

/// Phase of a single remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Build,
    Send,
    Convert,
    Return,
    Fail,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallPhase::Build => "BUILD",
            CallPhase::Send => "SEND",
            CallPhase::Convert => "CONVERT",
            CallPhase::Return => "RETURN",
            CallPhase::Fail => "FAIL",
        };
        f.write_str(name)
    }
}

/// Single entry point through which every stand-in forwards its calls.
pub trait RemoteCallable {
    /// Calls `member` with `args`, converting the result into `returns`.
    fn invoke(&self, member: &str, args: Vec<NativeValue>, returns: &Shape) -> BridgeResult<NativeValue>;

    /// Like [`invoke`](Self::invoke), but a failed call yields `Null`.
    ///
    /// A `Null` result does not tell a failed call from a call that returned
    /// `null`.
    fn invoke_or_null(&self, member: &str, args: Vec<NativeValue>, returns: &Shape) -> NativeValue {
        match self.invoke(member, args, returns) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(
                    target: "bridge.dispatch",
                    "Call to {} failed, returning null: {}",
                    member,
                    err
                );
                NativeValue::Null
            }
        }
    }
}

pub struct Dispatcher<'a> {
    session: &'a Rc<Session>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(session: &'a Rc<Session>) -> Self {
        Self { session }
    }

    pub fn dispatch(
        &self,
        target: &RemoteRef,
        member: &str,
        args: Vec<NativeValue>,
        returns: &Shape,
    ) -> BridgeResult<NativeValue> {
        let handle = target.handle();
        trace_phase(CallPhase::Build, member, handle.raw());
        if let Some(value) = identity(target, member, &args) {
            trace_phase(CallPhase::Return, member, handle.raw());
            return Ok(value);
        }
        self.session.check_reference(target)?;
        let statement = ExpressionBuilder::for_session(self.session).render_call(handle, member, &args);
        tracing::debug!(target: "bridge.dispatch", "{}", statement);

        trace_phase(CallPhase::Send, member, handle.raw());
        let sent = if returns.is_void() {
            self.session.run_void(&statement).map(|()| None)
        } else {
            self.session.capture(&statement).map(Some)
        };
        let wire = match sent {
            Ok(wire) => wire,
            Err(err) => {
                trace_phase(CallPhase::Fail, member, handle.raw());
                return Err(err.into());
            }
        };

        let value = match wire {
            Some(wire) => {
                trace_phase(CallPhase::Convert, member, handle.raw());
                from_wire(self.session, wire, returns)?
            }
            None => NativeValue::Null,
        };
        trace_phase(CallPhase::Return, member, handle.raw());
        Ok(value)
    }
}

fn trace_phase(phase: CallPhase, member: &str, handle: u32) {
    tracing::trace!(target: "bridge.dispatch", "{} {}[{}]", phase, member, handle);
}

/// Answers identity members locally; `None` for everything else.
fn identity(target: &RemoteRef, member: &str, args: &[NativeValue]) -> Option<NativeValue> {
    match (member, args) {
        (HANDLE_MEMBER, []) | (HASH_MEMBER, []) => {
            let raw = target.handle().raw();
            // handles past i32::MAX answer as long rather than wrapping
            Some(i32::try_from(raw).map_or(NativeValue::Long(i64::from(raw)), NativeValue::Int))
        }
        (EQUALS_MEMBER, [other]) => Some(NativeValue::Bool(
            other.as_remote().is_some_and(|other| other == target),
        )),
        _ => None,
    }
}
