//! Conversion rules between wire form and native values
//!
//! "Convert to wire form" on the script side lives in the bootstrap script;
//! this module holds its native counterpart for outbound values ([`to_wire`])
//! and the inbound reconstruction ([`from_wire`]).

use std::rc::Rc;

use crate::bindings::protocol::{Handle, WireValue};
use crate::config::TokenPolicy;
use crate::core::error::{ConversionError, ConversionResult};
use crate::proxy::RemoteRef;
use crate::session::Session;

use super::value::{NativeValue, Shape};

/// Converts a raw wire value into `shape`.
///
/// Rules, first match wins:
/// - `null` stays `null` whatever the shape;
/// - bool/string/double shapes take the value as it is;
/// - int/long shapes truncate a wire number toward zero (saturating at the
///   type bounds, NaN becomes 0);
/// - a wire array against an array shape converts element-wise;
/// - a capability shape turns a reference token into a stand-in bound to the
///   token's handle. A malformed token is an error under
///   [`TokenPolicy::Strict`] and binds to the root handle under
///   [`TokenPolicy::Lenient`];
/// - anything else passes through unchanged.
pub fn from_wire(
    session: &Rc<Session>,
    wire: WireValue,
    shape: &Shape,
) -> ConversionResult<NativeValue> {
    match (wire, shape) {
        (WireValue::Null, _) => Ok(NativeValue::Null),
        (wire, Shape::Bool | Shape::String | Shape::Double) => Ok(pass_through(wire)),
        (WireValue::Number(n), Shape::Int) => Ok(NativeValue::Int(n as i32)),
        (WireValue::Number(n), Shape::Long) => Ok(NativeValue::Long(n as i64)),
        (WireValue::Array(items), Shape::Array(element)) => items
            .into_iter()
            .map(|item| from_wire(session, item, element))
            .collect::<ConversionResult<Vec<_>>>()
            .map(NativeValue::Array),
        (wire, Shape::Capability(name)) => {
            let handle = match wire.as_handle() {
                Some(handle) => handle,
                None => malformed_token(session, &wire)?,
            };
            Ok(NativeValue::Ref(RemoteRef::new(session, handle, *name)))
        }
        (wire, _) => Ok(pass_through(wire)),
    }
}

fn malformed_token(session: &Session, wire: &WireValue) -> ConversionResult<Handle> {
    let token = match wire {
        WireValue::String(s) => s.clone(),
        other => format!("<{}>", other.kind()),
    };
    match session.config().token_policy {
        TokenPolicy::Strict => Err(ConversionError::MalformedToken(token)),
        TokenPolicy::Lenient => {
            tracing::warn!(
                target: "bridge.codec",
                "Malformed reference token {:?}, binding stand-in to the root handle",
                token
            );
            Ok(Handle::ROOT)
        }
    }
}

/// Maps a wire value onto the native side without any shape.
pub fn pass_through(wire: WireValue) -> NativeValue {
    match wire {
        WireValue::Null => NativeValue::Null,
        WireValue::Bool(b) => NativeValue::Bool(b),
        WireValue::Number(n) => NativeValue::Double(n),
        WireValue::String(s) => NativeValue::String(s),
        WireValue::Array(items) => NativeValue::Array(items.into_iter().map(pass_through).collect()),
    }
}

/// Converts a native value into wire form.
///
/// Integers widen to doubles, stand-ins become reference tokens, and foreign
/// values become `null`.
pub fn to_wire(value: &NativeValue) -> WireValue {
    match value {
        NativeValue::Null | NativeValue::Foreign(_) => WireValue::Null,
        NativeValue::Bool(b) => WireValue::Bool(*b),
        NativeValue::Int(n) => WireValue::Number(*n as f64),
        NativeValue::Long(n) => WireValue::Number(*n as f64),
        NativeValue::Double(n) => WireValue::Number(*n),
        NativeValue::String(s) => WireValue::String(s.clone()),
        NativeValue::Array(items) => WireValue::Array(items.iter().map(to_wire).collect()),
        NativeValue::Ref(remote) => remote.handle().into(),
    }
}
