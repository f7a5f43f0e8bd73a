//! Expression Builder
//!
//! Renders one remote call as a single script statement:
//!
//! ```text
//! getDocument()           -> nsiArray[3].document
//! createElement('div')    -> nsiArray[3].createElement('div')
//! appendChild(<handle 7>) -> nsiArray[3].appendChild(nsiArray[7])
//! ```

use std::fmt::Write;

use crate::bindings::protocol::Handle;
use crate::codec::NativeValue;
use crate::session::Session;

/// Derives the property read by a getter-shaped member name: `get` followed
/// by an upper-case letter. `getDocument` reads `document`, `getURL` reads
/// `uRL`. Returns `None` for anything else.
pub fn property_name(member: &str) -> Option<String> {
    let rest = member.strip_prefix("get")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    let mut property: String = first.to_lowercase().collect();
    property.push_str(chars.as_str());
    Some(property)
}

/// Escapes a string for a single-quoted script literal. Backslashes go first
/// so later substitutions are not escaped twice.
pub fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
}

fn push_number(out: &mut String, n: f64) {
    if n.is_nan() {
        out.push_str("NaN");
    } else if n.is_infinite() {
        out.push_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let _ = write!(out, "{:?}", n);
    }
}

/// Renders calls against the handle table named `table`.
///
/// With an owning session attached, references minted by another session or
/// in an earlier generation of this one render as `null`: their handle does
/// not name the right object here.
pub struct ExpressionBuilder<'a> {
    table: &'a str,
    owner: Option<&'a Session>,
}

impl<'a> ExpressionBuilder<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table, owner: None }
    }

    pub fn for_session(session: &'a Session) -> Self {
        Self {
            table: &session.config().table_name,
            owner: Some(session),
        }
    }

    /// `<table>[<handle>]`
    pub fn reference(&self, handle: Handle) -> String {
        format!("{}[{}]", self.table, handle)
    }

    /// Renders `member` called on `handle` with `args`.
    ///
    /// A getter-shaped member called with no arguments becomes a property
    /// read. Getter-shaped members called with arguments stay method calls.
    pub fn render_call(&self, handle: Handle, member: &str, args: &[NativeValue]) -> String {
        let mut out = self.reference(handle);
        out.push('.');
        match property_name(member) {
            Some(property) if args.is_empty() => out.push_str(&property),
            _ => {
                out.push_str(member);
                out.push('(');
                self.push_list(&mut out, args);
                out.push(')');
            }
        }
        out
    }

    /// Renders a single argument value.
    pub fn render_arg(&self, arg: &NativeValue) -> String {
        let mut out = String::new();
        self.push_arg(&mut out, arg);
        out
    }

    fn push_list(&self, out: &mut String, items: &[NativeValue]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.push_arg(out, item);
        }
    }

    fn push_arg(&self, out: &mut String, arg: &NativeValue) {
        match arg {
            NativeValue::Null => out.push_str("null"),
            NativeValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            NativeValue::Int(n) => push_number(out, *n as f64),
            NativeValue::Long(n) => push_number(out, *n as f64),
            NativeValue::Double(n) => push_number(out, *n),
            NativeValue::String(s) => {
                out.push('\'');
                out.push_str(&escape_string(s));
                out.push('\'');
            }
            NativeValue::Array(items) => {
                out.push('[');
                self.push_list(out, items);
                out.push(']');
            }
            NativeValue::Ref(remote) => {
                let usable = match self.owner {
                    Some(session) => session.owns(remote),
                    None => true,
                };
                if usable {
                    out.push_str(&self.reference(remote.handle()));
                } else {
                    tracing::warn!(
                        target: "bridge.expr",
                        "Reference to handle {} is not valid in this session, passing null",
                        remote.handle()
                    );
                    out.push_str("null");
                }
            }
            NativeValue::Foreign(type_name) => {
                tracing::debug!(
                    target: "bridge.expr",
                    "No script representation for {}, passing null",
                    type_name
                );
                out.push_str("null");
            }
        }
    }
}
