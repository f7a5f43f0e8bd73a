//! Proxy Factory
//!
//! Stand-ins for script-side objects. A [`RemoteRef`] is the untyped
//! reference (session, handle, capability name); typed stand-ins generated by
//! [`capability!`](crate::capability) wrap one and forward every member call
//! through the dispatcher.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::bindings::protocol::{Handle, WireValue};
use crate::codec::{FromNative, NativeValue, Shape};
use crate::core::error::BridgeResult;
use crate::dispatch::{Dispatcher, RemoteCallable};
use crate::expr::{escape_string, property_name, ExpressionBuilder};
use crate::session::Session;

/// Native-side reference to a script object in the handle table.
///
/// Two references are equal when they name the same handle in the same
/// session; the capability they are typed as does not take part. The hash is
/// the handle alone.
#[derive(Clone)]
pub struct RemoteRef {
    session: Rc<Session>,
    handle: Handle,
    capability: &'static str,
    generation: u64,
}

impl RemoteRef {
    /// Binds `handle` in the session's current generation.
    pub fn new(session: &Rc<Session>, handle: Handle, capability: &'static str) -> Self {
        Self {
            session: Rc::clone(session),
            handle,
            capability,
            generation: session.generation(),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The session (and through it, the engine connection) this reference
    /// dispatches through.
    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    /// Session generation the reference was minted in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the session has reinstalled its handle table since this
    /// reference was minted.
    pub fn is_stale(&self) -> bool {
        self.generation != self.session.generation()
    }

    /// Script expression naming the referenced object, `nsiArray[<handle>]`.
    pub fn expression(&self) -> String {
        ExpressionBuilder::for_session(&self.session).reference(self.handle)
    }

    /// The same reference typed as another capability.
    pub fn with_capability(self, capability: &'static str) -> Self {
        Self { capability, ..self }
    }
}

/// Two references are equal when they name the same slot of the same table
/// generation. The capability they are typed as does not matter.
impl PartialEq for RemoteRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
            && self.generation == other.generation
            && Rc::ptr_eq(&self.session, &other.session)
    }
}

impl Eq for RemoteRef {}

impl Hash for RemoteRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
        self.generation.hash(state);
    }
}

impl fmt::Debug for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRef")
            .field("handle", &self.handle)
            .field("capability", &self.capability)
            .field("generation", &self.generation)
            .finish()
    }
}

impl RemoteCallable for RemoteRef {
    fn invoke(&self, member: &str, args: Vec<NativeValue>, returns: &Shape) -> BridgeResult<NativeValue> {
        Dispatcher::new(&self.session).dispatch(self, member, args, returns)
    }
}

/// A typed stand-in: a named set of script members reachable through one
/// remote reference.
pub trait Capability: RemoteCallable + Sized {
    /// Script-facing name of the capability set.
    const NAME: &'static str;

    /// Script-side member names the capability set exposes.
    const MEMBERS: &'static [&'static str];

    fn from_remote(remote: RemoteRef) -> Self;

    fn remote(&self) -> &RemoteRef;

    fn handle(&self) -> Handle {
        self.remote().handle()
    }

    fn descriptor() -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME,
            members: Self::MEMBERS,
        }
    }
}

/// Name and member list of a capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub members: &'static [&'static str],
}

crate::capability! {
    /// Untyped stand-in for callers without a generated capability set.
    pub struct DynamicProxy: "Dynamic" {}
}

impl DynamicProxy {
    /// Calls `member` and extracts the result as `R`.
    pub fn call<R: FromNative>(&self, member: &str, args: Vec<NativeValue>) -> BridgeResult<R> {
        let value = self.invoke(member, args, &R::shape())?;
        Ok(R::from_native(value)?)
    }

    /// Calls `member` for its side effect only.
    pub fn call_void(&self, member: &str, args: Vec<NativeValue>) -> BridgeResult<()> {
        self.invoke(member, args, &Shape::Void).map(|_| ())
    }
}

/// Builds a stand-in of capability `C` for `handle`.
pub fn create_proxy_for<C: Capability>(session: &Rc<Session>, handle: Handle) -> C {
    C::from_remote(RemoteRef::new(session, handle, C::NAME))
}

/// Reuses the handle of `existing` under capability `C`.
pub fn query_capability<C: Capability, D: Capability>(existing: &D) -> C {
    C::from_remote(existing.remote().clone())
}

/// Registered capability sets, probed against live objects.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    descriptors: Vec<CapabilityDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Capability>(&mut self) -> &mut Self {
        let descriptor = C::descriptor();
        if !self.descriptors.iter().any(|d| d.name == descriptor.name) {
            self.descriptors.push(descriptor);
        }
        self
    }

    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    /// Names of the registered capabilities whose every member exists on the
    /// referenced object. One engine round trip per capability; a probe that
    /// fails counts as unsupported.
    pub fn supported_by(&self, remote: &RemoteRef) -> Vec<&'static str> {
        let session = remote.session();
        if let Err(err) = session.check_reference(remote) {
            tracing::debug!(target: "bridge.dispatch", "Skipping capability probe: {}", err);
            return Vec::new();
        }
        let target = remote.expression();
        self.descriptors
            .iter()
            .filter(|descriptor| {
                let script = probe_script(&target, descriptor.members);
                match session.engine().evaluate(&script) {
                    Ok(WireValue::Bool(supported)) => supported,
                    Ok(other) => {
                        tracing::debug!(
                            target: "bridge.dispatch",
                            "Probe for {} returned {}",
                            descriptor.name,
                            other.kind()
                        );
                        false
                    }
                    Err(err) => {
                        tracing::debug!(
                            target: "bridge.dispatch",
                            "Probe for {} failed: {}",
                            descriptor.name,
                            err
                        );
                        false
                    }
                }
            })
            .map(|descriptor| descriptor.name)
            .collect()
    }
}

fn probe_script(target: &str, members: &[&str]) -> String {
    let mut script = format!(
        "var o = {}; return o !== null && o !== undefined && (typeof o === 'object' || typeof o === 'function')",
        target
    );
    for member in members {
        // a getter-shaped member is reached through its property when called without arguments
        match property_name(member) {
            Some(property) => script.push_str(&format!(
                " && ('{}' in o || '{}' in o)",
                escape_string(member),
                escape_string(&property)
            )),
            None => script.push_str(&format!(" && ('{}' in o)", escape_string(member))),
        }
    }
    script.push(';');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::core::error::EngineResult;
    use crate::bindings::protocol::ScriptEngine;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Answers probes for objects that have every member in `members`.
    struct ProbeEngine {
        members: Vec<&'static str>,
        scripts: RefCell<Vec<String>>,
    }

    impl ScriptEngine for ProbeEngine {
        fn evaluate(&self, script: &str) -> EngineResult<WireValue> {
            self.scripts.borrow_mut().push(script.to_string());
            let supported = script
                .split("('")
                .skip(1)
                .filter_map(|part| part.split('\'').next())
                .all(|member| self.members.contains(&member));
            Ok(WireValue::Bool(supported))
        }

        fn execute(&self, _script: &str) -> EngineResult<()> {
            Ok(())
        }
    }

    crate::capability! {
        struct Element: "Element" {
            "getTagName" => fn tag_name(&self) -> String;
        }
    }

    crate::capability! {
        struct Node: "Node" {
            "getNodeName" => fn node_name(&self) -> String;
            "appendChild" => fn append_child(&self, child: &Node) -> Option<Node>;
        }
    }

    fn session(members: Vec<&'static str>) -> Rc<Session> {
        let engine = ProbeEngine {
            members,
            scripts: RefCell::new(Vec::new()),
        };
        let session = Session::new(Rc::new(engine), BridgeConfig::default()).unwrap();
        session.install().unwrap();
        session
    }

    #[test]
    fn test_identity_ignores_capability() {
        let session = session(vec![]);
        let node: Node = create_proxy_for(&session, Handle::new(3));
        let element: Element = query_capability(&node);
        assert_eq!(node.remote(), element.remote());
        assert_eq!(element.remote().capability(), "Element");
        assert_eq!(element.handle(), Handle::new(3));

        let mut set = HashSet::new();
        set.insert(node.remote().clone());
        assert!(set.contains(element.remote()));
    }

    #[test]
    fn test_different_sessions_are_not_equal() {
        let a = session(vec![]);
        let b = session(vec![]);
        let left = RemoteRef::new(&a, Handle::new(1), "Node");
        let right = RemoteRef::new(&b, Handle::new(1), "Node");
        assert_ne!(left, right);
    }

    #[test]
    fn test_stale_after_reinstall() {
        let session = session(vec![]);
        let remote = RemoteRef::new(&session, Handle::new(2), "Node");
        assert!(!remote.is_stale());
        session.install().unwrap();
        assert!(remote.is_stale());
        assert_eq!(remote.expression(), "nsiArray[2]");
    }

    #[test]
    fn test_generations_are_not_equal() {
        let session = session(vec![]);
        let old = RemoteRef::new(&session, Handle::new(1), "Node");
        session.install().unwrap();
        let fresh = RemoteRef::new(&session, Handle::new(1), "Node");
        assert_ne!(old, fresh);

        let mut set = HashSet::new();
        set.insert(old);
        assert!(!set.contains(&fresh));
    }

    #[test]
    fn test_registry_probes_members() {
        let session = session(vec!["getNodeName", "appendChild"]);
        let mut registry = CapabilityRegistry::new();
        registry.register::<Node>().register::<Element>().register::<Node>();
        assert_eq!(registry.descriptors().len(), 2);

        let remote = RemoteRef::new(&session, Handle::new(1), DynamicProxy::NAME);
        assert_eq!(registry.supported_by(&remote), vec!["Node"]);
    }

    #[test]
    fn test_probe_script_escapes_members() {
        let script = probe_script("nsiArray[4]", &["it's"]);
        assert!(script.starts_with("var o = nsiArray[4];"));
        assert!(script.contains(r"('it\'s' in o)"));
    }
}
