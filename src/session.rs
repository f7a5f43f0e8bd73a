//! Session
//!
//! One loaded script context: the engine connection, the bridge configuration
//! and the generation of the handle table currently installed in the engine.
//! Every stand-in holds the session it was minted in.
//!
//! Not thread-safe. A session and everything minted from it stay on the
//! thread that owns the engine.

use std::cell::Cell;
use std::rc::Rc;

use crate::bindings::bootstrap::{guarded_install_script, install_script, presence_probe, size_probe};
use crate::bindings::protocol::{Handle, ScriptEngine, WireValue};
use crate::codec::{from_wire, NativeValue, Shape};
use crate::config::{BridgeConfig, VoidCallMode};
use crate::core::error::{BridgeError, BridgeResult, ConversionError, EngineResult};
use crate::expr::ExpressionBuilder;
use crate::proxy::{self, Capability, RemoteRef};

pub struct Session {
    engine: Rc<dyn ScriptEngine>,
    config: BridgeConfig,
    generation: Cell<u64>,
}

impl Session {
    /// Creates a session over `engine`. Nothing is installed yet; call
    /// [`install`](Self::install) or [`ensure_installed`](Self::ensure_installed)
    /// before dispatching.
    pub fn new(engine: Rc<dyn ScriptEngine>, config: BridgeConfig) -> BridgeResult<Rc<Self>> {
        config.validate()?;
        Ok(Rc::new(Self {
            engine,
            config,
            generation: Cell::new(0),
        }))
    }

    pub fn engine(&self) -> &Rc<dyn ScriptEngine> {
        &self.engine
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Generation of the installed handle table; `0` until the first install.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    /// Installs the handle table unconditionally. Any previous table is
    /// replaced, handle `0` rebinds to the current root, and references minted
    /// before become stale.
    pub fn install(&self) -> BridgeResult<u64> {
        self.engine.execute(&install_script(&self.config))?;
        let generation = self.next_generation();
        tracing::info!(
            target: "bridge.session",
            "Installed handle table '{}' (generation {})",
            self.config.table_name,
            generation
        );
        Ok(generation)
    }

    /// Installs the handle table only when the engine does not have one.
    /// Returns whether an install happened.
    ///
    /// A table that disappeared after this session installed it means the
    /// engine was reloaded underneath; the session moves to a new generation
    /// just like [`install`](Self::install). A table this session did not
    /// install is adopted as it is.
    pub fn ensure_installed(&self) -> BridgeResult<bool> {
        if self.is_installed()? {
            if self.generation() == 0 {
                let generation = self.next_generation();
                tracing::debug!(
                    target: "bridge.session",
                    "Adopted existing handle table '{}' (generation {})",
                    self.config.table_name,
                    generation
                );
            }
            return Ok(false);
        }

        if self.generation() > 0 {
            tracing::warn!(
                target: "bridge.session",
                "Handle table '{}' vanished from the engine, references from generation {} are stale",
                self.config.table_name,
                self.generation()
            );
        }
        self.engine.execute(&guarded_install_script(&self.config))?;
        let generation = self.next_generation();
        tracing::info!(
            target: "bridge.session",
            "Installed handle table '{}' (generation {})",
            self.config.table_name,
            generation
        );
        Ok(true)
    }

    /// Whether the engine's global scope holds the handle table and converter.
    pub fn is_installed(&self) -> BridgeResult<bool> {
        Ok(matches!(
            self.engine.evaluate(&presence_probe(&self.config))?,
            WireValue::Bool(true)
        ))
    }

    /// Number of occupied handle table slots, the root included.
    pub fn table_len(&self) -> BridgeResult<usize> {
        self.require_installed()?;
        match self.engine.evaluate(&size_probe(&self.config))? {
            WireValue::Number(n) if n >= 0.0 => Ok(n as usize),
            other => Err(ConversionError::mismatch("number", other.kind()).into()),
        }
    }

    /// Registers the value of `expression` in the handle table and returns
    /// its handle. `None` when the value is `null` or `undefined`. Arrays and
    /// primitives are never registered and are reported as a shape mismatch.
    pub fn register(&self, expression: &str) -> BridgeResult<Option<Handle>> {
        self.require_installed()?;
        match self.capture(expression)? {
            WireValue::Null => Ok(None),
            wire => match wire.as_handle() {
                Some(handle) => Ok(Some(handle)),
                None => Err(ConversionError::mismatch("reference", wire.kind()).into()),
            },
        }
    }

    /// Script expression naming the table slot of `handle`.
    pub fn lookup(&self, handle: Handle) -> String {
        ExpressionBuilder::for_session(self).reference(handle)
    }

    /// Stand-in for the root object, handle `0`.
    pub fn root<C: Capability>(self: &Rc<Self>) -> C {
        proxy::create_proxy_for(self, Handle::ROOT)
    }

    pub fn create_proxy_for<C: Capability>(self: &Rc<Self>, handle: Handle) -> C {
        proxy::create_proxy_for(self, handle)
    }

    pub fn query_capability<C: Capability, D: Capability>(&self, existing: &D) -> C {
        proxy::query_capability(existing)
    }

    /// Evaluates `expression` and binds its result as a stand-in of `C`.
    /// `None` when the expression yields `null` or `undefined`.
    pub fn bind<C: Capability>(self: &Rc<Self>, expression: &str) -> BridgeResult<Option<C>> {
        match self.evaluate_as(expression, &Shape::Capability(C::NAME))? {
            NativeValue::Null => Ok(None),
            NativeValue::Ref(remote) => Ok(Some(C::from_remote(remote))),
            other => Err(ConversionError::mismatch(C::NAME, other.kind()).into()),
        }
    }

    /// Evaluates an arbitrary expression and converts its result into `shape`.
    pub fn evaluate_as(self: &Rc<Self>, expression: &str, shape: &Shape) -> BridgeResult<NativeValue> {
        self.require_installed()?;
        if shape.is_void() {
            self.run_void(expression)?;
            return Ok(NativeValue::Null);
        }
        let wire = self.capture(expression)?;
        Ok(from_wire(self, wire, shape)?)
    }

    /// Evaluates `statement` through the converter, registering any opaque
    /// object it yields.
    pub(crate) fn capture(&self, statement: &str) -> EngineResult<WireValue> {
        self.engine
            .evaluate(&format!("return {}({});", self.config.converter_name, statement))
    }

    /// Runs `statement` for its side effects.
    pub(crate) fn run_void(&self, statement: &str) -> EngineResult<()> {
        let script = format!("{};", statement);
        match self.config.void_calls {
            VoidCallMode::Execute => self.engine.execute(&script),
            VoidCallMode::Evaluate => self.engine.evaluate(&script).map(|_| ()),
        }
    }

    fn require_installed(&self) -> BridgeResult<()> {
        if self.generation() == 0 {
            return Err(BridgeError::NotInstalled);
        }
        Ok(())
    }

    /// Whether `remote` names a live slot of this session's current table.
    pub fn owns(&self, remote: &RemoteRef) -> bool {
        self.check_reference(remote).is_ok()
    }

    pub(crate) fn check_reference(&self, remote: &RemoteRef) -> BridgeResult<()> {
        if !std::ptr::eq(self, Rc::as_ptr(remote.session())) {
            return Err(BridgeError::ForeignSession {
                handle: remote.handle().raw(),
            });
        }
        self.require_installed()?;
        if remote.generation() != self.generation() {
            return Err(BridgeError::StaleReference {
                handle: remote.handle().raw(),
                generation: remote.generation(),
                current: self.generation(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("table", &self.config.table_name)
            .field("generation", &self.generation.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EngineError;
    use crate::proxy::DynamicProxy;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every script and answers evaluations from a queue.
    #[derive(Default)]
    struct ScriptedEngine {
        executed: RefCell<Vec<String>>,
        evaluated: RefCell<Vec<String>>,
        replies: RefCell<VecDeque<EngineResult<WireValue>>>,
    }

    impl ScriptedEngine {
        fn reply(&self, value: EngineResult<WireValue>) {
            self.replies.borrow_mut().push_back(value);
        }
    }

    impl ScriptEngine for ScriptedEngine {
        fn evaluate(&self, script: &str) -> EngineResult<WireValue> {
            self.evaluated.borrow_mut().push(script.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(WireValue::Null))
        }

        fn execute(&self, script: &str) -> EngineResult<()> {
            self.executed.borrow_mut().push(script.to_string());
            Ok(())
        }
    }

    fn new_session() -> (Rc<ScriptedEngine>, Rc<Session>) {
        let engine = Rc::new(ScriptedEngine::default());
        let session = Session::new(engine.clone(), BridgeConfig::default()).unwrap();
        (engine, session)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = BridgeConfig {
            table_name: "not a name".to_string(),
            ..BridgeConfig::default()
        };
        let result = Session::new(Rc::new(ScriptedEngine::default()), config);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_install_bumps_generation() {
        let (engine, session) = new_session();
        assert_eq!(session.generation(), 0);
        assert_eq!(session.install().unwrap(), 1);
        assert_eq!(session.install().unwrap(), 2);
        assert_eq!(engine.executed.borrow().len(), 2);
        assert!(engine.executed.borrow()[0].contains("global['nsiArray'] = table;"));
    }

    #[test]
    fn test_ensure_installed_adopts_existing_table() {
        let (engine, session) = new_session();
        engine.reply(Ok(WireValue::Bool(true)));
        assert!(!session.ensure_installed().unwrap());
        assert_eq!(session.generation(), 1);
        assert!(engine.executed.borrow().is_empty());
    }

    #[test]
    fn test_ensure_installed_after_reload() {
        let (engine, session) = new_session();
        engine.reply(Ok(WireValue::Bool(false)));
        assert!(session.ensure_installed().unwrap());
        assert_eq!(session.generation(), 1);

        engine.reply(Ok(WireValue::Bool(true)));
        assert!(!session.ensure_installed().unwrap());
        assert_eq!(session.generation(), 1);

        // the engine lost its table
        engine.reply(Ok(WireValue::Bool(false)));
        assert!(session.ensure_installed().unwrap());
        assert_eq!(session.generation(), 2);
        assert!(engine.executed.borrow()[1].starts_with("if (!Array.isArray(globalThis['nsiArray']))"));
    }

    #[test]
    fn test_not_installed() {
        let (_engine, session) = new_session();
        assert!(matches!(session.register("document"), Err(BridgeError::NotInstalled)));
        assert!(matches!(session.table_len(), Err(BridgeError::NotInstalled)));
        let root: DynamicProxy = session.root();
        assert!(matches!(
            root.call::<String>("getTitle", vec![]),
            Err(BridgeError::NotInstalled)
        ));
    }

    #[test]
    fn test_register() {
        let (engine, session) = new_session();
        session.install().unwrap();
        engine.reply(Ok(Handle::new(3).into()));
        engine.reply(Ok(WireValue::Null));
        engine.reply(Ok(WireValue::Array(vec![])));

        assert_eq!(session.register("document").unwrap(), Some(Handle::new(3)));
        assert_eq!(session.register("undefined").unwrap(), None);
        assert!(matches!(
            session.register("[document]"),
            Err(BridgeError::Conversion(ConversionError::ShapeMismatch { .. }))
        ));
        assert_eq!(engine.evaluated.borrow()[0], "return convertNsi(document);");
    }

    #[test]
    fn test_table_len() {
        let (engine, session) = new_session();
        session.install().unwrap();
        engine.reply(Ok(WireValue::Number(4.0)));
        assert_eq!(session.table_len().unwrap(), 4);
        assert_eq!(engine.evaluated.borrow()[0], "return nsiArray.length;");
    }

    #[test]
    fn test_lookup() {
        let (_engine, session) = new_session();
        assert_eq!(session.lookup(Handle::new(12)), "nsiArray[12]");
    }

    #[test]
    fn test_bind() {
        let (engine, session) = new_session();
        session.install().unwrap();
        engine.reply(Ok(Handle::new(5).into()));
        engine.reply(Ok(WireValue::Null));
        engine.reply(Err(EngineError::script("ReferenceError: foo is not defined")));

        let foo: DynamicProxy = session.bind("foo").unwrap().unwrap();
        assert_eq!(foo.handle(), Handle::new(5));
        assert!(session.bind::<DynamicProxy>("missing").unwrap().is_none());
        assert!(matches!(
            session.bind::<DynamicProxy>("foo"),
            Err(BridgeError::Engine(EngineError::Script { .. }))
        ));
    }

    #[test]
    fn test_evaluate_as_void_executes() {
        let (engine, session) = new_session();
        session.install().unwrap();
        let value = session.evaluate_as("window.x = 1", &Shape::Void).unwrap();
        assert!(value.is_null());
        assert_eq!(engine.executed.borrow().last().map(String::as_str), Some("window.x = 1;"));
        assert!(engine.evaluated.borrow().is_empty());
    }

    #[test]
    fn test_check_reference() {
        let (_engine, session) = new_session();
        let (_other_engine, other) = new_session();
        session.install().unwrap();
        other.install().unwrap();

        let live = RemoteRef::new(&session, Handle::new(1), "Node");
        assert!(session.check_reference(&live).is_ok());
        assert!(matches!(
            other.check_reference(&live),
            Err(BridgeError::ForeignSession { handle: 1 })
        ));

        session.install().unwrap();
        assert!(matches!(
            session.check_reference(&live),
            Err(BridgeError::StaleReference {
                handle: 1,
                generation: 1,
                current: 2
            })
        ));
        assert!(!session.owns(&live));
    }
}
