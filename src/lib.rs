//! # Script Proxy
//!
//! A bidirectional object-reference bridge between native code and an
//! embedded script engine.
//!
//! Script objects never cross the boundary. They stay in a script-side handle
//! table and the native side holds stand-ins that name them by handle. Every
//! call on a stand-in is rendered as one script statement, evaluated by the
//! engine, and its result converted back: primitives by value, objects as new
//! stand-ins.
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use script_proxy::{capability, BridgeConfig, QuickJsEngine, Session};
//!
//! capability! {
//!     pub struct Document: "Document" {
//!         "getTitle" => fn title(&self) -> Option<String>;
//!     }
//! }
//!
//! let engine = Rc::new(QuickJsEngine::new()?);
//! let session = Session::new(engine, BridgeConfig::default())?;
//! session.install()?;
//! let document: Option<Document> = session.bind("document")?;
//! ```
//!
//! ## Modules
//!
//! - [`bindings`]: engine protocol, bootstrap script, QuickJS adapter
//! - [`codec`]: wire/native value conversion
//! - [`expr`]: call statement rendering
//! - [`dispatch`]: per-call state machine
//! - [`proxy`]: stand-ins and capability sets
//! - [`session`]: installed handle table lifetime

/// Core error types and macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Engine boundary and embedded engine adapter
pub mod bindings;
/// Value conversion between wire form and native values
pub mod codec;
/// Expression rendering
pub mod expr;
/// Remote call dispatch
pub mod dispatch;
/// Stand-ins and capability sets
pub mod proxy;
/// Session lifetime
pub mod session;

pub use bindings::{Handle, QuickJsEngine, ScriptEngine, WireValue};
pub use codec::{FromNative, IntoNative, NativeValue, Shape};
pub use config::{init_logging, BridgeConfig, TokenPolicy, VoidCallMode};
pub use crate::core::error::{BridgeError, BridgeResult, ConversionError, EngineError};
pub use dispatch::RemoteCallable;
pub use proxy::{Capability, CapabilityRegistry, DynamicProxy, RemoteRef};
pub use session::Session;
