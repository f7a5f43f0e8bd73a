//! Engine Binding Layer
//!
//! Everything that touches the embedded script engine directly: the boundary
//! protocol, the bootstrap script that installs the handle table, and the
//! QuickJS adapter.
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Native side                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │  Stand-ins   │──>│  Dispatcher  │──>│ Expressions  │     │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘     │
//! │                            │                                │
//! │                            v                                │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │   ScriptEngine protocol (evaluate / execute)        │    │
//! │  │   WireValue: null | bool | number | string | array  │    │
//! │  └───────────────────────┬─────────────────────────────┘    │
//! │                          │                                  │
//! │                          v                                  │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │  Script side: handle table + converter (bootstrap)  │    │
//! │  │  nsiArray[0] = root, "nsiId=<n>" reference tokens   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod js;
pub mod protocol;

pub use js::QuickJsEngine;
pub use protocol::*;
