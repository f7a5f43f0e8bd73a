//! Value Codec
//!
//! Native values, target shapes and the conversion rules between them and
//! the wire form exchanged with the engine.

pub mod convert;
pub mod value;

pub use convert::{from_wire, pass_through, to_wire};
pub use value::{FromNative, IntoNative, NativeValue, Shape};
