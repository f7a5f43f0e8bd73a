//! Native-side values and target shapes

use std::fmt;

use crate::core::error::{ConversionError, ConversionResult};
use crate::proxy::RemoteRef;

/// A value on the native side of the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<NativeValue>),
    /// Stand-in for a script-side object.
    Ref(RemoteRef),
    /// A host value with no script-side representation; the string names its
    /// type. Rendered as `null` when passed to the engine.
    Foreign(String),
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    pub fn as_remote(&self) -> Option<&RemoteRef> {
        match self {
            NativeValue::Ref(remote) => Some(remote),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::Long(_) => "long",
            NativeValue::Double(_) => "double",
            NativeValue::String(_) => "string",
            NativeValue::Array(_) => "array",
            NativeValue::Ref(_) => "reference",
            NativeValue::Foreign(_) => "foreign",
        }
    }
}

/// The native shape a wire value is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    /// No value expected back.
    Void,
    Bool,
    String,
    Double,
    Int,
    Long,
    Array(Box<Shape>),
    /// A capability set, named by its script-facing name.
    Capability(&'static str),
    /// Whatever comes back, unconverted.
    Any,
}

impl Shape {
    pub fn array_of(element: Shape) -> Self {
        Shape::Array(Box::new(element))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Shape::Void)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Void => write!(f, "void"),
            Shape::Bool => write!(f, "bool"),
            Shape::String => write!(f, "string"),
            Shape::Double => write!(f, "double"),
            Shape::Int => write!(f, "int"),
            Shape::Long => write!(f, "long"),
            Shape::Array(element) => write!(f, "{}[]", element),
            Shape::Capability(name) => write!(f, "{}", name),
            Shape::Any => write!(f, "any"),
        }
    }
}

/// Conversion of call arguments into native values.
pub trait IntoNative {
    fn into_native(self) -> NativeValue;
}

/// Extraction of a typed result from a converted native value.
pub trait FromNative: Sized {
    /// The shape the dispatcher converts the wire result into.
    fn shape() -> Shape;

    fn from_native(value: NativeValue) -> ConversionResult<Self>;
}

impl IntoNative for NativeValue {
    fn into_native(self) -> NativeValue {
        self
    }
}

impl IntoNative for bool {
    fn into_native(self) -> NativeValue {
        NativeValue::Bool(self)
    }
}

impl IntoNative for i32 {
    fn into_native(self) -> NativeValue {
        NativeValue::Int(self)
    }
}

impl IntoNative for i64 {
    fn into_native(self) -> NativeValue {
        NativeValue::Long(self)
    }
}

impl IntoNative for u32 {
    fn into_native(self) -> NativeValue {
        NativeValue::Long(self as i64)
    }
}

impl IntoNative for f32 {
    fn into_native(self) -> NativeValue {
        NativeValue::Double(self as f64)
    }
}

impl IntoNative for f64 {
    fn into_native(self) -> NativeValue {
        NativeValue::Double(self)
    }
}

impl IntoNative for String {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self.to_string())
    }
}

impl IntoNative for &String {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self.clone())
    }
}

impl IntoNative for RemoteRef {
    fn into_native(self) -> NativeValue {
        NativeValue::Ref(self)
    }
}

impl IntoNative for &RemoteRef {
    fn into_native(self) -> NativeValue {
        NativeValue::Ref(self.clone())
    }
}

impl<T: IntoNative> IntoNative for Option<T> {
    fn into_native(self) -> NativeValue {
        match self {
            Some(value) => value.into_native(),
            None => NativeValue::Null,
        }
    }
}

impl<T: IntoNative> IntoNative for Vec<T> {
    fn into_native(self) -> NativeValue {
        NativeValue::Array(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: IntoNative + Clone> IntoNative for &[T] {
    fn into_native(self) -> NativeValue {
        NativeValue::Array(self.iter().cloned().map(IntoNative::into_native).collect())
    }
}

impl FromNative for () {
    fn shape() -> Shape {
        Shape::Void
    }

    fn from_native(_value: NativeValue) -> ConversionResult<Self> {
        Ok(())
    }
}

impl FromNative for NativeValue {
    fn shape() -> Shape {
        Shape::Any
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        Ok(value)
    }
}

impl FromNative for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Bool(b) => Ok(b),
            other => Err(ConversionError::mismatch("bool", other.kind())),
        }
    }
}

impl FromNative for i32 {
    fn shape() -> Shape {
        Shape::Int
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Int(n) => Ok(n),
            other => Err(ConversionError::mismatch("int", other.kind())),
        }
    }
}

impl FromNative for i64 {
    fn shape() -> Shape {
        Shape::Long
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Long(n) => Ok(n),
            NativeValue::Int(n) => Ok(n as i64),
            other => Err(ConversionError::mismatch("long", other.kind())),
        }
    }
}

impl FromNative for f64 {
    fn shape() -> Shape {
        Shape::Double
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Double(n) => Ok(n),
            NativeValue::Int(n) => Ok(n as f64),
            NativeValue::Long(n) => Ok(n as f64),
            other => Err(ConversionError::mismatch("double", other.kind())),
        }
    }
}

impl FromNative for String {
    fn shape() -> Shape {
        Shape::String
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::String(s) => Ok(s),
            other => Err(ConversionError::mismatch("string", other.kind())),
        }
    }
}

impl FromNative for RemoteRef {
    fn shape() -> Shape {
        Shape::Capability(<crate::proxy::DynamicProxy as crate::proxy::Capability>::NAME)
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Ref(remote) => Ok(remote),
            other => Err(ConversionError::mismatch("reference", other.kind())),
        }
    }
}

impl<T: FromNative> FromNative for Option<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Null => Ok(None),
            other => T::from_native(other).map(Some),
        }
    }
}

impl<T: FromNative> FromNative for Vec<T> {
    fn shape() -> Shape {
        Shape::array_of(T::shape())
    }

    fn from_native(value: NativeValue) -> ConversionResult<Self> {
        match value {
            NativeValue::Array(items) => items.into_iter().map(T::from_native).collect(),
            other => Err(ConversionError::mismatch(Self::shape().to_string(), other.kind())),
        }
    }
}
