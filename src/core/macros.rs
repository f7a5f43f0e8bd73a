//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// # use script_proxy::impl_default;
/// struct MyStruct {
///     field1: u32,
///     field2: String,
/// }
///
/// impl_default!(MyStruct {
///     field1: 0,
///     field2: String::new(),
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 从成员表生成强类型的替身（stand-in）
///
/// 每个条目把脚本侧成员名映射到一个Rust方法。生成的方法用`IntoNative`转换参数，
/// 以返回类型的`FromNative::shape()`发起调用，再用`FromNative`取回结果。
///
/// 使用示例:
/// ```rust
/// use script_proxy::capability;
///
/// capability! {
///     /// A DOM node.
///     pub struct Node: "Node" {
///         "getNodeName" => fn node_name(&self) -> Option<String>;
///         "appendChild" => fn append_child(&self, child: &Node) -> Option<Node>;
///         "setAttribute" => fn set_attribute(&self, name: &str, value: &str) -> ();
///     }
/// }
/// ```
#[macro_export]
macro_rules! capability {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $script_name:literal {
            $(
                $(#[$member_meta:meta])*
                $member:literal => fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash)]
        $vis struct $name {
            remote: $crate::proxy::RemoteRef,
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("handle", &self.remote.handle())
                    .finish()
            }
        }

        impl $crate::proxy::Capability for $name {
            const NAME: &'static str = $script_name;
            const MEMBERS: &'static [&'static str] = &[$($member),*];

            fn from_remote(remote: $crate::proxy::RemoteRef) -> Self {
                Self {
                    remote: remote.with_capability($script_name),
                }
            }

            fn remote(&self) -> &$crate::proxy::RemoteRef {
                &self.remote
            }
        }

        impl $crate::dispatch::RemoteCallable for $name {
            fn invoke(
                &self,
                member: &str,
                args: ::std::vec::Vec<$crate::codec::NativeValue>,
                returns: &$crate::codec::Shape,
            ) -> $crate::core::error::BridgeResult<$crate::codec::NativeValue> {
                $crate::dispatch::RemoteCallable::invoke(&self.remote, member, args, returns)
            }
        }

        impl $crate::codec::IntoNative for $name {
            fn into_native(self) -> $crate::codec::NativeValue {
                $crate::codec::NativeValue::Ref(self.remote)
            }
        }

        impl $crate::codec::IntoNative for &$name {
            fn into_native(self) -> $crate::codec::NativeValue {
                $crate::codec::NativeValue::Ref(self.remote.clone())
            }
        }

        impl $crate::codec::FromNative for $name {
            fn shape() -> $crate::codec::Shape {
                $crate::codec::Shape::Capability($script_name)
            }

            fn from_native(
                value: $crate::codec::NativeValue,
            ) -> $crate::core::error::ConversionResult<Self> {
                match value {
                    $crate::codec::NativeValue::Ref(remote) => {
                        Ok(<Self as $crate::proxy::Capability>::from_remote(remote))
                    }
                    other => Err($crate::core::error::ConversionError::mismatch(
                        $script_name,
                        other.kind(),
                    )),
                }
            }
        }

        impl $name {
            $(
                $(#[$member_meta])*
                pub fn $method(&self $(, $arg: $arg_ty)*) -> $crate::core::error::BridgeResult<$ret> {
                    let args = vec![$($crate::codec::IntoNative::into_native($arg)),*];
                    let value = $crate::dispatch::RemoteCallable::invoke(
                        self,
                        $member,
                        args,
                        &<$ret as $crate::codec::FromNative>::shape(),
                    )?;
                    Ok(<$ret as $crate::codec::FromNative>::from_native(value)?)
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::proxy::Capability;

    #[derive(Debug)]
    struct TestStruct {
        field1: u32,
        field2: String,
    }

    impl_default!(TestStruct {
        field1: 0,
        field2: String::new(),
    });

    capability! {
        /// Test capability.
        struct Counter: "Counter" {
            "increment" => fn increment(&self, by: i32) -> i32;
            "getValue" => fn value(&self) -> i32;
            "reset" => fn reset(&self) -> ();
        }
    }

    #[test]
    fn test_impl_default() {
        let s = TestStruct::default();
        assert_eq!(s.field1, 0);
        assert_eq!(s.field2, "");
    }

    #[test]
    fn test_capability_descriptor() {
        assert_eq!(Counter::NAME, "Counter");
        assert_eq!(Counter::MEMBERS, &["increment", "getValue", "reset"]);
        assert_eq!(
            <Counter as crate::codec::FromNative>::shape(),
            crate::codec::Shape::Capability("Counter")
        );
    }
}
