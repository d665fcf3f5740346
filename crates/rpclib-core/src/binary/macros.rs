/// Declare a wire struct together with its codec.
///
/// Fields are encoded in declaration order. The type id is derived from the
/// wire name and the ordered `name:signature` list of the fields, so
/// reordering, renaming or retyping a field yields a new id.
///
/// ```
/// use rpclib_core::binary_object;
/// use rpclib_core::binary::{Namespace, TypedObject, encode_object, decode_object};
///
/// binary_object! {
///     /// A point on the screen.
///     pub struct Point("demo.Point") {
///         pub x: i32,
///         pub y: i32,
///     }
/// }
///
/// let ns = Namespace::new();
/// ns.add::<Point>().unwrap();
/// let bytes = encode_object(&ns, &Point { x: 1, y: -1 }).unwrap();
/// let decoded = decode_object(&ns, bytes).unwrap();
/// assert_eq!(decoded.downcast_ref::<Point>(), Some(&Point { x: 1, y: -1 }));
/// ```
#[macro_export]
macro_rules! binary_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($wire:literal) {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::binary::TypedObject for $name {
            fn binary_class() -> &'static $crate::binary::BinaryClass {
                static CLASS: ::std::sync::OnceLock<$crate::binary::BinaryClass> =
                    ::std::sync::OnceLock::new();
                CLASS.get_or_init(|| {
                    $crate::binary::BinaryClass::new::<$name>(
                        $wire,
                        &[$(
                            (
                                stringify!($field),
                                <$ty as $crate::binary::Field>::signature(),
                            )
                        ),*],
                    )
                })
            }
        }

        impl $crate::binary::BinaryObject for $name {
            fn class(&self) -> &'static $crate::binary::BinaryClass {
                <Self as $crate::binary::TypedObject>::binary_class()
            }

            #[allow(unused_variables)]
            fn encode(
                &self,
                e: &mut $crate::binary::Encoder<'_>,
            ) -> $crate::error::Result<()> {
                $(
                    $crate::binary::Field::encode_field(&self.$field, e)?;
                )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode(
                &mut self,
                d: &mut $crate::binary::Decoder<'_>,
            ) -> $crate::error::Result<()> {
                $(
                    self.$field = <$ty as $crate::binary::Field>::decode_field(d)?;
                )*
                Ok(())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::std::any::Any + Send + Sync> {
                self
            }

            fn clone_object(&self) -> ::std::boxed::Box<dyn $crate::binary::BinaryObject> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn eq_object(&self, other: &dyn $crate::binary::BinaryObject) -> bool {
                other
                    .as_any()
                    .downcast_ref::<Self>()
                    .is_some_and(|other| other == self)
            }
        }

        impl $crate::binary::Field for $name {
            fn signature() -> String {
                $wire.to_string()
            }

            fn encode_field(
                &self,
                e: &mut $crate::binary::Encoder<'_>,
            ) -> $crate::error::Result<()> {
                $crate::binary::BinaryObject::encode(self, e)
            }

            fn decode_field(
                d: &mut $crate::binary::Decoder<'_>,
            ) -> $crate::error::Result<Self> {
                let mut value = <Self as ::std::default::Default>::default();
                $crate::binary::BinaryObject::decode(&mut value, d)?;
                Ok(value)
            }
        }

        impl $crate::any::FromValue for $name {
            fn from_value(value: $crate::any::Value) -> $crate::error::Result<Self> {
                value.into_object::<Self>()
            }
        }
    };
}
