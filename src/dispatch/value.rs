//! Uniform value representation for dispatched arguments and results.
//!
//! Intercepted call sites box every argument into a [`ShadowValue`] before handing it to the
//! dispatcher, so substitutes see one representation regardless of the primitive width the
//! call site used. Boxing is lossless: each primitive width keeps its own variant.
//!
//! # Primitive Mapping
//!
//! | Call-site type | ShadowValue Variant |
//! |----------------|---------------------|
//! | `bool` | [`ShadowValue::Bool`] |
//! | `i8` | [`ShadowValue::I8`] |
//! | `i16` | [`ShadowValue::I16`] |
//! | `i32` | [`ShadowValue::I32`] |
//! | `i64` | [`ShadowValue::I64`] |
//! | `u16` | [`ShadowValue::U16`] |
//! | `f32` | [`ShadowValue::F32`] |
//! | `f64` | [`ShadowValue::F64`] |
//! | `char` | [`ShadowValue::Char`] |
//! | `&str`, `String` | [`ShadowValue::Str`] |
//! | [`ObjectRef`] | [`ShadowValue::Object`] |
//! | `None` | [`ShadowValue::Null`] |
//! | `()` | [`ShadowValue::Void`] |

use std::{fmt, sync::Arc};

use crate::dispatch::object::{ObjectId, ObjectRef};

/// A boxed argument or return value of a dispatched call.
#[derive(Clone)]
pub enum ShadowValue {
    /// No value (void return).
    Void,
    /// Null reference.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// UTF-16 code unit, the platform's native `char` width.
    U16(u16),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Unicode character.
    Char(char),
    /// Immutable string.
    Str(Arc<str>),
    /// Reference to a platform object.
    Object(ObjectRef),
}

impl ShadowValue {
    /// Name of the boxed type, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ShadowValue::Void => "void",
            ShadowValue::Null => "null",
            ShadowValue::Bool(_) => "boolean",
            ShadowValue::I8(_) => "byte",
            ShadowValue::I16(_) => "short",
            ShadowValue::I32(_) => "int",
            ShadowValue::I64(_) => "long",
            ShadowValue::U16(_) => "char16",
            ShadowValue::F32(_) => "float",
            ShadowValue::F64(_) => "double",
            ShadowValue::Char(_) => "char",
            ShadowValue::Str(_) => "string",
            ShadowValue::Object(_) => "object",
        }
    }

    /// Returns `true` for [`ShadowValue::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, ShadowValue::Void)
    }

    /// Returns `true` for [`ShadowValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ShadowValue::Null)
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ShadowValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to `i64`, if this is an integer of any width.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ShadowValue::I8(v) => Some(i64::from(*v)),
            ShadowValue::I16(v) => Some(i64::from(*v)),
            ShadowValue::I32(v) => Some(i64::from(*v)),
            ShadowValue::I64(v) => Some(*v),
            ShadowValue::U16(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Returns the value as `i32`, if this is an integer that fits.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    /// Returns the value widened to `f64`, if this is a float of either width.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ShadowValue::F32(v) => Some(f64::from(*v)),
            ShadowValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the character, if this is a char.
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self {
            ShadowValue::Char(c) => Some(*c),
            ShadowValue::U16(unit) => char::from_u32(u32::from(*unit)),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ShadowValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object reference, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            ShadowValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for ShadowValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ShadowValue::Void, ShadowValue::Void) | (ShadowValue::Null, ShadowValue::Null) => true,
            (ShadowValue::Bool(a), ShadowValue::Bool(b)) => a == b,
            (ShadowValue::I8(a), ShadowValue::I8(b)) => a == b,
            (ShadowValue::I16(a), ShadowValue::I16(b)) => a == b,
            (ShadowValue::I32(a), ShadowValue::I32(b)) => a == b,
            (ShadowValue::I64(a), ShadowValue::I64(b)) => a == b,
            (ShadowValue::U16(a), ShadowValue::U16(b)) => a == b,
            // Bitwise, so a boxed NaN equals itself
            (ShadowValue::F32(a), ShadowValue::F32(b)) => a.to_bits() == b.to_bits(),
            (ShadowValue::F64(a), ShadowValue::F64(b)) => a.to_bits() == b.to_bits(),
            (ShadowValue::Char(a), ShadowValue::Char(b)) => a == b,
            (ShadowValue::Str(a), ShadowValue::Str(b)) => a == b,
            (ShadowValue::Object(a), ShadowValue::Object(b)) => {
                ObjectId::of(a) == ObjectId::of(b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ShadowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShadowValue::Void => f.write_str("Void"),
            ShadowValue::Null => f.write_str("Null"),
            ShadowValue::Bool(v) => write!(f, "Bool({v})"),
            ShadowValue::I8(v) => write!(f, "I8({v})"),
            ShadowValue::I16(v) => write!(f, "I16({v})"),
            ShadowValue::I32(v) => write!(f, "I32({v})"),
            ShadowValue::I64(v) => write!(f, "I64({v})"),
            ShadowValue::U16(v) => write!(f, "U16({v:#06x})"),
            ShadowValue::F32(v) => write!(f, "F32({v:?})"),
            ShadowValue::F64(v) => write!(f, "F64({v:?})"),
            ShadowValue::Char(v) => write!(f, "Char({v:?})"),
            ShadowValue::Str(v) => write!(f, "Str({v:?})"),
            ShadowValue::Object(o) => write!(f, "Object({}@{})", o.class_id(), ObjectId::of(o)),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ShadowValue {
                fn from(value: $ty) -> Self {
                    ShadowValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    f32 => F32,
    f64 => F64,
    char => Char,
    ObjectRef => Object,
}

impl From<&str> for ShadowValue {
    fn from(value: &str) -> Self {
        ShadowValue::Str(Arc::from(value))
    }
}

impl From<String> for ShadowValue {
    fn from(value: String) -> Self {
        ShadowValue::Str(Arc::from(value))
    }
}

impl From<()> for ShadowValue {
    fn from((): ()) -> Self {
        ShadowValue::Void
    }
}

impl<T: Into<ShadowValue>> From<Option<T>> for ShadowValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ShadowValue::Null, Into::into)
    }
}

/// Boxes a call-site value into its uniform representation.
///
/// # Examples
///
/// ```rust
/// use shadowhost::dispatch::{autobox, ShadowValue};
///
/// assert_eq!(autobox(7i16), ShadowValue::I16(7));
/// assert_eq!(autobox(None::<i32>), ShadowValue::Null);
/// ```
pub fn autobox<T: Into<ShadowValue>>(value: T) -> ShadowValue {
    value.into()
}

/// Boxes a heterogeneous argument list into a `Vec<ShadowValue>`.
///
/// ```rust
/// use shadowhost::{args, dispatch::ShadowValue};
///
/// let boxed = args![1i32, 2.5f64, 'x', "text"];
/// assert_eq!(boxed[0], ShadowValue::I32(1));
/// assert_eq!(boxed.len(), 4);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::dispatch::ShadowValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::dispatch::autobox($value)),+]
    };
}
