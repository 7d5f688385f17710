//! Typed argument values.
//!
//! A [`Value`] is one parsed interpretation of an argument token. Its
//! [`ValueType`] is the exact runtime type the overload resolver compares
//! against a target's declared parameter types; there is no widening, so an
//! `I32` candidate never satisfies an `I64` parameter.
//!
//! Rust types take part in resolution through two traits:
//!
//! - [`ArgType`]: a concrete value type with a fixed [`ValueType`] tag.
//! - [`Param`]: a parameter of a bound function. Every `ArgType` is a required
//!   parameter and every `Option<ArgType>` is an optional one.
//!
//! Types outside the built-in set join through [`CustomValue`] and the
//! [`custom_value!`](crate::custom_value) macro.

pub mod parser;

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::output::{CommandOutput, CommandResult, IntoOutput};

// ============================================================================
// ValueType
// ============================================================================

/// Identity of a user-defined value type.
#[derive(Debug, Clone, Copy)]
pub struct CustomType {
    id: TypeId,
    name: &'static str,
}

impl CustomType {
    pub fn of<T: Any>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CustomType {}

impl Hash for CustomType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The runtime type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Bool,
    Char,
    String,
    Custom(CustomType),
}

impl ValueType {
    /// Human readable type name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "string",
            Self::Custom(custom) => custom.name(),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// CustomValue
// ============================================================================

trait DynValue: Any + Send + Sync + fmt::Display + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynValue for T
where
    T: Any + Send + Sync + fmt::Display + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value of a user-defined type, shared behind an `Arc`.
#[derive(Clone)]
pub struct CustomValue {
    ty: CustomType,
    inner: Arc<dyn DynValue>,
}

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display + fmt::Debug,
    {
        Self {
            ty: CustomType::of::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn custom_type(&self) -> CustomType {
        self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        // Deref first, `Arc<dyn DynValue>` is itself a `DynValue`.
        (*self.inner).as_any().downcast_ref::<T>()
    }

    /// Identity comparison; two custom values are equal only if they share storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomValue").field(&self.inner).finish()
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

// ============================================================================
// Value
// ============================================================================

/// One typed interpretation of an argument.
#[derive(Debug, Clone)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Bool(bool),
    Char(char),
    String(String),
    Custom(CustomValue),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::I8(_) => ValueType::I8,
            Self::I16(_) => ValueType::I16,
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::U8(_) => ValueType::U8,
            Self::U16(_) => ValueType::U16,
            Self::U32(_) => ValueType::U32,
            Self::U64(_) => ValueType::U64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::Decimal(_) => ValueType::Decimal,
            Self::Bool(_) => ValueType::Bool,
            Self::Char(_) => ValueType::Char,
            Self::String(_) => ValueType::String,
            Self::Custom(custom) => ValueType::Custom(custom.custom_type()),
        }
    }

    /// Wraps a user-defined value.
    pub fn custom<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display + fmt::Debug,
    {
        Self::Custom(CustomValue::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts into a concrete Rust type when the runtime type matches exactly.
    pub fn get<T: ArgType>(self) -> Option<T> {
        T::from_value(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => fmt::Display::fmt(v, f),
            Self::I16(v) => fmt::Display::fmt(v, f),
            Self::I32(v) => fmt::Display::fmt(v, f),
            Self::I64(v) => fmt::Display::fmt(v, f),
            Self::U8(v) => fmt::Display::fmt(v, f),
            Self::U16(v) => fmt::Display::fmt(v, f),
            Self::U32(v) => fmt::Display::fmt(v, f),
            Self::U64(v) => fmt::Display::fmt(v, f),
            Self::F32(v) => fmt::Display::fmt(v, f),
            Self::F64(v) => fmt::Display::fmt(v, f),
            Self::Decimal(v) => fmt::Display::fmt(v, f),
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Char(v) => fmt::Display::fmt(v, f),
            Self::String(v) => f.write_str(v),
            Self::Custom(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl IntoOutput for Value {
    fn into_output(self) -> CommandResult {
        Ok(CommandOutput::Value(self))
    }
}

// ============================================================================
// ArgType / Param
// ============================================================================

/// A concrete Rust type with a fixed [`ValueType`].
pub trait ArgType: Sized {
    fn value_type() -> ValueType;

    /// Extracts `Self` when `value` has exactly this runtime type.
    fn from_value(value: Value) -> Option<Self>;
}

/// A parameter of a bound command function.
///
/// `from_slot` receives `None` for a trailing optional parameter that was
/// not supplied.
pub trait Param: Sized {
    fn value_type() -> ValueType;

    fn required() -> bool;

    fn from_slot(slot: Option<Value>) -> Option<Self>;
}

/// Every value type is also an optional trailing parameter.
impl<T: ArgType> Param for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn required() -> bool {
        false
    }

    fn from_slot(slot: Option<Value>) -> Option<Self> {
        match slot {
            None => Some(None),
            Some(value) => T::from_value(value).map(Some),
        }
    }
}

macro_rules! impl_value_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ArgType for $ty {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl Param for $ty {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }

                fn required() -> bool {
                    true
                }

                fn from_slot(slot: Option<Value>) -> Option<Self> {
                    slot.and_then(<$ty as ArgType>::from_value)
                }
            }

            impl IntoOutput for $ty {
                fn into_output(self) -> CommandResult {
                    Ok(CommandOutput::Value(Value::$variant(self)))
                }
            }
        )*
    };
}

impl_value_type! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    bool => Bool,
    char => Char,
    String => String,
}

/// Implements the value traits for a user-defined type.
///
/// The type must be `Clone + Debug + Display + Send + Sync + 'static`. Values
/// are stored as [`Value::Custom`]; a matching parser is registered separately
/// with [`ValueParserRegistry::register_fn`](crate::ValueParserRegistry::register_fn).
///
/// ```rust,ignore
/// #[derive(Debug, Clone)]
/// struct Color(u8, u8, u8);
///
/// conch_core::custom_value!(Color);
/// ```
#[macro_export]
macro_rules! custom_value {
    ($ty:ty) => {
        impl $crate::ArgType for $ty {
            fn value_type() -> $crate::ValueType {
                $crate::ValueType::Custom($crate::CustomType::of::<$ty>())
            }

            fn from_value(value: $crate::Value) -> ::std::option::Option<Self> {
                match value {
                    $crate::Value::Custom(custom) => custom.downcast_ref::<$ty>().cloned(),
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::std::convert::From<$ty> for $crate::Value {
            fn from(value: $ty) -> Self {
                $crate::Value::custom(value)
            }
        }

        impl $crate::Param for $ty {
            fn value_type() -> $crate::ValueType {
                <$ty as $crate::ArgType>::value_type()
            }

            fn required() -> bool {
                true
            }

            fn from_slot(slot: ::std::option::Option<$crate::Value>) -> ::std::option::Option<Self> {
                slot.and_then(<$ty as $crate::ArgType>::from_value)
            }
        }

        impl $crate::IntoOutput for $ty {
            fn into_output(self) -> $crate::CommandResult {
                ::std::result::Result::Ok($crate::CommandOutput::Value($crate::Value::custom(self)))
            }
        }
    };
}
