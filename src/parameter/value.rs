// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Typed values produced by parameter transformers.

use std::{any::Any, sync::Arc};

use chrono::NaiveDate;
use derive_more::with_trait::{Display, From};

use crate::error::ArgumentError;

/// Value extracted from a step text and coerced by a [`ParameterType`].
///
/// [`ParameterType`]: super::ParameterType
#[derive(Clone, Debug, Display, From)]
pub enum Argument {
    /// `{string}`, `{word}`, `{any}` and auto-detected untyped captures.
    #[display("{_0}")]
    Str(String),

    /// `{int}`.
    #[display("{_0}")]
    Int(i64),

    /// `{float}`.
    #[display("{_0}")]
    Float(f64),

    /// `{boolean}`.
    #[display("{_0}")]
    Bool(bool),

    /// `{date}`.
    #[display("{_0}")]
    Date(NaiveDate),

    /// `{list}`.
    #[display("{}", _0.join(", "))]
    List(Vec<String>),

    /// `{json}`.
    #[display("{_0}")]
    Json(serde_json::Value),

    /// Output of a user-defined transformer.
    #[display("<custom>")]
    #[from(skip)]
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Argument {
    /// Wraps an arbitrary value produced by a custom transformer.
    #[must_use]
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Date(_) => "date",
            Self::List(_) => "list",
            Self::Json(_) => "json",
            Self::Custom(_) => "custom",
        }
    }

    /// Returns the string value, if this is a [`Argument::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an [`Argument::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a float, widening an [`Argument::Int`] if needed.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is an [`Argument::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the date, if this is an [`Argument::Date`].
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the list items, if this is an [`Argument::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the JSON document, if this is an [`Argument::Json`].
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Downcasts a [`Argument::Custom`] value.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(v) => v.downcast_ref(),
            _ => None,
        }
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

/// Conversion of an [`Argument`] into a concrete Rust type, used by
/// [`StepCall::arg()`].
///
/// [`StepCall::arg()`]: crate::step::StepCall::arg
pub trait FromArgument: Sized {
    /// Converts the `arg`, returning [`None`] on a kind mismatch.
    fn from_argument(arg: &Argument) -> Option<Self>;

    /// Converts the `index`-th of the `args`.
    ///
    /// # Errors
    ///
    /// If the argument is absent or of an incompatible kind.
    fn extract(args: &[Argument], index: usize) -> Result<Self, ArgumentError> {
        let arg = args.get(index);
        arg.and_then(Self::from_argument).ok_or(ArgumentError {
            index,
            expected: std::any::type_name::<Self>(),
            actual: arg.map(Argument::kind),
        })
    }
}

impl FromArgument for Argument {
    fn from_argument(arg: &Argument) -> Option<Self> {
        Some(arg.clone())
    }
}

impl FromArgument for String {
    fn from_argument(arg: &Argument) -> Option<Self> {
        match arg {
            Argument::Str(s) => Some(s.clone()),
            Argument::Custom(_) => None,
            other => Some(other.to_string()),
        }
    }
}

macro_rules! impl_from_argument_for_int {
    ($($ty:ty),* $(,)?) => {$(
        impl FromArgument for $ty {
            fn from_argument(arg: &Argument) -> Option<Self> {
                arg.as_int().and_then(|i| <$ty>::try_from(i).ok())
            }
        }
    )*};
}

impl_from_argument_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromArgument for f64 {
    fn from_argument(arg: &Argument) -> Option<Self> {
        arg.as_float()
    }
}

impl FromArgument for bool {
    fn from_argument(arg: &Argument) -> Option<Self> {
        arg.as_bool()
    }
}

impl FromArgument for NaiveDate {
    fn from_argument(arg: &Argument) -> Option<Self> {
        arg.as_date()
    }
}

impl FromArgument for Vec<String> {
    fn from_argument(arg: &Argument) -> Option<Self> {
        arg.as_list().map(<[String]>::to_vec)
    }
}

impl FromArgument for serde_json::Value {
    fn from_argument(arg: &Argument) -> Option<Self> {
        arg.as_json().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_typed_values() {
        let args = vec![Argument::from("abc"), Argument::Int(42)];

        assert_eq!(String::extract(&args, 0), Ok("abc".to_owned()));
        assert_eq!(i64::extract(&args, 1), Ok(42));
        assert_eq!(u8::extract(&args, 1), Ok(42));
        assert_eq!(f64::extract(&args, 1), Ok(42.0));
    }

    #[test]
    fn reports_mismatches() {
        let args = vec![Argument::from("abc")];

        let err = i64::extract(&args, 0).unwrap_err();
        assert_eq!(err.actual, Some("string"));

        let err = bool::extract(&args, 3).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.actual, None);
    }

    #[test]
    fn custom_values_downcast() {
        #[derive(Debug, PartialEq)]
        struct Color(&'static str);

        let arg = Argument::custom(Color("red"));
        assert_eq!(arg.downcast_ref::<Color>(), Some(&Color("red")));
        assert_eq!(arg.downcast_ref::<String>(), None);
        assert_eq!(arg.clone(), arg);
    }
}
