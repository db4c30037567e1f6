//! Explicit "no data" result state
//!
//! An empty configuration group is a valid state, not an error: downstream
//! consumers must see absence rather than a curve of zeros.

use serde::Serialize;

/// Result of a reduction that may legitimately have nothing to reduce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The reduction produced a value.
    Value(T),
    /// There were no usable inputs.
    NoData,
}

impl<T> Outcome<T> {
    /// Returns `true` when no value was produced.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    /// Borrow the value, if present.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::NoData => None,
        }
    }

    /// Convert into an `Option`, discarding the no-data marker.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::NoData => None,
        }
    }

    /// Map the contained value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Value(v) => Outcome::Value(f(v)),
            Self::NoData => Outcome::NoData,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NoData, Self::Value)
    }
}
