//! Error types for registry operations.

use std::any::TypeId;
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Error, Debug, Clone)]
pub enum BeanError {
    /// No exact or compatible binding exists for the requested type.
    #[error("no binding found for {type_name}")]
    NoBindingFound {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// A binding matched, but its instance cannot stand in for the requested
    /// type. This is a contract violation at the declaration site, not a
    /// recoverable condition.
    #[error("binding for {bound} does not produce the requested {requested}")]
    TypeMismatch {
        requested: &'static str,
        bound: &'static str,
    },

    /// A construction closure resolved its own key before its instance
    /// existed.
    #[error("circular resolution of {type_name} during its own construction")]
    CircularDependency { type_name: &'static str },
}

impl BeanError {
    /// A `NoBindingFound` error for the requested type.
    #[inline]
    pub fn not_found<T: ?Sized + 'static>() -> Self {
        Self::NoBindingFound {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// A `TypeMismatch` error: the binding for `bound` cannot produce `U`.
    #[inline]
    pub fn mismatch<U: ?Sized + 'static>(bound: &'static str) -> Self {
        Self::TypeMismatch {
            requested: std::any::type_name::<U>(),
            bound,
        }
    }

    /// A `CircularDependency` error for the named type.
    #[inline]
    pub fn circular(type_name: &'static str) -> Self {
        Self::CircularDependency { type_name }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, BeanError>;
