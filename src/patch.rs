//! Three-state update values for nullable fields.

/// How an update treats a nullable field.
///
/// `Option<T>` cannot tell "leave it alone" from "set it to null", so
/// nullable columns (vault description, secret domain) are updated
/// through a `Patch` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Store null.
    Clear,
    /// Store a new value.
    Set(T),
}

impl<T> Patch<T> {
    /// Apply the patch to the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Keep => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// The new value, if this patch sets one.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Build a patch from a "new value" argument and a "clear" flag, the
    /// way command-line front ends expose nullable fields.
    pub fn from_parts(value: Option<T>, clear: bool) -> Self {
        match (value, clear) {
            (Some(value), _) => Self::Set(value),
            (None, true) => Self::Clear,
            (None, false) => Self::Keep,
        }
    }
}
