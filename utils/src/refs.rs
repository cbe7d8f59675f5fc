use std::ops::Deref;
use std::sync::Arc;

/// A unified reference type which can hold either a borrowed reference or an `Arc`,
/// allowing APIs to serve both callers without cloning the underlying value.
pub enum Refs<'a, T> {
    Ref(&'a T),
    Arc(Arc<T>),
}

impl<T> Deref for Refs<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            Refs::Ref(r) => r,
            Refs::Arc(a) => a,
        }
    }
}

impl<'a, T> From<&'a T> for Refs<'a, T> {
    fn from(r: &'a T) -> Self {
        Refs::Ref(r)
    }
}

impl<T> From<Arc<T>> for Refs<'_, T> {
    fn from(a: Arc<T>) -> Self {
        Refs::Arc(a)
    }
}
