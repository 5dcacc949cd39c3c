//! By-id access to the original inputs.
//!
//! The mapper never keeps inputs. When two entries share a key, it asks an
//! [`InputLookup`] for the inputs behind their ids and compares them.

use std::borrow::Cow;

/// Returns the input first recorded under a given id.
///
/// In-memory collections hand out borrowed bytes. Lookups that re-read or
/// re-derive the input (from a file, a generator) return owned bytes, which
/// the mapper drops right after the comparison.
pub trait InputLookup {
    fn input(&self, id: u64) -> Option<Cow<'_, [u8]>>;
}

impl<T: AsRef<[u8]>> InputLookup for [T] {
    #[inline]
    fn input(&self, id: u64) -> Option<Cow<'_, [u8]>> {
        let index = usize::try_from(id).ok()?;
        self.get(index).map(|v| Cow::Borrowed(v.as_ref()))
    }
}

impl<T: AsRef<[u8]>> InputLookup for Vec<T> {
    #[inline]
    fn input(&self, id: u64) -> Option<Cow<'_, [u8]>> {
        self.as_slice().input(id)
    }
}

/// Adapts a closure that materializes inputs on demand.
///
/// ```rust
/// use dense_idmap::{FnLookup, InputLookup};
///
/// let lookup = FnLookup(|id: u64| Some(format!("node-{id}").into_bytes()));
/// assert_eq!(lookup.input(7).as_deref(), Some(&b"node-7"[..]));
/// ```
pub struct FnLookup<F>(pub F);

impl<F> InputLookup for FnLookup<F>
where
    F: Fn(u64) -> Option<Vec<u8>>,
{
    #[inline]
    fn input(&self, id: u64) -> Option<Cow<'_, [u8]>> {
        (self.0)(id).map(Cow::Owned)
    }
}

/// Matches nothing. For mappers that never consult inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl InputLookup for NoLookup {
    #[inline]
    fn input(&self, _id: u64) -> Option<Cow<'_, [u8]>> {
        None
    }
}
