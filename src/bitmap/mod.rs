mod container;
mod fmt;
#[cfg(test)]
mod proptests;
pub(crate) mod store;
pub(crate) mod util;

// Order of these modules matters as it determines the `impl` blocks order in
// the docs
mod cmp;
mod inherent;
mod iter;
mod ops;
pub(crate) mod serialization;

pub(crate) use self::cmp::Pairs;
pub(crate) use self::container::{Container, ARRAY_LIMIT, INVERT_LIMIT};
pub use self::iter::{IntoIter, Iter};

/// A compressed bitmap of `u32` values using the
/// [Roaring bitmap compression scheme](https://roaringbitmap.org/).
///
/// # Examples
///
/// ```rust
/// use roaring_pack::RoaringBitmap;
///
/// let mut rb = RoaringBitmap::new();
///
/// // insert all primes less than 10
/// rb.insert(2);
/// rb.insert(3);
/// rb.insert(5);
/// rb.insert(7);
/// println!("total bits set to true: {}", rb.len());
/// ```
#[derive(PartialEq)]
pub struct RoaringBitmap {
    containers: Vec<container::Container>,
}
