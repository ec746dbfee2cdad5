/// The result of a non-initializing lookup such as [`Cache::get`][get].
///
/// Unlike `Option`, the absent variant still carries a value: the empty value
/// configured for the cache. Whether a value was found is decided by the
/// variant, never by comparing against the empty value, so a cached value equal
/// to the empty value is still reported as present.
///
/// [get]: ./sync/struct.Cache.html#method.get
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Maybe<V> {
    /// The key was found.
    Present(V),
    /// The key was not found. Holds the empty value of the cache.
    Absent(V),
}

impl<V> Maybe<V> {
    /// Returns `true` if the key was found.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Returns the found value, or the empty value when absent.
    pub fn value(&self) -> &V {
        match self {
            Self::Present(v) | Self::Absent(v) => v,
        }
    }

    /// Consumes the `Maybe`, returning the found value or the empty value.
    pub fn into_value(self) -> V {
        match self {
            Self::Present(v) | Self::Absent(v) => v,
        }
    }

    /// Returns `Some` with a reference to the found value, or `None` when
    /// absent.
    pub fn as_option(&self) -> Option<&V> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent(_) => None,
        }
    }

    /// Converts into an `Option`, dropping the empty value when absent.
    pub fn into_option(self) -> Option<V> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent(_) => None,
        }
    }
}

impl<V> From<Maybe<V>> for Option<V> {
    fn from(maybe: Maybe<V>) -> Self {
        maybe.into_option()
    }
}
