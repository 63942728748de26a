use crate::{
    error::Error,
    tuple::{Tuple, Value, codec},
};

///
/// Subspace
///
/// A byte prefix that namespaces a slice of the keyspace. Packing under a
/// subspace prepends the prefix; unpacking strips it and decodes the
/// remainder as a tuple.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subspace {
    prefix: Vec<u8>,
}

impl Subspace {
    #[must_use]
    pub const fn new(prefix: Vec<u8>) -> Self {
        Self { prefix }
    }

    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Child subspace obtained by appending one packed element.
    #[must_use]
    pub fn child(&self, element: &Value) -> Self {
        let mut prefix = self.prefix.clone();
        codec::push_element(&mut prefix, element);
        Self { prefix }
    }

    /// Child subspace obtained by appending raw bytes. Used for the fixed
    /// one-byte record/index partition markers.
    #[must_use]
    pub fn raw_child(&self, bytes: &[u8]) -> Self {
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(bytes);
        Self { prefix }
    }

    /// Pack a tuple under this subspace.
    #[must_use]
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut out = self.prefix.clone();
        out.extend_from_slice(&tuple.pack());
        out
    }

    /// Decode a key that must lie under this subspace.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, Error> {
        let rest = key.strip_prefix(self.prefix.as_slice()).ok_or_else(|| {
            Error::tuple_decode("key does not lie under the expected subspace")
        })?;
        codec::unpack(rest)
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Half-open byte range covering every packed key under this subspace.
    /// Element tags sit strictly between the two sentinel bytes.
    #[must_use]
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let mut begin = self.prefix.clone();
        begin.push(0x00);
        let mut end = self.prefix.clone();
        end.push(0xFF);
        (begin, end)
    }
}

///
/// TESTS
///
