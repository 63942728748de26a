pub mod codec;
mod element;
mod subspace;

pub use element::{ScalarKind, Value};
pub use subspace::Subspace;

use serde::{Deserialize, Serialize};

///
/// Tuple
///
/// Ordered heterogeneous sequence of scalar values. Tuples compare
/// lexicographically by element, then by length, which is exactly the
/// order their packed byte form sorts in.
///

#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    #[must_use]
    pub const fn new(elements: Vec<Value>) -> Self {
        Self(elements)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn single(element: Value) -> Self {
        Self(vec![element])
    }

    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, element: Value) {
        self.0.push(element);
    }

    /// Concatenate another tuple onto this one.
    #[must_use]
    pub fn concat(mut self, tail: &Self) -> Self {
        self.0.extend(tail.0.iter().cloned());
        self
    }

    /// The trailing `len` elements as a new tuple. Used to recover the
    /// primary key suffix of an index entry.
    pub fn suffix(&self, len: usize) -> Result<Self, crate::error::Error> {
        if self.0.len() < len {
            return Err(crate::error::Error::tuple_decode(format!(
                "tuple of arity {} has no suffix of length {len}",
                self.0.len()
            )));
        }
        Ok(Self(self.0[self.0.len() - len..].to_vec()))
    }

    /// The leading `len` elements as a new tuple.
    pub fn prefix(&self, len: usize) -> Result<Self, crate::error::Error> {
        if self.0.len() < len {
            return Err(crate::error::Error::tuple_decode(format!(
                "tuple of arity {} has no prefix of length {len}",
                self.0.len()
            )));
        }
        Ok(Self(self.0[..len].to_vec()))
    }

    /// Canonical packed byte form.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        codec::pack(self)
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(elements: Vec<Value>) -> Self {
        Self(elements)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Tuple {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuples_compare_elementwise_then_by_length() {
        let short = Tuple::new(vec![Value::Int(1)]);
        let long = Tuple::new(vec![Value::Int(1), Value::Int(0)]);
        assert!(short < long);

        let left = Tuple::new(vec![Value::Int(1), Value::Int(9)]);
        let right = Tuple::new(vec![Value::Int(2)]);
        assert!(left < right);
    }

    #[test]
    fn suffix_recovers_trailing_elements() {
        let tuple = Tuple::new(vec![Value::Text("Tokyo".into()), Value::Int(2)]);
        let pk = tuple.suffix(1).expect("suffix");
        assert_eq!(pk, Tuple::single(Value::Int(2)));
        assert!(tuple.suffix(3).is_err());
    }
}
