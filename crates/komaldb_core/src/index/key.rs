//! Hashable projection of scalar values.

use komaldb_codec::Value;

/// The form in which a field value is stored in an index.
///
/// Only scalars are indexable. Floats with no fractional part are folded
/// into `Integer`, so `1` and `1.0` (and `0` and `-0.0`) are the same index
/// entry. Every NaN maps to one canonical entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// `null`.
    Null,
    /// A boolean. Never equal to an integer.
    Bool(bool),
    /// An integer, or an integral float.
    Integer(i64),
    /// Bit pattern of a non-integral float.
    Float(u64),
    /// A string.
    Text(String),
}

impl IndexKey {
    /// Projects a value, or `None` for arrays and objects.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Integer(n) => Some(IndexKey::Integer(*n)),
            Value::Float(x) => Some(Self::from_float(*x)),
            Value::Text(s) => Some(IndexKey::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_float(x: f64) -> Self {
        if x.is_nan() {
            return IndexKey::Float(f64::NAN.to_bits());
        }
        // i64::MAX as f64 rounds up to 2^63, which is out of range.
        if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
            return IndexKey::Integer(x as i64);
        }
        IndexKey::Float(x.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_indexable() {
        assert_eq!(IndexKey::from_value(&Value::Null), Some(IndexKey::Null));
        assert_eq!(
            IndexKey::from_value(&Value::from("a")),
            Some(IndexKey::Text("a".to_string()))
        );
        assert_eq!(
            IndexKey::from_value(&Value::Bool(true)),
            Some(IndexKey::Bool(true))
        );
    }

    #[test]
    fn containers_are_not_indexable() {
        assert_eq!(IndexKey::from_value(&Value::from(vec![1i64])), None);
        assert_eq!(
            IndexKey::from_value(&Value::object([("a", Value::Null)])),
            None
        );
    }

    #[test]
    fn integral_floats_fold_into_integers() {
        assert_eq!(
            IndexKey::from_value(&Value::Float(1.0)),
            IndexKey::from_value(&Value::Integer(1))
        );
        assert_eq!(
            IndexKey::from_value(&Value::Float(-0.0)),
            Some(IndexKey::Integer(0))
        );
        assert_eq!(
            IndexKey::from_value(&Value::Float(1.5)),
            Some(IndexKey::Float(1.5f64.to_bits()))
        );
    }

    #[test]
    fn bool_is_not_integer() {
        assert_ne!(
            IndexKey::from_value(&Value::Bool(true)),
            IndexKey::from_value(&Value::Integer(1))
        );
    }

    #[test]
    fn huge_and_special_floats() {
        assert!(matches!(
            IndexKey::from_value(&Value::Float(1e300)),
            Some(IndexKey::Float(_))
        ));
        assert_eq!(
            IndexKey::from_value(&Value::Float(f64::NAN)),
            IndexKey::from_value(&Value::Float(-f64::NAN))
        );
        assert!(matches!(
            IndexKey::from_value(&Value::Float(f64::INFINITY)),
            Some(IndexKey::Float(_))
        ));
    }
}
