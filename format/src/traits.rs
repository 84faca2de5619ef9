use crate::error::BbdbError;
use serde_json::Value;

/// Types that can be rebuilt from their generic tree form.
/// Malformed trees must fail with `BbdbError::Validation`.
pub trait FromTree: Sized {
    fn from_tree(value: &Value) -> Result<Self, BbdbError>;
}
