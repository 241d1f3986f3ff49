use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InputDataError;

/// Category a point belongs to, e.g. `wo` (university) or `hbo` (applied
/// sciences). Compared by its trimmed name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Result<Self, InputDataError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(InputDataError::EmptyCategory);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Category {
    type Error = InputDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_trims_name() {
        let category = Category::new("  hbo ").unwrap();
        assert_eq!(category.as_str(), "hbo");
        assert_eq!(category, Category::new("hbo").unwrap());
    }

    #[test]
    fn test_category_rejects_blank() {
        assert_eq!(Category::new("   "), Err(InputDataError::EmptyCategory));
        assert!(serde_json::from_str::<Category>(r#""""#).is_err());
    }
}
