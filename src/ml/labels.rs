use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maps class labels to contiguous indices in sorted label order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Collect the distinct labels
    pub fn fit<L: AsRef<str>>(labels: &[L]) -> Result<Self> {
        let classes: BTreeSet<&str> = labels.iter().map(|l| l.as_ref()).collect();
        if classes.is_empty() {
            return Err(AppError::Training("no labels to encode".to_string()));
        }
        Ok(Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        })
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| AppError::Validation(format!("unknown label '{}'", label)))
    }

    pub fn encode_all<L: AsRef<str>>(&self, labels: &[L]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, index: usize) -> Result<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| AppError::Prediction(format!("class index {} out of range", index)))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_are_sorted_and_unique() {
        let encoder = LabelEncoder::fit(&["P3", "P1", "P2", "P1"]).unwrap();
        assert_eq!(encoder.classes(), ["P1", "P2", "P3"]);
        assert_eq!(encoder.encode("P2").unwrap(), 1);
        assert_eq!(encoder.decode(2).unwrap(), "P3");
    }

    #[test]
    fn test_encode_all() {
        let encoder = LabelEncoder::fit(&["alta", "baja", "media"]).unwrap();
        assert_eq!(
            encoder.encode_all(&["media", "alta", "media"]).unwrap(),
            vec![2, 0, 2]
        );
    }

    #[test]
    fn test_unknown_label_and_index() {
        let encoder = LabelEncoder::fit(&["a", "b"]).unwrap();
        assert!(matches!(encoder.encode("c"), Err(AppError::Validation(_))));
        assert!(matches!(encoder.decode(5), Err(AppError::Prediction(_))));
    }

    #[test]
    fn test_empty_labels_rejected() {
        let labels: [&str; 0] = [];
        assert!(LabelEncoder::fit(&labels).is_err());
    }
}
