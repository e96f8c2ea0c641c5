use serde::{Deserialize, Serialize};

/// A bindable dataset on an analytics connection.
///
/// Carried through selection menus, the conversation context, and the
/// query tool scope. `dataset_name` is the only field ever shown to users;
/// the ids stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    pub connection_id: String,
    pub dataset_id: String,
    pub dataset_name: String,
}

impl DatasetRef {
    #[must_use]
    pub fn new(
        connection_id: impl Into<String>,
        dataset_id: impl Into<String>,
        dataset_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            dataset_id: dataset_id.into(),
            dataset_name: dataset_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_ref_roundtrip() {
        let re = DatasetRef::new("conn-1", "ds-9", "Vendas 2025");
        let json = serde_json::to_string(&re).unwrap();
        let back: DatasetRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, re);
        assert_eq!(back.dataset_name, "Vendas 2025");
    }
}
