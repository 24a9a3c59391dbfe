use serde::{Deserialize, Serialize};

use crate::flows::labels;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

/// Tag of an independent category tree. Each ordering phase walks one tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryRoot {
    Products,
    Specifications,
    Sizes,
    Quantities,
}

impl CategoryRoot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Specifications => "specifications",
            Self::Sizes => "sizes",
            Self::Quantities => "quantities",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "products" => Some(Self::Products),
            "specifications" => Some(Self::Specifications),
            "sizes" => Some(Self::Sizes),
            "quantities" => Some(Self::Quantities),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub root: CategoryRoot,
    pub name: String,
}

impl CategoryNode {
    pub fn new(
        id: impl Into<String>,
        parent_id: Option<&str>,
        root: CategoryRoot,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: CategoryId(id.into()),
            parent_id: parent_id.map(|parent| CategoryId(parent.to_owned())),
            root,
            name: name.into(),
        }
    }

    pub fn matches_label(&self, input: &str) -> bool {
        labels::matches(input, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryNode, CategoryRoot};
    use crate::flows::labels;

    #[test]
    fn labels_match_like_static_options() {
        let node = CategoryNode::new("elite", None, CategoryRoot::Specifications, "Élite Linen");
        assert!(node.matches_label("  élite linen "));
        assert!(node.matches_label("ÉLITE LINEN"));
        assert!(!node.matches_label("elite linen"));
        assert_eq!(node.matches_label("élite linen"), labels::matches("élite linen", &node.name));
    }
}
