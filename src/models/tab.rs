// ABOUTME: Tab data model - recursive tab tree and the mosaic split layout that groups use to arrange children

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    Terminal,
    Editor,
    Browser,
    Preview,
    Port,
    Diff,
    Group,
}

impl TabType {
    pub fn is_group(self) -> bool {
        matches!(self, TabType::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    Row,
    Column,
}

/// Binary split layout. Leaves hold tab ids; splits hold two subtrees.
///
/// Serialized untagged so a bare value is a leaf and an object is a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MosaicNode<T> {
    Split {
        direction: SplitDirection,
        first: Box<MosaicNode<T>>,
        second: Box<MosaicNode<T>>,
        #[serde(
            rename = "splitPercentage",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        split_percentage: Option<f64>,
    },
    Leaf(T),
}

impl<T> MosaicNode<T> {
    pub fn leaf(value: T) -> Self {
        MosaicNode::Leaf(value)
    }

    pub fn split(direction: SplitDirection, first: MosaicNode<T>, second: MosaicNode<T>) -> Self {
        MosaicNode::Split {
            direction,
            first: Box::new(first),
            second: Box::new(second),
            split_percentage: None,
        }
    }

    pub fn with_split_percentage(self, percentage: f64) -> Self {
        match self {
            MosaicNode::Split {
                direction,
                first,
                second,
                ..
            } => MosaicNode::Split {
                direction,
                first,
                second,
                split_percentage: Some(percentage),
            },
            leaf => leaf,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MosaicNode::Leaf(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tab_type: TabType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Direct children. Only populated for `group` tabs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<Tab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mosaic_tree: Option<MosaicNode<String>>,
    pub created_at: DateTime<Utc>,
}

impl Tab {
    pub fn new(name: impl Into<String>, tab_type: TabType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            tab_type,
            command: None,
            cwd: None,
            url: None,
            parent_id: None,
            tabs: Vec::new(),
            mosaic_tree: None,
            created_at: Utc::now(),
        }
    }

    pub fn terminal(name: impl Into<String>, cwd: impl Into<String>) -> Self {
        let mut tab = Self::new(name, TabType::Terminal);
        tab.cwd = Some(cwd.into());
        tab
    }

    /// Builds a group owning `children`, laid out with `layout` if given.
    /// Children get their `parent_id` pointed at the new group.
    pub fn group(
        name: impl Into<String>,
        children: Vec<Tab>,
        layout: Option<MosaicNode<String>>,
    ) -> Self {
        let mut group = Self::new(name, TabType::Group);
        group.tabs = children
            .into_iter()
            .map(|mut child| {
                child.parent_id = Some(group.id.clone());
                child
            })
            .collect();
        group.mosaic_tree = layout;
        group
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        for child in &mut self.tabs {
            child.parent_id = Some(self.id.clone());
        }
        self
    }

    pub fn is_group(&self) -> bool {
        self.tab_type.is_group()
    }
}
