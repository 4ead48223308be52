use serde::{Deserialize, Serialize};

pub type NodeId = u64;
pub type CategoryId = u64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    #[default]
    None,
    High,
    Featured,
}

impl PriorityLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::High => "high",
            Self::Featured => "featured",
        }
    }
}

/// Content posts cluster by category; pages share one synthetic island.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Post,
    Page,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub categories: Vec<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub priority_level: PriorityLevel,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub related: Vec<NodeId>,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
}

impl NodeRecord {
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            categories: Vec::new(),
            tags: Vec::new(),
            thumbnail: None,
            permalink: String::new(),
            priority_level: PriorityLevel::None,
            kind: NodeKind::Post,
            related: Vec::new(),
            x: None,
            y: None,
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        self.permalink = permalink.into();
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_priority(mut self, priority: PriorityLevel) -> Self {
        self.priority_level = priority;
        self
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = NodeId>) -> Self {
        self.related = related.into_iter().collect();
        self
    }

    pub fn persisted_position(&self) -> Option<(f32, f32)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub color: String,
}

impl CategoryRecord {
    pub fn new(id: CategoryId, name: impl Into<String>, color: impl Into<String>) -> Self {
        let name = name.into();
        let slug = name.to_lowercase().replace(' ', "-");
        Self {
            id,
            name,
            slug,
            color: color.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub nodes: Vec<NodeRecord>,
    pub categories: Vec<CategoryRecord>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
