use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::Settings;
use crate::content::NodeId;

use super::model::GraphNode;

pub const MAX_SCORE: f32 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkKind {
    Proximity,
    Curated,
}

/// Ordered-pair key: `low < high` regardless of which end was the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId {
    pub low: NodeId,
    pub high: NodeId,
    pub kind: LinkKind,
}

impl LinkId {
    pub fn new(a: NodeId, b: NodeId, kind: LinkKind) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
            kind,
        }
    }
}

/// `source`/`target` index into the node slice the links were built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub source: usize,
    pub target: usize,
    pub score: f32,
    pub kind: LinkKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub category: f32,
    pub tag: f32,
    pub primary_bonus: f32,
}

impl ScoreWeights {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            category: settings.category_weight.max(0.0),
            tag: settings.tag_weight.max(0.0),
            primary_bonus: settings.primary_category_bonus.max(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkParams {
    pub weights: ScoreWeights,
    pub min_score: f32,
    pub max_links_per_node: usize,
    pub curated: bool,
}

impl LinkParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            weights: ScoreWeights::from_settings(settings),
            min_score: settings.min_proximity_score,
            max_links_per_node: settings.max_links_per_node,
            curated: settings.curated_links,
        }
    }
}

fn shared_count<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut counted: Vec<&T> = Vec::new();
    for item in a {
        if b.contains(item) && !counted.contains(&item) {
            counted.push(item);
        }
    }
    counted.len()
}

fn shared_tags(a: &[String], b: &[String]) -> usize {
    let normalize = |tags: &[String]| {
        tags.iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect::<HashSet<_>>()
    };
    normalize(a).intersection(&normalize(b)).count()
}

/// Taxonomy overlap clamped to `0..=100`.
pub fn proximity_score(a: &GraphNode, b: &GraphNode, weights: ScoreWeights) -> f32 {
    let categories = shared_count(&a.categories, &b.categories) as f32;
    let tags = shared_tags(&a.tags, &b.tags) as f32;
    let same_primary = matches!(
        (a.primary_category(), b.primary_category()),
        (Some(left), Some(right)) if left == right
    );

    let mut score = (categories * weights.category) + (tags * weights.tag);
    if same_primary {
        score += weights.primary_bonus;
    }
    score.clamp(0.0, MAX_SCORE)
}

struct Candidate {
    id: LinkId,
    source: usize,
    target: usize,
    score: f32,
}

fn by_score_then_id(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| (a.id.low, a.id.high).cmp(&(b.id.low, b.id.high)))
        .then_with(|| a.id.kind.cmp(&b.id.kind))
}

/// Scores every pair, then greedily keeps the best candidates while both
/// endpoints still have room under `max_links_per_node`.
pub fn build_links(nodes: &[GraphNode], params: LinkParams) -> Vec<Link> {
    if params.max_links_per_node == 0 || nodes.len() < 2 {
        return Vec::new();
    }

    let index_by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id, index))
        .collect::<HashMap<_, _>>();

    let mut curated_pairs = HashSet::new();
    let mut candidates = Vec::new();
    if params.curated {
        for (source, node) in nodes.iter().enumerate() {
            for related in &node.related {
                let Some(&target) = index_by_id.get(related) else {
                    continue;
                };
                if target == source {
                    continue;
                }

                let id = LinkId::new(node.id, *related, LinkKind::Curated);
                if curated_pairs.insert((id.low, id.high)) {
                    candidates.push(Candidate {
                        id,
                        source: source.min(target),
                        target: source.max(target),
                        score: MAX_SCORE,
                    });
                }
            }
        }
    }

    for source in 0..nodes.len() {
        for target in (source + 1)..nodes.len() {
            let id = LinkId::new(nodes[source].id, nodes[target].id, LinkKind::Proximity);
            if curated_pairs.contains(&(id.low, id.high)) {
                continue;
            }

            let score = proximity_score(&nodes[source], &nodes[target], params.weights);
            if score <= 0.0 || score < params.min_score {
                continue;
            }
            candidates.push(Candidate {
                id,
                source,
                target,
                score,
            });
        }
    }

    candidates.sort_by(by_score_then_id);

    let mut degree = vec![0usize; nodes.len()];
    let mut links = Vec::new();
    for candidate in candidates {
        if degree[candidate.source] >= params.max_links_per_node
            || degree[candidate.target] >= params.max_links_per_node
        {
            continue;
        }

        degree[candidate.source] += 1;
        degree[candidate.target] += 1;
        links.push(Link {
            id: candidate.id,
            source: candidate.source,
            target: candidate.target,
            score: candidate.score,
            kind: candidate.id.kind,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeRecord;

    fn node(id: NodeId, categories: &[u64], tags: &[&str]) -> GraphNode {
        let record = NodeRecord::new(id, format!("node {id}"))
            .with_categories(categories.iter().copied())
            .with_tags(tags.iter().copied());
        GraphNode::from_record(&record, &[], &Settings::default())
    }

    fn params(min_score: f32, max_links_per_node: usize) -> LinkParams {
        LinkParams {
            weights: ScoreWeights::from_settings(&Settings::default()),
            min_score,
            max_links_per_node,
            curated: true,
        }
    }

    #[test]
    fn test_score_is_symmetric_and_clamped() {
        let weights = ScoreWeights::from_settings(&Settings::default());
        let a = node(1, &[1, 2], &["sea", "salt"]);
        let b = node(2, &[2, 1], &["Salt"]);

        assert_eq!(proximity_score(&a, &b, weights), proximity_score(&b, &a, weights));

        let c = node(3, &[1, 2, 3, 4], &["a", "b", "c"]);
        let d = node(4, &[1, 2, 3, 4], &["a", "b", "c"]);
        assert_eq!(proximity_score(&c, &d, weights), MAX_SCORE);
    }

    #[test]
    fn test_score_grows_with_shared_taxonomy() {
        let weights = ScoreWeights {
            category: 10.0,
            tag: 5.0,
            primary_bonus: 0.0,
        };
        let base = node(1, &[1], &["x"]);
        let none = node(2, &[9], &[]);
        let one_category = node(3, &[9, 1], &[]);
        let category_and_tag = node(4, &[9, 1], &["x"]);

        let s0 = proximity_score(&base, &none, weights);
        let s1 = proximity_score(&base, &one_category, weights);
        let s2 = proximity_score(&base, &category_and_tag, weights);
        assert!(s0 <= s1 && s1 <= s2);
        assert_eq!(s0, 0.0);
        assert_eq!(s2, 15.0);
    }

    #[test]
    fn test_primary_category_bonus() {
        let weights = ScoreWeights {
            category: 10.0,
            tag: 0.0,
            primary_bonus: 20.0,
        };
        let a = node(1, &[1, 2], &[]);
        let same_primary = node(2, &[1, 2], &[]);
        let other_primary = node(3, &[2, 1], &[]);
        assert_eq!(proximity_score(&a, &same_primary, weights), 40.0);
        assert_eq!(proximity_score(&a, &other_primary, weights), 20.0);
    }

    #[test]
    fn test_links_respect_threshold_and_cap() {
        let nodes = (1..=8).map(|id| node(id, &[1], &["shared"])).collect::<Vec<_>>();

        let links = build_links(&nodes, params(10.0, 2));

        let mut degree = vec![0; nodes.len()];
        for link in &links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
        assert!(degree.iter().all(|count| *count <= 2));
        assert!(!links.is_empty());

        let strict = build_links(&nodes, params(MAX_SCORE, 2));
        assert!(strict.is_empty());
    }

    #[test]
    fn test_ties_are_broken_by_id_order() {
        let nodes = vec![node(30, &[1], &[]), node(10, &[1], &[]), node(20, &[1], &[])];
        let links = build_links(&nodes, params(1.0, 1));

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, LinkId::new(10, 20, LinkKind::Proximity));
    }

    #[test]
    fn test_curated_pair_replaces_proximity_link() {
        let mut nodes = vec![node(1, &[1], &[]), node(2, &[1], &[]), node(3, &[7], &[])];
        nodes[0].related = vec![2, 3, 99];
        nodes[1].related = vec![1];

        let links = build_links(&nodes, params(1.0, 4));
        let ids = links.iter().map(|link| link.id).collect::<Vec<_>>();

        assert!(ids.contains(&LinkId::new(1, 2, LinkKind::Curated)));
        assert!(ids.contains(&LinkId::new(1, 3, LinkKind::Curated)));
        assert!(!ids.contains(&LinkId::new(1, 2, LinkKind::Proximity)));
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|link| link.score == MAX_SCORE));
    }

    #[test]
    fn test_link_ids_are_unique_per_pair_and_kind() {
        let nodes = (1..=6).map(|id| node(id, &[1, 2], &["t"])).collect::<Vec<_>>();
        let links = build_links(&nodes, params(0.0, 5));
        let unique = links.iter().map(|link| link.id).collect::<HashSet<_>>();
        assert_eq!(unique.len(), links.len());
        assert_eq!(links.len(), 15);
    }
}
