use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::model::{Node, NodeType};

const LITERATURE_FIELDS: [&str; 4] = ["doi", "authors", "journal", "year"];

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Entity search over label and id, best match first. An empty query
/// matches nothing.
pub fn search_entities<'a>(nodes: &'a [Node], query: &str) -> Vec<&'a Node> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut ranked = nodes
        .iter()
        .filter_map(|node| {
            let by_label = fuzzy_match_score(&matcher, &node.label, query);
            let by_id = fuzzy_match_score(&matcher, &node.id, query);
            by_label.max(by_id).map(|score| (score, node))
        })
        .collect::<Vec<_>>();

    // stable sort keeps dataset order among equal scores
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, node)| node).collect()
}

/// Literature-only search. An empty query lists every literature node.
pub fn search_literature<'a>(nodes: &'a [Node], query: &str) -> Vec<&'a Node> {
    let query = query.trim().to_lowercase();
    nodes
        .iter()
        .filter(|node| node.node_type == NodeType::Literature)
        .filter(|node| {
            if query.is_empty() {
                return true;
            }
            let contains = |text: &str| text.to_lowercase().contains(&query);
            contains(&node.label)
                || contains(&node.id)
                || LITERATURE_FIELDS
                    .iter()
                    .filter_map(|field| node.metadata_str(field))
                    .any(contains)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn paper(id: &str, doi: &str, year: &str) -> Node {
        let mut node = Node::new(id, format!("{id} et al."), NodeType::Literature, "", 10.0);
        node.metadata.insert("doi".to_owned(), json!(doi));
        node.metadata.insert("year".to_owned(), json!(year));
        node
    }

    fn catalogue() -> Vec<Node> {
        vec![
            Node::new("ACE2", "ACE2", NodeType::HumanProtein, "", 18.0),
            Node::new("TMPRSS2", "TMPRSS2", NodeType::HumanProtein, "", 18.0),
            Node::new("Paxlovid", "Paxlovid", NodeType::Drug, "", 20.0),
            paper("Paper:Hoffmann", "10.1016/j.cell.2020.02.052", "2020"),
            paper("Paper:Walls", "10.1016/j.cell.2020.02.058", "2021"),
        ]
    }

    #[test]
    fn empty_entity_query_matches_nothing() {
        assert!(search_entities(&catalogue(), "  ").is_empty());
    }

    #[test]
    fn entity_search_is_case_insensitive_over_label_and_id() {
        let nodes = catalogue();
        let ids = search_entities(&nodes, "paxl")
            .into_iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["Paxlovid"]);

        let hoffmann = search_entities(&nodes, "paper:hoff");
        assert_eq!(hoffmann.first().map(|node| node.id.as_str()), Some("Paper:Hoffmann"));
    }

    #[test]
    fn literature_search_without_query_lists_all_papers() {
        let nodes = catalogue();
        assert_eq!(search_literature(&nodes, "").len(), 2);
    }

    #[test]
    fn literature_search_reads_metadata() {
        let nodes = catalogue();
        let by_year = search_literature(&nodes, "2021");
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].id, "Paper:Walls");

        let by_doi = search_literature(&nodes, "02.052");
        assert_eq!(by_doi[0].id, "Paper:Hoffmann");

        assert!(search_literature(&nodes, "ACE2").is_empty());
    }
}
