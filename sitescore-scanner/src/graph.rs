use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// Directed graph of internal links, keyed by normalized URL.
///
/// An edge `A -> B` means page A carries a resolved internal link to B.
/// Parallel edges are collapsed and self-links are ignored, so in-degree
/// counts distinct referring pages.
#[derive(Debug, Default, Clone)]
pub struct LinkGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, url: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(url) {
            return index;
        }
        let index = self.graph.add_node(url.to_string());
        self.nodes.insert(url.to_string(), index);
        index
    }

    pub fn add_node(&mut self, url: &str) {
        self.node(url);
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let source = self.node(from);
        if from == to {
            return;
        }
        let target = self.node(to);
        self.graph.update_edge(source, target, ());
    }

    pub fn in_degree(&self, url: &str) -> usize {
        self.nodes
            .get(url)
            .map(|&index| {
                self.graph
                    .edges_directed(index, Direction::Incoming)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn out_degree(&self, url: &str) -> usize {
        self.nodes
            .get(url)
            .map(|&index| {
                self.graph
                    .edges_directed(index, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Pages that link to `url`, sorted.
    pub fn referrers(&self, url: &str) -> Vec<String> {
        let Some(&index) = self.nodes.get(url) else {
            return Vec::new();
        };
        let mut referrers: Vec<String> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| self.graph[edge.source()].clone())
            .collect();
        referrers.sort();
        referrers
    }

    /// Crawled URLs nothing links to, including URLs the graph has never seen.
    pub fn find_orphans<'a, I>(&self, crawled: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        crawled
            .into_iter()
            .filter(|url| self.in_degree(url) == 0)
            .cloned()
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chain_has_single_orphan() {
        let mut graph = LinkGraph::new();
        graph.add_edge("https://x.com/a", "https://x.com/b");
        graph.add_edge("https://x.com/b", "https://x.com/c");
        graph.add_node("https://x.com/c");

        let crawled = urls(&["https://x.com/a", "https://x.com/b", "https://x.com/c"]);
        let orphans = graph.find_orphans(&crawled);
        assert_eq!(orphans.into_iter().collect::<Vec<_>>(), urls(&["https://x.com/a"]));
    }

    #[test]
    fn test_unknown_url_is_orphan() {
        let graph = LinkGraph::new();
        let crawled = urls(&["https://x.com/"]);
        assert!(graph.find_orphans(&crawled).contains("https://x.com/"));
    }

    #[test]
    fn test_duplicate_and_self_edges_collapse() {
        let mut graph = LinkGraph::new();
        graph.add_edge("https://x.com/a", "https://x.com/b");
        graph.add_edge("https://x.com/a", "https://x.com/b");
        graph.add_edge("https://x.com/b", "https://x.com/b");

        assert_eq!(graph.in_degree("https://x.com/b"), 1);
        assert_eq!(graph.out_degree("https://x.com/a"), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.referrers("https://x.com/b"), urls(&["https://x.com/a"]));
    }
}
