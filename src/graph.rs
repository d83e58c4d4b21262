use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::{LayoutError, Rgba};

/// A single commit in the history graph. Parent/child links are arena
/// indices into the owning [`CommitGraph`]; `slot`, `lane` and `color` are
/// write-once fields populated by the successive layout passes and stay
/// `None` until their pass has run.
#[derive(Debug, Clone)]
pub struct Commit {
    pub id: String,
    pub parents: Vec<usize>,
    pub children: Vec<usize>,
    pub slot: Option<usize>,
    pub lane: Option<usize>,
    pub color: Option<Rgba>,
}

impl Commit {
    fn new(id: String) -> Self {
        Self {
            id,
            parents: Vec::new(),
            children: Vec::new(),
            slot: None,
            lane: None,
            color: None,
        }
    }
}

/// One parsed log line: a commit hash and the hashes of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: String,
    pub parents: Vec<String>,
}

/// Arena-owned commit DAG. The graph is the sole owner of commit storage;
/// everything else refers to commits by index. Commit order matches the
/// construction order (oldest first), so index 0 is the root of history and
/// the last index is the most recent commit.
#[derive(Debug, Clone)]
pub struct CommitGraph {
    commits: Vec<Commit>,
    index: HashMap<String, usize>,
}

impl CommitGraph {
    /// Builds the graph from an oldest-first record sequence, resolving
    /// parent ids to arena indices and wiring the inverse child links.
    ///
    /// Fails with [`LayoutError::MissingParent`] when a record references a
    /// hash that is not part of the sequence, and with
    /// [`LayoutError::GraphCycle`] when the relation is not a DAG.
    pub fn from_records(records: &[LogRecord]) -> Result<Self, LayoutError> {
        let mut commits: Vec<Commit> = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.id) {
                continue;
            }
            index.insert(record.id.clone(), commits.len());
            commits.push(Commit::new(record.id.clone()));
        }

        for record in records {
            let child_ix = index[&record.id];
            for parent_id in &record.parents {
                let Some(&parent_ix) = index.get(parent_id) else {
                    return Err(LayoutError::MissingParent {
                        parent: parent_id.clone(),
                        child: record.id.clone(),
                    });
                };
                if commits[child_ix].parents.contains(&parent_ix) {
                    continue;
                }
                commits[child_ix].parents.push(parent_ix);
                commits[parent_ix].children.push(child_ix);
            }
        }

        let graph = Self { commits, index };
        graph.ensure_acyclic()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn commit(&self, ix: usize) -> &Commit {
        &self.commits[ix]
    }

    pub fn commit_mut(&mut self, ix: usize) -> &mut Commit {
        &mut self.commits[ix]
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Transitive closure over child edges, breadth-first, each descendant
    /// reported once.
    pub fn descendants(&self, ix: usize) -> Vec<usize> {
        let mut seen = vec![false; self.commits.len()];
        let mut queue: VecDeque<usize> = self.commits[ix].children.iter().copied().collect();
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            if seen[current] {
                continue;
            }
            seen[current] = true;
            result.push(current);
            queue.extend(self.commits[current].children.iter().copied());
        }

        result
    }

    /// Kahn's algorithm over child edges. Every node must drain for the
    /// relation to be a DAG.
    fn ensure_acyclic(&self) -> Result<(), LayoutError> {
        let mut indegree: Vec<usize> = self.commits.iter().map(|c| c.parents.len()).collect();
        let mut queue: VecDeque<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(ix, _)| ix)
            .collect();
        let mut drained = 0_usize;

        while let Some(ix) = queue.pop_front() {
            drained += 1;
            for &child in &self.commits[ix].children {
                indegree[child] -= 1;
                if indegree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if drained == self.commits.len() {
            return Ok(());
        }

        let stuck = indegree
            .iter()
            .position(|&d| d > 0)
            .map(|ix| self.commits[ix].id.clone())
            .unwrap_or_default();
        Err(LayoutError::GraphCycle { id: stuck })
    }
}

lazy_static! {
    static ref COMMIT_HASH: Regex = Regex::new(r"^[0-9a-f]+$").expect("hash pattern compiles");
}

/// Parses the output of `git log --all --date-order --pretty="%h|%p|"`.
///
/// Lines arrive newest commit first and are reversed into the oldest-first
/// order the layout passes expect. Lines that do not carry a hash field are
/// skipped; repeated hashes keep their first occurrence.
pub fn parse_log(input: &str) -> Result<CommitGraph, LayoutError> {
    let mut records: Vec<LogRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split('|');
        let Some(id) = fields.next().map(str::trim) else {
            continue;
        };
        if !COMMIT_HASH.is_match(id) {
            log::debug!("skipping log line without a commit hash: {line}");
            continue;
        }
        if !seen.insert(id.to_string()) {
            continue;
        }

        let parents = fields
            .next()
            .map(|field| {
                field
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        records.push(LogRecord {
            id: id.to_string(),
            parents,
        });
    }

    records.reverse();
    log::info!("parsed {} commits from log input", records.len());
    CommitGraph::from_records(&records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parents: &[&str]) -> LogRecord {
        LogRecord {
            id: id.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn builds_parent_and_child_links() {
        let graph = CommitGraph::from_records(&[
            record("a1", &[]),
            record("b2", &["a1"]),
            record("c3", &["a1"]),
            record("d4", &["b2", "c3"]),
        ])
        .unwrap();

        assert_eq!(graph.len(), 4);
        let a = graph.lookup("a1").unwrap();
        let d = graph.lookup("d4").unwrap();
        assert!(graph.commit(a).parents.is_empty());
        assert_eq!(graph.commit(a).children.len(), 2);
        assert_eq!(graph.commit(d).parents.len(), 2);
        assert!(graph.commit(d).children.is_empty());
    }

    #[test]
    fn rejects_unknown_parent() {
        let result = CommitGraph::from_records(&[record("a1", &[]), record("b2", &["f0f0"])]);
        assert!(matches!(
            result,
            Err(LayoutError::MissingParent { ref parent, .. }) if parent == "f0f0"
        ));
    }

    #[test]
    fn rejects_cycles() {
        let result = CommitGraph::from_records(&[
            record("a1", &["c3"]),
            record("b2", &["a1"]),
            record("c3", &["b2"]),
        ]);
        assert!(matches!(result, Err(LayoutError::GraphCycle { .. })));
    }

    #[test]
    fn descendants_cover_the_transitive_closure() {
        let graph = CommitGraph::from_records(&[
            record("a1", &[]),
            record("b2", &["a1"]),
            record("c3", &["a1"]),
            record("d4", &["b2", "c3"]),
        ])
        .unwrap();

        let a = graph.lookup("a1").unwrap();
        let mut descendants = graph.descendants(a);
        descendants.sort_unstable();
        assert_eq!(descendants, vec![1, 2, 3]);

        let d = graph.lookup("d4").unwrap();
        assert!(graph.descendants(d).is_empty());
    }

    #[test]
    fn parses_log_oldest_first() {
        let input = "\
d4|b2 c3|
c3|a1|
b2|a1|
a1||
";
        let graph = parse_log(input).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.commit(0).id, "a1");
        assert_eq!(graph.commit(3).id, "d4");
        assert_eq!(graph.commit(3).parents, vec![1, 2]);
    }

    #[test]
    fn skips_noise_and_duplicate_lines() {
        let input = "\
refs/heads/main
b2|a1|
b2|a1|
a1||
";
        let graph = parse_log(input).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.commit(0).id, "a1");
    }
}
