//! Dependency resolver
//!
//! Produces a total order over all schema files such that every referenced
//! type is defined earlier in the order. Level numbers are treated only as a
//! coarse, user-asserted partition used for validation; the actual ordering
//! comes from a reference graph derived from parsed content, so the directory
//! convention could change without touching this module.
//!
//! Partition rules: level N files may only reference types from levels < N
//! (same level allowed for N > 1, ordered by intra-level toposort). Level-1
//! files may not reference anything beyond built-in types. References to
//! types defined nowhere are not resolved here; they surface later as
//! `UnknownType` / `UnresolvedReferences` during registration.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::scan::Level;
use crate::schema::{SchemaFile, TypeRef};

/// Where a fully-qualified name is defined: level number and global file
/// index in scan order.
#[derive(Debug, Clone, Copy)]
struct DefSite {
    level: u32,
    file: usize,
}

/// Order the files of a leveled tree. Consumes the levels and returns the
/// total load order.
pub fn order(levels: Vec<Level>) -> Result<Vec<SchemaFile>> {
    // Flatten into (level number, file) with global scan indices.
    let mut files: Vec<(u32, SchemaFile)> = Vec::new();
    for level in levels {
        for file in level.files {
            files.push((level.number, file));
        }
    }

    let defs = definition_index(files.iter().map(|(lvl, f)| (*lvl, f)));

    // Per-file partition checks; intra-level edges keyed by level number.
    let mut intra_edges: HashMap<u32, BTreeSet<(usize, usize)>> = HashMap::new();
    for (idx, (level, file)) in files.iter().enumerate() {
        for r in &file.references {
            if *level == 1 {
                // Level 1 is the atomic base: no project-type references at
                // all, resolvable or not.
                return Err(ResolveError::AtomicLevelViolation {
                    path: file.path.clone(),
                    type_name: r.as_written().to_string(),
                });
            }
            let Some(site) = resolve_reference(r, file, &defs) else {
                debug!(
                    path = %file.path.display(),
                    reference = r.as_written(),
                    "reference not defined in the file set, deferring to registration"
                );
                continue;
            };
            if site.level > *level {
                return Err(ResolveError::ForwardLevelReference {
                    path: file.path.clone(),
                    type_name: r.as_written().to_string(),
                    from_level: *level,
                    to_level: site.level,
                });
            }
            if site.level == *level && site.file != idx {
                intra_edges
                    .entry(*level)
                    .or_default()
                    .insert((site.file, idx));
            }
        }
    }

    // Toposort each level independently, then concatenate ascending.
    let mut ordered = Vec::with_capacity(files.len());
    let mut slots: Vec<Option<SchemaFile>> = Vec::with_capacity(files.len());
    let mut level_members: Vec<(u32, Vec<usize>)> = Vec::new();
    for (idx, (level, file)) in files.into_iter().enumerate() {
        match level_members.last_mut() {
            Some((current, members)) if *current == level => members.push(idx),
            _ => level_members.push((level, vec![idx])),
        }
        slots.push(Some(file));
    }

    for (level, members) in level_members {
        let edges = intra_edges.remove(&level).unwrap_or_default();
        let order = toposort_partition(&members, &edges, &slots)?;
        debug!(level, files = order.len(), "level ordered");
        for idx in order {
            ordered.push(slots[idx].take().expect("each file ordered once"));
        }
    }

    Ok(ordered)
}

/// Order a free-form (non-leveled) file set: one partition, intra-set
/// toposort, no atomic rule.
pub fn order_unleveled(files: Vec<SchemaFile>) -> Result<Vec<SchemaFile>> {
    let defs = definition_index(files.iter().map(|f| (0, f)));

    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (idx, file) in files.iter().enumerate() {
        for r in &file.references {
            if let Some(site) = resolve_reference(r, file, &defs) {
                if site.file != idx {
                    edges.insert((site.file, idx));
                }
            }
        }
    }

    let members: Vec<usize> = (0..files.len()).collect();
    let mut slots: Vec<Option<SchemaFile>> = files.into_iter().map(Some).collect();
    let order = toposort_partition(&members, &edges, &slots)?;
    Ok(order
        .into_iter()
        .map(|idx| slots[idx].take().expect("each file ordered once"))
        .collect())
}

/// Index every definition in the file set. Keyed both by fully-qualified
/// name and by local name (scan order preserved) so bare references can be
/// resolved the same way the registry resolves them later.
struct DefinitionIndex {
    by_full_name: HashMap<String, DefSite>,
    by_local_name: HashMap<String, Vec<(String, DefSite)>>,
}

fn definition_index<'a>(files: impl Iterator<Item = (u32, &'a SchemaFile)>) -> DefinitionIndex {
    let mut by_full_name = HashMap::new();
    let mut by_local_name: HashMap<String, Vec<(String, DefSite)>> = HashMap::new();
    for (idx, (level, file)) in files.enumerate() {
        for def in &file.definitions {
            let site = DefSite { level, file: idx };
            let full = def.full_name();
            // First definition wins here; duplicates are the registry's
            // concern, not the resolver's.
            by_full_name.entry(full.clone()).or_insert(site);
            by_local_name
                .entry(def.name.clone())
                .or_default()
                .push((full, site));
        }
    }
    DefinitionIndex {
        by_full_name,
        by_local_name,
    }
}

/// Resolve one reference against the full file set: fully-qualified names
/// directly, bare names against the declaring file's namespace first, then
/// any defining namespace in scan order.
fn resolve_reference(r: &TypeRef, file: &SchemaFile, defs: &DefinitionIndex) -> Option<DefSite> {
    match r {
        TypeRef::Qualified(full) => defs.by_full_name.get(full).copied(),
        TypeRef::Bare(name) => {
            if let Some(ns) = &file.namespace {
                let qualified = format!("{}.{}", ns, name);
                if let Some(site) = defs.by_full_name.get(&qualified) {
                    return Some(*site);
                }
            }
            defs.by_local_name
                .get(name)
                .and_then(|sites| sites.first())
                .map(|(_, site)| *site)
        }
    }
}

/// Kahn's algorithm over one partition's files. The ready set is ordered by
/// global scan index, so files with no intra-level dependency keep scan order
/// as the deterministic tie-break. A stall means a cycle; the participating
/// files are named via SCC extraction.
fn toposort_partition(
    members: &[usize],
    edges: &BTreeSet<(usize, usize)>,
    slots: &[Option<SchemaFile>],
) -> Result<Vec<usize>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut node_of: HashMap<usize, NodeIndex> = HashMap::with_capacity(members.len());
    for &m in members {
        let n = graph.add_node(m);
        node_of.insert(m, n);
    }
    for &(from, to) in edges {
        graph.add_edge(node_of[&from], node_of[&to], ());
    }

    let mut indegree: HashMap<usize, usize> = members
        .iter()
        .map(|&m| {
            (
                m,
                graph
                    .neighbors_directed(node_of[&m], Direction::Incoming)
                    .count(),
            )
        })
        .collect();

    let mut ready: BTreeSet<usize> = members
        .iter()
        .copied()
        .filter(|m| indegree[m] == 0)
        .collect();
    let mut order = Vec::with_capacity(members.len());

    while let Some(&m) = ready.iter().next() {
        ready.remove(&m);
        order.push(m);
        for succ in graph.neighbors_directed(node_of[&m], Direction::Outgoing) {
            let s = graph[succ];
            let d = indegree.get_mut(&s).expect("successor is a member");
            *d -= 1;
            if *d == 0 {
                ready.insert(s);
            }
        }
    }

    if order.len() < members.len() {
        let mut cycle_files: Vec<PathBuf> = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .flatten()
            .filter_map(|n| {
                slots[graph[n]]
                    .as_ref()
                    .map(|f| f.path.clone())
            })
            .collect();
        cycle_files.sort();
        return Err(ResolveError::CyclicDependency { files: cycle_files });
    }

    Ok(order)
}
