//! Structural checks over a resolved snapshot.
//!
//! Schemas can only be generated from acyclic graphs:
//! - the supertype graph (a noun inheriting from itself never bottoms out
//!   during allOf flattening);
//! - the identification graph: reference-scheme edges between nouns plus
//!   role-player edges of objectified fact types;
//! - both combined. A subtype without its own scheme is identified through
//!   its supertype's, so a scheme that leads back down to the subtype
//!   never terminates either.

use std::collections::HashMap;

use crate::error::ModelError;
use crate::model::{ModelSnapshot, NounRef};

pub fn check_snapshot(snapshot: &ModelSnapshot) -> Result<(), ModelError> {
    let supertypes = |r: NounRef| snapshot.super_type_of(r).into_iter().collect::<Vec<_>>();
    if let Some(cycle) = find_cycle(snapshot, &supertypes) {
        return Err(ModelError::SupertypeCycle(cycle));
    }

    let identifiers = |r: NounRef| snapshot.identifying_players(r);
    if let Some(cycle) = find_cycle(snapshot, &identifiers) {
        return Err(ModelError::IdentificationCycle(cycle));
    }

    let inherited = |r: NounRef| {
        let mut edges = identifiers(r);
        edges.extend(snapshot.super_type_of(r));
        edges
    };
    if let Some(cycle) = find_cycle(snapshot, &inherited) {
        return Err(ModelError::InheritedIdentificationCycle(cycle));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over every noun and fact type. Returns the names along
/// the first cycle found, closed with its starting node.
fn find_cycle<F>(snapshot: &ModelSnapshot, edges: &F) -> Option<Vec<String>>
where
    F: Fn(NounRef) -> Vec<NounRef>,
{
    let nodes = snapshot
        .nouns
        .iter()
        .map(|n| NounRef::Noun(n.id))
        .chain(snapshot.fact_types.iter().map(|f| NounRef::FactType(f.id)));

    let mut marks: HashMap<NounRef, Mark> = HashMap::new();
    let mut stack: Vec<NounRef> = Vec::new();
    for start in nodes {
        if marks.contains_key(&start) {
            continue;
        }
        if let Some(cycle) = visit(start, edges, &mut marks, &mut stack) {
            return Some(cycle.into_iter().map(|r| snapshot.name_of(r).to_string()).collect());
        }
    }
    None
}

fn visit<F>(
    node: NounRef,
    edges: &F,
    marks: &mut HashMap<NounRef, Mark>,
    stack: &mut Vec<NounRef>,
) -> Option<Vec<NounRef>>
where
    F: Fn(NounRef) -> Vec<NounRef>,
{
    marks.insert(node, Mark::Visiting);
    stack.push(node);
    for next in edges(node) {
        match marks.get(&next) {
            Some(Mark::Visiting) => {
                let from = stack.iter().position(|n| *n == next).unwrap_or(0);
                let mut cycle = stack[from..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Some(Mark::Done) => {}
            None => {
                if let Some(cycle) = visit(next, edges, marks, stack) {
                    return Some(cycle);
                }
            }
        }
    }
    stack.pop();
    marks.insert(node, Mark::Done);
    None
}
