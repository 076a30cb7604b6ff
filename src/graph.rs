//! Type Dependency Graph
//!
//! Directed graph over every record and enum of a resolved context, with an
//! edge from a record to each type one of its fields refers to. Used to
//! order per-type outputs (dependencies first) and to find reference cycles.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

use crate::context::{Context, TypeRef};

/// How a record refers to a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Plain field of that type
    Field,
    /// Nullable field of that type
    Nullable,
    /// Element type of an array field, at any depth
    ArrayElement,
}

impl EdgeKind {
    fn dot_style(&self) -> &'static str {
        match self {
            EdgeKind::Field => "solid",
            EdgeKind::Nullable => "dashed",
            EdgeKind::ArrayElement => "bold",
        }
    }
}

/// Record/enum dependency graph
pub struct TypeGraph {
    graph: DiGraph<TypeRef, EdgeKind>,
    nodes: HashMap<TypeRef, NodeIndex>,
}

impl TypeGraph {
    /// Build from a resolved context
    ///
    /// Nodes are added per scope in parse order, records before enums.
    /// Fields whose type is primitive or unknown add no edge; the first
    /// field between two types decides the edge kind.
    pub fn build(ctx: &Context) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for scope in ctx.scopes() {
            for record in &scope.records {
                let type_ref = TypeRef::Record(record.id);
                nodes.insert(type_ref, graph.add_node(type_ref));
            }
            for enumeration in &scope.enums {
                let type_ref = TypeRef::Enum(enumeration.id);
                nodes.insert(type_ref, graph.add_node(type_ref));
            }
        }

        for (_, record, field) in ctx.fields() {
            let Some(target) = ctx.classify_element(field).type_ref() else {
                continue;
            };
            let from = nodes[&TypeRef::Record(record.id)];
            let to = nodes[&target];

            let kind = if field.ty.is_array() {
                EdgeKind::ArrayElement
            } else if field.ty.nullable {
                EdgeKind::Nullable
            } else {
                EdgeKind::Field
            };

            if graph.find_edge(from, to).is_none() {
                graph.add_edge(from, to, kind);
            }
        }

        Self { graph, nodes }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Types `type_ref` refers to directly
    pub fn dependencies(&self, type_ref: TypeRef) -> Vec<TypeRef> {
        self.neighbors(type_ref, Direction::Outgoing)
    }

    /// Records referring to `type_ref` directly
    pub fn dependents(&self, type_ref: TypeRef) -> Vec<TypeRef> {
        self.neighbors(type_ref, Direction::Incoming)
    }

    fn neighbors(&self, type_ref: TypeRef, direction: Direction) -> Vec<TypeRef> {
        let Some(&index) = self.nodes.get(&type_ref) else {
            return Vec::new();
        };
        let mut found: Vec<TypeRef> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|n| self.graph[n])
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Strongly connected groups, every dependency before its dependents
    ///
    /// Members of a group refer to each other and have no valid order among
    /// themselves; they are listed by handle.
    pub fn compile_order(&self) -> Vec<Vec<TypeRef>> {
        kosaraju_scc(&self.graph)
            .into_iter()
            .map(|scc| {
                let mut group: Vec<TypeRef> = scc.into_iter().map(|n| self.graph[n]).collect();
                group.sort();
                group
            })
            .collect()
    }

    /// Groups of mutually referring types, including self-referring records
    pub fn cycles(&self) -> Vec<Vec<TypeRef>> {
        kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || self
                        .graph
                        .edges_directed(scc[0], Direction::Outgoing)
                        .any(|e| e.target() == scc[0])
            })
            .map(|scc| {
                let mut group: Vec<TypeRef> = scc.into_iter().map(|n| self.graph[n]).collect();
                group.sort();
                group
            })
            .collect()
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self, ctx: &Context) -> String {
        let mut output = String::new();

        output.push_str("digraph TypeGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        for index in self.graph.node_indices() {
            let type_ref = &self.graph[index];
            let shape = match type_ref {
                TypeRef::Record(_) => "box",
                TypeRef::Enum(_) => "ellipse",
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}];\n",
                dot_id(ctx, *type_ref),
                ctx.qualified_name(*type_ref),
                shape
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}];\n",
                dot_id(ctx, self.graph[edge.source()]),
                dot_id(ctx, self.graph[edge.target()]),
                edge.weight().dot_style()
            ));
        }

        output.push_str("}\n");
        output
    }
}

/// Node id unique even when two files declare the same qualified name
fn dot_id(ctx: &Context, type_ref: TypeRef) -> String {
    format!(
        "{}:{}",
        ctx.scope(type_ref.scope()).file_stem,
        ctx.qualified_name(type_ref)
    )
}
