//! Dependency tracking between constraints and the data they read
//!
//! Every `when`/`must` expression is walked once over the schema, following
//! its location paths (inside predicates and function arguments too) to the
//! schema nodes they can reach. The result is an immutable adjacency map
//! from referenced schema node to the constraints that read it, shared by
//! every transaction.
//!
//! A reference whose final step selects a list or leaf-list with no
//! predicate is a bare node-set reference and is flagged `unkeyed`; the
//! impact policy decides whether such references propagate.

mod impact;

use std::collections::{BTreeMap, BTreeSet};

pub use impact::impact_set;

use crate::mount;
use crate::schema::{SchemaId, SchemaIndex, SchemaKind};
use crate::xpath::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, Step};

/// Which constraint of an owner node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintRef {
    When,
    /// Index into the owner's `must` list
    Must(usize),
}

/// One constraint, identified by the schema node that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprRef {
    pub owner: SchemaId,
    pub constraint: ConstraintRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepEdge {
    pub expr: ExprRef,
    /// The reference is a bare list or leaf-list node-set
    pub unkeyed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<SchemaId, Vec<DepEdge>>,
}

impl DependencyGraph {
    pub fn build(schema: &SchemaIndex) -> Self {
        let mut graph = DependencyGraph::default();
        for owner in schema.ids() {
            let node = schema.node(owner);
            if let Some(when) = &node.when {
                graph.add_expr(schema, owner, ConstraintRef::When, when.expr.ast());
            }
            for (i, must) in node.musts.iter().enumerate() {
                graph.add_expr(schema, owner, ConstraintRef::Must(i), must.expr.ast());
            }
        }
        tracing::debug!(
            referenced = graph.edges.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    /// Constraints that read `referenced`
    pub fn dependents(&self, referenced: SchemaId) -> &[DepEdge] {
        self.edges.get(&referenced).map_or(&[], Vec::as_slice)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    fn add_expr(&mut self, schema: &SchemaIndex, owner: SchemaId, constraint: ConstraintRef, ast: &Expr) {
        // choice and case constraints are evaluated at the data parent
        let context = if schema.node(owner).kind.is_data() {
            owner
        } else {
            schema.data_parent(owner).unwrap_or(SchemaIndex::ROOT)
        };
        let mut walker = Walker {
            schema,
            owner: context,
            refs: BTreeMap::new(),
        };
        walker.expr(ast, &[Pos::Node(context)]);

        let expr = ExprRef { owner, constraint };
        for (referenced, unkeyed) in walker.refs {
            let edges = self.edges.entry(referenced).or_default();
            match edges.iter_mut().find(|e| e.expr == expr) {
                Some(edge) => edge.unkeyed &= unkeyed,
                None => edges.push(DepEdge { expr, unkeyed }),
            }
        }
    }
}

/// Where a path can be, statically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pos {
    Node(SchemaId),
    /// Virtual root above a mount point
    MountRoot(SchemaId),
}

struct Walker<'a> {
    schema: &'a SchemaIndex,
    owner: SchemaId,
    /// Referenced node, and whether every reference to it was unkeyed
    refs: BTreeMap<SchemaId, bool>,
}

impl<'a> Walker<'a> {
    /// Record references; returns the positions a node-set expression can
    /// select
    fn expr(&mut self, expr: &Expr, ctx: &[Pos]) -> Vec<Pos> {
        match expr {
            Expr::Literal(_) | Expr::Number(_) | Expr::Variable(_) | Expr::Invalid(_) => {
                Vec::new()
            }
            Expr::Path(path) => self.location_path(path, ctx),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let base = self.expr(primary, ctx);
                for predicate in predicates {
                    self.expr(predicate, &base);
                }
                self.steps(base, steps)
            }
            Expr::Call { name, args } => {
                for arg in args {
                    self.expr(arg, ctx);
                }
                if name == "current" && args.is_empty() {
                    vec![Pos::Node(self.owner)]
                } else {
                    Vec::new()
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let mut l = self.expr(lhs, ctx);
                let r = self.expr(rhs, ctx);
                if *op == BinaryOp::Union {
                    l.extend(r);
                    dedup(l)
                } else {
                    Vec::new()
                }
            }
            Expr::Negate(inner) => {
                self.expr(inner, ctx);
                Vec::new()
            }
        }
    }

    fn location_path(&mut self, path: &LocationPath, ctx: &[Pos]) -> Vec<Pos> {
        let start = if path.absolute {
            vec![self.root()]
        } else {
            ctx.to_vec()
        };
        self.steps(start, &path.steps)
    }

    fn steps(&mut self, start: Vec<Pos>, steps: &[Step]) -> Vec<Pos> {
        let mut cur = start;
        for (i, step) in steps.iter().enumerate() {
            let next: Vec<Pos> = dedup(
                cur.iter()
                    .flat_map(|p| self.axis(*p, step.axis))
                    .filter(|p| self.matches(*p, &step.test))
                    .collect(),
            );
            for predicate in &step.predicates {
                self.expr(predicate, &next);
            }

            if reads_downward(step.axis) {
                let last = i + 1 == steps.len();
                for pos in &next {
                    if let Pos::Node(s) = *pos {
                        let bare = matches!(
                            self.schema.node(s).kind,
                            SchemaKind::List | SchemaKind::LeafList
                        );
                        let unkeyed = last && bare && step.predicates.is_empty();
                        let entry = self.refs.entry(s).or_insert(unkeyed);
                        *entry &= unkeyed;
                    }
                }
            }
            cur = next;
        }
        cur
    }

    fn root(&self) -> Pos {
        match self.schema.nearest_mount(self.owner) {
            Some(mount) => Pos::MountRoot(mount),
            None => Pos::Node(SchemaIndex::ROOT),
        }
    }

    fn children(&self, pos: Pos) -> Vec<Pos> {
        match pos {
            Pos::Node(s) => self.schema.data_children(s).into_iter().map(Pos::Node).collect(),
            Pos::MountRoot(mount) => vec![Pos::Node(mount)],
        }
    }

    fn parent(&self, pos: Pos) -> Option<Pos> {
        match pos {
            Pos::Node(s) if s == SchemaIndex::ROOT => None,
            Pos::Node(s) => {
                if self.root() == Pos::MountRoot(s) {
                    return Some(Pos::MountRoot(s));
                }
                self.schema.data_parent(s).map(Pos::Node)
            }
            Pos::MountRoot(_) => None,
        }
    }

    fn descendants(&self, pos: Pos) -> Vec<Pos> {
        let mut out = Vec::new();
        let mut stack = self.children(pos);
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next));
        }
        out
    }

    fn axis(&self, pos: Pos, axis: Axis) -> Vec<Pos> {
        match axis {
            Axis::Child => self.children(pos),
            Axis::Descendant => self.descendants(pos),
            Axis::DescendantOrSelf => {
                let mut out = vec![pos];
                out.extend(self.descendants(pos));
                out
            }
            Axis::Parent => self.parent(pos).into_iter().collect(),
            Axis::Ancestor | Axis::AncestorOrSelf => {
                let mut out = Vec::new();
                if axis == Axis::AncestorOrSelf {
                    out.push(pos);
                }
                let mut cur = self.parent(pos);
                while let Some(p) = cur {
                    out.push(p);
                    cur = self.parent(p);
                }
                out
            }
            Axis::SelfAxis => vec![pos],
            Axis::FollowingSibling | Axis::PrecedingSibling => self
                .parent(pos)
                .map(|p| self.children(p).into_iter().filter(|s| *s != pos).collect())
                .unwrap_or_default(),
            Axis::Attribute => Vec::new(),
        }
    }

    fn matches(&self, pos: Pos, test: &NodeTest) -> bool {
        let named = match pos {
            Pos::Node(s) if s != SchemaIndex::ROOT => Some(self.schema.node(s)),
            _ => None,
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => false,
            NodeTest::Wildcard => named.is_some(),
            NodeTest::PrefixWildcard(prefix) => named.map_or(false, |n| {
                mount::resolve_prefix(self.schema, self.owner, prefix) == Some(n.module)
            }),
            NodeTest::Name { prefix, local } => named.map_or(false, |n| {
                n.name == *local
                    && prefix.as_ref().map_or(true, |p| {
                        mount::resolve_prefix(self.schema, self.owner, p) == Some(n.module)
                    })
            }),
        }
    }
}

fn reads_downward(axis: Axis) -> bool {
    matches!(
        axis,
        Axis::Child
            | Axis::Descendant
            | Axis::DescendantOrSelf
            | Axis::FollowingSibling
            | Axis::PrecedingSibling
    )
}

fn dedup(positions: Vec<Pos>) -> Vec<Pos> {
    positions
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeafType, SchemaBuilder};

    #[test]
    fn test_references_follow_paths_and_predicates() {
        let mut b = SchemaBuilder::new();
        b.module("m", "m", "urn:m");
        let top = b.container(b.root(), "m:top");
        let list = b.list(top, "item", &["id"]);
        let id = b.leaf(list, "id", LeafType::Int);
        let name = b.leaf(list, "name", LeafType::String);
        let tags = b.leaf_list(top, "tag", LeafType::String);
        let limit = b.leaf(top, "limit", LeafType::Int);
        b.must(limit, "../item[id = current()]/name != 'x'");
        b.must(limit, "count(../tag) < 3");
        b.when(limit, "/m:top/m:item");
        let schema = b.build().unwrap();
        let graph = DependencyGraph::build(&schema);

        let on_name = graph.dependents(name);
        assert_eq!(on_name.len(), 1);
        assert_eq!(on_name[0].expr.constraint, ConstraintRef::Must(0));
        assert!(!on_name[0].unkeyed);

        // id is read inside the predicate
        assert_eq!(graph.dependents(id).len(), 1);

        let on_tags = graph.dependents(tags);
        assert_eq!(on_tags.len(), 1);
        assert!(on_tags[0].unkeyed);

        // the list is keyed for must 0 (intermediate step) and bare for the when
        let on_list = graph.dependents(list);
        let when = on_list
            .iter()
            .find(|e| e.expr.constraint == ConstraintRef::When)
            .unwrap();
        assert!(when.unkeyed);
        let must = on_list
            .iter()
            .find(|e| e.expr.constraint == ConstraintRef::Must(0))
            .unwrap();
        assert!(!must.unkeyed);
    }

    #[test]
    fn test_absolute_paths_anchor_at_mount_root() {
        let mut b = SchemaBuilder::new();
        b.module("outer", "o", "urn:outer");
        b.module("inner", "in", "urn:inner");
        let outer_top = b.container(b.root(), "o:top");
        b.leaf(outer_top, "name", LeafType::String);
        let mp = b.container(b.root(), "o:schemaMount");
        b.mount_point(mp, &["inner"]);
        let classifiers = b.container(mp, "in:classifiers");
        let list = b.list(classifiers, "nodeset-list", &["name"]);
        let name = b.leaf(list, "name", LeafType::String);
        let reference = b.leaf(classifiers, "reference", LeafType::String);
        b.must(reference, "/schemaMount/classifiers/nodeset-list/name = current()");
        let schema = b.build().unwrap();
        let graph = DependencyGraph::build(&schema);

        assert_eq!(graph.dependents(name).len(), 1);
        assert!(!graph.dependents(list)[0].unkeyed);
        assert_eq!(graph.edge_count(), 4);
    }
}
