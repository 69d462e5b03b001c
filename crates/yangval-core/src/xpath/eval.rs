//! Expression evaluation
//!
//! Evaluation is total: unresolvable names, unknown functions, wrong arity
//! and type mismatches all produce empty node-sets or NaN, never errors.

use crate::mount;
use crate::schema::{SchemaId, SchemaIndex};
use crate::xpath::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, Step};
use crate::xpath::document::{Document, XNode};
use crate::xpath::functions;
use crate::xpath::value::XValue;
use crate::xpath::CompiledExpr;

/// Dynamic context of one sub-expression
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub node: XNode,
    pub position: usize,
    pub size: usize,
}

impl Context {
    pub fn new(node: XNode) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// Evaluator bound to one constraint owner
///
/// `current()` always returns the owner, whatever the context node is
/// inside nested predicates.
pub struct Evaluator<'a> {
    doc: Document<'a>,
    current: XNode,
    scope: SchemaId,
    root: XNode,
}

impl<'a> Evaluator<'a> {
    pub fn new(doc: Document<'a>, current: XNode) -> Self {
        let scope = doc.schema_of(current).unwrap_or(SchemaIndex::ROOT);
        let root = mount::absolute_root(&doc, current);
        Self {
            doc,
            current,
            scope,
            root,
        }
    }

    pub fn document(&self) -> &Document<'a> {
        &self.doc
    }

    pub fn current(&self) -> XNode {
        self.current
    }

    /// Schema node whose prefix scope applies to names in the expression
    pub fn scope(&self) -> SchemaId {
        self.scope
    }

    pub fn evaluate(&self, expr: &CompiledExpr, context: XNode) -> XValue {
        self.eval(expr.ast(), &Context::new(context))
    }

    pub fn evaluate_bool(&self, expr: &CompiledExpr, context: XNode) -> bool {
        self.evaluate(expr, context).as_bool()
    }

    pub(crate) fn eval(&self, expr: &Expr, ctx: &Context) -> XValue {
        match expr {
            Expr::Literal(s) => XValue::String(s.clone()),
            Expr::Number(n) => XValue::Number(*n),
            Expr::Variable(_) | Expr::Invalid(_) => XValue::empty(),
            Expr::Path(path) => XValue::NodeSet(self.eval_path(path, ctx)),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let XValue::NodeSet(mut nodes) = self.eval(primary, ctx) else {
                    return XValue::empty();
                };
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate);
                }
                for step in steps {
                    nodes = self.apply_step(&nodes, step);
                }
                XValue::NodeSet(nodes)
            }
            Expr::Call { name, args } => functions::call(self, name, args, ctx),
            Expr::Binary(lhs, op, rhs) => self.eval_binary(lhs, *op, rhs, ctx),
            Expr::Negate(inner) => XValue::Number(-self.eval(inner, ctx).as_number(&self.doc)),
        }
    }

    fn eval_binary(&self, lhs: &Expr, op: BinaryOp, rhs: &Expr, ctx: &Context) -> XValue {
        match op {
            BinaryOp::Or => {
                XValue::Boolean(self.eval(lhs, ctx).as_bool() || self.eval(rhs, ctx).as_bool())
            }
            BinaryOp::And => {
                XValue::Boolean(self.eval(lhs, ctx).as_bool() && self.eval(rhs, ctx).as_bool())
            }
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                XValue::Boolean(self.compare(op, self.eval(lhs, ctx), self.eval(rhs, ctx)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.eval(lhs, ctx).as_number(&self.doc);
                let r = self.eval(rhs, ctx).as_number(&self.doc);
                XValue::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                })
            }
            BinaryOp::Union => {
                let (XValue::NodeSet(mut l), XValue::NodeSet(r)) =
                    (self.eval(lhs, ctx), self.eval(rhs, ctx))
                else {
                    return XValue::empty();
                };
                l.extend(r);
                self.doc.sort_nodes(&mut l);
                XValue::NodeSet(l)
            }
        }
    }

    /// XPath 1.0 comparison, section 3.4
    fn compare(&self, op: BinaryOp, lhs: XValue, rhs: XValue) -> bool {
        match (lhs, rhs) {
            (XValue::NodeSet(a), XValue::NodeSet(b)) => {
                let right: Vec<String> = b.iter().map(|n| self.doc.string_value(*n)).collect();
                a.iter().any(|x| {
                    let sx = self.doc.string_value(*x);
                    right
                        .iter()
                        .any(|sy| compare_atoms(op, Atom::Str(sx.clone()), Atom::Str(sy.clone())))
                })
            }
            (XValue::NodeSet(a), other) => self.compare_nodes(op, &a, other, false),
            (other, XValue::NodeSet(b)) => self.compare_nodes(op, &b, other, true),
            (l, r) => compare_atoms(op, self.atom(l), self.atom(r)),
        }
    }

    fn compare_nodes(&self, op: BinaryOp, nodes: &[XNode], other: XValue, swapped: bool) -> bool {
        if let XValue::Boolean(b) = other {
            let set = Atom::Bool(!nodes.is_empty());
            return if swapped {
                compare_atoms(op, Atom::Bool(b), set)
            } else {
                compare_atoms(op, set, Atom::Bool(b))
            };
        }
        let other = self.atom(other);
        nodes.iter().any(|n| {
            let atom = Atom::Str(self.doc.string_value(*n));
            if swapped {
                compare_atoms(op, other.clone(), atom)
            } else {
                compare_atoms(op, atom, other.clone())
            }
        })
    }

    fn atom(&self, value: XValue) -> Atom {
        match value {
            XValue::Boolean(b) => Atom::Bool(b),
            XValue::Number(n) => Atom::Num(n),
            XValue::String(s) => Atom::Str(s),
            nodes @ XValue::NodeSet(_) => Atom::Str(nodes.as_string(&self.doc)),
        }
    }

    fn eval_path(&self, path: &LocationPath, ctx: &Context) -> Vec<XNode> {
        let mut nodes = if path.absolute {
            vec![self.root]
        } else {
            vec![ctx.node]
        };
        for step in &path.steps {
            nodes = self.apply_step(&nodes, step);
            if nodes.is_empty() {
                break;
            }
        }
        nodes
    }

    pub(crate) fn apply_step(&self, inputs: &[XNode], step: &Step) -> Vec<XNode> {
        let mut out = Vec::new();
        for &input in inputs {
            let mut selected: Vec<XNode> = self
                .axis(input, step.axis)
                .into_iter()
                .filter(|n| self.matches(*n, &step.test))
                .collect();
            for predicate in &step.predicates {
                selected = self.filter(selected, predicate);
            }
            out.extend(selected);
        }
        self.doc.sort_nodes(&mut out);
        out
    }

    /// Keep nodes whose predicate holds, with proximity positions taken in
    /// the order given
    pub(crate) fn filter(&self, nodes: Vec<XNode>, predicate: &Expr) -> Vec<XNode> {
        let size = nodes.len();
        nodes
            .into_iter()
            .enumerate()
            .filter(|(i, node)| {
                let ctx = Context {
                    node: *node,
                    position: i + 1,
                    size,
                };
                match self.eval(predicate, &ctx) {
                    XValue::Number(n) => n == (i + 1) as f64,
                    other => other.as_bool(),
                }
            })
            .map(|(_, node)| node)
            .collect()
    }

    fn parent_of(&self, node: XNode) -> Option<XNode> {
        if let XNode::MountRoot(mount) = self.root {
            if node == XNode::Node(mount) {
                return Some(self.root);
            }
        }
        self.doc.parent(node)
    }

    /// Nodes along an axis, nearest first for reverse axes
    fn axis(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        match axis {
            Axis::Child => self.doc.children(node),
            Axis::Descendant => self.doc.descendants(node),
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                out.extend(self.doc.descendants(node));
                out
            }
            Axis::Parent => self.parent_of(node).into_iter().collect(),
            Axis::Ancestor | Axis::AncestorOrSelf => {
                let mut out = Vec::new();
                if axis == Axis::AncestorOrSelf {
                    out.push(node);
                }
                let mut cur = self.parent_of(node);
                while let Some(p) = cur {
                    out.push(p);
                    cur = self.parent_of(p);
                }
                out
            }
            Axis::SelfAxis => vec![node],
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = self.parent_of(node) else {
                    return Vec::new();
                };
                let siblings = self.doc.children(parent);
                let Some(at) = siblings.iter().position(|s| *s == node) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[at + 1..].to_vec()
                } else {
                    siblings[..at].iter().rev().copied().collect()
                }
            }
            Axis::Attribute => Vec::new(),
        }
    }

    fn matches(&self, node: XNode, test: &NodeTest) -> bool {
        match test {
            NodeTest::Node => true,
            NodeTest::Text => false,
            NodeTest::Wildcard => self.doc.name(node).is_some(),
            NodeTest::PrefixWildcard(prefix) => {
                match (self.doc.name(node), self.resolve_prefix(prefix)) {
                    (Some((module, _)), Some(wanted)) => module == wanted,
                    _ => false,
                }
            }
            NodeTest::Name { prefix, local } => {
                let Some((module, name)) = self.doc.name(node) else {
                    return false;
                };
                if name != local {
                    return false;
                }
                match prefix {
                    None => true,
                    Some(p) => self.resolve_prefix(p) == Some(module),
                }
            }
        }
    }

    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Option<crate::schema::ModuleId> {
        mount::resolve_prefix(self.doc.schema, self.scope, prefix)
    }
}

#[derive(Debug, Clone)]
enum Atom {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Atom {
    fn number(&self) -> f64 {
        match self {
            Atom::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Atom::Num(n) => *n,
            Atom::Str(s) => super::value::string_to_number(s),
        }
    }

    fn truth(&self) -> bool {
        match self {
            Atom::Bool(b) => *b,
            Atom::Num(n) => *n != 0.0 && !n.is_nan(),
            Atom::Str(s) => !s.is_empty(),
        }
    }
}

fn compare_atoms(op: BinaryOp, lhs: Atom, rhs: Atom) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (&lhs, &rhs) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => lhs.truth() == rhs.truth(),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => lhs.number() == rhs.number(),
                (Atom::Str(a), Atom::Str(b)) => a == b,
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (l, r) = (lhs.number(), rhs.number());
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}
