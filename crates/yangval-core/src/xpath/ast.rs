//! XPath expression tree

use std::fmt;

use super::parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(String),
    Number(f64),
    Variable(String),
    Path(LocationPath),
    /// Primary expression followed by predicates and/or a relative path,
    /// e.g. `current()/../name` or `(a | b)[1]`
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    /// Text that failed to parse; evaluates to an empty node-set
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    /// `//` abbreviation
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    /// Reverse axes number their proximity positions backwards
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name {
        prefix: Option<String>,
        local: String,
    },
    Wildcard,
    PrefixWildcard(String),
    Node,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Union,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Union => "|",
        }
    }
}

/// An expression together with the exact text it was compiled from
///
/// Diagnostics quote `text` verbatim, so it is never normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    text: String,
    ast: Expr,
}

impl CompiledExpr {
    /// Compile expression text
    ///
    /// Never fails: text the grammar does not accept compiles to
    /// `Expr::Invalid`, which evaluates as an empty node-set.
    pub fn compile(text: &str) -> Self {
        let ast = match parser::parse(text) {
            Ok(ast) => ast,
            Err(reason) => {
                tracing::warn!(expr = text, reason = %reason, "xpath compile fell back to invalid");
                Expr::Invalid(text.to_string())
            }
        };
        Self {
            text: text.to_string(),
            ast,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.ast, Expr::Invalid(_))
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_keeps_text_verbatim() {
        let expr = CompiledExpr::compile("type   =  'must-type'");
        assert_eq!(expr.text(), "type   =  'must-type'");
        assert!(expr.is_valid());
    }

    #[test]
    fn test_garbage_compiles_to_invalid() {
        let expr = CompiledExpr::compile("../type = = 'x'");
        assert!(!expr.is_valid());
        assert_eq!(expr.to_string(), "../type = = 'x'");
    }

    #[test]
    fn test_reverse_axes() {
        assert!(Axis::Ancestor.is_reverse());
        assert!(Axis::PrecedingSibling.is_reverse());
        assert!(!Axis::Child.is_reverse());
        assert!(!Axis::FollowingSibling.is_reverse());
    }
}
