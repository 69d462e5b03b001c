//! XPath 1.0 core function library plus the YANG extensions

use regex::Regex;

use crate::mount;
use crate::schema::{LeafType, SchemaIndex};
use crate::xpath::ast::Expr;
use crate::xpath::document::XNode;
use crate::xpath::eval::{Context, Evaluator};
use crate::xpath::value::XValue;

pub(crate) fn call(ev: &Evaluator<'_>, name: &str, args: &[Expr], ctx: &Context) -> XValue {
    let doc = ev.document();
    let arg = |i: usize| ev.eval(&args[i], ctx);
    let string_arg = |i: usize| arg(i).as_string(doc);
    let number_arg = |i: usize| arg(i).as_number(doc);
    // node argument or, when omitted, the context node
    let node_or_context = || -> Option<XNode> {
        if args.is_empty() {
            Some(ctx.node)
        } else {
            arg(0).into_nodes().first().copied()
        }
    };

    match (name, args.len()) {
        // node-set
        ("last", 0) => XValue::Number(ctx.size as f64),
        ("position", 0) => XValue::Number(ctx.position as f64),
        ("count", 1) => XValue::Number(arg(0).into_nodes().len() as f64),
        ("sum", 1) => XValue::Number(
            arg(0)
                .into_nodes()
                .iter()
                .map(|n| super::value::string_to_number(&doc.string_value(*n)))
                .sum(),
        ),
        ("current", 0) => XValue::NodeSet(vec![ev.current()]),
        ("local-name", 0 | 1) => XValue::String(
            node_or_context()
                .map(|n| mount::local_name(doc, n))
                .unwrap_or_default(),
        ),
        ("namespace-uri", 0 | 1) => XValue::String(
            node_or_context()
                .map(|n| mount::namespace_uri(doc, n))
                .unwrap_or_default(),
        ),
        ("name", 0 | 1) => XValue::String(
            node_or_context()
                .map(|n| mount::qualified_name(doc, n))
                .unwrap_or_default(),
        ),
        ("id", 1) => XValue::empty(),

        // string
        ("string", 0) => XValue::String(doc.string_value(ctx.node)),
        ("string", 1) => XValue::String(string_arg(0)),
        ("concat", n) if n >= 2 => XValue::String((0..n).map(&string_arg).collect()),
        ("starts-with", 2) => XValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        ("contains", 2) => XValue::Boolean(string_arg(0).contains(&string_arg(1))),
        ("substring-before", 2) => {
            let (s, pat) = (string_arg(0), string_arg(1));
            XValue::String(
                s.find(&pat)
                    .map(|at| s[..at].to_string())
                    .unwrap_or_default(),
            )
        }
        ("substring-after", 2) => {
            let (s, pat) = (string_arg(0), string_arg(1));
            XValue::String(
                s.find(&pat)
                    .map(|at| s[at + pat.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        ("substring", 2 | 3) => {
            let s = string_arg(0);
            let start = round(number_arg(1));
            let len = if args.len() == 3 {
                Some(round(number_arg(2)))
            } else {
                None
            };
            XValue::String(substring(&s, start, len))
        }
        ("string-length", 0) => {
            XValue::Number(doc.string_value(ctx.node).chars().count() as f64)
        }
        ("string-length", 1) => XValue::Number(string_arg(0).chars().count() as f64),
        ("normalize-space", 0 | 1) => {
            let s = if args.is_empty() {
                doc.string_value(ctx.node)
            } else {
                string_arg(0)
            };
            XValue::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        ("translate", 3) => XValue::String(translate(
            &string_arg(0),
            &string_arg(1),
            &string_arg(2),
        )),

        // boolean
        ("boolean", 1) => XValue::Boolean(arg(0).as_bool()),
        ("not", 1) => XValue::Boolean(!arg(0).as_bool()),
        ("true", 0) => XValue::Boolean(true),
        ("false", 0) => XValue::Boolean(false),
        ("lang", 1) => XValue::Boolean(false),

        // number
        ("number", 0) => XValue::Number(super::value::string_to_number(
            &doc.string_value(ctx.node),
        )),
        ("number", 1) => XValue::Number(number_arg(0)),
        ("floor", 1) => XValue::Number(number_arg(0).floor()),
        ("ceiling", 1) => XValue::Number(number_arg(0).ceil()),
        ("round", 1) => XValue::Number(round(number_arg(0))),

        // YANG
        ("derived-from", 2) => XValue::Boolean(derived_from(ev, arg(0), &string_arg(1), false)),
        ("derived-from-or-self", 2) => {
            XValue::Boolean(derived_from(ev, arg(0), &string_arg(1), true))
        }
        ("bit-is-set", 2) => {
            let bit = string_arg(1);
            XValue::Boolean(
                arg(0)
                    .into_nodes()
                    .first()
                    .map(|n| doc.string_value(*n).split_whitespace().any(|b| b == bit))
                    .unwrap_or(false),
            )
        }
        ("enum-value", 1) => XValue::Number(
            arg(0)
                .into_nodes()
                .first()
                .and_then(|n| {
                    let schema = doc.schema_of(*n)?;
                    let leaf_type = doc.schema.node(schema).leaf_type.as_ref()?;
                    leaf_type.enum_value(&doc.string_value(*n))
                })
                .map(|v| v as f64)
                .unwrap_or(f64::NAN),
        ),
        ("re-match", 2) => {
            let (s, pattern) = (string_arg(0), string_arg(1));
            XValue::Boolean(
                Regex::new(&format!("^(?:{})$", pattern))
                    .map(|re| re.is_match(&s))
                    .unwrap_or(false),
            )
        }
        ("deref", 1) => deref(ev, arg(0)),

        _ => {
            tracing::trace!(function = name, arity = args.len(), "unknown xpath function");
            XValue::empty()
        }
    }
}

/// XPath `round()`: halves round towards positive infinity
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// Characters at 1-based positions `p` with `start <= p < start + len`
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && len.map_or(true, |l| p < start + l)
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(at) => to.get(at).copied(),
            None => Some(c),
        })
        .collect()
}

fn derived_from(ev: &Evaluator<'_>, nodes: XValue, identity: &str, or_self: bool) -> bool {
    let doc = ev.document();
    let schema: &SchemaIndex = doc.schema;
    let owner_module = schema.node(ev.scope()).module;
    let Some(base) = schema.resolve_identity(ev.scope(), owner_module, identity) else {
        return false;
    };

    nodes.into_nodes().into_iter().any(|n| {
        let Some(node_schema) = doc.schema_of(n) else {
            return false;
        };
        let value = doc.string_value(n);
        schema
            .resolve_identity(node_schema, schema.node(node_schema).module, &value)
            .map_or(false, |id| schema.identity_derived_from(id, base, or_self))
    })
}

/// Follow a leafref to the first node its path selects with an equal value
fn deref(ev: &Evaluator<'_>, nodes: XValue) -> XValue {
    let doc = *ev.document();
    let Some(&source) = nodes.into_nodes().first() else {
        return XValue::empty();
    };
    let Some(schema_id) = doc.schema_of(source) else {
        return XValue::empty();
    };
    let Some(LeafType::LeafRef { path }) = &doc.schema.node(schema_id).leaf_type else {
        return XValue::empty();
    };

    let target = Evaluator::new(doc, source);
    let wanted = doc.string_value(source);
    let found = target
        .evaluate(path, source)
        .into_nodes()
        .into_iter()
        .find(|n| doc.string_value(*n) == wanted);

    XValue::NodeSet(found.into_iter().collect())
}
