//! XPath 1.0 grammar
//!
//! Every token parser consumes its own leading whitespace; `parse` trims the
//! trailing remainder and requires the whole text to be consumed.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value, verify},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use super::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, Step};

type PResult<'a, T> = IResult<&'a str, T>;

/// Parse a complete expression
///
/// # Errors
///
/// Returns the nom error rendered as text when the input is not a
/// well-formed expression.
pub fn parse(text: &str) -> Result<Expr, String> {
    all_consuming(terminated(expr, multispace0))(text)
        .map(|(_, e)| e)
        .map_err(|e| e.to_string())
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn is_node_type(name: &str) -> bool {
    matches!(
        name,
        "node" | "text" | "comment" | "processing-instruction"
    )
}

fn sym<'a>(s: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(multispace0, tag(s))
}

fn keyword<'a>(k: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(
        multispace0,
        terminated(tag(k), not(satisfy(is_name_char))),
    )
}

fn ncname(i: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char)))(i)
}

fn qname(i: &str) -> PResult<'_, (Option<&str>, &str)> {
    let (i, first) = ncname(i)?;
    match preceded(char(':'), ncname)(i) {
        Ok((rest, local)) => Ok((rest, (Some(first), local))),
        Err(_) => Ok((i, (None, first))),
    }
}

fn qname_str(i: &str) -> PResult<'_, &str> {
    recognize(pair(ncname, opt(pair(char(':'), ncname))))(i)
}

/// Left-associative chain of `operand (op operand)*`
fn chain<'a, O, P>(i: &'a str, mut operand: O, mut op: P) -> PResult<'a, Expr>
where
    O: FnMut(&'a str) -> PResult<'a, Expr>,
    P: FnMut(&'a str) -> PResult<'a, BinaryOp>,
{
    let (mut i, mut lhs) = operand(i)?;
    loop {
        match op(i) {
            Ok((rest, o)) => {
                let (rest, rhs) = operand(rest)?;
                lhs = Expr::Binary(Box::new(lhs), o, Box::new(rhs));
                i = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((i, lhs)),
            Err(e) => return Err(e),
        }
    }
}

fn expr(i: &str) -> PResult<'_, Expr> {
    chain(i, and_expr, value(BinaryOp::Or, keyword("or")))
}

fn and_expr(i: &str) -> PResult<'_, Expr> {
    chain(i, equality_expr, value(BinaryOp::And, keyword("and")))
}

fn equality_expr(i: &str) -> PResult<'_, Expr> {
    chain(
        i,
        relational_expr,
        alt((value(BinaryOp::Ne, sym("!=")), value(BinaryOp::Eq, sym("=")))),
    )
}

fn relational_expr(i: &str) -> PResult<'_, Expr> {
    chain(
        i,
        additive_expr,
        alt((
            value(BinaryOp::Le, sym("<=")),
            value(BinaryOp::Lt, sym("<")),
            value(BinaryOp::Ge, sym(">=")),
            value(BinaryOp::Gt, sym(">")),
        )),
    )
}

fn additive_expr(i: &str) -> PResult<'_, Expr> {
    chain(
        i,
        multiplicative_expr,
        alt((value(BinaryOp::Add, sym("+")), value(BinaryOp::Sub, sym("-")))),
    )
}

fn multiplicative_expr(i: &str) -> PResult<'_, Expr> {
    chain(
        i,
        unary_expr,
        alt((
            value(BinaryOp::Mul, sym("*")),
            value(BinaryOp::Div, keyword("div")),
            value(BinaryOp::Mod, keyword("mod")),
        )),
    )
}

fn unary_expr(i: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(sym("-"), unary_expr), |e| Expr::Negate(Box::new(e))),
        union_expr,
    ))(i)
}

fn union_expr(i: &str) -> PResult<'_, Expr> {
    chain(i, path_expr, value(BinaryOp::Union, sym("|")))
}

fn path_expr(i: &str) -> PResult<'_, Expr> {
    alt((filter_expr, map(location_path, Expr::Path)))(i)
}

fn filter_expr(i: &str) -> PResult<'_, Expr> {
    let (i, primary) = primary_expr(i)?;
    let (i, predicates) = many0(predicate)(i)?;
    let (i, tail) = opt(pair(path_sep, relative_steps))(i)?;

    if predicates.is_empty() && tail.is_none() {
        return Ok((i, primary));
    }

    let steps = match tail {
        Some((descendant, mut steps)) => {
            if descendant {
                steps.insert(0, Step::descendant_or_self());
            }
            steps
        }
        None => Vec::new(),
    };

    Ok((
        i,
        Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        },
    ))
}

fn primary_expr(i: &str) -> PResult<'_, Expr> {
    preceded(
        multispace0,
        alt((
            map(preceded(char('$'), qname_str), |name: &str| {
                Expr::Variable(name.to_string())
            }),
            delimited(char('('), expr, sym(")")),
            map(literal, |s: &str| Expr::Literal(s.to_string())),
            map(number, Expr::Number),
            function_call,
        )),
    )(i)
}

fn literal(i: &str) -> PResult<'_, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(i)
}

fn number(i: &str) -> PResult<'_, f64> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |text: &str| text.parse::<f64>(),
    )(i)
}

fn function_call(i: &str) -> PResult<'_, Expr> {
    let (i, name) = verify(qname_str, |n: &str| !is_node_type(n))(i)?;
    let (i, _) = sym("(")(i)?;
    let (i, args) = separated_list0(sym(","), expr)(i)?;
    let (i, _) = sym(")")(i)?;
    Ok((
        i,
        Expr::Call {
            name: name.to_string(),
            args,
        },
    ))
}

fn predicate(i: &str) -> PResult<'_, Expr> {
    delimited(sym("["), expr, sym("]"))(i)
}

/// `true` for `//`, `false` for `/`
fn path_sep(i: &str) -> PResult<'_, bool> {
    alt((value(true, sym("//")), value(false, sym("/"))))(i)
}

fn location_path(i: &str) -> PResult<'_, LocationPath> {
    alt((
        absolute_path,
        map(relative_steps, |steps| LocationPath {
            absolute: false,
            steps,
        }),
    ))(i)
}

fn absolute_path(i: &str) -> PResult<'_, LocationPath> {
    if let Ok((rest, _)) = sym("//")(i) {
        let (rest, mut steps) = relative_steps(rest)?;
        steps.insert(0, Step::descendant_or_self());
        return Ok((
            rest,
            LocationPath {
                absolute: true,
                steps,
            },
        ));
    }

    let (i, _) = sym("/")(i)?;
    let (i, steps) = opt(relative_steps)(i)?;
    Ok((
        i,
        LocationPath {
            absolute: true,
            steps: steps.unwrap_or_default(),
        },
    ))
}

fn relative_steps(i: &str) -> PResult<'_, Vec<Step>> {
    let (mut i, first) = step(i)?;
    let mut steps = vec![first];

    loop {
        let (rest, descendant) = match path_sep(i) {
            Ok(ok) => ok,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        match step(rest) {
            Ok((rest, next)) => {
                if descendant {
                    steps.push(Step::descendant_or_self());
                }
                steps.push(next);
                i = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((i, steps))
}

fn step(i: &str) -> PResult<'_, Step> {
    preceded(
        multispace0,
        alt((
            value(Step::new(Axis::Parent, NodeTest::Node), tag("..")),
            value(Step::new(Axis::SelfAxis, NodeTest::Node), tag(".")),
            full_step,
        )),
    )(i)
}

fn full_step(i: &str) -> PResult<'_, Step> {
    let (i, axis) = opt(axis_specifier)(i)?;
    let (i, test) = node_test(i)?;
    let (i, predicates) = many0(predicate)(i)?;
    Ok((
        i,
        Step {
            axis: axis.unwrap_or(Axis::Child),
            test,
            predicates,
        },
    ))
}

fn axis_specifier(i: &str) -> PResult<'_, Axis> {
    alt((
        value(Axis::Attribute, char('@')),
        terminated(axis_name, sym("::")),
    ))(i)
}

fn axis_name(i: &str) -> PResult<'_, Axis> {
    alt((
        value(Axis::AncestorOrSelf, tag("ancestor-or-self")),
        value(Axis::Ancestor, tag("ancestor")),
        value(Axis::DescendantOrSelf, tag("descendant-or-self")),
        value(Axis::Descendant, tag("descendant")),
        value(Axis::FollowingSibling, tag("following-sibling")),
        value(Axis::PrecedingSibling, tag("preceding-sibling")),
        value(Axis::Parent, tag("parent")),
        value(Axis::SelfAxis, tag("self")),
        value(Axis::Child, tag("child")),
        value(Axis::Attribute, tag("attribute")),
    ))(i)
}

fn node_test(i: &str) -> PResult<'_, NodeTest> {
    preceded(
        multispace0,
        alt((
            value(
                NodeTest::Node,
                terminated(tag("node"), pair(sym("("), sym(")"))),
            ),
            value(
                NodeTest::Text,
                terminated(tag("text"), pair(sym("("), sym(")"))),
            ),
            value(NodeTest::Wildcard, char('*')),
            map(terminated(ncname, tag(":*")), |p: &str| {
                NodeTest::PrefixWildcard(p.to_string())
            }),
            map(qname, |(prefix, local)| NodeTest::Name {
                prefix: prefix.map(str::to_string),
                local: local.to_string(),
            }),
        )),
    )(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> NodeTest {
        NodeTest::Name {
            prefix: None,
            local: local.to_string(),
        }
    }

    fn child(local: &str) -> Step {
        Step::new(Axis::Child, name(local))
    }

    fn parent() -> Step {
        Step::new(Axis::Parent, NodeTest::Node)
    }

    #[test]
    fn test_simple_equality() {
        let ast = parse("type = 'must-type'").unwrap();
        assert_eq!(
            ast,
            Expr::Binary(
                Box::new(Expr::Path(LocationPath {
                    absolute: false,
                    steps: vec![child("type")],
                })),
                BinaryOp::Eq,
                Box::new(Expr::Literal("must-type".to_string())),
            )
        );
    }

    #[test]
    fn test_relative_parent_path() {
        let ast = parse("../type = 'fastdsl'").unwrap();
        let Expr::Binary(lhs, BinaryOp::Eq, _) = ast else {
            panic!("expected equality");
        };
        assert_eq!(
            *lhs,
            Expr::Path(LocationPath {
                absolute: false,
                steps: vec![parent(), child("type")],
            })
        );
    }

    #[test]
    fn test_current_filter_path() {
        let ast = parse("string-length(current()/../name) < 5").unwrap();
        let Expr::Binary(lhs, BinaryOp::Lt, rhs) = ast else {
            panic!("expected relational");
        };
        assert_eq!(*rhs, Expr::Number(5.0));
        let Expr::Call { name: fname, args } = *lhs else {
            panic!("expected call");
        };
        assert_eq!(fname, "string-length");
        assert_eq!(
            args[0],
            Expr::Filter {
                primary: Box::new(Expr::Call {
                    name: "current".to_string(),
                    args: vec![],
                }),
                predicates: vec![],
                steps: vec![parent(), child("name")],
            }
        );
    }

    #[test]
    fn test_absolute_path_with_hyphenated_names() {
        let ast = parse("/schemaMount/classifiers/nodeset-list/name = current()").unwrap();
        let Expr::Binary(lhs, BinaryOp::Eq, _) = ast else {
            panic!("expected equality");
        };
        let Expr::Path(path) = *lhs else {
            panic!("expected path");
        };
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 4);
        assert_eq!(path.steps[2], child("nodeset-list"));
    }

    #[test]
    fn test_prefixed_names_and_predicates() {
        let ast = parse("count(../if:entry[if:name = current()]) > 1").unwrap();
        let Expr::Binary(lhs, BinaryOp::Gt, _) = ast else {
            panic!("expected relational");
        };
        let Expr::Call { args, .. } = *lhs else {
            panic!("expected call");
        };
        let Expr::Path(path) = &args[0] else {
            panic!("expected path");
        };
        assert_eq!(
            path.steps[1].test,
            NodeTest::Name {
                prefix: Some("if".to_string()),
                local: "entry".to_string(),
            }
        );
        assert_eq!(path.steps[1].predicates.len(), 1);
    }

    #[test]
    fn test_operator_precedence() {
        let ast = parse("not(../a) and ../b or ../c").unwrap();
        let Expr::Binary(lhs, BinaryOp::Or, _) = ast else {
            panic!("or binds loosest");
        };
        assert!(matches!(*lhs, Expr::Binary(_, BinaryOp::And, _)));

        let ast = parse("1 + 2 * 3").unwrap();
        let Expr::Binary(_, BinaryOp::Add, rhs) = ast else {
            panic!("+ binds looser than *");
        };
        assert!(matches!(*rhs, Expr::Binary(_, BinaryOp::Mul, _)));
    }

    #[test]
    fn test_keyword_operators_need_boundaries() {
        let ast = parse("order-id div 2").unwrap();
        let Expr::Binary(lhs, BinaryOp::Div, _) = ast else {
            panic!("expected div");
        };
        assert_eq!(
            *lhs,
            Expr::Path(LocationPath {
                absolute: false,
                steps: vec![child("order-id")],
            })
        );
        assert!(parse("../mod").is_ok());
    }

    #[test]
    fn test_axes_and_abbreviations() {
        let ast = parse("//x").unwrap();
        let Expr::Path(path) = ast else {
            panic!("expected path");
        };
        assert!(path.absolute);
        assert_eq!(path.steps[0], Step::descendant_or_self());

        let ast = parse("ancestor-or-self::node()").unwrap();
        let Expr::Path(path) = ast else {
            panic!("expected path");
        };
        assert_eq!(path.steps[0].axis, Axis::AncestorOrSelf);
        assert_eq!(path.steps[0].test, NodeTest::Node);

        let ast = parse("following-sibling::p:*").unwrap();
        let Expr::Path(path) = ast else {
            panic!("expected path");
        };
        assert_eq!(path.steps[0].axis, Axis::FollowingSibling);
        assert_eq!(path.steps[0].test, NodeTest::PrefixWildcard("p".to_string()));
    }

    #[test]
    fn test_unary_minus_and_numbers() {
        assert_eq!(
            parse("-.5").unwrap(),
            Expr::Negate(Box::new(Expr::Number(0.5)))
        );
        assert!(matches!(
            parse("1 - -2").unwrap(),
            Expr::Binary(_, BinaryOp::Sub, _)
        ));
    }

    #[test]
    fn test_union_and_filter_predicate() {
        let ast = parse("(../a | ../b)[1]").unwrap();
        let Expr::Filter { primary, predicates, steps } = ast else {
            panic!("expected filter");
        };
        assert!(matches!(*primary, Expr::Binary(_, BinaryOp::Union, _)));
        assert_eq!(predicates, vec![Expr::Number(1.0)]);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_node_named_like_axis_or_type() {
        assert!(parse("../parent-id = 1").is_ok());
        assert!(parse("../node = 1").is_ok());
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        assert!(parse("").is_err());
        assert!(parse("../a = ").is_err());
        assert!(parse("count(").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("'unterminated").is_err());
    }
}
