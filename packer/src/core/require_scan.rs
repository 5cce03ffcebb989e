//! Static scanner for `require("...")` references in script source.
//!
//! The source is parsed with the tree-sitter JavaScript grammar and every call
//! whose callee is the bare identifier `require` is inspected. Only literal,
//! single-argument calls are accepted. Anything else is a [`ScanError`],
//! because a computed dependency cannot be packaged statically. Source that
//! does not parse is rejected outright so no call can hide in an error node.

use thiserror::Error;
use tree_sitter::{Node, Parser};

/// Why a `require` call could not be read statically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("require() at byte {offset} has no arguments")]
    NoArguments { offset: usize },
    #[error("require() at byte {offset} has more than one argument")]
    TooManyArguments { offset: usize },
    #[error("require() at byte {offset} argument is not a string literal")]
    NonLiteral { offset: usize },
    #[error("source does not parse as JavaScript near byte {offset}")]
    Unparsable { offset: usize },
    #[error("JavaScript grammar unavailable: {0}")]
    Grammar(String),
}

/// Extract the literal specifiers of every `require(...)` call, in source order.
pub fn extract_required_specifiers(source: &str) -> Result<Vec<String>, ScanError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|err| ScanError::Grammar(err.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or(ScanError::Unparsable { offset: 0 })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ScanError::Unparsable {
            offset: first_error_offset(root),
        });
    }

    let bytes = source.as_bytes();
    let mut specifiers = Vec::new();
    // Pre-order over an explicit stack keeps source order without recursion.
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression" && is_require_callee(node, bytes) {
            specifiers.push(read_argument(node, bytes)?);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    Ok(specifiers)
}

fn is_require_callee(call: Node, bytes: &[u8]) -> bool {
    call.child_by_field_name("function")
        .is_some_and(|callee| {
            callee.kind() == "identifier" && callee.utf8_text(bytes).is_ok_and(|t| t == "require")
        })
}

fn read_argument(call: Node, bytes: &[u8]) -> Result<String, ScanError> {
    let offset = call.start_byte();
    // A tagged template (require`x`) carries a template_string here.
    let args = call
        .child_by_field_name("arguments")
        .filter(|args| args.kind() == "arguments")
        .ok_or(ScanError::NonLiteral { offset })?;

    let mut cursor = args.walk();
    let values: Vec<Node> = args
        .named_children(&mut cursor)
        .filter(|arg| arg.kind() != "comment")
        .collect();
    match values.as_slice() {
        [] => Err(ScanError::NoArguments { offset }),
        [arg] => literal_value(*arg, bytes).ok_or(ScanError::NonLiteral { offset }),
        _ => Err(ScanError::TooManyArguments { offset }),
    }
}

/// The value of a quoted string or a substitution-free template.
fn literal_value(node: Node, bytes: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|part| part.kind() == "template_substitution")
            {
                return None;
            }
        }
        _ => return None,
    }
    let text = node.utf8_text(bytes).ok()?;
    let inner = text.get(1..text.len().checked_sub(1)?)?;
    unescape(inner)
}

/// Decode single-character escapes; hex and unicode escapes are not accepted.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\n' => {}
            'x' | 'u' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

fn first_error_offset(root: Node) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_byte();
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    root.start_byte()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_literal_specifiers_in_order() {
        let source = r#"
            const a = require('./lib/a');
            const fs = require("fs");
            const b = require( `lodash` );
        "#;
        assert_eq!(
            extract_required_specifiers(source).expect("scan"),
            vec!["./lib/a", "fs", "lodash"]
        );
    }

    #[test]
    fn ignores_comments_strings_and_members() {
        let source = r#"
            // require('commented')
            /* require("blocked") */
            const msg = "call require('quoted') later";
            loader.require(name);
            const requireX = 1;
            const ok = require('./ok');
        "#;
        assert_eq!(extract_required_specifiers(source).expect("scan"), vec!["./ok"]);
    }

    #[test]
    fn quote_inside_regex_literal_does_not_hide_later_calls() {
        let source = "const re = /'/; const a = require('./a');";
        assert_eq!(extract_required_specifiers(source).expect("scan"), vec!["./a"]);
    }

    #[test]
    fn call_inside_template_substitution_is_found() {
        let source = "const s = `${require('./b').name}`;";
        assert_eq!(extract_required_specifiers(source).expect("scan"), vec!["./b"]);
    }

    #[test]
    fn nested_calls_keep_source_order() {
        let source = "wrap(require('./first'), () => require('./second'));";
        assert_eq!(
            extract_required_specifiers(source).expect("scan"),
            vec!["./first", "./second"]
        );
    }

    #[test]
    fn trailing_comma_is_a_single_argument() {
        assert_eq!(
            extract_required_specifiers("require('a',);").expect("scan"),
            vec!["a"]
        );
    }

    #[test]
    fn escaped_quote_is_decoded() {
        assert_eq!(
            extract_required_specifiers(r"require('./it\'s');").expect("scan"),
            vec!["./it's"]
        );
    }

    #[test]
    fn numeric_argument_is_non_literal() {
        let err = extract_required_specifiers("const x = require(42);").unwrap_err();
        assert_eq!(err, ScanError::NonLiteral { offset: 10 });
    }

    #[test]
    fn computed_argument_is_non_literal() {
        let err = extract_required_specifiers("require('./' + name)").unwrap_err();
        assert!(matches!(err, ScanError::NonLiteral { .. }));
    }

    #[test]
    fn interpolated_template_is_non_literal() {
        let err = extract_required_specifiers("require(`./${name}`)").unwrap_err();
        assert!(matches!(err, ScanError::NonLiteral { .. }));
    }

    #[test]
    fn tagged_template_is_non_literal() {
        let err = extract_required_specifiers("require`./a`;").unwrap_err();
        assert!(matches!(err, ScanError::NonLiteral { .. }));
    }

    #[test]
    fn extra_arguments_are_rejected() {
        let err = extract_required_specifiers("require('a', 'b')").unwrap_err();
        assert!(matches!(err, ScanError::TooManyArguments { .. }));
    }

    #[test]
    fn empty_call_is_rejected() {
        let err = extract_required_specifiers("require()").unwrap_err();
        assert!(matches!(err, ScanError::NoArguments { .. }));
    }

    #[test]
    fn syntax_error_is_rejected() {
        let err = extract_required_specifiers("const a = require('./a'; {").unwrap_err();
        assert!(matches!(err, ScanError::Unparsable { .. }));
    }

    #[test]
    fn source_without_requires_is_empty() {
        assert!(
            extract_required_specifiers("module.exports = () => 1;")
                .expect("scan")
                .is_empty()
        );
    }
}
