//! Groovy CST Parser
//!
//! Runs the pest grammar over a source and hands back the `compilation_unit` pair. The parser is
//! purely syntactic: every semantic decision, and every diagnostic beyond "this does not parse",
//! belongs to the builder.

use pest::{
    error::{Error, ErrorVariant, InputLocation},
    iterators::Pair,
    Parser,
};
use pest_derive::Parser;

use crate::errors::{BuildError, ErrorKind, ErrorReporting, SourceContext};
use crate::syntax::LineIndex;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
pub struct GroovyParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a whole compilation unit into its CST root.
pub fn parse_cst(source: &SourceContext) -> Result<Pair<'_, Rule>, BuildError> {
    let mut pairs = GroovyParser::parse(Rule::compilation_unit, &source.content)
        .map_err(|e| convert_parse_error(e, source))?;

    pairs.next().ok_or_else(|| {
        source.internal_error(
            "grammar produced no compilation unit",
            LineIndex::new(&source.content).span(0, 0),
        )
    })
}

/// Parses `text` as a single rule. Used by tests and tooling that need a fragment.
pub fn parse_rule<'i>(
    rule: Rule,
    text: &'i str,
    source: &SourceContext,
) -> Result<Pair<'i, Rule>, BuildError> {
    let mut pairs = GroovyParser::parse(rule, text).map_err(|e| convert_parse_error(e, source))?;
    pairs.next().ok_or_else(|| {
        source.internal_error(
            format!("grammar produced nothing for {rule:?}"),
            LineIndex::new(text).span(0, 0),
        )
    })
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>, source: &SourceContext) -> BuildError {
    let index = LineIndex::new(&source.content);
    let (start, end) = match error.location {
        InputLocation::Pos(pos) => (pos, pos),
        InputLocation::Span((start, end)) => (start, end),
    };

    let rest = source.content.get(start..).unwrap_or_default();
    let message = match rest.chars().next() {
        None => "Unexpected input: end of file".to_string(),
        Some(c @ ('"' | '\'')) => format!("Unexpected character: '{c}'"),
        Some(_) => format!("Unexpected input: '{}'", offending_token(rest)),
    };

    let mut err = source.report(ErrorKind::Parse { message }, index.span(start, end));
    err.help = expected_rules(&error.variant);
    err
}

/// The run of non-blank text at the failure point, capped for readability.
fn offending_token(rest: &str) -> String {
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace())
        .take(24)
        .collect();
    if token.is_empty() {
        rest.chars().take(1).collect()
    } else {
        token
    }
}

fn expected_rules(variant: &ErrorVariant<Rule>) -> Option<String> {
    match variant {
        ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            let names: Vec<String> = positives
                .iter()
                .take(6)
                .map(|rule| format!("{rule:?}").replace('_', " "))
                .collect();
            Some(format!("expected one of: {}", names.join(", ")))
        }
        ErrorVariant::CustomError { message } => Some(message.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cst(text: &str) -> Result<String, BuildError> {
        let source = SourceContext::from_file("test.groovy", text);
        parse_cst(&source).map(|pair| format!("{:?}", pair.as_rule()))
    }

    fn rules_of(rule: Rule, text: &str) -> Vec<Rule> {
        let source = SourceContext::from_file("fragment", text);
        let pair = parse_rule(rule, text, &source).unwrap();
        pair.into_inner().map(|p| p.as_rule()).collect()
    }

    #[test]
    fn empty_input_is_a_compilation_unit() {
        assert_eq!(cst("").unwrap(), "compilation_unit");
        assert_eq!(cst("\n\n// only a comment\n").unwrap(), "compilation_unit");
    }

    #[test]
    fn shebang_is_skipped() {
        assert!(cst("#!/usr/bin/env groovy\nprintln 'hi'\n").is_ok());
    }

    #[test]
    fn statements_need_separators() {
        assert!(cst("a = 1; b = 2\nc = 3").is_ok());
        assert!(cst("a = 1 )").is_err());
    }

    #[test]
    fn unterminated_string_is_reported() {
        let err = cst("def s = 'abc\n").unwrap_err();
        assert!(err.message().starts_with("Unexpected"));
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn unexpected_token_is_named() {
        let err = cst("def x = )").unwrap_err();
        assert!(err.message().starts_with("Unexpected input"));
        assert!(err.help.is_some());
    }

    #[test]
    fn operator_chain_stays_flat() {
        let rules = rules_of(Rule::operator_expression, "-a + b * c as int");
        assert_eq!(
            rules,
            vec![
                Rule::unary_add_op,
                Rule::path_expression,
                Rule::additive_op,
                Rule::path_expression,
                Rule::multiplicative_op,
                Rule::path_expression,
                Rule::as_type,
            ]
        );
    }

    #[test]
    fn command_like_lines_are_not_declarations() {
        let source = SourceContext::from_file("t", "println x\nString y\n");
        let unit = parse_cst(&source).unwrap();
        let kinds: Vec<Rule> = unit.into_inner().map(|p| p.as_rule()).collect();
        assert_eq!(
            kinds,
            vec![
                Rule::expression_statement,
                Rule::local_variable_declaration,
                Rule::EOI
            ]
        );
    }

    #[test]
    fn gstring_needs_a_value() {
        assert_eq!(rules_of(Rule::string_literal, "\"plain\"").len(), 0);
        let rules = rules_of(Rule::gstring, "\"a${b}c$d.e\"");
        assert_eq!(rules, vec![Rule::gstring_dq]);
    }
}
