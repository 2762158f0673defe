//! Numbers, strings and GStrings.

use once_cell::sync::Lazy;
use pest::iterators::Pair;
use regex::Regex;

use super::{AstBuilder, BuildResult};
use crate::ast::{Constant, Expr, ExprKind, GString, MethodCall, PropertyAccess, StmtKind};
use crate::errors::{BuildError, ErrorKind, ErrorReporting};
use crate::syntax::{Rule, Span};

// ============================================================================
// NUMBERS
// ============================================================================

static INTEGER_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<sign>[+-]?)(?P<radix>0[xXbB])?(?P<digits>[0-9a-fA-F]+?)(?P<suffix>[iIlLgG]?)$")
        .expect("valid regex")
});

static DECIMAL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<number>[+-]?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)(?P<suffix>[fFdDgG]?)$")
        .expect("valid regex")
});

/// Parses an integer literal to the narrowest constant that holds it, honoring `i`, `l` and
/// `g` suffixes. Underscores are ignored. Radix 2, 8 and 16 values wrap like their JVM
/// counterparts when a suffix forces a narrower type.
pub(crate) fn parse_integer(text: &str) -> Result<Constant, String> {
    let cleaned = text.replace('_', "");
    let caps = INTEGER_SHAPE
        .captures(&cleaned)
        .ok_or_else(|| format!("Invalid integer literal: {text}"))?;
    let negative = &caps["sign"] == "-";
    let digits = &caps["digits"];
    let suffix = caps["suffix"].to_ascii_lowercase();
    let radix = match caps.name("radix").map(|m| m.as_str()) {
        Some("0x" | "0X") => 16,
        Some(_) => 2,
        None if digits.len() > 1 && digits.starts_with('0') => 8,
        None => 10,
    };

    let magnitude = accumulate(digits, radix).ok_or_else(|| format!("Invalid digits in number literal: {text}"))?;
    let signed_digits = if negative { format!("-{digits}") } else { digits.to_string() };

    let value = match magnitude {
        Magnitude::Exact(m) if negative && m <= i128::MAX as u128 => -(m as i128),
        Magnitude::Exact(m) if m <= i128::MAX as u128 => m as i128,
        _ => {
            return match suffix.as_str() {
                "i" | "l" if radix == 10 => Err(out_of_range(&suffix, &signed_digits)),
                "i" => Ok(Constant::Int(magnitude.low_bits() as i32)),
                "l" => Ok(Constant::Long(magnitude.low_bits() as i64)),
                _ => Ok(Constant::BigInteger(literal_digits(negative, &caps))),
            };
        }
    };

    match suffix.as_str() {
        "i" if radix == 10 && i32::try_from(value).is_err() => Err(out_of_range("i", &signed_digits)),
        "i" => Ok(Constant::Int(value as i32)),
        "l" if radix == 10 && i64::try_from(value).is_err() => Err(out_of_range("l", &signed_digits)),
        "l" => Ok(Constant::Long(value as i64)),
        "g" => Ok(Constant::BigInteger(literal_digits(negative, &caps))),
        _ => Ok(if let Ok(v) = i32::try_from(value) {
            Constant::Int(v)
        } else if let Ok(v) = i64::try_from(value) {
            Constant::Long(v)
        } else {
            Constant::BigInteger(literal_digits(negative, &caps))
        }),
    }
}

enum Magnitude {
    Exact(u128),
    /// Wider than 128 bits; only the low bits are kept.
    Wrapped(u128),
}

impl Magnitude {
    fn low_bits(&self) -> u128 {
        match self {
            Self::Exact(v) | Self::Wrapped(v) => *v,
        }
    }
}

fn accumulate(digits: &str, radix: u32) -> Option<Magnitude> {
    let mut value: u128 = 0;
    let mut overflowed = false;
    for c in digits.chars() {
        let digit = c.to_digit(radix)? as u128;
        match value.checked_mul(radix as u128).and_then(|v| v.checked_add(digit)) {
            Some(next) => value = next,
            None => {
                overflowed = true;
                value = value.wrapping_mul(radix as u128).wrapping_add(digit);
            }
        }
    }
    Some(if overflowed {
        Magnitude::Wrapped(value)
    } else {
        Magnitude::Exact(value)
    })
}

fn literal_digits(negative: bool, caps: &regex::Captures<'_>) -> String {
    let prefix = caps.name("radix").map_or("", |m| m.as_str());
    let sign = if negative { "-" } else { "" };
    format!("{sign}{prefix}{}", &caps["digits"])
}

fn out_of_range(suffix: &str, digits: &str) -> String {
    let kind = if suffix == "i" { "Integer" } else { "Long" };
    format!("Number of type {kind} is out of range: {digits}")
}

/// Parses a decimal literal. Without a suffix, or with `g`, the value stays a `BigDecimal`
/// holding the literal digits.
pub(crate) fn parse_decimal(text: &str) -> Result<Constant, String> {
    let cleaned = text.replace('_', "");
    let caps = DECIMAL_SHAPE
        .captures(&cleaned)
        .ok_or_else(|| format!("Invalid decimal literal: {text}"))?;
    let number = &caps["number"];
    match caps["suffix"].to_ascii_lowercase().as_str() {
        "f" => match number.parse::<f64>() {
            Ok(v) if v.is_finite() && v.abs() <= f32::MAX as f64 => Ok(Constant::Float(v as f32)),
            _ => Err("Out of range".to_string()),
        },
        "d" => match number.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Constant::Double(v)),
            _ => Err("Out of range".to_string()),
        },
        _ => Ok(Constant::BigDecimal(number.to_string())),
    }
}

// ============================================================================
// STRINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuoteStyle {
    Quoted,
    Slashy,
    DollarSlashy,
}

/// Strips the delimiters of a string literal and decodes its escapes.
pub(crate) fn string_literal_value(text: &str) -> String {
    let (body, style, multiline) = if text.starts_with("'''") || text.starts_with("\"\"\"") {
        (trim_quotes(text, 3, 3), QuoteStyle::Quoted, true)
    } else if text.starts_with("$/") {
        (trim_quotes(text, 2, 2), QuoteStyle::DollarSlashy, true)
    } else if text.starts_with('/') {
        (trim_quotes(text, 1, 1), QuoteStyle::Slashy, true)
    } else {
        (trim_quotes(text, 1, 1), QuoteStyle::Quoted, false)
    };
    if multiline {
        unescape(&body.replace("\r\n", "\n"), style)
    } else {
        unescape(body, style)
    }
}

fn trim_quotes(text: &str, front: usize, back: usize) -> &str {
    text.get(front..text.len().saturating_sub(back)).unwrap_or_default()
}

/// Decodes escapes for one quote style.
///
/// Quoted strings take the standard escapes, octal, `\uXXXX` and line continuations. Slashy
/// strings only take `\/` and `\uXXXX`; dollar-slashy strings take `$$`, `$/` and `\uXXXX`.
pub(crate) fn unescape(text: &str, style: QuoteStyle) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if style == QuoteStyle::DollarSlashy && c == '$' {
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    out.push('$');
                    continue;
                }
                Some('/') => {
                    chars.next();
                    out.push('/');
                    continue;
                }
                _ => {
                    out.push(c);
                    continue;
                }
            }
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            out.push(c);
            break;
        };
        if next == 'u' {
            let mut lookahead = chars.clone();
            while lookahead.peek() == Some(&'u') {
                lookahead.next();
            }
            let hex: String = lookahead.clone().take(4).collect();
            if let Some(decoded) = (hex.len() == 4)
                .then(|| u32::from_str_radix(&hex, 16).ok())
                .flatten()
                .and_then(char::from_u32)
            {
                out.push(decoded);
                chars = lookahead;
                for _ in 0..4 {
                    chars.next();
                }
            } else {
                out.push(c);
            }
            continue;
        }
        match style {
            QuoteStyle::Quoted => {
                let simple = match next {
                    'b' => Some('\u{8}'),
                    't' => Some('\t'),
                    'n' => Some('\n'),
                    'f' => Some('\u{c}'),
                    'r' => Some('\r'),
                    's' => Some(' '),
                    '"' | '\'' | '\\' | '$' => Some(next),
                    _ => None,
                };
                if let Some(decoded) = simple {
                    chars.next();
                    out.push(decoded);
                } else if next.is_digit(8) {
                    out.push(octal_escape(&mut chars));
                } else if next == '\n' {
                    chars.next();
                } else if next == '\r' {
                    chars.next();
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                } else {
                    out.push(c);
                }
            }
            QuoteStyle::Slashy if next == '/' => {
                chars.next();
                out.push('/');
            }
            QuoteStyle::Slashy | QuoteStyle::DollarSlashy => out.push(c),
        }
    }
    out
}

/// `\0` to `\377`: three digits only when the first is 0 to 3.
fn octal_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> char {
    let mut value = 0u32;
    let mut taken = 0;
    let max_digits = match chars.peek() {
        Some('0'..='3') => 3,
        _ => 2,
    };
    while taken < max_digits {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(d) => {
                value = value * 8 + d;
                chars.next();
                taken += 1;
            }
            None => break,
        }
    }
    char::from_u32(value).unwrap_or('\u{0}')
}

// ============================================================================
// BUILDERS
// ============================================================================

impl AstBuilder {
    pub(crate) fn literal(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        match pair.as_rule() {
            Rule::integer_literal | Rule::float_literal => self.number_literal(&pair),
            Rule::boolean_literal => Ok(Expr::constant(Constant::Bool(pair.as_str() == "true"), span)),
            Rule::null_literal => Ok(Expr::null(span)),
            Rule::string_literal => Ok(Expr::string(string_literal_value(pair.as_str()), span)),
            Rule::gstring => self.gstring(pair),
            _ => Err(self.unexpected(&pair)),
        }
    }

    /// A number literal. Bad literals produce a `null` placeholder and a pending error that
    /// only becomes fatal once the whole unit has been built.
    fn number_literal(&mut self, pair: &Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(pair);
        let text = pair.as_str();
        let parsed = match pair.as_rule() {
            Rule::integer_literal => parse_integer(text),
            _ => parse_decimal(text),
        };
        match parsed {
            Ok(value) => Ok(Expr::constant(value, span)),
            Err(message) => {
                if self.pending_number_error.is_none() {
                    self.pending_number_error = Some(self.number_error(text, message, span));
                }
                Ok(Expr::null(span))
            }
        }
    }

    /// `-literal`, reparsed with the sign folded in so that `-2147483648` stays an `Int`.
    pub(crate) fn negated_number(&mut self, literal: &Pair<'_, Rule>, span: Span) -> BuildResult<Expr> {
        let text = literal.as_str();
        let parse: fn(&str) -> Result<Constant, String> = match literal.as_rule() {
            Rule::integer_literal => parse_integer,
            _ => parse_decimal,
        };
        let negated = format!("-{text}");
        match parse(&negated) {
            Ok(value) => {
                if parse(text).is_err() {
                    tracing::warn!(literal = text, "number literal only fits once negated");
                }
                Ok(Expr::constant(value, span))
            }
            Err(message) => Err(self.number_error(&negated, message, span)),
        }
    }

    fn number_error(&self, literal: &str, message: String, span: Span) -> BuildError {
        self.source.report(
            ErrorKind::NumberFormat {
                literal: literal.to_string(),
                message,
            },
            span,
        )
    }

    fn gstring(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let body = self.first_child(&pair)?;
        let (style, multiline) = match body.as_rule() {
            Rule::gstring_dq => (QuoteStyle::Quoted, false),
            Rule::gstring_tdq => (QuoteStyle::Quoted, true),
            Rule::gstring_slashy => (QuoteStyle::Slashy, true),
            Rule::gstring_dollar_slashy => (QuoteStyle::DollarSlashy, true),
            _ => return Err(self.unexpected(&body)),
        };

        let mut strings = Vec::new();
        let mut values = Vec::new();
        for part in body.into_inner() {
            match part.as_rule() {
                Rule::gstring_value => values.push(self.gstring_value(part)?),
                _ => {
                    let raw = part.as_str();
                    let text = if multiline {
                        unescape(&raw.replace("\r\n", "\n"), style)
                    } else {
                        unescape(raw, style)
                    };
                    strings.push(text);
                }
            }
        }

        let mut verbatim = String::new();
        for (i, text) in strings.iter().enumerate() {
            verbatim.push_str(text);
            if let Some(value) = values.get(i) {
                match &value.kind {
                    ExprKind::Variable(name) => {
                        verbatim.push('$');
                        verbatim.push_str(name);
                    }
                    _ => {
                        verbatim.push_str("${");
                        verbatim.push_str(&value.text());
                        verbatim.push('}');
                    }
                }
            }
        }

        Ok(Expr::new(
            ExprKind::GString(Box::new(GString {
                verbatim,
                strings,
                values,
            })),
            span,
        ))
    }

    fn gstring_value(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let inner = self.first_child(&pair)?;
        match inner.as_rule() {
            Rule::gstring_path => {
                let mut idents = inner.into_inner();
                let head = idents
                    .next()
                    .ok_or_else(|| self.internal("empty GString path", span))?;
                let mut expr = Expr::variable(head.as_str(), self.span_of(&head));
                for ident in idents {
                    let ident_span = self.span_of(&ident);
                    expr = Expr::new(
                        ExprKind::Property(Box::new(PropertyAccess {
                            object: expr,
                            property: Expr::string(ident.as_str(), ident_span),
                            safe: false,
                            spread_safe: false,
                            attribute: false,
                            implicit_this: false,
                        })),
                        span.merge(ident_span),
                    );
                }
                Ok(expr)
            }
            Rule::gstring_closure => {
                let closure_pair = self.expect_child(&inner, Rule::closure)?;
                let has_arrow = super::has_child(&closure_pair, Rule::closure_head);
                let closure = self.closure(closure_pair)?;
                if has_arrow {
                    return Ok(closure);
                }
                if let ExprKind::Closure(body) = &closure.kind {
                    let statements = body.body.block_statements().unwrap_or_default();
                    match statements {
                        [] => return Ok(Expr::null(span)),
                        [only] => {
                            if let StmtKind::Expression(expr) = &only.kind {
                                if !matches!(expr.kind, ExprKind::Declaration(_)) {
                                    return Ok(expr.clone());
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Expr::new(
                    ExprKind::MethodCall(Box::new(MethodCall {
                        object: closure,
                        method: Expr::string("call", span),
                        arguments: Expr::arguments(Vec::new(), span),
                        safe: false,
                        spread_safe: false,
                        implicit_this: true,
                        generics: Vec::new(),
                    })),
                    span,
                ))
            }
            _ => Err(self.unexpected(&inner)),
        }
    }
}
