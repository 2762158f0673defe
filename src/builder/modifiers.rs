//! Modifier and annotation accumulation.
//!
//! Declarations see their modifiers before the declared node exists, so the leading run of
//! `modifier` and `annotation` pairs is collected into a [`ModifierSet`] first and applied once
//! the declaration is built.

use std::iter::Peekable;

use pest::iterators::{Pair, Pairs};

use super::{qualified_name, AstBuilder, BuildResult};
use crate::ast::{Annotation, Expr, ExprKind, Modifiers};
use crate::syntax::{Rule, Span};

#[derive(Debug, Clone)]
pub(crate) enum ModifierNode {
    Keyword { text: String, span: Span },
    Annotation(Annotation),
}

impl ModifierNode {
    /// JVM flag for a keyword. `def`, `var`, `default`, `sealed` and `non-sealed` carry none.
    fn flag(&self) -> u32 {
        match self {
            Self::Keyword { text, .. } => keyword_flag(text),
            Self::Annotation(_) => 0,
        }
    }

    fn is_visibility(&self) -> bool {
        self.flag() & Modifiers::VISIBILITY != 0
    }
}

fn keyword_flag(text: &str) -> u32 {
    match text {
        "public" => Modifiers::PUBLIC,
        "protected" => Modifiers::PROTECTED,
        "private" => Modifiers::PRIVATE,
        "static" => Modifiers::STATIC,
        "abstract" => Modifiers::ABSTRACT,
        "final" => Modifiers::FINAL,
        "strictfp" => Modifiers::STRICT,
        "native" => Modifiers::NATIVE,
        "synchronized" => Modifiers::SYNCHRONIZED,
        "transient" => Modifiers::TRANSIENT,
        "volatile" => Modifiers::VOLATILE,
        _ => 0,
    }
}

/// Modifiers and annotations in source order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModifierSet {
    nodes: Vec<ModifierNode>,
}

impl ModifierSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn bits(&self) -> Modifiers {
        Modifiers::new(self.nodes.iter().fold(0, |bits, node| bits | node.flag()))
    }

    pub(crate) fn annotations(&self) -> Vec<Annotation> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                ModifierNode::Annotation(annotation) => Some(annotation.clone()),
                ModifierNode::Keyword { .. } => None,
            })
            .collect()
    }

    pub(crate) fn keywords(&self) -> impl Iterator<Item = (&str, Span)> {
        self.nodes.iter().filter_map(|node| match node {
            ModifierNode::Keyword { text, span } => Some((text.as_str(), *span)),
            ModifierNode::Annotation(_) => None,
        })
    }

    /// Span of `keyword` when present.
    pub(crate) fn find(&self, keyword: &str) -> Option<Span> {
        self.keywords().find(|(text, _)| *text == keyword).map(|(_, span)| span)
    }

    pub(crate) fn has(&self, keyword: &str) -> bool {
        self.find(keyword).is_some()
    }

    pub(crate) fn has_visibility(&self) -> bool {
        self.nodes.iter().any(ModifierNode::is_visibility)
    }

    /// Only annotations, `def` or `var`.
    pub(crate) fn has_keywords_other_than_def(&self) -> bool {
        self.keywords().any(|(text, _)| text != "def" && text != "var")
    }
}

/// Keywords a declaration kind rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKind {
    Method,
    Constructor,
}

impl MemberKind {
    fn label(self) -> &'static str {
        match self {
            Self::Method => "Method",
            Self::Constructor => "Constructor",
        }
    }

    fn rejects(self, keyword: &str) -> bool {
        match self {
            Self::Method => keyword == "volatile",
            Self::Constructor => matches!(keyword, "static" | "final" | "abstract" | "native"),
        }
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

impl AstBuilder {
    /// Consumes the leading modifiers and annotations of a declaration.
    pub(crate) fn modifier_set(
        &mut self,
        children: &mut Peekable<Pairs<'_, Rule>>,
    ) -> BuildResult<ModifierSet> {
        let mut set = ModifierSet::default();
        while let Some(pair) = children.next_if(|p| matches!(p.as_rule(), Rule::modifier | Rule::annotation)) {
            let span = self.span_of(&pair);
            let node = match pair.as_rule() {
                Rule::annotation => ModifierNode::Annotation(self.annotation(pair)?),
                _ => ModifierNode::Keyword {
                    text: pair.as_str().to_string(),
                    span,
                },
            };

            if let ModifierNode::Keyword { text, .. } = &node {
                if set.has(text) {
                    return Err(self.syntax_error(format!("Cannot repeat modifier[{text}]"), span));
                }
                if node.is_visibility() && set.has_visibility() {
                    return Err(self.syntax_error(
                        format!("Cannot specify modifier[{text}] when access scope has already been defined"),
                        span,
                    ));
                }
            }
            set.nodes.push(node);
        }
        Ok(set)
    }

    /// Leading annotations only, as on packages, imports and type references.
    pub(crate) fn leading_annotations(
        &mut self,
        children: &mut Peekable<Pairs<'_, Rule>>,
    ) -> BuildResult<Vec<Annotation>> {
        let mut annotations = Vec::new();
        while let Some(pair) = children.next_if(|p| p.as_rule() == Rule::annotation) {
            annotations.push(self.annotation(pair)?);
        }
        Ok(annotations)
    }

    pub(crate) fn check_member_modifiers(
        &self,
        set: &ModifierSet,
        kind: MemberKind,
    ) -> BuildResult<()> {
        match set.keywords().find(|(text, _)| kind.rejects(text)) {
            Some((text, span)) => Err(self.syntax_error(
                format!("{} has an incorrect modifier '{text}'.", kind.label()),
                span,
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn annotation(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Annotation> {
        let span = self.span_of(&pair);
        let mut name = String::new();
        let mut members = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::qualified_class_name => name = qualified_name(&child),
                Rule::element_values => members = self.element_values(child)?,
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(Annotation {
            name,
            members,
            span,
        })
    }

    fn element_values(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<(String, Expr)>> {
        let mut members = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::element_value_pair => {
                    let mut parts = child.clone().into_inner();
                    let (name, value) = match (parts.next(), parts.next()) {
                        (Some(name), Some(value)) => (name.as_str().to_string(), value),
                        _ => return Err(self.unexpected(&child)),
                    };
                    members.push((name, self.element_value(value)?));
                }
                Rule::element_value => members.push(("value".to_string(), self.element_value(child)?)),
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(members)
    }

    pub(crate) fn element_value(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let inner = self.first_child(&pair)?;
        match inner.as_rule() {
            Rule::annotation => {
                let annotation = self.annotation(inner)?;
                Ok(Expr::new(ExprKind::AnnotationValue(Box::new(annotation)), span))
            }
            Rule::element_value_array => {
                let items = inner
                    .into_inner()
                    .map(|value| self.element_value(value))
                    .collect::<BuildResult<Vec<_>>>()?;
                Ok(Expr::new(ExprKind::List(items), span))
            }
            _ => self.enhanced_expression(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, Modifiers};
    use crate::parse;

    fn first_error(text: &str) -> String {
        let failure = parse(text, "Mods.groovy").unwrap_err();
        failure.messages()[0].to_string()
    }

    #[test]
    fn repeated_keyword_is_rejected() {
        assert_eq!(
            first_error("class A { static static int x }"),
            "Cannot repeat modifier[static]"
        );
    }

    #[test]
    fn second_visibility_is_rejected() {
        assert_eq!(
            first_error("class A { public private int x }"),
            "Cannot specify modifier[private] when access scope has already been defined"
        );
    }

    #[test]
    fn repeated_annotations_are_fine() {
        let module = parse("@A @A class C {}", "Mods.groovy").unwrap();
        assert_eq!(module.classes[0].annotations.len(), 2);
    }

    #[test]
    fn keyword_bits_are_combined() {
        let module = parse("class C { public static final int X = 1 }", "Mods.groovy").unwrap();
        let field = module.classes[0].field("X").unwrap();
        assert_eq!(
            field.modifiers.bits(),
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL
        );
    }

    #[test]
    fn volatile_method_is_rejected() {
        assert_eq!(
            first_error("class C { volatile void m() {} }"),
            "Method has an incorrect modifier 'volatile'."
        );
    }

    #[test]
    fn annotation_members_keep_their_shape() {
        let module = parse(
            "@Info(value = 'x', tags = ['a', 'b'], nested = @Other) class C {}\n@Single(3) class D {}",
            "Mods.groovy",
        )
        .unwrap();
        let info = &module.classes[0].annotations[0];
        assert_eq!(info.member("value").and_then(|v| v.as_string()), Some("x"));
        assert!(matches!(info.member("tags").map(|v| &v.kind), Some(ExprKind::List(items)) if items.len() == 2));
        assert!(matches!(
            info.member("nested").map(|v| &v.kind),
            Some(ExprKind::AnnotationValue(_))
        ));
        let single = &module.classes[1].annotations[0];
        assert_eq!(single.member("value").map(|v| v.text()), Some("3".to_string()));
    }
}
