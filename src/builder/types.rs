//! Type references, type arguments and type parameters.

use pest::iterators::Pair;

use super::{qualified_name, AstBuilder, BuildResult};
use crate::ast::{Annotation, GenericsType, PrimitiveType, TypeKind, TypeRef};
use crate::syntax::{Rule, Span};

impl AstBuilder {
    /// Builds a `type_ref`. `void` is only accepted when `allow_void` is set, and never with
    /// array dimensions.
    pub(crate) fn type_ref(&mut self, pair: Pair<'_, Rule>, allow_void: bool) -> BuildResult<TypeRef> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        let mut base: Option<TypeRef> = None;
        let mut dims = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::primitive_type => base = Some(self.primitive_type(&child)?),
                Rule::void_type => base = Some(TypeRef::new(TypeKind::Void, self.span_of(&child))),
                Rule::class_or_interface_type => base = Some(self.class_or_interface_type(child)?),
                Rule::dims => dims = self.dims(child)?,
                _ => return Err(self.unexpected(&child)),
            }
        }

        let mut ty = base.ok_or_else(|| self.internal("type without a base", span))?;
        if ty.is_void() {
            if !dims.is_empty() {
                return Err(self.syntax_error("void[] is an invalid type", span));
            }
            if !allow_void {
                return Err(self.syntax_error("void is not allowed here", span));
            }
        }
        ty.annotations.extend(annotations);
        ty.span = span;
        Ok(wrap_dims(ty, dims))
    }

    /// A method return type: `void` or any type reference.
    pub(crate) fn return_type(&mut self, pair: Pair<'_, Rule>) -> BuildResult<TypeRef> {
        let inner = self.first_child(&pair)?;
        match inner.as_rule() {
            Rule::void_type => Ok(TypeRef::new(TypeKind::Void, self.span_of(&inner))),
            _ => self.type_ref(inner, true),
        }
    }

    pub(crate) fn primitive_type(&self, pair: &Pair<'_, Rule>) -> BuildResult<TypeRef> {
        let primitive = PrimitiveType::from_keyword(pair.as_str())
            .ok_or_else(|| self.unexpected(pair))?;
        Ok(TypeRef::new(TypeKind::Primitive(primitive), self.span_of(pair)))
    }

    fn class_or_interface_type(&mut self, pair: Pair<'_, Rule>) -> BuildResult<TypeRef> {
        let span = self.span_of(&pair);
        let mut name = String::new();
        let mut generics = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::qualified_class_name => name = qualified_name(&child),
                Rule::type_arguments => generics = self.type_arguments(child)?,
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(TypeRef::new(TypeKind::Named { name, generics }, span))
    }

    /// Annotations of each `[]`, outermost first.
    pub(crate) fn dims(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<Vec<Annotation>>> {
        pair.into_inner()
            .map(|dim| {
                dim.into_inner()
                    .map(|annotation| self.annotation(annotation))
                    .collect::<BuildResult<Vec<_>>>()
            })
            .collect()
    }

    pub(crate) fn type_arguments(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<GenericsType>> {
        pair.into_inner()
            .map(|argument| self.type_argument(argument))
            .collect()
    }

    fn type_argument(&mut self, pair: Pair<'_, Rule>) -> BuildResult<GenericsType> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::type_ref => {
                    let mut ty = self.type_ref(child, false)?;
                    if !annotations.is_empty() {
                        ty.span = span;
                    }
                    ty.annotations.splice(0..0, annotations);
                    let mut generics = GenericsType::argument(ty);
                    generics.span = span;
                    return Ok(generics);
                }
                Rule::wildcard_type => return self.wildcard_type(child, annotations, span),
                _ => return Err(self.unexpected(&child)),
            }
        }
        Err(self.internal("type argument without a type", span))
    }

    /// `?` with its bound. `span` is the whole type argument, leading annotations included.
    fn wildcard_type(
        &mut self,
        pair: Pair<'_, Rule>,
        annotations: Vec<Annotation>,
        span: Span,
    ) -> BuildResult<GenericsType> {
        let mut base = TypeRef::named("?", span);
        base.annotations = annotations;
        let mut generics = GenericsType {
            name: "?".into(),
            ty: Some(base),
            upper_bounds: Vec::new(),
            lower_bound: None,
            wildcard: true,
            placeholder: false,
            span,
        };

        let mut is_super = false;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::wildcard_bound => is_super = child.as_str() == "super",
                Rule::type_ref => {
                    let bound = self.type_ref(child, false)?;
                    if is_super {
                        generics.lower_bound = Some(bound);
                    } else {
                        generics.upper_bounds.push(bound);
                    }
                }
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(generics)
    }

    pub(crate) fn type_parameters(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<GenericsType>> {
        pair.into_inner()
            .map(|parameter| self.type_parameter(parameter))
            .collect()
    }

    fn type_parameter(&mut self, pair: Pair<'_, Rule>) -> BuildResult<GenericsType> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        let mut name = String::new();
        let mut upper_bounds = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::identifier => name = child.as_str().to_string(),
                Rule::kw_extends => {}
                Rule::type_bound => upper_bounds = self.type_list(child)?,
                _ => return Err(self.unexpected(&child)),
            }
        }
        let mut ty = TypeRef::named(name.clone(), span);
        ty.annotations = annotations;
        Ok(GenericsType {
            name,
            ty: Some(ty),
            upper_bounds,
            lower_bound: None,
            wildcard: false,
            placeholder: true,
            span,
        })
    }

    /// `type_list` and `type_bound`: types separated by `,` or `&`.
    pub(crate) fn type_list(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<TypeRef>> {
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::type_ref)
            .map(|ty| self.type_ref(ty, false))
            .collect()
    }

    /// The type after `new`. A diamond gives an empty argument list.
    pub(crate) fn created_name(&mut self, pair: Pair<'_, Rule>) -> BuildResult<TypeRef> {
        let span = self.span_of(&pair);
        let mut ty = None;
        let mut generics = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::primitive_type => ty = Some(self.primitive_type(&child)?),
                Rule::qualified_class_name => ty = Some(TypeRef::named(qualified_name(&child), span)),
                Rule::type_arguments => generics = self.type_arguments(child)?,
                Rule::diamond => {}
                _ => return Err(self.unexpected(&child)),
            }
        }
        let mut ty = ty.ok_or_else(|| self.internal("created name without a type", span))?;
        if let TypeKind::Named { generics: slot, .. } = &mut ty.kind {
            *slot = generics;
        }
        ty.span = span;
        Ok(ty)
    }

    /// A bare `qualified_class_name` used as a type, as in `throws` and `catch`.
    pub(crate) fn class_type(&self, pair: &Pair<'_, Rule>) -> TypeRef {
        TypeRef::named(qualified_name(pair), self.span_of(pair))
    }
}

/// Wraps `ty` in one array level per dimension. The first dimension written is the outermost.
pub(crate) fn wrap_dims(ty: TypeRef, dims: Vec<Vec<Annotation>>) -> TypeRef {
    let span = ty.span;
    dims.into_iter().rev().fold(ty, |inner, annotations| {
        let mut array = inner.array_of(span);
        array.annotations = annotations;
        array
    })
}
