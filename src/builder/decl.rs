//! Classes, members and parameters.
//!
//! A class is built in three steps: its header is validated, its modifiers and supertypes are
//! applied, then its body is walked inside a fresh class frame. Nested classes finish before
//! their outer class does and collect in the frame, so the module's class list ends up with
//! every outer class ahead of its inner classes.

use pest::iterators::Pair;

use super::literals::string_literal_value;
use super::modifiers::{MemberKind, ModifierSet};
use super::switch_expr::nested_statements;
use super::{child_of, AstBuilder, BuildResult, ClassFrame};
use crate::ast::{
    Annotation, BinaryOp, ClassDecl, ClassKind, Closure, ClosureParams, Constant,
    ConstructorKind, Expr, ExprKind, FieldDecl, GenericsType, MethodDecl, Modifiers, Parameter,
    PrimitiveType, PropertyDecl, Stmt, TypeKind, TypeRef,
};
use crate::syntax::{Rule, Span};

/// A field or property before the class decides which one it becomes.
struct Member {
    name: String,
    ty: TypeRef,
    modifiers: Modifiers,
    annotations: Vec<Annotation>,
    initial_value: Option<Expr>,
    span: Span,
}

/// The pieces shared by class methods, constructors and script methods.
struct MethodParts {
    modifiers: ModifierSet,
    generics: Vec<GenericsType>,
    return_type: Option<TypeRef>,
    name: String,
    parameters: Vec<Parameter>,
    exceptions: Vec<TypeRef>,
    body: Option<Stmt>,
    default_value: Option<Expr>,
    span: Span,
}

impl ClassFrame {
    fn new(name: String, kind: ClassKind) -> Self {
        Self {
            name,
            kind,
            anonymous_count: 0,
            inner_classes: Vec::new(),
        }
    }
}

/// Interfaces and annotation types, whose members default to public abstract methods and
/// public static final fields.
fn is_interface(kind: ClassKind) -> bool {
    matches!(kind, ClassKind::Interface | ClassKind::Annotation)
}

// ============================================================================
// CLASSES
// ============================================================================

impl AstBuilder {
    pub(crate) fn class_declaration(&mut self, pair: Pair<'_, Rule>) -> BuildResult<()> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;

        let kind_pair = children
            .next()
            .ok_or_else(|| self.internal("class without a kind", span))?;
        let kind = match kind_pair.as_str() {
            "enum" => ClassKind::Enum,
            "interface" => ClassKind::Interface,
            "trait" => ClassKind::Trait,
            "record" => ClassKind::Record,
            "@interface" => ClassKind::Annotation,
            _ => ClassKind::Class,
        };
        let name_pair = children
            .next()
            .ok_or_else(|| self.internal("class without a name", span))?;
        let simple_name = name_pair.as_str().to_string();
        if simple_name == "var" {
            return Err(self.syntax_error(
                "var cannot be used for type declarations",
                self.span_of(&name_pair),
            ));
        }

        let mut generics = None;
        let mut header = None;
        let mut extends = None;
        let mut implements = None;
        let mut permits = None;
        let mut body = None;
        for child in children {
            let child_span = self.span_of(&child);
            match child.as_rule() {
                Rule::type_parameters => generics = Some((self.type_parameters(child)?, child_span)),
                Rule::formal_parameters => header = Some((child, child_span)),
                Rule::extends_clause => extends = Some((self.clause_types(&child)?, child_span)),
                Rule::implements_clause => implements = Some((self.clause_types(&child)?, child_span)),
                Rule::permits_clause => permits = Some((self.clause_types(&child)?, child_span)),
                Rule::class_body | Rule::enum_body => body = Some(child),
                _ => return Err(self.unexpected(&child)),
            }
        }

        // Header rules, checked in a fixed order so the first violation is the one reported.
        let type_params_span = generics.as_ref().map(|(_, s)| *s);
        let extends_span = extends.as_ref().map(|(_, s)| *s);
        let implements_span = implements.as_ref().map(|(_, s)| *s);
        match kind {
            ClassKind::Annotation => {
                if let Some(at) = type_params_span {
                    return Err(self.syntax_error("annotation declaration cannot have type parameters", at));
                }
                if let Some(at) = extends_span {
                    return Err(self.syntax_error("No extends clause allowed for annotation declaration", at));
                }
                if let Some(at) = implements_span {
                    return Err(self.syntax_error("No implements clause allowed for annotation declaration", at));
                }
            }
            ClassKind::Enum => {
                if let Some(at) = type_params_span {
                    return Err(self.syntax_error("enum declaration cannot have type parameters", at));
                }
                if let Some(at) = extends_span {
                    return Err(self.syntax_error("No extends clause allowed for enum declaration", at));
                }
            }
            ClassKind::Interface => {
                if let Some(at) = implements_span {
                    return Err(self.syntax_error("No implements clause allowed for interface declaration", at));
                }
            }
            _ => {}
        }

        let sealed = modifiers.find("sealed");
        let non_sealed = modifiers.find("non-sealed");
        if kind == ClassKind::Record {
            if header.is_none() {
                return Err(self.syntax_error("header declaration of record is expected", self.span_of(&name_pair)));
            }
            if let Some(at) = extends_span {
                return Err(self.syntax_error("No extends clause allowed for record declaration", at));
            }
            if let Some(at) = sealed {
                return Err(self.syntax_error("`sealed` is not allowed for record declaration", at));
            }
            if let Some(at) = non_sealed {
                return Err(self.syntax_error("`non-sealed` is not allowed for record declaration", at));
            }
        } else if let Some((_, at)) = &header {
            return Err(self.syntax_error("header declaration is only allowed for record declaration", *at));
        }

        if let (Some(_), Some(at)) = (sealed, non_sealed) {
            return Err(self.syntax_error("type cannot be defined with both `sealed` and `non-sealed`", at));
        }
        if let Some(at) = modifiers.find("final") {
            if sealed.is_some() || non_sealed.is_some() {
                let which = if sealed.is_some() { "`sealed`" } else { "`non-sealed`" };
                return Err(self.syntax_error(format!("type cannot be defined with both {which} and `final`"), at));
            }
        }
        if matches!(kind, ClassKind::Enum | ClassKind::Annotation) {
            if let Some(at) = sealed.or(non_sealed) {
                let keyword = if sealed.is_some() { "sealed" } else { "non-sealed" };
                let target = if kind == ClassKind::Enum { "enum" } else { "annotation definition" };
                return Err(self.syntax_error(format!("modifier `{keyword}` is not allowed for {target}"), at));
            }
        }
        if let (Some((_, at)), None) = (&permits, sealed) {
            return Err(self.syntax_error("only sealed type declarations should have `permits` clause", *at));
        }
        if let Some((types, at)) = &extends {
            if matches!(kind, ClassKind::Class | ClassKind::Trait) && types.len() > 1 {
                return Err(self.syntax_error("Cannot extend multiple classes", *at));
            }
        }

        // The node itself.
        let outer = self.class_stack.last().map(|frame| (frame.name.clone(), frame.kind));
        let name = match &outer {
            Some((outer_name, _)) => format!("{outer_name}${simple_name}"),
            None => format!("{}{simple_name}", self.package_name),
        };
        tracing::trace!(%name, kind = kind.keyword(), "class declaration");

        let mut class = ClassDecl::new(name.clone(), kind, span);
        let mut bits = modifiers.bits();
        if !bits.has_visibility() {
            bits.insert(Modifiers::PUBLIC);
        }
        if let Some((outer_name, outer_kind)) = outer {
            if outer_kind.is_interface_like() {
                bits.insert(Modifiers::STATIC);
            }
            class.outer_class = Some(outer_name);
        }
        match kind {
            ClassKind::Annotation => {
                bits.insert(Modifiers::INTERFACE | Modifiers::ABSTRACT | Modifiers::ANNOTATION);
                class.interfaces.push(TypeRef::named("java.lang.annotation.Annotation", span));
            }
            ClassKind::Interface => bits.insert(Modifiers::INTERFACE | Modifiers::ABSTRACT),
            ClassKind::Enum => bits.insert(Modifiers::ENUM | Modifiers::FINAL),
            _ => {}
        }
        class.modifiers = bits;
        class.generics = generics.map(|(g, _)| g).unwrap_or_default();

        class.annotations = modifiers.annotations();
        if let Some(at) = sealed {
            let mut marker = Annotation::marker("Sealed", at);
            if let Some((types, clause_span)) = &permits {
                marker.span = at.merge(*clause_span);
                let classes = types
                    .iter()
                    .map(|ty| Expr::new(ExprKind::Class(ty.clone()), ty.span))
                    .collect();
                marker.members.push((
                    "permittedSubclasses".into(),
                    Expr::new(ExprKind::List(classes), *clause_span),
                ));
            }
            class.annotations.push(marker);
        }
        if let Some(at) = non_sealed {
            class.annotations.push(Annotation::marker("NonSealed", at));
        }
        if kind == ClassKind::Trait {
            class.annotations.push(Annotation::marker("Trait", span));
        }
        if kind == ClassKind::Record && !class.has_annotation("RecordType") {
            class.annotations.push(Annotation::marker("RecordType", span));
        }
        class.permitted_subclasses = permits.map(|(types, _)| types).unwrap_or_default();

        if let Some((types, _)) = extends {
            if kind == ClassKind::Interface {
                class.interfaces.extend(types);
            } else {
                class.superclass = types.into_iter().next();
            }
        }
        if let Some((types, _)) = implements {
            class.interfaces.extend(types);
        }

        if let Some((header, _)) = header {
            let components = self.formal_parameters(header)?;
            for component in &components {
                let member = Member {
                    name: component.name.clone(),
                    ty: component.ty.clone(),
                    modifiers: component.modifiers.with(Modifiers::FINAL),
                    annotations: component.annotations.clone(),
                    initial_value: None,
                    span: component.span,
                };
                self.declare_property(&mut class, member, true)?;
            }
            class.record_components = components;
        }

        let body = body.ok_or_else(|| self.internal("class without a body", span))?;
        let frame = self.class_scope(ClassFrame::new(name, kind), span, |this| {
            this.class_members(&mut class, body.into_inner())
        })?;

        if kind == ClassKind::Record {
            let instance_field = class
                .fields
                .iter()
                .find(|f| !f.record_component && !f.modifiers.has(Modifiers::STATIC));
            if let Some(field) = instance_field {
                return Err(self.syntax_error("Instance field is not allowed in `record`", field.span));
            }
        }

        self.finish_class(class, frame);
        Ok(())
    }

    /// Builds an anonymous inner class from `anonymous_class_body` or an enum constant's
    /// `class_body`, returning its generated name.
    pub(crate) fn anonymous_class(&mut self, pair: Pair<'_, Rule>, ty: TypeRef) -> BuildResult<String> {
        let body = match pair.as_rule() {
            Rule::anonymous_class_body => self.expect_child(&pair, Rule::class_body)?,
            _ => pair,
        };
        let span = ty.span.merge(self.span_of(&body));
        let outer = self.enclosing_class_name();
        let name = self.next_anonymous_class_name();
        tracing::trace!(%name, superclass = %ty.text(), "anonymous inner class");

        let mut class = ClassDecl::new(name.clone(), ClassKind::AnonymousInner, span);
        class.modifiers = Modifiers::new(Modifiers::PUBLIC);
        class.superclass = Some(ty);
        class.outer_class = Some(outer);

        let frame = self.class_scope(
            ClassFrame::new(name.clone(), ClassKind::AnonymousInner),
            span,
            |this| this.class_members(&mut class, body.into_inner()),
        )?;
        self.finish_class(class, frame);
        Ok(name)
    }

    fn clause_types(&mut self, clause: &Pair<'_, Rule>) -> BuildResult<Vec<TypeRef>> {
        let list = self.expect_child(clause, Rule::type_list)?;
        self.type_list(list)
    }

    /// Runs `f` with the class pushed and the enclosing flow state cleared, since a body
    /// never sees the loops, switches or closures around it.
    fn class_scope(
        &mut self,
        frame: ClassFrame,
        span: Span,
        f: impl FnOnce(&mut Self) -> BuildResult<()>,
    ) -> BuildResult<ClassFrame> {
        let flow = std::mem::take(&mut self.flow);
        let depths = [
            std::mem::take(&mut self.loop_depth),
            std::mem::take(&mut self.switch_depth),
            std::mem::take(&mut self.closure_depth),
            std::mem::take(&mut self.assert_depth),
            std::mem::take(&mut self.array_init_depth),
        ];
        self.class_stack.push(frame);

        let result = f(self);

        let frame = self.class_stack.pop();
        let [loop_depth, switch_depth, closure_depth, assert_depth, array_init_depth] = depths;
        self.flow = flow;
        self.loop_depth = loop_depth;
        self.switch_depth = switch_depth;
        self.closure_depth = closure_depth;
        self.assert_depth = assert_depth;
        self.array_init_depth = array_init_depth;

        result?;
        frame.ok_or_else(|| self.internal("class stack underflow", span))
    }

    /// Hands a finished class and its nested classes to the enclosing class, or to the module.
    fn finish_class(&mut self, class: ClassDecl, frame: ClassFrame) {
        let mut finished = Vec::with_capacity(frame.inner_classes.len() + 1);
        finished.push(class);
        finished.extend(frame.inner_classes);
        match self.class_stack.last_mut() {
            Some(parent) => parent.inner_classes.extend(finished),
            None => self.classes.extend(finished),
        }
    }

    fn class_members<'i>(
        &mut self,
        class: &mut ClassDecl,
        members: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> BuildResult<()> {
        for member in members {
            if self.collector.is_full() {
                break;
            }
            let result = self.class_member(class, member);
            self.recover(result)?;
        }
        Ok(())
    }

    fn class_member(&mut self, class: &mut ClassDecl, pair: Pair<'_, Rule>) -> BuildResult<()> {
        match pair.as_rule() {
            Rule::static_initializer => {
                let block = self.expect_child(&pair, Rule::block)?;
                let block = self.block(block)?;
                class.static_initializers.push(block);
            }
            Rule::instance_initializer => {
                let block = self.first_child(&pair)?;
                let block = self.block(block)?;
                class.object_initializers.push(block);
            }
            Rule::class_declaration => self.class_declaration(pair)?,
            Rule::method_declaration => self.member_method(class, pair)?,
            Rule::compact_constructor => self.compact_constructor(class, pair)?,
            Rule::field_declaration => self.field_declaration(class, pair)?,
            Rule::enum_constants => {
                for constant in pair.into_inner() {
                    let result = self.enum_constant(class, constant);
                    self.recover(result)?;
                }
            }
            _ => return Err(self.unexpected(&pair)),
        }
        Ok(())
    }

    // ========================================================================
    // ENUM CONSTANTS
    // ========================================================================

    fn enum_constant(&mut self, class: &mut ClassDecl, pair: Pair<'_, Rule>) -> BuildResult<()> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        let mut name = String::new();
        let mut arguments = None;
        let mut body = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::identifier => name = child.as_str().to_string(),
                Rule::arguments => arguments = Some(self.arguments(child)?),
                Rule::class_body => body = Some(child),
                _ => return Err(self.unexpected(&child)),
            }
        }

        let enum_type = TypeRef::named(class.name.clone(), span);
        let anonymous = match body {
            Some(body) => {
                class.modifiers.remove(Modifiers::FINAL);
                let body_span = self.span_of(&body);
                let anonymous = self.anonymous_class(body, enum_type.clone())?;
                Some(Expr::new(ExprKind::Class(TypeRef::named(anonymous, body_span)), body_span))
            }
            None => None,
        };

        class.fields.push(FieldDecl {
            name,
            modifiers: Modifiers::new(
                Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL | Modifiers::ENUM,
            ),
            ty: enum_type,
            initial_value: enum_initializer(arguments, anonymous, span),
            annotations,
            enum_constant: true,
            record_component: false,
            synthetic: false,
            span,
        });
        Ok(())
    }

    // ========================================================================
    // FIELDS AND PROPERTIES
    // ========================================================================

    fn field_declaration(&mut self, class: &mut ClassDecl, pair: Pair<'_, Rule>) -> BuildResult<()> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;
        let ty = match children.next_if(|p| p.as_rule() == Rule::type_ref) {
            Some(ty) => Some(self.type_ref(ty, false)?),
            None => None,
        };
        let declarators = children
            .next()
            .ok_or_else(|| self.internal("field without declarators", span))?;

        let interface = is_interface(class.kind);
        let is_field = interface || modifiers.has_visibility();
        for declarator in declarators.into_inner() {
            let decl_span = Span::new(span.start, self.span_of(&declarator).end);
            let mut parts = declarator.into_inner();
            let name = parts
                .next()
                .ok_or_else(|| self.internal("declarator without a name", decl_span))?;
            let ty = match &ty {
                Some(ty) => ty.clone(),
                None => TypeRef::dynamic(self.span_of(&name)),
            };
            let mut initial_value = match parts.next() {
                Some(init) => Some(self.variable_initializer(init)?),
                None => None,
            };

            let mut bits = modifiers.bits();
            if interface {
                bits.insert(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
                if initial_value.is_none() {
                    initial_value = primitive_default(&ty, decl_span);
                }
            }
            let member = Member {
                name: name.as_str().to_string(),
                ty,
                modifiers: bits,
                annotations: modifiers.annotations(),
                initial_value,
                span: decl_span,
            };
            if is_field {
                self.declare_field(class, member)?;
            } else {
                self.declare_property(class, member, false)?;
            }
        }
        Ok(())
    }

    /// An explicit field. When a property of the same name came first, the field replaces the
    /// property's generated backing field.
    fn declare_field(&mut self, class: &mut ClassDecl, member: Member) -> BuildResult<()> {
        let property = class.properties.iter().position(|p| p.name == member.name);
        let backing = class
            .fields
            .iter_mut()
            .find(|f| f.name == member.name && f.synthetic);
        if let (Some(property), Some(field)) = (property, backing) {
            check_split(self, &member, field.initial_value.is_some(), &field.ty)?;
            field.modifiers = member.modifiers;
            field.annotations = member.annotations;
            field.synthetic = false;
            field.ty = member.ty;
            field.span = member.span;
            if member.initial_value.is_some() {
                field.initial_value = member.initial_value;
            }
            // An initializer kept from the property declaration widens the field.
            if let Some(value) = &field.initial_value {
                field.span = field.span.merge(value.span);
            }
            merge_accessors(&mut class.properties[property]);
            return Ok(());
        }

        class.fields.push(FieldDecl {
            name: member.name,
            modifiers: member.modifiers,
            ty: member.ty,
            initial_value: member.initial_value,
            annotations: member.annotations,
            enum_constant: false,
            record_component: false,
            synthetic: false,
            span: member.span,
        });
        Ok(())
    }

    /// A property with its private backing field. An explicit field declared earlier under
    /// the same name becomes the backing field instead.
    fn declare_property(
        &mut self,
        class: &mut ClassDecl,
        member: Member,
        record_component: bool,
    ) -> BuildResult<()> {
        let split = class.property(&member.name).is_none();
        if let Some(field) = class
            .fields
            .iter_mut()
            .find(|f| split && f.name == member.name)
        {
            check_split(self, &member, field.initial_value.is_some(), &field.ty)?;
            if field.initial_value.is_none() {
                if let Some(value) = member.initial_value {
                    field.span = field.span.merge(value.span);
                    field.initial_value = Some(value);
                }
            }
            let mut property = PropertyDecl {
                name: member.name,
                modifiers: member.modifiers.with(Modifiers::PUBLIC),
                ty: member.ty,
                annotations: member.annotations,
                getter: None,
                setter: None,
                span: member.span,
            };
            merge_accessors(&mut property);
            class.properties.push(property);
            return Ok(());
        }

        let field_modifiers = Modifiers::new((member.modifiers.bits() & !Modifiers::PUBLIC) | Modifiers::PRIVATE);
        class.properties.push(PropertyDecl {
            name: member.name.clone(),
            modifiers: member.modifiers.with(Modifiers::PUBLIC),
            ty: member.ty.clone(),
            annotations: member.annotations.clone(),
            getter: None,
            setter: None,
            span: member.span,
        });
        class.fields.push(FieldDecl {
            name: member.name,
            modifiers: field_modifiers,
            ty: member.ty,
            initial_value: member.initial_value,
            annotations: member.annotations,
            enum_constant: false,
            record_component,
            synthetic: !is_interface(class.kind),
            span: member.span,
        });
        Ok(())
    }

    // ========================================================================
    // METHODS
    // ========================================================================

    fn method_parts(&mut self, pair: Pair<'_, Rule>, in_annotation: bool) -> BuildResult<MethodParts> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;
        if modifiers.has("var") {
            return Err(self.syntax_error("var cannot be used for method declarations", span));
        }

        let mut parts = MethodParts {
            modifiers,
            generics: Vec::new(),
            return_type: None,
            name: String::new(),
            parameters: Vec::new(),
            exceptions: Vec::new(),
            body: None,
            default_value: None,
            span,
        };
        for child in children {
            match child.as_rule() {
                Rule::type_parameters => parts.generics = self.type_parameters(child)?,
                Rule::return_type => {
                    let ty = self.return_type(child)?;
                    if in_annotation && ty.is_void() {
                        return Err(self.syntax_error("annotation method cannot have void return type", ty.span));
                    }
                    parts.return_type = Some(ty);
                }
                Rule::method_name => {
                    let name = self.first_child(&child)?;
                    parts.name = match name.as_rule() {
                        Rule::string_literal => string_literal_value(name.as_str()),
                        _ => name.as_str().to_string(),
                    };
                }
                Rule::formal_parameters => parts.parameters = self.formal_parameters(child)?,
                Rule::kw_default | Rule::kw_throws => {}
                Rule::element_value => parts.default_value = Some(self.element_value(child)?),
                Rule::throws_list => {
                    parts.exceptions = child.into_inner().map(|name| self.class_type(&name)).collect();
                }
                Rule::method_body => {
                    let block = self.first_child(&child)?;
                    parts.body = Some(self.block(block)?);
                }
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(parts)
    }

    fn member_method(&mut self, class: &mut ClassDecl, pair: Pair<'_, Rule>) -> BuildResult<()> {
        let parts = self.method_parts(pair, class.kind == ClassKind::Annotation)?;
        let interface = is_interface(class.kind);

        if interface {
            if let Some(param) = parts.parameters.iter().find(|p| p.default_value.is_some()) {
                let value = param.default_value.as_ref().map(Expr::text).unwrap_or_default();
                return Err(self.syntax_error(
                    format!(
                        "Cannot specify default value for method parameter '{} = {value}' inside an interface",
                        param.name
                    ),
                    param.span,
                ));
            }
        }

        if parts.return_type.is_none() && parts.body.is_some() && parts.name == class.simple_name() {
            let constructor = self.constructor(parts)?;
            class.constructors.push(constructor);
            return Ok(());
        }

        if parts.return_type.is_none() && parts.body.is_some() && parts.modifiers.is_empty() {
            return Err(self.syntax_error(format!("Invalid method declaration: {}", parts.name), parts.span));
        }

        let mut modifiers = parts.modifiers.bits();
        if !modifiers.has_visibility() {
            modifiers.insert(Modifiers::PUBLIC);
        }
        let default_or_private = parts.modifiers.has("default") || parts.modifiers.has("private");
        if interface && !modifiers.has(Modifiers::STATIC) && !default_or_private {
            modifiers.insert(Modifiers::ABSTRACT);
        }

        let set = parts.modifiers;
        let method = MethodDecl {
            name: parts.name,
            modifiers,
            annotations: set.annotations(),
            generics: parts.generics,
            return_type: parts.return_type.unwrap_or_else(|| TypeRef::dynamic(parts.span)),
            parameters: parts.parameters,
            exceptions: parts.exceptions,
            body: parts.body,
            annotation_default: parts.default_value,
            is_constructor: false,
            script_method: false,
            span: parts.span,
        };

        self.check_member_modifiers(&set, MemberKind::Method)?;
        self.validate_method(class, &method, default_or_private)?;
        class.methods.push(method);
        Ok(())
    }

    fn validate_method(&self, class: &ClassDecl, method: &MethodDecl, default_or_private: bool) -> BuildResult<()> {
        let has_body = method.body.is_some();
        let name = &method.name;
        if class.kind == ClassKind::Trait && method.is_abstract() && has_body {
            return Err(self.syntax_error("Abstract method should not have method body", method.span));
        }
        if class.kind == ClassKind::Annotation && has_body {
            return Err(self.syntax_error("Annotation type element should not have body", method.span));
        }
        if !method.is_abstract() && !has_body {
            return Err(self.syntax_error(
                format!("You defined a method[{name}] without a body. Try adding a method body, or declare it abstract"),
                method.span,
            ));
        }

        let interface_or_abstract = class.kind == ClassKind::Interface
            || (class.kind != ClassKind::Annotation && class.modifiers.has(Modifiers::ABSTRACT));
        if interface_or_abstract && !default_or_private && method.is_abstract() && has_body {
            let hint = if class.kind == ClassKind::Interface {
                ", or declare it default or private"
            } else {
                ""
            };
            return Err(self.syntax_error(
                format!("You defined an abstract method[{name}] with a body. Try removing the method body{hint}"),
                method.span,
            ));
        }
        Ok(())
    }

    fn constructor(&mut self, parts: MethodParts) -> BuildResult<MethodDecl> {
        self.check_member_modifiers(&parts.modifiers, MemberKind::Constructor)?;

        let late_call = parts
            .body
            .as_ref()
            .and_then(Stmt::block_statements)
            .and_then(|statements| statements.iter().skip(1).find_map(explicit_constructor_call));
        if let Some(call) = late_call {
            return Err(self.syntax_error(
                format!("{} should be the first statement in the constructor[{}]", call.text(), parts.name),
                call.span,
            ));
        }

        let mut modifiers = parts.modifiers.bits();
        if !modifiers.has_visibility() {
            modifiers.insert(Modifiers::PUBLIC);
        }
        Ok(MethodDecl {
            name: parts.name,
            modifiers,
            annotations: parts.modifiers.annotations(),
            generics: parts.generics,
            return_type: TypeRef::new(TypeKind::Void, parts.span),
            parameters: parts.parameters,
            exceptions: parts.exceptions,
            body: parts.body,
            annotation_default: None,
            is_constructor: true,
            script_method: false,
            span: parts.span,
        })
    }

    fn compact_constructor(&mut self, class: &mut ClassDecl, pair: Pair<'_, Rule>) -> BuildResult<()> {
        let span = self.span_of(&pair);
        if class.kind != ClassKind::Record {
            return Err(self.syntax_error("Only record can have compact constructor", span));
        }
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;
        if modifiers.has("var") {
            return Err(self.syntax_error("var cannot be used for compact constructor declaration", span));
        }
        self.check_member_modifiers(&modifiers, MemberKind::Constructor)?;

        let name = children
            .next()
            .ok_or_else(|| self.internal("compact constructor without a name", span))?;
        if name.as_str() != class.simple_name() {
            return Err(self.syntax_error(
                format!("Compact constructor should have the same name as record: {}", class.simple_name()),
                self.span_of(&name),
            ));
        }
        let method_body = children
            .next()
            .ok_or_else(|| self.internal("compact constructor without a body", span))?;
        let block = self.first_child(&method_body)?;
        let body = self.block(block)?;

        if let Some(property) = reassigned_component(&body, &class.record_components) {
            let name = property.as_string().unwrap_or_default();
            return Err(self.syntax_error(
                format!("Cannot assign a value to final variable '{name}'"),
                property.span,
            ));
        }

        let pre = Expr::new(
            ExprKind::Closure(Box::new(Closure {
                params: ClosureParams::Explicit(Vec::new()),
                body,
            })),
            span,
        );
        match class.annotations.iter_mut().find(|a| a.simple_name() == "TupleConstructor") {
            Some(existing) => {
                existing.span = existing.span.merge(span);
                existing.members.push(("pre".into(), pre));
            }
            None => class.annotations.push(Annotation {
                name: "TupleConstructor".into(),
                members: vec![("pre".into(), pre)],
                span,
            }),
        }
        Ok(())
    }

    pub(crate) fn script_method(&mut self, pair: Pair<'_, Rule>) -> BuildResult<MethodDecl> {
        let parts = self.method_parts(pair, false)?;
        if parts.modifiers.is_empty() && parts.return_type.is_none() {
            return Err(self.syntax_error("Modifiers or return type is required", parts.span));
        }

        let is_abstract = parts.modifiers.has("abstract");
        let has_body = parts.body.is_some();
        if is_abstract || !has_body {
            let message = format!(
                "You cannot define {} method[{}] {}in the script. Try {}{}{}",
                if is_abstract { "an abstract" } else { "a" },
                parts.name,
                if has_body { "" } else { "without method body " },
                if is_abstract { "removing the 'abstract'" } else { "" },
                if is_abstract && !has_body { " and" } else { "" },
                if has_body { "" } else { " adding a method body" },
            );
            return Err(self.syntax_error(message, parts.span));
        }
        self.check_member_modifiers(&parts.modifiers, MemberKind::Method)?;

        let bits = parts.modifiers.bits();
        let visibility = if bits.has(Modifiers::PRIVATE) {
            Modifiers::PRIVATE
        } else {
            Modifiers::PUBLIC
        };
        Ok(MethodDecl {
            name: parts.name,
            modifiers: Modifiers::new((bits.bits() & !Modifiers::VISIBILITY) | visibility),
            annotations: parts.modifiers.annotations(),
            generics: parts.generics,
            return_type: parts.return_type.unwrap_or_else(|| TypeRef::dynamic(parts.span)),
            parameters: parts.parameters,
            exceptions: parts.exceptions,
            body: parts.body,
            annotation_default: None,
            is_constructor: false,
            script_method: true,
            span: parts.span,
        })
    }

    // ========================================================================
    // PARAMETERS
    // ========================================================================

    /// `( ... )` of a method, record header or lambda.
    pub(crate) fn formal_parameters(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<Parameter>> {
        match child_of(&pair, Rule::formal_parameter_list) {
            Some(list) => self.formal_parameter_list(list),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn formal_parameter_list(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<Parameter>> {
        let children: Vec<_> = pair.into_inner().collect();
        let count = children.len();
        let mut parameters = Vec::with_capacity(count);
        for (position, child) in children.into_iter().enumerate() {
            let parameter = match child.as_rule() {
                Rule::this_parameter => {
                    let span = self.span_of(&child);
                    let ty = self.expect_child(&child, Rule::type_ref)?;
                    Parameter::new("this", self.type_ref(ty, false)?, span)
                }
                Rule::formal_parameter => self.formal_parameter(child)?,
                _ => return Err(self.unexpected(&child)),
            };
            if parameter.variadic && position + 1 < count {
                return Err(self.syntax_error(
                    format!("The var-arg parameter {} must be the last parameter", parameter.name),
                    parameter.span,
                ));
            }
            parameters.push(parameter);
        }

        for (position, parameter) in parameters.iter().enumerate().rev() {
            if parameter.name == "_" {
                continue;
            }
            if parameters[..position].iter().any(|other| other.name == parameter.name) {
                return Err(self.syntax_error(
                    format!("Duplicated parameter '{}' found.", parameter.name),
                    parameter.span,
                ));
            }
        }
        Ok(parameters)
    }

    fn formal_parameter(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Parameter> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;
        let mut ty = None;
        let mut variadic = false;
        let mut name = String::new();
        let mut default_value = None;
        for child in children {
            match child.as_rule() {
                Rule::type_ref => ty = Some(self.type_ref(child, false)?),
                Rule::ellipsis => variadic = true,
                Rule::identifier => name = child.as_str().to_string(),
                Rule::expression => default_value = Some(self.expression(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }

        let mut ty = ty.unwrap_or_else(|| TypeRef::dynamic(span));
        if variadic {
            ty = ty.array_of(span);
        }
        Ok(Parameter {
            name,
            ty,
            default_value,
            modifiers: modifiers.bits(),
            annotations: modifiers.annotations(),
            variadic,
            span,
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn check_split(builder: &AstBuilder, member: &Member, field_initialized: bool, field_type: &TypeRef) -> BuildResult<()> {
    let name = &member.name;
    if field_initialized && member.initial_value.is_some() {
        return Err(builder.syntax_error(
            format!(
                "The split property definition named '{name}' must not have an initial value for both the field and the property"
            ),
            member.span,
        ));
    }
    if field_type.text() != member.ty.text() {
        return Err(builder.syntax_error(
            format!("The split property definition named '{name}' must not have different types for the field and the property"),
            member.span,
        ));
    }
    Ok(())
}

/// Accessors that read and write the separately declared field.
fn merge_accessors(property: &mut PropertyDecl) {
    let span = property.span;
    property.annotations.push(Annotation::marker("CompileStatic", span));
    property.getter = Some(Stmt::expression(Expr::variable(property.name.clone(), span)));
    property.setter = Some(Stmt::expression(Expr::binary(
        Expr::variable(property.name.clone(), span),
        BinaryOp::Assign,
        Expr::variable("value", span),
        span,
    )));
}

/// Implicit initial value of an uninitialized primitive interface field.
fn primitive_default(ty: &TypeRef, span: Span) -> Option<Expr> {
    let TypeKind::Primitive(primitive) = ty.kind else {
        return None;
    };
    let value = match primitive {
        PrimitiveType::Boolean => Constant::Bool(false),
        PrimitiveType::Long => Constant::Long(0),
        PrimitiveType::Float => Constant::Float(0.0),
        PrimitiveType::Double => Constant::Double(0.0),
        PrimitiveType::Byte | PrimitiveType::Char | PrimitiveType::Short | PrimitiveType::Int => {
            Constant::Int(0)
        }
    };
    Some(Expr::constant(value, span))
}

/// Init expression of an enum constant from its arguments and anonymous body.
fn enum_initializer(arguments: Option<Expr>, anonymous: Option<Expr>, span: Span) -> Option<Expr> {
    if arguments.is_none() && anonymous.is_none() {
        return None;
    }
    let list = |items: Vec<Expr>| Expr::new(ExprKind::List(items), span);
    let mut items = match arguments.map(|args| args.kind) {
        Some(ExprKind::Arguments(items) | ExprKind::Tuple(items)) => items,
        Some(kind) => vec![Expr::new(kind, span)],
        None => Vec::new(),
    };

    if items.len() == 1 {
        let item = items.remove(0);
        if let ExprKind::NamedArguments(entries) = item.kind {
            let map = Expr::new(ExprKind::Map(entries), item.span);
            return Some(match anonymous {
                Some(class) => list(vec![map, class]),
                None => map,
            });
        }
        return Some(match anonymous {
            Some(class) => list(vec![item, class]),
            None if matches!(item.kind, ExprKind::List(_)) => list(vec![item]),
            None => item,
        });
    }
    items.extend(anonymous);
    Some(list(items))
}

fn explicit_constructor_call(stmt: &Stmt) -> Option<&Expr> {
    let expr = stmt.as_expression()?;
    match &expr.kind {
        ExprKind::ConstructorCall(call) if call.kind != ConstructorKind::New => Some(expr),
        _ => None,
    }
}

/// The property of the first `this.p = ...` that targets a record component.
fn reassigned_component<'a>(stmt: &'a Stmt, components: &[Parameter]) -> Option<&'a Expr> {
    if let Some(ExprKind::Binary { left, op, .. }) = stmt.as_expression().map(|e| &e.kind) {
        if op.is_assignment() {
            if let ExprKind::Property(access) = &left.kind {
                let targets_component = access
                    .name()
                    .map_or(false, |name| components.iter().any(|c| c.name == name));
                if access.object.is_this() && targets_component {
                    return Some(&access.property);
                }
            }
        }
    }
    nested_statements(stmt)
        .into_iter()
        .find_map(|nested| reassigned_component(nested, components))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{ClassKind, Constant, ExprKind, Modifiers, Module};
    use crate::parse;

    fn module(text: &str) -> Module {
        parse(text, "Decl.groovy").unwrap()
    }

    fn error(text: &str) -> String {
        let failure = parse(text, "Decl.groovy").unwrap_err();
        failure.messages()[0].to_string()
    }

    #[test]
    fn outer_classes_precede_their_inner_classes() {
        let module = module(
            "class Outer {\n  class Inner {\n    class Deep {}\n  }\n  static class Other {}\n}\nclass Second {}",
        );
        let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Outer$Inner", "Outer$Inner$Deep", "Outer$Other", "Second"]);
        assert_eq!(module.classes[1].outer_class.as_deref(), Some("Outer"));
        assert_eq!(module.classes[2].outer_class.as_deref(), Some("Outer$Inner"));

        let module = self::module("package a.b\nclass C {}");
        assert_eq!(module.classes[0].name, "a.b.C");
    }

    #[test]
    fn class_modifiers_and_supertypes() {
        let module = module("class C extends Base implements A, B {}\ninterface I extends A, B {\n  class N {}\n}");
        let class = &module.classes[0];
        assert!(class.modifiers.has(Modifiers::PUBLIC));
        assert_eq!(class.superclass.as_ref().map(|t| t.name()), Some("Base".into()));
        assert_eq!(class.interfaces.len(), 2);

        let interface = module.class("I").unwrap();
        assert!(interface.modifiers.has(Modifiers::INTERFACE | Modifiers::ABSTRACT));
        assert!(interface.superclass.is_none());
        assert_eq!(interface.interfaces.len(), 2);
        assert!(module.class("I$N").unwrap().modifiers.has(Modifiers::STATIC));
    }

    #[test]
    fn header_rules_report_the_first_violation() {
        let cases = [
            ("class var {}", "var cannot be used for type declarations"),
            ("@interface A<T> {}", "annotation declaration cannot have type parameters"),
            ("@interface A extends B {}", "No extends clause allowed for annotation declaration"),
            ("enum E<T> { X }", "enum declaration cannot have type parameters"),
            ("enum E extends B { X }", "No extends clause allowed for enum declaration"),
            ("interface I implements J {}", "No implements clause allowed for interface declaration"),
            ("record R {}", "header declaration of record is expected"),
            ("record R(int a) extends B {}", "No extends clause allowed for record declaration"),
            ("sealed record R(int a) {}", "`sealed` is not allowed for record declaration"),
            ("class C(int a) {}", "header declaration is only allowed for record declaration"),
            ("sealed non-sealed class C {}", "type cannot be defined with both `sealed` and `non-sealed`"),
            ("final sealed class C {}", "type cannot be defined with both `sealed` and `final`"),
            ("sealed enum E { X }", "modifier `sealed` is not allowed for enum"),
            ("non-sealed @interface A {}", "modifier `non-sealed` is not allowed for annotation definition"),
            ("class C permits D {}", "only sealed type declarations should have `permits` clause"),
            ("class C extends A, B {}", "Cannot extend multiple classes"),
        ];
        for (text, message) in cases {
            assert_eq!(error(text), message, "for {text}");
        }
    }

    #[test]
    fn sealed_hierarchies_are_marked() {
        let module = module("sealed class S permits A, B {}\nfinal class A extends S {}\nnon-sealed class B extends S {}");
        let sealed = &module.classes[0];
        assert!(sealed.has_annotation("Sealed"));
        let permitted: Vec<String> = sealed.permitted_subclasses.iter().map(|t| t.text()).collect();
        assert_eq!(permitted, vec!["A", "B"]);
        assert!(module.classes[2].has_annotation("NonSealed"));
    }

    #[test]
    fn interface_methods_are_abstract_unless_default_static_or_private() {
        let module = module(
            "interface I {\n  void run()\n  default void go() { run() }\n  static void s() {}\n  private void p() {}\n}",
        );
        let interface = &module.classes[0];
        assert!(interface.method("run").unwrap().is_abstract());
        assert!(!interface.method("go").unwrap().is_abstract());
        assert!(!interface.method("s").unwrap().is_abstract());
        assert!(!interface.method("p").unwrap().is_abstract());
    }

    #[test]
    fn traits_and_annotation_types() {
        let module = module("trait T {\n  def hello() { 'hi' }\n}");
        let class = &module.classes[0];
        assert_eq!(class.kind, ClassKind::Trait);
        assert!(class.has_annotation("Trait"));
        assert!(class.method("hello").unwrap().body.is_some());

        let module = self::module("@interface Info {\n  String value() default 'x'\n  int count()\n}");
        let info = &module.classes[0];
        assert!(info.modifiers.has(Modifiers::ANNOTATION));
        assert_eq!(info.interfaces[0].name(), "java.lang.annotation.Annotation");
        let value = info.method("value").unwrap();
        assert!(value.body.is_none());
        assert_eq!(value.annotation_default.as_ref().map(|e| e.text()), Some("x".into()));

        assert_eq!(error("@interface A {\n  void v()\n}"), "annotation method cannot have void return type");
    }

    #[test]
    fn enum_constants_become_static_fields() {
        let module = module(
            "enum Color {\n  RED, GREEN(1), BLUE(a: 1),\n  CUSTOM {\n    String toString() { 'c' }\n  }\n}",
        );
        let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Color", "Color$1"]);

        let color = &module.classes[0];
        assert!(color.modifiers.has(Modifiers::ENUM));
        assert!(!color.modifiers.has(Modifiers::FINAL));
        let constants: Vec<&str> = color.enum_constants().map(|f| f.name.as_str()).collect();
        assert_eq!(constants, vec!["RED", "GREEN", "BLUE", "CUSTOM"]);

        let red = color.field("RED").unwrap();
        assert!(red.initial_value.is_none());
        assert!(red.modifiers.has(Modifiers::STATIC | Modifiers::ENUM));
        assert_eq!(red.ty.name(), "Color");
        assert_eq!(color.field("GREEN").unwrap().initial_value.as_ref().map(|e| e.text()), Some("1".into()));
        let blue = color.field("BLUE").unwrap().initial_value.as_ref().unwrap();
        assert!(matches!(&blue.kind, ExprKind::Map(entries) if entries.len() == 1));
        let custom = color.field("CUSTOM").unwrap().initial_value.as_ref().unwrap();
        assert_eq!(custom.text(), "[Color$1]");

        let body = &module.classes[1];
        assert_eq!(body.kind, ClassKind::AnonymousInner);
        assert_eq!(body.superclass.as_ref().map(|t| t.name()), Some("Color".into()));
        assert!(body.method("toString").is_some());
    }

    #[test]
    fn fields_and_properties() {
        let module = module("class P {\n  String name\n  private int age = 3\n  def x\n}");
        let class = &module.classes[0];
        let properties: Vec<&str> = class.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(properties, vec!["name", "x"]);
        assert!(class.property("name").unwrap().modifiers.has(Modifiers::PUBLIC));

        let backing = class.field("name").unwrap();
        assert!(backing.synthetic);
        assert_eq!(backing.modifiers.bits(), Modifiers::PRIVATE);
        let age = class.field("age").unwrap();
        assert!(!age.synthetic);
        assert_eq!(age.initial_value.as_ref().map(|e| e.text()), Some("3".into()));

        let module = self::module("interface K {\n  int LIMIT\n  String NAME = 'n'\n}");
        let limit = module.classes[0].field("LIMIT").unwrap();
        assert_eq!(
            limit.modifiers.bits(),
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL
        );
        assert!(matches!(
            limit.initial_value.as_ref().map(|e| &e.kind),
            Some(ExprKind::Constant(Constant::Int(0)))
        ));
        assert!(module.classes[0].properties.is_empty());
    }

    #[test]
    fn split_properties_merge_with_their_field() {
        for text in [
            "class S {\n  private String name\n  String name\n}",
            "class S {\n  String name\n  private String name\n}",
        ] {
            let module = module(text);
            let class = &module.classes[0];
            assert_eq!(class.fields.len(), 1, "for {text}");
            let field = &class.fields[0];
            assert!(!field.synthetic);
            assert!(field.modifiers.has(Modifiers::PRIVATE));
            let property = class.property("name").unwrap();
            assert!(property.annotations.iter().any(|a| a.name == "CompileStatic"));
            assert_eq!(property.getter.as_ref().map(|s| s.text()), Some("name".into()));
            assert_eq!(property.setter.as_ref().map(|s| s.text()), Some("(name = value)".into()));
        }

        assert_eq!(
            error("class S {\n  private String name = 'a'\n  String name = 'b'\n}"),
            "The split property definition named 'name' must not have an initial value for both the field and the property"
        );
        assert_eq!(
            error("class S {\n  private String name\n  Integer name\n}"),
            "The split property definition named 'name' must not have different types for the field and the property"
        );
    }

    #[test]
    fn records_derive_properties_from_their_header() {
        let module = module("record Point(int x, int y) {\n  static int ORIGIN = 0\n}");
        let record = &module.classes[0];
        assert_eq!(record.kind, ClassKind::Record);
        assert!(record.has_annotation("RecordType"));
        assert_eq!(record.record_components.len(), 2);
        let properties: Vec<&str> = record.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(properties, vec!["x", "y", "ORIGIN"]);
        let x = record.field("x").unwrap();
        assert!(x.record_component);
        assert_eq!(x.modifiers.bits(), Modifiers::PRIVATE | Modifiers::FINAL);

        assert_eq!(
            error("record R(int a) {\n  String extra\n}"),
            "Instance field is not allowed in `record`"
        );
    }

    #[test]
    fn compact_constructors_become_a_pre_hook() {
        let module = module("record R(int a) {\n  R {\n    if (a < 0) throw new IllegalArgumentException()\n  }\n}");
        let record = &module.classes[0];
        assert!(record.constructors.is_empty());
        let tuple = record
            .annotations
            .iter()
            .find(|a| a.name == "TupleConstructor")
            .unwrap();
        assert!(matches!(tuple.member("pre").map(|e| &e.kind), Some(ExprKind::Closure(_))));

        assert_eq!(
            error("record R(int a) {\n  Q {\n  }\n}"),
            "Compact constructor should have the same name as record: R"
        );
        assert_eq!(error("class C {\n  C {\n  }\n}"), "Only record can have compact constructor");
        assert_eq!(
            error("record R(int a) {\n  R {\n    this.a = 1\n  }\n}"),
            "Cannot assign a value to final variable 'a'"
        );
    }

    #[test]
    fn constructors_and_method_rules() {
        let module = module("class C {\n  C(int a) { this.a = a }\n  def m() { 1 }\n}");
        let class = &module.classes[0];
        assert_eq!(class.constructors.len(), 1);
        assert!(class.constructors[0].is_constructor);
        assert_eq!(class.methods.len(), 1);

        let cases = [
            (
                "class C {\n  C() {\n    foo()\n    this(1)\n  }\n}",
                "this(1) should be the first statement in the constructor[C]",
            ),
            ("class C {\n  m() { }\n}", "Invalid method declaration: m"),
            (
                "class C {\n  void m()\n}",
                "You defined a method[m] without a body. Try adding a method body, or declare it abstract",
            ),
            (
                "abstract class C {\n  abstract void m() { }\n}",
                "You defined an abstract method[m] with a body. Try removing the method body",
            ),
            (
                "interface I {\n  void m() { }\n}",
                "You defined an abstract method[m] with a body. Try removing the method body, or declare it default or private",
            ),
            ("trait T {\n  abstract void m() { }\n}", "Abstract method should not have method body"),
            ("@interface A {\n  int m() { 1 }\n}", "Annotation type element should not have body"),
            (
                "interface I {\n  void m(int a = 1)\n}",
                "Cannot specify default value for method parameter 'a = 1' inside an interface",
            ),
            ("class C {\n  var m() {}\n}", "var cannot be used for method declarations"),
        ];
        for (text, message) in cases {
            assert_eq!(error(text), message, "for {text}");
        }
    }

    #[test]
    fn script_methods() {
        let module = module("def greet(String name) { name }\nprivate static int f() { 1 }");
        let greet = module.method("greet").unwrap();
        assert!(greet.script_method);
        assert_eq!(greet.modifiers.bits(), Modifiers::PUBLIC);
        assert_eq!(greet.parameters[0].ty.text(), "String");
        let f = module.method("f").unwrap();
        assert_eq!(f.modifiers.bits(), Modifiers::PRIVATE | Modifiers::STATIC);

        assert_eq!(
            error("abstract void f()"),
            "You cannot define an abstract method[f] without method body in the script. Try removing the 'abstract' and adding a method body"
        );
        assert_eq!(error("<T> f() { }"), "Modifiers or return type is required");
    }

    #[test]
    fn parameter_rules() {
        let module = module("def f(String... rest) {}\ndef g(_, _) {}\nclass C {\n  void m(C this, int a) { }\n}");
        let rest = &module.method("f").unwrap().parameters[0];
        assert!(rest.variadic);
        assert_eq!(rest.ty.text(), "String[]");
        assert_eq!(module.classes[0].method("m").unwrap().parameters[0].name, "this");

        assert_eq!(
            error("def f(String... args, int b) { }"),
            "The var-arg parameter args must be the last parameter"
        );
        assert_eq!(error("def f(a, a) { }"), "Duplicated parameter 'a' found.");
    }
}
