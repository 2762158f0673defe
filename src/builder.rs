//! Groovy AST Builder
//!
//! Walks the pest CST of one compilation unit and produces a [`Module`]. The builder owns every
//! piece of per-unit state: nesting counters, the flow-context stack, the class stack, synthetic
//! name counters and the diagnostic collector. One instance builds exactly one unit.
//!
//! Builder functions live in submodules by concern and all extend [`AstBuilder`]:
//! - `modifiers`: modifier and annotation accumulation
//! - `literals`: numbers, strings and GStrings
//! - `types`: type references and generics
//! - `expr`: operators, paths, calls, closures and creators
//! - `stmt`: statements and blocks
//! - `switch_expr`: the switch-expression rewrite
//! - `try_resources`: the try-with-resources rewrite
//! - `decl`: classes, members and parameters

use pest::iterators::Pair;

use crate::ast::{
    ClassDecl, ClassKind, Expr, ImportDecl, ImportKind, Module, PackageDecl, Stmt,
    StmtKind,
};
use crate::config::BuilderConfig;
use crate::errors::{
    BuildError, CompilationFailed, DiagnosticCollector, ErrorReporting, SourceContext,
};
use crate::syntax::{parse_cst, LineIndex, Rule, Span};

mod decl;
mod expr;
mod literals;
mod modifiers;
mod stmt;
mod switch_expr;
mod try_resources;
mod types;

pub(crate) type BuildResult<T> = Result<T, BuildError>;

// ============================================================================
// BUILDER STATE
// ============================================================================

/// The construct a `return`, `break` or `continue` would leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowContext {
    Loop,
    SwitchStatement,
    SwitchExpression,
    Closure,
    Lambda,
}

#[derive(Debug)]
struct ClassFrame {
    name: String,
    kind: ClassKind,
    anonymous_count: usize,
    /// Finished nested classes, each followed by its own nested classes.
    inner_classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone, Copy)]
enum Synthetic {
    SwitchValue,
    Resource,
    PrimaryException,
    Throwable,
    SuppressedException,
}

impl Synthetic {
    fn prefix(self) -> &'static str {
        match self {
            Self::SwitchValue => "__$$sev",
            Self::Resource => "__$$resource",
            Self::PrimaryException => "__$$primaryExc",
            Self::Throwable => "__$$t",
            Self::SuppressedException => "__$$suppressedExc",
        }
    }
}

/// Builds one compilation unit.
///
/// # Examples
///
/// ```rust
/// use groovy_ast::{AstBuilder, BuilderConfig, SourceContext};
///
/// let source = SourceContext::from_file("Hello.groovy", "println 'hi'");
/// let module = AstBuilder::new(source, BuilderConfig::default()).build().unwrap();
/// assert_eq!(module.script_class_name, "Hello");
/// assert_eq!(module.statements[0].text(), "this.println(hi)");
/// ```
pub struct AstBuilder {
    source: SourceContext,
    config: BuilderConfig,
    index: LineIndex,
    collector: DiagnosticCollector,
    /// Package prefix with its trailing `.`, or empty.
    package_name: String,
    script_class_name: String,
    classes: Vec<ClassDecl>,
    class_stack: Vec<ClassFrame>,
    script_anonymous_count: usize,
    flow: Vec<FlowContext>,
    loop_depth: usize,
    switch_depth: usize,
    closure_depth: usize,
    assert_depth: usize,
    array_init_depth: usize,
    synthetic_counters: [usize; 5],
    pending_number_error: Option<BuildError>,
}

// ============================================================================
// PUBLIC API
// ============================================================================

impl AstBuilder {
    pub fn new(source: SourceContext, config: BuilderConfig) -> Self {
        let index = LineIndex::new(&source.content);
        let collector = DiagnosticCollector::new(config.max_errors);
        let script_class_name = config
            .script_base_name
            .clone()
            .unwrap_or_else(|| source.stem().to_string());
        Self {
            source,
            config,
            index,
            collector,
            package_name: String::new(),
            script_class_name,
            classes: Vec::new(),
            class_stack: Vec::new(),
            script_anonymous_count: 0,
            flow: Vec::new(),
            loop_depth: 0,
            switch_depth: 0,
            closure_depth: 0,
            assert_depth: 0,
            array_init_depth: 0,
            synthetic_counters: [0; 5],
            pending_number_error: None,
        }
    }

    /// Runs the CST parse and the full AST walk.
    ///
    /// User errors are collected and reported together; a CST failure or an internal error
    /// ends the build at once.
    #[tracing::instrument(skip(self), fields(source = %self.source.name))]
    pub fn build(mut self) -> Result<Module, CompilationFailed> {
        tracing::debug!(bytes = self.source.content.len(), "building compilation unit");

        let source = self.source.clone();
        let unit = parse_cst(&source).map_err(CompilationFailed::single)?;

        match self.compilation_unit(unit) {
            Ok(module) if self.collector.is_empty() => {
                tracing::debug!(
                    statements = module.statements.len(),
                    classes = module.classes.len(),
                    methods = module.methods.len(),
                    "built compilation unit"
                );
                Ok(module)
            }
            Ok(_) => Err(self.finish_failed()),
            Err(error) => {
                self.collector.add(error);
                Err(self.finish_failed())
            }
        }
    }
}

// ============================================================================
// COMPILATION UNIT
// ============================================================================

impl AstBuilder {
    fn finish_failed(self) -> CompilationFailed {
        tracing::debug!(errors = self.collector.len(), "compilation unit failed");
        self.collector.into_failure(None)
    }

    fn compilation_unit(&mut self, unit: Pair<'_, Rule>) -> BuildResult<Module> {
        let span = self.span_of(&unit);
        let mut package = None;
        let mut imports = Vec::new();
        let mut statements = Vec::new();
        let mut methods = Vec::new();

        for pair in unit.into_inner() {
            if self.collector.is_full() {
                break;
            }
            match pair.as_rule() {
                Rule::EOI => {}
                Rule::package_declaration => {
                    let result = self.package_declaration(pair);
                    if let Some(declared) = self.recover(result)? {
                        self.package_name = declared.name.clone();
                        self.script_class_name =
                            format!("{}{}", self.package_name, self.script_class_name);
                        package = Some(declared);
                    }
                }
                Rule::import_declaration => {
                    let result = self.import_declaration(pair);
                    if let Some(import) = self.recover(result)? {
                        imports.push(import);
                    }
                }
                Rule::class_declaration => {
                    let result = self.class_declaration(pair);
                    self.recover(result)?;
                }
                Rule::method_declaration => {
                    let result = self.script_method(pair);
                    if let Some(method) = self.recover(result)? {
                        methods.push(method);
                    }
                }
                _ => {
                    let result = self.block_statement(pair);
                    if let Some(stmt) = self.recover(result)? {
                        push_flattened(&mut statements, stmt);
                    }
                }
            }
        }

        if let Some(error) = self.pending_number_error.take() {
            self.collector.add(error);
        }

        if self.source.stem() == self.config.package_info_name {
            let name = format!("{}package-info", self.package_name);
            if !self.classes.iter().any(|c| c.name == name) {
                let class_span = package.as_ref().map_or(span, |p: &PackageDecl| p.span);
                let mut class = ClassDecl::new(name, ClassKind::Class, class_span);
                class.synthetic = true;
                self.classes.push(class);
            }
        } else if statements.is_empty() && methods.is_empty() && self.classes.is_empty() {
            statements.push(Stmt::ret(Expr::null(span), span));
        }

        Ok(Module {
            package,
            imports,
            statements,
            methods,
            classes: std::mem::take(&mut self.classes),
            script_class_name: self.script_class_name.clone(),
            span,
        })
    }

    fn package_declaration(&mut self, pair: Pair<'_, Rule>) -> BuildResult<PackageDecl> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        let mut name = String::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::qualified_name => name = qualified_name(&child),
                _ => {}
            }
        }
        Ok(PackageDecl {
            name: format!("{name}."),
            annotations,
            span,
        })
    }

    fn import_declaration(&mut self, pair: Pair<'_, Rule>) -> BuildResult<ImportDecl> {
        let span = self.span_of(&pair);
        let mut annotations = Vec::new();
        let mut is_static = false;
        let mut is_star = false;
        let mut name = String::new();
        let mut alias = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::annotation => annotations.push(self.annotation(child)?),
                Rule::import_static => is_static = true,
                Rule::qualified_name => name = qualified_name(&child),
                Rule::import_star => is_star = true,
                Rule::import_alias => {
                    let ident = self.expect_child(&child, Rule::identifier)?;
                    alias = Some(ident.as_str().to_string());
                }
                _ => {}
            }
        }

        let (kind, target, member) = match (is_static, is_star) {
            (true, true) => (ImportKind::StaticStar, name, None),
            (true, false) => match name.rsplit_once('.') {
                Some((class, member)) => (ImportKind::Static, class.to_string(), Some(member.to_string())),
                None => return Err(self.syntax_error(format!("Invalid static import: {name}"), span)),
            },
            (false, true) => (ImportKind::Star, format!("{name}."), None),
            (false, false) => (ImportKind::Regular, name, None),
        };

        Ok(ImportDecl {
            kind,
            target,
            member,
            alias,
            annotations,
            span,
        })
    }

    /// A statement in any block, including the top level of a script.
    fn block_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        match pair.as_rule() {
            Rule::import_declaration => Err(self.syntax_error("Import statement not expected here", span)),
            Rule::method_declaration => Err(self.syntax_error("Method definition not expected here", span)),
            Rule::class_declaration => Err(self.syntax_error("Class definition not expected here", span)),
            Rule::local_variable_declaration => self.local_variable_declaration(pair),
            _ => self.statement(pair),
        }
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

impl AstBuilder {
    pub(crate) fn span_of(&self, pair: &Pair<'_, Rule>) -> Span {
        let span = pair.as_span();
        self.index.span(span.start(), span.end())
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>, span: Span) -> BuildError {
        self.source.syntax_error(message, span)
    }

    pub(crate) fn internal(&self, message: impl Into<String>, span: Span) -> BuildError {
        self.source.internal_error(message, span)
    }

    /// Internal error for a CST shape the builder does not handle.
    pub(crate) fn unexpected(&self, pair: &Pair<'_, Rule>) -> BuildError {
        self.internal(
            format!("unexpected {:?} node: '{}'", pair.as_rule(), pair.as_str()),
            self.span_of(pair),
        )
    }

    pub(crate) fn first_child<'i>(&self, pair: &Pair<'i, Rule>) -> BuildResult<Pair<'i, Rule>> {
        pair.clone().into_inner().next().ok_or_else(|| {
            self.internal(format!("empty {:?} node", pair.as_rule()), self.span_of(pair))
        })
    }

    pub(crate) fn expect_child<'i>(
        &self,
        pair: &Pair<'i, Rule>,
        rule: Rule,
    ) -> BuildResult<Pair<'i, Rule>> {
        child_of(pair, rule).ok_or_else(|| {
            self.internal(
                format!("missing {rule:?} in {:?}", pair.as_rule()),
                self.span_of(pair),
            )
        })
    }

    /// Records a user error and lets the caller skip the failed construct.
    /// Internal errors keep propagating.
    pub(crate) fn recover<T>(&mut self, result: BuildResult<T>) -> BuildResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind.is_user_error() => {
                self.collector.add(error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Runs `f` inside a flow context, restoring every counter afterwards.
    pub(crate) fn within<T>(
        &mut self,
        context: FlowContext,
        f: impl FnOnce(&mut Self) -> BuildResult<T>,
    ) -> BuildResult<T> {
        self.flow.push(context);
        self.bump(context, true);
        let result = f(self);
        self.bump(context, false);
        self.flow.pop();
        result
    }

    fn bump(&mut self, context: FlowContext, enter: bool) {
        let counter = match context {
            FlowContext::Loop => &mut self.loop_depth,
            FlowContext::SwitchStatement => &mut self.switch_depth,
            FlowContext::Closure => &mut self.closure_depth,
            FlowContext::SwitchExpression | FlowContext::Lambda => return,
        };
        if enter {
            *counter += 1;
        } else {
            *counter = counter.saturating_sub(1);
        }
    }

    pub(crate) fn innermost_flow(&self) -> Option<FlowContext> {
        self.flow.last().copied()
    }

    fn fresh_name(&mut self, kind: Synthetic) -> String {
        let counter = &mut self.synthetic_counters[kind as usize];
        let name = format!("{}{}", kind.prefix(), counter);
        *counter += 1;
        name
    }

    /// Name of the class new anonymous classes nest in.
    fn enclosing_class_name(&self) -> String {
        self.class_stack
            .last()
            .map(|frame| frame.name.clone())
            .unwrap_or_else(|| self.script_class_name.clone())
    }

    fn next_anonymous_class_name(&mut self) -> String {
        let outer = self.enclosing_class_name();
        let count = match self.class_stack.last_mut() {
            Some(frame) => {
                frame.anonymous_count += 1;
                frame.anonymous_count
            }
            None => {
                self.script_anonymous_count += 1;
                self.script_anonymous_count
            }
        };
        format!("{outer}${count}")
    }
}

/// Appends `stmt`, splitting a declaration list into one statement per declaration.
fn push_flattened(statements: &mut Vec<Stmt>, stmt: Stmt) {
    match stmt.kind {
        StmtKind::DeclarationList(decls) => {
            let mut labels = Some(stmt.labels);
            for decl in decls {
                let mut flat = Stmt::expression(decl);
                if let Some(labels) = labels.take() {
                    flat.labels = labels;
                }
                statements.push(flat);
            }
        }
        _ => statements.push(stmt),
    }
}

pub(crate) fn child_of<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> Option<Pair<'i, Rule>> {
    pair.clone().into_inner().find(|p| p.as_rule() == rule)
}

pub(crate) fn has_child(pair: &Pair<'_, Rule>, rule: Rule) -> bool {
    child_of(pair, rule).is_some()
}

/// Dotted name without interior whitespace.
pub(crate) fn qualified_name(pair: &Pair<'_, Rule>) -> String {
    pair.clone()
        .into_inner()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(".")
}
