//! AST definitions and traversal for Tern.
//!
//! This crate defines the abstract syntax tree consumed by the type
//! checker. Every node carries an [`ExprId`]; a parser (or test factory)
//! is responsible for keeping ids unique within one AST. The checked form
//! of an AST carries per-id reference and flattened-type maps.

use std::collections::BTreeMap;

/// Unique identity of an expression node within one AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub i64);

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Duration { seconds: i64, nanos: i32 },
    Timestamp { seconds: i64, nanos: i32 },
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Const(Constant),
    Ident(IdentExpr),
    Select(Box<SelectExpr>),
    Call(CallExpr),
    List(ListExpr),
    Map(MapExpr),
    Struct(StructExpr),
    Comprehension(Box<ComprehensionExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentExpr {
    pub name: String,
}

/// Field access: `operand.field`, or the presence test `has(operand.field)`
/// when `test_only` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub operand: Expr,
    pub field: String,
    pub test_only: bool,
}

/// A function call. A present `target` makes this a receiver-style call;
/// the target may turn out to be a namespace qualifier rather than a value.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub target: Option<Box<Expr>>,
    pub function: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    pub elements: Vec<ListElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListElement {
    pub expr: Expr,
    /// Optional-entry syntax `?expr`: the element is present only when the
    /// optional holds a value.
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapExpr {
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    /// Identity of the entry itself, used for issue locations.
    pub id: ExprId,
    pub key: Expr,
    pub value: Expr,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructExpr {
    pub name: String,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub id: ExprId,
    pub name: String,
    pub value: Expr,
    pub optional: bool,
}

/// A bounded fold with explicit accumulator and iteration variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ComprehensionExpr {
    pub iter_range: Expr,
    pub iter_var: String,
    pub accu_init: Expr,
    pub accu_var: String,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

// ---------------------------------------------------------------------------
// Source info
// ---------------------------------------------------------------------------

/// Byte-offset positions for expression ids plus line-start offsets.
///
/// `line_offsets[i]` is the byte offset at which line `i + 1` starts; a
/// non-empty source therefore has `line_offsets[0] == 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceInfo {
    positions: BTreeMap<ExprId, u32>,
    line_offsets: Vec<u32>,
}

impl SourceInfo {
    pub fn new(line_offsets: Vec<u32>) -> Self {
        Self {
            positions: BTreeMap::new(),
            line_offsets,
        }
    }

    pub fn set_position(&mut self, id: ExprId, offset: u32) {
        self.positions.insert(id, offset);
    }

    pub fn position(&self, id: ExprId) -> Option<u32> {
        self.positions.get(&id).copied()
    }

    pub fn line_offsets(&self) -> &[u32] {
        &self.line_offsets
    }
}

// ---------------------------------------------------------------------------
// Checked-AST output types
// ---------------------------------------------------------------------------

/// A resolved reference recorded against an expression id.
///
/// Identifiers and struct creations carry only the resolved name; calls
/// additionally carry every surviving overload id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub overload_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Bool,
    Int64,
    Uint64,
    Double,
    String,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownType {
    Any,
    Duration,
    Timestamp,
}

/// The flattened type form stamped onto checked ASTs.
///
/// This is a closed union with no lifecycle dependency on the check
/// environment; free type variables have already been flattened to `Dyn`.
#[derive(Debug, Clone, PartialEq)]
pub enum AstType {
    Dyn,
    Null,
    Error,
    Primitive(PrimitiveType),
    Wrapper(PrimitiveType),
    WellKnown(WellKnownType),
    List {
        elem_type: Box<AstType>,
    },
    Map {
        key_type: Box<AstType>,
        value_type: Box<AstType>,
    },
    Message {
        name: String,
    },
    Abstract {
        name: String,
        parameter_types: Vec<AstType>,
    },
    Type(Option<Box<AstType>>),
}

/// An expression AST plus its source info and, once checked, the resolved
/// reference and type maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub root: Expr,
    pub source_info: SourceInfo,
    pub reference_map: BTreeMap<ExprId, Reference>,
    pub type_map: BTreeMap<ExprId, AstType>,
    pub is_checked: bool,
}

impl Ast {
    pub fn new(root: Expr, source_info: SourceInfo) -> Self {
        Self {
            root,
            source_info,
            reference_map: BTreeMap::new(),
            type_map: BTreeMap::new(),
            is_checked: false,
        }
    }

    /// Drop check results, returning the AST to its unchecked state.
    pub fn strip_check_results(&mut self) {
        self.reference_map.clear();
        self.type_map.clear();
        self.is_checked = false;
    }
}

// ---------------------------------------------------------------------------
// Expression factory
// ---------------------------------------------------------------------------

/// Builds expressions with sequentially assigned ids.
///
/// Parsers allocate ids while lowering source text; tests and benchmarks
/// use this factory to hand-assemble ASTs with the same uniqueness
/// guarantee.
#[derive(Debug, Default)]
pub struct ExprFactory {
    next_id: i64,
}

impl ExprFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> ExprId {
        self.next_id += 1;
        ExprId(self.next_id)
    }

    pub fn const_expr(&mut self, constant: Constant) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Const(constant),
        }
    }

    pub fn const_null(&mut self) -> Expr {
        self.const_expr(Constant::Null)
    }

    pub fn const_bool(&mut self, value: bool) -> Expr {
        self.const_expr(Constant::Bool(value))
    }

    pub fn const_int(&mut self, value: i64) -> Expr {
        self.const_expr(Constant::Int(value))
    }

    pub fn const_uint(&mut self, value: u64) -> Expr {
        self.const_expr(Constant::Uint(value))
    }

    pub fn const_double(&mut self, value: f64) -> Expr {
        self.const_expr(Constant::Double(value))
    }

    pub fn const_string(&mut self, value: impl Into<String>) -> Expr {
        self.const_expr(Constant::String(value.into()))
    }

    pub fn const_bytes(&mut self, value: Vec<u8>) -> Expr {
        self.const_expr(Constant::Bytes(value))
    }

    pub fn ident(&mut self, name: impl Into<String>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Ident(IdentExpr { name: name.into() }),
        }
    }

    pub fn select(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Select(Box::new(SelectExpr {
                operand,
                field: field.into(),
                test_only: false,
            })),
        }
    }

    pub fn test_only_select(&mut self, operand: Expr, field: impl Into<String>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Select(Box::new(SelectExpr {
                operand,
                field: field.into(),
                test_only: true,
            })),
        }
    }

    pub fn call(&mut self, function: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Call(CallExpr {
                target: None,
                function: function.into(),
                args,
            }),
        }
    }

    pub fn member_call(
        &mut self,
        function: impl Into<String>,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Call(CallExpr {
                target: Some(Box::new(target)),
                function: function.into(),
                args,
            }),
        }
    }

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        let elements = elements
            .into_iter()
            .map(|expr| ListElement {
                expr,
                optional: false,
            })
            .collect();
        Expr {
            id: self.next_id(),
            kind: ExprKind::List(ListExpr { elements }),
        }
    }

    pub fn list_with_elements(&mut self, elements: Vec<ListElement>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::List(ListExpr { elements }),
        }
    }

    pub fn map_entry(&mut self, key: Expr, value: Expr, optional: bool) -> MapEntry {
        MapEntry {
            id: self.next_id(),
            key,
            value,
            optional,
        }
    }

    pub fn map_expr(&mut self, entries: Vec<MapEntry>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Map(MapExpr { entries }),
        }
    }

    pub fn struct_field(&mut self, name: impl Into<String>, value: Expr) -> StructField {
        StructField {
            id: self.next_id(),
            name: name.into(),
            value,
            optional: false,
        }
    }

    pub fn optional_struct_field(&mut self, name: impl Into<String>, value: Expr) -> StructField {
        StructField {
            id: self.next_id(),
            name: name.into(),
            value,
            optional: true,
        }
    }

    pub fn struct_expr(&mut self, name: impl Into<String>, fields: Vec<StructField>) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Struct(StructExpr {
                name: name.into(),
                fields,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_range: Expr,
        iter_var: impl Into<String>,
        accu_init: Expr,
        accu_var: impl Into<String>,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        Expr {
            id: self.next_id(),
            kind: ExprKind::Comprehension(Box::new(ComprehensionExpr {
                iter_range,
                iter_var: iter_var.into(),
                accu_init,
                accu_var: accu_var.into(),
                loop_condition,
                loop_step,
                result,
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Which sub-expression of a comprehension is being visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionArg {
    IterRange,
    AccuInit,
    LoopCondition,
    LoopStep,
    Result,
}

/// Visitor callbacks for [`traverse`].
///
/// The lifetime parameter is the AST borrow: callbacks receive references
/// that live as long as the traversed tree, so visitors may keep an
/// ancestor stack or defer work on specific nodes.
///
/// Kind-specific post hooks fire before the generic [`post_visit_expr`],
/// so a visitor that maintains an ancestor stack in the pre/post pair still
/// sees the node itself on the stack inside the specific hooks.
///
/// [`post_visit_expr`]: AstVisitor::post_visit_expr
#[allow(unused_variables)]
pub trait AstVisitor<'a> {
    fn pre_visit_expr(&mut self, expr: &'a Expr) {}
    fn post_visit_expr(&mut self, expr: &'a Expr) {}

    fn post_visit_const(&mut self, expr: &'a Expr, constant: &'a Constant) {}
    fn post_visit_ident(&mut self, expr: &'a Expr, ident: &'a IdentExpr) {}
    fn post_visit_select(&mut self, expr: &'a Expr, select: &'a SelectExpr) {}
    fn post_visit_call(&mut self, expr: &'a Expr, call: &'a CallExpr) {}
    fn post_visit_list(&mut self, expr: &'a Expr, list: &'a ListExpr) {}
    fn post_visit_map(&mut self, expr: &'a Expr, map: &'a MapExpr) {}
    fn post_visit_struct(&mut self, expr: &'a Expr, strct: &'a StructExpr) {}

    fn pre_visit_comprehension(&mut self, expr: &'a Expr, comp: &'a ComprehensionExpr) {}
    fn post_visit_comprehension(&mut self, expr: &'a Expr, comp: &'a ComprehensionExpr) {}
    fn pre_visit_comprehension_subexpr(
        &mut self,
        expr: &'a Expr,
        comp: &'a ComprehensionExpr,
        arg: ComprehensionArg,
    ) {
    }
    fn post_visit_comprehension_subexpr(
        &mut self,
        expr: &'a Expr,
        comp: &'a ComprehensionExpr,
        arg: ComprehensionArg,
    ) {
    }
}

enum Frame<'a> {
    Enter(&'a Expr),
    Exit(&'a Expr),
    EnterCompArg(&'a Expr, &'a ComprehensionExpr, ComprehensionArg),
    ExitCompArg(&'a Expr, &'a ComprehensionExpr, ComprehensionArg),
}

/// Post-order traversal over an expression tree.
///
/// Children are visited left to right (a call's target before its
/// arguments); comprehension sub-expressions are bracketed by the
/// dedicated pre/post hooks so visitors can swap scopes around exactly the
/// right sub-trees. Uses an explicit stack: input nesting depth is bounded
/// by available memory, not the thread stack.
pub fn traverse<'a, V: AstVisitor<'a>>(root: &'a Expr, visitor: &mut V) {
    let mut stack = vec![Frame::Enter(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(expr) => {
                visitor.pre_visit_expr(expr);
                stack.push(Frame::Exit(expr));
                match &expr.kind {
                    ExprKind::Const(_) | ExprKind::Ident(_) => {}
                    ExprKind::Select(select) => {
                        stack.push(Frame::Enter(&select.operand));
                    }
                    ExprKind::Call(call) => {
                        for arg in call.args.iter().rev() {
                            stack.push(Frame::Enter(arg));
                        }
                        if let Some(target) = &call.target {
                            stack.push(Frame::Enter(target));
                        }
                    }
                    ExprKind::List(list) => {
                        for element in list.elements.iter().rev() {
                            stack.push(Frame::Enter(&element.expr));
                        }
                    }
                    ExprKind::Map(map) => {
                        for entry in map.entries.iter().rev() {
                            stack.push(Frame::Enter(&entry.value));
                            stack.push(Frame::Enter(&entry.key));
                        }
                    }
                    ExprKind::Struct(strct) => {
                        for field in strct.fields.iter().rev() {
                            stack.push(Frame::Enter(&field.value));
                        }
                    }
                    ExprKind::Comprehension(comp) => {
                        let comp: &ComprehensionExpr = comp;
                        visitor.pre_visit_comprehension(expr, comp);
                        let subexprs = [
                            (ComprehensionArg::IterRange, &comp.iter_range),
                            (ComprehensionArg::AccuInit, &comp.accu_init),
                            (ComprehensionArg::LoopCondition, &comp.loop_condition),
                            (ComprehensionArg::LoopStep, &comp.loop_step),
                            (ComprehensionArg::Result, &comp.result),
                        ];
                        for &(arg, subexpr) in subexprs.iter().rev() {
                            stack.push(Frame::ExitCompArg(expr, comp, arg));
                            stack.push(Frame::Enter(subexpr));
                            stack.push(Frame::EnterCompArg(expr, comp, arg));
                        }
                    }
                }
            }
            Frame::Exit(expr) => {
                match &expr.kind {
                    ExprKind::Const(constant) => visitor.post_visit_const(expr, constant),
                    ExprKind::Ident(ident) => visitor.post_visit_ident(expr, ident),
                    ExprKind::Select(select) => visitor.post_visit_select(expr, select),
                    ExprKind::Call(call) => visitor.post_visit_call(expr, call),
                    ExprKind::List(list) => visitor.post_visit_list(expr, list),
                    ExprKind::Map(map) => visitor.post_visit_map(expr, map),
                    ExprKind::Struct(strct) => visitor.post_visit_struct(expr, strct),
                    ExprKind::Comprehension(comp) => visitor.post_visit_comprehension(expr, comp),
                }
                visitor.post_visit_expr(expr);
            }
            Frame::EnterCompArg(expr, comp, arg) => {
                visitor.pre_visit_comprehension_subexpr(expr, comp, arg);
            }
            Frame::ExitCompArg(expr, comp, arg) => {
                visitor.post_visit_comprehension_subexpr(expr, comp, arg);
            }
        }
    }
}
