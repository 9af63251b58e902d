//! Traversal protocol over [`MirBody`].
//!
//! [`MirVisitor`] walks a body in a fixed order: basic blocks in declaration
//! order (each block's statements in order, then its terminator), then source
//! scopes, then local declarations, then variable debug info, then the body
//! span. Every hook has a default implementation that recurses into its
//! children via the matching `walk_*` function, so a consumer overrides only
//! the hooks relevant to its pass and calls `walk_*` itself if it still wants
//! the recursion.

use serde::{Deserialize, Serialize};

use super::*;

/// A position inside a body: a block plus a statement index. The terminator's
/// location is `statement_index == block.statements.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirLocation {
    pub block: MirBasicBlockId,
    pub statement_index: usize,
}

impl MirLocation {
    pub const START: MirLocation = MirLocation {
        block: MirBasicBlockId(0),
        statement_index: 0,
    };
}

/// How a place is being used at the point it is visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirPlaceContext {
    NonMutatingUse(NonMutatingUseContext),
    MutatingUse(MutatingUseContext),
    NonUse(NonUseContext),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonMutatingUseContext {
    Projection,
    Inspect,
    Copy,
    Move,
    SharedBorrow,
    ShallowBorrow,
    UniqueBorrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutatingUseContext {
    Projection,
    Store,
    Borrow,
    Call,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonUseContext {
    VarDebugInfo,
    StorageLive,
    StorageDead,
}

impl MirPlaceContext {
    pub fn is_use(self) -> bool {
        !matches!(self, MirPlaceContext::NonUse(_))
    }

    pub fn is_mutating_use(self) -> bool {
        matches!(self, MirPlaceContext::MutatingUse(_))
    }
}

/// Context about where a type appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyContext {
    /// The declared type of a local variable.
    LocalDecl(MirLocal),
    /// A type found at some location.
    Location(MirLocation),
}

pub trait MirVisitor: Sized {
    fn visit_body(&mut self, body: &MirBody) {
        walk_body(self, body);
    }

    fn visit_basic_block(&mut self, id: MirBasicBlockId, block: &MirBasicBlock) {
        walk_basic_block(self, id, block);
    }

    fn visit_source_scope(&mut self, scope: &MirSourceScope) {
        walk_source_scope(self, scope);
    }

    fn visit_local_decl(&mut self, local: MirLocal, decl: &MirLocalDecl) {
        walk_local_decl(self, local, decl);
    }

    fn visit_var_debug_info(&mut self, info: &MirVarDebugInfo) {
        walk_var_debug_info(self, info);
    }

    fn visit_statement(&mut self, statement: &MirStatement, location: MirLocation) {
        walk_statement(self, statement, location);
    }

    fn visit_assign(&mut self, place: &MirPlace, rvalue: &MirRvalue, location: MirLocation) {
        walk_assign(self, place, rvalue, location);
    }

    fn visit_terminator(&mut self, terminator: &MirTerminator, location: MirLocation) {
        walk_terminator(self, terminator, location);
    }

    fn visit_rvalue(&mut self, rvalue: &MirRvalue, location: MirLocation) {
        walk_rvalue(self, rvalue, location);
    }

    fn visit_operand(&mut self, operand: &MirOperand, location: MirLocation) {
        walk_operand(self, operand, location);
    }

    fn visit_assert_message(&mut self, msg: &MirAssertKind, location: MirLocation) {
        walk_assert_message(self, msg, location);
    }

    fn visit_place(&mut self, place: &MirPlace, context: MirPlaceContext, location: MirLocation) {
        walk_place(self, place, context, location);
    }

    fn visit_projection_elem(&mut self, elem: &MirProjectionElem, location: MirLocation) {
        walk_projection_elem(self, elem, location);
    }

    fn visit_local(&mut self, _local: MirLocal, _context: MirPlaceContext, _location: MirLocation) {}

    fn visit_constant(&mut self, constant: &MirConstant, location: MirLocation) {
        walk_constant(self, constant, location);
    }

    fn visit_source_info(&mut self, source_info: &MirSourceInfo) {
        walk_source_info(self, source_info);
    }

    fn visit_span(&mut self, _span: MirSpan) {}

    fn visit_ty(&mut self, _ty: &MirTy, _context: TyContext) {}
}

pub fn walk_body<V: MirVisitor>(visitor: &mut V, body: &MirBody) {
    for (index, block) in body.basic_blocks.iter().enumerate() {
        visitor.visit_basic_block(MirBasicBlockId(index as u32), block);
    }

    for scope in &body.source_scopes {
        visitor.visit_source_scope(scope);
    }

    for (index, decl) in body.local_decls.iter().enumerate() {
        visitor.visit_local_decl(MirLocal(index as u32), decl);
    }

    for info in &body.var_debug_info {
        visitor.visit_var_debug_info(info);
    }

    visitor.visit_span(body.span);
}

pub fn walk_basic_block<V: MirVisitor>(
    visitor: &mut V,
    id: MirBasicBlockId,
    block: &MirBasicBlock,
) {
    for (index, statement) in block.statements.iter().enumerate() {
        let location = MirLocation {
            block: id,
            statement_index: index,
        };
        visitor.visit_statement(statement, location);
    }

    let terminator_location = MirLocation {
        block: id,
        statement_index: block.statements.len(),
    };
    visitor.visit_terminator(&block.terminator, terminator_location);
}

pub fn walk_source_scope<V: MirVisitor>(visitor: &mut V, scope: &MirSourceScope) {
    visitor.visit_span(scope.span);
}

pub fn walk_local_decl<V: MirVisitor>(visitor: &mut V, local: MirLocal, decl: &MirLocalDecl) {
    visitor.visit_ty(&decl.ty, TyContext::LocalDecl(local));
    visitor.visit_source_info(&decl.source_info);
}

pub fn walk_var_debug_info<V: MirVisitor>(visitor: &mut V, info: &MirVarDebugInfo) {
    visitor.visit_source_info(&info.source_info);
    match &info.contents {
        MirVarDebugInfoContents::Place(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonUse(NonUseContext::VarDebugInfo),
            MirLocation::START,
        ),
        MirVarDebugInfoContents::Const(constant) => {
            visitor.visit_constant(constant, MirLocation::START)
        }
    }
}

pub fn walk_statement<V: MirVisitor>(
    visitor: &mut V,
    statement: &MirStatement,
    location: MirLocation,
) {
    visitor.visit_source_info(&statement.source_info);
    match &statement.kind {
        MirStatementKind::Assign(place, rvalue) => visitor.visit_assign(place, rvalue, location),
        MirStatementKind::FakeRead(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Inspect),
            location,
        ),
        MirStatementKind::StorageLive(local) => visitor.visit_local(
            *local,
            MirPlaceContext::NonUse(NonUseContext::StorageLive),
            location,
        ),
        MirStatementKind::StorageDead(local) => visitor.visit_local(
            *local,
            MirPlaceContext::NonUse(NonUseContext::StorageDead),
            location,
        ),
        MirStatementKind::Nop => {}
    }
}

pub fn walk_assign<V: MirVisitor>(
    visitor: &mut V,
    place: &MirPlace,
    rvalue: &MirRvalue,
    location: MirLocation,
) {
    visitor.visit_place(
        place,
        MirPlaceContext::MutatingUse(MutatingUseContext::Store),
        location,
    );
    visitor.visit_rvalue(rvalue, location);
}

pub fn walk_terminator<V: MirVisitor>(
    visitor: &mut V,
    terminator: &MirTerminator,
    location: MirLocation,
) {
    visitor.visit_source_info(&terminator.source_info);
    match &terminator.kind {
        MirTerminatorKind::Return => {
            visitor.visit_local(
                MirBody::RETURN_PLACE,
                MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Move),
                location,
            );
        }
        MirTerminatorKind::SwitchInt { discr, .. } => {
            visitor.visit_operand(discr, location);
        }
        MirTerminatorKind::Drop { place, .. } => {
            visitor.visit_place(
                place,
                MirPlaceContext::MutatingUse(MutatingUseContext::Drop),
                location,
            );
        }
        MirTerminatorKind::Call {
            func,
            args,
            destination,
            ..
        } => {
            visitor.visit_operand(func, location);
            for arg in args {
                visitor.visit_operand(arg, location);
            }
            visitor.visit_place(
                destination,
                MirPlaceContext::MutatingUse(MutatingUseContext::Call),
                location,
            );
        }
        MirTerminatorKind::Assert { cond, msg, .. } => {
            visitor.visit_operand(cond, location);
            visitor.visit_assert_message(msg, location);
        }
        MirTerminatorKind::Goto { .. }
        | MirTerminatorKind::Resume
        | MirTerminatorKind::Unreachable
        | MirTerminatorKind::FalseEdge { .. }
        | MirTerminatorKind::FalseUnwind { .. } => {}
    }
}

pub fn walk_rvalue<V: MirVisitor>(visitor: &mut V, rvalue: &MirRvalue, location: MirLocation) {
    match rvalue {
        MirRvalue::Use(operand) => visitor.visit_operand(operand, location),
        MirRvalue::Repeat(operand, _) => visitor.visit_operand(operand, location),
        MirRvalue::Ref(borrow_kind, place) => {
            let context = match borrow_kind {
                MirBorrowKind::Shared => {
                    MirPlaceContext::NonMutatingUse(NonMutatingUseContext::SharedBorrow)
                }
                MirBorrowKind::Shallow => {
                    MirPlaceContext::NonMutatingUse(NonMutatingUseContext::ShallowBorrow)
                }
                MirBorrowKind::Unique => {
                    MirPlaceContext::NonMutatingUse(NonMutatingUseContext::UniqueBorrow)
                }
                MirBorrowKind::Mut => MirPlaceContext::MutatingUse(MutatingUseContext::Borrow),
            };
            visitor.visit_place(place, context, location);
        }
        MirRvalue::Len(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Inspect),
            location,
        ),
        MirRvalue::Cast(_, operand, ty) => {
            visitor.visit_operand(operand, location);
            visitor.visit_ty(ty, TyContext::Location(location));
        }
        MirRvalue::BinaryOp(_, operands) | MirRvalue::CheckedBinaryOp(_, operands) => {
            visitor.visit_operand(&operands.0, location);
            visitor.visit_operand(&operands.1, location);
        }
        MirRvalue::UnaryOp(_, operand) => visitor.visit_operand(operand, location),
        MirRvalue::Discriminant(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Inspect),
            location,
        ),
        MirRvalue::Aggregate(kind, operands) => {
            if let MirAggregateKind::Array(ty) = kind {
                visitor.visit_ty(ty, TyContext::Location(location));
            }
            for operand in operands {
                visitor.visit_operand(operand, location);
            }
        }
    }
}

pub fn walk_operand<V: MirVisitor>(visitor: &mut V, operand: &MirOperand, location: MirLocation) {
    match operand {
        MirOperand::Copy(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Copy),
            location,
        ),
        MirOperand::Move(place) => visitor.visit_place(
            place,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Move),
            location,
        ),
        MirOperand::Constant(constant) => visitor.visit_constant(constant, location),
    }
}

pub fn walk_assert_message<V: MirVisitor>(
    visitor: &mut V,
    msg: &MirAssertKind,
    location: MirLocation,
) {
    match msg {
        MirAssertKind::BoundsCheck { len, index } => {
            visitor.visit_operand(len, location);
            visitor.visit_operand(index, location);
        }
        MirAssertKind::Overflow(_, left, right) => {
            visitor.visit_operand(left, location);
            visitor.visit_operand(right, location);
        }
        MirAssertKind::OverflowNeg(arg)
        | MirAssertKind::DivisionByZero(arg)
        | MirAssertKind::RemainderByZero(arg) => {
            visitor.visit_operand(arg, location);
        }
    }
}

pub fn walk_place<V: MirVisitor>(
    visitor: &mut V,
    place: &MirPlace,
    context: MirPlaceContext,
    location: MirLocation,
) {
    let mut context = context;
    if !place.projection.is_empty() && context.is_use() {
        context = if context.is_mutating_use() {
            MirPlaceContext::MutatingUse(MutatingUseContext::Projection)
        } else {
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Projection)
        };
    }
    visitor.visit_local(place.local, context, location);
    for elem in place.projection.iter().rev() {
        visitor.visit_projection_elem(elem, location);
    }
}

pub fn walk_projection_elem<V: MirVisitor>(
    visitor: &mut V,
    elem: &MirProjectionElem,
    location: MirLocation,
) {
    match elem {
        MirProjectionElem::Index(local) => visitor.visit_local(
            *local,
            MirPlaceContext::NonMutatingUse(NonMutatingUseContext::Copy),
            location,
        ),
        MirProjectionElem::Deref
        | MirProjectionElem::Field(_)
        | MirProjectionElem::Downcast(_) => {}
    }
}

pub fn walk_constant<V: MirVisitor>(visitor: &mut V, constant: &MirConstant, _location: MirLocation) {
    visitor.visit_span(constant.span);
}

pub fn walk_source_info<V: MirVisitor>(visitor: &mut V, source_info: &MirSourceInfo) {
    visitor.visit_span(source_info.span);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_info() -> MirSourceInfo {
        MirSourceInfo::outermost(MirSpan::DUMMY)
    }

    fn int_constant(value: i128) -> MirOperand {
        MirOperand::Constant(MirConstant {
            span: MirSpan::DUMMY,
            ty: MirTy::Int,
            value: MirConstValue::Int(value),
        })
    }

    fn two_block_body() -> MirBody {
        // _0 = _1 + 1; goto bb1; bb1: return
        MirBody {
            basic_blocks: vec![
                MirBasicBlock {
                    statements: vec![
                        MirStatement {
                            source_info: source_info(),
                            kind: MirStatementKind::StorageLive(MirLocal(1)),
                        },
                        MirStatement {
                            source_info: source_info(),
                            kind: MirStatementKind::Assign(
                                MirPlace::from_local(MirLocal(0)),
                                MirRvalue::BinaryOp(
                                    MirBinOp::Add,
                                    Box::new((
                                        MirOperand::Copy(MirPlace::from_local(MirLocal(1))),
                                        int_constant(1),
                                    )),
                                ),
                            ),
                        },
                    ],
                    terminator: MirTerminator {
                        source_info: source_info(),
                        kind: MirTerminatorKind::Goto {
                            target: MirBasicBlockId(1),
                        },
                    },
                    is_cleanup: false,
                },
                MirBasicBlock {
                    statements: vec![],
                    terminator: MirTerminator {
                        source_info: source_info(),
                        kind: MirTerminatorKind::Return,
                    },
                    is_cleanup: false,
                },
            ],
            local_decls: vec![
                MirLocalDecl::new(Mutability::Mut, MirTy::Int, source_info()),
                MirLocalDecl::new(Mutability::Not, MirTy::Int, source_info()),
            ],
            source_scopes: vec![MirSourceScope {
                span: MirSpan::DUMMY,
                parent_scope: None,
            }],
            var_debug_info: vec![],
            arg_count: 1,
            span: MirSpan::DUMMY,
        }
    }

    #[derive(Default)]
    struct LocalUses {
        uses: Vec<(MirLocal, bool)>,
    }

    impl MirVisitor for LocalUses {
        fn visit_local(
            &mut self,
            local: MirLocal,
            context: MirPlaceContext,
            _location: MirLocation,
        ) {
            if context.is_use() {
                self.uses.push((local, context.is_mutating_use()));
            }
        }
    }

    #[test]
    fn collects_local_uses() {
        let body = two_block_body();
        let mut visitor = LocalUses::default();
        visitor.visit_body(&body);
        // store to _0, copy of _1, move of _0 at return
        assert_eq!(
            visitor.uses,
            vec![
                (MirLocal(0), true),
                (MirLocal(1), false),
                (MirBody::RETURN_PLACE, false),
            ]
        );
    }

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    impl MirVisitor for Trace {
        fn visit_basic_block(&mut self, id: MirBasicBlockId, block: &MirBasicBlock) {
            self.events.push(format!("block{}", id.0));
            walk_basic_block(self, id, block);
        }

        fn visit_statement(&mut self, statement: &MirStatement, location: MirLocation) {
            self.events.push(format!(
                "stmt{}.{}",
                location.block.0, location.statement_index
            ));
            walk_statement(self, statement, location);
        }

        fn visit_terminator(&mut self, terminator: &MirTerminator, location: MirLocation) {
            self.events.push(format!("term{}", location.block.0));
            walk_terminator(self, terminator, location);
        }

        fn visit_local_decl(&mut self, local: MirLocal, decl: &MirLocalDecl) {
            self.events.push(format!("local{}", local.0));
            walk_local_decl(self, local, decl);
        }

        fn visit_source_scope(&mut self, scope: &MirSourceScope) {
            self.events.push("scope".to_string());
            walk_source_scope(self, scope);
        }
    }

    #[test]
    fn traversal_order_is_fixed() {
        let body = two_block_body();
        let mut visitor = Trace::default();
        visitor.visit_body(&body);
        assert_eq!(
            visitor.events,
            vec![
                "block0", "stmt0.0", "stmt0.1", "term0", "block1", "term1", "scope", "local0",
                "local1",
            ]
        );
    }

    #[test]
    fn terminator_location_is_past_statements() {
        let body = two_block_body();

        struct TermLoc(Option<MirLocation>);
        impl MirVisitor for TermLoc {
            fn visit_terminator(&mut self, _terminator: &MirTerminator, location: MirLocation) {
                if location.block == MirBasicBlockId(0) {
                    self.0 = Some(location);
                }
            }
        }

        let mut visitor = TermLoc(None);
        visitor.visit_body(&body);
        assert_eq!(
            visitor.0,
            Some(MirLocation {
                block: MirBasicBlockId(0),
                statement_index: 2
            })
        );
    }
}
