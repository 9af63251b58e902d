//! MIR schema: value types for a simplified control-flow-graph IR.
//!
//! This is pure data; no lowering logic lives here. A body is a vector of
//! basic blocks (each a run of statements closed by exactly one terminator),
//! a vector of local declarations, source scopes, and variable debug info.
//! Everything is addressed by index (`MirLocal`, `MirBasicBlockId`,
//! `MirScopeId`) rather than by reference, so bodies are trivially shareable,
//! serializable, and free of ownership cycles.
//!
//! [`visit::MirVisitor`] provides the traversal protocol; [`build`] holds the
//! decision structures used while lowering `match` expressions into a body.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub mod build;
pub mod visit;

/// A local variable slot, by index into [`MirBody::local_decls`].
///
/// Index 0 is always the return place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MirLocal(pub u32);

/// A basic block, by index into [`MirBody::basic_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MirBasicBlockId(pub u32);

/// A source scope, by index into [`MirBody::source_scopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirScopeId(pub u32);

/// The outermost scope, enclosing the whole body.
pub const OUTERMOST_SOURCE_SCOPE: MirScopeId = MirScopeId(0);

/// A byte range in the source the body was lowered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirSpan {
    pub start: u32,
    pub end: u32,
}

impl MirSpan {
    pub const DUMMY: MirSpan = MirSpan { start: 0, end: 0 };

    pub fn new(start: u32, end: u32) -> Self {
        MirSpan { start, end }
    }
}

/// Where a statement or terminator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirSourceInfo {
    pub span: MirSpan,
    pub scope: MirScopeId,
}

impl MirSourceInfo {
    pub fn outermost(span: MirSpan) -> Self {
        MirSourceInfo {
            span,
            scope: OUTERMOST_SOURCE_SCOPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutability {
    Not,
    Mut,
}

/// A structural type, just rich enough to type-check place projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirTy {
    Unit,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Never,
    Ref(Box<MirTy>, Mutability),
    Array(Box<MirTy>, u64),
    Slice(Box<MirTy>),
    Tuple(Vec<MirTy>),
    Adt(MirAdtDef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirAdtDef {
    pub name: SmolStr,
    pub variants: Vec<MirVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirVariant {
    pub name: SmolStr,
    pub fields: Vec<MirTy>,
}

/// A declared local: mutability, type, and where it was declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirLocalDecl {
    pub mutability: Mutability,
    /// Compiler-introduced temporary, not user-visible.
    pub internal: bool,
    pub ty: MirTy,
    pub source_info: MirSourceInfo,
}

impl MirLocalDecl {
    pub fn new(mutability: Mutability, ty: MirTy, source_info: MirSourceInfo) -> Self {
        MirLocalDecl {
            mutability,
            internal: false,
            ty,
            source_info,
        }
    }
}

/// One projection step applied to a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirProjectionElem {
    Deref,
    Field(u32),
    /// Index by another local (array/slice indexing).
    Index(MirLocal),
    /// Select an enum variant before projecting into its fields.
    Downcast(u32),
}

/// A storage location: a local plus a chain of projections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirPlace {
    pub local: MirLocal,
    pub projection: Vec<MirProjectionElem>,
}

impl MirPlace {
    pub fn from_local(local: MirLocal) -> Self {
        MirPlace {
            local,
            projection: Vec::new(),
        }
    }

    pub fn project_deeper(mut self, elem: MirProjectionElem) -> Self {
        self.projection.push(elem);
        self
    }

    /// The type of this place, obtained by applying each projection in order
    /// starting from the local's declared type. `None` if any projection is
    /// inconsistent with the type it is applied to.
    pub fn ty(&self, local_decls: &[MirLocalDecl]) -> Option<MirPlaceTy> {
        let decl = local_decls.get(self.local.0 as usize)?;
        let mut place_ty = MirPlaceTy::from_ty(decl.ty.clone());
        for elem in &self.projection {
            place_ty = place_ty.projection_ty(elem)?;
        }
        Some(place_ty)
    }
}

impl From<MirLocal> for MirPlace {
    fn from(local: MirLocal) -> Self {
        MirPlace::from_local(local)
    }
}

/// The type of a place, tracking a selected variant between a `Downcast`
/// projection and the `Field` projections that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirPlaceTy {
    pub ty: MirTy,
    pub variant_index: Option<u32>,
}

impl MirPlaceTy {
    pub fn from_ty(ty: MirTy) -> Self {
        MirPlaceTy {
            ty,
            variant_index: None,
        }
    }

    /// Apply one projection. `None` if the projection doesn't make sense for
    /// the current type (dereferencing a non-reference, a field index out of
    /// bounds, downcasting a non-enum, and so on).
    pub fn projection_ty(self, elem: &MirProjectionElem) -> Option<MirPlaceTy> {
        match elem {
            MirProjectionElem::Deref => match self.ty {
                MirTy::Ref(inner, _) => Some(MirPlaceTy::from_ty(*inner)),
                _ => None,
            },
            MirProjectionElem::Field(index) => {
                let field_ty = match (&self.ty, self.variant_index) {
                    (MirTy::Tuple(fields), None) => fields.get(*index as usize)?.clone(),
                    (MirTy::Adt(adt), variant) => {
                        // a non-downcast field access is only valid on
                        // single-variant adts (structs)
                        let variant_index = match variant {
                            Some(v) => v,
                            None if adt.variants.len() == 1 => 0,
                            None => return None,
                        };
                        let variant = adt.variants.get(variant_index as usize)?;
                        variant.fields.get(*index as usize)?.clone()
                    }
                    _ => return None,
                };
                Some(MirPlaceTy::from_ty(field_ty))
            }
            MirProjectionElem::Index(_) => match self.ty {
                MirTy::Array(elem_ty, _) | MirTy::Slice(elem_ty) => {
                    Some(MirPlaceTy::from_ty(*elem_ty))
                }
                _ => None,
            },
            MirProjectionElem::Downcast(variant_index) => {
                let in_bounds = match &self.ty {
                    MirTy::Adt(adt) => (*variant_index as usize) < adt.variants.len(),
                    _ => false,
                };
                if in_bounds {
                    Some(MirPlaceTy {
                        ty: self.ty,
                        variant_index: Some(*variant_index),
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirConstant {
    pub span: MirSpan,
    pub ty: MirTy,
    pub value: MirConstValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirConstValue {
    Unit,
    Bool(bool),
    Int(i128),
    Str(String),
    /// A named item (function, const) referenced by path text.
    Item(SmolStr),
}

/// An argument to a statement: read a place, or use a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirOperand {
    Copy(MirPlace),
    Move(MirPlace),
    Constant(MirConstant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirBorrowKind {
    Shared,
    Shallow,
    Unique,
    Mut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitXor,
    BitAnd,
    BitOr,
    Shl,
    Shr,
    Eq,
    Lt,
    Le,
    Ne,
    Ge,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirUnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirCastKind {
    Misc,
    Unsize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirAggregateKind {
    Array(MirTy),
    Tuple,
    Adt { name: SmolStr, variant_index: u32 },
}

/// The right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirRvalue {
    Use(MirOperand),
    Repeat(MirOperand, u64),
    Ref(MirBorrowKind, MirPlace),
    Len(MirPlace),
    Cast(MirCastKind, MirOperand, MirTy),
    BinaryOp(MirBinOp, Box<(MirOperand, MirOperand)>),
    CheckedBinaryOp(MirBinOp, Box<(MirOperand, MirOperand)>),
    UnaryOp(MirUnOp, MirOperand),
    Discriminant(MirPlace),
    Aggregate(MirAggregateKind, Vec<MirOperand>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirStatement {
    pub source_info: MirSourceInfo,
    pub kind: MirStatementKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirStatementKind {
    Assign(MirPlace, MirRvalue),
    /// Marks a read of the matched place for borrow-check purposes during
    /// match lowering; no runtime effect.
    FakeRead(MirPlace),
    StorageLive(MirLocal),
    StorageDead(MirLocal),
    Nop,
}

/// Jump targets of a `SwitchInt`, one per tested value plus a final
/// "otherwise" target. `targets.len() == values.len() + 1`; the last entry is
/// the otherwise block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirSwitchTargets {
    pub values: Vec<u128>,
    pub targets: Vec<MirBasicBlockId>,
}

impl MirSwitchTargets {
    pub fn new(
        values_and_targets: Vec<(u128, MirBasicBlockId)>,
        otherwise: MirBasicBlockId,
    ) -> Self {
        let (values, mut targets): (Vec<_>, Vec<_>) = values_and_targets.into_iter().unzip();
        targets.push(otherwise);
        MirSwitchTargets { values, targets }
    }

    /// `true`/`false` dispatch on a boolean discriminant.
    pub fn if_else(true_block: MirBasicBlockId, false_block: MirBasicBlockId) -> Self {
        MirSwitchTargets::new(vec![(0, false_block)], true_block)
    }

    pub fn otherwise(&self) -> MirBasicBlockId {
        *self
            .targets
            .last()
            .unwrap_or_else(|| panic!("invariant violated: switch with no otherwise target"))
    }
}

/// What went wrong, for `Assert` terminators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirAssertKind {
    BoundsCheck { len: MirOperand, index: MirOperand },
    Overflow(MirBinOp, MirOperand, MirOperand),
    OverflowNeg(MirOperand),
    DivisionByZero(MirOperand),
    RemainderByZero(MirOperand),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirTerminator {
    pub source_info: MirSourceInfo,
    pub kind: MirTerminatorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirTerminatorKind {
    Goto {
        target: MirBasicBlockId,
    },
    SwitchInt {
        discr: MirOperand,
        targets: MirSwitchTargets,
    },
    Return,
    Resume,
    Unreachable,
    Drop {
        place: MirPlace,
        target: MirBasicBlockId,
        unwind: Option<MirBasicBlockId>,
    },
    Call {
        func: MirOperand,
        args: Vec<MirOperand>,
        destination: MirPlace,
        target: Option<MirBasicBlockId>,
        unwind: Option<MirBasicBlockId>,
    },
    Assert {
        cond: MirOperand,
        expected: bool,
        msg: MirAssertKind,
        target: MirBasicBlockId,
        unwind: Option<MirBasicBlockId>,
    },
    /// A branch that is statically known to be taken, kept so borrow checking
    /// sees the untaken edge of a match candidate.
    FalseEdge {
        real_target: MirBasicBlockId,
        imaginary_target: MirBasicBlockId,
    },
    FalseUnwind {
        real_target: MirBasicBlockId,
        unwind: Option<MirBasicBlockId>,
    },
}

impl MirTerminator {
    /// Every basic block this terminator can transfer control to.
    pub fn successors(&self) -> Vec<MirBasicBlockId> {
        use MirTerminatorKind::*;
        match &self.kind {
            Return | Resume | Unreachable => Vec::new(),
            Goto { target } => vec![*target],
            SwitchInt { targets, .. } => targets.targets.clone(),
            Drop { target, unwind, .. } | Assert { target, unwind, .. } => {
                let mut successors = vec![*target];
                successors.extend(unwind.iter().copied());
                successors
            }
            Call { target, unwind, .. } => {
                let mut successors = Vec::new();
                successors.extend(target.iter().copied());
                successors.extend(unwind.iter().copied());
                successors
            }
            FalseEdge {
                real_target,
                imaginary_target,
            } => vec![*real_target, *imaginary_target],
            FalseUnwind {
                real_target,
                unwind,
            } => {
                let mut successors = vec![*real_target];
                successors.extend(unwind.iter().copied());
                successors
            }
        }
    }

    /// The unwind edge, if this terminator has one.
    pub fn unwind(&self) -> Option<MirBasicBlockId> {
        use MirTerminatorKind::*;
        match &self.kind {
            Drop { unwind, .. }
            | Call { unwind, .. }
            | Assert { unwind, .. }
            | FalseUnwind { unwind, .. } => *unwind,
            _ => None,
        }
    }
}

/// A run of statements ending in exactly one terminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirBasicBlock {
    pub statements: Vec<MirStatement>,
    pub terminator: MirTerminator,
    pub is_cleanup: bool,
}

impl MirBasicBlock {
    pub fn new(terminator: MirTerminator) -> Self {
        MirBasicBlock {
            statements: Vec::new(),
            terminator,
            is_cleanup: false,
        }
    }
}

/// A lexical scope, for mapping statements back to the source nesting they
/// came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirSourceScope {
    pub span: MirSpan,
    pub parent_scope: Option<MirScopeId>,
}

/// Debug-info binding of a user-visible variable name to its storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirVarDebugInfo {
    pub name: SmolStr,
    pub source_info: MirSourceInfo,
    pub contents: MirVarDebugInfoContents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MirVarDebugInfoContents {
    Place(MirPlace),
    Const(MirConstant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirLocalKind {
    /// A function argument.
    Arg,
    /// A compiler temporary or user variable.
    Temp,
    /// The return place, local 0.
    ReturnPointer,
}

/// A lowered body: the control-flow graph plus its local declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirBody {
    pub basic_blocks: Vec<MirBasicBlock>,
    pub local_decls: Vec<MirLocalDecl>,
    pub source_scopes: Vec<MirSourceScope>,
    pub var_debug_info: Vec<MirVarDebugInfo>,
    pub arg_count: usize,
    pub span: MirSpan,
}

impl MirBody {
    /// By convention the zeroth local is the return place.
    pub const RETURN_PLACE: MirLocal = MirLocal(0);

    pub fn return_place() -> MirLocal {
        MirBody::RETURN_PLACE
    }

    pub fn local_kind(&self, local: MirLocal) -> MirLocalKind {
        let index = local.0 as usize;
        if index == 0 {
            MirLocalKind::ReturnPointer
        } else if index <= self.arg_count {
            MirLocalKind::Arg
        } else {
            MirLocalKind::Temp
        }
    }

    pub fn block(&self, id: MirBasicBlockId) -> &MirBasicBlock {
        &self.basic_blocks[id.0 as usize]
    }

    pub fn local_decl(&self, local: MirLocal) -> &MirLocalDecl {
        &self.local_decls[local.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(n: u32) -> MirBasicBlockId {
        MirBasicBlockId(n)
    }

    fn terminator(kind: MirTerminatorKind) -> MirTerminator {
        MirTerminator {
            source_info: MirSourceInfo::outermost(MirSpan::DUMMY),
            kind,
        }
    }

    fn unit_constant() -> MirOperand {
        MirOperand::Constant(MirConstant {
            span: MirSpan::DUMMY,
            ty: MirTy::Unit,
            value: MirConstValue::Unit,
        })
    }

    #[test]
    fn terminator_successors() {
        assert_eq!(terminator(MirTerminatorKind::Return).successors(), vec![]);
        assert_eq!(terminator(MirTerminatorKind::Resume).successors(), vec![]);
        assert_eq!(
            terminator(MirTerminatorKind::Unreachable).successors(),
            vec![]
        );
        assert_eq!(
            terminator(MirTerminatorKind::Goto { target: bb(3) }).successors(),
            vec![bb(3)]
        );

        let switch = terminator(MirTerminatorKind::SwitchInt {
            discr: unit_constant(),
            targets: MirSwitchTargets::new(vec![(0, bb(1)), (1, bb(2))], bb(7)),
        });
        assert_eq!(switch.successors(), vec![bb(1), bb(2), bb(7)]);

        let drop = terminator(MirTerminatorKind::Drop {
            place: MirPlace::from_local(MirLocal(1)),
            target: bb(2),
            unwind: Some(bb(9)),
        });
        assert_eq!(drop.successors(), vec![bb(2), bb(9)]);
        assert_eq!(drop.unwind(), Some(bb(9)));

        let call = terminator(MirTerminatorKind::Call {
            func: unit_constant(),
            args: vec![],
            destination: MirPlace::from_local(MirLocal(0)),
            target: None,
            unwind: Some(bb(4)),
        });
        assert_eq!(call.successors(), vec![bb(4)]);

        let assert = terminator(MirTerminatorKind::Assert {
            cond: unit_constant(),
            expected: true,
            msg: MirAssertKind::OverflowNeg(unit_constant()),
            target: bb(5),
            unwind: None,
        });
        assert_eq!(assert.successors(), vec![bb(5)]);
        assert_eq!(assert.unwind(), None);

        let false_edge = terminator(MirTerminatorKind::FalseEdge {
            real_target: bb(1),
            imaginary_target: bb(2),
        });
        assert_eq!(false_edge.successors(), vec![bb(1), bb(2)]);

        let false_unwind = terminator(MirTerminatorKind::FalseUnwind {
            real_target: bb(1),
            unwind: Some(bb(6)),
        });
        assert_eq!(false_unwind.successors(), vec![bb(1), bb(6)]);
    }

    #[test]
    fn switch_targets_shape() {
        let targets = MirSwitchTargets::new(vec![(10, bb(1))], bb(2));
        assert_eq!(targets.values, vec![10]);
        assert_eq!(targets.otherwise(), bb(2));

        let if_else = MirSwitchTargets::if_else(bb(1), bb(0));
        assert_eq!(if_else.values, vec![0]);
        assert_eq!(if_else.targets, vec![bb(0), bb(1)]);
    }

    fn option_int() -> MirTy {
        MirTy::Adt(MirAdtDef {
            name: SmolStr::new("Option"),
            variants: vec![
                MirVariant {
                    name: SmolStr::new("None"),
                    fields: vec![],
                },
                MirVariant {
                    name: SmolStr::new("Some"),
                    fields: vec![MirTy::Int],
                },
            ],
        })
    }

    #[test]
    fn projection_ty_follows_chain() {
        let locals = vec![MirLocalDecl::new(
            Mutability::Not,
            MirTy::Ref(
                Box::new(MirTy::Tuple(vec![MirTy::Bool, option_int()])),
                Mutability::Not,
            ),
            MirSourceInfo::outermost(MirSpan::DUMMY),
        )];

        let place = MirPlace::from_local(MirLocal(0))
            .project_deeper(MirProjectionElem::Deref)
            .project_deeper(MirProjectionElem::Field(1))
            .project_deeper(MirProjectionElem::Downcast(1))
            .project_deeper(MirProjectionElem::Field(0));

        let place_ty = place.ty(&locals).unwrap();
        assert_eq!(place_ty.ty, MirTy::Int);
        assert_eq!(place_ty.variant_index, None);
    }

    #[test]
    fn projection_ty_rejects_inconsistency() {
        let locals = vec![MirLocalDecl::new(
            Mutability::Not,
            MirTy::Bool,
            MirSourceInfo::outermost(MirSpan::DUMMY),
        )];

        // deref of a non-reference
        let place = MirPlace::from_local(MirLocal(0)).project_deeper(MirProjectionElem::Deref);
        assert!(place.ty(&locals).is_none());

        // field out of bounds
        let locals = vec![MirLocalDecl::new(
            Mutability::Not,
            MirTy::Tuple(vec![MirTy::Int]),
            MirSourceInfo::outermost(MirSpan::DUMMY),
        )];
        let place = MirPlace::from_local(MirLocal(0)).project_deeper(MirProjectionElem::Field(4));
        assert!(place.ty(&locals).is_none());

        // multi-variant adt requires a downcast before field access
        let locals = vec![MirLocalDecl::new(
            Mutability::Not,
            option_int(),
            MirSourceInfo::outermost(MirSpan::DUMMY),
        )];
        let place = MirPlace::from_local(MirLocal(0)).project_deeper(MirProjectionElem::Field(0));
        assert!(place.ty(&locals).is_none());
    }

    #[test]
    fn local_kinds() {
        let body = MirBody {
            basic_blocks: vec![MirBasicBlock::new(terminator(MirTerminatorKind::Return))],
            local_decls: vec![
                MirLocalDecl::new(
                    Mutability::Mut,
                    MirTy::Unit,
                    MirSourceInfo::outermost(MirSpan::DUMMY),
                );
                3
            ],
            source_scopes: vec![MirSourceScope {
                span: MirSpan::DUMMY,
                parent_scope: None,
            }],
            var_debug_info: vec![],
            arg_count: 1,
            span: MirSpan::DUMMY,
        };
        assert_eq!(
            body.local_kind(MirBody::RETURN_PLACE),
            MirLocalKind::ReturnPointer
        );
        assert_eq!(body.local_kind(MirLocal(1)), MirLocalKind::Arg);
        assert_eq!(body.local_kind(MirLocal(2)), MirLocalKind::Temp);
    }

    #[test]
    fn serde_round_trip() {
        let body = MirBody {
            basic_blocks: vec![MirBasicBlock {
                statements: vec![MirStatement {
                    source_info: MirSourceInfo::outermost(MirSpan::new(0, 5)),
                    kind: MirStatementKind::Assign(
                        MirPlace::from_local(MirLocal(0)),
                        MirRvalue::BinaryOp(
                            MirBinOp::Add,
                            Box::new((unit_constant(), unit_constant())),
                        ),
                    ),
                }],
                terminator: terminator(MirTerminatorKind::Return),
                is_cleanup: false,
            }],
            local_decls: vec![MirLocalDecl::new(
                Mutability::Mut,
                MirTy::Int,
                MirSourceInfo::outermost(MirSpan::DUMMY),
            )],
            source_scopes: vec![MirSourceScope {
                span: MirSpan::new(0, 10),
                parent_scope: None,
            }],
            var_debug_info: vec![],
            arg_count: 0,
            span: MirSpan::new(0, 10),
        };
        let json = serde_json::to_string(&body).unwrap();
        let back: MirBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body);
    }
}
