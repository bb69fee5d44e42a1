//! Operations, values, and blocks of the target representation.

use crate::apint::ApInt;
use crate::module::{ChanRef, FuncRef};
use crate::types::Type;
use smallvec::SmallVec;

/// An SSA value inside one block: either a block argument or one result of
/// an earlier operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// The `index`-th block argument.
    Arg(u32),
    /// The `index`-th result of the `op`-th operation of the block.
    Result { op: u32, index: u32 },
}

/// Two-operand integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinKind {
    Add,
    Sub,
    Umul,
    Smul,
    Sdiv,
    Udiv,
    Smod,
    Umod,
    Shll,
    Shrl,
    Shra,
}

/// Two-operand comparisons, all returning `i1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

/// One-operand integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnKind {
    Identity,
    Neg,
    Not,
    Reverse,
}

/// Variadic bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    And,
    Or,
    Xor,
}

/// The closed catalog of target operations. The operand layout of each kind
/// is documented where it is not obvious; result types live in
/// [Operation::results].
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    Constant(ApInt),
    Binary(BinKind),
    Compare(CmpKind),
    Unary(UnKind),
    Variadic(VarKind),
    /// The result type carries the destination width.
    ZeroExt,
    SignExt,
    Tuple,
    TupleIndex {
        index: u64,
    },
    Array,
    /// Operands are `[array, index]`.
    ArrayIndex,
    /// Operands are `[array, value, index]`.
    ArrayUpdate,
    /// Operands are `[array, start]`; the result type carries the slice
    /// size.
    ArraySlice,
    ArrayConcat,
    BitSlice {
        start: u64,
    },
    /// Operands are `[to_update, start, update_value]`.
    BitSliceUpdate,
    Concat,
    Encode,
    Decode,
    OneHot {
        lsb_priority: bool,
    },
    /// Operands are `[selector, case...]`.
    OneHotSel,
    /// Operands are `[selector, case..., default]`.
    PrioritySel,
    /// Operands are `[selector, case...]` plus a trailing default when
    /// `has_default` is set.
    Sel {
        has_default: bool,
    },
    Call(FuncRef),
    Map(FuncRef),
    AfterAll,
    /// Operands are `[token, data]` or `[token, data, predicate]`; the
    /// result is the output token.
    Send {
        channel: ChanRef,
        predicated: bool,
    },
    /// Operands are `[token]` or `[token, predicate]`. Two results:
    /// `(token, data)`.
    BlockingReceive {
        channel: ChanRef,
        predicated: bool,
    },
    /// Like [OpKind::BlockingReceive] but with a third `i1` result that is
    /// set when data was present.
    NonblockingReceive {
        channel: ChanRef,
        predicated: bool,
    },
    /// Merges the predicated writes of one state element. Operands are
    /// `[predicate..., value...]`, the same number of each.
    NextValue,
    /// Proc terminator: the next state values, in state element order.
    Yield,
    /// Function terminator.
    Return,
}

impl OpKind {
    /// The mnemonic used in the printed form.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Constant(_) => "constant",
            OpKind::Binary(BinKind::Add) => "add",
            OpKind::Binary(BinKind::Sub) => "sub",
            OpKind::Binary(BinKind::Umul) => "umul",
            OpKind::Binary(BinKind::Smul) => "smul",
            OpKind::Binary(BinKind::Sdiv) => "sdiv",
            OpKind::Binary(BinKind::Udiv) => "udiv",
            OpKind::Binary(BinKind::Smod) => "smod",
            OpKind::Binary(BinKind::Umod) => "umod",
            OpKind::Binary(BinKind::Shll) => "shll",
            OpKind::Binary(BinKind::Shrl) => "shrl",
            OpKind::Binary(BinKind::Shra) => "shra",
            OpKind::Compare(CmpKind::Eq) => "eq",
            OpKind::Compare(CmpKind::Ne) => "ne",
            OpKind::Compare(CmpKind::Slt) => "slt",
            OpKind::Compare(CmpKind::Sle) => "sle",
            OpKind::Compare(CmpKind::Sgt) => "sgt",
            OpKind::Compare(CmpKind::Sge) => "sge",
            OpKind::Compare(CmpKind::Ult) => "ult",
            OpKind::Compare(CmpKind::Ule) => "ule",
            OpKind::Compare(CmpKind::Ugt) => "ugt",
            OpKind::Compare(CmpKind::Uge) => "uge",
            OpKind::Unary(UnKind::Identity) => "identity",
            OpKind::Unary(UnKind::Neg) => "neg",
            OpKind::Unary(UnKind::Not) => "not",
            OpKind::Unary(UnKind::Reverse) => "reverse",
            OpKind::Variadic(VarKind::And) => "and",
            OpKind::Variadic(VarKind::Or) => "or",
            OpKind::Variadic(VarKind::Xor) => "xor",
            OpKind::ZeroExt => "zero_ext",
            OpKind::SignExt => "sign_ext",
            OpKind::Tuple => "tuple",
            OpKind::TupleIndex { .. } => "tuple_index",
            OpKind::Array => "array",
            OpKind::ArrayIndex => "array_index",
            OpKind::ArrayUpdate => "array_update",
            OpKind::ArraySlice => "array_slice",
            OpKind::ArrayConcat => "array_concat",
            OpKind::BitSlice { .. } => "bit_slice",
            OpKind::BitSliceUpdate => "bit_slice_update",
            OpKind::Concat => "concat",
            OpKind::Encode => "encode",
            OpKind::Decode => "decode",
            OpKind::OneHot { .. } => "one_hot",
            OpKind::OneHotSel => "one_hot_sel",
            OpKind::PrioritySel => "priority_sel",
            OpKind::Sel { .. } => "sel",
            OpKind::Call(_) => "call",
            OpKind::Map(_) => "map",
            OpKind::AfterAll => "after_all",
            OpKind::Send { .. } => "send",
            OpKind::BlockingReceive { .. } => "blocking_receive",
            OpKind::NonblockingReceive { .. } => "nonblocking_receive",
            OpKind::NextValue => "next_value",
            OpKind::Yield => "yield",
            OpKind::Return => "return",
        }
    }
}

/// One operation. Most operations have exactly one result; receives have
/// two or three, terminators none.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OpKind,
    pub operands: SmallVec<[Value; 2]>,
    pub results: SmallVec<[Type; 1]>,
}

/// A single basic block. Function and proc bodies are one block each; the
/// last operation is the terminator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    /// Argument types: function parameters or proc state elements.
    pub args: Vec<Type>,
    pub ops: Vec<Operation>,
}

impl Block {
    /// The type of a value defined in this block.
    pub fn value_type(&self, value: Value) -> &Type {
        match value {
            Value::Arg(i) => &self.args[i as usize],
            Value::Result { op, index } => {
                &self.ops[op as usize].results[index as usize]
            }
        }
    }
}
