//! In-memory representation of a parsed source package.
//!
//! A package holds channels, functions, and procs. Function and proc bodies
//! are flat, topologically ordered lists of [Node]s; a node's operands are
//! [NodeId]s of nodes that appear earlier in the list (def-before-use is a
//! structural guarantee of the parser, and a hard error in the translator).

use baa::BitVecValue;
use smallvec::SmallVec;
use weft_utils::Id;

/// A type in the source graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A bit vector of the given width.
    Bits { width: u64 },
    /// A heterogeneous tuple.
    Tuple(Vec<Type>),
    /// A fixed-size array.
    Array { size: u64, element: Box<Type> },
    /// A zero-width value used to sequence side effects.
    Token,
}

impl Type {
    pub fn bits(width: u64) -> Self {
        Type::Bits { width }
    }

    pub fn array(size: u64, element: Type) -> Self {
        Type::Array {
            size,
            element: Box::new(element),
        }
    }

    /// The number of bits needed to represent a value of this type when
    /// flattened into a single bit vector. Tokens are zero-width.
    pub fn flat_bit_count(&self) -> u64 {
        match self {
            Type::Bits { width } => *width,
            Type::Tuple(elements) => {
                elements.iter().map(Type::flat_bit_count).sum()
            }
            Type::Array { size, element } => size * element.flat_bit_count(),
            Type::Token => 0,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bits { width } => write!(f, "bits[{width}]"),
            Type::Tuple(elements) => {
                write!(f, "(")?;
                for (i, e) in elements.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Type::Array { size, element } => write!(f, "{element}[{size}]"),
            Type::Token => write!(f, "token"),
        }
    }
}

/// Function-scoped identity of a node. Also serves as the index of the node
/// in the enclosing function's or proc's node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Two-operand arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Umul,
    Smul,
}

/// Two-operand comparison operations. All produce a single-bit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
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

/// Generic two-operand operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Sdiv,
    Udiv,
    Smod,
    Umod,
    Shll,
    Shrl,
    Shra,
}

/// One-operand operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Identity,
    Neg,
    Not,
    Reverse,
}

/// Variadic bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaryOp {
    And,
    Nand,
    Nor,
    Or,
    Xor,
}

/// Bitwise reduction operations. Recognized by the parser but not supported
/// by the translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    And,
    Or,
    Xor,
}

/// The closed catalog of operation kinds. Kind-specific attributes live in
/// the variant payloads; operand edges live in [Node::operands].
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// A function parameter. Bound by the function traversal, never
    /// dispatched as an ordinary operation.
    Param,
    /// Reads a proc state element. Bound by the proc traversal.
    StateRead { state_element: Id },
    /// Provides the next value for a state element. Operands are
    /// `[state_read, value]` or `[state_read, value, predicate]`. Collected
    /// by the proc traversal, never dispatched as an ordinary operation.
    NextValue { predicated: bool },
    /// A bit-vector literal. The node's declared type determines how (and
    /// whether) the literal can be translated.
    Literal(BitVecValue),
    Arith(ArithOp),
    Compare(CompareOp),
    Binary(BinOp),
    Unary(UnOp),
    /// Zero- or sign-extension to `new_width` bits.
    Extend { signed: bool, new_width: u64 },
    /// Packs its operands into a tuple.
    Tuple,
    /// Extracts one field of a tuple operand.
    TupleIndex { index: u64 },
    /// Packs its operands into an array.
    Array,
    /// Operands are `[array, index...]`.
    ArrayIndex,
    /// Operands are `[array, value, index...]`.
    ArrayUpdate,
    ArrayConcat,
    /// Operands are `[array, start]`; `width` elements are extracted.
    ArraySlice { width: u64 },
    /// Static bit slice of a single operand.
    BitSlice { start: u64, width: u64 },
    /// Operands are `[to_update, start, update_value]`.
    BitSliceUpdate,
    /// Bit-level concatenation of all operands.
    Concat,
    Nary(NaryOp),
    Encode,
    Decode,
    OneHot { lsb_priority: bool },
    /// Operands are `[selector, case...]`.
    OneHotSelect,
    /// Operands are `[selector, case..., default]`; the default is mandatory.
    PrioritySelect,
    /// Operands are `[selector, case...]`, plus a trailing default when
    /// `has_default` is set.
    Select { has_default: bool },
    /// Calls `to_apply` with all operands as arguments.
    Invoke { to_apply: Id },
    /// Applies `to_apply` element-wise to a single array operand.
    Map { to_apply: Id },
    /// Joins all token operands into one token.
    AfterAll,
    /// Operands are `[token, data]` or `[token, data, predicate]`.
    Send { channel: Id, predicated: bool },
    /// Operands are `[token]` or `[token, predicate]`.
    Receive {
        channel: Id,
        blocking: bool,
        predicated: bool,
    },
    // Recognized kinds with no counterpart in the target form. The
    // translator rejects them explicitly instead of dropping them.
    Reduce(ReduceOp),
    PartialProduct { signed: bool },
    Assert,
    Cover,
    Gate,
    MinDelay { delay: u64 },
    RegisterRead { register: Id },
    RegisterWrite { register: Id },
}

impl OpKind {
    /// The textual mnemonic of this kind, as written in the source format.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Param => "param",
            OpKind::StateRead { .. } => "state_read",
            OpKind::NextValue { .. } => "next_value",
            OpKind::Literal(_) => "literal",
            OpKind::Arith(ArithOp::Umul) => "umul",
            OpKind::Arith(ArithOp::Smul) => "smul",
            OpKind::Compare(CompareOp::Eq) => "eq",
            OpKind::Compare(CompareOp::Ne) => "ne",
            OpKind::Compare(CompareOp::Slt) => "slt",
            OpKind::Compare(CompareOp::Sle) => "sle",
            OpKind::Compare(CompareOp::Sgt) => "sgt",
            OpKind::Compare(CompareOp::Sge) => "sge",
            OpKind::Compare(CompareOp::Ult) => "ult",
            OpKind::Compare(CompareOp::Ule) => "ule",
            OpKind::Compare(CompareOp::Ugt) => "ugt",
            OpKind::Compare(CompareOp::Uge) => "uge",
            OpKind::Binary(BinOp::Add) => "add",
            OpKind::Binary(BinOp::Sub) => "sub",
            OpKind::Binary(BinOp::Sdiv) => "sdiv",
            OpKind::Binary(BinOp::Udiv) => "udiv",
            OpKind::Binary(BinOp::Smod) => "smod",
            OpKind::Binary(BinOp::Umod) => "umod",
            OpKind::Binary(BinOp::Shll) => "shll",
            OpKind::Binary(BinOp::Shrl) => "shrl",
            OpKind::Binary(BinOp::Shra) => "shra",
            OpKind::Unary(UnOp::Identity) => "identity",
            OpKind::Unary(UnOp::Neg) => "neg",
            OpKind::Unary(UnOp::Not) => "not",
            OpKind::Unary(UnOp::Reverse) => "reverse",
            OpKind::Extend { signed: false, .. } => "zero_ext",
            OpKind::Extend { signed: true, .. } => "sign_ext",
            OpKind::Tuple => "tuple",
            OpKind::TupleIndex { .. } => "tuple_index",
            OpKind::Array => "array",
            OpKind::ArrayIndex => "array_index",
            OpKind::ArrayUpdate => "array_update",
            OpKind::ArrayConcat => "array_concat",
            OpKind::ArraySlice { .. } => "array_slice",
            OpKind::BitSlice { .. } => "bit_slice",
            OpKind::BitSliceUpdate => "bit_slice_update",
            OpKind::Concat => "concat",
            OpKind::Nary(NaryOp::And) => "and",
            OpKind::Nary(NaryOp::Nand) => "nand",
            OpKind::Nary(NaryOp::Nor) => "nor",
            OpKind::Nary(NaryOp::Or) => "or",
            OpKind::Nary(NaryOp::Xor) => "xor",
            OpKind::Encode => "encode",
            OpKind::Decode => "decode",
            OpKind::OneHot { .. } => "one_hot",
            OpKind::OneHotSelect => "one_hot_sel",
            OpKind::PrioritySelect => "priority_sel",
            OpKind::Select { .. } => "sel",
            OpKind::Invoke { .. } => "invoke",
            OpKind::Map { .. } => "map",
            OpKind::AfterAll => "after_all",
            OpKind::Send { .. } => "send",
            OpKind::Receive { .. } => "receive",
            OpKind::Reduce(ReduceOp::And) => "and_reduce",
            OpKind::Reduce(ReduceOp::Or) => "or_reduce",
            OpKind::Reduce(ReduceOp::Xor) => "xor_reduce",
            OpKind::PartialProduct { signed: false } => "umulp",
            OpKind::PartialProduct { signed: true } => "smulp",
            OpKind::Assert => "assert",
            OpKind::Cover => "cover",
            OpKind::Gate => "gate",
            OpKind::MinDelay { .. } => "min_delay",
            OpKind::RegisterRead { .. } => "register_read",
            OpKind::RegisterWrite { .. } => "register_write",
        }
    }
}

/// One operation in a function or proc body.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable, function-scoped identity.
    pub id: NodeId,
    /// The name the node was given in the source text.
    pub name: Id,
    pub op: OpKind,
    /// Operand edges, in operand order. Always refer to earlier nodes.
    pub operands: SmallVec<[NodeId; 2]>,
    /// The declared result type.
    pub ty: Type,
}

/// A channel declaration.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: Id,
    pub ty: Type,
    pub can_send: bool,
    pub can_receive: bool,
}

/// A pure function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Id,
    /// Ids of the `Param` nodes, in signature order.
    pub params: Vec<NodeId>,
    pub ret_ty: Type,
    /// All nodes (including params), in topological order.
    pub nodes: Vec<Node>,
    /// The designated return node.
    pub ret: NodeId,
}

impl Function {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }
}

/// Named, typed, persistent per-proc storage. Read at the start of each tick
/// and rebound at tick end.
#[derive(Debug, Clone)]
pub struct StateElement {
    pub name: Id,
    pub ty: Type,
}

/// A communicating process.
#[derive(Debug, Clone)]
pub struct Proc {
    pub name: Id,
    /// State elements in declaration order.
    pub state: Vec<StateElement>,
    /// Body nodes in topological order.
    pub nodes: Vec<Node>,
    /// Legacy next-state markers: one node id per state element, in state
    /// order. Empty when the proc uses `next_value` nodes instead. The two
    /// styles are mutually exclusive.
    pub next_state: Vec<NodeId>,
}

impl Proc {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }

    /// Does this proc use modern `next_value` nodes?
    pub fn has_next_value_nodes(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n.op, OpKind::NextValue { .. }))
    }

    /// Indices of the state elements whose next value is defined by `id`
    /// under the legacy marker scheme.
    pub fn next_state_indices(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = usize> + '_ {
        self.next_state
            .iter()
            .enumerate()
            .filter(move |(_, n)| **n == id)
            .map(|(i, _)| i)
    }
}

/// A parsed source package.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: Id,
    pub channels: Vec<Channel>,
    pub functions: Vec<Function>,
    pub procs: Vec<Proc>,
}
