//! Frontend for the weft translator.
//!
//! Defines the source dataflow graph and its parser. A parsed [ast::Package]
//! is the input to the graph-to-graph translation defined in the `weft-ir`
//! crate. The graph is immutable once parsed: operand edges are resolved to
//! [ast::NodeId]s by the parser and the translator only reads them.

pub mod ast;
pub mod parser;

pub use ast::{
    ArithOp, BinOp, Channel, CompareOp, Function, NaryOp, Node, NodeId,
    OpKind, Package, Proc, ReduceOp, StateElement, Type, UnOp,
};
pub use parser::WeftParser;
