//! Target representation of the weft translator and the graph-to-graph
//! translation that produces it.
//!
//! The entry point is [from_graph::graph_to_ir], which consumes a parsed
//! [weft_frontend::Package] and produces a [Module]. [Printer] renders a
//! module in its textual form.

mod apint;
mod builder;
pub mod from_graph;
mod module;
mod printer;
mod structure;
mod types;

pub use apint::ApInt;
pub use builder::Builder;
pub use from_graph::graph_to_ir;
pub use module::{ChanRef, Channel, FuncRef, Function, Module, Proc};
pub use printer::Printer;
pub use structure::{
    BinKind, Block, CmpKind, OpKind, Operation, UnKind, Value, VarKind,
};
pub use types::Type;
