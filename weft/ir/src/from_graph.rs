//! Translation of a parsed source package into a target [Module].
//!
//! The traversal is a straight-line topological walk: channels first, then
//! functions, then procs, and within each body the nodes in their given
//! order. Each node's operands therefore already have translated values by
//! the time the node is visited; a miss is a hard error. Translation is
//! fail-fast: the first error aborts the whole package.

use crate::builder::Builder;
use crate::module::{ChanRef, Channel, FuncRef, Function, Module, Proc};
use crate::structure::{
    BinKind, Block, CmpKind, OpKind, UnKind, Value, VarKind,
};
use crate::types::Type;
use crate::ApInt;
use baa::{BitVecOps, BitVecValue};
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;
use weft_frontend::ast;
use weft_utils::{Error, Id, WeftResult};

/// Translate a parsed package into a target module.
pub fn graph_to_ir(pkg: &ast::Package) -> WeftResult<Module> {
    let mut module = Module::new(pkg.name);
    let mut ctx = PackageContext::default();
    for channel in &pkg.channels {
        translate_channel(channel, &mut module, &mut ctx)?;
    }
    for function in &pkg.functions {
        log::debug!("translating function `{}'", function.name);
        translate_function(function, &mut module, &mut ctx)?;
    }
    for proc in &pkg.procs {
        log::debug!("translating proc `{}'", proc.name);
        translate_proc(proc, &mut module, &ctx)?;
    }
    Ok(module)
}

////////////////////////// Symbol Contexts /////////////////////////

/// Package-wide name resolution: function names and channel names, each in
/// its own namespace. Insert-once; lookups of absent names are errors.
#[derive(Default)]
struct PackageContext {
    functions: HashMap<Id, FuncRef>,
    /// Channel handle plus the translated element type, so receives can
    /// shape their results without revisiting the declaration.
    channels: HashMap<Id, (ChanRef, Type)>,
}

impl PackageContext {
    fn add_function(&mut self, name: Id, func: FuncRef) -> WeftResult<()> {
        if self.functions.contains_key(&name) {
            return Err(Error::already_bound(name, "function".to_string()));
        }
        self.functions.insert(name, func);
        Ok(())
    }

    fn function(&self, name: Id) -> WeftResult<FuncRef> {
        self.functions
            .get(&name)
            .copied()
            .ok_or_else(|| Error::undefined(name, "function".to_string()))
    }

    fn add_channel(
        &mut self,
        name: Id,
        chan: ChanRef,
        ty: Type,
    ) -> WeftResult<()> {
        if self.channels.contains_key(&name) {
            return Err(Error::already_bound(name, "channel".to_string()));
        }
        self.channels.insert(name, (chan, ty));
        Ok(())
    }

    fn channel(&self, name: Id) -> WeftResult<(ChanRef, &Type)> {
        self.channels
            .get(&name)
            .map(|(chan, ty)| (*chan, ty))
            .ok_or_else(|| Error::undefined(name, "channel".to_string()))
    }
}

/// Per-body name resolution: node identity to translated value, plus (for
/// procs only) state element name to the value it reads as this tick.
struct FunctionContext {
    is_proc: bool,
    values: HashMap<ast::NodeId, Value>,
    state_elements: HashMap<Id, Value>,
}

impl FunctionContext {
    fn new(is_proc: bool) -> Self {
        FunctionContext {
            is_proc,
            values: HashMap::new(),
            state_elements: HashMap::new(),
        }
    }

    /// Record the translated value of `node`. Every node is bound exactly
    /// once; a rebind attempt leaves the original binding in place.
    fn bind(&mut self, node: &ast::Node, value: Value) -> WeftResult<()> {
        if self.values.contains_key(&node.id) {
            return Err(Error::already_bound(
                node.name,
                "value".to_string(),
            ));
        }
        self.values.insert(node.id, value);
        Ok(())
    }

    fn value(&self, node: &ast::Node) -> WeftResult<Value> {
        self.values
            .get(&node.id)
            .copied()
            .ok_or_else(|| Error::undefined(node.name, "value".to_string()))
    }

    // The state element accessors are gated to procs. Calling them while
    // translating a function is a dispatch defect, not an input error.

    fn bind_state_element(
        &mut self,
        name: Id,
        value: Value,
    ) -> WeftResult<()> {
        assert!(self.is_proc, "state elements exist only in procs");
        if self.state_elements.contains_key(&name) {
            return Err(Error::already_bound(
                name,
                "state element".to_string(),
            ));
        }
        self.state_elements.insert(name, value);
        Ok(())
    }

    fn state_element(&self, name: Id) -> WeftResult<Value> {
        assert!(self.is_proc, "state elements exist only in procs");
        self.state_elements
            .get(&name)
            .copied()
            .ok_or_else(|| {
                Error::undefined(name, "state element".to_string())
            })
    }
}

////////////////////////// Type & Literal Translation /////////////////////////

/// Translate a source type. Total over all four source type shapes and
/// structure preserving.
pub fn translate_type(ty: &ast::Type) -> Type {
    match ty {
        ast::Type::Bits { width } => Type::int(*width),
        ast::Type::Tuple(elements) => {
            Type::Tuple(elements.iter().map(translate_type).collect())
        }
        ast::Type::Array { size, element } => {
            Type::array(*size, translate_type(element))
        }
        ast::Type::Token => Type::Token,
    }
}

/// Translate a bit-vector literal, preserving width and bit pattern.
pub fn translate_bits(value: &BitVecValue) -> ApInt {
    ApInt::from_bytes_le(&value.to_bytes_le(), u64::from(value.width()))
}

////////////////////////// Operation Translation /////////////////////////

fn internal_dispatch(node: &ast::Node) -> Error {
    Error::internal(format!(
        "`{}' node `{}' must not reach the generic dispatcher",
        node.op.name(),
        node.name
    ))
}

fn unsupported(node: &ast::Node) -> Error {
    Error::unimplemented(format!(
        "`{}' operations have no counterpart in the target form",
        node.op.name()
    ))
}

/// Translate one ordinary node and bind its single result. `Param`,
/// `StateRead`, and `NextValue` nodes are the body traversals' business and
/// are rejected here.
fn translate_node(
    nodes: &[ast::Node],
    node: &ast::Node,
    pkg: &PackageContext,
    ctx: &mut FunctionContext,
    builder: &mut Builder,
) -> WeftResult<()> {
    // Operands are resolved up front; every kind below consumes this list.
    let operands = node
        .operands
        .iter()
        .map(|id| ctx.value(&nodes[id.idx()]))
        .collect::<WeftResult<SmallVec<[Value; 2]>>>()?;
    let operand_ty = |i: usize| &nodes[node.operands[i].idx()].ty;

    let value = match &node.op {
        ast::OpKind::Param
        | ast::OpKind::StateRead { .. }
        | ast::OpKind::NextValue { .. } => {
            return Err(internal_dispatch(node))
        }

        ast::OpKind::Literal(bits) => match &node.ty {
            ast::Type::Bits { .. } => {
                let constant = translate_bits(bits);
                let width = constant.width();
                builder.build(
                    OpKind::Constant(constant),
                    operands,
                    Type::int(width),
                )
            }
            other => {
                return Err(Error::unimplemented(format!(
                    "literals of type `{other}'"
                )))
            }
        },

        ast::OpKind::Arith(op) => {
            let kind = match op {
                ast::ArithOp::Umul => BinKind::Umul,
                ast::ArithOp::Smul => BinKind::Smul,
            };
            builder.build(
                OpKind::Binary(kind),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::Compare(op) => {
            let kind = match op {
                ast::CompareOp::Eq => CmpKind::Eq,
                ast::CompareOp::Ne => CmpKind::Ne,
                ast::CompareOp::Slt => CmpKind::Slt,
                ast::CompareOp::Sle => CmpKind::Sle,
                ast::CompareOp::Sgt => CmpKind::Sgt,
                ast::CompareOp::Sge => CmpKind::Sge,
                ast::CompareOp::Ult => CmpKind::Ult,
                ast::CompareOp::Ule => CmpKind::Ule,
                ast::CompareOp::Ugt => CmpKind::Ugt,
                ast::CompareOp::Uge => CmpKind::Uge,
            };
            // Comparisons always produce a single bit.
            builder.build(OpKind::Compare(kind), operands, Type::int(1))
        }

        ast::OpKind::Binary(op) => {
            let kind = match op {
                ast::BinOp::Add => BinKind::Add,
                ast::BinOp::Sub => BinKind::Sub,
                ast::BinOp::Sdiv => BinKind::Sdiv,
                ast::BinOp::Udiv => BinKind::Udiv,
                ast::BinOp::Smod => BinKind::Smod,
                ast::BinOp::Umod => BinKind::Umod,
                ast::BinOp::Shll => BinKind::Shll,
                ast::BinOp::Shrl => BinKind::Shrl,
                ast::BinOp::Shra => BinKind::Shra,
            };
            builder.build(
                OpKind::Binary(kind),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::Unary(op) => {
            let kind = match op {
                ast::UnOp::Identity => UnKind::Identity,
                ast::UnOp::Neg => UnKind::Neg,
                ast::UnOp::Not => UnKind::Not,
                ast::UnOp::Reverse => UnKind::Reverse,
            };
            builder.build(
                OpKind::Unary(kind),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::Extend { signed, new_width } => {
            let kind = if *signed {
                OpKind::SignExt
            } else {
                OpKind::ZeroExt
            };
            builder.build(kind, operands, Type::int(*new_width))
        }

        ast::OpKind::Tuple => builder.build(
            OpKind::Tuple,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::TupleIndex { index } => builder.build(
            OpKind::TupleIndex { index: *index },
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::Array => builder.build(
            OpKind::Array,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::ArrayIndex => {
            // Operands are [array, index...]. Only a single index
            // dimension translates.
            if operands.len() != 2 {
                return Err(Error::unimplemented(format!(
                    "array_index with {} index dimensions",
                    operands.len() - 1
                )));
            }
            builder.build(
                OpKind::ArrayIndex,
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::ArrayUpdate => {
            // Operands are [array, value, index...].
            if operands.len() != 3 {
                return Err(Error::unimplemented(format!(
                    "array_update with {} index dimensions",
                    operands.len() - 2
                )));
            }
            builder.build(
                OpKind::ArrayUpdate,
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::ArrayConcat => builder.build(
            OpKind::ArrayConcat,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::ArraySlice { .. } => builder.build(
            OpKind::ArraySlice,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::BitSlice { start, width } => builder.build(
            OpKind::BitSlice { start: *start },
            operands,
            Type::int(*width),
        ),

        ast::OpKind::BitSliceUpdate => {
            // The result keeps the full width of the value being updated.
            let width = operand_ty(0).flat_bit_count();
            builder.build(
                OpKind::BitSliceUpdate,
                operands,
                Type::int(width),
            )
        }

        ast::OpKind::Concat => {
            // The result width is the exact sum of the operand widths.
            let width: u64 = (0..node.operands.len())
                .map(|i| operand_ty(i).flat_bit_count())
                .sum();
            builder.build(OpKind::Concat, operands, Type::int(width))
        }

        ast::OpKind::Nary(op) => {
            let kind = match op {
                ast::NaryOp::And => VarKind::And,
                ast::NaryOp::Or => VarKind::Or,
                ast::NaryOp::Xor => VarKind::Xor,
                ast::NaryOp::Nand | ast::NaryOp::Nor => {
                    return Err(unsupported(node))
                }
            };
            builder.build(
                OpKind::Variadic(kind),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::Encode => builder.build(
            OpKind::Encode,
            operands,
            Type::int(node.ty.flat_bit_count()),
        ),

        ast::OpKind::Decode => builder.build(
            OpKind::Decode,
            operands,
            Type::int(node.ty.flat_bit_count()),
        ),

        ast::OpKind::OneHot { lsb_priority } => builder.build(
            OpKind::OneHot {
                lsb_priority: *lsb_priority,
            },
            operands,
            Type::int(node.ty.flat_bit_count()),
        ),

        ast::OpKind::OneHotSelect => builder.build(
            OpKind::OneHotSel,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::PrioritySelect => builder.build(
            OpKind::PrioritySel,
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::Select { has_default } => builder.build(
            OpKind::Sel {
                has_default: *has_default,
            },
            operands,
            translate_type(&node.ty),
        ),

        ast::OpKind::Invoke { to_apply } => {
            let func = pkg.function(*to_apply)?;
            builder.build(
                OpKind::Call(func),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::Map { to_apply } => {
            let func = pkg.function(*to_apply)?;
            builder.build(
                OpKind::Map(func),
                operands,
                translate_type(&node.ty),
            )
        }

        ast::OpKind::AfterAll => {
            builder.build(OpKind::AfterAll, operands, Type::Token)
        }

        ast::OpKind::Send {
            channel,
            predicated,
        } => {
            let (chan, _) = pkg.channel(*channel)?;
            builder.build(
                OpKind::Send {
                    channel: chan,
                    predicated: *predicated,
                },
                operands,
                Type::Token,
            )
        }

        ast::OpKind::Receive {
            channel,
            blocking,
            predicated,
        } => {
            let (chan, data_ty) = pkg.channel(*channel)?;
            // A receive defines two or three results; the target form
            // hands back a single value per node, so the components are
            // packed into a tuple.
            let mut results: SmallVec<[Type; 1]> =
                smallvec![Type::Token, data_ty.clone()];
            let kind = if *blocking {
                OpKind::BlockingReceive {
                    channel: chan,
                    predicated: *predicated,
                }
            } else {
                results.push(Type::int(1));
                OpKind::NonblockingReceive {
                    channel: chan,
                    predicated: *predicated,
                }
            };
            let tuple_ty = Type::Tuple(results.to_vec());
            let parts = builder.build_multi(kind, operands, results);
            builder.build(
                OpKind::Tuple,
                parts.into_iter().collect(),
                tuple_ty,
            )
        }

        ast::OpKind::Reduce(_)
        | ast::OpKind::PartialProduct { .. }
        | ast::OpKind::Assert
        | ast::OpKind::Cover
        | ast::OpKind::Gate
        | ast::OpKind::MinDelay { .. }
        | ast::OpKind::RegisterRead { .. }
        | ast::OpKind::RegisterWrite { .. } => {
            return Err(unsupported(node))
        }
    };

    ctx.bind(node, value)
}

////////////////////////// Channel Translation /////////////////////////

fn translate_channel(
    channel: &ast::Channel,
    module: &mut Module,
    ctx: &mut PackageContext,
) -> WeftResult<()> {
    let ty = translate_type(&channel.ty);
    let chan = module.add_channel(Channel {
        name: channel.name,
        ty: ty.clone(),
        send_supported: channel.can_send,
        recv_supported: channel.can_receive,
    });
    ctx.add_channel(channel.name, chan, ty)
}

////////////////////////// Function Translation /////////////////////////

fn translate_function(
    function: &ast::Function,
    module: &mut Module,
    pkg: &mut PackageContext,
) -> WeftResult<()> {
    let args = function
        .params
        .iter()
        .map(|id| translate_type(&function.node(*id).ty))
        .collect();

    // Register the function before its body so the name participates in
    // duplicate detection even when the body fails to translate.
    let func = module.add_function(Function {
        name: function.name,
        ret_ty: translate_type(&function.ret_ty),
        body: Block::default(),
    });
    pkg.add_function(function.name, func)?;

    let mut block = Block {
        args,
        ops: Vec::new(),
    };
    let mut builder = Builder::new(&mut block);
    let mut ctx = FunctionContext::new(false);

    for (i, id) in function.params.iter().enumerate() {
        ctx.bind(function.node(*id), builder.arg(i))?;
    }
    for node in &function.nodes {
        if matches!(node.op, ast::OpKind::Param) {
            continue;
        }
        translate_node(&function.nodes, node, pkg, &mut ctx, &mut builder)?;
    }

    let ret = ctx.value(function.node(function.ret))?;
    builder.terminate(OpKind::Return, smallvec![ret]);
    module.function_mut(func).body = block;
    Ok(())
}

////////////////////////// Proc Translation /////////////////////////

/// How a proc defines the next value of its state elements. Probed once per
/// proc, before traversal; the two styles are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateStyle {
    /// Designated marker nodes, one or more state elements each. The last
    /// marked write in traversal order wins per element.
    Legacy,
    /// Explicit `next_value` nodes, merged per element when predicated.
    NextValueNodes,
}

/// One pending write collected from a `next_value` node.
struct StateWrite {
    predicate: Option<Value>,
    value: Value,
}

fn translate_proc(
    proc: &ast::Proc,
    module: &mut Module,
    pkg: &PackageContext,
) -> WeftResult<()> {
    let style = if proc.has_next_value_nodes() {
        StateStyle::NextValueNodes
    } else {
        StateStyle::Legacy
    };

    let mut block = Block {
        args: proc.state.iter().map(|s| translate_type(&s.ty)).collect(),
        ops: Vec::new(),
    };
    let mut builder = Builder::new(&mut block);
    let mut ctx = FunctionContext::new(true);

    let mut state_index = HashMap::new();
    for (i, element) in proc.state.iter().enumerate() {
        ctx.bind_state_element(element.name, builder.arg(i))?;
        state_index.insert(element.name, i);
    }

    // Pending next-value writes, indexed by state element, in traversal
    // order.
    let mut writes: Vec<Vec<StateWrite>> = Vec::new();
    writes.resize_with(proc.state.len(), Vec::new);
    // Legacy next-state markers, filled in as their nodes are visited.
    let mut marked: Vec<Option<Value>> = vec![None; proc.state.len()];

    for node in &proc.nodes {
        match &node.op {
            ast::OpKind::StateRead { state_element } => {
                // A state read is the entry-block argument of its element.
                let value = ctx.state_element(*state_element)?;
                ctx.bind(node, value)?;
            }
            ast::OpKind::NextValue { predicated } => {
                debug_assert_eq!(style, StateStyle::NextValueNodes);
                let read = proc.node(node.operands[0]);
                let ast::OpKind::StateRead { state_element } = &read.op
                else {
                    return Err(Error::internal(format!(
                        "next_value node `{}' does not target a state read",
                        node.name
                    )));
                };
                let index =
                    state_index.get(state_element).copied().ok_or_else(
                        || {
                            Error::undefined(
                                *state_element,
                                "state element".to_string(),
                            )
                        },
                    )?;
                writes[index].push(StateWrite {
                    predicate: if *predicated {
                        Some(ctx.value(&proc.nodes[node.operands[2].idx()])?)
                    } else {
                        None
                    },
                    value: ctx.value(&proc.nodes[node.operands[1].idx()])?,
                });
            }
            _ => translate_node(
                &proc.nodes,
                node,
                pkg,
                &mut ctx,
                &mut builder,
            )?,
        }
        if style == StateStyle::Legacy {
            // Later marked writes shadow earlier ones. State reads can be
            // markers too, so this check covers every node kind.
            for index in proc.next_state_indices(node.id) {
                marked[index] = Some(ctx.value(node)?);
            }
        }
    }

    // Close the tick: resolve each state element's next value and yield
    // them in declaration order.
    let mut yields: SmallVec<[Value; 2]> =
        SmallVec::with_capacity(proc.state.len());
    for (i, element) in proc.state.iter().enumerate() {
        let next = match style {
            StateStyle::Legacy => marked[i].take().ok_or_else(|| {
                Error::internal(format!(
                    "state element `{}' has no next-state marker",
                    element.name
                ))
            })?,
            StateStyle::NextValueNodes => {
                resolve_writes(element, std::mem::take(&mut writes[i]), &mut builder)?
            }
        };
        yields.push(next);
    }
    builder.terminate(OpKind::Yield, yields);

    module.add_proc(Proc {
        name: proc.name,
        state_names: proc.state.iter().map(|s| s.name).collect(),
        body: block,
    });
    Ok(())
}

/// Resolve the collected `next_value` writes of one state element. A single
/// unpredicated writer passes its value through; any other combination
/// merges, which requires every writer to carry a predicate.
fn resolve_writes(
    element: &ast::StateElement,
    writes: Vec<StateWrite>,
    builder: &mut Builder,
) -> WeftResult<Value> {
    match writes.as_slice() {
        [] => Err(Error::internal(format!(
            "state element `{}' has no next-value writer",
            element.name
        ))),
        [StateWrite {
            predicate: None,
            value,
        }] => Ok(*value),
        _ => {
            let mut operands: SmallVec<[Value; 2]> =
                SmallVec::with_capacity(writes.len() * 2);
            for write in &writes {
                operands.push(write.predicate.ok_or_else(|| {
                    Error::internal(format!(
                        "state element `{}' has multiple writers but one \
                         carries no predicate",
                        element.name
                    ))
                })?);
            }
            operands.extend(writes.iter().map(|w| w.value));
            Ok(builder.build(
                OpKind::NextValue,
                operands,
                translate_type(&element.ty),
            ))
        }
    }
}
