//! Renders a [Module] in its textual form.

use crate::module::{Channel, Function, Module, Proc};
use crate::structure::{Block, OpKind, Operation, Value};
use itertools::Itertools;
use std::io;

/// Printer for the textual form of a translated module.
///
/// Values print as `%argN` (block arguments) or `%N` (the result of the
/// `N`-th operation); results of multi-result operations are selected with
/// `%N#k`.
pub struct Printer;

impl Printer {
    pub fn write_module<F: io::Write>(
        module: &Module,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "module @{} {{", module.name)?;
        for channel in module.channels() {
            Self::write_channel(channel, f)?;
        }
        for function in module.functions() {
            Self::write_function(module, function, f)?;
        }
        for proc in module.procs() {
            Self::write_proc(module, proc, f)?;
        }
        writeln!(f, "}}")
    }

    fn write_channel<F: io::Write>(
        channel: &Channel,
        f: &mut F,
    ) -> io::Result<()> {
        let dir = match (channel.send_supported, channel.recv_supported) {
            (true, true) => "send_receive",
            (true, false) => "send",
            (false, true) => "receive",
            (false, false) => "none",
        };
        writeln!(f, "  chan @{} : {} ({dir})", channel.name, channel.ty)
    }

    fn write_function<F: io::Write>(
        module: &Module,
        function: &Function,
        f: &mut F,
    ) -> io::Result<()> {
        let params = function
            .body
            .args
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("%arg{i}: {ty}"))
            .join(", ");
        writeln!(
            f,
            "  func @{}({params}) -> {} {{",
            function.name, function.ret_ty
        )?;
        Self::write_block(module, &function.body, f)?;
        writeln!(f, "  }}")
    }

    fn write_proc<F: io::Write>(
        module: &Module,
        proc: &Proc,
        f: &mut F,
    ) -> io::Result<()> {
        let params = proc
            .body
            .args
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("%arg{i}: {ty}"))
            .join(", ");
        write!(f, "  proc @{}({params})", proc.name)?;
        if !proc.state_names.is_empty() {
            write!(f, " state({})", proc.state_names.iter().join(", "))?;
        }
        writeln!(f, " {{")?;
        Self::write_block(module, &proc.body, f)?;
        writeln!(f, "  }}")
    }

    fn write_block<F: io::Write>(
        module: &Module,
        block: &Block,
        f: &mut F,
    ) -> io::Result<()> {
        for (i, op) in block.ops.iter().enumerate() {
            Self::write_op(module, block, i, op, f)?;
        }
        Ok(())
    }

    fn write_op<F: io::Write>(
        module: &Module,
        block: &Block,
        index: usize,
        op: &Operation,
        f: &mut F,
    ) -> io::Result<()> {
        write!(f, "    ")?;
        match op.results.len() {
            0 => (),
            1 => write!(f, "%{index} = ")?,
            n => write!(f, "%{index}:{n} = ")?,
        }

        write!(f, "{}", op.kind.name())?;
        match &op.kind {
            OpKind::Call(func) | OpKind::Map(func) => {
                write!(f, " @{}", module.function(*func).name)?
            }
            OpKind::Send { channel, .. }
            | OpKind::BlockingReceive { channel, .. }
            | OpKind::NonblockingReceive { channel, .. } => {
                write!(f, " @{}", module.channel(*channel).name)?
            }
            _ => (),
        }

        let mut parts: Vec<String> = op
            .operands
            .iter()
            .map(|v| Self::value_str(block, *v))
            .collect();
        match &op.kind {
            OpKind::Constant(value) => parts.push(format!("{value}")),
            OpKind::TupleIndex { index } => {
                parts.push(format!("index={index}"))
            }
            OpKind::BitSlice { start } => {
                parts.push(format!("start={start}"))
            }
            OpKind::OneHot { lsb_priority } => {
                parts.push(format!("lsb_prio={lsb_priority}"))
            }
            _ => (),
        }
        write!(f, "({})", parts.iter().join(", "))?;

        match op.results.as_slice() {
            [] => (),
            [ty] => write!(f, " : {ty}")?,
            types => {
                write!(f, " : ({})", types.iter().join(", "))?
            }
        }
        writeln!(f)
    }

    fn value_str(block: &Block, value: Value) -> String {
        match value {
            Value::Arg(i) => format!("%arg{i}"),
            Value::Result { op, index } => {
                if block.ops[op as usize].results.len() > 1 {
                    format!("%{op}#{index}")
                } else {
                    format!("%{op}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::module::Function;
    use crate::structure::BinKind;
    use crate::types::Type;
    use smallvec::smallvec;

    fn print(module: &Module) -> String {
        let mut out = Vec::new();
        Printer::write_module(module, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn print_function() {
        let mut module = Module::new("adder".into());
        let mut block = Block {
            args: vec![Type::int(8), Type::int(8)],
            ops: Vec::new(),
        };
        let mut builder = Builder::new(&mut block);
        let (x, y) = (builder.arg(0), builder.arg(1));
        let sum = builder.build(
            OpKind::Binary(BinKind::Add),
            smallvec![x, y],
            Type::int(8),
        );
        builder.terminate(OpKind::Return, smallvec![sum]);
        module.add_function(Function {
            name: "f".into(),
            ret_ty: Type::int(8),
            body: block,
        });

        assert_eq!(
            print(&module),
            "module @adder {\n\
             \x20 func @f(%arg0: i8, %arg1: i8) -> i8 {\n\
             \x20   %0 = add(%arg0, %arg1) : i8\n\
             \x20   return(%0)\n\
             \x20 }\n\
             }\n"
        );
    }

    #[test]
    fn print_multi_result_op() {
        let mut module = Module::new("pkg".into());
        let chan = module.add_channel(Channel {
            name: "ch".into(),
            ty: Type::int(32),
            send_supported: false,
            recv_supported: true,
        });
        let mut block = Block::default();
        let mut builder = Builder::new(&mut block);
        let token = builder.build(
            OpKind::AfterAll,
            smallvec![],
            Type::Token,
        );
        let parts = builder.build_multi(
            OpKind::BlockingReceive {
                channel: chan,
                predicated: false,
            },
            smallvec![token],
            smallvec![Type::Token, Type::int(32)],
        );
        let tuple = builder.build(
            OpKind::Tuple,
            parts.into_iter().collect(),
            Type::Tuple(vec![Type::Token, Type::int(32)]),
        );
        builder.terminate(OpKind::Return, smallvec![tuple]);
        module.add_function(Function {
            name: "rx".into(),
            ret_ty: Type::Tuple(vec![Type::Token, Type::int(32)]),
            body: block,
        });

        let text = print(&module);
        assert!(text.contains("chan @ch : i32 (receive)"));
        assert!(text
            .contains("%1:2 = blocking_receive @ch(%0) : (token, i32)"));
        assert!(text.contains("%2 = tuple(%1#0, %1#1)"));
    }
}
