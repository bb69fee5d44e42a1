//! An interface for appending operations to a block.

use crate::structure::{Block, OpKind, Operation, Value};
use crate::types::Type;
use smallvec::SmallVec;

/// Appends operations to one block and hands back the [Value]s they define.
pub struct Builder<'a> {
    block: &'a mut Block,
}

impl<'a> Builder<'a> {
    pub fn new(block: &'a mut Block) -> Self {
        Builder { block }
    }

    /// The `index`-th block argument.
    pub fn arg(&self, index: usize) -> Value {
        debug_assert!(index < self.block.args.len());
        Value::Arg(index as u32)
    }

    /// Append a single-result operation.
    pub fn build(
        &mut self,
        kind: OpKind,
        operands: SmallVec<[Value; 2]>,
        result: Type,
    ) -> Value {
        let op = self.push(kind, operands, [result].into_iter().collect());
        Value::Result { op, index: 0 }
    }

    /// Append a multi-result operation.
    pub fn build_multi(
        &mut self,
        kind: OpKind,
        operands: SmallVec<[Value; 2]>,
        results: SmallVec<[Type; 1]>,
    ) -> Vec<Value> {
        let count = results.len();
        let op = self.push(kind, operands, results);
        (0..count as u32)
            .map(|index| Value::Result { op, index })
            .collect()
    }

    /// Append the block terminator.
    pub fn terminate(
        &mut self,
        kind: OpKind,
        operands: SmallVec<[Value; 2]>,
    ) {
        self.push(kind, operands, SmallVec::new());
    }

    pub fn value_type(&self, value: Value) -> &Type {
        self.block.value_type(value)
    }

    fn push(
        &mut self,
        kind: OpKind,
        operands: SmallVec<[Value; 2]>,
        results: SmallVec<[Type; 1]>,
    ) -> u32 {
        self.block.ops.push(Operation {
            kind,
            operands,
            results,
        });
        self.block.ops.len() as u32 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::BinKind;
    use smallvec::smallvec;

    #[test]
    fn values_index_into_the_block() {
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
        assert_eq!(sum, Value::Result { op: 0, index: 0 });
        assert_eq!(builder.value_type(sum), &Type::int(8));
        builder.terminate(OpKind::Return, smallvec![sum]);
        assert_eq!(block.ops.len(), 2);
        assert!(block.ops[1].results.is_empty());
    }
}
