//! The module container: channels, functions, and procs.

use crate::structure::Block;
use crate::types::Type;
use weft_utils::Id;

/// Module-scoped handle to a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub(crate) u32);

/// Module-scoped handle to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChanRef(pub(crate) u32);

/// A channel declaration.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: Id,
    /// The translated element type.
    pub ty: Type,
    pub send_supported: bool,
    pub recv_supported: bool,
}

/// A function. The block's arguments are the parameters; the terminator is
/// a `return`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Id,
    pub ret_ty: Type,
    pub body: Block,
}

/// A proc. The block's arguments are the state elements; the terminator is
/// a `yield` carrying the next state, in state element order.
#[derive(Debug, Clone)]
pub struct Proc {
    pub name: Id,
    /// State element names, parallel to the block arguments.
    pub state_names: Vec<Id>,
    pub body: Block,
}

/// A translated module.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Id,
    channels: Vec<Channel>,
    functions: Vec<Function>,
    procs: Vec<Proc>,
}

impl Module {
    pub fn new(name: Id) -> Self {
        Module {
            name,
            channels: Vec::new(),
            functions: Vec::new(),
            procs: Vec::new(),
        }
    }

    pub fn add_channel(&mut self, channel: Channel) -> ChanRef {
        self.channels.push(channel);
        ChanRef(self.channels.len() as u32 - 1)
    }

    /// Register a function. The body may still be empty; it is installed
    /// through [Module::function_mut] once built.
    pub fn add_function(&mut self, function: Function) -> FuncRef {
        self.functions.push(function);
        FuncRef(self.functions.len() as u32 - 1)
    }

    pub fn add_proc(&mut self, proc: Proc) {
        self.procs.push(proc);
    }

    pub fn channel(&self, chan: ChanRef) -> &Channel {
        &self.channels[chan.0 as usize]
    }

    pub fn function(&self, func: FuncRef) -> &Function {
        &self.functions[func.0 as usize]
    }

    pub fn function_mut(&mut self, func: FuncRef) -> &mut Function {
        &mut self.functions[func.0 as usize]
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn procs(&self) -> &[Proc] {
        &self.procs
    }
}
