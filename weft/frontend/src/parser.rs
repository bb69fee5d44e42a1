#![allow(clippy::upper_case_acronyms)]

//! Parser for weft source packages.
//!
//! Turns the textual form of a package into an [ast::Package]. Operand names
//! are resolved to [ast::NodeId]s here, so the graph handed to the translator
//! already has its edges in place and is def-before-use by construction.
use crate::ast::{
    self, ArithOp, BinOp, CompareOp, NaryOp, OpKind, ReduceOp, UnOp,
};
use baa::BitVecValue;
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use pest_consume::{match_nodes, Error, Parser};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use weft_utils::{Id, WeftResult};

type ParseResult<T> = Result<T, Error<Rule>>;
type Node<'i> = pest_consume::Node<'i, Rule, ()>;

// include the grammar file so that Cargo knows to rebuild this file on grammar changes
const _GRAMMAR: &str = include_str!("syntax.pest");

/// The value of a keyword argument.
#[derive(Debug, Clone)]
enum AttrValue {
    Num(BigUint),
    Bool(bool),
    Ident(Id),
    List(Vec<Id>),
}

/// One argument of an operation: positional operand or keyword attribute.
#[derive(Debug, Clone)]
enum Arg {
    Pos(Id),
    Kv(Id, AttrValue),
}

/// An operation before operand resolution.
#[derive(Debug, Clone)]
struct OpDef {
    mnemonic: Id,
    args: Vec<Arg>,
}

/// A node statement before operand resolution.
#[derive(Debug, Clone)]
struct NodeDef {
    ret: bool,
    name: Id,
    ty: ast::Type,
    op: OpDef,
}

#[derive(Parser)]
#[grammar = "syntax.pest"]
pub struct WeftParser;

impl WeftParser {
    /// Parse a weft package from a file.
    pub fn parse_file(path: &Path) -> WeftResult<ast::Package> {
        log::info!("parsing {}", path.to_string_lossy());
        let content = fs::read(path).map_err(|err| {
            weft_utils::Error::invalid_file(format!(
                "Failed to read {}: {err}",
                path.to_string_lossy(),
            ))
        })?;
        let string_content = std::str::from_utf8(&content)?;
        Self::parse_package(string_content)
    }

    /// Parse a weft package from its textual form.
    pub fn parse_package(content: &str) -> WeftResult<ast::Package> {
        let inputs =
            WeftParser::parse(Rule::file, content).map_err(|err| {
                weft_utils::Error::parse_error(format!(
                    "Failed to parse package: {err}"
                ))
            })?;
        let input = inputs.single().map_err(|err| {
            weft_utils::Error::parse_error(format!(
                "Failed to parse package: {err}"
            ))
        })?;
        WeftParser::file(input).map_err(|err| {
            weft_utils::Error::parse_error(format!(
                "Failed to parse package: {err}"
            ))
        })
    }
}

#[pest_consume::parser]
impl WeftParser {
    fn EOI(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn identifier(input: Node) -> ParseResult<Id> {
        Ok(Id::new(input.as_str()))
    }

    fn number(input: Node) -> ParseResult<u64> {
        let num = input.as_str().parse::<u64>();
        num.map_err(|err| input.error(err))
    }

    fn hex_number(input: Node) -> ParseResult<BigUint> {
        let digits = &input.as_str()[2..];
        BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| input.error("invalid hexadecimal number"))
    }

    fn bin_number(input: Node) -> ParseResult<BigUint> {
        let digits = &input.as_str()[2..];
        BigUint::parse_bytes(digits.as_bytes(), 2)
            .ok_or_else(|| input.error("invalid binary number"))
    }

    fn bool_true(_input: Node) -> ParseResult<bool> {
        Ok(true)
    }

    fn bool_false(_input: Node) -> ParseResult<bool> {
        Ok(false)
    }

    fn ret_marker(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    // ----------------------- types -----------------------

    fn bits_type(input: Node) -> ParseResult<ast::Type> {
        Ok(match_nodes!(input.into_children();
            [number(width)] => ast::Type::bits(width),
        ))
    }

    fn token_type(_input: Node) -> ParseResult<ast::Type> {
        Ok(ast::Type::Token)
    }

    fn tuple_type(input: Node) -> ParseResult<ast::Type> {
        Ok(match_nodes!(input.into_children();
            [ty(elements)..] => ast::Type::Tuple(elements.collect()),
        ))
    }

    fn array_dim(input: Node) -> ParseResult<u64> {
        Ok(match_nodes!(input.into_children();
            [number(size)] => size,
        ))
    }

    fn ty(input: Node) -> ParseResult<ast::Type> {
        // Array dimensions apply outside-in: `bits[8][4]` is an array of
        // four `bits[8]` elements.
        fn wrap(base: ast::Type, dims: impl Iterator<Item = u64>) -> ast::Type {
            dims.fold(base, |elem, size| ast::Type::array(size, elem))
        }
        Ok(match_nodes!(input.into_children();
            [bits_type(t), array_dim(dims)..] => wrap(t, dims),
            [token_type(t), array_dim(dims)..] => wrap(t, dims),
            [tuple_type(t), array_dim(dims)..] => wrap(t, dims),
        ))
    }

    // ----------------------- operations -----------------------

    fn ident_list(input: Node) -> ParseResult<Vec<Id>> {
        Ok(match_nodes!(input.into_children();
            [identifier(ids)..] => ids.collect(),
        ))
    }

    fn attr_value(input: Node) -> ParseResult<AttrValue> {
        Ok(match_nodes!(input.into_children();
            [ident_list(l)] => AttrValue::List(l),
            [bool_true(b)] => AttrValue::Bool(b),
            [bool_false(b)] => AttrValue::Bool(b),
            [hex_number(n)] => AttrValue::Num(n),
            [bin_number(n)] => AttrValue::Num(n),
            [number(n)] => AttrValue::Num(BigUint::from(n)),
            [identifier(i)] => AttrValue::Ident(i),
        ))
    }

    fn kv_arg(input: Node) -> ParseResult<(Id, AttrValue)> {
        Ok(match_nodes!(input.into_children();
            [identifier(key), attr_value(value)] => (key, value),
        ))
    }

    fn pos_arg(input: Node) -> ParseResult<Id> {
        Ok(match_nodes!(input.into_children();
            [identifier(id)] => id,
        ))
    }

    fn op_arg(input: Node) -> ParseResult<Arg> {
        Ok(match_nodes!(input.into_children();
            [kv_arg(kv)] => Arg::Kv(kv.0, kv.1),
            [pos_arg(id)] => Arg::Pos(id),
        ))
    }

    fn op(input: Node) -> ParseResult<OpDef> {
        Ok(match_nodes!(input.into_children();
            [identifier(mnemonic), op_arg(args)..] => OpDef {
                mnemonic,
                args: args.collect(),
            },
        ))
    }

    fn node_stmt(input: Node) -> ParseResult<NodeDef> {
        Ok(match_nodes!(input.into_children();
            [ret_marker(_), identifier(name), ty(ty), op(op)] => NodeDef {
                ret: true, name, ty, op,
            },
            [identifier(name), ty(ty), op(op)] => NodeDef {
                ret: false, name, ty, op,
            },
        ))
    }

    // ----------------------- declarations -----------------------

    fn param(input: Node) -> ParseResult<(Id, ast::Type)> {
        Ok(match_nodes!(input.into_children();
            [identifier(name), ty(ty)] => (name, ty),
        ))
    }

    fn params(input: Node) -> ParseResult<Vec<(Id, ast::Type)>> {
        Ok(match_nodes!(input.into_children();
            [param(ps)..] => ps.collect(),
        ))
    }

    fn body(input: Node) -> ParseResult<Vec<NodeDef>> {
        Ok(match_nodes!(input.into_children();
            [node_stmt(stmts)..] => stmts.collect(),
        ))
    }

    fn chan_dir(input: Node) -> ParseResult<(bool, bool)> {
        Ok(match input.as_str() {
            "send_receive" => (true, true),
            "send" => (true, false),
            "receive" => (false, true),
            _ => unreachable!("no rule for channel direction"),
        })
    }

    fn chan_def(input: Node) -> ParseResult<ast::Channel> {
        Ok(match_nodes!(input.into_children();
            [identifier(name), ty(ty), chan_dir(dir)] => ast::Channel {
                name,
                ty,
                can_send: dir.0,
                can_receive: dir.1,
            },
        ))
    }

    fn next_clause(input: Node) -> ParseResult<Vec<Id>> {
        Ok(match_nodes!(input.into_children();
            [identifier(ids)..] => ids.collect(),
        ))
    }

    fn fn_def(input: Node) -> ParseResult<ast::Function> {
        let reporter = input.clone();
        match_nodes!(input.into_children();
            [identifier(name), params(params), ty(ret_ty), body(stmts)] => {
                build_function(name, params, ret_ty, stmts)
                    .map_err(|msg| reporter.error(msg))
            },
        )
    }

    fn proc_def(input: Node) -> ParseResult<ast::Proc> {
        let reporter = input.clone();
        match_nodes!(input.into_children();
            [identifier(name), params(state), body(stmts)] => {
                build_proc(name, state, None, stmts)
                    .map_err(|msg| reporter.error(msg))
            },
            [identifier(name), params(state), next_clause(next), body(stmts)] => {
                build_proc(name, state, Some(next), stmts)
                    .map_err(|msg| reporter.error(msg))
            },
        )
    }

    fn file(input: Node) -> ParseResult<ast::Package> {
        let mut name = Id::default();
        let mut channels = Vec::new();
        let mut functions = Vec::new();
        let mut procs = Vec::new();
        for child in input.into_children() {
            match child.as_rule() {
                Rule::identifier => name = Self::identifier(child)?,
                Rule::chan_def => channels.push(Self::chan_def(child)?),
                Rule::fn_def => functions.push(Self::fn_def(child)?),
                Rule::proc_def => procs.push(Self::proc_def(child)?),
                Rule::EOI => (),
                rule => unreachable!("unexpected rule {:?} in file", rule),
            }
        }
        Ok(ast::Package {
            name,
            channels,
            functions,
            procs,
        })
    }
}

// ----------------------- graph construction -----------------------

/// Keyword attributes of one operation, consumed key by key so leftover
/// (unrecognized) keys can be reported.
struct AttrMap {
    inner: Vec<(Id, AttrValue)>,
}

impl AttrMap {
    fn take(&mut self, key: &str) -> Option<AttrValue> {
        let idx = self.inner.iter().position(|(k, _)| *k == key)?;
        Some(self.inner.remove(idx).1)
    }

    fn take_num(&mut self, key: &str) -> Result<Option<u64>, String> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Num(n)) => n
                .to_u64()
                .map(Some)
                .ok_or_else(|| format!("attribute `{key}' is too large")),
            Some(_) => Err(format!("attribute `{key}' must be a number")),
        }
    }

    fn require_num(&mut self, key: &str, mnemonic: Id) -> Result<u64, String> {
        self.take_num(key)?.ok_or_else(|| {
            format!("`{mnemonic}' requires a `{key}' attribute")
        })
    }

    fn take_big(&mut self, key: &str) -> Result<Option<BigUint>, String> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Num(n)) => Ok(Some(n)),
            Some(_) => Err(format!("attribute `{key}' must be a number")),
        }
    }

    fn take_bool(&mut self, key: &str) -> Result<Option<bool>, String> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(format!("attribute `{key}' must be a boolean")),
        }
    }

    fn take_ident(&mut self, key: &str) -> Result<Option<Id>, String> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::Ident(id)) => Ok(Some(id)),
            Some(_) => Err(format!("attribute `{key}' must be a name")),
        }
    }

    fn require_ident(
        &mut self,
        key: &str,
        mnemonic: Id,
    ) -> Result<Id, String> {
        self.take_ident(key)?.ok_or_else(|| {
            format!("`{mnemonic}' requires a `{key}' attribute")
        })
    }

    fn take_list(&mut self, key: &str) -> Result<Option<Vec<Id>>, String> {
        match self.take(key) {
            None => Ok(None),
            Some(AttrValue::List(l)) => Ok(Some(l)),
            Some(_) => Err(format!("attribute `{key}' must be a name list")),
        }
    }

    fn require_list(
        &mut self,
        key: &str,
        mnemonic: Id,
    ) -> Result<Vec<Id>, String> {
        self.take_list(key)?.ok_or_else(|| {
            format!("`{mnemonic}' requires a `{key}' attribute")
        })
    }

    fn finish(self, mnemonic: Id) -> Result<(), String> {
        match self.inner.first() {
            None => Ok(()),
            Some((key, _)) => Err(format!(
                "`{mnemonic}' does not take a `{key}' attribute"
            )),
        }
    }
}

/// Incrementally builds one function or proc body, tracking the name to node
/// id mapping used to resolve operand references.
struct BodyBuilder {
    nodes: Vec<ast::Node>,
    symbols: HashMap<Id, ast::NodeId>,
}

impl BodyBuilder {
    fn new() -> Self {
        BodyBuilder {
            nodes: Vec::new(),
            symbols: HashMap::new(),
        }
    }

    fn push(
        &mut self,
        name: Id,
        op: OpKind,
        operands: SmallVec<[ast::NodeId; 2]>,
        ty: ast::Type,
    ) -> Result<ast::NodeId, String> {
        if self.symbols.contains_key(&name) {
            return Err(format!("node `{name}' is defined twice"));
        }
        let id = ast::NodeId(self.nodes.len() as u32);
        self.nodes.push(ast::Node {
            id,
            name,
            op,
            operands,
            ty,
        });
        self.symbols.insert(name, id);
        Ok(id)
    }

    fn lookup(&self, name: Id) -> Result<ast::NodeId, String> {
        self.symbols
            .get(&name)
            .copied()
            .ok_or_else(|| format!("use of undefined value `{name}'"))
    }
}

fn expect_operands(
    mnemonic: Id,
    operands: &[ast::NodeId],
    count: usize,
) -> Result<(), String> {
    if operands.len() != count {
        return Err(format!(
            "`{mnemonic}' takes {count} operand(s), got {}",
            operands.len()
        ));
    }
    Ok(())
}

/// Build the [OpKind] and final operand list for one node statement.
fn make_op(
    def: &NodeDef,
    builder: &BodyBuilder,
    state: &[ast::StateElement],
) -> Result<(OpKind, SmallVec<[ast::NodeId; 2]>), String> {
    let mnemonic = def.op.mnemonic;
    let mut operands: SmallVec<[ast::NodeId; 2]> = SmallVec::new();
    let mut attrs = AttrMap { inner: Vec::new() };
    for arg in &def.op.args {
        match arg {
            Arg::Pos(name) => operands.push(builder.lookup(*name)?),
            Arg::Kv(key, value) => {
                if attrs.inner.iter().any(|(k, _)| k == key) {
                    return Err(format!("duplicate attribute `{key}'"));
                }
                attrs.inner.push((*key, value.clone()));
            }
        }
    }

    // Resolve a keyword attribute that names another node.
    let resolve = |attrs: &mut AttrMap,
                   key: &str|
     -> Result<Option<ast::NodeId>, String> {
        match attrs.take_ident(key)? {
            None => Ok(None),
            Some(name) => builder.lookup(name).map(Some),
        }
    };

    let kind = match mnemonic.as_str() {
        "umul" | "smul" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Arith(match mnemonic.as_str() {
                "umul" => ArithOp::Umul,
                _ => ArithOp::Smul,
            })
        }
        "eq" | "ne" | "slt" | "sle" | "sgt" | "sge" | "ult" | "ule"
        | "ugt" | "uge" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Compare(match mnemonic.as_str() {
                "eq" => CompareOp::Eq,
                "ne" => CompareOp::Ne,
                "slt" => CompareOp::Slt,
                "sle" => CompareOp::Sle,
                "sgt" => CompareOp::Sgt,
                "sge" => CompareOp::Sge,
                "ult" => CompareOp::Ult,
                "ule" => CompareOp::Ule,
                "ugt" => CompareOp::Ugt,
                _ => CompareOp::Uge,
            })
        }
        "add" | "sub" | "sdiv" | "udiv" | "smod" | "umod" | "shll"
        | "shrl" | "shra" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Binary(match mnemonic.as_str() {
                "add" => BinOp::Add,
                "sub" => BinOp::Sub,
                "sdiv" => BinOp::Sdiv,
                "udiv" => BinOp::Udiv,
                "smod" => BinOp::Smod,
                "umod" => BinOp::Umod,
                "shll" => BinOp::Shll,
                "shrl" => BinOp::Shrl,
                _ => BinOp::Shra,
            })
        }
        "identity" | "neg" | "not" | "reverse" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::Unary(match mnemonic.as_str() {
                "identity" => UnOp::Identity,
                "neg" => UnOp::Neg,
                "not" => UnOp::Not,
                _ => UnOp::Reverse,
            })
        }
        "zero_ext" | "sign_ext" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::Extend {
                signed: mnemonic == "sign_ext",
                new_width: attrs.require_num("new_bit_count", mnemonic)?,
            }
        }
        "tuple" => OpKind::Tuple,
        "tuple_index" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::TupleIndex {
                index: attrs.require_num("index", mnemonic)?,
            }
        }
        "array" => OpKind::Array,
        "array_index" => {
            expect_operands(mnemonic, &operands, 1)?;
            for idx in attrs.require_list("indices", mnemonic)? {
                operands.push(builder.lookup(idx)?);
            }
            OpKind::ArrayIndex
        }
        "array_update" => {
            expect_operands(mnemonic, &operands, 2)?;
            for idx in attrs.require_list("indices", mnemonic)? {
                operands.push(builder.lookup(idx)?);
            }
            OpKind::ArrayUpdate
        }
        "array_concat" => OpKind::ArrayConcat,
        "array_slice" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::ArraySlice {
                width: attrs.require_num("width", mnemonic)?,
            }
        }
        "bit_slice" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::BitSlice {
                start: attrs.require_num("start", mnemonic)?,
                width: attrs.require_num("width", mnemonic)?,
            }
        }
        "bit_slice_update" => {
            expect_operands(mnemonic, &operands, 3)?;
            OpKind::BitSliceUpdate
        }
        "concat" => OpKind::Concat,
        "literal" => {
            expect_operands(mnemonic, &operands, 0)?;
            let value = attrs.take_big("value")?.ok_or_else(|| {
                format!("`{mnemonic}' requires a `value' attribute")
            })?;
            let width = def.ty.flat_bit_count();
            if value.bits() > width {
                return Err(format!(
                    "literal value does not fit in {width} bits"
                ));
            }
            let width = u32::try_from(width)
                .map_err(|_| "literal width is too large".to_string())?;
            OpKind::Literal(BitVecValue::from_big_uint(&value, width))
        }
        "and" | "nand" | "nor" | "or" | "xor" => {
            if operands.is_empty() {
                return Err(format!(
                    "`{mnemonic}' takes at least one operand"
                ));
            }
            OpKind::Nary(match mnemonic.as_str() {
                "and" => NaryOp::And,
                "nand" => NaryOp::Nand,
                "nor" => NaryOp::Nor,
                "or" => NaryOp::Or,
                _ => NaryOp::Xor,
            })
        }
        "and_reduce" | "or_reduce" | "xor_reduce" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::Reduce(match mnemonic.as_str() {
                "and_reduce" => ReduceOp::And,
                "or_reduce" => ReduceOp::Or,
                _ => ReduceOp::Xor,
            })
        }
        "encode" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::Encode
        }
        "decode" => {
            expect_operands(mnemonic, &operands, 1)?;
            if let Some(width) = attrs.take_num("width")? {
                if width != def.ty.flat_bit_count() {
                    return Err(format!(
                        "`decode' width attribute ({width}) disagrees with \
                         the declared type `{}'",
                        def.ty
                    ));
                }
            }
            OpKind::Decode
        }
        "one_hot" => {
            expect_operands(mnemonic, &operands, 1)?;
            let lsb_priority =
                attrs.take_bool("lsb_prio")?.ok_or_else(|| {
                    format!("`{mnemonic}' requires a `lsb_prio' attribute")
                })?;
            OpKind::OneHot { lsb_priority }
        }
        "one_hot_sel" => {
            expect_operands(mnemonic, &operands, 1)?;
            for case in attrs.require_list("cases", mnemonic)? {
                operands.push(builder.lookup(case)?);
            }
            OpKind::OneHotSelect
        }
        "priority_sel" => {
            expect_operands(mnemonic, &operands, 1)?;
            for case in attrs.require_list("cases", mnemonic)? {
                operands.push(builder.lookup(case)?);
            }
            let default = attrs.require_ident("default", mnemonic)?;
            operands.push(builder.lookup(default)?);
            OpKind::PrioritySelect
        }
        "sel" => {
            expect_operands(mnemonic, &operands, 1)?;
            for case in attrs.require_list("cases", mnemonic)? {
                operands.push(builder.lookup(case)?);
            }
            let default = resolve(&mut attrs, "default")?;
            let has_default = default.is_some();
            if let Some(d) = default {
                operands.push(d);
            }
            OpKind::Select { has_default }
        }
        "invoke" => OpKind::Invoke {
            to_apply: attrs.require_ident("to_apply", mnemonic)?,
        },
        "map" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::Map {
                to_apply: attrs.require_ident("to_apply", mnemonic)?,
            }
        }
        "after_all" => OpKind::AfterAll,
        "send" => {
            expect_operands(mnemonic, &operands, 2)?;
            let channel = attrs.require_ident("channel", mnemonic)?;
            let predicate = resolve(&mut attrs, "predicate")?;
            let predicated = predicate.is_some();
            if let Some(p) = predicate {
                operands.push(p);
            }
            OpKind::Send {
                channel,
                predicated,
            }
        }
        "receive" => {
            expect_operands(mnemonic, &operands, 1)?;
            let channel = attrs.require_ident("channel", mnemonic)?;
            let blocking = attrs.take_bool("blocking")?.unwrap_or(true);
            let predicate = resolve(&mut attrs, "predicate")?;
            let predicated = predicate.is_some();
            if let Some(p) = predicate {
                operands.push(p);
            }
            OpKind::Receive {
                channel,
                blocking,
                predicated,
            }
        }
        "state_read" => {
            expect_operands(mnemonic, &operands, 0)?;
            let elem = attrs.require_ident("state_element", mnemonic)?;
            if !state.iter().any(|s| s.name == elem) {
                return Err(format!("unknown state element `{elem}'"));
            }
            OpKind::StateRead {
                state_element: elem,
            }
        }
        "next_value" => {
            expect_operands(mnemonic, &operands, 0)?;
            let param = attrs.require_ident("param", mnemonic)?;
            operands.push(builder.lookup(param)?);
            let value = attrs.require_ident("value", mnemonic)?;
            operands.push(builder.lookup(value)?);
            let predicate = resolve(&mut attrs, "predicate")?;
            let predicated = predicate.is_some();
            if let Some(p) = predicate {
                operands.push(p);
            }
            OpKind::NextValue { predicated }
        }
        "umulp" | "smulp" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::PartialProduct {
                signed: mnemonic == "smulp",
            }
        }
        "assert" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Assert
        }
        "cover" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Cover
        }
        "gate" => {
            expect_operands(mnemonic, &operands, 2)?;
            OpKind::Gate
        }
        "min_delay" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::MinDelay {
                delay: attrs.require_num("delay", mnemonic)?,
            }
        }
        "register_read" => {
            expect_operands(mnemonic, &operands, 0)?;
            OpKind::RegisterRead {
                register: attrs.require_ident("register", mnemonic)?,
            }
        }
        "register_write" => {
            expect_operands(mnemonic, &operands, 1)?;
            OpKind::RegisterWrite {
                register: attrs.require_ident("register", mnemonic)?,
            }
        }
        other => return Err(format!("unknown operation `{other}'")),
    };
    attrs.finish(mnemonic)?;
    Ok((kind, operands))
}

fn build_function(
    name: Id,
    params: Vec<(Id, ast::Type)>,
    ret_ty: ast::Type,
    stmts: Vec<NodeDef>,
) -> Result<ast::Function, String> {
    let mut builder = BodyBuilder::new();
    let mut param_ids = Vec::with_capacity(params.len());
    for (param_name, param_ty) in params {
        let id = builder.push(
            param_name,
            OpKind::Param,
            SmallVec::new(),
            param_ty,
        )?;
        param_ids.push(id);
    }

    let mut ret = None;
    for def in stmts {
        let (kind, operands) = make_op(&def, &builder, &[])?;
        if matches!(kind, OpKind::NextValue { .. }) {
            return Err(format!(
                "`next_value' is only allowed in procs, not in function \
                 `{name}'"
            ));
        }
        let id = builder.push(def.name, kind, operands, def.ty)?;
        if def.ret {
            if ret.is_some() {
                return Err(format!(
                    "function `{name}' has multiple `ret' nodes"
                ));
            }
            ret = Some(id);
        }
    }
    let ret = ret
        .ok_or_else(|| format!("function `{name}' has no `ret' node"))?;

    Ok(ast::Function {
        name,
        params: param_ids,
        ret_ty,
        nodes: builder.nodes,
        ret,
    })
}

fn build_proc(
    name: Id,
    state_params: Vec<(Id, ast::Type)>,
    next: Option<Vec<Id>>,
    stmts: Vec<NodeDef>,
) -> Result<ast::Proc, String> {
    let state: Vec<ast::StateElement> = state_params
        .into_iter()
        .map(|(name, ty)| ast::StateElement { name, ty })
        .collect();

    let mut builder = BodyBuilder::new();
    let mut uses_next_value = false;
    for def in stmts {
        if def.ret {
            return Err(format!(
                "proc `{name}' bodies do not have a `ret' node"
            ));
        }
        let (kind, operands) = make_op(&def, &builder, &state)?;
        uses_next_value |= matches!(kind, OpKind::NextValue { .. });
        builder.push(def.name, kind, operands, def.ty)?;
    }

    // The legacy `next (...)` clause and modern `next_value` nodes are
    // mutually exclusive.
    let next_state = match next {
        Some(markers) => {
            if uses_next_value {
                return Err(format!(
                    "proc `{name}' mixes a `next (...)' clause with \
                     `next_value' nodes"
                ));
            }
            if markers.len() != state.len() {
                return Err(format!(
                    "proc `{name}' has {} state elements but its `next' \
                     clause names {} nodes",
                    state.len(),
                    markers.len()
                ));
            }
            markers
                .into_iter()
                .map(|m| builder.lookup(m))
                .collect::<Result<Vec<_>, _>>()?
        }
        None => {
            if !state.is_empty() && !uses_next_value {
                return Err(format!(
                    "proc `{name}' has state elements but neither a `next \
                     (...)' clause nor `next_value' nodes"
                ));
            }
            Vec::new()
        }
    };

    Ok(ast::Proc {
        name,
        state,
        nodes: builder.nodes,
        next_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OpKind, Type};

    #[test]
    fn parse_simple_function() {
        let pkg = WeftParser::parse_package(
            r#"
            package adder

            fn f(x: bits[8], y: bits[8]) -> bits[8] {
              ret sum: bits[8] = add(x, y)
            }
            "#,
        )
        .unwrap();
        assert_eq!(pkg.name, "adder");
        assert_eq!(pkg.functions.len(), 1);
        let f = &pkg.functions[0];
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.nodes.len(), 3);
        let sum = f.node(f.ret);
        assert_eq!(sum.name, "sum");
        assert!(matches!(sum.op, OpKind::Binary(BinOp::Add)));
        assert_eq!(sum.operands.as_slice(), &[f.params[0], f.params[1]]);
    }

    #[test]
    fn keywords_split_from_following_identifiers() {
        // `package adder` must lex as a keyword and a separate name, and
        // names that merely start with a keyword stay ordinary identifiers.
        let pkg = WeftParser::parse_package(
            r#"
            package procs

            chan channel: bits[4] (receive)

            fn nexter(fn_in: bits[4]) -> bits[4] {
              ret procd: bits[4] = identity(fn_in)
            }
            "#,
        )
        .unwrap();
        assert_eq!(pkg.name, "procs");
        assert_eq!(pkg.channels[0].name, "channel");
        let f = &pkg.functions[0];
        assert_eq!(f.name, "nexter");
        assert_eq!(f.node(f.params[0]).name, "fn_in");
        assert_eq!(f.node(f.ret).name, "procd");
    }

    #[test]
    fn reject_keyword_fused_to_name() {
        let err = WeftParser::parse_package("packagefoo").unwrap_err();
        assert!(err.is_parse_error(), "got: {err:?}");
    }

    #[test]
    fn parse_nested_types() {
        let pkg = WeftParser::parse_package(
            r#"
            package types

            fn id(x: (bits[4], bits[8][2])[3]) -> (bits[4], bits[8][2])[3] {
              ret out: (bits[4], bits[8][2])[3] = identity(x)
            }
            "#,
        )
        .unwrap();
        let f = &pkg.functions[0];
        let ty = &f.node(f.params[0]).ty;
        let Type::Array { size, element } = ty else {
            panic!("expected array type, got {ty}");
        };
        assert_eq!(*size, 3);
        let Type::Tuple(elements) = element.as_ref() else {
            panic!("expected tuple element, got {element}");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], Type::bits(4));
        assert_eq!(elements[1], Type::array(2, Type::bits(8)));
        assert_eq!(ty.flat_bit_count(), 60);
    }

    #[test]
    fn parse_channels_and_proc() {
        let pkg = WeftParser::parse_package(
            r#"
            package counter

            chan out: bits[32] (send)

            proc count(value: bits[32]) {
              v: bits[32] = state_read(state_element=value)
              one: bits[32] = literal(value=1)
              sum: bits[32] = add(v, one)
              nv: () = next_value(param=v, value=sum)
            }
            "#,
        )
        .unwrap();
        assert_eq!(pkg.channels.len(), 1);
        assert!(pkg.channels[0].can_send);
        assert!(!pkg.channels[0].can_receive);
        let p = &pkg.procs[0];
        assert_eq!(p.state.len(), 1);
        assert!(p.has_next_value_nodes());
        assert!(p.next_state.is_empty());
    }

    #[test]
    fn parse_legacy_next_clause() {
        let pkg = WeftParser::parse_package(
            r#"
            package counter

            proc count(value: bits[32]) next (sum) {
              v: bits[32] = state_read(state_element=value)
              one: bits[32] = literal(value=1)
              sum: bits[32] = add(v, one)
            }
            "#,
        )
        .unwrap();
        let p = &pkg.procs[0];
        assert!(!p.has_next_value_nodes());
        assert_eq!(p.next_state.len(), 1);
        assert_eq!(p.node(p.next_state[0]).name, "sum");
    }

    #[test]
    fn reject_use_before_def() {
        let err = WeftParser::parse_package(
            r#"
            package bad

            fn f(x: bits[8]) -> bits[8] {
              ret sum: bits[8] = add(x, later)
              later: bits[8] = identity(x)
            }
            "#,
        )
        .unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("undefined value `later'"));
    }

    #[test]
    fn reject_duplicate_node_name() {
        let err = WeftParser::parse_package(
            r#"
            package bad

            fn f(x: bits[8]) -> bits[8] {
              a: bits[8] = identity(x)
              ret a: bits[8] = identity(x)
            }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn reject_mixed_state_styles() {
        let err = WeftParser::parse_package(
            r#"
            package bad

            proc p(value: bits[8]) next (v) {
              v: bits[8] = state_read(state_element=value)
              nv: () = next_value(param=v, value=v)
            }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mixes"));
    }

    #[test]
    fn parse_wide_hex_literal() {
        use baa::BitVecOps;
        let pkg = WeftParser::parse_package(
            r#"
            package wide

            fn f() -> bits[96] {
              ret big: bits[96] = literal(value=0xffffeeeeddddccccbbbbaaaa)
            }
            "#,
        )
        .unwrap();
        let f = &pkg.functions[0];
        let OpKind::Literal(value) = &f.node(f.ret).op else {
            panic!("expected literal node");
        };
        assert_eq!(value.width(), 96);
    }

    #[test]
    fn reject_oversized_literal() {
        let err = WeftParser::parse_package(
            r#"
            package bad

            fn f() -> bits[4] {
              ret big: bits[4] = literal(value=255)
            }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }
}
