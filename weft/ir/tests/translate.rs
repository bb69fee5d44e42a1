//! End-to-end translation tests: parse a package, translate it, and inspect
//! the resulting module.

use weft_frontend::WeftParser;
use weft_ir::{
    graph_to_ir, BinKind, Module, OpKind, Type, Value,
};
use weft_utils::Error;

fn translate(src: &str) -> Module {
    graph_to_ir(&WeftParser::parse_package(src).unwrap()).unwrap()
}

fn translate_err(src: &str) -> Error {
    graph_to_ir(&WeftParser::parse_package(src).unwrap()).unwrap_err()
}

#[test]
fn two_parameter_add_function() {
    let module = translate(
        r#"
        package adder

        fn f(x: bits[8], y: bits[8]) -> bits[8] {
          ret sum: bits[8] = add(x, y)
        }
        "#,
    );
    let f = &module.functions()[0];
    assert_eq!(f.name, "f");
    assert_eq!(f.body.args, vec![Type::int(8), Type::int(8)]);
    assert_eq!(f.ret_ty, Type::int(8));

    let [add, ret] = f.body.ops.as_slice() else {
        panic!("expected two operations, got {}", f.body.ops.len());
    };
    assert_eq!(add.kind, OpKind::Binary(BinKind::Add));
    assert_eq!(add.operands.as_slice(), &[Value::Arg(0), Value::Arg(1)]);
    assert_eq!(ret.kind, OpKind::Return);
    assert_eq!(
        ret.operands.as_slice(),
        &[Value::Result { op: 0, index: 0 }]
    );
}

#[test]
fn counter_proc_with_single_unconditional_writer() {
    let module = translate(
        r#"
        package counter

        proc count(counter: bits[32]) {
          v: bits[32] = state_read(state_element=counter)
          one: bits[32] = literal(value=1)
          sum: bits[32] = add(v, one)
          nv: () = next_value(param=v, value=sum)
        }
        "#,
    );
    let p = &module.procs()[0];
    assert_eq!(p.body.args, vec![Type::int(32)]);
    assert_eq!(p.state_names.len(), 1);
    assert_eq!(p.state_names[0], "counter");

    // constant, add, yield. No merge operation and no extra indirection:
    // the yield binds the add's result directly.
    assert_eq!(p.body.ops.len(), 3);
    assert!(!p
        .body
        .ops
        .iter()
        .any(|op| matches!(op.kind, OpKind::NextValue)));
    let yield_op = p.body.ops.last().unwrap();
    assert_eq!(yield_op.kind, OpKind::Yield);
    assert_eq!(
        yield_op.operands.as_slice(),
        &[Value::Result { op: 1, index: 0 }]
    );
    // The state read resolved to the entry argument.
    assert_eq!(
        p.body.ops[1].operands.as_slice(),
        &[Value::Arg(0), Value::Result { op: 0, index: 0 }]
    );
}

#[test]
fn predicated_writers_merge_in_declaration_order() {
    let module = translate(
        r#"
        package merge

        proc p(st: bits[8]) {
          v: bits[8] = state_read(state_element=st)
          one: bits[8] = literal(value=1)
          two: bits[8] = literal(value=2)
          p1: bits[1] = literal(value=1)
          p2: bits[1] = literal(value=0)
          n1: () = next_value(param=v, value=one, predicate=p1)
          n2: () = next_value(param=v, value=two, predicate=p2)
        }
        "#,
    );
    let p = &module.procs()[0];
    let merges: Vec<_> = p
        .body
        .ops
        .iter()
        .filter(|op| matches!(op.kind, OpKind::NextValue))
        .collect();
    assert_eq!(merges.len(), 1);
    // Operand layout: predicates first, then values, both in writer
    // declaration order. Constants are ops 0..4 in body order.
    assert_eq!(
        merges[0].operands.as_slice(),
        &[
            Value::Result { op: 2, index: 0 }, // p1
            Value::Result { op: 3, index: 0 }, // p2
            Value::Result { op: 0, index: 0 }, // one
            Value::Result { op: 1, index: 0 }, // two
        ]
    );
    let yield_op = p.body.ops.last().unwrap();
    assert_eq!(yield_op.kind, OpKind::Yield);
    assert_eq!(yield_op.operands.len(), 1);
}

#[test]
fn single_predicated_writer_still_merges() {
    let module = translate(
        r#"
        package merge

        proc p(st: bits[8]) {
          v: bits[8] = state_read(state_element=st)
          one: bits[8] = literal(value=1)
          go: bits[1] = literal(value=1)
          n1: () = next_value(param=v, value=one, predicate=go)
        }
        "#,
    );
    let p = &module.procs()[0];
    assert!(p
        .body
        .ops
        .iter()
        .any(|op| matches!(op.kind, OpKind::NextValue)));
}

#[test]
fn mixed_predication_is_rejected() {
    let err = translate_err(
        r#"
        package bad

        proc p(st: bits[8]) {
          v: bits[8] = state_read(state_element=st)
          one: bits[8] = literal(value=1)
          two: bits[8] = literal(value=2)
          go: bits[1] = literal(value=1)
          n1: () = next_value(param=v, value=one, predicate=go)
          n2: () = next_value(param=v, value=two)
        }
        "#,
    );
    assert!(err.is_internal());
    assert!(err.to_string().contains("carries no predicate"));
}

#[test]
fn legacy_next_state_markers() {
    let module = translate(
        r#"
        package legacy

        proc swap(a: bits[4], b: bits[4]) next (vb, va) {
          va: bits[4] = state_read(state_element=a)
          vb: bits[4] = state_read(state_element=b)
        }
        "#,
    );
    let p = &module.procs()[0];
    // Both state reads resolve to arguments; yield swaps them, in declared
    // state order.
    let yield_op = p.body.ops.last().unwrap();
    assert_eq!(yield_op.kind, OpKind::Yield);
    assert_eq!(
        yield_op.operands.as_slice(),
        &[Value::Arg(1), Value::Arg(0)]
    );
}

#[test]
fn legacy_shared_marker_feeds_both_elements() {
    let module = translate(
        r#"
        package legacy

        proc p(a: bits[4], b: bits[4]) next (sum, sum) {
          va: bits[4] = state_read(state_element=a)
          vb: bits[4] = state_read(state_element=b)
          sum: bits[4] = add(va, vb)
        }
        "#,
    );
    let p = &module.procs()[0];
    let yield_op = p.body.ops.last().unwrap();
    let sum = Value::Result { op: 0, index: 0 };
    assert_eq!(yield_op.operands.as_slice(), &[sum, sum]);
}

#[test]
fn blocking_receive_packs_token_and_data() {
    let module = translate(
        r#"
        package rx

        chan ch: bits[32] (receive)

        proc p() {
          tok: token = after_all()
          r: (token, bits[32]) = receive(tok, channel=ch)
        }
        "#,
    );
    let p = &module.procs()[0];
    // after_all, blocking_receive, tuple, yield.
    assert_eq!(p.body.ops.len(), 4);
    let recv = &p.body.ops[1];
    assert!(matches!(
        recv.kind,
        OpKind::BlockingReceive {
            predicated: false,
            ..
        }
    ));
    assert_eq!(
        recv.results.as_slice(),
        &[Type::Token, Type::int(32)]
    );
    let pack = &p.body.ops[2];
    assert_eq!(pack.kind, OpKind::Tuple);
    assert_eq!(
        pack.operands.as_slice(),
        &[
            Value::Result { op: 1, index: 0 },
            Value::Result { op: 1, index: 1 },
        ]
    );
    assert_eq!(
        pack.results[0],
        Type::Tuple(vec![Type::Token, Type::int(32)])
    );
}

#[test]
fn nonblocking_receive_packs_valid_bit() {
    let module = translate(
        r#"
        package rx

        chan ch: bits[16] (receive)

        proc p() {
          tok: token = after_all()
          r: (token, bits[16], bits[1]) = receive(tok, channel=ch, blocking=false)
        }
        "#,
    );
    let p = &module.procs()[0];
    let recv = &p.body.ops[1];
    assert!(matches!(recv.kind, OpKind::NonblockingReceive { .. }));
    assert_eq!(
        recv.results.as_slice(),
        &[Type::Token, Type::int(16), Type::int(1)]
    );
    let pack = &p.body.ops[2];
    assert_eq!(pack.operands.len(), 3);
}

#[test]
fn predicated_send_returns_a_token() {
    let module = translate(
        r#"
        package tx

        chan ch: bits[8] (send)

        proc p() {
          tok: token = after_all()
          data: bits[8] = literal(value=7)
          go: bits[1] = literal(value=1)
          out: token = send(tok, data, channel=ch, predicate=go)
        }
        "#,
    );
    let p = &module.procs()[0];
    let send = p
        .body
        .ops
        .iter()
        .find(|op| matches!(op.kind, OpKind::Send { .. }))
        .unwrap();
    assert!(matches!(
        send.kind,
        OpKind::Send {
            predicated: true,
            ..
        }
    ));
    assert_eq!(send.operands.len(), 3);
    assert_eq!(send.results.as_slice(), &[Type::Token]);
}

#[test]
fn invoke_and_map_resolve_declared_functions() {
    let module = translate(
        r#"
        package calls

        fn inc(x: bits[8]) -> bits[8] {
          one: bits[8] = literal(value=1)
          ret sum: bits[8] = add(x, one)
        }

        fn caller(a: bits[8], arr: bits[8][4]) -> bits[8][4] {
          b: bits[8] = invoke(a, to_apply=inc)
          ret out: bits[8][4] = map(arr, to_apply=inc)
        }
        "#,
    );
    let caller = &module.functions()[1];
    let call = &caller.body.ops[0];
    let OpKind::Call(func) = call.kind else {
        panic!("expected a call");
    };
    assert_eq!(module.function(func).name, "inc");
    let map = &caller.body.ops[1];
    assert!(matches!(map.kind, OpKind::Map(_)));
    assert_eq!(map.results[0], Type::array(4, Type::int(8)));
}

#[test]
fn invoking_an_undeclared_function_fails() {
    let err = translate_err(
        r#"
        package bad

        fn f(x: bits[8]) -> bits[8] {
          ret y: bits[8] = invoke(x, to_apply=missing)
        }
        "#,
    );
    assert!(err.is_undefined());
    assert!(err.to_string().contains("missing"));
}

#[test]
fn forward_function_references_fail() {
    let err = translate_err(
        r#"
        package bad

        fn caller(x: bits[8]) -> bits[8] {
          ret y: bits[8] = invoke(x, to_apply=callee)
        }

        fn callee(x: bits[8]) -> bits[8] {
          ret out: bits[8] = identity(x)
        }
        "#,
    );
    assert!(err.is_undefined());
}

#[test]
fn duplicate_function_names_fail() {
    let err = translate_err(
        r#"
        package bad

        fn f(x: bits[8]) -> bits[8] {
          ret a: bits[8] = identity(x)
        }

        fn f(x: bits[4]) -> bits[4] {
          ret a: bits[4] = identity(x)
        }
        "#,
    );
    assert!(err.is_already_bound());
}

#[test]
fn duplicate_channel_names_fail() {
    let err = translate_err(
        r#"
        package bad

        chan ch: bits[8] (send)
        chan ch: bits[16] (receive)
        "#,
    );
    assert!(err.is_already_bound());
}

#[test]
fn sending_on_an_undeclared_channel_fails() {
    let err = translate_err(
        r#"
        package bad

        proc p() {
          tok: token = after_all()
          data: bits[8] = literal(value=1)
          out: token = send(tok, data, channel=nowhere)
        }
        "#,
    );
    assert!(err.is_undefined());
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn multi_dimensional_array_index_fails() {
    let err = translate_err(
        r#"
        package bad

        fn f(a: bits[8][2][2], i: bits[1], j: bits[1]) -> bits[8] {
          ret e: bits[8] = array_index(a, indices=[i, j])
        }
        "#,
    );
    assert!(err.is_unimplemented());
    assert!(err.to_string().contains("array_index"));
}

#[test]
fn multi_dimensional_array_update_fails() {
    let err = translate_err(
        r#"
        package bad

        fn f(a: bits[8][2][2], v: bits[8], i: bits[1], j: bits[1]) -> bits[8][2][2] {
          ret u: bits[8][2][2] = array_update(a, v, indices=[i, j])
        }
        "#,
    );
    assert!(err.is_unimplemented());
    assert!(err.to_string().contains("array_update"));
}

#[test]
fn tuple_literals_are_rejected() {
    let err = translate_err(
        r#"
        package bad

        fn f() -> (bits[4], bits[4]) {
          ret t: (bits[4], bits[4]) = literal(value=3)
        }
        "#,
    );
    assert!(err.is_unimplemented());
    assert!(err.to_string().contains("literal"));
}

#[test]
fn unsupported_kinds_are_named_in_errors() {
    let unsupported = [
        ("nand(x, x)", "nand"),
        ("nor(x, x)", "nor"),
        ("and_reduce(x)", "and_reduce"),
        ("xor_reduce(x)", "xor_reduce"),
        ("umulp(x, x)", "umulp"),
        ("assert(x, x)", "assert"),
        ("cover(x, x)", "cover"),
        ("gate(x, x)", "gate"),
        ("min_delay(x, delay=3)", "min_delay"),
        ("register_read(register=r0)", "register_read"),
        ("register_write(x, register=r0)", "register_write"),
    ];
    for (op, name) in unsupported {
        let err = translate_err(&format!(
            r#"
            package bad

            fn f(x: bits[8]) -> bits[8] {{
              ret y: bits[8] = {op}
            }}
            "#
        ));
        assert!(err.is_unimplemented(), "`{op}' should be unimplemented");
        assert!(
            err.to_string().contains(name),
            "error for `{op}' should name `{name}': {err}"
        );
    }
}

#[test]
fn concat_width_is_the_sum_of_operand_widths() {
    let module = translate(
        r#"
        package cat

        fn f(a: bits[3], b: bits[5], c: bits[8]) -> bits[16] {
          ret out: bits[16] = concat(a, b, c)
        }
        "#,
    );
    let f = &module.functions()[0];
    assert_eq!(f.body.ops[0].results[0], Type::int(16));
}

#[test]
fn selects_preserve_case_order_and_default() {
    let module = translate(
        r#"
        package sel

        fn f(s: bits[2], a: bits[8], b: bits[8], d: bits[8]) -> bits[8] {
          ret out: bits[8] = sel(s, cases=[a, b], default=d)
        }
        "#,
    );
    let f = &module.functions()[0];
    let op = &f.body.ops[0];
    assert_eq!(op.kind, OpKind::Sel { has_default: true });
    assert_eq!(
        op.operands.as_slice(),
        &[
            Value::Arg(0),
            Value::Arg(1),
            Value::Arg(2),
            Value::Arg(3),
        ]
    );
}

#[test]
fn channels_carry_direction_flags() {
    let module = translate(
        r#"
        package chans

        chan a: bits[8] (send)
        chan b: (bits[4], bits[4]) (send_receive)
        "#,
    );
    let chans = module.channels();
    assert!(chans[0].send_supported && !chans[0].recv_supported);
    assert!(chans[1].send_supported && chans[1].recv_supported);
    assert_eq!(
        chans[1].ty,
        Type::Tuple(vec![Type::int(4), Type::int(4)])
    );
}
