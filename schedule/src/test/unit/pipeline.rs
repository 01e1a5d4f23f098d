use tessel_ir::{Argument, DeviceAxis, Expr, GpuDim, MemoryType, TensorMap};

use crate::config::LowerOptions;
use crate::error::Error;
use crate::pipeline::{LowerContext, lower_function};
use crate::stage::{Stage, StageMap};
use crate::test::helpers::*;

const BLOCK_X: DeviceAxis = DeviceAxis::block(GpuDim::X);
const THREAD_X: DeviceAxis = DeviceAxis::thread(GpuDim::X);

fn order(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// `C[i] = B[i] + 1` with `B = compute_inline(A[b] * 2)` and `i` on `threadIdx.x`.
#[test]
fn test_inline_then_bind_threads() {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[64]);
    add_compute(&mut tensors, "B", &["b"], &[64], Expr::mul(Expr::load("A", vars(&["b"])), Expr::int(2)), MemoryType::Heap);
    let c_body = Expr::add(Expr::load("B", vars(&["i"])), Expr::int(1));
    add_compute(&mut tensors, "C", &["i"], &[64], c_body.clone(), MemoryType::Heap);
    let stages: StageMap =
        [Stage::new("B", ["b"]).compute_inline(), Stage::new("C", ["i"]).with_binding("i", THREAD_X, 64)]
            .into_iter()
            .collect();

    let mut func = Expr::function(
        "fn_C",
        vec![Argument::input("_A"), Argument::output("_C")],
        Expr::for_("i", Expr::int(0), Expr::int(64), Expr::store("C", c_body, vars(&["i"]))),
    );
    let mut ctx = LowerContext::new(&stages, &mut tensors, order(&["C"]));
    lower_function(&mut func, &mut ctx, &LowerOptions::default()).unwrap();

    assert_eq!(
        func.to_string(),
        "function fn_C(_A, _C) <grid:[1, 1, 1], block:[64, 1, 1]> {\n  C[threadIdx.x] = ((A[threadIdx.x] * 2) + 1)\n}"
    );
}

/// Shared staging buffer: `S[t] = A[b, t]` then `C[b, t] = S[31 - t]`.
fn staged_reverse() -> (TensorMap, StageMap, Expr) {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[4, 32]);
    add_compute(&mut tensors, "S", &["i", "j"], &[4, 32], Expr::load("A", vars(&["i", "j"])), MemoryType::GpuShared);
    let reversed = vec![Expr::var("i"), Expr::sub(Expr::int(31), Expr::var("j"))];
    add_compute(&mut tensors, "C", &["i", "j"], &[4, 32], Expr::load("S", reversed.clone()), MemoryType::Heap);

    let stages: StageMap = ["S", "C"]
        .into_iter()
        .map(|name| Stage::new(name, ["i", "j"]).with_binding("i", BLOCK_X, 4).with_binding("j", THREAD_X, 32))
        .collect();

    let nest = |body: Expr| {
        Expr::for_(
            "i",
            Expr::int(0),
            Expr::int(4),
            Expr::block(vec![Expr::for_("j", Expr::int(0), Expr::int(32), body)]),
        )
    };
    let body = nest(Expr::block(vec![
        Expr::store("S", Expr::load("A", vars(&["i", "j"])), vars(&["i", "j"])),
        Expr::store("C", Expr::load("S", reversed), vars(&["i", "j"])),
    ]));
    let func = Expr::function("fn_C", vec![Argument::input("_A"), Argument::output("_C")], body);
    (tensors, stages, func)
}

#[test]
fn test_shared_memory_gets_barrier() {
    let (mut tensors, stages, mut func) = staged_reverse();
    let mut ctx = LowerContext::new(&stages, &mut tensors, order(&["S", "C"]));
    lower_function(&mut func, &mut ctx, &LowerOptions::default()).unwrap();

    assert!(ctx.resized_buffers.contains("_S"));
    assert_eq!(
        func.to_string(),
        "function fn_C(_A, _C) <grid:[4, 1, 1], block:[32, 1, 1]> {\n  \
         S[threadIdx.x] = A[blockIdx.x, threadIdx.x]\n  \
         __syncthreads()\n  \
         C[blockIdx.x, threadIdx.x] = S[(31 - threadIdx.x)]\n\
         }"
    );
    assert_eq!(buffer_shape(&tensors, "S"), [32]);
}

#[test]
fn test_barriers_can_be_disabled() {
    let (mut tensors, stages, mut func) = staged_reverse();
    let mut ctx = LowerContext::new(&stages, &mut tensors, order(&["S", "C"]));
    let options = LowerOptions::builder().insert_barriers(false).build();
    lower_function(&mut func, &mut ctx, &options).unwrap();

    assert!(!func.to_string().contains("__syncthreads"));
}

#[test]
fn test_round_cap_from_options() {
    let mut tensors = TensorMap::new();
    add_compute(&mut tensors, "A", &["a"], &[4], Expr::add(Expr::load("A", vars(&["a"])), Expr::int(1)), MemoryType::Heap);
    let stages: StageMap = [Stage::new("A", ["a"]).compute_inline()].into_iter().collect();

    let mut func = Expr::function("fn_B", vec![], Expr::store("B", Expr::load("A", ints(&[0])), ints(&[0])));
    let mut ctx = LowerContext::new(&stages, &mut tensors, Vec::new());
    let options = LowerOptions::builder().max_inline_rounds(2).build();

    let err = lower_function(&mut func, &mut ctx, &options).unwrap_err();
    assert_eq!(err, Error::InlineRoundLimit { rounds: 2, remaining: vec!["A".into()] });
}
