use std::collections::HashSet;

use tessel_ir::collect::collect_nodes;
use tessel_ir::{DeviceAxis, Expr, GpuDim, MemoryType, TensorMap};

use crate::error::Error;
use crate::gpu::transform_gpu_forloops;
use crate::stage::{ForloopInfos, Stage, StageMap};
use crate::test::helpers::*;

const BLOCK_X: DeviceAxis = DeviceAxis::block(GpuDim::X);
const THREAD_X: DeviceAxis = DeviceAxis::thread(GpuDim::X);

fn infos(stages: impl IntoIterator<Item = Stage>) -> ForloopInfos {
    stages.into_iter().collect::<StageMap>().forloop_infos()
}

fn order(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn loop_nest(axes: &[(&str, i64)], body: Expr) -> Expr {
    axes.iter().rev().fold(body, |body, &(var, extent)| Expr::for_(var, Expr::int(0), Expr::int(extent), body))
}

fn stores(program: &Expr) -> Vec<String> {
    collect_nodes(program, |e| matches!(e, Expr::Store(_))).iter().map(ToString::to_string).collect()
}

#[test]
fn test_rewrites_bound_loop_header() {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[32]);
    add_compute(&mut tensors, "B", &["i"], &[32], Expr::load("A", vars(&["i"])), MemoryType::Heap);
    let infos = infos([Stage::new("B", ["i"]).with_binding("i", THREAD_X, 32)]);

    let mut program = loop_nest(&[("i", 32)], Expr::store("B", Expr::load("A", vars(&["i"])), vars(&["i"])));
    let mut resized = HashSet::new();
    transform_gpu_forloops(&infos, &order(&["B"]), &mut tensors, &mut resized, &mut program).unwrap();

    let expected = Expr::for_bound(
        "threadIdx.x",
        32,
        THREAD_X,
        Expr::store("B", Expr::load("A", vars(&["threadIdx.x"])), vars(&["threadIdx.x"])),
    );
    assert_eq!(program, expected);
    assert!(resized.is_empty());
}

#[test]
fn test_offsets_non_zero_minimum() {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[32]);
    add_compute(&mut tensors, "B", &["i"], &[32], Expr::load("A", vars(&["i"])), MemoryType::Heap);
    let infos = infos([Stage::new("B", ["i"]).with_binding("i", THREAD_X, 8)]);

    let mut program =
        Expr::for_("i", Expr::int(2), Expr::int(8), Expr::store("B", Expr::load("A", vars(&["i"])), vars(&["i"])));
    transform_gpu_forloops(&infos, &order(&["B"]), &mut tensors, &mut HashSet::new(), &mut program).unwrap();

    let shifted = vec![Expr::add(Expr::var("threadIdx.x"), Expr::int(2))];
    let expected = Expr::for_bound("threadIdx.x", 8, THREAD_X, Expr::store("B", Expr::load("A", shifted.clone()), shifted));
    assert_eq!(program, expected);
}

#[test]
fn test_only_loops_enclosing_the_statement() {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[32]);
    add_compute(&mut tensors, "B", &["i"], &[32], Expr::load("A", vars(&["i"])), MemoryType::Heap);
    add_compute(&mut tensors, "X", &["i"], &[32], Expr::load("A", vars(&["i"])), MemoryType::Heap);
    let infos = infos([Stage::new("B", ["i"]).with_binding("i", THREAD_X, 32)]);

    let other = loop_nest(&[("i", 32)], Expr::store("X", Expr::load("A", vars(&["i"])), vars(&["i"])));
    let mut program =
        Expr::block(vec![other.clone(), loop_nest(&[("i", 32)], Expr::store("B", Expr::int(1), vars(&["i"])))]);
    transform_gpu_forloops(&infos, &order(&["X", "B"]), &mut tensors, &mut HashSet::new(), &mut program).unwrap();

    assert_eq!(program.stmts()[0], other);
    assert_eq!(stores(&program)[1], "B[threadIdx.x] = 1");
}

/// `L[i, j, k] = A[i, j, k]` with `i` on `blockIdx.x`, `j` on `threadIdx.x` and `L` in `memory_type`.
fn local_fixture(memory_type: MemoryType) -> (TensorMap, ForloopInfos, Expr) {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[4, 32, 8]);
    add_compute(&mut tensors, "L", &["i", "j", "k"], &[4, 32, 8], Expr::load("A", vars(&["i", "j", "k"])), memory_type);
    let infos = infos([Stage::new("L", ["i", "j", "k"]).with_binding("i", BLOCK_X, 4).with_binding("j", THREAD_X, 32)]);

    let nest = loop_nest(
        &[("i", 4), ("j", 32), ("k", 8)],
        Expr::store("L", Expr::load("A", vars(&["i", "j", "k"])), vars(&["i", "j", "k"])),
    );
    let program = Expr::block(vec![Expr::alloc("_L", ints(&[4, 32, 8])), nest]);
    (tensors, infos, program)
}

#[test]
fn test_local_buffer_drops_device_indices() {
    let (mut tensors, infos, mut program) = local_fixture(MemoryType::GpuLocal);
    let mut resized = HashSet::new();
    transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut resized, &mut program).unwrap();

    assert_eq!(stores(&program), ["L[k] = A[blockIdx.x, threadIdx.x, k]"]);
    assert_eq!(buffer_shape(&tensors, "L"), [8]);
    assert_eq!(buffer_shape(&tensors, "A"), [4, 32, 8]);
    assert_eq!(program.stmts()[0].to_string(), "alloc(_L, [8])");
    assert_eq!(resized, HashSet::from(["_L".to_string()]));
}

#[test]
fn test_shared_buffer_drops_block_indices() {
    let (mut tensors, infos, mut program) = local_fixture(MemoryType::GpuShared);
    let mut resized = HashSet::new();
    transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut resized, &mut program).unwrap();

    assert_eq!(stores(&program), ["L[threadIdx.x, k] = A[blockIdx.x, threadIdx.x, k]"]);
    assert_eq!(buffer_shape(&tensors, "L"), [32, 8]);
    assert_eq!(program.stmts()[0].to_string(), "alloc(_L, [32, 8])");
}

#[test]
fn test_buffer_resized_once() {
    let (mut tensors, infos, mut program) = local_fixture(MemoryType::GpuLocal);
    let mut resized = HashSet::new();
    transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut resized, &mut program).unwrap();
    let once = program.clone();
    transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut resized, &mut program).unwrap();

    assert_eq!(program, once);
    assert_eq!(buffer_shape(&tensors, "L"), [8]);
}

#[test]
fn test_emptied_access_becomes_scalar() {
    let mut tensors = TensorMap::new();
    add_placeholder(&mut tensors, "A", &[32]);
    add_compute(&mut tensors, "L", &["j"], &[32], Expr::load("A", vars(&["j"])), MemoryType::GpuLocal);
    let infos = infos([Stage::new("L", ["j"]).with_binding("j", THREAD_X, 32)]);

    let mut program = loop_nest(&[("j", 32)], Expr::store("L", Expr::load("A", vars(&["j"])), vars(&["j"])));
    transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut HashSet::new(), &mut program).unwrap();

    assert_eq!(stores(&program), ["L[0] = A[threadIdx.x]"]);
    assert_eq!(buffer_shape(&tensors, "L"), [1]);
}

#[test]
fn test_access_arity_mismatch() {
    let mut tensors = TensorMap::new();
    add_compute(&mut tensors, "L", &["i", "j"], &[4, 8], Expr::int(0), MemoryType::GpuLocal);
    let infos = infos([Stage::new("L", ["i", "j", "k"]).with_binding("i", BLOCK_X, 4)]);

    let mut program = loop_nest(&[("i", 4), ("j", 8), ("k", 2)], Expr::store("L", Expr::int(0), vars(&["i", "j", "k"])));
    let err = transform_gpu_forloops(&infos, &order(&["L"]), &mut tensors, &mut HashSet::new(), &mut program)
        .unwrap_err();

    assert_eq!(err, Error::AccessArityMismatch { buffer: "_L".into(), tensor: "L".into(), indices: 3, rank: 2 });
}

#[test]
fn test_bound_poly_for_rejected() {
    let mut tensors = TensorMap::new();
    add_compute(&mut tensors, "B", &["i"], &[32], Expr::int(0), MemoryType::Heap);
    let infos = infos([Stage::new("B", ["i"]).with_binding("i", THREAD_X, 32)]);

    let mut program = Expr::poly_for(
        "i",
        Expr::int(0),
        Expr::lt(Expr::var("i"), Expr::int(32)),
        Expr::int(1),
        Expr::store("B", Expr::int(0), vars(&["i"])),
    );
    let err = transform_gpu_forloops(&infos, &order(&["B"]), &mut tensors, &mut HashSet::new(), &mut program)
        .unwrap_err();

    assert_eq!(err, Error::BoundPolyFor { var: "i".into(), axis: "threadIdx.x".into() });
}

#[test]
fn test_statements_without_infos_are_skipped() {
    let mut tensors = TensorMap::new();
    add_compute(&mut tensors, "B", &["i"], &[32], Expr::int(0), MemoryType::Heap);
    let infos = infos([Stage::new("B", ["i"])]);

    let mut program = loop_nest(&[("i", 32)], Expr::store("B", Expr::int(0), vars(&["i"])));
    let before = program.clone();
    transform_gpu_forloops(&infos, &order(&["B", "unknown"]), &mut tensors, &mut HashSet::new(), &mut program)
        .unwrap();

    assert_eq!(program, before);
}
