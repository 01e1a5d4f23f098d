//! Property tests for the dependency graph.

use proptest::prelude::*;

use tessel_ir::test::property::generators::*;

use crate::dependency::DependencyGraph;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// One edge per read of each computed tensor.
    #[test]
    fn edges_match_reads(program in arb_elementwise_program(8)) {
        let graph = DependencyGraph::build(&program.program, &program.tensors).unwrap();

        let reads: usize = program.deps.iter().map(Vec::len).sum();
        prop_assert_eq!(graph.edge_count(), reads);
        for (k, deps) in program.deps.iter().enumerate() {
            for &d in deps {
                prop_assert!(graph.has_edge(&program.names[d], &program.names[k]));
            }
        }
    }

    /// Generated programs are acyclic, so a producer-first order exists and
    /// places every producer before its consumers.
    #[test]
    fn producer_first_order_respects_edges(program in arb_elementwise_program(8)) {
        let graph = DependencyGraph::build(&program.program, &program.tensors).unwrap();
        let order = graph.producer_first_order().unwrap();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();

        for (k, deps) in program.deps.iter().enumerate() {
            for &d in deps {
                prop_assert!(position(&program.names[d]) < position(&program.names[k]));
            }
        }
    }

    /// Direct producers are among the transitive ones, and the placeholder
    /// feeds every computed tensor.
    #[test]
    fn transitive_producers_cover_direct_reads(program in arb_elementwise_program(8)) {
        let graph = DependencyGraph::build(&program.program, &program.tensors).unwrap();

        for (k, name) in program.names.iter().enumerate().skip(1) {
            let all = graph.transitive_producers(name);
            for &d in &program.deps[k] {
                prop_assert!(all.contains(&program.names[d]));
            }
            prop_assert!(all.contains(&program.names[0]));
            prop_assert!(!all.contains(name));
        }
    }
}
