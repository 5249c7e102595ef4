use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sagre_core::{GraphBuilder, NodeId, SubGraph};

fn bench_first_order(c: &mut Criterion) {
    let mut builder = GraphBuilder::new();
    // Ring of 10k nodes with a few chords so degrees vary.
    for i in 0..10_000u64 {
        builder.add_undirected_edge(NodeId::new(i), NodeId::new((i + 1) % 10_000));
        builder.add_edge(NodeId::new(i), NodeId::new((i * 7 + 13) % 10_000));
    }
    let graph = builder.build();
    let sub_graph = SubGraph::new(&graph, 42);

    let batch: Vec<NodeId> = (0..1024u64).map(NodeId::new).collect();

    c.bench_function("first_order_1024_fanout_5", |b| {
        b.iter(|| sub_graph.first_order(black_box(&batch), black_box(5)))
    });
}

criterion_group!(benches, bench_first_order);
criterion_main!(benches);
