//! End-to-end front-end benchmarks.
//!
//! Measures the parse → rewrite → validate pipeline across query shapes:
//!
//! - **simple**: basic MATCH/RETURN statements
//! - **complex**: WHERE, ORDER BY, LIMIT and multi-clause queries
//! - **updates**: CREATE/MERGE/SET pipelines
//! - **stress**: wide patterns and long clause chains
//!
//! ```bash
//! cargo bench
//! cargo bench simple
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cypher_frontend::Frontend;

fn bench_simple_queries(c: &mut Criterion) {
    let frontend = Frontend::default();
    let queries = [
        ("node_scan", "MATCH (n) RETURN n"),
        ("labeled_scan", "MATCH (n:Person) RETURN n.name"),
        ("single_hop", "MATCH (a:Person)-[:KNOWS]->(b:Person) RETURN a, b"),
    ];

    let mut group = c.benchmark_group("simple");
    for (name, query) in queries {
        group.throughput(Throughput::Bytes(query.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| frontend.prepare(black_box(q)));
        });
    }
    group.finish();
}

fn bench_complex_queries(c: &mut Criterion) {
    let frontend = Frontend::default();
    let queries = [
        (
            "filtered",
            "MATCH (a:Person)-[:KNOWS*1..3]->(b) WHERE a.age > 30 AND b.name STARTS WITH 'A' \
             RETURN a.name, count(b) AS friends ORDER BY friends DESC LIMIT 10",
        ),
        (
            "projection_chain",
            "MATCH (a) WITH a.v AS v WHERE v > 1 WITH v AS w RETURN w ORDER BY w SKIP 1 LIMIT 5",
        ),
        (
            "subquery",
            "MATCH (m) CALL { WITH m MATCH (m)-[:R]->(x) RETURN count(x) AS c } RETURN m, c",
        ),
        (
            "union",
            "MATCH (a:X) RETURN a.v AS v UNION ALL MATCH (b:Y) RETURN b.v AS v",
        ),
    ];

    let mut group = c.benchmark_group("complex");
    for (name, query) in queries {
        group.throughput(Throughput::Bytes(query.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| frontend.prepare(black_box(q)));
        });
    }
    group.finish();
}

fn bench_updates(c: &mut Criterion) {
    let frontend = Frontend::default();
    let queries = [
        ("create", "CREATE (:Person {name: 'a'})-[:KNOWS]->(:Person {name: 'b'})"),
        (
            "merge",
            "MERGE (p:Person {id: 1}) ON CREATE SET p.created = 1 ON MATCH SET p.seen = 2",
        ),
        (
            "foreach",
            "MATCH (n) FOREACH (x IN [1,2,3] | CREATE (n)-[:R]->(:V {v: x}))",
        ),
    ];

    let mut group = c.benchmark_group("updates");
    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| frontend.prepare(black_box(q)));
        });
    }
    group.finish();
}

fn bench_stress(c: &mut Criterion) {
    let frontend = Frontend::default();

    // a wide comma-separated pattern
    let wide = {
        let paths: Vec<String> = (0..50).map(|i| format!("(n{i}:L{i})")).collect();
        let names: Vec<String> = (0..50).map(|i| format!("n{i}")).collect();
        format!("MATCH {} RETURN {}", paths.join(", "), names.join(", "))
    };

    // a long WITH chain
    let deep = {
        let mut query = String::from("MATCH (n0) ");
        for i in 0..50 {
            query.push_str(&format!("WITH n{i} AS n{} ", i + 1));
        }
        query.push_str("RETURN n50");
        query
    };

    let mut group = c.benchmark_group("stress");
    group.bench_with_input(BenchmarkId::from_parameter("wide_pattern"), &wide, |b, q| {
        b.iter(|| frontend.prepare(black_box(q)));
    });
    group.bench_with_input(BenchmarkId::from_parameter("deep_chain"), &deep, |b, q| {
        b.iter(|| frontend.prepare(black_box(q)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_simple_queries,
    bench_complex_queries,
    bench_updates,
    bench_stress
);
criterion_main!(benches);
