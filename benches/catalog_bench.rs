//! Benchmarks for dirsum
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dirsum::config::PathFilter;
use dirsum::db::{catalog, schema};
use rusqlite::Connection;

fn benchmark_catalog_lookup(c: &mut Criterion) {
    let conn = Connection::open_in_memory().unwrap();
    schema::create_schema(&conn).unwrap();
    {
        let tx = conn.unchecked_transaction().unwrap();
        for i in 0..10_000 {
            let path = format!("dir{}/file{}", i % 100, i);
            catalog::insert(&tx, &path, i as u64, Some("d41d8cd98f00b204e9800998ecf8427e")).unwrap();
        }
        catalog::clear_visited_flags(&tx, "").unwrap();
        tx.commit().unwrap();
    }
    assert_eq!(catalog::query_unvisited_below(&conn, "dir7").unwrap().len(), 100);

    c.bench_function("catalog_lookup_hit", |b| {
        b.iter(|| black_box(catalog::lookup(&conn, black_box("dir42/file4242")).unwrap()))
    });

    c.bench_function("catalog_lookup_miss", |b| {
        b.iter(|| black_box(catalog::lookup(&conn, black_box("dir42/missing")).unwrap()))
    });

    c.bench_function("catalog_query_unvisited_below", |b| {
        b.iter(|| black_box(catalog::query_unvisited_below(&conn, black_box("dir7")).unwrap()))
    });
}

fn benchmark_path_filter(c: &mut Criterion) {
    let filter = PathFilter::new(
        &[r".*\.tmp".to_string(), r"(.*/)?\.git/.*".to_string()],
        &[r"keep/.*".to_string()],
    )
    .unwrap();

    c.bench_function("path_filter_should_skip", |b| {
        b.iter(|| {
            black_box(filter.should_skip(black_box("src/deeply/nested/module/file.rs")));
            black_box(filter.should_skip(black_box("build/output.tmp")));
            black_box(filter.should_skip(black_box("keep/output.tmp")));
        })
    });
}

criterion_group!(benches, benchmark_catalog_lookup, benchmark_path_filter);
criterion_main!(benches);
