//! Criterion benchmarks for the merge matcher and parent correction.
//!
//! Run with: `cargo bench`
//!
//! Synthetic commit logs keep the numbers comparable across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use parentfix::{fix_commits, pattern, CommitHash, CommitMetadata, FixConfig, ParentFixer};

// ─── Helpers ─────────────────────────────────────────────────────────

fn hash(n: u32) -> CommitHash {
    let mut bytes = [0u8; 20];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    CommitHash::from_bytes(bytes)
}

/// Log of `n` commits: every 10th is an affected merge, every 5th an ordinary
/// merge, the rest linear commits with a short body.
fn synthetic_log(n: u32) -> Vec<CommitMetadata> {
    (1..=n)
        .map(|i| {
            let (parents, message) = match i % 10 {
                0 => (vec![hash(i - 1), hash(n + i)], format!("Merge remote-tracking branch 'origin/topic{}'", i)),
                5 => (vec![hash(i - 1), hash(n + i)], format!("Merge branch 'topic{}' into main", i)),
                _ => (vec![hash(i - 1)], format!("Change {}\n\nSome longer body text describing the change.", i)),
            };
            CommitMetadata {
                id: hash(i),
                parents,
                author_time: 1_700_000_000 + i as i64,
                commit_time: 1_700_000_000 + i as i64,
                author_name: "Bench".to_string(),
                author_email: "bench@example.com".to_string(),
                message,
            }
        })
        .collect()
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    let affected = "Merge remote-tracking branch 'origin/feature'";
    let into_same = "Merge remote branch 'upstream/team/topic' into topic";
    let into_other = "Merge remote-tracking branch 'origin/feature' into main";
    let plain = "Refactor the commit graph layout\n\nMoves parent handling into its own module.";

    group.bench_function("affected", |b| b.iter(|| pattern::matches(black_box(affected))));
    group.bench_function("into_same", |b| b.iter(|| pattern::matches(black_box(into_same))));
    group.bench_function("into_other", |b| b.iter(|| pattern::matches(black_box(into_other))));
    group.bench_function("plain", |b| b.iter(|| pattern::matches(black_box(plain))));

    group.finish();
}

fn bench_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("correction");
    let config = FixConfig::default();

    for size in [1_000u32, 10_000] {
        let log = synthetic_log(size);
        let fixer = ParentFixer::from_commits((1..=size).filter(|i| i % 10 == 0).map(hash));

        group.bench_with_input(BenchmarkId::new("fix_commits", size), &log, |b, log| {
            b.iter(|| fix_commits(&config, black_box(log.clone())))
        });
        group.bench_with_input(BenchmarkId::new("prepared_fixer", size), &log, |b, log| {
            b.iter(|| {
                log.iter()
                    .cloned()
                    .map(|commit| fixer.fix_commit(commit))
                    .collect::<Vec<_>>()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matcher, bench_correction);
criterion_main!(benches);
