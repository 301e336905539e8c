use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reinc_core::{preset, FixedWorkDir, MemoryFileOpener, Replacer, ReplacerConfig, RuleConfig};

fn benchmark_scan_without_matches(c: &mut Criterion) {
    let replacer = Replacer::from_config(&preset("c").unwrap()).unwrap();
    let content = "int main(void) { return 0; }\n".repeat(2000);

    c.bench_function("scan_no_directives_2000_lines", |b| {
        b.iter(|| replacer.replace_to_vec(black_box(content.as_bytes())))
    });
}

fn benchmark_nested_inclusion(c: &mut Criterion) {
    let opener = (0..50).fold(MemoryFileOpener::new(), |opener, i| {
        opener.with_file(format!("/w/part{}.txt", i), format!("part {} @leaf.txt\n", i))
    });
    let opener = opener.with_file("/w/leaf.txt", "leaf");

    let replacer = Replacer::from_config(&ReplacerConfig::new(vec![
        RuleConfig::new(r"@(\w+\.txt)", "$1"),
    ]))
    .unwrap()
    .with_opener(opener)
    .with_work_dir(FixedWorkDir("/w".into()));

    let input: String = (0..50).map(|i| format!("line {} @part{}.txt\n", i, i)).collect();

    c.bench_function("nested_inclusion_50_files", |b| {
        b.iter(|| replacer.replace_to_vec(black_box(input.as_bytes())))
    });
}

criterion_group!(benches, benchmark_scan_without_matches, benchmark_nested_inclusion);
criterion_main!(benches);
