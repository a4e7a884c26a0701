//! Benchmark-only crate. The benchmarks live in `benches/core.rs`.
