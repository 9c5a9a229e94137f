//! Benchmarks for the shader front end.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hlslc::{compile, CompileOptions, Stage};

const SHADER: &str = r#"
    struct Light { float3 dir; float4 color; };

    float4 shade(float3 n, Light l) {
        float d = saturate(dot(n, -l.dir));
        return l.color * d;
    }

    float4 main(float3 n : NORMAL, float4 pos : POSITION) : SV_POSITION {
        Light l;
        l.dir = float3(0, -1, 0);
        l.color = float4(1, 1, 1, 1);
        float4 acc = float4(0, 0, 0, 0);
        for (int i = 0; i < 4; i++) {
            if (i == 2 && acc.x > 0.5) continue;
            acc += shade(normalize(n), l);
        }
        return acc.xyzw;
    }
"#;

/// Benchmark lexer speed.
fn bench_lexing(c: &mut Criterion) {
    c.bench_function("lex_shader", |b| {
        b.iter(|| {
            let lexer = hlslc::frontend::Lexer::new(black_box(SHADER), "bench.hlsl");
            lexer.tokenize().unwrap()
        })
    });
}

/// Benchmark each pipeline stage on the same shader.
fn bench_stages(c: &mut Criterion) {
    for (name, stage) in [("parse_shader", Stage::Parse), ("analyze_shader", Stage::Analyze), ("lower_shader", Stage::Ir)] {
        let options = CompileOptions { stop_after: stage, ..CompileOptions::default() };
        c.bench_function(name, |b| {
            b.iter(|| compile(black_box(SHADER), &options))
        });
    }
}

/// Benchmark a long flat function body.
fn bench_long_body(c: &mut Criterion) {
    let mut source = String::from("int main() { int x = 0;\n");
    for _ in 0..2_000 {
        source.push_str("x = x * 3 + 1;\n");
    }
    source.push_str("return x; }\n");

    c.bench_function("lower_long_body", |b| {
        b.iter(|| compile(black_box(&source), &CompileOptions::default()))
    });
}

criterion_group!(benches, bench_lexing, bench_stages, bench_long_body);
criterion_main!(benches);
