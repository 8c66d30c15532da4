use std::hint::black_box;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use css_sprite_core::descriptor::DescriptorBuilder;
use css_sprite_core::matcher::declarations;
use css_sprite_core::prelude::*;
use rand::Rng;

fn generate_stylesheet(rules: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut css = String::with_capacity(rules * 96);
    for i in 0..rules {
        match rng.gen_range(0..4) {
            0 => css.push_str(&format!(
                ".r{i} {{ color: #{:06x}; margin: 0 auto; }}\n",
                rng.gen_range(0..0xffffff)
            )),
            1 => css.push_str(&format!(
                ".r{i} {{ background: url(\"img/icon_{}@2x.png\") 0 -{}px no-repeat; }}\n",
                i % 64,
                rng.gen_range(0..200)
            )),
            2 => css.push_str(&format!(
                ".r{i} {{ background: url(img/icon_{}.png) left top no-repeat #fff; /* @meta {{\"sprite\": {{\"tag\": \"t{i}\"}}}} */ }}\n",
                i % 64
            )),
            _ => css.push_str(&format!(".r{i} {{ background-image: url(img/bg_{i}.jpg); }}\n")),
        }
    }
    css
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let cfg = SpriteConfig::builder().sprite_sheet_name("sprite.png").build();
    let builder = DescriptorBuilder::new(Path::new("/bench/css/main.css"), &cfg);

    for rules in [100, 1_000, 10_000] {
        let css = generate_stylesheet(rules);
        group.throughput(Throughput::Bytes(css.len() as u64));

        group.bench_with_input(BenchmarkId::new("declarations", rules), &css, |b, css| {
            b.iter(|| black_box(declarations(css).count()));
        });

        group.bench_with_input(BenchmarkId::new("descriptors", rules), &css, |b, css| {
            b.iter(|| black_box(builder.collect(css).map(|images| images.len())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
