// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use aegean::{Image, PixelBeam};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;

fn synthetic_image(n: usize) -> Image {
    let data = Array2::from_shape_fn((n, n), |(y, x)| {
        let mut v = 0.0f32;
        for (cy, cx, amp) in [(n / 4, n / 4, 20.0), (n / 2, n / 2, 8.0), (3 * n / 4, n / 3, 12.0)] {
            let dy = y as f32 - cy as f32;
            let dx = x as f32 - cx as f32;
            v += amp * (-(dx * dx + dy * dy) / 18.0).exp();
        }
        v
    });
    Image::new(data)
}

fn bench_background_rms(c: &mut Criterion) {
    let image = synthetic_image(256);
    let pixel_beam = PixelBeam::new(4.0, 3.0, 0.0);

    c.benchmark_group("background")
        .sample_size(20)
        .bench_function("estimate_background_rms/256x256", |b| {
            b.iter(|| aegean::image::estimate_background_rms(&image, pixel_beam, None))
        });
}

fn bench_curvature(c: &mut Criterion) {
    let image = synthetic_image(256);

    c.benchmark_group("curvature")
        .sample_size(20)
        .bench_function("estimate_curvature/256x256", |b| {
            b.iter(|| aegean::image::estimate_curvature(&image, None))
        });
}

fn bench_segmenter(c: &mut Criterion) {
    let image = synthetic_image(256);
    let rms = Array2::from_elem((256, 256), 1.0f32);

    c.benchmark_group("segment")
        .sample_size(20)
        .bench_function("Segmenter::new/256x256", |b| {
            b.iter(|| {
                aegean::detect::Segmenter::new(image.data().view(), rms.view(), 5.0, 4.0).count()
            })
        });
}

criterion_group!(benches, bench_background_rms, bench_curvature, bench_segmenter);
criterion_main!(benches);
