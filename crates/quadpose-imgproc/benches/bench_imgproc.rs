use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use quadpose_image::{Image, ImageSize};
use quadpose_imgproc::{contours, morphology, threshold};

fn random_rgb(size: ImageSize) -> Image<u8, 3> {
    let mut rng = rand::rng();
    let data = (0..size.area() * 3).map(|_| rng.random::<u8>()).collect();
    Image::new(size, data).expect("valid image size")
}

fn bench_in_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("InRange");

    for (width, height) in [(320, 240), (640, 480), (1280, 960)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));
        let label = format!("{width}x{height}");
        let size = ImageSize {
            width: *width,
            height: *height,
        };

        let img = random_rgb(size);
        let dst = Image::<u8, 1>::from_size_val(size, 0).expect("valid image size");

        group.bench_with_input(BenchmarkId::new("in_range", &label), &(&img, &dst), |b, i| {
            let (src, mut out) = (i.0, i.1.clone());
            b.iter(|| {
                std::hint::black_box(threshold::in_range(
                    src,
                    &mut out,
                    &[0, 0, 168],
                    &[255, 152, 255],
                ))
            })
        });
    }

    group.finish();
}

fn bench_clean_and_contours(c: &mut Criterion) {
    let mut group = c.benchmark_group("MaskCleanup");

    let kernel = morphology::Kernel::from_shape(morphology::KernelShape::Ellipse, 5, 5)
        .expect("valid kernel");

    for (width, height) in [(320, 240), (640, 480)].iter() {
        let label = format!("{width}x{height}");
        let size = ImageSize {
            width: *width,
            height: *height,
        };

        let img = random_rgb(size);
        let mut mask = Image::<u8, 1>::from_size_val(size, 0).expect("valid image size");
        threshold::in_range(&img, &mut mask, &[0, 0, 128], &[255, 255, 255])
            .expect("matching sizes");

        group.bench_with_input(BenchmarkId::new("dilate", &label), &mask, |b, m| {
            let mut out = m.clone();
            b.iter(|| std::hint::black_box(morphology::dilate(m, &mut out, &kernel)))
        });

        group.bench_with_input(BenchmarkId::new("find_contours", &label), &mask, |b, m| {
            b.iter(|| std::hint::black_box(contours::find_external_contours(m)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_in_range, bench_clean_and_contours);
criterion_main!(benches);
