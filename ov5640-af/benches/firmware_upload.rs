use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ov5640_af::firmware::{load_firmware, FirmwareChunks};
use ov5640_af::SensorModel;
use ov5640_af_test_data::{sample_firmware, MockBus, OV5640_ADDRESS};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Firmware Upload");

    // The stock autofocus firmware is a little under 4KiB
    for length in [600usize, 4096, 0x8000] {
        let firmware = sample_firmware(length);
        group.bench_with_input(BenchmarkId::new("Chunking", length), &firmware, |b, fw| {
            b.iter(|| FirmwareChunks::new(black_box(fw)).map(Iterator::count))
        });
        group.bench_with_input(BenchmarkId::new("Mock Bus", length), &firmware, |b, fw| {
            let mut bus = MockBus::new(OV5640_ADDRESS);
            let mut delay = bus.delay();
            b.iter(|| {
                bus.clear_events();
                load_firmware(&mut bus, OV5640_ADDRESS, &mut delay, SensorModel::Ov5640, fw)
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
