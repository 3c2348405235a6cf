/// Decoder benchmarks
///
/// Measures WAV parsing and PCM conversion throughput, the hot path of the
/// pipeline outside the engine call itself.

use callscribe::{wav, WHISPER_SAMPLE_RATE};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;

/// Author an in-memory WAV buffer with hound
fn wav_buffer(channels: u16, sample_rate: u32, duration_secs: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let num_frames = (sample_rate as f32 * duration_secs) as usize;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..num_frames * channels as usize {
            let t = i as f32 / sample_rate as f32;
            let v = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            writer.write_sample((v * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn bench_decode_mono(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_mono");

    for &duration_secs in &[1.0, 5.0, 10.0] {
        let buf = wav_buffer(1, WHISPER_SAMPLE_RATE, duration_secs);

        group.bench_with_input(
            BenchmarkId::new("decode", format!("{}s", duration_secs)),
            &buf,
            |b, buf| {
                b.iter(|| {
                    let audio = wav::decode(black_box(buf)).unwrap();
                    black_box(audio);
                });
            },
        );
    }

    group.finish();
}

fn bench_decode_stereo(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_stereo");

    let buf = wav_buffer(2, WHISPER_SAMPLE_RATE, 5.0);

    group.bench_function("decode_5s", |b| {
        b.iter(|| {
            let audio = wav::decode(black_box(&buf)).unwrap();
            black_box(audio);
        });
    });

    group.finish();
}

fn bench_parse_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_header");

    let buf = wav_buffer(1, WHISPER_SAMPLE_RATE, 1.0);

    group.bench_function("header_only", |b| {
        b.iter(|| {
            let header = wav::parse_header(black_box(&buf)).unwrap();
            black_box(header);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_decode_mono, bench_decode_stereo, bench_parse_header);
criterion_main!(benches);
