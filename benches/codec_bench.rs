//! Codec benchmarks: escaping, splitting and segment decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use finwire::element::{AlphaNumericElement, BinaryElement, DigitElement, Element};
use finwire::segment::{RawSegment, SegmentRegistry};
use finwire::syntax;

const SAMPLE_MESSAGE: &[u8] = b"HNHBK:1:3+000000000245+220+DLG42+1+DLG42:1'\
HNSHK:2:3+999+1+1+1+1::SYS0815+1+1:20260801:120000+1:999:1+6:10:16+280:10020030:user1:S:0:0'\
HIRMG:3:2+0010::Nachricht entgegengenommen.'\
HISYN:4:3:5+SYS0815'\
HIUPD:5:4:3+1234567::280:10020030+user1+EUR+Jane Doe++Girokonto'\
HNHBS:6:1+1'";

fn bench_escape(c: &mut Criterion) {
    let text = "statement: booked +1.234,56 EUR ('provisional')";
    c.bench_function("escape_unescape", |b| {
        b.iter(|| {
            let escaped = syntax::escape(black_box(text));
            black_box(syntax::unescape(&escaped))
        })
    });
}

fn bench_split_segments(c: &mut Criterion) {
    c.bench_function("split_segments", |b| {
        b.iter(|| syntax::split_segments(black_box(SAMPLE_MESSAGE)).unwrap())
    });
}

fn bench_element_encode(c: &mut Criterion) {
    c.bench_function("element_encode", |b| {
        b.iter(|| {
            black_box(DigitElement::new(245, 12).encode());
            black_box(AlphaNumericElement::new("DLG42", 30).encode());
            black_box(BinaryElement::new(&b"test123"[..], 7).encode());
        })
    });
}

fn bench_decode_message(c: &mut Criterion) {
    let registry = SegmentRegistry::standard();
    c.bench_function("decode_message", |b| {
        b.iter(|| {
            for raw in syntax::split_segments(black_box(SAMPLE_MESSAGE)).unwrap() {
                let segment = RawSegment::parse(raw).unwrap();
                black_box(registry.decode(&segment).unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_escape,
    bench_split_segments,
    bench_element_encode,
    bench_decode_message
);
criterion_main!(benches);
