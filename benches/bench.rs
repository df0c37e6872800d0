#![feature(test)]
use pngstream::{ColorType, Encoder, EncoderSettings, FilterStrategy, FilterType};

extern crate test;

#[bench]
fn roundtrip(bencher: &mut test::Bencher) {
    let mut data = vec![0u8; 640*480*4];
    for (i, px) in data.iter_mut().enumerate() {
        *px = ((i ^ (13 + i * 17) ^ (i * 13) ^ (i/113 * 11)) >> 5) as u8;
    }
    bencher.bytes = data.len() as _;
    bencher.iter(|| {
        let res = pngstream::encode_memory(&data, 640, 480).unwrap();
        pngstream::decode_memory(&res)
    });
}

#[bench]
fn decode_filter_0(bencher: &mut test::Bencher) {
    let res = test_png_with_filter(FilterType::None);
    bencher.bytes = res.len() as _;
    bencher.iter(|| {
        pngstream::decode_memory(&res)
    });
}

#[bench]
fn decode_filter_1(bencher: &mut test::Bencher) {
    let res = test_png_with_filter(FilterType::Sub);
    bencher.bytes = res.len() as _;
    bencher.iter(|| {
        pngstream::decode_memory(&res)
    });
}

#[bench]
fn decode_filter_3(bencher: &mut test::Bencher) {
    let res = test_png_with_filter(FilterType::Average);
    bencher.bytes = res.len() as _;
    bencher.iter(|| {
        pngstream::decode_memory(&res)
    });
}

#[bench]
fn decode_filter_4(bencher: &mut test::Bencher) {
    let res = test_png_with_filter(FilterType::Paeth);
    bencher.bytes = res.len() as _;
    bencher.iter(|| {
        pngstream::decode_memory(&res)
    });
}

#[bench]
fn decode_stream_4k(bencher: &mut test::Bencher) {
    let res = test_png_with_filter(FilterType::Paeth);
    bencher.bytes = res.len() as _;
    bencher.iter(|| {
        let mut d = pngstream::Decoder::new().stream();
        for piece in res.chunks(4096) {
            d.push(piece).unwrap();
        }
        d.finish()
    });
}

fn test_png_with_filter(filter: FilterType) -> Vec<u8> {
    let mut data = vec![0u8; 640*480*3];
    for (i, px) in data.iter_mut().enumerate() {
        *px = ((i ^ (13 + i * 81) ^ (i * 3) ^ (i/113 * 11)) >> 7) as u8;
    }
    let mut settings = EncoderSettings::default();
    settings.filter_strategy = FilterStrategy::Fixed(filter);
    settings.set_input(ColorType::RGB, false);
    settings.set_output(ColorType::RGB, 8);
    Encoder::with_settings(settings).encode(&data, 640, 480).unwrap()
}
