#![no_main]
#[macro_use] extern crate libfuzzer_sys;

fuzz_target!(|data: &[u8]| {
    let whole = pngstream::decode_memory(data);

    // same result no matter how the input is split
    let split = data.first().map_or(1, |&b| usize::from(b).max(1));
    let mut decoder = pngstream::Decoder::new().stream();
    let streamed = data.chunks(split).try_for_each(|piece| decoder.push(piece)).and_then(|_| decoder.finish());

    match (whole, streamed) {
        (Ok(a), Ok(b)) => {
            assert_eq!(a, b);
            let png = pngstream::Encoder::new().encode_image(&a).unwrap();
            let c = pngstream::decode_memory(&png).unwrap();
            assert_eq!(a.pixels, c.pixels);
        },
        (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind()),
        (a, b) => panic!("buffered {:?} != streamed {:?}", a.map(|_| ()), b.map(|_| ())),
    }
});
