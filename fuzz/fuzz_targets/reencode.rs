#![no_main]
use rgb::ComponentBytes;
#[macro_use] extern crate libfuzzer_sys;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let width = (data[0] as usize).min(data.len() / 4).max(1);
    let height = data.len() / 4 / width;
    if height == 0 {
        return;
    }
    let data = &data[..width * height * 4];

    let file = pngstream::encode_memory(data, width as u32, height as u32).unwrap();
    let decoded = pngstream::decode_memory(&file).unwrap();
    assert_eq!(decoded.width as usize, width);
    assert_eq!(decoded.height as usize, height);
    assert_eq!(data, decoded.rgba8().unwrap().as_bytes());
});
