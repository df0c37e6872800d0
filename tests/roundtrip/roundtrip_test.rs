use pngstream::adam7;
use pngstream::chunk::{write_chunk, write_iend, write_ihdr, ChunkType, SIGNATURE};
use pngstream::*;
use std::io::Write;

#[test]
fn roundtrip_grey() {
    roundtrip_color(ColorType::GREY, &[1, 2, 4, 8, 16]);
}

#[test]
fn roundtrip_rgb() {
    roundtrip_color(ColorType::RGB, &[8, 16]);
}

#[test]
fn roundtrip_rgba() {
    roundtrip_color(ColorType::RGBA, &[8, 16]);
}

#[test]
fn roundtrip_grey_alpha() {
    roundtrip_color(ColorType::GREY_ALPHA, &[8, 16]);
}

#[track_caller]
fn roundtrip_color(colortype: ColorType, bitdepths: &[u8]) {
    let filter_strategies = [
        FilterStrategy::MinSum,
        FilterStrategy::Fixed(FilterType::None),
        FilterStrategy::Fixed(FilterType::Sub),
        FilterStrategy::Fixed(FilterType::Up),
        FilterStrategy::Fixed(FilterType::Average),
        FilterStrategy::Fixed(FilterType::Paeth),
    ];
    let mut n = 0;
    let mut data = vec![0u16; 64 * 64 * 4];
    for &bitdepth in bitdepths {
        for &width in &[1, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 64] {
            randomize(&mut data);
            for &height in &[1, 2, 3, 5, 8, 17, 64] {
                n += 1;
                roundtrip_data(&data, width, height, colortype, bitdepth, filter_strategies[n % filter_strategies.len()]);
            }
        }
    }
}

fn randomize(data: &mut [u16]) {
    let mut seed = u32::from(data[0]);
    for b in data {
        seed = 1103515245u32.wrapping_mul(seed).wrapping_add(12345);
        *b ^= (seed >> 11) as u16;
    }
}

/// Canonical RGBA for raw samples of the given color type
fn to_rgba(samples: &[u16], colortype: ColorType, max: u16) -> Vec<u16> {
    samples.chunks_exact(usize::from(colortype.channels())).flat_map(|px| {
        let rgba = match colortype {
            ColorType::GREY => [px[0], px[0], px[0], max],
            ColorType::GREY_ALPHA => [px[0], px[0], px[0], px[1]],
            ColorType::RGB => [px[0], px[1], px[2], max],
            _ => [px[0], px[1], px[2], px[3]],
        };
        rgba.to_vec()
    }).collect()
}

#[track_caller]
fn roundtrip_data(data: &[u16], width: u32, height: u32, colortype: ColorType, bitdepth: u8, filter_strategy: FilterStrategy) {
    let samples = &data[..width as usize * height as usize * usize::from(colortype.channels())];

    let mut settings = EncoderSettings::default();
    settings.set_input(colortype, true);
    settings.set_output(colortype, bitdepth);
    settings.filter_strategy = filter_strategy;
    let encoder = Encoder::with_settings(settings);
    let decoder = Decoder::with_settings(DecoderSettings { skip_rescale: true, ..DecoderSettings::default() });

    let max = ((1u32 << bitdepth) - 1) as u16;
    if bitdepth == 16 {
        let file = encoder.encode(samples, width, height).unwrap();
        let img = decoder.decode(&file).unwrap();
        assert_eq!((img.width, img.height), (width, height));
        assert_eq!(img.pixels, Pixels::Rgba16(to_rgba(samples, colortype, max)));
    } else {
        let bytes: Vec<u8> = samples.iter().map(|&s| s as u8).collect();
        let file = encoder.encode(&bytes, width, height).unwrap();
        let img = decoder.decode(&file).unwrap();
        assert_eq!((img.width, img.height), (width, height));
        // only the top bits survive
        let raw: Vec<u16> = bytes.iter().map(|&b| u16::from(b) >> (8 - bitdepth)).collect();
        let expected: Vec<u8> = to_rgba(&raw, colortype, max).into_iter().map(|s| s as u8).collect();
        assert_eq!(img.pixels, Pixels::Rgba8(expected));

        // rescaled to 8 bits
        let img = decode_memory(&file).unwrap();
        let scaled: Vec<u8> = to_rgba(&raw, colortype, max).into_iter()
            .map(|s| ((f64::from(s) * 255. / f64::from(max)) + 0.5).floor() as u8)
            .collect();
        assert_eq!(img.pixels, Pixels::Rgba8(scaled));
    }
}

/// Packs samples MSB-first into one scanline
fn pack_line(samples: &[u16], bitdepth: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc = 0u32;
    let mut bits = 0;
    for &s in samples {
        acc = (acc << bitdepth) | u32::from(s);
        bits += bitdepth;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
    out
}

/// Builds a file with unfiltered image data, stored in Adam7 order when `interlaced`
fn build_png(samples: &[u16], width: u32, height: u32, colortype: ColorType, bitdepth: u8, interlaced: bool) -> Vec<u8> {
    let channels = usize::from(colortype.channels());
    let mut raw = Vec::new();
    for pass in adam7::passes(width, height, interlaced) {
        for y in 0..pass.height {
            let mut line = Vec::new();
            for x in 0..pass.width {
                let (px, py) = (pass.x0 + x * pass.dx, pass.y0 + y * pass.dy);
                let i = (py * width + px) as usize * channels;
                line.extend_from_slice(&samples[i..i + channels]);
            }
            raw.push(0);
            raw.extend(pack_line(&line, bitdepth));
        }
    }
    let mut z = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    z.write_all(&raw).unwrap();

    let mut out = SIGNATURE.to_vec();
    write_ihdr(&mut out, width, height, colortype, bitdepth).unwrap();
    if interlaced {
        // interlace method byte is just before the IHDR CRC
        let pos = out.len() - 5;
        out[pos] = 1;
        let crc = pngstream::crc::crc32(&out[12..pos + 1]);
        out.truncate(pos + 1);
        out.extend_from_slice(&crc.to_be_bytes());
    }
    write_chunk(&mut out, ChunkType::IDAT, &z.finish().unwrap()).unwrap();
    write_iend(&mut out).unwrap();
    out
}

#[test]
fn interlaced_matches_plain() {
    let mut data = vec![0u16; 17 * 17 * 4];
    randomize(&mut data);
    let combos: &[(ColorType, &[u8])] = &[
        (ColorType::GREY, &[1, 2, 4, 8, 16]),
        (ColorType::RGB, &[8, 16]),
        (ColorType::GREY_ALPHA, &[8, 16]),
        (ColorType::RGBA, &[8, 16]),
    ];
    let decoder = Decoder::with_settings(DecoderSettings { skip_rescale: true, ..DecoderSettings::default() });
    for &(colortype, depths) in combos {
        for &bitdepth in depths {
            let max = ((1u32 << bitdepth) - 1) as u16;
            let samples: Vec<u16> = data.iter().map(|&s| s & max).collect();
            for width in 1..=17 {
                for &height in &[1, 2, 5, 8, 9, 17] {
                    let n = (width * height) as usize * usize::from(colortype.channels());
                    let samples = &samples[..n];
                    let plain = decoder.decode(&build_png(samples, width, height, colortype, bitdepth, false)).unwrap();
                    let interlaced = decoder.decode(&build_png(samples, width, height, colortype, bitdepth, true)).unwrap();
                    assert!(interlaced.info.interlaced);
                    assert_eq!(plain.pixels, interlaced.pixels, "{:?} {} {}x{}", colortype, bitdepth, width, height);

                    let expected = to_rgba(samples, colortype, max);
                    match &interlaced.pixels {
                        Pixels::Rgba16(px) => assert_eq!(px, &expected),
                        Pixels::Rgba8(px) => assert!(px.iter().zip(&expected).all(|(&a, &b)| u16::from(a) == b)),
                    }
                }
            }
        }
    }
}

#[test]
fn interlaced_palette() {
    let palette: Vec<u8> = (0..16 * 3).map(|i| (i * 5) as u8).collect();
    let indices: Vec<u16> = (0..11 * 7).map(|i| (i * 7 % 16) as u16).collect();
    let mut file = build_png(&indices, 11, 7, ColorType::PALETTE, 4, true);
    // PLTE goes right after IHDR
    let idat_start = 8 + 25;
    let mut plte = Vec::new();
    write_chunk(&mut plte, ChunkType::PLTE, &palette).unwrap();
    let rest = file.split_off(idat_start);
    file.extend(plte);
    file.extend(rest);

    let img = decode_memory(&file).unwrap();
    let px = img.rgba8().unwrap();
    for (i, &index) in indices.iter().enumerate() {
        let e = usize::from(index) * 3;
        assert_eq!(px[i], RGBA8::new(palette[e], palette[e + 1], palette[e + 2], 255));
    }
}
