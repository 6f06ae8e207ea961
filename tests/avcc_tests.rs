use mp4tree::avcc::{AvcConfigError, AvcConfigurationBox};
use mp4tree::boxes::{FourCC, Mp4Box, Payload};
use mp4tree::parser::{ParseError, parse_tree};
use mp4tree::registry::default_registry;
use mp4tree::writer::write_tree;
use std::io::Cursor;

fn avcc_box(content: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((content.len() + 8) as u32).to_be_bytes());
    v.extend_from_slice(b"avcC");
    v.extend_from_slice(content);
    v
}

fn parse_one(data: &[u8]) -> Mp4Box {
    let reg = default_registry();
    let mut boxes = parse_tree(&mut Cursor::new(data.to_vec()), &reg, 0, data.len() as u64)
        .expect("parse failed");
    assert_eq!(boxes.len(), 1);
    boxes.remove(0)
}

fn config_of(b: &Mp4Box) -> &AvcConfigurationBox {
    match &b.payload {
        Payload::AvcConfig(cfg) => cfg,
        other => panic!("expected avcC payload, got {other:?}"),
    }
}

#[test]
fn baseline_profile_no_parameter_sets() {
    // version 1, profile 66, compat 0, level 30, 0xFF length-size byte,
    // zero SPS, zero PPS, nothing after -> no extension block
    let data = avcc_box(&[0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE0, 0x00]);
    let b = parse_one(&data);
    let cfg = config_of(&b);

    assert_eq!(cfg.configuration_version, 1);
    assert_eq!(cfg.avc_profile_indication, 66);
    assert_eq!(cfg.profile_compatibility, 0);
    assert_eq!(cfg.avc_level_indication, 30);
    assert_eq!(cfg.length_size_minus_one(), 3);
    assert!(cfg.sequence_parameter_sets().is_empty());
    assert!(cfg.picture_parameter_sets().is_empty());
    assert!(!cfg.has_exts());
    assert_eq!(cfg.chroma_format(), None);
    assert_eq!(cfg.bit_depth_luma_minus8(), None);
    assert_eq!(cfg.bit_depth_chroma_minus8(), None);

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");
    assert_eq!(out, data);
}

#[test]
fn zero_length_parameter_set_entry_roundtrips() {
    // count byte 0xE1 declares one SPS entry; its length prefix is 0
    let data = avcc_box(&[0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x00, 0x00]);
    let b = parse_one(&data);
    let cfg = config_of(&b);

    assert_eq!(cfg.sequence_parameter_sets(), &[Vec::<u8>::new()]);
    assert!(cfg.picture_parameter_sets().is_empty());

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");
    assert_eq!(out, data);
}

#[test]
fn parameter_sets_roundtrip() {
    let mut content = vec![0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1];
    content.extend_from_slice(&[0x00, 0x04, 0x67, 0x42, 0x00, 0x1E]); // SPS
    content.push(0x01);
    content.extend_from_slice(&[0x00, 0x04, 0x68, 0xCE, 0x38, 0x80]); // PPS
    let data = avcc_box(&content);

    let b = parse_one(&data);
    let cfg = config_of(&b);

    assert_eq!(cfg.sequence_parameter_sets(), &[vec![0x67, 0x42, 0x00, 0x1E]]);
    assert_eq!(cfg.picture_parameter_sets(), &[vec![0x68, 0xCE, 0x38, 0x80]]);
    assert!(!cfg.has_exts());

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");
    assert_eq!(out, data);
}

#[test]
fn high_profile_extension_block() {
    let mut content = vec![0x01, 0x64, 0x00, 0x28, 0xFF, 0xE1];
    content.extend_from_slice(&[0x00, 0x04, 0x67, 0x64, 0x00, 0x28]);
    content.push(0x01);
    content.extend_from_slice(&[0x00, 0x04, 0x68, 0xEE, 0x38, 0x80]);
    // chroma 4:2:0, both depth offsets 0, no extension NAL units
    content.extend_from_slice(&[0xFD, 0xF8, 0xF8, 0x00]);
    let data = avcc_box(&content);

    let b = parse_one(&data);
    let cfg = config_of(&b);

    assert_eq!(cfg.avc_profile_indication, 100);
    assert!(cfg.has_exts());
    assert_eq!(cfg.chroma_format(), Some(1));
    assert_eq!(cfg.bit_depth_luma_minus8(), Some(0));
    assert_eq!(cfg.bit_depth_chroma_minus8(), Some(0));
    assert!(cfg.sequence_parameter_set_exts().is_empty());

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");
    assert_eq!(out, data);
}

#[test]
fn nonstandard_reserved_bits_are_preserved() {
    // reserved groups deliberately not all-ones: 0x2B = 001010|11,
    // 0x40 = 010|00000, ext bytes 0x01 / 0x00 / 0x11
    let data = avcc_box(&[
        0x01, 0x6E, 0x00, 0x28, 0x2B, 0x40, 0x00, 0x01, 0x00, 0x11, 0x00,
    ]);
    let b = parse_one(&data);
    let cfg = config_of(&b);

    assert_eq!(cfg.avc_profile_indication, 110);
    assert_eq!(cfg.length_size_minus_one(), 3);
    assert_eq!(cfg.chroma_format(), Some(1));
    assert_eq!(cfg.bit_depth_chroma_minus8(), Some(1));

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");
    assert_eq!(out, data, "reserved bit patterns must survive the round trip");
}

#[test]
fn non_extension_profile_never_emits_extension_block() {
    let mut cfg = AvcConfigurationBox::default();
    assert_eq!(cfg.avc_profile_indication, 66);
    cfg.set_chroma_format(1).unwrap();

    let b = Mp4Box::avc_config(cfg);
    assert_eq!(b.content_size(), 7);

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");

    let reparsed = parse_one(&out);
    let cfg = config_of(&reparsed);
    assert!(!cfg.has_exts());
    assert_eq!(cfg.chroma_format(), None);
    assert_eq!(cfg.bit_depth_luma_minus8(), None);
}

#[test]
fn high_profile_default_extension_roundtrips() {
    let mut cfg = AvcConfigurationBox::default();
    cfg.avc_profile_indication = 100;

    let b = Mp4Box::avc_config(cfg);
    assert_eq!(b.content_size(), 11);

    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");

    let reparsed = parse_one(&out);
    let cfg = config_of(&reparsed);
    assert!(cfg.has_exts());
    assert_eq!(cfg.chroma_format(), Some(1));
}

#[test]
fn sps_count_field_comes_from_sps_list() {
    let mut cfg = AvcConfigurationBox::default();
    cfg.add_sequence_parameter_set(vec![0x67, 0x01]).unwrap();
    cfg.add_sequence_parameter_set(vec![0x67, 0x02]).unwrap();
    cfg.add_picture_parameter_set(vec![0x68, 0x03]).unwrap();

    let b = Mp4Box::avc_config(cfg);
    let mut out = Vec::new();
    write_tree(std::slice::from_ref(&b), &mut out).expect("write failed");

    // header(8) + 4 fixed + length-size byte, then the SPS count byte
    assert_eq!(out[13] & 0x1F, 2);

    let reparsed = parse_one(&out);
    let cfg = config_of(&reparsed);
    assert_eq!(cfg.sequence_parameter_sets().len(), 2);
    assert_eq!(cfg.picture_parameter_sets().len(), 1);
}

#[test]
fn truncated_pps_entry_is_structural_corruption() {
    // the last PPS declares 4 bytes but the content span holds 3
    let mut content = vec![0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1];
    content.extend_from_slice(&[0x00, 0x04, 0x67, 0x42, 0x00, 0x1E]);
    content.push(0x01);
    content.extend_from_slice(&[0x00, 0x04, 0x68, 0xCE, 0x38]);
    let data = avcc_box(&content);

    let reg = default_registry();
    let err = parse_tree(&mut Cursor::new(data.clone()), &reg, 0, data.len() as u64).unwrap_err();

    match err {
        ParseError::Payload { chain, .. } => {
            assert_eq!(chain.tags(), &[FourCC(*b"avcC")]);
        }
        other => panic!("expected payload corruption, got {other:?}"),
    }
}

#[test]
fn trailing_garbage_after_record_is_rejected() {
    let data = avcc_box(&[0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE0, 0x00, 0xAA, 0xBB]);
    let reg = default_registry();
    let err = parse_tree(&mut Cursor::new(data.clone()), &reg, 0, data.len() as u64).unwrap_err();
    assert!(matches!(err, ParseError::Payload { .. }));
}

#[test]
fn mutators_enforce_field_ranges() {
    let mut cfg = AvcConfigurationBox::default();

    assert!(matches!(
        cfg.set_length_size_minus_one(4),
        Err(AvcConfigError::OutOfRange { .. })
    ));
    assert!(matches!(
        cfg.set_chroma_format(4),
        Err(AvcConfigError::OutOfRange { .. })
    ));
    assert!(matches!(
        cfg.set_bit_depth_luma_minus8(8),
        Err(AvcConfigError::OutOfRange { .. })
    ));
    assert!(matches!(
        cfg.add_sequence_parameter_set(vec![0; 65536]),
        Err(AvcConfigError::NalTooLong { .. })
    ));

    for _ in 0..31 {
        cfg.add_sequence_parameter_set(vec![0x67]).unwrap();
    }
    assert!(matches!(
        cfg.add_sequence_parameter_set(vec![0x67]),
        Err(AvcConfigError::TooManyEntries { .. })
    ));
}
