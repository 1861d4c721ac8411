use super::*;

#[test]
fn test_bytes_codec_round_trips() {
    let codec = BytesCodec;
    let original = vec![1_u8, 2, 3, 4, 5];
    let encoded = codec.encode(Some(&original)).unwrap().unwrap();
    let decoded = codec.decode(Some(&encoded)).unwrap().unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_bytes_codec_absent_round_trips() {
    let codec = BytesCodec;
    assert!(codec.encode(None).unwrap().is_none());
    assert!(codec.decode(None).unwrap().is_none());
}

#[test]
fn test_utf8_codec_round_trips() {
    let codec = Utf8Codec;
    let original = "hello, orbitree".to_string();
    let encoded = codec.encode(Some(&original)).unwrap().unwrap();
    let decoded = codec.decode(Some(&encoded)).unwrap().unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_utf8_codec_rejects_invalid_bytes() {
    let codec = Utf8Codec;
    let bad = vec![0xff, 0xfe, 0xfd];
    assert!(codec.decode(Some(&bad)).is_err());
}

#[test]
fn test_numeric_codec_f64_round_trips() {
    let codec = NumericCodec;
    let original = -12345.6789_f64;
    let encoded = Codec::<f64>::encode(&codec, Some(&original)).unwrap().unwrap();
    let decoded = Codec::<f64>::decode(&codec, Some(&encoded)).unwrap().unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_numeric_codec_i64_round_trips() {
    let codec = NumericCodec;
    let original = -42_i64;
    let encoded = Codec::<i64>::encode(&codec, Some(&original)).unwrap().unwrap();
    let decoded = Codec::<i64>::decode(&codec, Some(&encoded)).unwrap().unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_numeric_codec_rejects_wrong_width() {
    let codec = NumericCodec;
    let short = vec![0_u8; 4];
    assert!(Codec::<f64>::decode(&codec, Some(&short)).is_err());
}

#[test]
fn test_void_codec_round_trips_absent() {
    let codec = VoidCodec;
    let encoded = codec.encode(None).unwrap();
    assert!(encoded.is_none());
    let decoded = codec.decode(None).unwrap();
    assert!(decoded.is_none());
}

#[test]
fn test_void_codec_rejects_present_value() {
    let codec = VoidCodec;
    assert!(codec.encode(Some(&())).is_err());
    assert!(codec.decode(Some(&[1, 2, 3])).is_err());
}
