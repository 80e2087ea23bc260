use super::*;

#[test]
fn pts_conversions_use_90khz_ticks() {
    assert_eq!(Pts::from_millis(1000), Pts(90_000));
    assert_eq!(Pts::from_micros(1_000_000), Pts(90_000));
    assert_eq!(Pts::from_micros(11), Pts(0));
}

#[test]
fn until_floors_to_milliseconds_and_never_goes_negative() {
    assert_eq!(Pts(90_500).until(Pts(91_000)), Duration::from_millis(5));
    assert_eq!(Pts(90_000).until(Pts(90_089)), Duration::ZERO);
    assert_eq!(Pts(91_000).until(Pts(90_000)), Duration::ZERO);
}

#[test]
fn stream_kind_parse_rejects_unknown_types() {
    assert_eq!(StreamKind::parse("video").unwrap(), StreamKind::Video);
    assert_eq!(StreamKind::parse("audio").unwrap(), StreamKind::Audio);
    let err = StreamKind::parse("subtitle").unwrap_err();
    assert!(matches!(err, VertexError::Configuration(_)));
    assert!(err.to_string().contains("subtitle"));
}

#[test]
fn rect_rejects_degenerate_sizes() {
    let r = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 10,
    };
    assert!(r.validate().is_err());
    let r = Rect {
        x: 5,
        y: 5,
        width: 16,
        height: 9,
    };
    assert!(r.validate().is_ok());
    assert!((r.aspect() - 16.0 / 9.0).abs() < 1e-12);
}
