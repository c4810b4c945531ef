use super::*;

#[test]
fn fps_rejects_zero_terms() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_frame_time_roundtrip_floor() {
    let fps = Fps::new(24000, 1001).unwrap();
    for frame in [0, 1, 23, 24, 1234, 86_400] {
        let ms = fps.time_at_frame_ms(frame);
        assert_eq!(fps.frame_at_time_ms(ms + 1), frame);
    }
}

#[test]
fn fps_integer_rate_times() {
    let fps = Fps::new(25, 1).unwrap();
    assert_eq!(fps.time_at_frame_ms(0), 0);
    assert_eq!(fps.time_at_frame_ms(25), 1000);
    assert_eq!(fps.frame_at_time_ms(999), 24);
    assert_eq!(fps.frame_at_time_ms(-40), 0);
}

#[test]
fn first_frame_from_ms_never_starts_before_the_time() {
    let fps = Fps::new(25, 1).unwrap();
    assert_eq!(fps.first_frame_from_ms(0), 0);
    assert_eq!(fps.first_frame_from_ms(-5), 0);
    assert_eq!(fps.first_frame_from_ms(40), 1);
    assert_eq!(fps.first_frame_from_ms(50), 2);
    assert_eq!(fps.first_frame_from_ms(1000), 25);

    let ntsc = Fps::new(24000, 1001).unwrap();
    for ms in [1, 41, 42, 43, 999, 1001, 12_345] {
        let frame = ntsc.first_frame_from_ms(ms);
        assert!(ntsc.time_at_frame_ms(frame) >= ms, "{ms} -> {frame}");
        assert!(ntsc.time_at_frame_ms(frame - 1) < ms, "{ms} -> {frame}");
    }
}

#[test]
fn invalid_rates_map_to_zero_instead_of_dividing() {
    for fps in [Fps { num: 0, den: 1 }, Fps { num: 25, den: 0 }] {
        assert!(!fps.is_valid());
        assert_eq!(fps.time_at_frame_ms(3), 0);
        assert_eq!(fps.frame_at_time_ms(1000), 0);
        assert_eq!(fps.first_frame_from_ms(1000), 0);
    }
    assert!(Fps::new(25, 1).unwrap().is_valid());
}
