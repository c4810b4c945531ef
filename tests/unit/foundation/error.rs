use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FrameError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        FrameError::from(SourceError::decode(3, "x"))
            .to_string()
            .contains("source error:")
    );
    assert!(
        FrameError::from(SubtitleError::Render("x".into()))
            .to_string()
            .contains("subtitle error:")
    );
    assert!(
        FrameError::from(DispatchError::AlreadyInitialized)
            .to_string()
            .contains("dispatch error:")
    );
}

#[test]
fn source_errors_carry_diagnostics() {
    let err = SourceError::Open {
        path: PathBuf::from("clip.mkv"),
        reason: "no decoder".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("clip.mkv"));
    assert!(msg.contains("no decoder"));

    let err = SourceError::OutOfRange { frame: 9, count: 4 };
    assert_eq!(err.to_string(), "frame 9 out of range (frame count 4)");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FrameError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
