use super::*;

#[test]
fn decode_errors_keep_the_decoder_diagnostic() {
    let err = SourceError::decode(12, "truncated packet");
    let ev = ErrorEvent::from_source_error(&err, 12, Version(4));
    assert!(ev.summary.starts_with("Failed seeking video."));
    assert_eq!(ev.detail, "failed to decode frame 12: truncated packet");
    assert_eq!(ev.version, Version(4));
    assert!(ev.to_string().contains("Error message reported: failed to decode"));
}

#[test]
fn render_errors_have_their_own_summary() {
    let err = SubtitleError::Render("bad override tag".into());
    let ev = ErrorEvent::from_subtitle_error(&err, 3, Version(1));
    assert_eq!(ev.summary, "Failed rendering subtitles.");
    assert!(ev.detail.contains("bad override tag"));
    assert_eq!(PipelineEvent::RenderError(ev).version(), Version(1));
}
