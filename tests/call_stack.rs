//! Stack capture and filtering against real call chains.

use panictrace::{
    CallStack, Frame, Predicate,
    call_stack,
    capture::{self, INITIAL_DEPTH},
    filter::is_unexported_runtime,
};
use panictrace_testing::descend;

const DESCEND: &str = "panictrace_testing/markers.descend";

fn is_descend(frame: &Frame) -> bool { frame.function() == DESCEND }

#[test]
fn deep_stacks_are_captured_whole() {
    let trace = descend(50, &mut || capture::raw_stack(0));
    assert!(trace.len() > INITIAL_DEPTH * 2, "buffer never grew: {}", trace.len());

    // descend(50) down to descend(0)
    let markers = trace.resolve().filter(is_descend).count();
    assert_eq!(markers, 51);
}

#[test]
fn filtered_stack_keeps_every_marker_frame() {
    let only_markers: &Predicate = &is_descend;
    let trace = descend(20, &mut || capture::raw_stack(0));
    assert_eq!(CallStack::from_trace(trace, Some(only_markers)).count(), 21);
}

#[test]
fn runtime_frames_are_filtered_out() {
    let trace = descend(3, &mut || capture::raw_stack(0));
    assert!(
        trace.resolve().any(|f| is_unexported_runtime(f.function())),
        "raw trace should contain runtime frames"
    );
    let frames: Vec<Frame> = CallStack::from_trace(trace, None).collect();
    assert!(!frames.is_empty());
    for frame in &frames {
        assert!(!is_unexported_runtime(frame.function()), "{frame:?}");
    }
}

#[test]
fn innermost_frame_comes_first() {
    let frames: Vec<Frame> = descend(2, &mut || call_stack(0, None).take(2).collect());
    assert_eq!(frames.len(), 2);
    assert!(frames[0].function().contains("{{closure}}"), "{:?}", frames[0]);
    assert_eq!(frames[1].function(), DESCEND);
}

#[test]
fn stopping_early_yields_a_prefix() {
    let all: Vec<String> = descend(5, &mut || {
        call_stack(0, None).map(|f| f.function().to_owned()).collect()
    });
    let first: Vec<String> = descend(5, &mut || {
        call_stack(0, None)
            .take(3)
            .map(|f| f.function().to_owned())
            .collect()
    });
    assert_eq!(first.len(), 3);
    assert_eq!(first[1..], all[1..3]);
}

#[test]
fn frames_carry_source_locations() {
    let frame = descend(1, &mut || call_stack(0, None).nth(1))
        .expect("stack holds the marker frame");
    assert_eq!(frame.function(), DESCEND);
    assert!(frame.file().ends_with("markers.rs"), "{}", frame.file());
    assert!(frame.line() > 0);
    assert!(frame.entry().is_none_or(|entry| entry.line <= frame.line()));
}

#[test]
fn marker_frames_know_their_entry_line() {
    let frame = descend(1, &mut || call_stack(0, None).nth(1))
        .expect("stack holds the marker frame");
    assert_eq!(frame.function(), DESCEND);
    let offset = frame.offset().expect("entry line resolved from the symbol address");
    // The recursive call sits a few lines below the signature.
    assert!((1..20).contains(&offset), "{frame:?}");
}
