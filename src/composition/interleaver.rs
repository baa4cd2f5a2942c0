use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::annotations::{sort_annotations, Annotation};
use crate::error::{CompositorError, ErrorKind, Result, VideoError};
use crate::interstitial::Interstitial;
use crate::render::TextRenderer;
use crate::video::io::{FrameSink, FrameSource};
use crate::video::types::{FrameRate, StreamDescriptor};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterleaveState {
    /// Pulling the next source frame
    Reading,
    /// Writing a text card burst
    Injecting,
    /// Source exhausted, output finished
    Done,
    Failed,
}

/// Progress through the source frames and the annotation list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterleaveCursor {
    pub frame_index: u64,
    pub next_annotation: usize,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveReport {
    pub frame_rate: FrameRate,
    pub source_frames: u64,
    pub injected_frames: u64,
    pub fired_annotations: usize,
    /// Annotations at or past the end of the source, which never fire
    pub unfired_annotations: usize,
}

impl InterleaveReport {
    pub fn output_frames(&self) -> u64 {
        self.source_frames + self.injected_frames
    }

    pub fn source_duration(&self) -> f64 {
        self.frame_rate.time_of_frame(self.source_frames)
    }

    pub fn output_duration(&self) -> f64 {
        self.frame_rate.time_of_frame(self.output_frames())
    }
}

/// Splices text card bursts into a stream of source frames
///
/// For every source frame the playback time `frame_index / fps` is compared
/// with the next pending annotation. Every annotation whose timestamp has been
/// reached fires, in order, before the frame itself is written. Card frames do
/// not advance the source clock.
pub struct Interleaver<'a> {
    annotations: Vec<Annotation>,
    renderer: &'a dyn TextRenderer,
    background: [u8; 3],
    card_duration: f64,
    cancel: Option<Arc<AtomicBool>>,
    state: InterleaveState,
    cursor: InterleaveCursor,
}

impl<'a> Interleaver<'a> {
    /// Create an interleaver; annotations are stable-sorted by timestamp
    pub fn new(
        mut annotations: Vec<Annotation>,
        renderer: &'a dyn TextRenderer,
        background: [u8; 3],
        card_duration: f64,
    ) -> Self {
        sort_annotations(&mut annotations);
        Self {
            annotations,
            renderer,
            background,
            card_duration,
            cancel: None,
            state: InterleaveState::Reading,
            cursor: InterleaveCursor::default(),
        }
    }

    /// Stop between source frames once `flag` is raised
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> InterleaveState {
        self.state
    }

    pub fn cursor(&self) -> InterleaveCursor {
        self.cursor
    }

    /// Copy `source` into `sink`, injecting a card burst at each annotation
    ///
    /// The sink is finished on both success and failure. After a failure the
    /// sink holds whatever was written before the failing frame.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<InterleaveReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        self.state = InterleaveState::Reading;
        self.cursor = InterleaveCursor::default();

        let descriptor = source.descriptor();
        let outcome = self.drive(source, sink, &descriptor);

        match outcome {
            Ok(report) => {
                if let Err(e) = sink.finish() {
                    self.state = InterleaveState::Failed;
                    return Err(e);
                }
                self.state = InterleaveState::Done;

                if report.unfired_annotations > 0 {
                    info!("{} annotation(s) lie beyond the end of the video and were not shown",
                          report.unfired_annotations);
                }
                Ok(report)
            }
            Err(e) => {
                self.state = InterleaveState::Failed;
                match sink.finish() {
                    // A broken pipe is usually the encoder refusing the codec
                    Err(close) if close.kind() == ErrorKind::UnsupportedFormat => Err(close),
                    Err(close) => {
                        warn!("Failed to close output after error: {}", close);
                        Err(e)
                    }
                    Ok(()) => Err(e),
                }
            }
        }
    }

    fn drive<S, K>(&mut self, source: &mut S, sink: &mut K, descriptor: &StreamDescriptor) -> Result<InterleaveReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let frame_rate = descriptor.frame_rate;
        let mut injected_frames = 0u64;
        let mut fired_annotations = 0usize;

        loop {
            if self.is_cancelled() {
                return Err(VideoError::Cancelled { frame_index: self.cursor.frame_index }.into());
            }

            self.state = InterleaveState::Reading;
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(at_frame(self.cursor.frame_index, e)),
            };

            let current_time = frame_rate.time_of_frame(self.cursor.frame_index);
            while let Some(annotation) = self.annotations.get(self.cursor.next_annotation) {
                if current_time < annotation.timestamp() {
                    break;
                }

                self.state = InterleaveState::Injecting;
                debug!("Frame {} ({:.3}s): injecting {:?} (due {:.3}s)",
                       self.cursor.frame_index, current_time, annotation.text(), annotation.timestamp());

                let card = self.renderer.render(
                    annotation.text(),
                    descriptor.width,
                    descriptor.height,
                    self.background,
                )?;
                for card_frame in Interstitial::new(card, self.card_duration, frame_rate) {
                    sink.write_frame(card_frame)
                        .map_err(|e| at_frame(self.cursor.frame_index, e))?;
                    injected_frames += 1;
                }

                self.cursor.next_annotation += 1;
                fired_annotations += 1;
            }

            self.state = InterleaveState::Reading;
            sink.write_frame(frame)
                .map_err(|e| at_frame(self.cursor.frame_index, e))?;
            self.cursor.frame_index += 1;
        }

        let report = InterleaveReport {
            frame_rate,
            source_frames: self.cursor.frame_index,
            injected_frames,
            fired_annotations,
            unfired_annotations: self.annotations.len() - self.cursor.next_annotation,
        };

        debug!("Interleave finished: {:?}", report);
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Re-label stream I/O failures with the source frame being processed
fn at_frame(frame_index: u64, error: CompositorError) -> CompositorError {
    match error {
        CompositorError::Video(VideoError::MidStream { reason, .. }) => {
            VideoError::MidStream { frame_index, reason }.into()
        }
        CompositorError::Io(e) => VideoError::MidStream { frame_index, reason: e.to_string() }.into(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::video::memory::{MemorySink, MemorySource};
    use crate::video::types::Frame;

    /// Renders a flat card whose green channel is the first byte of the text
    struct StubRenderer;

    impl TextRenderer for StubRenderer {
        fn name(&self) -> &str {
            "stub"
        }

        fn render(&self, text: &str, width: u32, height: u32, background: [u8; 3]) -> Result<Frame> {
            Ok(Frame::new_filled(width, height, [background[0], text.as_bytes()[0], 0]))
        }
    }

    struct BrokenRenderer;

    impl TextRenderer for BrokenRenderer {
        fn name(&self) -> &str {
            "broken"
        }

        fn render(&self, _: &str, _: u32, _: u32, _: [u8; 3]) -> Result<Frame> {
            Err(RenderError::Unavailable { reason: "no font".to_string() }.into())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Out {
        Source(u8),
        Card(char),
    }

    fn descriptor(fps: FrameRate) -> StreamDescriptor {
        StreamDescriptor::new(fps, 4, 4)
    }

    /// Source frame `i` is filled with [1, 1, i]
    fn source(count: u8, fps: FrameRate) -> MemorySource {
        let frames = (0..count).map(|i| Frame::new_filled(4, 4, [1, 1, i])).collect();
        MemorySource::new(descriptor(fps), frames)
    }

    fn fps2() -> FrameRate {
        FrameRate::from_integer(2).unwrap()
    }

    fn notes(entries: &[(f64, &str)]) -> Vec<Annotation> {
        entries.iter().map(|&(t, text)| Annotation::new(t, text).unwrap()).collect()
    }

    fn classify(sink: &MemorySink) -> Vec<Out> {
        sink.frames()
            .iter()
            .map(|f| {
                let [r, g, b] = f.get_pixel(0, 0);
                if r == 1 {
                    Out::Source(b)
                } else {
                    Out::Card(g as char)
                }
            })
            .collect()
    }

    fn run(annotations: Vec<Annotation>, frames: u8, fps: FrameRate) -> (InterleaveReport, MemorySink) {
        let mut source = source(frames, fps);
        let mut sink = MemorySink::new(descriptor(fps));
        let mut interleaver = Interleaver::new(annotations, &StubRenderer, [0, 0, 0], 5.0);
        let report = interleaver.run(&mut source, &mut sink).unwrap();
        assert_eq!(interleaver.state(), InterleaveState::Done);
        assert_eq!(interleaver.cursor().frame_index, report.source_frames);
        assert_eq!(interleaver.cursor().next_annotation, report.fired_annotations);
        (report, sink)
    }

    #[test]
    fn test_single_annotation_scenario() {
        let (report, sink) = run(notes(&[(3.0, "Hello")]), 20, fps2());

        let out = classify(&sink);
        assert_eq!(out.len(), 30);
        assert_eq!(&out[..3], &[Out::Source(0), Out::Source(1), Out::Source(2)]);
        assert!(out[3..13].iter().all(|o| *o == Out::Card('H')));
        let tail: Vec<Out> = (3..20).map(Out::Source).collect();
        assert_eq!(&out[13..], &tail[..]);

        assert_eq!(report.source_frames, 20);
        assert_eq!(report.injected_frames, 10);
        assert_eq!(report.output_frames(), 30);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_colliding_timestamps_fire_in_file_order() {
        let (report, sink) = run(notes(&[(2.0, "A"), (2.0, "B")]), 20, fps2());

        let out = classify(&sink);
        assert_eq!(out.len(), 40);
        assert_eq!(&out[..4], &[Out::Source(0), Out::Source(1), Out::Source(2), Out::Source(3)]);
        assert!(out[4..14].iter().all(|o| *o == Out::Card('A')));
        assert!(out[14..24].iter().all(|o| *o == Out::Card('B')));
        assert_eq!(out[24], Out::Source(4));
        assert_eq!(report.fired_annotations, 2);
    }

    #[test]
    fn test_annotations_between_frames_fire_on_crossing() {
        // Both are due before the frame at 0.5s
        let (_, sink) = run(notes(&[(0.2, "x"), (0.4, "y")]), 4, fps2());

        let out = classify(&sink);
        assert_eq!(out[0], Out::Source(0));
        assert_eq!(out[1], Out::Card('x'));
        assert_eq!(out[11], Out::Card('y'));
        assert_eq!(out[21], Out::Source(1));
    }

    #[test]
    fn test_timestamp_zero_fires_before_first_frame() {
        let (_, sink) = run(notes(&[(0.0, "Zero")]), 4, fps2());

        let out = classify(&sink);
        assert_eq!(out[0], Out::Card('Z'));
        assert_eq!(out[10], Out::Source(0));
        assert_eq!(out.len(), 14);
    }

    #[test]
    fn test_output_duration_law() {
        let (report, sink) = run(notes(&[(1.0, "a"), (4.0, "b"), (7.0, "c")]), 20, fps2());

        assert_eq!(report.source_duration(), 10.0);
        assert_eq!(report.output_duration(), 10.0 + 3.0 * 5.0);
        assert_eq!(sink.duration(), 25.0);
    }

    #[test]
    fn test_annotations_past_the_end_never_fire() {
        let (report, sink) = run(notes(&[(10.0, "end"), (60.0, "later")]), 20, fps2());

        assert_eq!(sink.frames().len(), 20);
        assert_eq!(report.fired_annotations, 0);
        assert_eq!(report.unfired_annotations, 2);
        assert_eq!(report.output_duration(), report.source_duration());
    }

    #[test]
    fn test_permutations_produce_identical_output() {
        let (_, sorted) = run(notes(&[(1.0, "a"), (4.0, "b"), (7.0, "c")]), 20, fps2());
        let (_, shuffled) = run(notes(&[(7.0, "c"), (1.0, "a"), (4.0, "b")]), 20, fps2());
        assert_eq!(sorted.frames(), shuffled.frames());
    }

    #[test]
    fn test_empty_annotation_list_passes_through() {
        let (report, sink) = run(Vec::new(), 20, fps2());
        let expected: Vec<Out> = (0..20).map(Out::Source).collect();
        assert_eq!(classify(&sink), expected);
        assert_eq!(report.injected_frames, 0);
    }

    #[test]
    fn test_zero_length_card_is_dropped_silently() {
        let mut source = source(6, fps2());
        let mut sink = MemorySink::new(descriptor(fps2()));
        let mut interleaver = Interleaver::new(notes(&[(1.0, "gone")]), &StubRenderer, [0, 0, 0], 0.0);

        let report = interleaver.run(&mut source, &mut sink).unwrap();
        assert_eq!(report.fired_annotations, 1);
        assert_eq!(report.injected_frames, 0);
        assert_eq!(sink.frames().len(), 6);
    }

    #[test]
    fn test_fractional_frame_rate_is_not_truncated() {
        let ntsc = FrameRate::new(30000, 1001).unwrap();
        let (_, sink) = run(notes(&[(1.0, "one")]), 40, ntsc);

        let out = classify(&sink);
        // Frame 29 plays at 0.967s, frame 30 at 1.001s
        assert_eq!(out[29], Out::Source(29));
        assert_eq!(out[30], Out::Card('o'));
        // floor(5s * 29.97fps) card frames
        assert_eq!(out[30 + 148], Out::Card('o'));
        assert_eq!(out[30 + 149], Out::Source(30));
        assert_eq!(out.len(), 40 + 149);
    }

    #[test]
    fn test_read_failure_aborts_with_partial_output() {
        let mut source = source(10, fps2()).failing_at(5);
        let mut sink = MemorySink::new(descriptor(fps2()));
        let mut interleaver = Interleaver::new(notes(&[(1.0, "a")]), &StubRenderer, [0, 0, 0], 5.0);

        let err = interleaver.run(&mut source, &mut sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MidStreamIoError);
        assert!(matches!(
            err,
            CompositorError::Video(VideoError::MidStream { frame_index: 5, .. })
        ));
        assert_eq!(interleaver.state(), InterleaveState::Failed);
        assert_eq!(sink.frames().len(), 5 + 10);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_write_failure_during_card_burst() {
        // Output frames 0..2 are source frames, the card burst starts at output 2
        let mut source = source(10, fps2());
        let mut sink = MemorySink::new(descriptor(fps2())).failing_at(6);
        let mut interleaver = Interleaver::new(notes(&[(1.0, "a")]), &StubRenderer, [0, 0, 0], 5.0);

        let err = interleaver.run(&mut source, &mut sink).unwrap_err();
        assert!(matches!(
            err,
            CompositorError::Video(VideoError::MidStream { frame_index: 2, .. })
        ));
        assert_eq!(interleaver.state(), InterleaveState::Failed);
        assert_eq!(interleaver.cursor(), InterleaveCursor { frame_index: 2, next_annotation: 0 });
        assert_eq!(sink.frames().len(), 6);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_write_failure_on_source_frame() {
        // Outputs: source 0, 1, ten cards, then source 2 is output 12
        let mut source = source(10, fps2());
        let mut sink = MemorySink::new(descriptor(fps2())).failing_at(12);
        let mut interleaver = Interleaver::new(notes(&[(1.0, "a")]), &StubRenderer, [0, 0, 0], 5.0);

        let err = interleaver.run(&mut source, &mut sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MidStreamIoError);
        assert!(matches!(
            err,
            CompositorError::Video(VideoError::MidStream { frame_index: 2, .. })
        ));
        assert_eq!(interleaver.state(), InterleaveState::Failed);
        assert_eq!(interleaver.cursor(), InterleaveCursor { frame_index: 2, next_annotation: 1 });
        assert_eq!(sink.frames().len(), 12);
        assert!(sink.is_finished());
    }

    #[test]
    fn test_codec_rejection_at_close_wins_over_broken_pipe() {
        struct RefusingSink;

        impl FrameSink for RefusingSink {
            fn write_frame(&mut self, _: Frame) -> Result<()> {
                Err(VideoError::MidStream { frame_index: 0, reason: "Broken pipe".to_string() }.into())
            }

            fn finish(&mut self) -> Result<()> {
                Err(VideoError::UnsupportedFormat { format: "codec 'bogus'".to_string() }.into())
            }
        }

        let mut source = source(4, fps2());
        let mut interleaver = Interleaver::new(Vec::new(), &StubRenderer, [0, 0, 0], 5.0);
        let err = interleaver.run(&mut source, &mut RefusingSink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(interleaver.state(), InterleaveState::Failed);
    }

    #[test]
    fn test_render_failure_propagates() {
        let mut source = source(4, fps2());
        let mut sink = MemorySink::new(descriptor(fps2()));
        let mut interleaver = Interleaver::new(notes(&[(0.0, "a")]), &BrokenRenderer, [0, 0, 0], 5.0);

        let err = interleaver.run(&mut source, &mut sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RenderUnavailable);
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_cancellation_between_frames() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut source = source(4, fps2());
        let mut sink = MemorySink::new(descriptor(fps2()));
        let mut interleaver = Interleaver::new(Vec::new(), &StubRenderer, [0, 0, 0], 5.0)
            .with_cancel_flag(flag);

        let err = interleaver.run(&mut source, &mut sink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(source.remaining(), 4);
    }
}
