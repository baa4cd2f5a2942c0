use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    annotations::{Annotation, AnnotationParser},
    composition::interleaver::{InterleaveReport, Interleaver},
    config::{Config, EmptyAnnotationPolicy},
    error::{AnnotationError, Result},
    render::{FontRenderer, TextRenderer},
    video::{FfmpegVideoIo, FrameSink, FrameSource},
};

/// Main composition engine that drives one annotation run end to end
///
/// The engine follows a clear pipeline:
/// 1. Annotation Loading - Parse the `MM:SS message` file
/// 2. Source Opening - Probe and open the input video
/// 3. Destination Opening - Create the output with the same fps and size
/// 4. Interleaving - Copy frames, splicing a text card in at each annotation
pub struct CompositionEngine {
    config: Config,
    renderer: Box<dyn TextRenderer>,
    video: FfmpegVideoIo,
    cancel: Option<Arc<AtomicBool>>,
}

impl CompositionEngine {
    /// Create a new composition engine with the given configuration and renderer
    pub fn new(config: Config, renderer: Box<dyn TextRenderer>) -> Self {
        let video = FfmpegVideoIo::new(config.video.clone());
        Self {
            config,
            renderer,
            video,
            cancel: None,
        }
    }

    /// Create an engine using the font renderer described by `config`
    pub fn with_font_renderer(config: Config) -> Result<Self> {
        let renderer = FontRenderer::new(&config.interstitial)?;
        Ok(Self::new(config, Box::new(renderer)))
    }

    /// Share a flag that stops the run between source frames when set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Main entry point - annotate `source_path` and write `destination_path`
    ///
    /// # Arguments
    ///
    /// * `source_path` - Input video
    /// * `annotation_path` - Text file with one `MM:SS message` entry per line
    /// * `destination_path` - Output video; left partially written on mid-stream failure
    /// * `background` - RGB fill color of the text cards
    pub fn process(
        &self,
        source_path: impl AsRef<Path>,
        annotation_path: impl AsRef<Path>,
        destination_path: impl AsRef<Path>,
        background: [u8; 3],
    ) -> Result<InterleaveReport> {
        let source_path = source_path.as_ref();
        let annotation_path = annotation_path.as_ref();
        let destination_path = destination_path.as_ref();

        info!("🎬 Starting Interstitial-Compositor run");
        info!("   Input: {:?}", source_path);
        info!("   Annotations: {:?}", annotation_path);
        info!("   Output: {:?}", destination_path);
        info!("   Renderer: {}", self.renderer.name());

        // Pipeline Step 1: Annotation Loading
        let annotations = self.load_annotations(annotation_path)?;

        // Pipeline Step 2: Source Opening
        info!("📹 Step 2: Opening source video...");
        let mut source = self.video.open_source(source_path)?;

        // Pipeline Step 3: Destination Opening
        info!("💾 Step 3: Opening destination...");
        let mut sink = self.video.open_destination(destination_path, source.descriptor())?;

        // Pipeline Step 4: Interleaving
        let report = self.process_streams(annotations, &mut source, &mut sink, background)?;

        info!("🎉 Done! Output saved to: {:?}", destination_path);
        Ok(report)
    }

    /// Run the interleaver over already-open streams
    pub fn process_streams<S, K>(
        &self,
        annotations: Vec<Annotation>,
        source: &mut S,
        sink: &mut K,
        background: [u8; 3],
    ) -> Result<InterleaveReport>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let descriptor = source.descriptor();
        info!("🎨 Step 4: Interleaving {} annotation(s) into {}x{} @ {} fps...",
              annotations.len(), descriptor.width, descriptor.height, descriptor.frame_rate);

        let mut interleaver = Interleaver::new(
            annotations,
            self.renderer.as_ref(),
            background,
            self.config.interstitial.duration_secs,
        );
        if let Some(flag) = &self.cancel {
            interleaver = interleaver.with_cancel_flag(Arc::clone(flag));
        }

        let report = interleaver.run(source, sink)?;

        info!("   ✅ Interleaving complete:");
        info!("      Source frames: {}", report.source_frames);
        info!("      Cards shown: {} ({} frames)", report.fired_annotations, report.injected_frames);
        info!("      Duration: {:.2}s -> {:.2}s", report.source_duration(), report.output_duration());

        Ok(report)
    }

    /// Load annotations, applying the empty-set policy before any video is touched
    fn load_annotations(&self, annotation_path: &Path) -> Result<Vec<Annotation>> {
        info!("📝 Step 1: Loading annotations...");

        let annotations = AnnotationParser::load(annotation_path)?;

        if annotations.is_empty() {
            match self.config.processing.empty_annotations {
                EmptyAnnotationPolicy::Reject => {
                    return Err(AnnotationError::EmptyAnnotationSet {
                        path: annotation_path.display().to_string(),
                    }.into());
                }
                EmptyAnnotationPolicy::PassThrough => {
                    info!("   No annotations; the video will be copied unchanged");
                }
            }
        }

        for annotation in &annotations {
            debug!("      {}", annotation);
        }

        Ok(annotations)
    }
}
