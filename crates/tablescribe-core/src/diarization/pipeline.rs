//! Local diarization pipeline.
//!
//! Both strategies run their steps sequentially: diarization, alignment, and
//! per-span ASR share one model/accelerator context, so a failing step
//! aborts the whole attempt; there is no partial-result recovery here.

use crate::audio;
use crate::backends::{AlignmentBackend, AsrBackend, AsrOptions, DiarizationBackend};
use crate::diarization::align::SpeakerAligner;
use crate::diarization::cache::DiarizationCache;
use crate::error::Result;
use crate::hardware::{Acceleration, ModelProfile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablescribe_types::{
    DiarizationStrategy, PipelineSettings, SpeakerSpan, TranscriptionUnit,
};

pub struct DiarizationPipeline {
    asr: Arc<dyn AsrBackend>,
    diarizer: Arc<dyn DiarizationBackend>,
    aligner: Arc<dyn AlignmentBackend>,
    cache: DiarizationCache,
    settings: PipelineSettings,
    work_dir: PathBuf,
}

impl DiarizationPipeline {
    pub fn new(
        asr: Arc<dyn AsrBackend>,
        diarizer: Arc<dyn DiarizationBackend>,
        aligner: Arc<dyn AlignmentBackend>,
        settings: PipelineSettings,
        work_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let cache = match &settings.cache_dir {
            Some(dir) => DiarizationCache::new(dir),
            None => DiarizationCache::with_default_dir()?,
        };
        Ok(Self {
            asr,
            diarizer,
            aligner,
            cache,
            settings,
            work_dir: work_dir.into(),
        })
    }

    /// Produce ordered, speaker-labeled units for one recording.
    pub async fn run(&self, source: &Path) -> Result<Vec<TranscriptionUnit>> {
        audio::validate_extension(source)?;

        let accel = Acceleration::detect();
        let profile = ModelProfile::for_acceleration(accel);
        if !accel.gpu {
            tracing::info!(
                "pipeline: no accelerator available, degrading to {} model",
                profile.model_name()
            );
        }

        match self.settings.strategy {
            DiarizationStrategy::SpanTranscribe => self.span_transcribe(source, profile).await,
            DiarizationStrategy::WordAlign => self.word_align(source, profile).await,
        }
    }

    /// Diarization spans for `source`, cache-aware.
    async fn spans_for(&self, source: &Path) -> Result<Vec<SpeakerSpan>> {
        let key = DiarizationCache::content_key(source)?;
        if let Some(spans) = self.cache.load(&key)? {
            tracing::debug!("pipeline: diarization cache hit for {key}");
            return Ok(spans);
        }

        let spans = self.diarizer.diarize(source).await?;
        self.cache.save(&key, &spans)?;
        Ok(spans)
    }

    /// Strategy 1: diarize once, then transcribe each speaker span.
    async fn span_transcribe(
        &self,
        source: &Path,
        profile: ModelProfile,
    ) -> Result<Vec<TranscriptionUnit>> {
        let mut spans = self.spans_for(source).await?;
        spans.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));

        let ext = audio::validate_extension(source)?;
        let stem = crate::audio::segmenter::file_stem(source)?;
        std::fs::create_dir_all(&self.work_dir)?;

        let options = AsrOptions {
            profile,
            ..AsrOptions::default()
        };

        // Spans run one after another: they share the model context.
        let mut units = Vec::with_capacity(spans.len());
        for (index, span) in spans.iter().enumerate() {
            let slice = self.work_dir.join(format!("{stem}_span_{index:03}.{ext}"));
            audio::extract_slice(source, span.start_secs, span.end_secs, &slice).await?;

            let output = self.asr.transcribe(&slice, &options).await?;
            let start_ms = (span.start_secs * 1000.0).round() as u64;
            units.push(TranscriptionUnit::success(
                index,
                start_ms,
                Some(span.speaker.clone()),
                output.text.trim().to_string(),
            ));
        }

        tracing::info!(
            "pipeline: span-transcribe produced {} units from {:?}",
            units.len(),
            source
        );
        Ok(units)
    }

    /// Strategy 2: transcribe with word timestamps, align, overlay speakers.
    async fn word_align(
        &self,
        source: &Path,
        profile: ModelProfile,
    ) -> Result<Vec<TranscriptionUnit>> {
        let options = AsrOptions {
            word_timestamps: true,
            profile,
            ..AsrOptions::default()
        };
        let output = self.asr.transcribe(source, &options).await?;

        let mut segments = self.aligner.align(output.segments, source).await?;
        segments.sort_by_key(|s| s.start_ms);

        let spans = self.diarizer.diarize(source).await?;
        let lines = SpeakerAligner::align(segments, &spans);

        let units: Vec<TranscriptionUnit> = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                TranscriptionUnit::success(
                    index,
                    line.start_ms,
                    line.speaker.clone(),
                    line.text.trim().to_string(),
                )
            })
            .collect();

        tracing::info!(
            "pipeline: word-align produced {} units from {:?}",
            units.len(),
            source
        );
        Ok(units)
    }
}
