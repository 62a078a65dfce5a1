//! Segment command handler: a dry run of segmentation and offset recovery

use super::utils::{read_input, resolve_model, to_usize};
use crate::cli::SegmentArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{preview, OutputWriter};
use segtran_core::{ModelId, OffsetRange, TranslationJob};
use serde::Serialize;

/// How a document would be sent to a model
#[derive(Debug, Clone, Serialize)]
pub struct SegmentPlan {
    pub model: ModelId,
    pub max_chars: usize,
    pub total_chars: usize,
    pub segments: Vec<PlannedSegment>,
}

/// One segment of a plan
#[derive(Debug, Clone, Serialize)]
pub struct PlannedSegment {
    pub index: usize,
    pub chars: usize,
    pub offset: OffsetRange,
    /// Text as it would be sent, marker included
    pub text: String,
}

impl SegmentPlan {
    pub fn from_job(job: &TranslationJob, model: ModelId, max_chars: usize) -> Self {
        let segments = job
            .segments()
            .iter()
            .zip(job.offsets())
            .map(|(segment, offset)| PlannedSegment {
                index: segment.index,
                chars: segment.char_len(),
                offset: *offset,
                text: segment.raw_text.clone(),
            })
            .collect();

        Self {
            model,
            max_chars,
            total_chars: job.original().chars().count(),
            segments,
        }
    }
}

/// Handle the segment command
pub async fn handle_segment(args: SegmentArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let model = resolve_model(args.model.as_deref(), config)?;
    let max_chars = match args.segment_size {
        Some(size) => to_usize(size, "--segment-size")?,
        None => config.effective_profile(model).default_segment_size,
    };

    let text = read_input(&args.input)?;
    let job = TranslationJob::new(text, max_chars)?;
    let plan = SegmentPlan::from_job(&job, model, max_chars);

    if !output.is_human() {
        return output.data(&plan);
    }

    output.info(&format!(
        "{} characters in {} segment(s) of at most {} ({})",
        plan.total_chars,
        plan.segments.len(),
        plan.max_chars,
        plan.model
    ))?;

    let rows = plan
        .segments
        .iter()
        .map(|s| {
            vec![
                (s.index + 1).to_string(),
                s.chars.to_string(),
                s.offset.start.to_string(),
                s.offset.end.to_string(),
                preview(job.segments()[s.index].cleaned_text.as_str(), 30),
            ]
        })
        .collect();
    output.table(&["#", "chars", "start", "end", "preview"], rows)?;

    if args.show_text {
        for segment in &plan.segments {
            output.section(&format!("Segment {}/{}", segment.index + 1, plan.segments.len()))?;
            output.writeln(&segment.text)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pairs_segments_with_offsets() {
        let paragraph = "研究方法与数据来源。".repeat(10);
        let text = vec![paragraph; 4].join("\n\n");
        let job = TranslationJob::new(text.clone(), 250).unwrap();
        let plan = SegmentPlan::from_job(&job, ModelId::Claude, 250);

        assert_eq!(plan.total_chars, text.chars().count());
        assert!(plan.segments.len() >= 2);
        assert!(plan.segments.iter().all(|s| s.chars <= 250));
        assert!(plan.segments[0].text.starts_with("[Part 1/"));
        assert_eq!(plan.segments.last().unwrap().offset.end, plan.total_chars);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["model"], "claude");
        assert_eq!(json["segments"][0]["offset"]["start"], 0);
    }
}
