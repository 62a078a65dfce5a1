//! Translate command handler

use super::utils::{read_input, resolve_model, to_usize};
use crate::cli::TranslateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{format_segment_card, format_summary, offset_rows, OutputWriter};
use indicatif::ProgressBar;
use segtran_core::{
    adapter_for, AssembledDelta, DispatchEngine, JobOptions, JobReport, Progress, ProgressSink,
    ProxyClient, ProxyClientConfig, RetryPolicy, TranslationJob,
};
use std::time::Duration;
use tracing::{info, instrument};

/// Drives the progress bar from the engine's callbacks
struct CliProgress {
    bar: Option<ProgressBar>,
    watermark: usize,
}

impl ProgressSink for CliProgress {
    fn on_progress(&mut self, progress: &Progress) {
        if progress.watermark > self.watermark {
            self.watermark = progress.watermark;
            info!(
                watermark = progress.watermark,
                total = progress.stats.total,
                "In-order output advanced"
            );
        }
        if let Some(bar) = &self.bar {
            bar.set_position(progress.stats.completed as u64);
            bar.set_message(format!(
                "{}/{} in order",
                progress.watermark, progress.stats.total
            ));
        }
    }

    fn on_delta(&mut self, delta: &AssembledDelta) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "segment {} streaming ({} chars)",
                delta.index + 1,
                delta.full_text.chars().count()
            ));
        }
    }
}

impl CliProgress {
    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Dispatch options from flags, falling back to config and the model profile
fn job_options(args: &TranslateArgs, config: &Config, model: segtran_core::ModelId) -> Result<JobOptions> {
    let profile = config.effective_profile(model);

    let concurrency = match args.concurrency {
        Some(value) => to_usize(value, "--concurrency")?,
        None => profile.concurrency_limit,
    };
    let retry = RetryPolicy::new(args.max_retries.unwrap_or(config.retry.max_retries))
        .with_delay_ms(args.retry_delay_ms.unwrap_or(config.retry.retry_delay_ms));

    let mut options = JobOptions::default()
        .with_concurrency(concurrency)
        .with_retry(retry)
        .with_request_timeout(profile.request_timeout)
        .streaming(args.stream);

    if let Some(prompt) = args.prompt.clone().or_else(|| config.prompt.clone()) {
        options = options.with_prompt(prompt);
    }
    Ok(options)
}

/// Handle the translate command
#[instrument(skip_all, fields(input = %args.input.display()))]
pub async fn handle_translate(
    args: TranslateArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let timer = Timer::new("translate_command");

    let model = resolve_model(args.model.as_deref(), config)?;
    let segment_size = match args.segment_size {
        Some(value) => to_usize(value, "--segment-size")?,
        None => config.effective_profile(model).default_segment_size,
    };
    let options = job_options(&args, config, model)?;

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.proxy.base_url.clone());
    let mut client_config = ProxyClientConfig::new(base_url)
        .with_connect_timeout(Duration::from_secs(config.proxy.connect_timeout_secs));
    match args.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => client_config = client_config.with_api_key(key),
        _ => output.warning("No API key given (--api-key or SEGTRAN_API_KEY); sending requests without credentials")?,
    }
    let client = ProxyClient::new(client_config)?;
    let engine = DispatchEngine::new(client, adapter_for(model)).with_options(options);

    let text = read_input(&args.input)?;
    let mut job = TranslationJob::new(text, segment_size)?;
    let total = job.segments().len();

    output.info(&format!(
        "Translating {} with {} ({} segment(s), {} mode, concurrency {})",
        args.input.display(),
        model,
        total,
        if args.stream { "streaming" } else { "batch" },
        if args.stream { 1 } else { engine.concurrency() },
    ))?;

    let mut progress = CliProgress {
        bar: output.progress_bar(total as u64, "starting"),
        watermark: 0,
    };

    let mut result = job.translate(&engine, &mut progress).await;
    for round in 1..=args.retry_rounds {
        let failed = job.failed_indices();
        if failed.is_empty() {
            break;
        }
        output.info(&format!(
            "Retry round {}/{}: {} failed segment(s)",
            round,
            args.retry_rounds,
            failed.len()
        ))?;
        result = job.retry_failed(&engine, &mut progress).await;
    }
    progress.finish();
    result?;

    let report = job.report();
    write_report(&args, &report, output)?;

    info!(
        job_id = %report.id,
        completed = report.completed,
        failed = report.failed,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Translation finished"
    );

    if report.failed > 0 {
        for error in &report.errors {
            output.warning(&error.to_string())?;
        }
        return Err(Error::PartialFailure {
            failed: report.failed,
            total: report.total,
        });
    }

    output.success(&format_summary(&report))
}

/// Emit the translation and any requested detail
fn write_report(args: &TranslateArgs, report: &JobReport, output: &mut OutputWriter) -> Result<()> {
    if let Some(path) = &args.save_to {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &report.text)?;
        output.success(&format!("✓ Saved translation to {}", path.display()))?;
    }

    if !output.is_human() {
        return output.data(report);
    }

    if args.save_to.is_none() {
        output.writeln(&report.text)?;
    }

    if args.show_offsets {
        output.section("Segment offsets")?;
        output.table(&["#", "start", "end", "chars", "state"], offset_rows(report))?;
    }

    if args.show_segments {
        output.section("Segments")?;
        for result in &report.segments {
            output.writeln(&format_segment_card(
                result,
                report.total,
                report.offsets.get(result.index),
            ))?;
        }
    }

    Ok(())
}
