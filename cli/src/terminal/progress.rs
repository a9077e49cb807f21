use colored::*;
use indicatif::ProgressStyle;
use ipward_common::models::ScanProgress;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const BAR_TEMPLATE: &str =
    "{spinner:.blue} [{elapsed_precise}] {bar:32.green/bright_black} {pos}/{len} {msg}";

/// Progress bar of one scan run, rendered by the indicatif tracing layer.
pub struct RunProgress {
    span: Span,
    live: u64,
}

impl RunProgress {
    pub fn start(total: u64) -> Self {
        let span = info_span!("scan", indicatif.pb_show = true);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_strings(&[
                "▁▁▁▁▁",
                "▁▂▂▂▁",
                "▁▄▂▄▁",
                "▂▄▆▄▂",
                "▄▆█▆▄",
                "▂▄▆▄▂",
                "▁▄▂▄▁",
                "▁▂▂▂▁",
            ]);
        span.pb_set_style(&style);
        span.pb_set_length(total);
        span.pb_start();

        let progress = Self { span, live: 0 };
        progress.refresh_message(None);
        progress
    }

    pub fn update(&self, progress: &ScanProgress) {
        self.span.pb_set_position(progress.current);
        self.refresh_message(progress.current_address.map(|addr| addr.to_string()));
    }

    pub fn hosts_found(&mut self, count: usize) {
        self.live += count as u64;
        self.refresh_message(None);
    }

    fn refresh_message(&self, at: Option<String>) {
        let live = format!("{} up", self.live).green().bold();
        let msg = match at {
            Some(addr) => format!("{live} {}", format!("@ {addr}").bright_black()),
            None => live.to_string(),
        };
        self.span.pb_set_message(&msg);
    }
}
