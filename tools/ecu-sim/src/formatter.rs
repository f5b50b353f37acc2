//! Snapshot and fault formatting

use chrono::Local;
use colored::Colorize;
use ecu_app::FaultRecord;
use ecu_hal::TriState;

use crate::runner::{SimSummary, Snapshot};

pub struct SnapshotFormatter {
    json_format: bool,
}

impl SnapshotFormatter {
    pub fn new(json_format: bool) -> Self {
        Self { json_format }
    }

    pub fn snapshot_line(&self, snapshot: &Snapshot) -> String {
        if self.json_format {
            let json = serde_json::json!({
                "timestamp": Local::now().to_rfc3339(),
                "t_ms": snapshot.t_ms,
                "motor": snapshot.data,
            });
            json.to_string()
        } else {
            self.format_text(snapshot)
        }
    }

    fn format_text(&self, snapshot: &Snapshot) -> String {
        let d = &snapshot.data;
        let wire = |t: TriState| match t {
            TriState::High => t.as_str().bright_green(),
            TriState::Low => t.as_str().white(),
            TriState::HighZ => t.as_str().yellow(),
            TriState::Unknown => t.as_str().bright_red(),
        };
        let switch = |on: bool| if on { "1".bright_green() } else { "0".dimmed() };
        format!(
            "{} P {:>7.2} psi  T {:>6.2} C  RPM {:>5}  V {:>5.2}  N{} S{} B{}  RED {} ORG {}",
            format!("[{:>6} ms]", snapshot.t_ms).dimmed(),
            f32::from(d.pressure) / 100.0,
            f32::from(d.temperature) / 100.0,
            d.tachometer,
            f32::from(d.vbat) / 100.0,
            switch(d.neutral),
            switch(d.start),
            switch(d.buzzer),
            wire(d.red),
            wire(d.orange),
        )
    }

    pub fn fault_lines(&self, faults: &[FaultRecord]) -> Vec<String> {
        if self.json_format {
            let list: Vec<_> = faults
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "code": f.code,
                        "description": f.id.description(),
                        "message": f.msg.as_str(),
                        "raised_at_ms": f.raised_at.as_millis(),
                        "count": f.count,
                    })
                })
                .collect();
            return vec![serde_json::json!({ "faults": list }).to_string()];
        }
        if faults.is_empty() {
            return vec!["No faults recorded".green().to_string()];
        }
        faults
            .iter()
            .map(|f| {
                format!(
                    "{} {} ({}) x{} at {} ms",
                    format!("F{}", f.code).bright_red().bold(),
                    f.id.description(),
                    f.msg.as_str(),
                    f.count,
                    f.raised_at.as_millis()
                )
            })
            .collect()
    }

    pub fn summary_line(&self, summary: &SimSummary) -> String {
        if self.json_format {
            return serde_json::json!({
                "elapsed_ms": summary.elapsed_ms,
                "display_frames": summary.frames,
                "telemetry_frames": summary.telemetry_frames,
                "display_on": summary.panel.on,
                "pools_idle": summary.pools_idle,
            })
            .to_string();
        }
        format!(
            "{} ms simulated, {} display frames, {} telemetry frames, panel {}",
            summary.elapsed_ms,
            summary.frames,
            summary.telemetry_frames,
            if summary.panel.on { "on" } else { "off" }
        )
    }
}
