//! Output formatting for tables and JSON.

use anyhow::Result;
use serde::Serialize;
use switchbot_core::{BotInfo, DiscoveredBot, TimerSlot};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::StyleMode;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Table styling.
    pub style: StyleMode,
}

impl FormatOptions {
    pub fn new(style: StyleMode) -> Self {
        Self { style }
    }

    /// Serialize value to pretty JSON with a trailing newline.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        match self.style {
            StyleMode::Rich => table.with(Style::rounded()),
            StyleMode::Plain => table.with(Style::blank()),
        };
        format!("{}\n", table)
    }
}

// ============================================================================
// Scan formatting
// ============================================================================

#[must_use]
pub fn format_scan_table(bots: &[DiscoveredBot], opts: &FormatOptions) -> String {
    if bots.is_empty() {
        return "No Bots found.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Name", "Signal", "Identifier"]);
    for bot in bots {
        builder.push_record([
            bot.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            bot.rssi
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string()),
            bot.identifier.clone(),
        ]);
    }
    opts.render(builder)
}

pub fn format_scan_json(bots: &[DiscoveredBot], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        bots: &'a [DiscoveredBot],
    }

    opts.as_json(&ScanResult {
        count: bots.len(),
        bots,
    })
}

// ============================================================================
// Info formatting
// ============================================================================

#[must_use]
pub fn format_info_table(info: &BotInfo, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Battery(%)",
        "Firmware",
        "Timers",
        "Mode",
        "Inverse",
        "Hold(sec)",
    ]);
    builder.push_record([
        info.battery_percent.to_string(),
        format!("{:.1}", info.firmware_version),
        info.timer_count.to_string(),
        info.state_mode.to_string(),
        info.inverse.to_string(),
        info.hold_seconds.to_string(),
    ]);
    opts.render(builder)
}

pub fn format_info_json(info: &BotInfo, opts: &FormatOptions) -> Result<String> {
    opts.as_json(info)
}

// ============================================================================
// Timer formatting
// ============================================================================

#[must_use]
pub fn format_timers_table(timers: &[Option<TimerSlot>], opts: &FormatOptions) -> String {
    if timers.is_empty() {
        return "No timers configured.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Slot", "Time", "Action", "Repeat", "Enabled"]);
    for (slot, timer) in timers.iter().enumerate() {
        let row = match timer {
            Some(t) => [
                slot.to_string(),
                format!("{:02}:{:02}", t.hour, t.minutes),
                t.action.to_string(),
                if t.is_once() {
                    "once".to_string()
                } else {
                    t.weekdays.to_string()
                },
                t.enabled.to_string(),
            ],
            None => [
                slot.to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "empty".to_string(),
            ],
        };
        builder.push_record(row);
    }
    opts.render(builder)
}

pub fn format_timers_json(timers: &[Option<TimerSlot>], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct SlotJson<'a> {
        slot: usize,
        timer: Option<&'a TimerSlot>,
    }

    let slots: Vec<SlotJson<'_>> = timers
        .iter()
        .enumerate()
        .map(|(slot, timer)| SlotJson {
            slot,
            timer: timer.as_ref(),
        })
        .collect();
    opts.as_json(&slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchbot_core::{StateMode, TimerAction, Weekday, Weekdays};

    fn sample_info() -> BotInfo {
        BotInfo {
            battery_percent: 79,
            firmware_version: 4.5,
            timer_count: 3,
            state_mode: StateMode::Press,
            inverse: false,
            hold_seconds: 0,
        }
    }

    fn sample_timer() -> TimerSlot {
        TimerSlot {
            enabled: true,
            weekdays: [Weekday::Monday, Weekday::Friday].into_iter().collect::<Weekdays>(),
            hour: 7,
            minutes: 5,
            action: TimerAction::On,
        }
    }

    #[test]
    fn test_info_table_headers_and_values() {
        let out = format_info_table(&sample_info(), &FormatOptions::default());
        for header in ["Battery(%)", "Firmware", "Timers", "Mode", "Inverse", "Hold(sec)"] {
            assert!(out.contains(header), "missing {header}");
        }
        assert!(out.contains("79"));
        assert!(out.contains("4.5"));
        assert!(out.contains("press"));
    }

    #[test]
    fn test_info_json() {
        let out = format_info_json(&sample_info(), &FormatOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["battery_percent"], 79);
        assert_eq!(value["timer_count"], 3);
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_timers_table() {
        let timers = vec![Some(sample_timer()), None];
        let out = format_timers_table(&timers, &FormatOptions::new(StyleMode::Plain));
        assert!(out.contains("07:05"));
        assert!(out.contains("empty"));
        assert!(!out.contains('╭'));
    }

    #[test]
    fn test_timers_table_empty() {
        let out = format_timers_table(&[], &FormatOptions::default());
        assert_eq!(out, "No timers configured.\n");
    }

    #[test]
    fn test_timers_json_marks_empty_slots() {
        let timers = vec![Some(sample_timer()), None];
        let out = format_timers_json(&timers, &FormatOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["slot"], 0);
        assert_eq!(value[0]["timer"]["hour"], 7);
        assert_eq!(
            value[0]["timer"]["weekdays"],
            serde_json::json!(["Monday", "Friday"])
        );
        assert!(value[1]["timer"].is_null());
    }

    #[test]
    fn test_scan_table_empty() {
        let out = format_scan_table(&[], &FormatOptions::default());
        assert_eq!(out, "No Bots found.\n");
    }

    #[test]
    fn test_scan_json_empty() {
        let out = format_scan_json(&[], &FormatOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["count"], 0);
        assert!(value["bots"].as_array().unwrap().is_empty());
    }
}
