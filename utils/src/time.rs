//! Duration rendering for cooldown and retention logs.

/// Render a seconds count compactly.
///
/// Faucet durations top out at the refill cooldown (hours, not days), so
/// anything longer is rendered in hours.
pub fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3_600, (secs % 3_600) / 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m05s");
        assert_eq!(format_duration(3_599), "59m59s");
        assert_eq!(format_duration(7_260), "2h01m");
        assert_eq!(format_duration(90_000), "25h00m");
    }
}
