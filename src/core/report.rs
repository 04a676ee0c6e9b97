//! Text rendering of session aggregates.

use crate::core::view::AggregateView;

/// Render the end-of-session summary.
///
/// Works on partial data: nothing here requires the session to be closed.
pub fn render(view: &dyn AggregateView) -> String {
    let count = view.entry_count();
    if count == 0 {
        return "Movement Summary:\n - No entries recorded".to_string();
    }

    let mut lines = vec![
        "Movement Summary:".to_string(),
        format!(" - Entries: {count}"),
    ];

    if let Ok(max) = view.max_value() {
        lines.push(format!(" - Max: {max}"));
    }
    if let Ok(mode) = view.mode() {
        let values: Vec<String> = mode.values.iter().map(u32::to_string).collect();
        lines.push(format!(
            " - Mode: [{}]   Occurrences: {}",
            values.join(", "),
            mode.occurrences
        ));
    }
    if let Ok(mean) = view.mean() {
        lines.push(format!(" - Mean: {mean:.2}"));
    }

    let big_movements = view.big_movement_entries();
    lines.push(format!(" - Big movements: {}", big_movements.len()));
    if let Some(last) = big_movements.last() {
        lines.push(format!("   last at {} (value {})", last.time_string(), last.movement_value()));
    }

    if let Some(sum) = view.trailing_sum_series().last() {
        lines.push(format!(" - Trailing sum: {sum}"));
    }
    if let Some(score) = view.decaying_score_series().last() {
        lines.push(format!(" - Decaying score: {score}"));
    }
    if let Some(trend) = view.latest_trend() {
        lines.push(format!(" - Trend: {trend:+.3}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnalysisSession, AnalyzerConfig, Entry};

    #[test]
    fn test_render_empty_session() {
        let session = AnalysisSession::new(AnalyzerConfig::default());
        assert!(render(&session).contains("No entries recorded"));
    }

    #[test]
    fn test_render_partial_session() {
        let mut session = AnalysisSession::new(AnalyzerConfig::default());
        for value in [3, 7, 3, 0, 7] {
            session.ingest(Entry::new(value)).unwrap();
        }

        let text = render(&session);
        assert!(text.contains("Entries: 5"));
        assert!(text.contains("Max: 7"));
        assert!(text.contains("Mode: [3, 7]   Occurrences: 2"));
        assert!(text.contains("Mean: 4.00"));
        assert!(text.contains("Big movements: 4"));
        assert!(text.contains("Trend:"));
    }
}
