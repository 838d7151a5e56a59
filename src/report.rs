use std::fmt::Write;

use crate::aggregate::Summary;

/// Markdown block printed after a run and by the `summary` command.
pub fn render_markdown(summary: &Summary) -> String {
    let missing_pct = share_of(summary.missing_reviews, summary.total_places).unwrap_or(0.0);

    let mut out = String::from("## Collection Summary\n");
    let _ = writeln!(out, "- Total places: {}", summary.total_places);
    let _ = writeln!(out, "- Total reviews: {}", summary.total_reviews);
    let _ = writeln!(
        out,
        "- Avg reviews per place: {:.2}",
        summary.avg_reviews_per_place
    );
    let _ = writeln!(
        out,
        "- Places without reviews: {} ({:.1}%)",
        summary.missing_reviews, missing_pct
    );
    push_counts(&mut out, "Places by region", &summary.places_by_region);
    push_counts(&mut out, "Places by neighborhood", &summary.places_by_neighborhood);
    out
}

fn push_counts(out: &mut String, title: &str, counts: &[(String, usize)]) {
    let _ = writeln!(out, "\n### {}", title);
    for (label, count) in counts {
        let _ = writeln!(out, "- {}: {}", label, count);
    }
}

/// Percentage of `part` in `whole`; `None` for an empty whole.
fn share_of(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 * 100.0 / whole as f64)
}
