use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub fn pairs_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<8} {bar:40.cyan/blue} {percent:>3}% {pos}/{len} pairs [{elapsed_precise}<{eta_precise}] {msg}",
    )
    .expect("invalid pairs bar template")
}

/// Progress bar over `total` pairs, drawn on stderr.
pub fn pairs_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    bar.set_style(pairs_bar_style());
    bar.set_prefix("compare");
    bar
}
