use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;

const PROGRESS_TEMPLATE: &str =
    "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Creates a progress bar on stderr, or a hidden one when `enabled` is false or
/// stderr is not a terminal.
pub fn create_progress_bar(len: u64, message: &str, enabled: bool) -> ProgressBar {
    let draw_target = if enabled && std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  ")),
        Err(err) => log::debug!("Falling back to the default progress style: {err}"),
    }
    pb.set_message(message.to_string());

    pb
}
