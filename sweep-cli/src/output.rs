// Output formatting helpers for CLI commands

/// Print a status message: "  Status message"
pub fn status(action: &str, message: &str) {
    eprintln!("\x1b[1;36m{:>12}\x1b[0m {}", action, message);
}

/// Print a success message with checkmark
pub fn success(message: &str) {
    eprintln!("\x1b[1;32m  \u{2713}\x1b[0m {}", message);
}

/// Print a failure message with X
pub fn failure(message: &str) {
    eprintln!("\x1b[1;31m  \u{2717}\x1b[0m {}", message);
}

/// Print a check/pass item
pub fn check(message: &str) {
    eprintln!("\x1b[32m  \u{2713}\x1b[0m {}", message);
}

pub fn warning(message: &str) {
    eprintln!("\x1b[33m  !\x1b[0m {}", message);
}

pub fn error(message: &str) {
    eprintln!("\x1b[1;31merror:\x1b[0m {}", message);
}

pub fn info(message: &str) {
    eprintln!("\x1b[36m  i\x1b[0m {}", message);
}

/// Print a dim/muted message
pub fn dim(message: &str) {
    eprintln!("\x1b[2m{}\x1b[0m", message);
}

/// One finished task: `[pos/total] OK (group, index) 1.20s`
pub fn task_line(position: usize, total: usize, ok: bool, label: &str, detail: &str) {
    let (color, symbol) = if ok { ("32", "OK") } else { ("31", "FAIL") };
    eprintln!(
        "  [{:>width$}/{}] \x1b[{}m{:<4}\x1b[0m {} {}",
        position + 1,
        total,
        color,
        symbol,
        label,
        detail,
        width = total.to_string().len()
    );
}

/// Captured program stderr (indented, red)
pub fn program_error(line: &str) {
    eprintln!("\x1b[31m        | {}\x1b[0m", line);
}

pub fn header(message: &str) {
    eprintln!("\x1b[1m==> {}\x1b[0m", message);
}
