use colored::Colorize;
use reconcile::{Decision, Difference};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an unchanged/no-op message
pub fn unchanged(msg: &str) {
    println!("{} {}", "=".dimmed(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim hint to stderr
pub fn hint(msg: &str) {
    eprintln!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Colored label for a decision
pub fn decision_label(decision: Decision, check_mode: bool) -> String {
    let label = if check_mode {
        format!("would {decision}")
    } else {
        decision.to_string()
    };
    match decision {
        Decision::NoAction => label.dimmed().to_string(),
        Decision::Create => label.green().to_string(),
        Decision::Update => label.yellow().to_string(),
        Decision::Delete => label.red().to_string(),
    }
}

/// Print property differences to stderr, one per line
pub fn differences(diffs: &[Difference]) {
    for diff in diffs {
        let observed = diff
            .observed
            .as_ref()
            .map_or_else(|| "(absent)".to_string(), ToString::to_string);
        eprintln!(
            "  {} {}: {} {} {}",
            "~".yellow(),
            diff.path,
            observed.red(),
            "→".dimmed(),
            diff.desired.to_string().green()
        );
    }
}

/// Render a JSON scalar for text output
pub fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate a string to `max` characters with an ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
