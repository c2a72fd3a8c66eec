//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use macula_core::classifier::Prediction;
use macula_core::credentials::{CredentialSource, Credentials};
use std::time::Duration;

/// Print a prediction with its confidence bar.
pub fn print_prediction(prediction: &Prediction, elapsed: Duration) {
    let percent = prediction.confidence_percent();
    println!();
    println!("{}: {}", "Prediction".bold(), label_colored(&prediction.label));
    println!(
        "{}: {}% {}",
        "Confidence".bold(),
        percent,
        confidence_bar(percent).dimmed()
    );
    println!("{}", format!("({} ms)", elapsed.as_millis()).dimmed());
}

/// Print the details of loaded credentials. Secrets are never shown.
pub fn print_credentials(credentials: &Credentials, source: &CredentialSource) {
    println!("{}", "Credentials".cyan().bold());
    println!("  {:<12} {}", "Source".bold(), source);
    println!("  {:<12} {}", "Type".bold(), credentials.kind());
    println!(
        "  {:<12} {}",
        "Project ID".bold(),
        credentials.project_id().unwrap_or("-")
    );
    println!("  {:<12} {}", "Principal".bold(), credentials.principal());
    println!("  {:<12} {}", "Token URI".bold(), credentials.token_uri());
}

fn label_colored(label: &str) -> ColoredString {
    match label.to_lowercase().as_str() {
        "benign" => label.green().bold(),
        "malignant" => label.red().bold(),
        _ => label.yellow().bold(),
    }
}

fn confidence_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 5;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(20 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bar() {
        assert_eq!(confidence_bar(0), format!("[{}]", ".".repeat(20)));
        assert_eq!(confidence_bar(91), format!("[{}{}]", "#".repeat(18), ".".repeat(2)));
        assert_eq!(confidence_bar(100), format!("[{}]", "#".repeat(20)));
    }
}
