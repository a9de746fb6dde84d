//! Console output utilities.

use std::path::Path;

use console::style;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     HMS Mirror                                        ║
║     Mirror and audit the HearMyShip dataset           ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(links_file: &Path, output_dir: &Path, workers: usize) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Links:     {}", links_file.display());
    println!("  Directory: {}", output_dir.display());
    println!("  Workers:   {}", workers);
    println!();
}
