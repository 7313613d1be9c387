//! Terminal styling for conversion messages

use console::style;

use crate::pipeline::ConversionReport;

/// Printed whenever a conversion writes over its own input.
pub const OVERWRITE_WARNING: &str = "+ Warning: you are writing over original input dta file.";

/// Print the welcome banner shown before the interactive prompts
pub fn print_banner(version: &str) {
    let rule = "-".repeat(61);
    println!("{}", style(&rule).dim());
    println!(
        "Welcome to the {} quickstart command-line utility {}.",
        style("rbstata").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!();
    println!("You will be prompted for relevant settings.");
    println!();
    println!("Please enter values under the following settings.");
    println!("(just press Enter to accept the default value in brackets)");
    println!("{}", style(&rule).dim());
}

/// Print the explanation preceding a prompt
pub fn print_prompt_help(text: &str) {
    println!();
    println!("{}", style(text).dim());
}

/// Print a verbose information line
pub fn print_info(message: &str) {
    println!("+ {}", message);
}

/// Print the line announcing a finished conversion
pub fn print_converted(report: &ConversionReport) {
    let detail = if report.input == report.output {
        format!(
            "Done overwriting {} in version {}.",
            report.input.display(),
            report.target_version
        )
    } else {
        format!(
            "{} to {} in version {}.",
            report.input.display(),
            report.output.display(),
            report.target_version
        )
    };
    println!("{}{}", style("+ Converted: ").green().bold(), detail);
}

/// Print a warning to stdout
pub fn print_warning(message: &str) {
    println!("{}", style(message).yellow());
}

/// Print an error to stderr
pub fn print_error(message: &str) {
    eprintln!("{}", style(format!("Error: {}", message)).red().for_stderr());
}

/// Print the closing line of a run
pub fn print_completion(converted_any: bool) {
    if converted_any {
        println!("{}Conversions complete.", style("Success: ").green().bold());
    } else {
        println!("+ Nothing to convert.");
    }
}
