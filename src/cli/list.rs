use crate::models::Config;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Print tracked annexes, their index pages and local destination
pub fn run(config: &Config, workdir: &Path) -> Result<()> {
    println!("{}", "📋 Tracked annexes".cyan().bold());
    println!();

    for annex in &config.annexes {
        println!(
            "   {} {}",
            format!("Annex {:<4}", annex.to_string()).green(),
            annex.index_url(&config.index_url_template)
        );
    }

    println!();
    println!(
        "   Files: {}",
        workdir.join(&config.output_dir).display()
    );
    println!("   State: {}", workdir.join(&config.state_file).display());

    Ok(())
}
