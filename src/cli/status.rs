use crate::models::Config;
use crate::state::StateManager;
use crate::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(config: &Config, workdir: &Path, json: bool) -> Result<()> {
    let state = StateManager::load(workdir.join(&config.state_file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(state.entries())?);
        return Ok(());
    }

    println!(
        "{}",
        format!("State: {}", state.path().display()).cyan().bold()
    );
    println!();

    if state.is_empty() {
        println!("   {}", "No markers recorded yet".bright_black());
        return Ok(());
    }

    for annex in &config.annexes {
        match state.marker(*annex) {
            Some(marker) => println!("   Annex {:<4} {}", annex.to_string(), marker),
            None => println!(
                "   Annex {:<4} {}",
                annex.to_string(),
                "never seen".bright_black()
            ),
        }
    }

    let tracked: Vec<&str> = config.annexes.iter().map(|a| a.id()).collect();
    let extra: Vec<&String> = state
        .entries()
        .keys()
        .filter(|k| !tracked.contains(&k.as_str()))
        .collect();
    if !extra.is_empty() {
        println!();
        println!("{}", "Untracked entries:".yellow());
        for key in extra {
            println!("   • {}", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Annex;
    use tempfile::TempDir;

    #[test]
    fn test_status_on_empty_workdir() {
        let temp = TempDir::new().unwrap();
        run(&Config::default(), temp.path(), false).unwrap();
        run(&Config::default(), temp.path(), true).unwrap();
    }

    #[test]
    fn test_status_does_not_modify_state() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();
        let path = temp.path().join(&config.state_file);
        std::fs::write(&path, r#"{"II": "x", "other": 1}"#).unwrap();

        run(&config, temp.path(), false).unwrap();

        let state = StateManager::load(&path).unwrap();
        assert_eq!(state.marker(Annex::II), Some("x"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"II": "x", "other": 1}"#
        );
    }

    #[test]
    fn test_status_leaves_corrupt_state_in_place() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();
        let path = temp.path().join(&config.state_file);
        std::fs::write(&path, "{ not json").unwrap();

        run(&config, temp.path(), true).unwrap();
        run(&config, temp.path(), false).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
        assert!(!temp.path().join("annexes_state.json.bak").exists());
    }
}
