//! Config command handlers.

use super::ConfigInitArgs;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../quorum.example.toml");

/// Handle `quorum config init`.
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit this file to add your backends.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = temp_dir.path().join("quorum.toml");

        let args = ConfigInitArgs {
            output: output.clone(),
            force: false,
        };
        handle_config_init(&args).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("[orchestration]"));
    }

    #[test]
    fn refuses_overwrite_without_force() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = temp_dir.path().join("quorum.toml");
        std::fs::write(&output, "existing").unwrap();

        let args = ConfigInitArgs {
            output: output.clone(),
            force: false,
        };
        assert!(handle_config_init(&args).is_err());

        let args = ConfigInitArgs {
            output: output.clone(),
            force: true,
        };
        handle_config_init(&args).unwrap();
        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .contains("[orchestration]"));
    }
}
