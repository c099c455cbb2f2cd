use anyhow::{Context, Result};
use docsweep::MaintenanceConfig;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// What the confirmation banner describes
pub enum Planned<'a> {
    Reconcile,
    Migrate { from: &'a str, to: &'a str },
}

pub fn banner(store: &Path, config: &MaintenanceConfig, planned: &Planned<'_>) -> String {
    let mut lines = vec![
        "WARNING: this run permanently modifies the document store.".to_string(),
        format!("  store:      {}", store.display()),
        format!("  reference:  {}", config.reference_collection),
    ];

    match planned {
        Planned::Reconcile => {
            let names: Vec<&str> = config
                .reconcile
                .collections
                .iter()
                .map(|spec| spec.name.as_str())
                .collect();
            lines.push(format!("  delete orphans in: {}", names.join(", ")));
        }
        Planned::Migrate { from, to } => {
            let pairs: Vec<String> = config
                .migrate
                .fields
                .iter()
                .map(|spec| format!("{}.{}", spec.collection, spec.field))
                .collect();
            lines.push(format!("  rewrite owner {} -> {}", from, to));
            lines.push(format!("  fields: {}", pairs.join(", ")));
        }
    }

    lines.push("Type 'yes' to continue: ".to_string());
    lines.join("\n")
}

/// Only an exact `yes` (surrounding whitespace ignored) confirms.
pub fn is_confirmation(answer: &str) -> bool {
    answer.trim() == "yes"
}

pub async fn confirm(banner: &str) -> Result<bool> {
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(banner.as_bytes())
        .await
        .context("Failed to write confirmation prompt")?;
    stderr.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation from stdin")?;

    Ok(is_confirmation(&answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_requires_exact_yes() {
        assert!(is_confirmation("yes\n"));
        assert!(is_confirmation("  yes  "));
        assert!(!is_confirmation("y"));
        assert!(!is_confirmation("YES"));
        assert!(!is_confirmation(""));
    }

    #[test]
    fn test_banner_lists_migration_pairs() {
        let config = MaintenanceConfig::new().migrate_identities("u1", "u2");
        let text = banner(
            Path::new("store.json"),
            &config,
            &Planned::Migrate { from: "u1", to: "u2" },
        );

        assert!(text.contains("store.json"));
        assert!(text.contains("u1 -> u2"));
        assert!(text.contains("journals.userId"));
    }
}
