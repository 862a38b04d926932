//! Hook execution utilities.

use crate::config::{Config, GenerateHookConfig};
use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use tokio::process::Command;

// ============================================================================
// Environment Variables
// ============================================================================

/// Build `$RENDITION_*` variables for commands spawned by the pipeline.
pub fn build_vars(config: &Config) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();

    vars.insert("RENDITION_ROOT".into(), config.get_root().display().to_string());
    vars.insert(
        "RENDITION_BUILD_DIR".into(),
        config.build.dir.display().to_string(),
    );
    vars.insert(
        "RENDITION_GENERATE_DIR".into(),
        config.generate.dir.display().to_string(),
    );
    vars.insert("RENDITION_PUBLIC_PATH".into(), config.build.public_path.clone());
    vars.insert("RENDITION_DEV".into(), config.build.dev.to_string());

    vars
}

// ============================================================================
// Command Argument Resolution
// ============================================================================

/// Resolve `$RENDITION_*` variables in command arguments.
///
/// Longer names are replaced first so `$RENDITION_ROOT` never clobbers a
/// longer variable sharing its prefix.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<&String> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                let pattern = format!("${}", key);
                result = result.replace(&pattern, &vars[*key]);
            }
            result
        })
        .collect()
}

// ============================================================================
// Hook Execution
// ============================================================================

/// Execute a single hook. `phase` is used as the log prefix.
pub async fn run_hook(hook: &GenerateHookConfig, config: &Config, phase: &str) -> Result<()> {
    if !hook.enable || hook.command.is_empty() {
        return Ok(());
    }

    let vars = build_vars(config);
    let resolved = resolve_args(&hook.command, &vars);

    if !hook.quiet {
        crate::log!(phase; "`{}` running", hook.display_name());
    }

    let output = Command::new(&resolved[0])
        .args(&resolved[1..])
        .current_dir(config.get_root())
        .envs(&vars)
        .output()
        .await
        .with_context(|| format!("failed to spawn `{}`", hook.display_name()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{}` exited with {}: {}",
            hook.display_name(),
            output.status,
            stderr.trim()
        );
    }

    if !hook.quiet {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            println!("{stdout}");
        }
    }

    Ok(())
}

/// Execute hooks in order, stopping at the first failure.
pub async fn run_hooks(hooks: &[GenerateHookConfig], config: &Config, phase: &str) -> Result<()> {
    for hook in hooks {
        run_hook(hook, config, phase).await?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
