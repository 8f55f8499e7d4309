//! Subcommand implementations. Each returns the text to print.

use anyhow::{Context, Result};
use loom_core::Invariant;
use loom_graph::{Query, check_invariants, check_queries, to_dot};
use loom_lang::{CompileConfig, Stitch};
use std::path::{Path, PathBuf};

/// Build the compile config from an optional JSON file, `LOOM_PATH`, and
/// explicit search paths (highest precedence).
pub fn load_config(config: Option<&Path>, search_paths: &[PathBuf]) -> Result<CompileConfig> {
    let mut cfg = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            CompileConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
                .with_env()
        }
        None => CompileConfig::from_env(),
    };
    if !search_paths.is_empty() {
        cfg = cfg.with_search_paths(search_paths.to_vec());
    }
    Ok(cfg)
}

fn compile(path: &Path, config: &CompileConfig) -> Result<Stitch> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = config.clone().with_filename(path.display().to_string());
    Ok(Stitch::compile(&source, &config)?)
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
}

fn read_invariants(path: &Path) -> Result<Vec<Invariant>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read invariants {}", path.display()))?;
    lines(&text)
        .map(|line| Invariant::parse_line(line).with_context(|| format!("in {}", path.display())))
        .collect()
}

fn read_queries(path: &Path) -> Result<Vec<Query>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read queries {}", path.display()))?;
    lines(&text)
        .map(|line| Query::parse_line(line).with_context(|| format!("in {}", path.display())))
        .collect()
}

/// `loom eval`
pub fn eval(path: &Path, config: &CompileConfig, json: bool) -> Result<String> {
    let stitch = compile(path, config)?;
    if json {
        Ok(serde_json::to_string_pretty(&stitch.records())?)
    } else {
        Ok(stitch.to_string())
    }
}

/// `loom check`
pub fn check(path: &Path, config: &CompileConfig, invariants: Option<&Path>) -> Result<String> {
    let stitch = compile(path, config)?;
    let mut count = stitch.invariants().len();
    if let Some(file) = invariants {
        let extra = read_invariants(file)?;
        check_invariants(stitch.graph(), &extra)?;
        count += extra.len();
    }
    tracing::info!(invariants = count, "all invariants hold");
    Ok(format!("{count} invariants hold"))
}

/// `loom query`
pub fn query(
    path: &Path,
    config: &CompileConfig,
    invariants: &Path,
    queries: &Path,
) -> Result<String> {
    let stitch = compile(path, config)?;
    let invariants = read_invariants(invariants)?;
    check_invariants(stitch.graph(), &invariants)?;
    let queries = read_queries(queries)?;
    check_queries(stitch.graph(), &invariants, &queries)?;
    Ok(format!("{} queries passed", queries.len()))
}

/// `loom viz`
pub fn viz(path: &Path, config: &CompileConfig) -> Result<String> {
    let stitch = compile(path, config)?;
    Ok(to_dot(stitch.graph()))
}
