//! Subcommands

pub mod compile;
pub mod inspect;
pub mod run;

use anyhow::Context;
use std::path::Path;
use tsjvm_ast::Module;

/// Read a module syntax tree from JSON
pub fn load_module(path: &Path) -> anyhow::Result<Module> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let module: Module = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid module AST", path.display()))?;
    tracing::debug!(file = %path.display(), statements = module.body.len(), "loaded module");
    Ok(module)
}
