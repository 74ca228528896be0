//! `tsjvm compile`: write one `.class` file per class

use super::load_module;
use crate::config::{build_options, OptionArgs};
use crate::output::StyledOutput;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tsjvm_compiler::{ByteCodeCompiler, ClassMap};

pub fn execute(
    input: &Path,
    out_dir: &Path,
    args: &OptionArgs,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let options = build_options(args)?;
    let module = load_module(input)?;
    let classes = ByteCodeCompiler::new(options)
        .compile(&module)
        .with_context(|| format!("Failed to compile {}", input.display()))?;
    let written = write_classes(out_dir, &classes)?;

    out.success("Compiled");
    out.plain(&format!(" {} ", input.display()));
    out.info(&format!("({} classes)", written.len()));
    out.newline();
    for path in &written {
        out.plain(&format!("  {}\n", path.display()));
    }
    Ok(())
}

/// `a.b.C` goes to `out_dir/a/b/C.class`
pub fn write_classes(out_dir: &Path, classes: &ClassMap) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(classes.len());
    for (name, bytes) in classes {
        let mut path = out_dir.to_path_buf();
        path.extend(name.split('.'));
        path.set_extension("class");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(class = %name, path = %path.display(), "wrote class file");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_classes_uses_package_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut classes = ClassMap::new();
        classes.insert("com.example.Widget".to_string(), vec![0xCA, 0xFE]);
        classes.insert("$".to_string(), vec![1]);
        let written = write_classes(dir.path(), &classes).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(dir.path().join("$.class")).unwrap(), vec![1]);
        assert_eq!(
            std::fs::read(dir.path().join("com").join("example").join("Widget.class")).unwrap(),
            vec![0xCA, 0xFE]
        );
    }
}
