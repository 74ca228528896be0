//! `tsjvm inspect`: javap-style listing of a class file

use crate::output::StyledOutput;
use anyhow::{anyhow, Context};
use std::path::Path;
use tsjvm_classfile::{disasm, verify_class, ClassFile};

pub fn execute(file: &Path, verify: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let class = ClassFile::parse(&bytes).map_err(|e| anyhow!("{}: {}", file.display(), e))?;

    out.bold(&format!("{}", file.display()));
    out.plain(&format!(" ({} bytes)\n", bytes.len()));
    out.plain(&disasm::disassemble(&class));
    if verify {
        verify_class(&class).map_err(|e| anyhow!("verification failed: {}", e))?;
        out.success("Verified");
        out.newline();
    }
    Ok(())
}
