//! `tsjvm run`: compile, then call a static method on the interpreter

use super::load_module;
use crate::config::{build_options, OptionArgs};
use crate::output::StyledOutput;
use anyhow::{anyhow, Context};
use std::path::PathBuf;
use tsjvm_compiler::{ByteCodeCompiler, CONTAINER_NAME};
use tsjvm_interp::Vm;

pub struct RunArgs {
    pub input: PathBuf,
    pub entry: String,
    pub class: Option<String>,
    pub step_limit: Option<u64>,
}

pub fn execute(args: RunArgs, options: &OptionArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    let options = build_options(options)?;
    let module = load_module(&args.input)?;
    let mut compiler = ByteCodeCompiler::new(options);
    let classes = compiler
        .compile(&module)
        .with_context(|| format!("Failed to compile {}", args.input.display()))?;

    let class = match args.class {
        Some(class) => class,
        None => compiler
            .registry()
            .container("")
            .map(|info| info.internal_name.clone())
            .unwrap_or_else(|| CONTAINER_NAME.to_string()),
    };
    let mut vm = Vm::new();
    if let Some(limit) = args.step_limit {
        vm.set_step_limit(limit);
    }
    vm.load_all(&classes).context("Failed to load compiled classes")?;
    tracing::debug!(%class, entry = %args.entry, "invoking entry point");
    let result = vm
        .invoke_static(&class, &args.entry, &[])
        .map_err(|e| anyhow!("{}.{}: {}", class.replace('/', "."), args.entry, e))?;

    match result {
        Some(value) => out.plain(&format!("{}\n", vm.display(&value))),
        None => {
            out.info("(no value)");
            out.newline();
        }
    }
    Ok(())
}
