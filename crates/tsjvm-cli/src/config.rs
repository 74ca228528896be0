//! Compiler options from `tsjvm.toml` and command-line flags
//!
//! Flags override the file; the file overrides the built-in defaults.
//!
//! ```toml
//! jdk = 17
//! package_prefix = "com.example"
//! debug = true
//!
//! [aliases]
//! Text = "java.lang.String"
//! ```

use anyhow::{anyhow, Context};
use clap::Args;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tsjvm_compiler::{ByteCodeCompilerOptions, JdkVersion};

/// Option flags shared by `compile` and `run`
#[derive(Args, Debug, Default, Clone)]
pub struct OptionArgs {
    /// Configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Target JDK release (8, 11, 17 or 21)
    #[arg(long)]
    pub jdk: Option<u8>,
    /// Package prepended to every generated class
    #[arg(long)]
    pub package_prefix: Option<String>,
    /// Type alias as NAME=JAVA_TYPE (repeatable)
    #[arg(long = "alias", value_name = "NAME=JAVA_TYPE")]
    pub aliases: Vec<String>,
    /// Verify every class after emitting it
    #[arg(long)]
    pub debug: bool,
}

/// Contents of a configuration file
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub jdk: Option<u8>,
    pub package_prefix: Option<String>,
    pub debug: Option<bool>,
    pub aliases: BTreeMap<String, String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Final options for one invocation
pub fn build_options(args: &OptionArgs) -> anyhow::Result<ByteCodeCompilerOptions> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let mut options = ByteCodeCompilerOptions::default();

    if let Some(jdk) = args.jdk.or(file.jdk) {
        options.jdk_version = JdkVersion::try_from(jdk).map_err(|e| anyhow!(e))?;
    }
    if let Some(prefix) = args.package_prefix.clone().or(file.package_prefix) {
        options.package_prefix = prefix;
    }
    options.debug = args.debug || file.debug.unwrap_or(false);
    options.type_alias_map.extend(file.aliases);
    for alias in &args.aliases {
        let (name, java_type) = parse_alias(alias)?;
        options.type_alias_map.insert(name, java_type);
    }
    tracing::debug!(
        jdk = %options.jdk_version,
        prefix = %options.package_prefix,
        aliases = options.type_alias_map.len(),
        "resolved compiler options"
    );
    Ok(options)
}

fn parse_alias(spec: &str) -> anyhow::Result<(String, String)> {
    match spec.split_once('=') {
        Some((name, java_type)) if !name.trim().is_empty() && !java_type.trim().is_empty() => {
            Ok((name.trim().to_string(), java_type.trim().to_string()))
        }
        _ => Err(anyhow!("Invalid alias '{}', expected NAME=JAVA_TYPE", spec)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_flags() {
        let options = build_options(&OptionArgs::default()).unwrap();
        assert_eq!(options, ByteCodeCompilerOptions::default());
    }

    #[test]
    fn test_parse_alias() {
        assert_eq!(
            parse_alias("Text=java.lang.String").unwrap(),
            ("Text".to_string(), "java.lang.String".to_string())
        );
        assert!(parse_alias("Text").is_err());
        assert!(parse_alias("=int").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "jdk = 11\npackage_prefix = \"from.file\"\n\n[aliases]\nText = \"java.lang.String\""
        )
        .unwrap();
        let args = OptionArgs {
            config: Some(file.path().to_path_buf()),
            jdk: Some(21),
            aliases: vec!["Count=int".to_string()],
            ..OptionArgs::default()
        };
        let options = build_options(&args).unwrap();
        assert_eq!(options.jdk_version, JdkVersion::Jdk21);
        assert_eq!(options.package_prefix, "from.file");
        assert_eq!(options.type_alias_map["Text"], "java.lang.String");
        assert_eq!(options.type_alias_map["Count"], "int");
        // Defaults survive
        assert_eq!(options.type_alias_map["Integer"], "java.lang.Integer");
    }

    #[test]
    fn test_unknown_keys_and_versions_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target = 17").unwrap();
        let args = OptionArgs {
            config: Some(file.path().to_path_buf()),
            ..OptionArgs::default()
        };
        assert!(build_options(&args).is_err());

        let args = OptionArgs {
            jdk: Some(9),
            ..OptionArgs::default()
        };
        assert!(build_options(&args).is_err());
    }
}
