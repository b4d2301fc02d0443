//! The `config` command: print the effective configuration.

use hive_actor::SystemConfig;

/// Print `config` as TOML on stdout.
pub fn execute(config: &SystemConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
