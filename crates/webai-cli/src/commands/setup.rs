use std::path::PathBuf;

use webai_config::ConfigLoader;

/// Write the starter webai.toml.
pub(super) fn cmd_init(local: bool) -> webai_core::Result<()> {
    let config_path = if local {
        std::env::current_dir()?.join("webai.toml")
    } else {
        ConfigLoader::home_path()
    };
    let dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)?;

    if config_path.exists() {
        println!("⚠️  {} already exists", config_path.display());
        println!("   Run 'webai config' to see the effective settings.");
        return Ok(());
    }

    std::fs::write(&config_path, ConfigLoader::starter_toml())?;
    println!("✅ Created {}", config_path.display());
    println!("   Add an API key under [services], then run: webai run \"your question\"");
    Ok(())
}
