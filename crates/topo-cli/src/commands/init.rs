use std::path::Path;

use topo_core::TopologyFile;
use topo_core::config::MappingConfig;

pub fn init(path: &Path) -> anyhow::Result<()> {
    let output = path.join("topology.toml");
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    let file = TopologyFile {
        mapping: Some(MappingConfig {
            domain: None,
            base_path: Some(topo_core::config::DEFAULT_BASE_PATH.to_string()),
        }),
        subscription_target: None,
        endpoints: Some(topo_core::LogicalEndpoint::user_service()),
    };
    std::fs::write(&output, file.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());

    Ok(())
}
