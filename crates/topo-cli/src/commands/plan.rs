use std::path::Path;

use super::{assemble_plan, assemble_topology};

pub fn plan(config: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let plan = assemble_plan(config)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!("{} ({} resources)", plan.stack, plan.len());
            for id in plan.apply_order()? {
                if let Some(resource) = plan.get(id) {
                    println!("  {:<18} {id}", format!("{:?}", resource.kind));
                }
            }
        }
    }

    Ok(())
}

pub fn routes(config: Option<&Path>) -> anyhow::Result<()> {
    let topology = assemble_topology(config)?;
    let gate = topology.gate();
    let Some(routes) = gate.routes() else {
        anyhow::bail!("gate {} was not deployed", gate.id);
    };

    for entry in routes.entries() {
        let guard = if entry.is_protected() { "authorized" } else { "open" };
        println!("{:<7} {:<24} → {} ({guard})", entry.method, entry.path, entry.alias);
    }
    if let Some(mapping) = gate.base_path() {
        println!("mounted at https://{}/{}", mapping.domain_name, mapping.base_path);
    }

    Ok(())
}
