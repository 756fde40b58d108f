use std::path::Path;

use anyhow::Context;
use topo_ledger::PlanLedger;
use topo_plan::PlanDiff;

use super::assemble_plan;

fn open(path: &Path) -> anyhow::Result<PlanLedger> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    Ok(PlanLedger::open(path)?)
}

fn print_diff(diff: &PlanDiff) {
    for id in &diff.added {
        println!("+ {id}");
    }
    for id in &diff.changed {
        println!("~ {id}");
    }
    for id in &diff.removed {
        println!("- {id}");
    }
    println!(
        "{} to add, {} to change, {} to remove, {} unchanged",
        diff.added.len(),
        diff.changed.len(),
        diff.removed.len(),
        diff.unchanged.len()
    );
}

pub fn diff(config: Option<&Path>, ledger: &Path) -> anyhow::Result<()> {
    let plan = assemble_plan(config)?;
    let ledger = open(ledger)?;
    let head = ledger.latest(&plan.stack)?;

    match &head {
        Some(record) => println!("{} against revision {}", plan.stack, record.revision),
        None => println!("{} has no recorded revision", plan.stack),
    }
    print_diff(&PlanDiff::between(head.as_ref().map(|r| &r.plan), &plan));
    Ok(())
}

pub fn record(config: Option<&Path>, ledger: &Path) -> anyhow::Result<()> {
    let plan = assemble_plan(config)?;
    let (record, diff) = open(ledger)?.record(&plan)?;

    if diff.is_empty() {
        println!("✓ {} unchanged at revision {}", record.stack, record.revision);
    } else {
        print_diff(&diff);
        println!("✓ Recorded {} revision {}", record.stack, record.revision);
    }
    Ok(())
}

pub fn history(config: Option<&Path>, ledger: &Path) -> anyhow::Result<()> {
    let inputs = super::load_inputs(config)?;
    let stack = inputs.context.stack_name();
    let records = open(ledger)?.history(&stack)?;

    if records.is_empty() {
        println!("{stack} has no recorded revision");
    }
    for record in records {
        println!(
            "{:>4}  {}  {} resources",
            record.revision,
            record.recorded_at,
            record.plan.len()
        );
    }
    Ok(())
}
