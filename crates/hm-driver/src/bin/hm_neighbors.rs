use anyhow::Context;
use hm_driver::{CandidatePool, PollDriver};
use hm_optimizer::{ProcessRole, RunContext, RunDefinition};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HYPERMESH_DEFINITION").ok())
        .context("usage: hm-neighbors <definition.json>")?;

    let definition = RunDefinition::from_path(&path)
        .with_context(|| format!("failed to load run definition {path}"))?;
    let context = RunContext::from_definition(definition, ProcessRole::Master)?;

    let (x0, descriptor) = context.base_descriptor()?;
    eprintln!("Run {} starting at {:?} ({})", context.name, x0.coordinates, descriptor.summary());

    let adapter = context.adapter();
    let pool = CandidatePool::new();
    let mut driver = PollDriver::for_run(&context, &adapter, &pool);
    let report = driver.extend(&x0, context.base())?;

    for rejection in &report.rejected {
        eprintln!(
            "rejected {} = {}: {}",
            rejection.change.variable, rejection.change.to, rejection.error
        );
    }

    let candidates = pool.drain_batch(report.registered);
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}
