use anyhow::{Context, bail};
use clif_cohort::algorithm::cohort::cohort_from_encounter_blocks;
use clif_cohort::pipeline::{self, ClinicalTables};
use clif_cohort::{ClifConfig, CohortInput};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(config_path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: clif-cohort <config.json>");
    };
    let config = ClifConfig::from_json_file(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    info!("{config}");

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.thread_count())
        .build_global()
        .context("configuring the worker pool")?;

    let start = Instant::now();
    let tables = ClinicalTables::load(&config.tables_path)
        .with_context(|| format!("loading tables from {}", config.tables_path.display()))?;

    // Stitch hospitalizations into encounter blocks
    let stitched = pipeline::stitch(&tables, &config.stitching).context("stitching encounters")?;
    info!(
        "Linked {} hospitalizations into {} encounter blocks",
        stitched.mapping.len(),
        stitched.mapping.block_count()
    );
    if !stitched.report.is_empty() {
        warn!(
            "{} hospitalization or transfer records could not be stitched",
            stitched.report.len()
        );
    }

    // First hours of every block, scored at block level
    let windows = cohort_from_encounter_blocks(&stitched.blocks, config.sofa.window_hours);
    let cohort = CohortInput::by_encounter_block(&windows, &stitched.mapping);
    let run = pipeline::run_sofa(&tables, &cohort, &config.sofa).context("scoring SOFA")?;
    for (kind, count) in run.report.counts() {
        info!("  {kind}: {count}");
    }

    let out = &config.output_path;
    pipeline::write_stitched(out, &stitched).context("writing stitched encounters")?;
    run.write(out).context("writing SOFA outputs")?;

    info!(
        "Scored {} encounter blocks in {:?}, outputs in {}",
        run.scores.len(),
        start.elapsed(),
        out.display()
    );
    Ok(())
}
