mod bootstrap;
mod render;

use anyhow::{Context, Result};
use claims_core::settings::Settings;
use claims_data::analysis::{analyze_claims, AnalysisOptions};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Claims Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Trend: {}, denial sort: {}, timezone: {}",
        settings.trend,
        settings.denial_sort,
        settings.timezone
    );

    let data_path = bootstrap::resolve_data_path(settings.data.as_deref()).context(
        "no claims data found; pass --data <file-or-dir> or set CLAIMS_DATA",
    )?;
    tracing::info!("Reading claims from {}", data_path.display());

    let options = AnalysisOptions::from_settings(&settings, data_path)?;
    let result = analyze_claims(&options)
        .with_context(|| format!("failed to analyse {}", options.data_path.display()))?;

    if settings.json_output() {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!(
            "{}",
            render::render_text(&result, settings.trend_granularity())
        );
    }

    Ok(())
}
