use anyhow::{Context, Result};
use homefeed_core::parse_site_toml;
use homefeed_fetcher::HttpSources;
use homefeed_generator::Orchestrator;
use std::fs;
use std::path::PathBuf;

/// Run one regeneration cycle and write one payload artifact per locale.
pub async fn run(path: PathBuf, output: PathBuf) -> Result<()> {
    println!("🔨 Generating home page payloads...");
    println!("   Source: {}", path.display());
    println!("   Output: {}", output.display());
    println!();

    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let config_path = path.join("homefeed.toml");
    if !config_path.exists() {
        anyhow::bail!("homefeed.toml not found in {}", path.display());
    }

    let spec = parse_site_toml(&config_path).context("Failed to parse homefeed.toml")?;

    println!("✓ Loaded: {}", spec.site.name);
    println!("  Locales: {}", spec.site.locales.join(", "));
    println!(
        "  Feeds: {} RSS/Atom + blog '{}'",
        spec.feeds.len(),
        spec.blog.name
    );
    println!();

    fs::create_dir_all(&output).context("Failed to create output directory")?;

    let sources = HttpSources::new(spec.clone())?;
    let orchestrator = Orchestrator::new(spec.clone(), sources);

    println!("🌐 Fetching sources and assembling payloads...");
    let mut first_report = None;
    for locale in &spec.site.locales {
        let payload = orchestrator
            .generate_payload(locale)
            .await
            .with_context(|| format!("Cycle failed for locale '{}'", locale))?;

        let file = output.join(format!("payload.{}.json", locale));
        let json = serde_json::to_string_pretty(&payload).context("Failed to encode payload")?;
        fs::write(&file, json).with_context(|| format!("Failed to write {}", file.display()))?;

        println!(
            "   ✓ {} — {} metrics, {} posts, {} events ({} feed entries dropped)",
            file.display(),
            payload.metrics.len(),
            payload.feed_items.len(),
            payload.community_events.len(),
            payload.dropped_feed_entries
        );

        // sources settle once; every locale reports the same set
        first_report.get_or_insert(payload.sources);
    }

    if let Some(report) = first_report {
        let failed: Vec<_> = report.iter().filter(|r| !r.ok).collect();
        if !failed.is_empty() {
            println!();
            for entry in &failed {
                eprintln!(
                    "   ⚠ {} degraded: {}",
                    entry.source,
                    entry.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    println!();
    println!("✅ Generation complete!");
    println!("   Output: {}", output.display());

    Ok(())
}
