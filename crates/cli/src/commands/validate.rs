use homefeed_core::parse_site_toml;
use std::path::PathBuf;

pub async fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating site config at: {}", path.display());

    let config_path = path.join("homefeed.toml");
    let spec = parse_site_toml(&config_path)?;

    println!("✓ homefeed.toml valid");
    println!("  Site: {}", spec.site.name);
    println!("  Locales: {}", spec.site.locales.join(", "));
    println!(
        "  Feeds: {} RSS/Atom + blog '{}'",
        spec.feeds.len(),
        spec.blog.name
    );
    println!(
        "  Revalidate after: {}h, per-request timeout: {}s",
        spec.cycle.revalidate.as_secs() / 3600,
        spec.cycle.timeout.as_secs()
    );

    let critical: Vec<&str> = spec.cycle.critical.iter().map(|s| s.as_str()).collect();
    if critical.is_empty() {
        println!("  Critical sources: none (every failure degrades)");
    } else {
        println!("  Critical sources: {}", critical.join(", "));
    }

    Ok(())
}
