use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use homefeed_core::{AggregatedPayload, SiteSpec, parse_site_toml};
use homefeed_fetcher::HttpSources;
use homefeed_generator::Orchestrator;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

struct PreviewState {
    spec: SiteSpec,
    payloads: RwLock<HashMap<String, AggregatedPayload>>,
    /// Held for the duration of one regeneration cycle so concurrent
    /// requests against stale payloads trigger at most one cycle.
    refresh_lock: Mutex<()>,
}

/// Serve payloads locally with the regeneration model the production page
/// uses: a payload is served as-is until its revalidation window elapses,
/// after which the stale copy keeps being served while a fresh cycle runs
/// in the background. A failed cycle keeps the previous payloads.
pub async fn run(path: PathBuf, port: u16) -> Result<()> {
    println!("📰 Starting payload preview server...");
    println!("   Site: {}", path.display());

    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let config_path = path.join("homefeed.toml");
    if !config_path.exists() {
        anyhow::bail!("homefeed.toml not found in {}", path.display());
    }

    let spec = parse_site_toml(&config_path).context("Failed to parse homefeed.toml")?;

    println!("   ✓ Loaded: {}", spec.site.name);
    println!("   ✓ Locales: {}", spec.site.locales.join(", "));
    println!(
        "   ✓ Revalidation window: {}h",
        spec.cycle.revalidate.as_secs() / 3600
    );

    let state = Arc::new(PreviewState {
        spec,
        payloads: RwLock::new(HashMap::new()),
        refresh_lock: Mutex::new(()),
    });

    let app = Router::new()
        .route("/payload/{locale}", get(payload_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Try: curl http://localhost:{}/payload/en", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn payload_handler(
    Path(locale): Path<String>,
    State(state): State<Arc<PreviewState>>,
) -> Response {
    if !state.spec.site.locales.contains(&locale) {
        return (StatusCode::NOT_FOUND, "unknown locale\n").into_response();
    }

    let cached = state.payloads.read().await.get(&locale).cloned();
    match cached {
        Some(payload) if !payload.is_stale(Utc::now()) => Json(payload).into_response(),
        Some(stale) => {
            // serve the stale copy now, refresh behind the response
            let state = state.clone();
            tokio::spawn(async move {
                refresh_if_idle(state).await;
            });
            Json(stale).into_response()
        }
        None => match first_generation(&state, &locale).await {
            Ok(payload) => Json(payload).into_response(),
            Err(e) => {
                eprintln!("   ⚠ Initial generation failed: {:#}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "payload generation failed and no previous payload exists\n",
                )
                    .into_response()
            }
        },
    }
}

/// Cold start: no payload exists for this locale yet, so the request has to
/// wait on a full cycle. The refresh lock serializes concurrent cold
/// starts; whoever wins fills the map for everyone.
async fn first_generation(
    state: &Arc<PreviewState>,
    locale: &str,
) -> Result<AggregatedPayload> {
    let _guard = state.refresh_lock.lock().await;

    if let Some(payload) = state.payloads.read().await.get(locale) {
        return Ok(payload.clone());
    }

    run_cycle(state).await?;
    state
        .payloads
        .read()
        .await
        .get(locale)
        .cloned()
        .context("cycle produced no payload for locale")
}

async fn refresh_if_idle(state: Arc<PreviewState>) {
    // a refresh is already running; the stale payload stays good enough
    let Ok(_guard) = state.refresh_lock.try_lock() else {
        return;
    };
    if let Err(e) = run_cycle(&state).await {
        eprintln!("   ⚠ Regeneration failed, keeping previous payloads: {:#}", e);
    }
}

/// One full regeneration cycle: fresh orchestrator (and so fresh memo
/// cells), every locale, then swap the results in. Failures leave the
/// previous payloads untouched.
async fn run_cycle(state: &PreviewState) -> Result<()> {
    let sources = HttpSources::new(state.spec.clone())?;
    let orchestrator = Orchestrator::new(state.spec.clone(), sources);

    let mut fresh = HashMap::new();
    for locale in &state.spec.site.locales {
        let payload = orchestrator
            .generate_payload(locale)
            .await
            .with_context(|| format!("Cycle failed for locale '{}'", locale))?;
        fresh.insert(locale.clone(), payload);
    }

    let count = fresh.len();
    let mut payloads = state.payloads.write().await;
    payloads.extend(fresh);
    println!("   ✓ Regenerated payloads for {} locales", count);

    Ok(())
}
