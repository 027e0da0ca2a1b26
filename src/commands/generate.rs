//! Generate static files

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::generator::Generator;
use crate::SpaceTraveling;

/// Quiet period before a burst of file events triggers a rebuild
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Generate the static site (with incremental support)
pub async fn run(app: &SpaceTraveling) -> Result<()> {
    run_with_options(app, false).await
}

/// Generate with force option
pub async fn run_with_options(app: &SpaceTraveling, force: bool) -> Result<()> {
    let start = Instant::now();

    let generator = Generator::new(app)?;
    let summary = generator.generate(force).await?;

    tracing::info!(
        "Rendered {} posts, {} unchanged, {} removed",
        summary.rendered,
        summary.skipped,
        summary.removed
    );

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Watch the content snapshot and config for changes and regenerate
pub async fn watch(app: &SpaceTraveling) -> Result<()> {
    let (_watcher, mut changes) = content_watcher(app)?;

    tracing::info!("Watching for changes (incremental mode). Press Ctrl+C to stop.");

    while let Some(paths) = changes.recv().await {
        for path in &paths {
            tracing::info!("File changed: {}", path.display());
        }

        // Config edits need a fresh instance
        match SpaceTraveling::new(&app.base_dir) {
            Ok(fresh) => {
                if let Err(e) = run(&fresh).await {
                    tracing::error!("Generation failed: {:#}", e);
                }
            }
            Err(e) => tracing::error!("Failed to reload config: {:#}", e),
        }
    }

    Ok(())
}

/// Debounced watcher over the snapshot directory and `_config.yml`
///
/// Each message is the set of changed paths from one burst of events, sent
/// once the files have been quiet for a moment. Events stop when the
/// returned watcher is dropped.
pub fn content_watcher(
    app: &SpaceTraveling,
) -> Result<(Debouncer<RecommendedWatcher>, mpsc::UnboundedReceiver<Vec<PathBuf>>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths: Vec<PathBuf> = events
                .into_iter()
                .map(|e| e.path)
                .filter(|p| is_relevant(p))
                .collect();
            if !paths.is_empty() {
                let _ = tx.send(paths);
            }
        }
        Err(e) => tracing::error!("Watch error: {:?}", e),
    })?;

    if app.snapshot_dir.exists() {
        debouncer
            .watcher()
            .watch(&app.snapshot_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", app.snapshot_dir);
    }

    let config_path = app.base_dir.join("_config.yml");
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    Ok((debouncer, rx))
}

fn is_relevant(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git") && !path_str.contains(".DS_Store") && !path_str.ends_with('~')
}
