//! Development server with live reload and on-demand post rendering
//!
//! Pre-built pages are served from the public directory. When fallback is
//! enabled, a post that has no page yet gets the loading page while a
//! background task fetches and renders it; the loading page refreshes itself
//! until the real page exists.
//!
//! In watch mode an edit to the snapshot or `_config.yml` rebuilds the site
//! with the reloaded configuration and swaps it in for later requests.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::commands::generate::content_watcher;
use crate::generator::Generator;
use crate::helpers::is_path_segment;
use crate::SpaceTraveling;

/// How long a failed render is remembered when nobody asks for it again
const FAILED_RETENTION: Duration = Duration::from_secs(30);

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Progress of an on-demand post render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    InFlight,
    Failed(Instant),
}

/// Everything the handlers derive from the site configuration
struct Site {
    public_dir: PathBuf,
    route_prefix: String,
    fallback: bool,
    generator: Arc<Generator>,
}

impl Site {
    fn new(app: &SpaceTraveling) -> Result<Self> {
        Ok(Self {
            public_dir: app.public_dir.clone(),
            route_prefix: app.config.post.route_prefix.trim_matches('/').to_string(),
            fallback: app.config.post.fallback,
            generator: Arc::new(Generator::new(app)?),
        })
    }

    /// Extract the slug from a post URL (`/<prefix>/<slug>` or with a trailing slash)
    fn post_slug<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mut rest = path.trim_start_matches('/');
        if !self.route_prefix.is_empty() {
            rest = rest.strip_prefix(self.route_prefix.as_str())?;
            rest = rest.strip_prefix('/')?;
        }
        let slug = rest.trim_end_matches('/');
        is_path_segment(slug).then_some(slug)
    }
}

/// Server state
struct ServerState {
    site: RwLock<Arc<Site>>,
    fetches: Mutex<HashMap<String, FetchState>>,
    failed_retention: Duration,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl ServerState {
    fn new(site: Site, reload_tx: broadcast::Sender<()>, live_reload: bool) -> Self {
        Self {
            site: RwLock::new(Arc::new(site)),
            fetches: Mutex::new(HashMap::new()),
            failed_retention: FAILED_RETENTION,
            reload_tx,
            live_reload,
        }
    }

    async fn site(&self) -> Arc<Site> {
        Arc::clone(&*self.site.read().await)
    }
}

/// Start the development server
pub async fn start(
    app: &SpaceTraveling,
    ip: &str,
    port: u16,
    watch: bool,
    open: bool,
) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState::new(Site::new(app)?, reload_tx, watch));

    let app_router = router(Arc::clone(&state));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_and_reload(app, state).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app_router).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Watch the content snapshot and config, rebuild and trigger reload
async fn watch_and_reload(app: SpaceTraveling, state: Arc<ServerState>) -> Result<()> {
    let (_watcher, mut changes) = content_watcher(&app)?;

    while let Some(paths) = changes.recv().await {
        println!();
        for path in &paths {
            println!("📝 File changed: {}", path.display());
        }

        println!("\n🔄 Regenerating...");
        match reload_site(&state, &app.base_dir).await {
            Ok(()) => {
                println!("✅ Regenerated successfully!");
                let _ = state.reload_tx.send(());
            }
            Err(e) => {
                println!("❌ Generation failed: {:#}", e);
            }
        }
    }

    Ok(())
}

/// Reload the configuration, rebuild, and serve the rebuilt site
async fn reload_site(state: &ServerState, base_dir: &Path) -> Result<()> {
    let fresh = SpaceTraveling::new(base_dir)?;
    fresh.generate().await?;
    let site = Site::new(&fresh)?;
    *state.site.write().await = Arc::new(site);
    Ok(())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serves built files, falling back to on-demand rendering for post URLs
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();
    let clean_path = path.trim_start_matches('/');

    // Only plain segments; `..` must not leave the public directory
    if !Path::new(clean_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    let site = state.site().await;

    let file_path = if clean_path.is_empty() {
        site.public_dir.join("index.html")
    } else {
        let candidate = site.public_dir.join(clean_path);

        if candidate.is_dir() {
            candidate.join("index.html")
        } else if candidate.exists() {
            candidate
        } else {
            let with_html = site.public_dir.join(format!("{}.html", clean_path));
            if with_html.exists() {
                with_html
            } else {
                candidate
            }
        }
    };

    if !file_path.exists() {
        if let Some(slug) = site.post_slug(&path) {
            return post_fallback(&state, &site, slug).await;
        }
    }

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        let mut service = ServeDir::new(&site.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Respond for a post that has no page yet
///
/// The first request starts a background render; every request while it
/// runs gets the loading page. A failed render answers 404 once and is then
/// forgotten, so a later request tries again.
async fn post_fallback(state: &Arc<ServerState>, site: &Site, slug: &str) -> Response {
    if !site.fallback {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    {
        let mut fetches = state.fetches.lock().await;
        match fetches.get(slug).copied() {
            Some(FetchState::Failed(_)) => {
                fetches.remove(slug);
                return (StatusCode::NOT_FOUND, "Not found").into_response();
            }
            Some(FetchState::InFlight) => {}
            None => {
                fetches.insert(slug.to_string(), FetchState::InFlight);
                spawn_render(
                    Arc::clone(state),
                    Arc::clone(&site.generator),
                    slug.to_string(),
                );
            }
        }
    }

    match site.generator.render_loading() {
        Ok(html) if state.live_reload => Html(inject_live_reload(&html)).into_response(),
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render loading page: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn spawn_render(state: Arc<ServerState>, generator: Arc<Generator>, slug: String) {
    tokio::spawn(async move {
        tracing::info!("Rendering {} on demand", slug);
        let result = generator.build_post(&slug).await;

        let failed = {
            let mut fetches = state.fetches.lock().await;
            match result {
                Ok(path) => {
                    tracing::debug!("Generated: {:?}", path);
                    fetches.remove(&slug);
                    None
                }
                Err(e) => {
                    tracing::error!("{:#}", e);
                    let marker = FetchState::Failed(Instant::now());
                    fetches.insert(slug.clone(), marker);
                    Some(marker)
                }
            }
        };

        // Forget the failure if nobody came back for it
        if let Some(marker) = failed {
            tokio::time::sleep(state.failed_retention).await;
            let mut fetches = state.fetches.lock().await;
            if fetches.get(&slug) == Some(&marker) {
                fetches.remove(&slug);
            }
        }
    });
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{Document, MemoryClient};
    use crate::config::SiteConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(uid: &str) -> Document {
        Document {
            id: format!("id-{}", uid),
            uid: Some(uid.to_string()),
            doc_type: "post".to_string(),
            first_publication_date: None,
            last_publication_date: None,
            data: json!({
                "title": "Late post",
                "author": "Joseph Oliveira",
                "banner": {"url": "https://images.example.com/b.png"},
                "content": []
            }),
        }
    }

    fn app(dir: &TempDir, fallback: bool, docs: Vec<Document>) -> SpaceTraveling {
        let mut config = SiteConfig::default();
        config.post.fallback = fallback;
        SpaceTraveling::with_config(dir.path().to_path_buf(), config)
            .with_client(Arc::new(MemoryClient::new(docs)))
    }

    fn state_for(app: &SpaceTraveling, live_reload: bool) -> Arc<ServerState> {
        let (reload_tx, _) = broadcast::channel(1);
        Arc::new(ServerState::new(
            Site::new(app).unwrap(),
            reload_tx,
            live_reload,
        ))
    }

    fn state(dir: &TempDir, fallback: bool, docs: Vec<Document>) -> Arc<ServerState> {
        state_for(&app(dir, fallback, docs), false)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get(state: &Arc<ServerState>, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        fallback_handler(State(Arc::clone(state)), request).await
    }

    async fn request_post(state: &Arc<ServerState>, slug: &str) -> Response {
        let site = state.site().await;
        post_fallback(state, &site, slug).await
    }

    async fn wait_until_settled(state: &Arc<ServerState>, slug: &str) {
        for _ in 0..100 {
            if state.fetches.lock().await.get(slug) != Some(&FetchState::InFlight) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("render of {} did not finish", slug);
    }

    #[test]
    fn test_post_slug() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(&app(&dir, true, vec![])).unwrap();
        assert_eq!(
            site.post_slug("/post/como-utilizar-hooks"),
            Some("como-utilizar-hooks")
        );
        assert_eq!(
            site.post_slug("/post/como-utilizar-hooks/"),
            Some("como-utilizar-hooks")
        );
        assert_eq!(site.post_slug("/post/my_post"), Some("my_post"));
        assert_eq!(site.post_slug("/post/"), None);
        assert_eq!(site.post_slug("/post/a/b"), None);
        assert_eq!(site.post_slug("/post/.."), None);
        assert_eq!(site.post_slug("/other/a"), None);
        assert_eq!(site.post_slug("/postx/a"), None);
    }

    #[tokio::test]
    async fn test_unknown_post_shows_loading_then_page() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true, vec![doc("late")]);

        let response = request_post(&state, "late").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Carregando..."));

        wait_until_settled(&state, "late").await;
        let site = state.site().await;
        let page = std::fs::read_to_string(site.generator.post_output_path("late")).unwrap();
        assert!(page.contains("<title>Late post | SpaceTraveling</title>"));
    }

    #[tokio::test]
    async fn test_failed_render_is_not_found_once() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true, vec![]);

        let response = request_post(&state, "missing").await;
        assert_eq!(response.status(), StatusCode::OK);
        wait_until_settled(&state, "missing").await;

        let response = request_post(&state, "missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.fetches.lock().await.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_unclaimed_failures_expire() {
        let dir = TempDir::new().unwrap();
        let (reload_tx, _) = broadcast::channel(1);
        let state = Arc::new(ServerState {
            failed_retention: Duration::from_millis(50),
            ..ServerState::new(
                Site::new(&app(&dir, true, vec![])).unwrap(),
                reload_tx,
                false,
            )
        });

        let slugs: Vec<String> = (0..50).map(|i| format!("missing-{}", i)).collect();
        for slug in &slugs {
            let response = request_post(&state, slug).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        for slug in &slugs {
            wait_until_settled(&state, slug).await;
        }

        for _ in 0..100 {
            if state.fetches.lock().await.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "{} failed renders still remembered",
            state.fetches.lock().await.len()
        );
    }

    #[tokio::test]
    async fn test_no_fallback_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false, vec![doc("late")]);

        let response = request_post(&state, "late").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serves_built_page() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true, vec![doc("late")]);
        state.site().await.generator.build_post("late").await.unwrap();

        let response = get(&state, "/post/late/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Late post"));
        assert!(state.fetches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_parent_segments_are_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.html"), "<p>secret</p>").unwrap();
        let state = state_for(&app(&dir, true, vec![]), true);
        std::fs::create_dir_all(&state.site().await.public_dir).unwrap();

        for uri in ["/../secret.html", "/../../secret.html", "/post/../../secret.html"] {
            let response = get(&state, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert!(!body_text(response).await.contains("secret"));
        }
    }

    #[tokio::test]
    async fn test_reload_picks_up_config_changes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cms")).unwrap();
        std::fs::write(
            dir.path().join("cms/late.json"),
            serde_json::to_string(&doc("late")).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("_config.yml"), "post:\n  route_prefix: post\n").unwrap();

        let app = SpaceTraveling::new(dir.path()).unwrap();
        let state = state_for(&app, false);
        assert_eq!(state.site().await.route_prefix, "post");

        std::fs::write(
            dir.path().join("_config.yml"),
            "post:\n  route_prefix: blog\n  fallback: false\n",
        )
        .unwrap();
        reload_site(&state, dir.path()).await.unwrap();

        let site = state.site().await;
        assert_eq!(site.route_prefix, "blog");
        assert!(!site.fallback);
        assert!(dir.path().join("public/blog/late/index.html").exists());

        let response = get(&state, "/blog/late/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Late post"));
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><h1>x</h1></body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</html>"));
    }
}
