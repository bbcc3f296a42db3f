use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tera::Tera;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::components::like_button;
use crate::config::TemplatesCfg;

pub type Templates = Arc<RwLock<Tera>>;

pub fn load(cfg: &TemplatesCfg) -> anyhow::Result<Templates> {
    let glob = format!("{}/**/*", cfg.dir.trim_end_matches('/'));
    let mut tera = Tera::new(&glob)?;
    tera.register_function("like_button", like_button::tera_function);
    info!(templates = tera.get_template_names().count(), %glob, "templates loaded");
    Ok(Arc::new(RwLock::new(tera)))
}

pub async fn render(templates: &Templates, name: &str, ctx: &tera::Context) -> tera::Result<String> {
    templates.read().await.render(name, ctx)
}

/// Reloads templates whenever a file under `dir` changes. Dropping the watcher stops it.
pub fn watch(templates: Templates, dir: &Path) -> notify::Result<RecommendedWatcher> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        match event {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "template watch error"),
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Coalesce bursts from editors writing several events per save.
            while rx.try_recv().is_ok() {}
            match templates.write().await.full_reload() {
                Ok(()) => info!("templates reloaded"),
                Err(e) => error!(error = %e, "template reload failed"),
            }
        }
    });

    info!(dir = %dir.display(), "watching templates");
    Ok(watcher)
}
