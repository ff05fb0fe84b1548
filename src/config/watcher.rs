//! File-watch driven configuration hot-reload.

use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use super::AppConfig;

/// Broadcast on every config file change.
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Reload succeeded; carries the new config.
    Reloaded(Arc<AppConfig>),
    /// Reload failed; carries a human-readable reason.
    ReloadFailed(String),
    /// The config file itself was removed.
    FileDeleted,
}

/// Watches the config file's directory and reloads on modify/create,
/// broadcasting [`ConfigEvent`]s to every subscriber.
pub struct ConfigWatcher {
    config: Arc<RwLock<AppConfig>>,
    config_path: PathBuf,
    event_sender: broadcast::Sender<ConfigEvent>,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Loads the initial config and starts watching its containing directory.
    pub fn new(config_path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();

        let initial_config = load_config_from_file(&config_path)?;
        let config = Arc::new(RwLock::new(initial_config));

        let (event_sender, _) = broadcast::channel(64);

        let config_clone = Arc::clone(&config);
        let sender_clone = event_sender.clone();
        let path_clone = config_path.clone();

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) =
                        Self::handle_file_event(&event, &config_clone, &sender_clone, &path_clone)
                    {
                        lerror!(
                            "system",
                            LogStage::Configuration,
                            LogComponent::Config,
                            "handle_file_event_fail",
                            "failed to handle config file event",
                            error = %e
                        );
                    }
                }
                Err(e) => {
                    lerror!(
                        "system",
                        LogStage::Configuration,
                        LogComponent::Config,
                        "watcher_error",
                        "config file watcher error",
                        error = %e
                    );
                }
            })?;

        let config_dir = config_path
            .parent()
            .ok_or_else(|| crate::error::ProxyError::config("config file has no parent directory"))?;

        watcher.watch(config_dir, RecursiveMode::NonRecursive)?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_watcher_start",
            "watching config file for changes",
            path = ?config_path
        );

        Ok(Self {
            config,
            config_path,
            event_sender,
            _watcher: watcher,
        })
    }

    /// Returns the current in-memory config.
    pub async fn get_config(&self) -> AppConfig {
        (*self.config.read().await).clone()
    }

    /// Subscribes to config change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.event_sender.subscribe()
    }

    /// Forces a reload from disk outside of the file-watch path.
    pub async fn reload(&self) -> crate::error::Result<()> {
        match load_config_from_file(&self.config_path) {
            Ok(new_config) => {
                let new_config = Arc::new(new_config);
                *self.config.write().await = (*new_config).clone();

                let _ = self.event_sender.send(ConfigEvent::Reloaded(new_config));
                linfo!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "config_reloaded",
                    "configuration reloaded"
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = format!("config reload failed: {e}");
                let _ = self
                    .event_sender
                    .send(ConfigEvent::ReloadFailed(error_msg.clone()));
                Err(crate::error::ProxyError::config(error_msg))
            }
        }
    }

    fn handle_file_event(
        event: &Event,
        config: &Arc<RwLock<AppConfig>>,
        sender: &broadcast::Sender<ConfigEvent>,
        config_path: &Path,
    ) -> crate::error::Result<()> {
        let is_our_file = event
            .paths
            .iter()
            .any(|path| path.file_name() == config_path.file_name());

        if !is_our_file {
            return Ok(());
        }

        match &event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => {
                ldebug!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "config_event",
                    "config file event observed",
                    paths = ?event.paths
                );

                // give the writer a moment to finish flushing
                std::thread::sleep(std::time::Duration::from_millis(100));

                match load_config_from_file(config_path) {
                    Ok(new_config) => {
                        let new_config = Arc::new(new_config);

                        let config_clone = Arc::clone(config);
                        let new_config_clone = Arc::clone(&new_config);
                        tokio::spawn(async move {
                            *config_clone.write().await = (*new_config_clone).clone();
                        });

                        let _ = sender.send(ConfigEvent::Reloaded(new_config));
                        linfo!(
                            "system",
                            LogStage::Configuration,
                            LogComponent::Config,
                            "config_reloaded",
                            "config file hot-reload succeeded"
                        );
                    }
                    Err(e) => {
                        let error_msg = format!("config file reload failed: {e}");
                        lwarn!(
                            "system",
                            LogStage::Configuration,
                            LogComponent::Config,
                            "config_reload_fail",
                            "config file hot-reload failed",
                            error = %error_msg
                        );
                        let _ = sender.send(ConfigEvent::ReloadFailed(error_msg));
                    }
                }
            }
            EventKind::Remove(_) => {
                lwarn!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "config_deleted",
                    "config file was removed"
                );
                let _ = sender.send(ConfigEvent::FileDeleted);
            }
            _ => {}
        }

        Ok(())
    }
}

fn load_config_from_file(path: &Path) -> crate::error::Result<AppConfig> {
    if !path.exists() {
        return Err(crate::error::ProxyError::config(format!(
            "config file does not exist: {}",
            path.display()
        )));
    }

    let config_content = std::fs::read_to_string(path).map_err(|e| {
        crate::error::ProxyError::config_with_source(
            format!("failed to read config file: {}", path.display()),
            e,
        )
    })?;

    let config: AppConfig = toml::from_str(&config_content)?;

    super::validate_config(&config)?;

    Ok(config)
}
