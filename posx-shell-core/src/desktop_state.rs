use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{logging::DesktopLogCategory, DESKTOP_STATE_FILE};

const USER_DATA_FIELD: &str = "userData";
const AUTO_UPDATE_CHECK_FIELD: &str = "autoUpdateCheck";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to create state directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read desktop state {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write desktop state {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize desktop state")]
    Serialize(#[source] serde_json::Error),
    #[error("desktop state lock poisoned")]
    Poisoned,
}

/// Persisted desktop state: one JSON object on disk, cached in memory.
#[derive(Debug)]
pub struct DesktopStateStore {
    path: PathBuf,
    state: Mutex<Value>,
}

impl DesktopStateStore {
    /// Loads `<data_dir>/desktop_state.json`. A missing file is an empty state;
    /// an unparsable file or a non-object root is reset.
    pub fn load(data_dir: &Path) -> Result<Self, StateError> {
        let path = data_dir.join(DESKTOP_STATE_FILE);
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) if value.is_object() => value,
                Ok(_) => {
                    tracing::warn!(
                        category = DesktopLogCategory::Startup.as_str(),
                        path = %path.display(),
                        "desktop state has non-object root; resetting"
                    );
                    empty_state_object()
                }
                Err(error) => {
                    tracing::warn!(
                        category = DesktopLogCategory::Startup.as_str(),
                        path = %path.display(),
                        "failed to parse desktop state: {error}; resetting"
                    );
                    empty_state_object()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => empty_state_object(),
            Err(source) => return Err(StateError::Read { path, source }),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn user_data(&self) -> Result<Option<Value>, StateError> {
        let state = self.state.lock().map_err(|_| StateError::Poisoned)?;
        Ok(state
            .get(USER_DATA_FIELD)
            .filter(|value| !value.is_null())
            .cloned())
    }

    pub fn save_user_data(&self, data: Value) -> Result<(), StateError> {
        self.update(|object| {
            object.insert(USER_DATA_FIELD.to_string(), data);
        })
    }

    pub fn delete_user_data(&self) -> Result<(), StateError> {
        self.update(|object| {
            object.remove(USER_DATA_FIELD);
        })
    }

    pub fn auto_update_check_enabled(&self) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.get(AUTO_UPDATE_CHECK_FIELD)?.as_bool())
            .unwrap_or(true)
    }

    pub fn set_auto_update_check_enabled(&self, enabled: bool) -> Result<(), StateError> {
        self.update(|object| {
            object.insert(AUTO_UPDATE_CHECK_FIELD.to_string(), Value::Bool(enabled));
        })
    }

    fn update<F>(&self, mutate: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut state = self.state.lock().map_err(|_| StateError::Poisoned)?;
        let mut next = state.clone();
        mutate(ensure_object(&mut next));
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, value: &Value) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StateError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = serde_json::to_string_pretty(value).map_err(StateError::Serialize)?;
        fs::write(&self.path, serialized).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn empty_state_object() -> Value {
    Value::Object(Map::new())
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = empty_state_object();
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just normalized into a JSON object"),
    }
}
