//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the panel.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Namespace isolation: the panel owns the "panel" namespace.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit(); the
//!   in-memory simulation achieves this trivially.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::PanelConfig;
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "panel";
const CONFIG_KEY: &str = "syscfg";

const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                log::warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: ns_buf is NUL-terminated (zero-initialised, len <= 15) and
        // outlives the call; handle is closed on every path below.
        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(key: &str, buf: &mut [u8]) -> Result<usize, ConfigError> {
        let mut key_buf = [0u8; 16];
        let kb = key.as_bytes();
        let len = kb.len().min(15);
        key_buf[..len].copy_from_slice(&kb[..len]);

        Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
            let mut size = buf.len();
            // SAFETY: key_buf is NUL-terminated; buf/size form a valid
            // out-buffer for nvs_get_blob.
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret == ESP_OK { Ok(size) } else { Err(ret) }
        })
        .map_err(|rc| {
            if rc == ESP_ERR_NVS_NOT_FOUND {
                ConfigError::NotFound
            } else {
                ConfigError::IoError
            }
        })
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut key_buf = [0u8; 16];
        let kb = key.as_bytes();
        let len = kb.len().min(15);
        key_buf[..len].copy_from_slice(&kb[..len]);

        Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
            // SAFETY: key_buf is NUL-terminated; data pointer/length are
            // valid for the duration of the call.
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret == ESP_OK { Ok(()) } else { Err(ret) }
        })
        .map_err(|rc| {
            if rc == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                ConfigError::StorageFull
            } else {
                ConfigError::IoError
            }
        })
    }
}

/// Range-check every field before it can reach persistent storage.
pub fn validate_config(cfg: &PanelConfig) -> Result<(), ConfigError> {
    if !(5..=500).contains(&cfg.debounce_ms) {
        return Err(ConfigError::ValidationFailed("debounce_ms must be 5-500"));
    }
    if !(1..=100).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be 1-100",
        ));
    }
    if cfg.poll_interval_ms >= cfg.debounce_ms {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be below debounce_ms",
        ));
    }
    if !(500..=60_000).contains(&cfg.led_hold_ms) {
        return Err(ConfigError::ValidationFailed(
            "led_hold_ms must be 500-60000",
        ));
    }
    if !(1_000..=600_000).contains(&cfg.sleep_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "sleep_timeout_ms must be 1000-600000",
        ));
    }
    if cfg.led_hold_ms >= cfg.sleep_timeout_ms {
        return Err(ConfigError::ValidationFailed(
            "led_hold_ms must be strictly below sleep_timeout_ms",
        ));
    }
    if cfg.device_id.is_empty() {
        return Err(ConfigError::ValidationFailed("device_id must be set"));
    }
    if cfg.broker_url.is_empty() {
        return Err(ConfigError::ValidationFailed("broker_url must be set"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<PanelConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];

        #[cfg(target_os = "espidf")]
        let size = Self::read_blob(CONFIG_KEY, &mut buf)?;

        #[cfg(not(target_os = "espidf"))]
        let size = {
            let store = self.store.borrow();
            let blob = store
                .get(&format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY))
                .ok_or(ConfigError::NotFound)?;
            let n = blob.len().min(buf.len());
            buf[..n].copy_from_slice(&blob[..n]);
            n
        };

        let cfg: PanelConfig =
            postcard::from_bytes(&buf[..size]).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        Ok(cfg)
    }

    fn save(&self, config: &PanelConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let blob = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if blob.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }

        #[cfg(target_os = "espidf")]
        {
            Self::write_blob(CONFIG_KEY, &blob)?;
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY), blob);
        }

        info!("config saved to NVS");
        Ok(())
    }
}
