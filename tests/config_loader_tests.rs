use ark::config::{ConfigError, ConfigLoader, WebsiteSeed};
use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "ARK_PROFILE",
    "ARK_LOG_LEVEL",
    "ARK_DATABASE_URL",
    "ARK_TICK_INTERVAL_SECONDS",
    "ARK_ENABLE_RSS",
    "ARK_SEED_WEBSITES",
    "ARK_ALERT_RECIPIENT",
    "ARK_SMTP2GO_API_KEY",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();

    let cfg = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.scheduler.tick_interval_seconds, 30);
    assert_eq!(cfg.scheduler.max_concurrent_fetches, 5);
    assert!(cfg.scheduler.enable_uptime);
    assert!(cfg.scheduler.enable_rss);
    assert_eq!(cfg.alerts.down_cooldown_seconds, 3600);
    assert_eq!(cfg.alerts.recovery_cooldown_seconds, 86400);
    assert!(!cfg.alerts_deliverable());
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();

    write_env_file(
        &dir,
        ".env",
        "ARK_PROFILE=dev\nARK_LOG_LEVEL=warn\nARK_TICK_INTERVAL_SECONDS=10\n",
    );
    write_env_file(&dir, ".env.local", "ARK_LOG_LEVEL=info\n");
    write_env_file(&dir, ".env.dev", "ARK_TICK_INTERVAL_SECONDS=20\n");
    write_env_file(&dir, ".env.dev.local", "ARK_LOG_LEVEL=debug\n");

    let cfg = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();

    assert_eq!(cfg.profile, "dev");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.scheduler.tick_interval_seconds, 20);
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();
    write_env_file(&dir, ".env", "ARK_TICK_INTERVAL_SECONDS=10\nARK_ENABLE_RSS=true\n");

    unsafe {
        env::set_var("ARK_TICK_INTERVAL_SECONDS", "45");
        env::set_var("ARK_ENABLE_RSS", "false");
        env::set_var(
            "ARK_SEED_WEBSITES",
            "Blog=https://blog.example.test, https://shop.example.test",
        );
        env::set_var("ARK_ALERT_RECIPIENT", "ops@example.test");
        env::set_var("ARK_SMTP2GO_API_KEY", "api-secret");
    }

    let cfg = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();
    clear_env();

    assert_eq!(cfg.scheduler.tick_interval_seconds, 45);
    assert!(!cfg.scheduler.enable_rss);
    assert_eq!(
        cfg.uptime.seed_websites,
        vec![
            WebsiteSeed {
                name: "Blog".into(),
                url: "https://blog.example.test".into(),
            },
            WebsiteSeed {
                name: "https://shop.example.test".into(),
                url: "https://shop.example.test".into(),
            },
        ]
    );
    assert!(cfg.alerts_deliverable());
    assert!(!cfg.redacted_json().unwrap().contains("api-secret"));
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = env_guard();
    clear_env();
    let dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("ARK_TICK_INTERVAL_SECONDS", "soon");
    }
    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
