use pollwatch::Settings;
use std::env;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
[watcher]
interval_secs = 5.0

[executor]
workers = 4
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("POLLWATCH_WATCHER__INTERVAL_SECS", "0.5");
        env::set_var("POLLWATCH_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("POLLWATCH_WATCHER__INTERVAL_SECS");
        env::remove_var("POLLWATCH_LOGGING__DEFAULT");
    }

    assert_eq!(settings.watcher.interval(), Duration::from_millis(500));
    assert_eq!(settings.logging.default, "debug");
    // File value survives where no env override exists
    assert_eq!(settings.executor.workers, 4);
}
