//! Integration tests for config

#[cfg(test)]
mod tests {
    use relup_config::*;
    use relup_types::ColorChoice;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        std::env::remove_var("RELUP_PENDING_TIMEOUT");
        std::env::remove_var("RELUP_PROGRESS_INTERVAL");
        std::env::remove_var("RELUP_DOWNLOADS_DIR");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.download.pending_timeout(), Duration::from_secs(10));
        assert_eq!(config.download.progress_interval(), Duration::from_millis(500));
        assert_eq!(config.install.buffer_capacity, 65536);
        assert_eq!(config.install.stream_name, "RelupPackageInstallerStream");
        assert!(config
            .sources
            .local_stores
            .contains(&"com.android.packageinstaller".to_string()));
        assert_eq!(config.sources.installer, None);
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
color = "never"

[download]
pending_timeout_secs = 30

[paths]
downloads_dir = "/tmp/relup-downloads"

[sources]
installer = "com.example.store"
extra_local_stores = ["org.example.browser"]
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.download.pending_timeout_secs, 30);
        // Unset keys keep their defaults
        assert_eq!(config.download.progress_interval_ms, 500);
        assert_eq!(
            config.downloads_dir(),
            PathBuf::from("/tmp/relup-downloads")
        );
        assert_eq!(
            config.sources.installer.as_deref(),
            Some("com.example.store")
        );
        let stores = config.sources.all_local_stores();
        assert!(stores.contains(&"adb".to_string()));
        assert!(stores.contains(&"org.example.browser".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_file_value_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[install]\nbuffer_capacity = 0").unwrap();

        assert!(Config::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_pending_timeout_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[download]\npending_timeout_secs = 0").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(err.to_string().contains("download.pending_timeout_secs"));
    }

    #[test]
    fn test_zero_pending_timeout_from_env_rejected() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("RELUP_PENDING_TIMEOUT", "0");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/relup.toml")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("RELUP_PENDING_TIMEOUT", "3");
        std::env::set_var("RELUP_PROGRESS_INTERVAL", "250");
        std::env::set_var("RELUP_DOWNLOADS_DIR", "/var/tmp/relup");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.download.pending_timeout_secs, 3);
        assert_eq!(config.download.progress_interval_ms, 250);
        assert_eq!(config.downloads_dir(), PathBuf::from("/var/tmp/relup"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("RELUP_PENDING_TIMEOUT", "soon");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }
}
