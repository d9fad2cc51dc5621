//! Background refresh lifecycle: start, restart on settings change, stop.
//!
//! Tick timing is covered by the unit tests in `scheduler.rs`; these tests use
//! real cache lengths (minutes) and only check the lifecycle.
//!
//! ```bash
//! cargo test -p paperless-search --test test_scheduler
//! ```

mod common;

#[cfg(test)]
mod lifecycle {
    use paperless_search::prelude::*;

    use crate::common::*;

    fn auto(env: &TestEnv) -> Settings {
        Settings {
            auto_cache: true,
            ..env.settings()
        }
    }

    /// Starting with auto cache refreshes once and schedules the next refresh
    #[tokio::test]
    #[test_log::test]
    async fn test_start_refreshes_and_schedules() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;

        let status = plugin.status().await;
        assert_eq!(status.generation, 1);
        assert_eq!(status.documents, 3);
        assert!(status.fresh);
        assert!(status.scheduler_running);
        assert_eq!(status.refresh_period_minutes, Some(60));

        plugin.shutdown().await;
        assert!(!plugin.status().await.scheduler_running);
        env.shutdown().await;
        Ok(())
    }

    /// Without auto cache, start does nothing
    #[tokio::test]
    #[test_log::test]
    async fn test_start_without_auto_cache() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        plugin.start().await;
        let status = plugin.status().await;
        assert_eq!(status.generation, 0);
        assert!(!status.scheduler_running);
        assert_eq!(env.server.total_requests(), 0);

        // caching off wins over auto cache
        let plugin = env.plugin(Settings {
            cache_results: false,
            ..auto(&env)
        })?;
        plugin.start().await;
        assert!(!plugin.status().await.scheduler_running);
        assert_eq!(env.server.total_requests(), 0);
        env.shutdown().await;
        Ok(())
    }

    /// A fresh snapshot file from a previous run makes the initial refresh unnecessary
    #[tokio::test]
    #[test_log::test]
    async fn test_start_with_fresh_file() -> TestResult {
        let env = TestEnv::sample().await?;
        env.plugin(env.settings())?.refresh().await?;
        env.server.reset_counts();

        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;
        assert_eq!(plugin.snapshot().generation, 1);
        assert!(plugin.status().await.scheduler_running);
        assert_eq!(env.server.total_requests(), 0);
        plugin.shutdown().await;
        env.shutdown().await;
        Ok(())
    }

    /// A new cache length restarts the scheduler with the new period
    #[tokio::test]
    #[test_log::test]
    async fn test_cache_length_restarts_scheduler() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;

        let change = plugin
            .apply_settings(Settings {
                cache_length: 5,
                ..plugin.settings()
            })
            .await?;
        assert!(change.scheduler);
        let status = plugin.status().await;
        assert!(status.scheduler_running);
        assert_eq!(status.refresh_period_minutes, Some(5));
        assert!(!status.fresh);

        plugin.shutdown().await;
        env.shutdown().await;
        Ok(())
    }

    /// Turning auto cache or caching off stops the scheduler; turning it on starts it
    #[tokio::test]
    #[test_log::test]
    async fn test_toggle_auto_cache() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;

        let mut settings = plugin.settings();
        settings.auto_cache = false;
        assert!(plugin.apply_settings(settings.clone()).await?.scheduler);
        assert!(!plugin.status().await.scheduler_running);

        settings.auto_cache = true;
        assert!(plugin.apply_settings(settings.clone()).await?.scheduler);
        assert_eq!(plugin.status().await.refresh_period_minutes, Some(60));

        settings.cache_results = false;
        let change = plugin.apply_settings(settings).await?;
        assert!(change.scheduler);
        assert!(change.cache_disabled);
        assert!(!plugin.status().await.scheduler_running);

        plugin.shutdown().await;
        env.shutdown().await;
        Ok(())
    }

    /// Settings that don't concern the scheduler leave it alone
    #[tokio::test]
    #[test_log::test]
    async fn test_unrelated_change_keeps_scheduler() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;
        let change = plugin
            .apply_settings(Settings {
                result_limit: 5,
                ..plugin.settings()
            })
            .await?;
        assert!(!change.scheduler);
        assert_eq!(plugin.status().await.refresh_period_minutes, Some(60));
        plugin.shutdown().await;
        env.shutdown().await;
        Ok(())
    }

    /// Shutdown is idempotent, and dropping the plugin after shutdown is clean
    #[tokio::test]
    #[test_log::test]
    async fn test_shutdown_twice() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(auto(&env))?;
        plugin.start().await;
        plugin.shutdown().await;
        plugin.shutdown().await;
        assert!(!plugin.status().await.scheduler_running);
        drop(plugin);
        env.shutdown().await;
        Ok(())
    }
}
