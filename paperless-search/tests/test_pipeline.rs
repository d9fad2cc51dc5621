//! Refresh pipeline tests: paged fetch, reference resolution, enrichment.
//!
//! ```bash
//! cargo test -p paperless-search --test test_pipeline
//! ```

mod common;

#[cfg(test)]
mod fetch {
    use futures::StreamExt;
    use paperless_search::{mock::MockData, prelude::*};

    use crate::common::*;

    /// Pages are requested lazily, following `next` until it is null
    #[tokio::test]
    #[test_log::test]
    async fn test_documents_follow_next_links() -> TestResult {
        let env = TestEnv::start(MockData::generated(5)).await?;
        let client = PaperlessClient::new(ClientConfig {
            page_size: 2,
            ..ClientConfig::from(&env.settings())
        })?;

        let mut pages = client.documents();
        let first = pages.next().await.expect("first page");
        assert_eq!(first.len(), 2);
        assert_eq!(env.server.request_count("/api/documents/"), 1);

        let rest: Vec<Vec<Document>> = pages.collect().await;
        assert_eq!(rest.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(env.server.request_count("/api/documents/"), 3);
        assert_eq!(client.http_metrics().successful_responses, 3);
        env.shutdown().await;
        Ok(())
    }

    /// A lookup table spanning several pages is fetched completely
    #[tokio::test]
    #[test_log::test]
    async fn test_lookup_table_collects_all_pages() -> TestResult {
        let env = TestEnv::sample().await?;
        let client = PaperlessClient::new(ClientConfig {
            page_size: 1,
            ..ClientConfig::from(&env.settings())
        })?;
        let tags = client.lookup_table(RefCategory::Tag).await;
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.resolve(7)?, "Home");
        assert_eq!(env.server.request_count("/api/tags/"), 2);
        env.shutdown().await;
        Ok(())
    }

    /// HTTP 500 on page 2 of 3: only page 1 survives, nothing escapes
    #[tokio::test]
    #[test_log::test]
    async fn test_server_error_ends_fetch_early() -> TestResult {
        let env = TestEnv::sample().await?;
        env.server.fail_page("/api/documents/", 2, 500);
        let plugin = env.plugin(Settings {
            page_size: 1,
            ..env.settings()
        })?;

        let snapshot = plugin.refresh().await?;
        assert_eq!(snapshot_ids(&snapshot), vec![1]);
        // no retry, and page 3 is never requested
        assert_eq!(env.server.request_count("/api/documents/"), 2);
        assert_eq!(plugin.http_metrics().errors, 1);
        env.shutdown().await;
        Ok(())
    }

    /// An unreachable server yields an empty snapshot instead of an error
    #[tokio::test]
    #[test_log::test]
    async fn test_connection_failure_is_absorbed() -> TestResult {
        let env = TestEnv::sample().await?;
        let settings = env.settings();
        env.shutdown().await;

        let tmp = tempfile::tempdir()?;
        let plugin = PaperlessSearch::new(settings, tmp.path())?;
        let snapshot = plugin.refresh().await?;
        assert!(snapshot.is_published());
        assert!(snapshot.is_empty());
        let items = plugin
            .handle_trigger_query(&TextQuery::new("invoice"))
            .await;
        assert!(items.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod auth {
    use paperless_search::{
        mock::{MOCK_PASSWORD, MOCK_USERNAME},
        prelude::*,
    };

    use crate::common::*;

    #[tokio::test]
    #[test_log::test]
    async fn test_token_auth() -> TestResult {
        let env = TestEnv::sample().await?;
        env.server.require_auth(true);
        let plugin = env.plugin(env.settings())?;
        assert_eq!(plugin.refresh().await?.len(), 3);
        env.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_basic_auth() -> TestResult {
        let env = TestEnv::sample().await?;
        env.server.require_auth(true);
        let plugin = env.plugin(Settings {
            api_token: Secret::default(),
            username: MOCK_USERNAME.to_string(),
            password: Secret::new(MOCK_PASSWORD),
            ..env.settings()
        })?;
        assert_eq!(plugin.refresh().await?.len(), 3);
        env.shutdown().await;
        Ok(())
    }

    /// Rejected credentials are logged and produce an empty result, not an error
    #[tokio::test]
    #[test_log::test]
    async fn test_bad_token_yields_empty_snapshot() -> TestResult {
        let env = TestEnv::sample().await?;
        env.server.require_auth(true);
        let plugin = env.plugin(Settings {
            api_token: Secret::new("wrong"),
            ..env.settings()
        })?;
        let snapshot = plugin.refresh().await?;
        assert!(snapshot.is_empty());
        assert!(plugin.http_metrics().errors >= 1);

        // an explicit download reports the failure
        let client = PaperlessClient::new(ClientConfig {
            credentials: Credentials::Token(Secret::new("wrong")),
            ..ClientConfig::from(&env.settings())
        })?;
        let err = client
            .download(1, env.download_dir.path())
            .await
            .expect_err("unauthorized");
        assert!(err.is_auth_failure());
        env.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod enrichment {
    use paperless_search::prelude::*;

    use crate::common::*;

    /// The reference scenario: Invoice tagged Finance, typed Bill, no correspondent
    #[tokio::test]
    #[test_log::test]
    async fn test_invoice_scenario() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        plugin.refresh().await?;

        let items = plugin.handle_trigger_query(&TextQuery::new("financ")).await;
        assert!(titles(&items).contains(&"Invoice".to_string()));
        let invoice = items
            .iter()
            .find(|item| item.text == "Invoice")
            .expect("invoice item");
        assert_eq!(invoice.subtext, "Bill - No Correspondent - Finance");
        assert_eq!(invoice.actions.len(), 4);

        let none = plugin
            .handle_trigger_query(&TextQuery::new("no-correspondent-data"))
            .await;
        assert!(none.is_empty());
        env.shutdown().await;
        Ok(())
    }

    /// Matching ignores case in both the query and the document fields
    #[tokio::test]
    #[test_log::test]
    async fn test_matching_is_case_insensitive() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        plugin.refresh().await?;
        let items = plugin
            .handle_trigger_query(&TextQuery::new("ACME property"))
            .await;
        assert_eq!(titles(&items), vec!["Lease agreement"]);
        env.shutdown().await;
        Ok(())
    }

    /// Disabling a category removes it from the filter string but not from the
    /// subtitle; re-enabling restores it
    #[tokio::test]
    #[test_log::test]
    async fn test_filter_toggles() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        plugin.refresh().await?;
        let finance = TextQuery::new("finance");
        assert_eq!(
            titles(&plugin.handle_trigger_query(&finance).await),
            vec!["Invoice", "Dentist receipt"]
        );

        let mut settings = plugin.settings();
        settings.filters.tags = false;
        let change = plugin.apply_settings(settings.clone()).await?;
        assert!(change.filters);
        env.server.reset_counts();
        assert!(plugin.handle_trigger_query(&finance).await.is_empty());
        assert_eq!(env.server.request_count("/api/tags/"), 1);
        assert_eq!(env.server.request_count("/api/documents/"), 1);
        let items = plugin.handle_trigger_query(&TextQuery::new("invoice")).await;
        assert_eq!(items[0].subtext, "Bill - No Correspondent - Finance");

        settings.filters.tags = true;
        plugin.apply_settings(settings).await?;
        assert_eq!(plugin.handle_trigger_query(&finance).await.len(), 2);
        env.shutdown().await;
        Ok(())
    }

    /// Type names are shown in subtitles even when types are not searchable
    #[tokio::test]
    #[test_log::test]
    async fn test_subtitle_ignores_filter_toggles() -> TestResult {
        let env = TestEnv::sample().await?;
        let mut settings = env.settings();
        settings.filters.document_type = false;
        settings.filters.correspondent = false;
        let plugin = env.plugin(settings)?;

        let items = plugin.handle_trigger_query(&TextQuery::new("invoice")).await;
        assert_eq!(titles(&items), vec!["Invoice"]);
        assert_eq!(items[0].subtext, "Bill - No Correspondent - Finance");
        assert!(plugin.handle_trigger_query(&TextQuery::new("bill")).await.is_empty());
        env.shutdown().await;
        Ok(())
    }

    /// Searching by body only works when the body toggle is on
    #[tokio::test]
    #[test_log::test]
    async fn test_body_filter() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        let rental = TextQuery::new("rental");
        assert!(plugin.handle_trigger_query(&rental).await.is_empty());

        let mut settings = plugin.settings();
        settings.filters.body = true;
        plugin.apply_settings(settings).await?;
        assert_eq!(
            titles(&plugin.handle_trigger_query(&rental).await),
            vec!["Lease agreement"]
        );
        env.shutdown().await;
        Ok(())
    }

    /// Two refreshes of an unchanged archive produce identical documents
    #[tokio::test]
    #[test_log::test]
    async fn test_refresh_is_idempotent() -> TestResult {
        let env = TestEnv::sample().await?;
        let plugin = env.plugin(env.settings())?;
        let first = plugin.refresh().await?;
        let second = plugin.refresh().await?;
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!(first.documents, second.documents);
        env.shutdown().await;
        Ok(())
    }

    /// A reference missing from its lookup table keeps the document
    #[tokio::test]
    #[test_log::test]
    async fn test_dangling_references() -> TestResult {
        let env = TestEnv::sample().await?;
        env.server.update_data(|data| {
            data.document_types.clear();
            data.tags.retain(|t| t.id != 7);
        });
        let plugin = env.plugin(env.settings())?;
        let snapshot = plugin.refresh().await?;
        assert_eq!(snapshot.len(), 3);
        let receipt = snapshot
            .documents
            .iter()
            .find(|d| d.document.id == 3)
            .expect("receipt");
        assert_eq!(receipt.document.tags.as_deref(), Some("Finance,<tag-7>"));
        let invoice = snapshot
            .documents
            .iter()
            .find(|d| d.document.id == 1)
            .expect("invoice");
        assert_eq!(invoice.document.document_type, None);
        assert_eq!(
            invoice.document.subtitle(),
            "No type - No Correspondent - Finance"
        );
        env.shutdown().await;
        Ok(())
    }
}
