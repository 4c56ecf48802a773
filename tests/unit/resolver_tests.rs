/*!
 * Tests for the shared dependency store and the resolver
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use wikigloss::dependencies::DependencyRecord;
use wikigloss::{DependencyName, DependencyResolver, DependencyStatus, DependencyStore, MockFetcher};

fn resolver(store: DependencyStore, fetcher: Arc<MockFetcher>) -> DependencyResolver {
    DependencyResolver::new(store, fetcher, Duration::from_secs(5))
}

/// Test that concurrent resolutions share one fetch per name
#[tokio::test]
async fn test_resolve_withConcurrentCallers_shouldFetchOnce() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:lb", "{{#invoke:labels|show}}")
            .with_body("Module:labels", "return {}")
            .with_delay(Duration::from_millis(30)),
    );
    let store = DependencyStore::new();
    let first = resolver(store.clone(), fetcher.clone());
    let second = resolver(store.clone(), fetcher.clone());

    let (a, b) = tokio::join!(
        first.resolve("{{lb|en|transitive}} To carry."),
        second.resolve("{{lb|en|informal}} To nick.")
    );

    assert!(a.resolved);
    assert!(b.resolved);
    assert_eq!(fetcher.calls(&DependencyName::template("lb")), 1);
    assert_eq!(fetcher.calls(&DependencyName::module("labels")), 1);
    assert_eq!(store.fetch_count(), 2);
}

/// Test that many definitions using the same template cause a single fetch
#[tokio::test]
async fn test_resolve_withManyConcurrentDefinitions_shouldFetchOnce() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:q", "text")
            .with_delay(Duration::from_millis(10)),
    );
    let resolver = resolver(DependencyStore::new(), fetcher.clone());

    let results = futures::future::join_all((0..20).map(|i| {
        let resolver = resolver.clone();
        async move { resolver.resolve(&format!("{{{{q|sense {}}}}}", i)).await }
    }))
    .await;

    assert!(results.iter().all(|r| r.resolved));
    assert_eq!(fetcher.total_calls(), 1);
}

/// Test that a page the source does not have is never fetched again
#[tokio::test]
async fn test_resolve_withNotFound_shouldConfirmMissingOnce() {
    let fetcher = Arc::new(MockFetcher::new());
    let resolver = resolver(DependencyStore::new(), fetcher.clone());
    let name = DependencyName::template("nope");

    let first = resolver.resolve("{{nope|x}}").await;
    let second = resolver.resolve("{{nope|y}}").await;

    assert!(!first.resolved);
    assert!(!first.is_retryable());
    assert!(first.confirmed_missing.contains(&name));
    assert_eq!(second, first);
    assert_eq!(resolver.store().status(&name), Some(DependencyStatus::ConfirmedMissing));
    assert_eq!(fetcher.calls(&name), 1);
}

/// Test that a transient failure leaves the name pending and fetchable
#[tokio::test]
async fn test_resolve_withTransientFailure_shouldFetchAgainLater() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:q", "text")
            .failing_times("Template:q", 1),
    );
    let resolver = resolver(DependencyStore::new(), fetcher.clone());
    let name = DependencyName::template("q");

    let first = resolver.resolve("{{q|rare}}").await;

    assert!(!first.resolved);
    assert!(first.is_retryable());
    assert_eq!(resolver.store().status(&name), Some(DependencyStatus::Pending));
    assert_eq!(resolver.store().transient_failures().len(), 1);

    let second = resolver.resolve_names(first.missing).await;

    assert!(second.resolved);
    assert_eq!(fetcher.calls(&name), 2);
    let record = resolver.store().get(&name).unwrap();
    assert_eq!(record.status, DependencyStatus::Fetched);
    assert_eq!(record.attempts, 2);
    assert_eq!(record.last_error, None);
}

/// Test that a slow fetch counts as a transient failure
#[tokio::test]
async fn test_resolve_withSlowFetcher_shouldTimeOutAsPending() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:q", "text")
            .with_delay(Duration::from_millis(500)),
    );
    let resolver = DependencyResolver::new(DependencyStore::new(), fetcher, Duration::from_millis(20));

    let result = resolver.resolve("{{q|rare}}").await;

    assert!(!result.resolved);
    assert!(result.missing.contains(&DependencyName::template("q")));
    assert_eq!(resolver.store().pending(), vec![DependencyName::template("q")]);
}

/// Test that records from an earlier run satisfy the resolver without fetching
#[tokio::test]
async fn test_resolve_withSeededStore_shouldNotFetch() {
    let store = DependencyStore::new();
    let added = store.seed(vec![
        DependencyRecord::fetched(DependencyName::template("lb"), "text".to_string()),
        DependencyRecord::confirmed_missing(DependencyName::template("gone")),
        DependencyRecord::pending(DependencyName::template("later")),
    ]);
    let fetcher = Arc::new(MockFetcher::always_failing());
    let resolver = resolver(store, fetcher.clone());

    let result = resolver.resolve("{{lb|en|rare}} {{gone|x}}").await;

    assert_eq!(added, 2);
    assert!(!result.resolved);
    assert!(!result.is_retryable());
    assert_eq!(
        result.confirmed_missing,
        BTreeSet::from([DependencyName::template("gone")])
    );
    assert_eq!(fetcher.total_calls(), 0);
}

/// Test that names differing only in first-letter case or underscores are one dependency
#[tokio::test]
async fn test_resolve_withTitleVariants_shouldShareRecord() {
    let fetcher = Arc::new(MockFetcher::new().with_body("Template:given name", "text"));
    let resolver = resolver(DependencyStore::new(), fetcher.clone());

    let result = resolver.resolve("{{given name|en|male}} {{Given_name|en|female}}").await;

    assert!(result.resolved);
    assert_eq!(result.required.len(), 1);
    assert_eq!(fetcher.total_calls(), 1);
    assert_eq!(resolver.store().len(), 1);
}

/// Test that plain text needs nothing
#[tokio::test]
async fn test_resolve_withoutInvocations_shouldResolveImmediately() {
    let fetcher = Arc::new(MockFetcher::always_failing());
    let resolver = resolver(DependencyStore::new(), fetcher.clone());

    let result = resolver.resolve("A [[cat]] &amp; a dog.").await;

    assert!(result.resolved);
    assert!(result.required.is_empty());
    assert_eq!(fetcher.total_calls(), 0);
}
