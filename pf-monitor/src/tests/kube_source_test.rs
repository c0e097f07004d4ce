use std::time::Duration;

use assertables::*;
use httpmock::prelude::*;

use super::*;

#[rstest]
#[tokio::test]
async fn test_list() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle_pod_list(
            TEST_NAMESPACE,
            pod_list_json(vec![pod_json("pod1", "10.0.0.1", "40"), pod_json("pod2", "", "41")], TEST_LIST_VERSION),
        )
        .build();

    let source = KubePodSource::new(client);
    let listing = source.list(TEST_NAMESPACE, TEST_SELECTOR).await.unwrap();

    assert_eq!(
        listing,
        PodListing::new(vec![PodSnapshot::new("pod1", "10.0.0.1"), PodSnapshot::new("pod2", "")], TEST_LIST_VERSION)
    );
    fake_apiserver.assert();
}

#[rstest]
#[tokio::test]
async fn test_list_passes_selector() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle(|when, then| {
            when.path(pods_path(TEST_NAMESPACE)).method(GET).query_param("labelSelector", "app=busybox,tier=web");
            then.json_body(pod_list_json(vec![], TEST_LIST_VERSION));
        })
        .build();

    let source = KubePodSource::new(client);
    let listing = source.list(TEST_NAMESPACE, "app=busybox,tier=web").await.unwrap();

    assert_is_empty!(listing.items);
    fake_apiserver.assert();
}

#[rstest]
#[tokio::test]
async fn test_list_forbidden() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle_status(pods_path(TEST_NAMESPACE), status_forbidden()).build();

    let source = KubePodSource::new(client);
    assert_err!(source.list(TEST_NAMESPACE, TEST_SELECTOR).await);
}

#[rstest]
#[tokio::test]
async fn test_subscribe() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle_pod_watch(
            TEST_NAMESPACE,
            watch_body(vec![
                ("ADDED", pod_json("pod1", "", "43")),
                ("MODIFIED", pod_json("pod1", "10.0.0.1", "44")),
                ("DELETED", pod_json("pod1", "10.0.0.1", "45")),
            ]),
        )
        .build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(vec![], TEST_LIST_VERSION);
    let stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();
    let notifications: Vec<_> = stream.take(3).collect().await;

    assert_eq!(notifications, vec![added("pod1", ""), modified("pod1", "10.0.0.1"), deleted("pod1", "10.0.0.1")]);
}

#[rstest]
#[tokio::test]
async fn test_subscribe_reopens_from_last_version() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle(|when, then| {
            when.path(pods_path(TEST_NAMESPACE))
                .method(GET)
                .query_param("watch", "true")
                .query_param("resourceVersion", "50");
            then.status(200)
                .header("content-type", "application/json")
                .body(watch_body(vec![("MODIFIED", pod_json("pod1", "10.0.0.2", "51"))]));
        })
        .handle_pod_watch(
            TEST_NAMESPACE,
            watch_body(vec![
                ("ADDED", pod_json("pod1", "10.0.0.1", "49")),
                ("BOOKMARK", watch_bookmark_json("50")),
            ]),
        )
        .build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(vec![], TEST_LIST_VERSION);
    let stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();
    let notifications: Vec<_> = stream.take(3).collect().await;

    assert_eq!(
        notifications,
        vec![added("pod1", "10.0.0.1"), Notification::bookmark(), modified("pod1", "10.0.0.2")]
    );
}

#[rstest]
#[tokio::test]
async fn test_subscribe_error_event_ends_stream() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle_pod_watch(
            TEST_NAMESPACE,
            watch_body(vec![("ADDED", pod_json("pod1", "10.0.0.1", "43")), ("ERROR", status_forbidden())]),
        )
        .build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(vec![], TEST_LIST_VERSION);
    let stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();
    let notifications: Vec<_> = stream.collect().await;

    assert_eq!(notifications, vec![added("pod1", "10.0.0.1"), Notification::error()]);
}

#[rstest]
#[tokio::test]
async fn test_monitor_against_apiserver() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle_pod_watch(
            TEST_NAMESPACE,
            watch_body(vec![
                ("MODIFIED", pod_json("pod2", "10.0.0.2", "43")),
                ("DELETED", pod_json("pod1", "10.0.0.1", "44")),
                ("ERROR", status_forbidden()),
            ]),
        )
        .handle_pod_list(
            TEST_NAMESPACE,
            pod_list_json(vec![pod_json("pod1", "10.0.0.1", "40"), pod_json("pod2", "", "41")], TEST_LIST_VERSION),
        )
        .build();

    let config = MonitorConfig::new(TEST_NAMESPACE, TEST_SELECTOR.parse().unwrap());
    let mut monitor = Monitor::new(Box::new(KubePodSource::new(client)), config).unwrap();
    let rx = monitor.events();
    let handle = monitor.start(CancellationToken::new()).await.unwrap();

    assert_eq!(
        collect(rx).await,
        vec![
            PodEvent::upsert("pod1", "10.0.0.1"),
            PodEvent::upsert("pod2", "10.0.0.2"),
            PodEvent::removed("pod1"),
        ]
    );
    handle.wait().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_subscribe_rejected() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle_pod_watch_status(TEST_NAMESPACE, status_forbidden()).build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(vec![], TEST_LIST_VERSION);
    let err = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.err().unwrap();

    assert_contains!(err.to_string(), "forbidden");
    assert_eq!(fake_apiserver.calls(0), 1);
}

#[rstest]
#[tokio::test]
async fn test_monitor_start_fails_when_watch_rejected() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle_pod_watch_status(TEST_NAMESPACE, status_forbidden())
        .handle_pod_list(TEST_NAMESPACE, pod_list_json(vec![pod_json("pod1", "10.0.0.1", "40")], TEST_LIST_VERSION))
        .build();

    let config = MonitorConfig::new(TEST_NAMESPACE, TEST_SELECTOR.parse().unwrap());
    let mut monitor = Monitor::new(Box::new(KubePodSource::new(client)), config).unwrap();
    let mut rx = monitor.events();
    let err = monitor.start(CancellationToken::new()).await.err().unwrap();

    assert!(matches!(err.downcast_ref::<MonitorError>(), Some(MonitorError::SubscribeFailed(_))));
    assert_none!(rx.recv().await);
}

#[rstest]
#[tokio::test]
async fn test_closed_watch_reopens_with_backoff() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle_pod_watch(TEST_NAMESPACE, String::new()).build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(vec![], TEST_LIST_VERSION);
    let mut stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();

    // The apiserver keeps closing the watch without sending anything; the source keeps waiting
    assert_err!(tokio::time::timeout(Duration::from_millis(500), stream.next()).await);
    assert_le!(fake_apiserver.calls(0), 2);
}

#[rstest]
#[tokio::test]
async fn test_expired_version_relists() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle(|when, then| {
            when.path(pods_path(TEST_NAMESPACE))
                .method(GET)
                .query_param("watch", "true")
                .query_param("resourceVersion", TEST_LIST_VERSION);
            then.status(200)
                .header("content-type", "application/json")
                .body(watch_body(vec![("ADDED", pod_json("pod3", "", "43")), ("ERROR", status_expired())]));
        })
        .handle(|when, then| {
            when.path(pods_path(TEST_NAMESPACE))
                .method(GET)
                .query_param("watch", "true")
                .query_param("resourceVersion", "60");
            then.status(200)
                .header("content-type", "application/json")
                .body(watch_body(vec![("MODIFIED", pod_json("pod1", "10.0.0.9", "61"))]));
        })
        .handle_pod_list(
            TEST_NAMESPACE,
            pod_list_json(vec![pod_json("pod1", "10.0.0.1", "40"), pod_json("pod3", "10.0.0.3", "55")], "60"),
        )
        .build();

    let source = KubePodSource::new(client);
    let listing = PodListing::new(
        vec![PodSnapshot::new("pod1", "10.0.0.1"), PodSnapshot::new("pod2", "10.0.0.2")],
        TEST_LIST_VERSION,
    );
    let stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();
    let notifications: Vec<_> = stream.take(4).collect().await;

    // pod1 didn't change while the watch was down, so the relist only reports pod3 and pod2
    assert_eq!(
        notifications,
        vec![
            added("pod3", ""),
            modified("pod3", "10.0.0.3"),
            deleted("pod2", ""),
            modified("pod1", "10.0.0.9"),
        ]
    );
    assert_eq!(fake_apiserver.calls(2), 1);
}

#[rstest]
#[tokio::test]
async fn test_listing_without_version_watches_from_default() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver
        .handle(|when, then| {
            when.path(pods_path(TEST_NAMESPACE))
                .method(GET)
                .query_param("watch", "true")
                .query_param("resourceVersion", DEFAULT_WATCH_VERSION);
            then.status(200)
                .header("content-type", "application/json")
                .body(watch_body(vec![("ADDED", pod_json("pod1", "10.0.0.1", "43"))]));
        })
        .build();

    let source = KubePodSource::new(client);
    let listing = PodListing { items: vec![], resource_version: None };
    let mut stream = source.subscribe(TEST_NAMESPACE, TEST_SELECTOR, &listing).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap();

    assert_eq!(first, Some(added("pod1", "10.0.0.1")));
}

#[rstest]
#[tokio::test]
async fn test_build_tls_client() {
    // An https endpoint makes kube set up rustls, which needs a crypto provider compiled in
    let config = kube::Config::new("https://127.0.0.1:6443".parse().unwrap());
    let client = kube::Client::try_from(config).unwrap();

    assert_eq!(client.default_namespace(), "default");
}
