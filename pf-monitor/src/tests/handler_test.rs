use async_trait::async_trait;

use super::*;

#[derive(Default)]
struct RecordingHandler {
    calls: Vec<String>,
}

#[async_trait]
impl PodEventHandler for RecordingHandler {
    async fn on_start(&mut self, names: &[String]) {
        self.calls.push(format!("start {}", names.join(",")));
    }

    async fn on_upsert(&mut self, name: &str, address: &str) {
        self.calls.push(format!("upsert {name} {address}"));
    }

    async fn on_removed(&mut self, name: &str) {
        self.calls.push(format!("removed {name}"));
    }
}

#[rstest]
#[tokio::test]
async fn test_dispatch_until_closed() {
    let mut fanout = Fanout::new(10);
    let rx = fanout.subscribe();
    fanout.publish(PodEvent::upsert("pod1", "10.0.0.1")).await;
    fanout.publish(PodEvent::upsert("pod1", "10.0.0.2")).await;
    fanout.publish(PodEvent::removed("pod1")).await;
    drop(fanout);

    let mut handler = RecordingHandler::default();
    let count = dispatch(rx, &mut handler).await;

    assert_eq!(count, 3);
    assert_eq!(handler.calls, vec!["upsert pod1 10.0.0.1", "upsert pod1 10.0.0.2", "removed pod1"]);
}

#[rstest]
#[tokio::test]
async fn test_dispatch_from_monitor() {
    let mut source = MockPodSource::new();
    let _ = source.expect_list().returning(|_, _| {
        Ok(PodListing::new(
            vec![PodSnapshot::new("pod1", "10.0.0.1"), PodSnapshot::new("pod2", "")],
            TEST_LIST_VERSION,
        ))
    });
    let _ = source
        .expect_subscribe()
        .returning(|_, _, _| Ok(stream::iter(vec![deleted("pod1", "10.0.0.1")]).boxed()));

    let mut monitor = Monitor::new(Box::new(source), MonitorConfig::new(TEST_NAMESPACE, Selector::new())).unwrap();
    let rx = monitor.events();
    let handle = monitor.start(CancellationToken::new()).await.unwrap();

    let mut handler = RecordingHandler::default();
    handler.on_start(handle.listed_pods()).await;
    assert_eq!(dispatch(rx, &mut handler).await, 2);
    assert_eq!(handler.calls, vec!["start pod1,pod2", "upsert pod1 10.0.0.1", "removed pod1"]);
    handle.wait().await.unwrap();
}
