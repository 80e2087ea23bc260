use super::*;

#[tokio::test]
async fn snapshots_arrive_in_order() {
    let (publisher, mut sub) = subscription();
    assert!(publisher.publish(1));
    assert!(publisher.publish(2));
    assert_eq!(sub.next().await, Some(1));
    assert_eq!(sub.next().await, Some(2));
}

#[tokio::test]
async fn dropping_subscription_releases_publisher() {
    let (publisher, sub) = subscription::<u32>();
    assert!(!publisher.is_released());
    drop(sub);
    publisher.released().await;
    assert!(publisher.is_released());
    assert!(!publisher.publish(3));
}

#[tokio::test]
async fn explicit_unsubscribe_releases_publisher() {
    let (publisher, sub) = subscription::<u32>();
    sub.unsubscribe();
    assert!(publisher.is_released());
}

#[tokio::test]
async fn producer_gone_ends_sequence() {
    let (publisher, mut sub) = subscription::<u32>();
    publisher.publish(7);
    drop(publisher);
    assert_eq!(sub.next().await, Some(7));
    assert_eq!(sub.next().await, None);
}

#[test]
fn latest_skips_stale_snapshots() {
    let (publisher, mut sub) = subscription();
    assert_eq!(sub.latest(), None);
    publisher.publish("a");
    publisher.publish("b");
    publisher.publish("c");
    assert_eq!(sub.latest(), Some("c"));
    assert_eq!(sub.latest(), None);
}
