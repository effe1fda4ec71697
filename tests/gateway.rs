use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use redis_key_browser::{with_connection, BrowseError, Connector, EndpointConfig};

/// Hands out a fake handle and counts opens and releases.
#[derive(Default)]
struct CountingConnector {
    opened: AtomicUsize,
    released: AtomicUsize,
    fail_open: bool,
    fail_release: bool,
}

#[derive(Clone)]
struct FakeConn {
    id: usize,
}

impl Connector for CountingConnector {
    type Conn = FakeConn;

    fn open(
        &self,
        _endpoint: &EndpointConfig,
    ) -> impl std::future::Future<Output = Result<FakeConn, BrowseError>> + Send {
        let result = if self.fail_open {
            Err(BrowseError::Other("connect ECONNREFUSED 127.0.0.1:1".to_string()))
        } else {
            let id = self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeConn { id })
        };
        async move { result }
    }

    fn release(&self, _conn: FakeConn) -> Result<(), BrowseError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(BrowseError::Other("socket already closed".to_string()));
        }
        Ok(())
    }
}

fn endpoint() -> EndpointConfig {
    EndpointConfig::new("127.0.0.1", 6379)
}

#[tokio::test]
async fn releases_after_success() {
    let connector = CountingConnector::default();
    let id = with_connection(&connector, &endpoint(), |conn| async move {
        Ok::<_, BrowseError>(conn.id)
    })
    .await
    .expect("operation should succeed");

    assert_eq!(id, 0);
    assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    assert_eq!(connector.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn releases_once_when_operation_fails() {
    let connector = CountingConnector::default();
    let result: Result<(), _> = with_connection(&connector, &endpoint(), |_conn| async move {
        Err(BrowseError::Other("boom".to_string()))
    })
    .await;

    assert_eq!(result.unwrap_err().to_string(), "boom");
    assert_eq!(connector.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn release_errors_are_swallowed() {
    let connector = CountingConnector {
        fail_release: true,
        ..Default::default()
    };
    let value = with_connection(&connector, &endpoint(), |_conn| async move {
        Ok::<_, BrowseError>(7)
    })
    .await
    .expect("release failure must not fail the operation");

    assert_eq!(value, 7);
    assert_eq!(connector.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn open_failure_propagates_without_release() {
    let connector = CountingConnector {
        fail_open: true,
        ..Default::default()
    };
    let mut ran = false;
    let result: Result<(), _> = with_connection(&connector, &endpoint(), |_conn| {
        ran = true;
        async move { Ok(()) }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.classify().code.code(), "CONNECTION_REFUSED");
    assert!(!ran);
    assert_eq!(connector.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn releases_when_caller_abandons_operation() {
    let connector = CountingConnector::default();
    let endpoint = endpoint();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        with_connection(&connector, &endpoint, |_conn| async move {
            std::future::pending::<()>().await;
            Ok::<_, BrowseError>(())
        }),
    )
    .await;

    assert!(abandoned.is_err(), "operation should have been cut off");
    assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
    assert_eq!(connector.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn each_call_gets_its_own_connection() {
    let connector = CountingConnector::default();
    for expected in 0..3 {
        let id = with_connection(&connector, &endpoint(), |conn| async move {
            Ok::<_, BrowseError>(conn.id)
        })
        .await
        .unwrap();
        assert_eq!(id, expected);
    }
    assert_eq!(connector.opened.load(Ordering::SeqCst), 3);
    assert_eq!(connector.released.load(Ordering::SeqCst), 3);
}
