use pglogin::harness::run;
use pglogin::scenario::{oversized_pool, small_pool};
use pglogin::settings;
use serial_test::serial;

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL server"]
async fn test_max_connections() {
    run(settings().unwrap(), |settings| async move {
        oversized_pool(&settings).await;
    })
    .await
    .unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL server"]
async fn test_several_connections() {
    run(settings().unwrap(), |settings| async move {
        small_pool(&settings).await;
    })
    .await
    .unwrap();
}
