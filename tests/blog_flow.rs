use std::sync::Arc;
use std::time::Duration;

use statusblog::prelude::*;
use tokio::time::timeout;

const PASSWORD: &str = "correct horse";

async fn connect(store: &MemoryStore) -> StatusBlog {
    let options = ClientOptions::default().with_admin_password(PASSWORD);
    let blog = StatusBlog::connect(Arc::new(store.clone()), options)
        .await
        .expect("connect");
    blog.posts().ready().await.unwrap();
    blog.gauges().ready().await.unwrap();
    blog
}

async fn admin(store: &MemoryStore) -> StatusBlog {
    let blog = connect(store).await;
    blog.session().submit_password(PASSWORD).unwrap();
    blog
}

/// Guard against a missed notification hanging the test forever
async fn within<F: std::future::Future>(future: F) -> F::Output {
    timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out waiting for sync")
}

#[tokio::test]
async fn gauge_create_then_edit_round_trips_through_sync() {
    let store = MemoryStore::new();
    let mut blog = admin(&store).await;

    let id = blog
        .gauge_manager()
        .create_gauge("CPU", 75.0, GaugeType::Radial, vec!["#0f0".to_string()], Side::Left)
        .await
        .unwrap();

    let gauges = within(blog.gauges().wait_until(|g| g.len() == 1)).await.unwrap();
    let created = gauges[0].clone();
    assert_eq!(created.id, id);

    let columns = blog.gauge_columns();
    assert_eq!(columns.left.len(), 1);
    assert!(columns.right.is_empty());
    assert_eq!(columns.left[0].value, 75.0);

    blog.gauge_manager().open_editor(&created).unwrap();
    blog.gauge_manager().form_mut().set_value(30.0);
    blog.gauge_manager().update_gauge().await.unwrap();

    let gauges = within(blog.gauges().wait_until(|g| g.len() == 1 && g[0].value == 30.0))
        .await
        .unwrap();
    assert_eq!(gauges[0].id, created.id);
    assert_eq!(gauges[0].created_at, created.created_at);
    assert_eq!(gauges[0].colors, vec!["#0f0".to_string()]);
    assert_eq!(blog.gauge_columns().left[0].value, 30.0);

    blog.shutdown().await;
}

#[tokio::test]
async fn changing_side_moves_gauge_between_columns() {
    let store = MemoryStore::new();
    let mut blog = admin(&store).await;

    blog.gauge_manager()
        .create_gauge("Mem", 40.0, GaugeType::Semicircle, vec![], Side::Left)
        .await
        .unwrap();
    let gauges = within(blog.gauges().wait_until(|g| g.len() == 1)).await.unwrap();

    // saving without touching the side keeps the column
    blog.gauge_manager().open_editor(&gauges[0]).unwrap();
    blog.gauge_manager().form_mut().set_title("Memory");
    blog.gauge_manager().update_gauge().await.unwrap();
    within(blog.gauges().wait_until(|g| g[0].title == "Memory")).await.unwrap();
    assert_eq!(blog.gauge_columns().left.len(), 1);

    let current = blog.gauges().items()[0].clone();
    blog.gauge_manager().open_editor(&current).unwrap();
    blog.gauge_manager().form_mut().set_side(Side::Right);
    blog.gauge_manager().update_gauge().await.unwrap();
    within(blog.gauges().wait_until(|g| g[0].side == Side::Right)).await.unwrap();

    let columns = blog.gauge_columns();
    assert!(columns.left.is_empty());
    assert_eq!(columns.right[0].title, "Memory");
}

#[tokio::test]
async fn post_create_and_delete_round_trip() {
    let store = MemoryStore::new();
    let mut blog = admin(&store).await;

    blog.post_manager()
        .create_post("Earlier", "first", None)
        .await
        .unwrap();
    within(blog.posts().wait_until(|p| p.len() == 1)).await.unwrap();
    // createdAt has millisecond resolution
    tokio::time::sleep(Duration::from_millis(5)).await;

    let id = blog
        .post_manager()
        .create_post("Hi", "World", None)
        .await
        .unwrap();
    let posts = within(blog.posts().wait_until(|p| p.len() == 2)).await.unwrap();
    assert_eq!(posts[0].id, id);
    assert_eq!(posts[0].title, "Hi");
    assert_eq!(posts[0].text, "World");
    assert!(!posts[0].has_image());

    for post in posts.iter() {
        blog.post_manager().request_delete(post).unwrap();
        blog.post_manager().confirm_delete().await.unwrap();
    }
    within(blog.posts().wait_until(|p| p.is_empty())).await.unwrap();
}

#[tokio::test]
async fn visitors_cannot_change_anything() {
    let store = MemoryStore::new();
    let mut admin_blog = admin(&store).await;
    admin_blog
        .post_manager()
        .create_post("Hi", "World", None)
        .await
        .unwrap();
    admin_blog
        .gauge_manager()
        .create_gauge("CPU", 10.0, GaugeType::Radial, vec![], Side::Right)
        .await
        .unwrap();
    let mutations = store.mutation_count();

    let mut visitor = connect(&store).await;
    let posts = within(visitor.posts().wait_until(|p| p.len() == 1)).await.unwrap();
    let gauges = within(visitor.gauges().wait_until(|g| g.len() == 1)).await.unwrap();

    assert!(visitor.post_manager().request_delete(&posts[0]).is_err());
    visitor.post_manager().confirm_delete().await.unwrap();
    assert!(visitor.gauge_manager().request_delete(&gauges[0]).is_err());
    visitor.gauge_manager().confirm_delete().await.unwrap();
    assert!(visitor.gauge_manager().open_editor(&gauges[0]).is_err());

    assert_eq!(store.mutation_count(), mutations);
    assert_eq!(visitor.posts().items().len(), 1);
    assert_eq!(visitor.gauges().items().len(), 1);
}

#[tokio::test]
async fn wrong_password_keeps_visitor_locked_out() {
    let store = MemoryStore::new();
    let mut blog = connect(&store).await;

    blog.session().open_prompt();
    blog.session().set_candidate("Correct Horse");
    assert!(blog.session().submit().is_err());
    assert_eq!(
        blog.session().notice().map(|n| n.kind),
        Some(NoticeKind::Authentication)
    );

    let result = blog.post_manager().create_post("Hi", "World", None).await;
    assert!(matches!(result, Err(Error::Unauthorized)));
    assert_eq!(store.mutation_count(), 0);

    blog.session().set_candidate(PASSWORD);
    blog.session().submit().unwrap();
    assert!(blog.session().candidate().is_empty());
    blog.post_manager()
        .create_post("Hi", "World", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn shutdown_releases_both_subscriptions() {
    let store = MemoryStore::new();
    let blog = connect(&store).await;
    assert_eq!(store.listener_count("posts"), 1);
    assert_eq!(store.listener_count("gauges"), 1);

    blog.shutdown().await;

    assert_eq!(store.listener_count("posts"), 0);
    assert_eq!(store.listener_count("gauges"), 0);
}

#[tokio::test]
async fn dropped_subscription_flags_stale_data() {
    let store = MemoryStore::new();
    let blog = connect(&store).await;
    assert!(!blog.is_stale());

    store.disconnect("gauges");
    let mut state = blog.gauges().watch_state();
    within(state.wait_for(|s| s.is_stale())).await.unwrap();

    assert!(blog.is_stale());
    assert_eq!(blog.posts().state(), SyncState::Live);
}
