mod common;

use common::{User, store};

#[tokio::test]
async fn inserts_flush_once_the_threshold_is_reached() {
    let store = store();
    let users = store.repository::<User>();
    let buffer = users.create_transaction_manager(3);

    buffer
        .stage_insert_or_update(User::new("u1", "u1@example.com", 1))
        .await
        .unwrap();
    buffer
        .stage_insert_or_update(User::new("u2", "u2@example.com", 2))
        .await
        .unwrap();
    assert_eq!(users.count(None).await.unwrap(), 0);
    assert_eq!(buffer.pending().await, 2);

    buffer
        .stage_insert_or_update(User::new("u3", "u3@example.com", 3))
        .await
        .unwrap();
    assert_eq!(users.count(None).await.unwrap(), 3);
    assert_eq!(buffer.pending().await, 0);
}

#[tokio::test]
async fn staged_updates_do_not_advance_the_trigger() {
    let store = store();
    let users = store.repository::<User>();

    let mut batch = vec![
        User::new("u1", "u1@example.com", 1),
        User::new("u2", "u2@example.com", 2),
    ];
    users.insert_or_update_multiple(&mut batch).await.unwrap();

    let buffer = users.create_transaction_manager(2);
    for user in &batch {
        let mut changed = user.clone();
        changed.age += 10;
        buffer.stage_insert_or_update(changed).await.unwrap();
    }

    // Two staged updates, threshold two, still no flush.
    assert_eq!(buffer.pending().await, 0);
    let stored = users.find_by_id(&batch[0].id).await.unwrap().unwrap();
    assert_eq!(stored.age, 1);
}

#[tokio::test]
async fn flushing_requires_a_staged_insert() {
    let store = store();
    let users = store.repository::<User>();

    let mut user = User::new("u1", "u1@example.com", 1);
    users.insert_or_update(&mut user).await.unwrap();

    let buffer = users.create_transaction_manager(1);

    // A deletion forces a flush attempt, but with no staged inserts the
    // buffer holds everything back.
    buffer.stage_delete(&user).await.unwrap();
    assert_eq!(users.count(None).await.unwrap(), 1);

    buffer.finish().await.unwrap();
    assert_eq!(users.count(None).await.unwrap(), 1);

    // The first staged insert releases the backlog, deletion included.
    buffer
        .stage_insert_or_update(User::new("u2", "u2@example.com", 2))
        .await
        .unwrap();
    assert_eq!(users.count(None).await.unwrap(), 1);
    assert!(users.find_by_id(&user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn later_updates_replace_earlier_ones() {
    let store = store();
    let users = store.repository::<User>();

    let mut user = User::new("u1", "u1@example.com", 1);
    users.insert_or_update(&mut user).await.unwrap();

    let buffer = users.create_transaction_manager(100);
    for age in [10, 20, 30] {
        let mut changed = user.clone();
        changed.age = age;
        buffer.stage_insert_or_update(changed).await.unwrap();
    }
    buffer
        .stage_insert_or_update(User::new("u2", "u2@example.com", 2))
        .await
        .unwrap();
    buffer.finish().await.unwrap();

    let stored = users.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.age, 30);
    assert_eq!(users.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn finish_flushes_below_the_threshold() {
    let store = store();
    let users = store.repository::<User>();
    let buffer = users.create_transaction_manager(50);

    buffer
        .stage_insert_or_update(User::new("u1", "u1@example.com", 1))
        .await
        .unwrap();
    assert_eq!(users.count(None).await.unwrap(), 0);

    buffer.finish().await.unwrap();
    assert_eq!(users.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn disabling_the_threshold_defers_to_forced_flushes() {
    let store = store();
    let users = store.repository::<User>();
    let buffer = users.create_transaction_manager(1);
    buffer.disable_threshold();

    for n in 0..5 {
        buffer
            .stage_insert_or_update(User::new("u", &format!("u{n}@example.com"), n))
            .await
            .unwrap();
    }
    assert_eq!(users.count(None).await.unwrap(), 0);

    buffer.finish().await.unwrap();
    assert_eq!(users.count(None).await.unwrap(), 5);
}

#[tokio::test]
async fn a_delete_forces_a_flush_when_inserts_are_staged() {
    let store = store();
    let users = store.repository::<User>();

    let mut user = User::new("gone", "gone@example.com", 9);
    users.insert_or_update(&mut user).await.unwrap();

    let buffer = users.create_transaction_manager(2);
    buffer.disable_threshold();
    buffer
        .stage_insert_or_update(User::new("kept", "kept@example.com", 1))
        .await
        .unwrap();
    buffer.stage_delete(&user).await.unwrap();

    // stage_delete flushes regardless of the threshold setting.
    assert_eq!(users.count(None).await.unwrap(), 1);
    assert!(users.find_by_id(&user.id).await.unwrap().is_none());
}
