use sqlx::PgPool;

use resq_backend::billing::SubscriptionUpsert;
use resq_backend::contacts::{ContactInsertOutcome, NewContact};
use resq_backend::db::{create_account_with_profile, delete_account, Stores};
use resq_backend::entitlements::Plan;

fn contact(phone: &str) -> NewContact {
    NewContact {
        name: "Kin".into(),
        phone_number: phone.into(),
        relationship: Some("sibling".into()),
    }
}

// key: postgres-tests -> account factory, contact ceiling, subscription upsert
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn registration_creates_profile_with_token(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let (account, profile) = create_account_with_profile(&pool, "owner@example.com", "hashed")
        .await
        .unwrap();
    let stores = Stores::postgres(pool.clone());
    let stored = stores
        .profiles
        .profile_by_token(profile.public_token)
        .await
        .unwrap()
        .expect("profile stored");
    assert_eq!(stored.user_id, account.id);
    assert_eq!(stored.plan_tier, Plan::None);
    assert_eq!(stored.version, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn contact_insert_respects_limit_and_uniqueness(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let (account, _) = create_account_with_profile(&pool, "owner@example.com", "hashed")
        .await
        .unwrap();
    let stores = Stores::postgres(pool.clone());

    let first = stores
        .contacts
        .insert_within_limit(account.id, &contact("+15550000001"), 2)
        .await
        .unwrap();
    assert!(matches!(first, ContactInsertOutcome::Inserted(_)));

    let duplicate = stores
        .contacts
        .insert_within_limit(account.id, &contact("+15550000001"), 2)
        .await
        .unwrap();
    assert_eq!(duplicate, ContactInsertOutcome::Duplicate);

    stores
        .contacts
        .insert_within_limit(account.id, &contact("+15550000002"), 2)
        .await
        .unwrap();
    let over = stores
        .contacts
        .insert_within_limit(account.id, &contact("+15550000003"), 2)
        .await
        .unwrap();
    assert_eq!(over, ContactInsertOutcome::LimitReached { existing: 2 });
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn profile_writes_are_version_guarded(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let (account, _) = create_account_with_profile(&pool, "owner@example.com", "hashed")
        .await
        .unwrap();
    let stores = Stores::postgres(pool.clone());

    let mut profile = stores
        .profiles
        .profile_for_user(account.id)
        .await
        .unwrap()
        .unwrap();
    profile.payment_method_on_file = true;
    assert!(stores.profiles.update_profile(&profile).await.unwrap());
    // Same stale version again loses.
    assert!(!stores.profiles.update_profile(&profile).await.unwrap());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn subscription_upsert_is_keyed_by_customer(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let (account, _) = create_account_with_profile(&pool, "owner@example.com", "hashed")
        .await
        .unwrap();
    let stores = Stores::postgres(pool.clone());

    let mut upsert = SubscriptionUpsert {
        user_id: account.id,
        contact_email: Some("owner@example.com".into()),
        external_customer_ref: "cus_123".into(),
        external_subscription_ref: "sub_123".into(),
        plan: Plan::Basic,
        status: "active".into(),
        licensed_line_item_ref: "si_1".into(),
        metered_line_item_ref: None,
    };
    let first = stores
        .subscriptions
        .upsert_subscription(&upsert)
        .await
        .unwrap();
    upsert.plan = Plan::Premium;
    upsert.contact_email = None;
    let second = stores
        .subscriptions
        .upsert_subscription(&upsert)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.plan, Plan::Premium);
    assert_eq!(second.contact_email.as_deref(), Some("owner@example.com"));
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let active = stores
        .subscriptions
        .active_subscription(account.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.plan, Plan::Premium);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn account_deletion_cascades_and_detaches_subscription(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let (account, profile) = create_account_with_profile(&pool, "owner@example.com", "hashed")
        .await
        .unwrap();
    let stores = Stores::postgres(pool.clone());
    stores
        .contacts
        .insert_within_limit(account.id, &contact("+15550000001"), 3)
        .await
        .unwrap();
    let subscription = stores
        .subscriptions
        .upsert_subscription(&SubscriptionUpsert {
            user_id: account.id,
            contact_email: None,
            external_customer_ref: "cus_123".into(),
            external_subscription_ref: "sub_123".into(),
            plan: Plan::Basic,
            status: "active".into(),
            licensed_line_item_ref: "si_1".into(),
            metered_line_item_ref: None,
        })
        .await
        .unwrap();

    assert!(delete_account(&pool, account.id).await.unwrap());
    assert!(!delete_account(&pool, account.id).await.unwrap());

    assert!(stores
        .profiles
        .profile_by_token(profile.public_token)
        .await
        .unwrap()
        .is_none());
    let contacts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(contacts, 0);
    let owner: Option<i32> = sqlx::query_scalar("SELECT user_id FROM subscriptions WHERE id = $1")
        .bind(subscription.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(owner, None);
}
