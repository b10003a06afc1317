use anyhow::Result;
use chrono::Utc;
use entity::{schools, teacher_assignments};
use platform_authz::{DecisionReason, Permission, PermissionContext, PermissionEngine, Role};
use platform_db::{DbPool, RosterStore, canonical_ids};
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, Schema, Set};
use uuid::Uuid;

async fn sqlite_pool() -> Result<DbPool> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let pool = Database::connect(options).await?;
    let backend = pool.get_database_backend();
    let schema = Schema::new(backend);
    pool.execute(backend.build(&schema.create_table_from_entity(schools::Entity)))
        .await?;
    pool.execute(backend.build(&schema.create_table_from_entity(teacher_assignments::Entity)))
        .await?;
    Ok(pool)
}

async fn seed_school(pool: &DbPool, slug: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    schools::ActiveModel {
        id: Set(id),
        slug: Set(slug.to_string()),
        name: Set(slug.to_uppercase()),
        created_at: Set(Utc::now().into()),
    }
    .insert(pool)
    .await?;
    Ok(id)
}

#[tokio::test]
async fn rosters_are_scoped_to_the_store_school() -> Result<()> {
    let pool = sqlite_pool().await?;
    let school_a = seed_school(&pool, "north").await?;
    let school_b = seed_school(&pool, "south").await?;
    let teacher = Uuid::new_v4();
    let (class_a, class_b, maths) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let store_a = RosterStore::new(pool.clone(), school_a);
    let store_b = RosterStore::new(pool.clone(), school_b);
    store_a.assign(teacher, class_a, Some(maths)).await?;
    store_b.assign(teacher, class_b, None).await?;

    let roster = store_a.roster_for(&teacher.to_string().into()).await?;
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].class_id.as_str(), class_a.to_string());
    assert_eq!(
        roster[0].subject_id.as_ref().map(|s| s.as_str().to_string()),
        Some(maths.to_string())
    );

    let roster = store_b.roster_for(&teacher.to_string().into()).await?;
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].subject_id, None);
    Ok(())
}

#[tokio::test]
async fn unknown_or_malformed_actors_get_empty_rosters() -> Result<()> {
    let pool = sqlite_pool().await?;
    let school = seed_school(&pool, "east").await?;
    let store = RosterStore::new(pool, school);

    assert!(store.roster_for(&"T1".into()).await?.is_empty());
    assert!(
        store
            .roster_for(&Uuid::new_v4().to_string().into())
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn stored_roster_drives_contextual_decisions() -> Result<()> {
    let pool = sqlite_pool().await?;
    let school = seed_school(&pool, "west").await?;
    let store = RosterStore::new(pool, school);
    let teacher = Uuid::new_v4();
    let class = Uuid::new_v4();
    store.assign(teacher, class, None).await?;

    let roster = store.roster_for(&teacher.to_string().into()).await?;
    let engine = PermissionEngine::standard();

    let own = PermissionContext::new()
        .actor(teacher.to_string())
        .class(class.to_string())
        .roster(roster.clone());
    let decision = engine.decide(Role::Teacher, Permission::MarkAttendance, Some(&own));
    assert_eq!(decision.reason, DecisionReason::GrantedContextual);

    let other = PermissionContext::new()
        .actor(teacher.to_string())
        .class(Uuid::new_v4().to_string())
        .roster(roster);
    let decision = engine.decide(Role::Teacher, Permission::MarkAttendance, Some(&other));
    assert_eq!(decision.reason, DecisionReason::ContextDenied);
    Ok(())
}

#[tokio::test]
async fn uppercase_ids_match_their_own_assignment() -> Result<()> {
    let pool = sqlite_pool().await?;
    let school = seed_school(&pool, "central").await?;
    let store = RosterStore::new(pool, school);
    let teacher = Uuid::new_v4();
    let class = Uuid::new_v4();
    let subject = Uuid::new_v4();
    store.assign(teacher, class, Some(subject)).await?;

    let actor = teacher.to_string().to_uppercase();
    let roster = store.roster_for(&actor.as_str().into()).await?;
    assert_eq!(roster.len(), 1);

    let raw = PermissionContext::new()
        .actor(actor)
        .class(class.to_string().to_uppercase())
        .subject(subject.simple().to_string())
        .roster(roster);
    let engine = PermissionEngine::standard();
    let decision = engine.decide(Role::Teacher, Permission::EditGrades, Some(&raw));
    assert_eq!(decision.reason, DecisionReason::ContextDenied);

    let ctx = canonical_ids(raw);
    assert_eq!(ctx.class_id.as_ref().map(|c| c.as_str().to_string()), Some(class.to_string()));
    let decision = engine.decide(Role::Teacher, Permission::EditGrades, Some(&ctx));
    assert_eq!(decision.reason, DecisionReason::GrantedContextual);
    Ok(())
}

#[test]
fn non_uuid_ids_are_left_alone() {
    let ctx = canonical_ids(PermissionContext::new().actor("T7").class("12"));
    assert_eq!(ctx.actor_id.map(|a| a.to_string()), Some("T7".to_string()));
    assert_eq!(ctx.class_id.map(|c| c.to_string()), Some("12".to_string()));
}
