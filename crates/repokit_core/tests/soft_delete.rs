use repokit_core::db::open_db_in_memory;
use repokit_core::model::entity::uuid_to_value;
use repokit_core::{
    attrs, create_application_table, Application, Condition, Filter, RepoError,
    RepositoryFactory, Session, SoftDeleteRepository, SqliteSession, Value,
};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    create_application_table(&conn).unwrap();
    conn
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn by_id(application: &Application) -> Filter {
    Filter::by(Application::ID, uuid_to_value(application.id))
}

fn soft<'s, 'c>(
    factory: &RepositoryFactory<'s, SqliteSession<'c>>,
) -> SoftDeleteRepository<'s, Application, SqliteSession<'c>> {
    factory.soft_delete::<Application>(Application::DELETED_AT)
}

#[test]
fn application_lifecycle_with_soft_delete() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = factory.soft_delete::<Application>(Application::DELETED_AT);

    let mut created = Application::new("+10000000000", "a@example.com", "hi");
    repo.save(&mut created).unwrap();
    assert!(created.id.is_some());
    assert!(created.created_at.is_some());
    assert!(created.updated_at.is_none());
    assert!(created.deleted_at.is_none());

    let found = repo.find_one_or_fail(&by_id(&created)).unwrap();
    assert_eq!(found, created);

    assert_eq!(repo.delete(&by_id(&created)).unwrap(), 1);

    let err = repo.find_one_or_fail(&by_id(&created)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    let raw = repo.with_deleted().find_one_or_fail(&by_id(&created)).unwrap();
    assert_eq!(raw.id, created.id);
    assert!(raw.deleted_at.is_some());
}

#[test]
fn pre_save_then_commit_matches_save() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut saved = Application::new("+10000000001", "a@example.com", "hi");
    repo.save(&mut saved).unwrap();

    let mut staged = Application::new("+10000000002", "b@example.com", "hi");
    repo.pre_save(&mut staged).unwrap();
    session.commit().unwrap();

    for application in [&saved, &staged] {
        let stored = repo.find_one_or_fail(&by_id(application)).unwrap();
        assert_eq!(&stored, application);
    }
    assert!(!session.in_transaction());
}

#[test]
fn reads_and_counts_only_see_live_rows() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut apps = vec![
        Application::new("+10000000001", "a@example.com", "hi"),
        Application::new("+10000000002", "b@example.com", "hi"),
        Application::new("+10000000003", "c@example.com", "hi"),
    ];
    repo.save(&mut apps).unwrap();
    repo.delete(&Filter::by(Application::EMAIL, text("b@example.com")))
        .unwrap();

    assert_eq!(repo.count(&Filter::all()).unwrap(), 2);
    assert_eq!(repo.find(&Filter::all()).unwrap().len(), 2);
    assert_eq!(repo.with_deleted().count(&Filter::all()).unwrap(), 3);

    let hidden = Filter::by(Application::EMAIL, text("b@example.com"));
    assert!(repo.find_one(&hidden).unwrap().is_none());
    assert_eq!(repo.count(&hidden).unwrap(), 0);
}

#[test]
fn scope_condition_comes_first() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let scoped = repo.scope(&Filter::new().and(Condition::eq(Application::TEXT, text("hi"))));
    assert_eq!(scoped.conditions().len(), 2);
    assert_eq!(scoped.conditions()[0].column(), Some(Application::DELETED_AT));
    assert_eq!(repo.column(), Application::DELETED_AT);
}

#[test]
fn second_delete_keeps_the_original_stamp() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut app = Application::new("+10000000001", "a@example.com", "hi");
    repo.save(&mut app).unwrap();
    conn.execute(
        "UPDATE application SET deleted_at = 1 WHERE email = 'a@example.com'",
        [],
    )
    .unwrap();

    assert_eq!(repo.delete(&by_id(&app)).unwrap(), 0);
    let raw = repo.with_deleted().find_one_or_fail(&by_id(&app)).unwrap();
    assert_eq!(raw.deleted_at, Some(1));
}

#[test]
fn update_skips_deleted_rows() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut apps = vec![
        Application::new("+10000000001", "a@example.com", "hi"),
        Application::new("+10000000002", "b@example.com", "hi"),
    ];
    repo.save(&mut apps).unwrap();
    repo.delete(&by_id(&apps[0])).unwrap();

    let changed = repo
        .update(&Filter::all(), attrs([(Application::TEXT, text("bye"))]))
        .unwrap();
    assert_eq!(changed, 1);

    let deleted = repo.with_deleted().find_one_or_fail(&by_id(&apps[0])).unwrap();
    assert_eq!(deleted.text, "hi");
}

#[test]
fn restore_brings_rows_back() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut app = Application::new("+10000000001", "a@example.com", "hi");
    repo.save(&mut app).unwrap();
    repo.delete(&by_id(&app)).unwrap();

    assert_eq!(repo.restore(&by_id(&app)).unwrap(), 1);
    assert_eq!(repo.restore(&by_id(&app)).unwrap(), 0);

    let live = repo.find_one_or_fail(&by_id(&app)).unwrap();
    assert!(!live.is_deleted());
}

#[test]
fn force_delete_removes_live_and_stamped_rows() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut apps = vec![
        Application::new("+10000000001", "a@example.com", "hi"),
        Application::new("+10000000002", "b@example.com", "hi"),
    ];
    repo.save(&mut apps).unwrap();
    repo.delete(&by_id(&apps[0])).unwrap();

    assert_eq!(repo.force_delete(&Filter::all()).unwrap(), 2);
    assert_eq!(repo.with_deleted().count(&Filter::all()).unwrap(), 0);
}

#[test]
fn remove_is_physical_even_through_the_policy() {
    let conn = setup();
    let session = SqliteSession::new(&conn);
    let factory = RepositoryFactory::new(&session);
    let repo = soft(&factory);

    let mut app = Application::new("+10000000001", "a@example.com", "hi");
    repo.save(&mut app).unwrap();
    repo.remove(&app).unwrap();

    assert_eq!(repo.with_deleted().count(&Filter::all()).unwrap(), 0);
}
