use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use jobwatch_core::fingerprint::fingerprint;
use jobwatch_core::models::{DISCOVERED_NOTE, Fingerprint, JobRecord};
use jobwatch_core::status::JobStatus;
use jobwatch_core::traits::JobStore;
use jobwatch_core::AppError;
use jobwatch_db::JobRepository;

use crate::common::setup_test_db;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

fn record(title: &str, path: &str) -> JobRecord {
    JobRecord {
        title: title.into(),
        company: "Acme".into(),
        url: format!("https://acme.test/jobs/{path}"),
        location: Some("Remote".into()),
        department: None,
        employment_type: None,
    }
}

#[tokio::test]
async fn upsert_creates_then_refreshes() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let r = record("Support Specialist", "3");
    let fp = fingerprint(&r);

    let first = repo.upsert_seen(&r, &fp, t0()).await.unwrap();
    assert!(first.created);
    assert_eq!(first.entity.status, JobStatus::New);
    assert_eq!(first.entity.first_seen, t0());

    let mut revised = r.clone();
    revised.location = None;
    let later = t0() + TimeDelta::days(1);
    let second = repo.upsert_seen(&revised, &fp, later).await.unwrap();

    assert!(!second.created);
    assert_eq!(second.entity.first_seen, t0());
    assert_eq!(second.entity.last_updated, later);
    assert_eq!(second.entity.location, None);

    let history = repo.history(&fp).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, JobStatus::New);
    assert_eq!(history[0].notes.as_deref(), Some(DISCOVERED_NOTE));
}

#[tokio::test]
async fn reobservation_keeps_status() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let r = record("Support Specialist", "3");
    let fp = fingerprint(&r);

    repo.upsert_seen(&r, &fp, t0()).await.unwrap();
    repo.set_status(&fp, JobStatus::Applied, Some("sent resume"), t0() + TimeDelta::hours(1))
        .await
        .unwrap();
    let seen = repo
        .upsert_seen(&r, &fp, t0() + TimeDelta::hours(2))
        .await
        .unwrap();

    assert_eq!(seen.entity.status, JobStatus::Applied);
    assert_eq!(seen.entity.notes.as_deref(), Some("sent resume"));
}

#[tokio::test]
async fn set_status_appends_history() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let r = record("Support Specialist", "3");
    let fp = fingerprint(&r);
    repo.upsert_seen(&r, &fp, t0()).await.unwrap();

    let at = t0() + TimeDelta::hours(3);
    let updated = repo
        .set_status(&fp, JobStatus::Interviewed, Some("phone screen"), at)
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::Interviewed);
    assert_eq!(updated.last_updated, at);

    repo.set_status(&fp, JobStatus::Rejected, None, at).await.unwrap();

    let history = repo.history(&fp).await.unwrap();
    let statuses: Vec<_> = history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::New, JobStatus::Interviewed, JobStatus::Rejected]
    );
    assert_eq!(history[2].notes, None);
}

#[tokio::test]
async fn set_status_unknown_fingerprint() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let fp = Fingerprint::parse(&"b".repeat(64)).unwrap();

    let err = repo
        .set_status(&fp, JobStatus::Applied, None, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(repo.history(&fp).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_orders_filters_and_limits() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let records = [
        record("Senior Operations Manager", "1"),
        record("Backend Engineer", "2"),
        record("Support Specialist", "3"),
    ];
    for (i, r) in records.iter().enumerate() {
        repo.upsert_seen(r, &fingerprint(r), t0() + TimeDelta::hours(i as i64))
            .await
            .unwrap();
    }
    repo.set_status(&fingerprint(&records[1]), JobStatus::Applied, None, t0())
        .await
        .unwrap();

    let all = repo.list(None, None).await.unwrap();
    let titles: Vec<_> = all.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Support Specialist", "Backend Engineer", "Senior Operations Manager"]
    );

    let applied = repo.list(Some(JobStatus::Applied), None).await.unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].title, "Backend Engineer");

    assert_eq!(repo.list(None, Some(2)).await.unwrap().len(), 2);
    assert!(repo.list(Some(JobStatus::Offered), None).await.unwrap().is_empty());

    let counts = repo.count_by_status().await.unwrap();
    assert_eq!(counts, vec![(JobStatus::New, 2), (JobStatus::Applied, 1)]);
}

#[tokio::test]
async fn concurrent_upserts_create_once() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);
    let r = record("Support Specialist", "3");
    let fp = fingerprint(&r);

    let attempts = (0..8).map(|_| {
        let repo = repo.clone();
        let r = r.clone();
        let fp = fp.clone();
        tokio::spawn(async move { repo.upsert_seen(&r, &fp, t0()).await.unwrap() })
    });
    let outcomes = futures::future::join_all(attempts).await;

    let created = outcomes
        .into_iter()
        .filter(|o| o.as_ref().unwrap().created)
        .count();
    assert_eq!(created, 1);
    assert_eq!(repo.history(&fp).await.unwrap().len(), 1);
}
