use std::sync::Arc;

use gizmo_scheduler::training::CANCELLED_MESSAGE;
use gizmo_scheduler::{Config, JobStatus, MoveDirection, TrainingQueue, Work};
use tokio::sync::{oneshot, Mutex};

fn recording(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Work<String> {
    Work::from_future(async move {
        log.lock().await.push(name);
        Ok(format!("{name} finished"))
    })
}

fn gated() -> (oneshot::Sender<()>, Work<String>) {
    let (tx, rx) = oneshot::channel::<()>();
    let work = Work::from_future(async move {
        let _ = rx.await;
        Ok("blocker finished".to_string())
    });
    (tx, work)
}

async fn wait_until_idle(queue: &TrainingQueue<String>) {
    while queue.is_worker_running().await {
        tokio::task::yield_now().await;
    }
}

async fn wait_until_running(queue: &TrainingQueue<String>, job_id: &str) {
    loop {
        let status = queue.get_job(job_id).await.map(|j| j.status);
        if status == Some(JobStatus::Running) {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_reorder_and_cancel_scenario() {
    let queue = TrainingQueue::new(&Config::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    // Occupy the worker so J1..J3 stay queued while we rearrange them
    let (release, blocker_work) = gated();
    let blocker = queue.add_job("blocker", blocker_work, 5.0).await;
    wait_until_running(&queue, &blocker.id).await;

    let j1 = queue.add_job("J1", recording("J1", log.clone()), 10.0).await;
    let j2 = queue.add_job("J2", recording("J2", log.clone()), 10.0).await;
    let j3 = queue.add_job("J3", recording("J3", log.clone()), 10.0).await;

    assert!(queue.move_job(&j3.id, MoveDirection::Earlier).await);
    assert!(queue.move_job(&j3.id, MoveDirection::Earlier).await);
    // Already first among queued jobs
    assert!(!queue.move_job(&j3.id, MoveDirection::Earlier).await);

    let names: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.name).collect();
    assert_eq!(names, vec!["blocker", "J3", "J1", "J2"]);

    assert!(queue.cancel_job(&j1.id).await);
    assert!(!queue.cancel_job(&j1.id).await);
    assert_eq!(queue.queued_count().await, 2);

    release.send(()).unwrap();
    wait_until_idle(&queue).await;

    assert_eq!(*log.lock().await, vec!["J3", "J2"]);

    let j1 = queue.get_job(&j1.id).await.unwrap();
    assert_eq!(j1.status, JobStatus::Error);
    assert_eq!(j1.error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert!(j1.started_at.is_none());

    let j2 = queue.get_job(&j2.id).await.unwrap();
    assert_eq!(j2.status, JobStatus::Done);
    assert_eq!(j2.result.as_deref(), Some("J2 finished"));
    assert_eq!(queue.get_job(&j3.id).await.unwrap().status, JobStatus::Done);
}

#[tokio::test]
async fn test_running_job_cannot_be_moved_or_cancelled() {
    let queue = TrainingQueue::new(&Config::default());
    let (release, work) = gated();
    let running = queue.add_job("running", work, 20.0).await;
    wait_until_running(&queue, &running.id).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let queued = queue.add_job("queued", recording("queued", log.clone()), 5.0).await;
    let before: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.id).collect();

    assert!(!queue.move_job(&running.id, MoveDirection::Later).await);
    assert!(!queue.cancel_job(&running.id).await);
    // A lone queued job has no queued neighbour to swap with
    assert!(!queue.move_job(&queued.id, MoveDirection::Earlier).await);

    let after: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.id).collect();
    assert_eq!(before, after);
    assert_eq!(
        queue.get_job(&running.id).await.unwrap().status,
        JobStatus::Running
    );
    assert_eq!(queue.estimated_total_minutes().await, 25.0);

    release.send(()).unwrap();
    wait_until_idle(&queue).await;
    assert_eq!(*log.lock().await, vec!["queued"]);
}

#[tokio::test]
async fn test_failing_job_ends_in_error() {
    let queue = TrainingQueue::new(&Config::default());

    let failing = queue
        .add_job(
            "dpo",
            Work::blocking(|| Err("dataset is empty".into())),
            15.0,
        )
        .await;
    wait_until_idle(&queue).await;

    let job = queue.get_job(&failing.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(!job.error_message.unwrap_or_default().is_empty());
    assert!(job.finished_at.is_some());
    assert_eq!(queue.estimated_total_minutes().await, 0.0);

    // The worker restarts for the next job
    let ok = queue
        .add_job("sft", Work::from_future(async { Ok("merged".to_string()) }), 5.0)
        .await;
    wait_until_idle(&queue).await;
    assert_eq!(queue.get_job(&ok.id).await.unwrap().status, JobStatus::Done);

    assert_eq!(queue.clear_finished().await, 2);
    assert!(queue.get_jobs().await.is_empty());
}

#[tokio::test]
async fn test_clear_finished_keeps_pending_jobs() {
    let queue = TrainingQueue::new(&Config::default());
    let (release, work) = gated();
    let running = queue.add_job("running", work, 1.0).await;
    wait_until_running(&queue, &running.id).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let cancelled = queue.add_job("cancelled", recording("cancelled", log.clone()), 1.0).await;
    let waiting = queue.add_job("waiting", recording("waiting", log.clone()), 1.0).await;
    queue.cancel_job(&cancelled.id).await;

    assert_eq!(queue.clear_finished().await, 1);
    let ids: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![running.id.clone(), waiting.id.clone()]);

    release.send(()).unwrap();
    wait_until_idle(&queue).await;
    assert_eq!(*log.lock().await, vec!["waiting"]);
}

#[tokio::test]
async fn test_finished_jobs_cannot_be_moved() {
    let queue = TrainingQueue::new(&Config::default());
    let done = queue
        .add_job("done", Work::from_future(async { Ok("ok".to_string()) }), 1.0)
        .await;
    wait_until_idle(&queue).await;

    let (release, work) = gated();
    let running = queue.add_job("running", work, 1.0).await;
    wait_until_running(&queue, &running.id).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let cancelled = queue.add_job("cancelled", recording("cancelled", log.clone()), 1.0).await;
    let waiting = queue.add_job("waiting", recording("waiting", log.clone()), 1.0).await;
    assert!(queue.cancel_job(&cancelled.id).await);

    let before: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.id).collect();
    for direction in [MoveDirection::Earlier, MoveDirection::Later] {
        assert!(!queue.move_job(&done.id, direction).await);
        assert!(!queue.move_job(&cancelled.id, direction).await);
    }
    let after: Vec<String> = queue.get_jobs().await.into_iter().map(|j| j.id).collect();
    assert_eq!(before, after);
    assert_eq!(queue.get_job(&done.id).await.unwrap().status, JobStatus::Done);
    assert_eq!(queue.get_job(&cancelled.id).await.unwrap().status, JobStatus::Error);

    release.send(()).unwrap();
    wait_until_idle(&queue).await;
    assert_eq!(*log.lock().await, vec!["waiting"]);
    assert_eq!(queue.get_job(&waiting.id).await.unwrap().status, JobStatus::Done);
}
