use mediatag_core::{
    ExtractionConfig, JobKind, JobMonitorConfig, JobStatus, MediaClass, MediaRecord,
};
use mediatag_db::{JobStore, MemoryJobStore, MemoryMetadataStore, MetadataStore};
use mediatag_plugins::test_helpers::{
    label, FakeKeyPhraseExtractor, FakeLabelDetector, FakeOcrEngine, FakePoll, FakeTranscriber,
};
use mediatag_plugins::JobPoll;
use mediatag_processing::{Capabilities, StartedJob};
use mediatag_worker::{run_due_jobs, JobHandlerContext, JobMonitor};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    metadata: Arc<MemoryMetadataStore>,
    jobs: Arc<MemoryJobStore>,
    labels: Arc<FakeLabelDetector>,
    transcriber: Arc<FakeTranscriber>,
    ctx: JobHandlerContext,
    monitor: JobMonitor,
}

fn harness(max_attempts: i32) -> Harness {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let labels = Arc::new(FakeLabelDetector::new());
    let transcriber = Arc::new(FakeTranscriber::new());
    let caps = Capabilities {
        labels: labels.clone(),
        key_phrases: Arc::new(FakeKeyPhraseExtractor::new()),
        transcriber: transcriber.clone(),
        ocr: Arc::new(FakeOcrEngine::default()),
        config: ExtractionConfig::default(),
    };
    let config = JobMonitorConfig {
        poll_interval: Duration::from_secs(60),
        transcription_max_attempts: max_attempts,
        video_label_max_attempts: max_attempts,
        ..Default::default()
    };
    let ctx = JobHandlerContext::new(metadata.clone(), jobs.clone(), caps, config.clone());
    let monitor = JobMonitor::new_no_worker(jobs.clone(), config);
    Harness {
        metadata,
        jobs,
        labels,
        transcriber,
        ctx,
        monitor,
    }
}

impl Harness {
    async fn upload(&self, name: &str, class: MediaClass, kinds: &[JobKind]) -> String {
        let key = format!("1700000000_abc_{}", name);
        let mut record = MediaRecord::new(key.clone(), name, class, "application/octet-stream", 10);
        record.pending_jobs = kinds.to_vec();
        self.metadata.put(&record).await.unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            let started = StartedJob {
                kind: *kind,
                provider_job_id: format!("provider-{}", i),
            };
            self.monitor.register(&key, &started).await.unwrap();
        }
        key
    }

    async fn tick(&self) -> usize {
        self.jobs.make_all_due().await;
        run_due_jobs(&self.ctx).await.unwrap()
    }

    async fn record(&self, key: &str) -> MediaRecord {
        self.metadata.get(key).await.unwrap().unwrap()
    }

    async fn statuses(&self, key: &str) -> Vec<(JobKind, JobStatus)> {
        self.jobs
            .list_for_record(key)
            .await
            .unwrap()
            .into_iter()
            .map(|j| (j.kind, j.status))
            .collect()
    }
}

fn video_labels() -> FakePoll<Vec<mediatag_plugins::DetectedLabel>> {
    FakePoll::Poll(JobPoll::Succeeded(vec![
        label("Beach", 96.0),
        label("Person", 99.0),
        label("Beach", 97.0),
        label("Blurry", 60.0),
        label("ocean", 88.0),
    ]))
}

#[tokio::test]
async fn audio_placeholder_filled_after_transcription() {
    let h = harness(720);
    let key = h.upload("memo.mp3", MediaClass::Audio, &[JobKind::Transcription]).await;

    let record = h.record(&key).await;
    assert!(record.tags.is_empty());
    assert_eq!(record.transcript, "");

    // Not due yet without forcing
    assert_eq!(run_due_jobs(&h.ctx).await.unwrap(), 0);

    h.tick().await;
    assert!(h.record(&key).await.tags.is_empty());

    h.transcriber.complete_with("the quick brown fox jumps");
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(record.transcript, "the quick brown fox jumps");
    assert_eq!(record.tags, vec!["quick", "brown", "jumps"]);
    assert!(record.pending_jobs.is_empty());
    assert_eq!(
        h.statuses(&key).await,
        vec![(JobKind::Transcription, JobStatus::Succeeded)]
    );
}

#[tokio::test]
async fn video_fuses_when_labels_land_first() {
    let h = harness(720);
    let key = h
        .upload("clip.mp4", MediaClass::Video, &[JobKind::Transcription, JobKind::VideoLabels])
        .await;

    h.labels.set_video_poll(video_labels());
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(record.visual_labels, vec!["Person", "Beach", "ocean"]);
    assert!(record.tags.is_empty(), "tags wait for the transcription part");

    h.transcriber.complete_with("surfing lessons at the ocean today");
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(
        record.tags,
        vec!["surfing", "lessons", "ocean", "today", "Person", "Beach"]
    );
}

#[tokio::test]
async fn video_fuses_when_transcription_lands_first() {
    let h = harness(720);
    let key = h
        .upload("clip.mp4", MediaClass::Video, &[JobKind::Transcription, JobKind::VideoLabels])
        .await;

    h.transcriber.complete_with("surfing lessons at the ocean today");
    h.tick().await;
    assert!(h.record(&key).await.tags.is_empty());

    h.labels.set_video_poll(video_labels());
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(
        record.tags,
        vec!["surfing", "lessons", "ocean", "today", "Person", "Beach"]
    );
    assert_eq!(record.transcript, "surfing lessons at the ocean today");
}

#[tokio::test]
async fn silent_video_tags_come_from_labels() {
    let h = harness(720);
    let key = h
        .upload("silent.mp4", MediaClass::Video, &[JobKind::Transcription, JobKind::VideoLabels])
        .await;

    h.transcriber.complete_with("");
    h.labels.set_video_poll(video_labels());
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(record.tags, vec!["Person", "Beach", "ocean"]);
    assert_eq!(record.transcript, "");
}

#[tokio::test]
async fn failed_transcription_still_fuses_labels() {
    let h = harness(720);
    let key = h
        .upload("clip.mp4", MediaClass::Video, &[JobKind::Transcription, JobKind::VideoLabels])
        .await;

    h.transcriber
        .set_poll(FakePoll::Poll(JobPoll::Failed("unsupported codec".into())));
    h.labels.set_video_poll(video_labels());
    h.tick().await;

    let record = h.record(&key).await;
    assert_eq!(record.tags, vec!["Person", "Beach", "ocean"]);
    let statuses = h.statuses(&key).await;
    assert!(statuses.contains(&(JobKind::Transcription, JobStatus::Failed)));
    assert!(statuses.contains(&(JobKind::VideoLabels, JobStatus::Succeeded)));
}

#[tokio::test]
async fn polling_stops_after_max_attempts() {
    let h = harness(3);
    let key = h.upload("long.mp3", MediaClass::Audio, &[JobKind::Transcription]).await;

    assert_eq!(h.tick().await, 1);
    assert_eq!(h.tick().await, 1);
    assert_eq!(h.tick().await, 1);
    assert_eq!(h.tick().await, 0);

    let job = &h.jobs.list_for_record(&key).await.unwrap()[0];
    assert_eq!(job.status, JobStatus::TimedOut);
    assert_eq!(job.attempts, 3);
    assert_eq!(h.transcriber.polls(), 3);

    let record = h.record(&key).await;
    assert!(record.tags.is_empty());
    assert!(record.pending_jobs.is_empty());
}

#[tokio::test]
async fn recoverable_errors_are_retried() {
    let h = harness(720);
    let key = h.upload("memo.mp3", MediaClass::Audio, &[JobKind::Transcription]).await;

    h.transcriber
        .set_poll(FakePoll::RecoverableError("throttled".into()));
    h.tick().await;

    let job = &h.jobs.list_for_record(&key).await.unwrap()[0];
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.attempts, 1);
    assert_eq!(job.last_error.as_deref(), Some("throttled"));

    h.transcriber.complete_with("meeting notes about the budget");
    h.tick().await;
    assert_eq!(
        h.statuses(&key).await,
        vec![(JobKind::Transcription, JobStatus::Succeeded)]
    );
}

#[tokio::test]
async fn unrecoverable_errors_fail_the_job() {
    let h = harness(720);
    let key = h.upload("memo.mp3", MediaClass::Audio, &[JobKind::Transcription]).await;

    h.transcriber
        .set_poll(FakePoll::UnrecoverableError("job not found".into()));
    h.tick().await;
    h.tick().await;

    assert_eq!(
        h.statuses(&key).await,
        vec![(JobKind::Transcription, JobStatus::Failed)]
    );
    assert_eq!(h.transcriber.polls(), 1);
}

#[tokio::test]
async fn completion_for_deleted_record_is_a_no_op() {
    let h = harness(720);
    let key = h.upload("gone.mp3", MediaClass::Audio, &[JobKind::Transcription]).await;
    h.metadata.delete(&key).await.unwrap();

    h.transcriber.complete_with("this record was deleted already");
    h.tick().await;

    assert!(h.metadata.get(&key).await.unwrap().is_none());
    assert_eq!(
        h.statuses(&key).await,
        vec![(JobKind::Transcription, JobStatus::Succeeded)]
    );
}

#[tokio::test]
async fn worker_pool_polls_due_jobs() {
    let h = harness(720);
    let config = JobMonitorConfig {
        poll_interval: Duration::from_millis(10),
        tick: Duration::from_millis(10),
        ..Default::default()
    };
    let ctx = Arc::new(JobHandlerContext {
        config: config.clone(),
        ..h.ctx.clone()
    });
    let monitor = JobMonitor::start(ctx);

    let key = "1700000000_abc_pool.mp3";
    let mut record = MediaRecord::new(key, "pool.mp3", MediaClass::Audio, "audio/mpeg", 1);
    record.pending_jobs = vec![JobKind::Transcription];
    h.metadata.put(&record).await.unwrap();
    h.transcriber.complete_with("background worker pool transcript");
    monitor
        .register(
            key,
            &StartedJob {
                kind: JobKind::Transcription,
                provider_job_id: "p".into(),
            },
        )
        .await
        .unwrap();

    let mut done = false;
    for _ in 0..200 {
        if !h.record(key).await.tags.is_empty() {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    monitor.shutdown().await;
    assert!(done, "worker pool never completed the job");
}
