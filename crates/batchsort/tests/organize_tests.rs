//! End-to-end runs of the organizer: ingest, preview, organize, download.

mod common;

use std::io::Read;

use chrono::{TimeDelta, Utc};

use common::{RuleBuilder, SubmissionBuilder, TestHarness};

use batchsort::{
    DownloadError, IncomingFile, JobStatus, JobStore, PipelineError, PipelineWarning,
    ProfileStore, ProgressEvent, ProgressReporter, RuleStore, Submission,
};

#[test]
fn test_default_template_end_to_end() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let submission = SubmissionBuilder::new("Mixed files")
        .file("a.JPG")
        .file("notes.txt")
        .file("movie.mp4")
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    let resolved: Vec<(&str, &str)> = preview
        .entries
        .iter()
        .map(|e| (e.new_name.as_str(), e.category.as_str()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            ("1_a.JPG", "images"),
            ("2_notes.txt", "documents"),
            ("3_movie.mp4", "videos"),
        ]
    );
    assert!(preview.fallback.is_none());

    let report = organizer.organize("alice").unwrap();
    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.processed_files, 3);
    assert!(report.job.completed_at.is_some());

    let archive_path = report.job.archive_path.clone().unwrap();
    assert_eq!(
        harness.archive_entries(&archive_path),
        vec!["documents/2_notes.txt", "images/1_a.JPG", "videos/3_movie.mp4"]
    );
    assert_eq!(
        harness.archive_entry(&archive_path, "documents/2_notes.txt"),
        b"content of notes.txt"
    );

    let staged = harness.staging_dir("alice", &report.job.id);
    assert!(staged.join("images").join("1_a.JPG").is_file());
}

#[test]
fn test_duplicate_names_are_suffixed_within_category() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let submission = SubmissionBuilder::new("Photos")
        .template("{name}")
        .file_with("photo.png", b"first".to_vec())
        .file_with("photo.png", b"second".to_vec())
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    let names: Vec<&str> = preview.entries.iter().map(|e| e.new_name.as_str()).collect();
    assert_eq!(names, vec!["photo.png", "photo_2.png"]);

    let report = organizer.organize("alice").unwrap();
    let archive_path = report.job.archive_path.unwrap();

    assert_eq!(harness.archive_entry(&archive_path, "images/photo.png"), b"first");
    assert_eq!(harness.archive_entry(&archive_path, "images/photo_2.png"), b"second");
}

#[test]
fn test_size_rule_overrides_extension_table() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .add_rule("alice", RuleBuilder::new("Small", "small").size("0-1000").build())
        .unwrap();

    let submission = SubmissionBuilder::new("Sizes")
        .file_of_size("tiny.png", 500)
        .file_of_size("large.png", 2000)
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    assert_eq!(preview.entries[0].category, "small");
    assert_eq!(preview.entries[1].category, "images");
}

#[test]
fn test_first_matching_rule_wins() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .add_rule(
            "alice",
            RuleBuilder::new("Invoices", "invoices").name_pattern("^invoice").build(),
        )
        .unwrap();
    organizer
        .add_rule("alice", RuleBuilder::new("PDFs", "pdfs").extension("pdf").build())
        .unwrap();

    let submission = SubmissionBuilder::new("Paperwork")
        .file("invoice-2024.pdf")
        .file("manual.pdf")
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    assert_eq!(preview.entries[0].category, "invoices");
    assert_eq!(preview.entries[1].category, "pdfs");
}

#[test]
fn test_disabled_rules_are_ignored() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let rule = organizer
        .add_rule("alice", RuleBuilder::new("Text", "notes").extension(".txt").build())
        .unwrap();
    organizer
        .add_rule(
            "alice",
            RuleBuilder::new("Everything", "everything")
                .name_pattern(".*")
                .disabled()
                .build(),
        )
        .unwrap();

    assert!(organizer.set_rule_enabled("alice", rule.id, false).unwrap());

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    assert_eq!(preview.entries[0].category, "documents");

    organizer.set_rule_enabled("alice", rule.id, true).unwrap();
    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    assert_eq!(preview.entries[0].category, "notes");
}

#[test]
fn test_rules_are_scoped_to_their_owner() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .add_rule("bob", RuleBuilder::new("Bob's", "bob-files").extension("txt").build())
        .unwrap();

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();

    assert_eq!(preview.entries[0].category, "documents");
    assert!(!organizer.delete_rule("alice", organizer.rules("bob").unwrap()[0].id).unwrap());
}

#[test]
fn test_modified_date_rule_matches_fresh_uploads() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .add_rule("alice", RuleBuilder::new("Recent", "recent").modified("<1d").build())
        .unwrap();

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("song.mp3").build())
        .unwrap();

    assert_eq!(preview.entries[0].category, "recent");
}

#[test]
fn test_malformed_stored_rule_is_skipped_with_warning() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    // Written straight to the store, past validation
    let broken = organizer
        .store()
        .add_rule(
            "alice",
            &RuleBuilder::new("Broken", "broken").name_pattern("(unclosed").build(),
        )
        .unwrap();
    organizer
        .add_rule("alice", RuleBuilder::new("Text", "notes").extension("txt").build())
        .unwrap();

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    assert_eq!(preview.entries[0].category, "notes");

    let report = organizer.organize("alice").unwrap();
    assert_eq!(report.job.status, JobStatus::Completed);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::MalformedRule { rule_id, .. } if *rule_id == broken.id
    )));
}

#[test]
fn test_malformed_template_falls_back() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let submission = SubmissionBuilder::new("x")
        .template("{idx}-{name}")
        .file("a.txt")
        .file("b.png")
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    assert!(preview.fallback.is_some());
    let names: Vec<&str> = preview.entries.iter().map(|e| e.new_name.as_str()).collect();
    assert_eq!(names, vec!["1_a.txt", "2_b.png"]);

    let report = organizer.organize("alice").unwrap();
    assert_eq!(report.job.processed_files, 2);
    assert!(matches!(
        report.warnings.as_slice(),
        [PipelineWarning::MalformedTemplate { .. }]
    ));
}

#[test]
fn test_blank_template_uses_configured_default() {
    let harness = TestHarness::with_config(|config| {
        config.default_template = "{index:03}-{name}".to_string();
    });

    let preview = harness
        .organizer
        .ingest("alice", SubmissionBuilder::new("x").template("  ").file("a.txt").build())
        .unwrap();

    assert_eq!(preview.template, "{index:03}-{name}");
    assert_eq!(preview.entries[0].new_name, "001-a.txt");
}

#[test]
fn test_missing_source_is_skipped() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let preview = organizer
        .ingest(
            "alice",
            SubmissionBuilder::new("x").file("keep.txt").file("gone.txt").build(),
        )
        .unwrap();
    harness.remove_upload("alice", &preview.job_id, "gone.txt");

    let report = organizer.organize("alice").unwrap();

    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.declared_files, 2);
    assert_eq!(report.job.processed_files, 1);
    assert_eq!(report.outcome.attempted, 2);
    assert_eq!(report.outcome.missing, 1);

    let archive_path = report.job.archive_path.unwrap();
    assert_eq!(harness.archive_entries(&archive_path), vec!["documents/1_keep.txt"]);

    let (_, records) = organizer.job_detail("alice", &report.job.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_name, "keep.txt");
    assert!(records[0].staged_path.as_ref().unwrap().is_file());
}

#[test]
fn test_all_sources_missing_still_completes() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    harness.remove_upload("alice", &preview.job_id, "a.txt");

    let report = organizer.organize("alice").unwrap();

    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.processed_files, 0);
    let archive_path = report.job.archive_path.unwrap();
    assert!(harness.archive_entries(&archive_path).is_empty());
}

#[test]
fn test_archive_failure_completes_without_archive() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    harness.block_archive("alice", &preview.job_id);

    let report = organizer.organize("alice").unwrap();

    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.processed_files, 1);
    assert!(report.job.archive_path.is_none());
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::ArchiveCreateFailure { .. })));

    let stored = organizer.store().find_job(&report.job.id).unwrap().unwrap();
    assert_eq!(stored, report.job);
}

#[test]
fn test_archive_failure_fails_job_under_fail_policy() {
    let harness = TestHarness::failing_on_archive_error();
    let organizer = &harness.organizer;

    let preview = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    harness.block_archive("alice", &preview.job_id);

    let report = organizer.organize("alice").unwrap();

    assert_eq!(report.job.status, JobStatus::Failed);
    assert!(report.job.completed_at.is_some());

    let dashboard = organizer.dashboard("alice").unwrap();
    assert_eq!(dashboard.failed_jobs, 1);
    assert_eq!(dashboard.profile.files_organized, 0);
}

#[test]
fn test_organize_consumes_batch() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();
    organizer.organize("alice").unwrap();

    assert!(matches!(
        organizer.organize("alice"),
        Err(PipelineError::MissingStagedBatch { .. })
    ));
    assert!(matches!(
        organizer.preview("alice"),
        Err(PipelineError::MissingStagedBatch { .. })
    ));
}

#[test]
fn test_batches_are_per_actor() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let alice = organizer
        .ingest("alice", SubmissionBuilder::new("a").file("a.txt").build())
        .unwrap();
    let bob = organizer
        .ingest("bob", SubmissionBuilder::new("b").file("b.txt").build())
        .unwrap();

    let report = organizer.organize("bob").unwrap();
    assert_eq!(report.job.id, bob.job_id);
    assert_eq!(organizer.preview("alice").unwrap().job_id, alice.job_id);
}

#[test]
fn test_empty_submission_is_rejected() {
    let harness = TestHarness::new();

    let result = harness
        .organizer
        .ingest("alice", SubmissionBuilder::new("x").build());

    assert!(matches!(result, Err(PipelineError::EmptySubmission)));
    assert_eq!(harness.organizer.dashboard("alice").unwrap().total_jobs, 0);
}

#[test]
fn test_invalid_actor_id_is_setup_failure() {
    let harness = TestHarness::new();

    let result = harness
        .organizer
        .ingest("../escape", SubmissionBuilder::new("x").file("a.txt").build());

    assert!(matches!(
        result,
        Err(PipelineError::PipelineSetupFailure { .. })
    ));
    assert!(!harness.temp_path().join("escape").exists());
}

#[test]
fn test_profile_accumulates_declared_totals() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    for name in ["first", "second"] {
        organizer
            .ingest(
                "alice",
                SubmissionBuilder::new(name)
                    .file_of_size("a.bin", 100)
                    .file_of_size("b.bin", 50)
                    .build(),
            )
            .unwrap();
        organizer.organize("alice").unwrap();
    }

    let dashboard = organizer.dashboard("alice").unwrap();
    assert_eq!(dashboard.total_jobs, 2);
    assert_eq!(dashboard.completed_jobs, 2);
    assert_eq!(dashboard.total_files, 4);
    assert_eq!(dashboard.total_bytes, 300);
    assert_eq!(dashboard.total_size, "300.0 B");
    assert_eq!(dashboard.profile.files_organized, 4);
    assert_eq!(dashboard.profile.bytes_saved, 300);

    let names: Vec<&str> = dashboard.recent_jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["second", "first"]);
}

#[test]
fn test_dashboard_for_new_actor() {
    let harness = TestHarness::new();

    let dashboard = harness.organizer.dashboard("newcomer").unwrap();

    assert_eq!(dashboard.total_jobs, 0);
    assert_eq!(dashboard.profile.actor_id, "newcomer");
    assert_eq!(dashboard.profile.files_organized, 0);
    assert!(dashboard.recent_jobs.is_empty());

    let stored = harness.organizer.store().profile("newcomer").unwrap().unwrap();
    assert_eq!(stored, dashboard.profile);
    let again = harness.organizer.dashboard("newcomer").unwrap();
    assert_eq!(again.profile.created_at, dashboard.profile.created_at);
}

#[test]
fn test_dashboard_lists_ten_recent_completed_jobs() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    for i in 0..12 {
        organizer
            .ingest(
                "alice",
                SubmissionBuilder::new(&format!("job {}", i)).file("a.txt").build(),
            )
            .unwrap();
        organizer.organize("alice").unwrap();
    }
    // Left pending
    organizer
        .ingest("alice", SubmissionBuilder::new("pending").file("a.txt").build())
        .unwrap();

    let dashboard = organizer.dashboard("alice").unwrap();

    assert_eq!(dashboard.total_jobs, 13);
    assert_eq!(dashboard.recent_jobs.len(), 10);
    assert_eq!(dashboard.recent_jobs[0].name, "job 11");
    assert!(dashboard
        .recent_jobs
        .iter()
        .all(|j| j.status == JobStatus::Completed));
}

#[test]
fn test_download_completed_job() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .ingest(
            "alice",
            SubmissionBuilder::new("My Summer Trip").file("a.jpg").build(),
        )
        .unwrap();
    let report = organizer.organize("alice").unwrap();

    let download = organizer.download("alice", &report.job.id).unwrap();

    assert_eq!(download.filename, "My_Summer_Trip.zip");
    assert_eq!(download.content_type, "application/zip");

    let mut bytes = Vec::new();
    download.open().unwrap().read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes.len() as u64, download.length);
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_download_errors_are_distinct() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let pending = organizer
        .ingest("alice", SubmissionBuilder::new("x").file("a.txt").build())
        .unwrap();

    assert!(matches!(
        organizer.download("alice", &pending.job_id),
        Err(DownloadError::NotAvailable(_))
    ));
    assert!(matches!(
        organizer.download("bob", &pending.job_id),
        Err(DownloadError::JobNotFound(_))
    ));
    assert!(matches!(
        organizer.download("alice", "no-such-job"),
        Err(DownloadError::JobNotFound(_))
    ));

    let report = organizer.organize("alice").unwrap();
    std::fs::remove_file(report.job.archive_path.as_ref().unwrap()).unwrap();
    assert!(matches!(
        organizer.download("alice", &report.job.id),
        Err(DownloadError::NotAvailable(_))
    ));
}

#[test]
fn test_progress_events_follow_phases() {
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressEvent>>);

    impl ProgressReporter for Collect {
        fn report(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    let harness = TestHarness::new();
    let collector = Arc::new(Collect::default());
    let organizer = batchsort::Organizer::new(
        Arc::new(batchsort::OrganizerConfig::new(&harness.data_root)),
        batchsort::Database::open_in_memory().unwrap(),
    )
    .with_progress(collector.clone());

    let preview = organizer
        .ingest(
            "alice",
            SubmissionBuilder::new("x").file("a.txt").file("b.txt").build(),
        )
        .unwrap();
    std::fs::remove_file(harness.upload_dir("alice", &preview.job_id).join("b.txt")).unwrap();
    organizer.organize("alice").unwrap();

    let events = collector.0.lock().unwrap().clone();
    let staged = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::FileStaged { .. }))
        .count();
    let skipped = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::FileSkipped { index: 2, .. }))
        .count();

    assert_eq!(staged, 1);
    assert_eq!(skipped, 1);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Completed { processed: 1, .. })
    ));
}

#[test]
fn test_huge_index_width_falls_back() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let submission = SubmissionBuilder::new("x")
        .template("{index:070000}_{name}")
        .file("a.txt")
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    assert!(preview.fallback.is_some());
    assert_eq!(preview.entries[0].new_name, "1_a.txt");

    let report = organizer.organize("alice").unwrap();
    assert_eq!(report.job.processed_files, 1);
    assert_eq!(organizer.dashboard("alice").unwrap().total_jobs, 1);
}

#[test]
fn test_overlong_rendered_names_fall_back() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    let submission = SubmissionBuilder::new("x")
        .template("{index:030}_{name}_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_padding_")
        .file("a.txt")
        .file("b.txt")
        .build();
    let preview = organizer.ingest("alice", submission).unwrap();

    assert!(preview.fallback.is_some());
    let report = organizer.organize("alice").unwrap();

    assert_eq!(report.job.status, JobStatus::Completed);
    assert_eq!(report.job.processed_files, 2);
    assert_eq!(report.outcome.failed, 0);
}

#[test]
fn test_huge_declared_sizes_do_not_overflow() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    for _ in 0..2 {
        let submission = Submission::new("huge")
            .file(IncomingFile::new("a.bin", u64::MAX, Box::new(&b"abc"[..])))
            .file(IncomingFile::new("b.bin", 1, Box::new(&b"d"[..])));
        let preview = organizer.ingest("alice", submission).unwrap();
        assert_eq!(preview.entries[0].size, 3);
        organizer.organize("alice").unwrap();
    }

    let dashboard = organizer.dashboard("alice").unwrap();
    assert_eq!(dashboard.total_bytes, i64::MAX as u64);
    assert_eq!(dashboard.profile.bytes_saved, i64::MAX as u64);
    assert_eq!(dashboard.profile.files_organized, 4);
}

#[test]
fn test_date_rules_use_client_modification_time() {
    let harness = TestHarness::new();
    let organizer = &harness.organizer;

    organizer
        .add_rule("alice", RuleBuilder::new("Old", "old").modified(">30d").build())
        .unwrap();
    organizer
        .add_rule("alice", RuleBuilder::new("Recent", "recent").modified("<1d").build())
        .unwrap();

    let old = Utc::now() - TimeDelta::days(90);
    let submission = Submission::new("dates")
        .file(IncomingFile::from_bytes("scan.pdf", b"old".to_vec()).with_modified(old))
        .file(IncomingFile::from_bytes("fresh.pdf", b"new".to_vec()));
    let preview = organizer.ingest("alice", submission).unwrap();

    assert_eq!(preview.entries[0].category, "old");
    assert_eq!(preview.entries[1].category, "recent");
}
