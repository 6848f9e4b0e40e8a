// Parallel executor: isolation, ordering, pool sizing, panics, timeout,
// interrupt, and event emission.

mod common;

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use envelock_core::config::{BatchConfig, BatchPlan};
    use envelock_core::constants::{DEFAULT_KEY_ALIAS, LOCKED_SUFFIX};
    use envelock_core::executor::{execute_in_parallel, CancelToken, ExecutionContext};
    use envelock_core::journal::{BatchEvent, MemorySink};
    use envelock_core::transform::{FileOutcome, FileTask, Logged, Operation};
    use envelock_core::types::{BatchError, FileError};
    use envelock_core::{decrypt_files, encrypt_files};
    use tempfile::tempdir;

    use super::common;

    fn fake_tasks(n: usize) -> Vec<FileTask> {
        (0..n).map(|i| FileTask::new(format!("/virtual/file_{i}.txt"), "/virtual/out")).collect()
    }

    fn echo(task: &FileTask, _cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        let name = task.source_name();
        Ok(FileOutcome::new(name.clone(), task.destination_dir.join(format!("{name}.out")), 1))
    }

    #[test]
    fn empty_batch_is_trivial() {
        let ctx = ExecutionContext::default();
        let result = execute_in_parallel(Vec::new(), Arc::new(echo), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.total_files(), 0);
        assert!(result.results().is_empty());
        assert_eq!(result.thread_pool_size(), 1);
        assert_eq!(result.success_count(), 0);
    }

    #[test]
    fn single_task_uses_single_thread() {
        let ctx = ExecutionContext::default();
        let result = execute_in_parallel(fake_tasks(1), Arc::new(echo), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.thread_pool_size(), 1);
        assert_eq!(result.success_count(), 1);
    }

    #[test]
    fn pool_is_capped_by_configured_workers() {
        let ctx = ExecutionContext::new(BatchConfig::default().with_workers(2));
        let result = execute_in_parallel(fake_tasks(10), Arc::new(echo), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.thread_pool_size(), 2);
        assert_eq!(result.total_files(), 10);
        assert_eq!(result.results().len(), 10);
    }

    #[test]
    fn results_follow_submission_order() {
        // Earlier tasks sleep longer, so completion order is reversed.
        let slow_first = |task: &FileTask, _c: &CancelToken| -> Result<FileOutcome, FileError> {
            let idx: u64 = task.source_name()
                .trim_start_matches("file_")
                .trim_end_matches(".txt")
                .parse()
                .unwrap();
            thread::sleep(Duration::from_millis((5 - idx) * 20));
            Ok(FileOutcome::new(task.source_name(), format!("/out/{idx}"), idx))
        };
        let transform = Arc::new(slow_first);
        let expected: Vec<String> = (0..5).map(|i| format!("file_{i}.txt")).collect();

        for _ in 0..3 {
            let ctx = ExecutionContext::new(BatchConfig::default().with_workers(5));
            let result = execute_in_parallel(fake_tasks(5), transform.clone(), Operation::Encrypt, &ctx).unwrap();
            let names: Vec<String> = result.results().iter().map(|r| r.source_name().to_string()).collect();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn panicking_task_becomes_failure() {
        let flaky = |task: &FileTask, c: &CancelToken| -> Result<FileOutcome, FileError> {
            if task.source_name() == "file_2.txt" {
                panic!("boom in file 2");
            }
            echo(task, c)
        };
        let ctx = ExecutionContext::default();
        let result = execute_in_parallel(fake_tasks(4), Arc::new(flaky), Operation::Encrypt, &ctx).unwrap();

        assert_eq!(result.success_count(), 3);
        assert_eq!(result.failure_count(), 1);
        let failed = &result.results()[2];
        assert!(!failed.is_success());
        assert!(failed.error_message().unwrap().contains("boom in file 2"));
    }

    #[test]
    fn timeout_cancels_and_reports_every_task() {
        let started = Arc::new(AtomicUsize::new(0));
        let seen = started.clone();
        let stubborn = move |_task: &FileTask, cancel: &CancelToken| -> Result<FileOutcome, FileError> {
            seen.fetch_add(1, Ordering::SeqCst);
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Err(FileError::Cancelled)
        };
        let config = BatchConfig::default()
            .with_workers(2)
            .with_timeout(Duration::from_millis(100))
            .with_cancel_grace(Duration::from_secs(2));
        let ctx = ExecutionContext::new(config);

        let result = execute_in_parallel(fake_tasks(6), Arc::new(stubborn), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.results().len(), 6);
        assert_eq!(result.failure_count(), 6);
        assert!(ctx.cancel.is_cancelled());
        // Queued tasks were never handed to the transform.
        assert!(started.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn interrupt_aborts_the_batch() {
        let waits = |_task: &FileTask, cancel: &CancelToken| -> Result<FileOutcome, FileError> {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            Err(FileError::Cancelled)
        };
        let (ctx, handle) = ExecutionContext::new(BatchConfig::default().with_workers(2)).interruptible();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.interrupt();
        });

        let err = execute_in_parallel(fake_tasks(4), Arc::new(waits), Operation::Decrypt, &ctx).unwrap_err();
        assert!(matches!(err, BatchError::Interrupted));
        assert!(ctx.cancel.is_cancelled());
    }

    #[test]
    fn dropped_interrupt_handle_does_not_abort() {
        let (ctx, handle) = ExecutionContext::default().interruptible();
        drop(handle);
        let result = execute_in_parallel(fake_tasks(3), Arc::new(echo), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.success_count(), 3);
    }

    #[test]
    fn batch_isolates_corrupted_file() {
        let src_dir = tempdir().unwrap();
        let enc_dir = tempdir().unwrap();
        let dec_dir = tempdir().unwrap();
        let store = common::memory_store();

        let originals: Vec<(String, Vec<u8>)> =
            (0..5).map(|i| (format!("doc_{i}.txt"), common::pattern(1000 + i * 4099))).collect();
        let sources: Vec<_> = originals
            .iter()
            .map(|(name, data)| common::write_file(src_dir.path(), name, data))
            .collect();

        let enc_ctx = ExecutionContext::new(BatchConfig::default().with_destination(enc_dir.path()));
        let enc_plan = BatchPlan::new(&sources, &enc_ctx.config);
        let enc = encrypt_files(&enc_plan, &store, DEFAULT_KEY_ALIAS, &enc_ctx).unwrap();
        assert_eq!(enc.success_count(), 5);

        // Corrupt task K = 3: cut the file inside its envelope.
        let victim = enc_dir.path().join(format!("doc_3.txt{LOCKED_SUFFIX}"));
        let bytes = fs::read(&victim).unwrap();
        fs::write(&victim, &bytes[..10]).unwrap();

        let locked: Vec<_> = originals
            .iter()
            .map(|(name, _)| enc_dir.path().join(format!("{name}{LOCKED_SUFFIX}")))
            .collect();
        let dec_ctx = ExecutionContext::new(BatchConfig::default().with_destination(dec_dir.path()));
        let dec_plan = BatchPlan::new(&locked, &dec_ctx.config);
        let dec = decrypt_files(&dec_plan, &store, DEFAULT_KEY_ALIAS, &dec_ctx).unwrap();

        assert_eq!(dec.total_files(), 5);
        assert_eq!(dec.results().len(), 5);
        assert_eq!(dec.failure_count(), 1);
        assert_eq!(dec.success_count(), 4);
        for (i, (r, (name, data))) in dec.results().iter().zip(&originals).enumerate() {
            if i == 3 {
                assert!(!r.is_success());
                assert!(r.error_message().unwrap().contains("invalid envelope"));
                assert!(!dec_dir.path().join(name).exists());
            } else {
                assert!(r.is_success(), "{:?}", r);
                assert_eq!(&fs::read(dec_dir.path().join(name)).unwrap(), data);
            }
        }
    }

    #[test]
    fn missing_key_is_fatal() {
        let dir = tempdir().unwrap();
        let src = common::write_file(dir.path(), "x.txt", b"x");
        let ctx = ExecutionContext::default();
        let plan = BatchPlan::new([src], &ctx.config);

        let err = encrypt_files(&plan, &common::memory_store(), "no-such-alias", &ctx).unwrap_err();
        assert!(matches!(err, BatchError::KeyStore(_)));
        assert!(!dir.path().join(format!("x.txt{LOCKED_SUFFIX}")).exists());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let ctx = ExecutionContext::new(BatchConfig::default().with_buffer_size(4));
        let plan = BatchPlan::from_tasks(Vec::new());
        let err = encrypt_files(&plan, &common::memory_store(), DEFAULT_KEY_ALIAS, &ctx).unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
    }

    #[test]
    fn events_cover_batch_and_files() {
        let dir = tempdir().unwrap();
        let a = common::write_file(dir.path(), "a.txt", b"aaa");
        let missing = dir.path().join("missing.txt");

        let sink = Arc::new(MemorySink::new());
        let ctx = ExecutionContext::new(BatchConfig::default()).with_events(sink.clone());
        let plan = BatchPlan::new([a, missing], &ctx.config);
        let result = encrypt_files(&plan, &common::memory_store(), DEFAULT_KEY_ALIAS, &ctx).unwrap();
        assert_eq!(result.success_count(), 1);

        let events = sink.events();
        assert!(matches!(events.first(), Some(BatchEvent::BatchStarted { total_files: 2, .. })));
        assert!(matches!(
            events.last(),
            Some(BatchEvent::BatchFinished { succeeded: 1, failed: 1, .. })
        ));
        let ok = events.iter().filter(|e| matches!(e, BatchEvent::FileSucceeded { .. })).count();
        let failed = events.iter().filter(|e| matches!(e, BatchEvent::FileFailed { .. })).count();
        assert_eq!((ok, failed), (1, 1));
    }

    #[test]
    fn colliding_outputs_abort_before_any_write() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let out = tempdir().unwrap();
        let fa = common::write_file(a.path(), "report.txt", b"FIRST file content");
        let fb = common::write_file(b.path(), "report.txt", b"SECOND file content, different");

        let ctx = ExecutionContext::new(BatchConfig::default().with_destination(out.path()).with_workers(1));
        let plan = BatchPlan::new([&fa, &fb], &ctx.config);
        let err = encrypt_files(&plan, &common::memory_store(), DEFAULT_KEY_ALIAS, &ctx).unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)), "got {err}");
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let ctx = ExecutionContext::new(BatchConfig::default().with_timeout(Duration::MAX));
        ctx.config.validate().unwrap();
        let result = execute_in_parallel(fake_tasks(3), Arc::new(echo), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.success_count(), 3);
        assert!(!ctx.cancel.is_cancelled());
    }

    #[test]
    fn panicking_task_is_journaled_as_failed() {
        let flaky = |task: &FileTask, c: &CancelToken| -> Result<FileOutcome, FileError> {
            if task.source_name() == "file_1.txt" {
                panic!("boom in file 1");
            }
            echo(task, c)
        };
        let sink = Arc::new(MemorySink::new());
        let ctx = ExecutionContext::default().with_events(sink.clone());
        let transform = Logged::new(flaky, Operation::Encrypt).with_sink(ctx.events.clone());

        let result = execute_in_parallel(fake_tasks(3), Arc::new(transform), Operation::Encrypt, &ctx).unwrap();
        assert_eq!(result.failure_count(), 1);

        let events = sink.events();
        let failed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::FileFailed { source, error, .. } => Some((source.clone(), error.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "file_1.txt");
        assert!(failed[0].1.contains("boom in file 1"));
        assert!(matches!(events.last(), Some(BatchEvent::BatchFinished { succeeded: 2, failed: 1, .. })));
    }
}
