// Batch journal: JSON lines, replay, rotation with zstd archives.

#[cfg(test)]
mod tests {
    use std::fs;

    use envelock_core::journal::{BatchEvent, BatchJournal, EventSink};
    use envelock_core::transform::Operation;
    use tempfile::tempdir;

    fn failed(i: usize) -> BatchEvent {
        BatchEvent::FileFailed {
            operation: Operation::Decrypt,
            source: format!("f{i}.rslocked"),
            error: "bad".into(),
            elapsed_ms: i as u64,
        }
    }

    #[test]
    fn events_are_written_as_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        let journal = BatchJournal::open(&path, 1000).unwrap();

        journal.record(BatchEvent::BatchStarted { operation: Operation::Encrypt, total_files: 2, pool_size: 2 });
        journal.record(failed(1));
        journal.flush();

        let raw = fs::read_to_string(&path).unwrap();
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "batch_started");
        assert_eq!(first["operation"], "encrypt");
        assert!(first["ts"].as_str().unwrap().contains('T'));

        let events = BatchJournal::read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], failed(1));
    }

    #[test]
    fn appends_to_existing_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        {
            let journal = BatchJournal::open(&path, 1000).unwrap();
            journal.append(failed(1));
        }
        {
            let journal = BatchJournal::open(&path, 1000).unwrap();
            journal.append(failed(2));
        }
        assert_eq!(BatchJournal::read_events(&path).unwrap(), vec![failed(1), failed(2)]);
    }

    #[test]
    fn rotation_archives_and_compresses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.jsonl");
        {
            let journal = BatchJournal::open(&path, 3).unwrap();
            for i in 0..4 {
                journal.append(failed(i));
            }
        } // drop joins the writer and the compression threads

        let live = BatchJournal::read_events(&path).unwrap();
        assert_eq!(live, vec![failed(3)]);

        let archives: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().map(|x| x == "zst").unwrap_or(false))
            .collect();
        assert_eq!(archives.len(), 1);

        let raw = zstd::stream::decode_all(fs::File::open(&archives[0]).unwrap()).unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("f0.rslocked"));
        assert!(text.contains("f2.rslocked"));
    }
}
