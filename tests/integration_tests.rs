use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use ulp_sift::{sift_file, Controller, PipelineState, RejectReason, SiftConfig};

/// Helper function to create a target file mixing good, malformed and repeated lines
fn create_test_data(temp_dir: &TempDir) -> Result<std::path::PathBuf> {
    let target_content = "https://www.facebook.com/login:user1@example.com:password123\n\
facebook.com:user1@example.com:password123\n\
\n\
github.com:johndoe\n\
https://www.facebook.com/login:user1@example.com:password123\n\
android://com.app@data:jane:janepass\n\
gmail.com:test@gmail.com:secret:with:colons\n\
linkedin.com:different@email.com:pass123\n";

    let target = temp_dir.path().join("combo.txt");
    fs::write(&target, target_content)?;
    Ok(target)
}

/// Helper function to create a configuration file and load it the way the CLI does
async fn create_test_config(temp_dir: &TempDir) -> Result<SiftConfig> {
    let config_content = format!(
        r#"{{
        "logs_root": "{}",
        "field_split": "strict",
        "write_empty_logs": true,
        "annotate_line_numbers": true,
        "count_total_lines": true,
        "progress_interval_lines": 2,
        "io_buffer_size_kb": 8,
        "sync_each_record": true,
        "memory_usage_percent": 50.0,
        "verbose": false
    }}"#,
        temp_dir.path().join("Logs").display()
    );

    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, config_content)?;

    SiftConfig::load(&config_path).await
}

#[tokio::test]
async fn test_end_to_end_sift() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = create_test_data(&temp_dir)?;
    let master = temp_dir.path().join("master.txt");
    fs::write(&master, "linkedin.com:different@email.com:pass123\n")?;
    let config = create_test_config(&temp_dir).await?;

    let snapshot = sift_file(&target, &master, config).await?;

    assert_eq!(snapshot.state, PipelineState::Completed);
    assert_eq!(snapshot.total_lines, Some(8));
    assert_eq!(snapshot.processed_lines, 8);
    assert_eq!(snapshot.valid_count, 1);
    assert_eq!(snapshot.rejected(RejectReason::EmptyLine), 1);
    // URL schemes and colons in the password add fields, so strict splitting rejects them.
    assert_eq!(snapshot.rejected(RejectReason::NotEnoughParts), 5);
    assert_eq!(snapshot.rejected(RejectReason::Duplicate), 1);

    let master_content = fs::read_to_string(&master)?;
    assert_eq!(
        master_content,
        "linkedin.com:different@email.com:pass123\nfacebook.com:user1@example.com:password123\n"
    );

    let log_dir = snapshot.log_directory.expect("log folder");
    let empty = fs::read_to_string(log_dir.join("Empty Line.txt"))?;
    assert_eq!(empty, "Line 3: \n");
    let duplicates = fs::read_to_string(log_dir.join("Duplicate.txt"))?;
    assert_eq!(duplicates, "Line 8: linkedin.com:different@email.com:pass123\n");
    let parts = fs::read_to_string(log_dir.join("Not Enough Parts.txt"))?;
    assert_eq!(parts.lines().count(), 5);
    assert!(parts.starts_with("Line 1: https://www.facebook.com/login:"));

    Ok(())
}

#[test]
fn test_controller_shared_with_another_thread() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("target.txt");
    let master = temp_dir.path().join("master.txt");
    let lines: Vec<String> = (0..50_000)
        .map(|i| format!("h{}:u{}:p{}", i % 40_000, i, i))
        .collect();
    fs::write(&target, lines.join("\n"))?;

    let mut config = SiftConfig::default();
    config.logs_root = temp_dir.path().join("Logs");
    let controller = Arc::new(Controller::new(config)?);
    controller.start(&target, &master)?;

    let remote = Arc::clone(&controller);
    let caller = thread::spawn(move || {
        let mut toggles = 0;
        while !remote.state().is_terminal() && toggles < 10 {
            if remote.pause().is_ok() {
                thread::sleep(Duration::from_millis(2));
                // The run may have finished its last line before the pause landed.
                if remote.resume().is_err() {
                    break;
                }
                toggles += 1;
            }
            thread::sleep(Duration::from_millis(2));
        }
    });
    caller.join().unwrap();

    let snapshot = controller.join();
    assert_eq!(snapshot.state, PipelineState::Completed);
    assert_eq!(snapshot.processed_lines, 50_000);
    assert_eq!(snapshot.valid_count, 50_000);
    assert_eq!(fs::read_to_string(&master)?.lines().count(), 50_000);

    Ok(())
}

#[test]
fn test_second_run_reports_all_duplicates() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("target.txt");
    let master = temp_dir.path().join("master.txt");
    fs::write(&target, "a:b:c\nd:e:f\nx:y\n")?;

    let mut config = SiftConfig::default();
    config.logs_root = temp_dir.path().join("Logs");

    let first = Controller::new(config.clone())?;
    first.start(&target, &master)?;
    let first = first.join();
    assert_eq!(first.valid_count, 2);

    let second = Controller::new(config)?;
    second.start(&target, &master)?;
    let second = second.join();
    assert_eq!(second.valid_count, 0);
    assert_eq!(second.rejected(RejectReason::Duplicate), 2);
    assert_eq!(second.rejected(RejectReason::NotEnoughParts), 1);

    assert_ne!(first.log_directory, second.log_directory);
    assert_eq!(fs::read_to_string(&master)?, "a:b:c\nd:e:f\n");

    Ok(())
}
