//! Schedule Ingestion Integration Tests
//!
//! Reading schedule files from disk in both supported formats.

use std::path::PathBuf;

use sharkcast::ingest::{IngestionError, ScheduleFormat};
use sharkcast::{read_schedule, SchedulingZone};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const SEASON_ICS: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240909T002000Z\r\n\
SUMMARY:Jets at 49ers\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20240915T200500Z\r\n\
SUMMARY:49ers at Vikings\r\n\
DESCRIPTION:KNBR 680\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[tokio::test]
async fn test_read_ics_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "49ers.ics", SEASON_ICS);

    let events = read_schedule(&path, None, SchedulingZone::Utc).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].label(), "Jets at 49ers");
    assert_eq!(events[0].output_id(), "20240909-Jets-at-49ers");
    assert_eq!(events[1].details(), Some("KNBR 680"));
}

#[tokio::test]
async fn test_read_csv_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "giants.csv",
        "START_DATE,START_TIME,SUBJECT\n04/06/12,01:05 PM,Giants at Diamondbacks\n04/06/12,07:05 PM,Giants at Diamondbacks\n",
    );

    let events = read_schedule(&path, None, SchedulingZone::Utc).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].trigger_time().to_rfc3339(), "2012-04-06T13:05:00+00:00");
    // Doubleheaders get distinct recordings
    assert_eq!(events[0].output_id(), "20120406-Giants-at-Diamondbacks");
    assert_eq!(events[1].output_id(), "20120406-Giants-at-Diamondbacks-2");
}

#[tokio::test]
async fn test_explicit_format_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "schedule.txt", SEASON_ICS);

    let err = assert_err!(read_schedule(&path, None, SchedulingZone::Utc).await);
    assert!(matches!(err, IngestionError::UnknownFormat(_)));

    let events = assert_ok!(
        read_schedule(&path, Some(ScheduleFormat::Ics), SchedulingZone::Utc).await
    );
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.ics");

    let err = assert_err!(read_schedule(&path, None, SchedulingZone::Utc).await);
    assert!(matches!(err, IngestionError::Read { .. }));
    assert!(err.to_string().contains("nope.ics"));
}

#[tokio::test]
async fn test_malformed_file_reports_path_and_line() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "broken.ics",
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:No start\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
    );

    let err = read_schedule(&path, None, SchedulingZone::Utc)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, IngestionError::Parse { .. }));
    assert!(message.contains("broken.ics"));
    assert!(message.contains("line"));
}
