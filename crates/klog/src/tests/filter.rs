use super::*;

#[test]
fn test_global_level_filtering() {
    let log = LogCore::new(LevelFilter::Warn, LevelFilter::Off, 16);

    test_log!(log, Level::Error, "error");
    test_log!(log, Level::Warn, "warning");
    test_log!(log, Level::Info, "info");
    test_log!(log, Level::Debug, "debug");
    test_log!(log, Level::Trace, "trace");

    assert_eq!(log._log_len(), 2);
    assert_eq!(log._read_log().unwrap().message(), "error");
    assert_eq!(log._read_log().unwrap().message(), "warning");
    assert_eq!(log._log_len(), 0);
}

#[test]
fn test_level_boundary() {
    let log = LogCore::new(LevelFilter::Info, LevelFilter::Off, 16);

    test_log!(log, Level::Info, "boundary");
    assert_eq!(log._log_len(), 1);

    test_log!(log, Level::Debug, "filtered");
    assert_eq!(log._log_len(), 1);

    assert_eq!(log._read_log().unwrap().message(), "boundary");
}

#[test]
fn test_dynamic_level_change() {
    let log = LogCore::new(LevelFilter::Info, LevelFilter::Off, 16);

    test_log!(log, Level::Debug, "debug1");
    test_log!(log, Level::Info, "info1");
    assert_eq!(log._log_len(), 1);

    log._set_global_level(LevelFilter::Debug);

    test_log!(log, Level::Debug, "debug2");
    test_log!(log, Level::Info, "info2");

    assert_eq!(log._log_len(), 3);
    assert_eq!(log._read_log().unwrap().message(), "info1");
    assert_eq!(log._read_log().unwrap().message(), "debug2");
    assert_eq!(log._read_log().unwrap().message(), "info2");
}

#[test]
fn test_off_buffers_nothing() {
    let log = LogCore::new(LevelFilter::Off, LevelFilter::Off, 16);
    test_log!(log, Level::Error, "dropped");
    assert_eq!(log._log_len(), 0);
    assert_eq!(log._log_dropped_count(), 0);
}
