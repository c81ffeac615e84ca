use std::time::Duration;

use docport_config::Settings;
use docport_services::StoreOptions;

#[test]
fn defaults_cover_every_section() {
    let settings = Settings::default();
    assert_eq!(settings.api.base_url, "http://localhost:8000");
    assert_eq!(settings.api.request_timeout_secs, 30);
    assert_eq!(settings.api.upload_chunk_size, 64 * 1024);
    assert_eq!(settings.tasks.poll_interval_ms, 3000);
    assert_eq!(settings.tasks.simulate_tick_ms, 500);
    assert_eq!(settings.tasks.simulate_ceiling, 90.0);
    assert_eq!(settings.context.dept_id, 1);
    assert_eq!(settings.context.project_id, 1);
}

#[test]
fn store_options_map_from_settings() {
    let settings = Settings::default();
    let options = StoreOptions::from_settings(&settings);
    assert_eq!(options.poll_interval, Duration::from_millis(3000));
    assert_eq!(options.simulate_tick, Duration::from_millis(500));
    assert_eq!(options.simulate_ceiling, 90.0);
    assert_eq!(options.dept_id, 1);
    assert_eq!(options.project_id, 1);
}
