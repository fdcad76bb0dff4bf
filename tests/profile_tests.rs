// Cached profile round-trip. The path override is process-global, so the
// whole flow lives in one test.

use chrono::Utc;
use telechat::models::Actor;
use telechat::profile::{clear_profile, load_profile, save_profile, set_profile_path_override};

#[test]
fn profile_round_trip_in_temp_dir() {
    let dir = tempfile::tempdir().expect("temp dir");
    set_profile_path_override(dir.path().join("profile.json"));

    // Nothing cached yet.
    assert!(load_profile().expect("load").is_none());

    let actor = Actor {
        id: "demo_user_1_00c0ffee".to_string(),
        display_name: "Demo User 1".to_string(),
        photo_url: None,
        is_online: true,
        last_seen_at: Some(Utc::now()),
    };
    save_profile(&actor).expect("save");

    let loaded = load_profile().expect("load").expect("cached profile");
    assert_eq!(loaded, actor);

    // Clearing twice is safe.
    clear_profile().expect("clear");
    clear_profile().expect("clear again");
    assert!(load_profile().expect("load").is_none());
}
