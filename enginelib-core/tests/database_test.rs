//! End-to-end tests over real on-disk databases

use std::path::PathBuf;

use tempfile::TempDir;

use enginelib_core::schema::{self, DESKTOP_1_1_1, DESKTOP_2_0_0, FIRMWARE_1_0_0, FIRMWARE_1_0_3};
use enginelib_core::{
    required_waveform_samples_per_entry, standard_pad_colors, waveform_entry_count,
    BeatgridMarker, Database, Error, HotCue, Loop, MusicalKey, SamplingInfo, TrackImportInfo,
    TrackSnapshot, WaveformEntry, WaveformPoint, ALL_VERSIONS, VERSION_LATEST,
};

fn ref_scripts_dir(version: &schema::EngineVersion) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("ref/engine")
        .join(version.script_dir)
}

/// The worked example from the hardware interchange notes: one fully
/// analyzed 44.1 kHz track.
fn example_snapshot() -> TrackSnapshot {
    let sample_count: i64 = 16_140_600;
    let mut snapshot = TrackSnapshot {
        relative_path: Some("../01 - Some Artist - Some Song.mp3".into()),
        track_number: Some(1),
        duration_ms: Some(366_000),
        bpm: Some(120.0),
        year: Some(1970),
        title: Some("Some Song".into()),
        artist: Some("Some Artist".into()),
        bitrate: Some(320),
        rating: Some(60),
        average_loudness: Some(0.5),
        key: Some(MusicalKey::AMinor),
        sampling: Some(SamplingInfo {
            sample_rate: 44100.0,
            sample_count,
        }),
        ..TrackSnapshot::default()
    };

    let beatgrid = vec![
        BeatgridMarker {
            index: -4,
            sample_offset: -83316.78,
        },
        BeatgridMarker {
            index: 812,
            sample_offset: 17_470_734.439,
        },
    ];
    snapshot.default_beatgrid = beatgrid.clone();
    snapshot.adjusted_beatgrid = beatgrid;
    snapshot.default_main_cue = Some(2732.0);
    snapshot.adjusted_main_cue = Some(2732.0);
    snapshot.hot_cues[0] = Some(HotCue {
        label: "Cue 1".into(),
        sample_offset: 1_377_924.5,
        color: standard_pad_colors::PAD_1,
    });
    snapshot.hot_cues[3] = Some(HotCue {
        label: "Cue 4".into(),
        sample_offset: 5_508_265.96,
        color: standard_pad_colors::PAD_4,
    });
    snapshot.loops[0] = Some(Loop {
        label: "Loop 1".into(),
        start_sample_offset: 1144.012,
        end_sample_offset: 345_339.134,
        color: standard_pad_colors::PAD_1,
    });

    let samples_per_entry = required_waveform_samples_per_entry(44100.0);
    let entries = waveform_entry_count(sample_count, samples_per_entry);
    snapshot.waveform = vec![
        WaveformEntry::new(
            WaveformPoint { value: 0, opacity: 255 },
            WaveformPoint { value: 42, opacity: 255 },
            WaveformPoint { value: 255, opacity: 255 },
        );
        entries as usize
    ];
    snapshot
}

#[test]
fn create_database_verifies_for_every_version() {
    for version in ALL_VERSIONS {
        let tmp = TempDir::new().unwrap();
        let db = Database::create(tmp.path(), version).unwrap();
        db.verify().unwrap();
        assert_eq!(db.version(), version);
        assert!(!db.uuid().unwrap().is_empty());
    }
}

#[test]
fn reference_scripts_verify_for_declared_version() {
    for version in ALL_VERSIONS {
        let tmp = TempDir::new().unwrap();
        let db =
            Database::create_from_script_dir(tmp.path(), version, &ref_scripts_dir(&version))
                .unwrap();
        db.verify().unwrap();
        assert_eq!(db.version(), version);
    }
}

#[test]
fn create_or_load_reports_creation_and_keeps_uuid() {
    let tmp = TempDir::new().unwrap();
    let (db, created) = Database::create_or_load(tmp.path(), VERSION_LATEST).unwrap();
    assert!(created);
    let uuid = db.uuid().unwrap();
    drop(db);

    let (db, created) = Database::create_or_load(tmp.path(), VERSION_LATEST).unwrap();
    assert!(!created);
    assert_eq!(db.uuid().unwrap(), uuid);
}

#[test]
fn create_track_for_all_versions_derives_filename_and_extension() {
    let files = [
        ("../path/to/file_in_other_dir.mp3", "file_in_other_dir.mp3", "mp3"),
        ("local_file.flac", "local_file.flac", "flac"),
    ];
    for version in ALL_VERSIONS {
        for (relative_path, filename, extension) in files {
            let tmp = TempDir::new().unwrap();
            let db = Database::create(tmp.path(), version).unwrap();
            let snapshot = TrackSnapshot {
                relative_path: Some(relative_path.into()),
                ..TrackSnapshot::default()
            };

            let track = db.create_track(&snapshot).unwrap();

            assert_ne!(track.id(), 0);
            assert_eq!(track.db().uuid().unwrap(), db.uuid().unwrap());
            assert_eq!(track.relative_path().unwrap(), relative_path);
            assert_eq!(track.filename().unwrap(), filename);
            assert_eq!(track.file_extension().unwrap(), extension);
        }
    }
}

#[test]
fn create_and_read_track_roundtrips_snapshot() {
    // Both track-row layouts must preserve the full snapshot.
    for version in [FIRMWARE_1_0_3, DESKTOP_2_0_0] {
        let tmp = TempDir::new().unwrap();
        let db = Database::create(tmp.path(), version).unwrap();
        let snapshot = example_snapshot();

        let track = db.create_track(&snapshot).unwrap();

        assert_eq!(db.tracks().unwrap().len(), 1);
        let mut read_back = track.snapshot().unwrap();
        assert_eq!(read_back.id, Some(track.id()));
        read_back.id = None;
        assert_eq!(read_back, snapshot);

        let by_path = db
            .tracks_by_relative_path("../01 - Some Artist - Some Song.mp3")
            .unwrap();
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].id(), track.id());
        assert!(db
            .tracks_by_relative_path("Does Not Exist.mp3")
            .unwrap()
            .is_empty());
        assert!(db.track_by_id(123).unwrap().is_none());
    }
}

#[test]
fn waveform_sizing_matches_hardware_expectation() {
    assert_eq!(required_waveform_samples_per_entry(44100.0), 105);
    let snapshot = example_snapshot();
    assert_eq!(snapshot.waveform.len() as i64, waveform_entry_count(16_140_600, 105));
    assert_eq!(snapshot.waveform.len(), 153_720);

    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&snapshot).unwrap();
    assert_eq!(track.waveform().unwrap().len(), 153_720);
}

#[test]
fn rating_is_clamped_on_write() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    track.set_rating(Some(150)).unwrap();
    assert_eq!(track.rating().unwrap(), Some(100));
    track.set_rating(None).unwrap();
    assert_eq!(track.rating().unwrap(), None);
}

#[test]
fn per_field_setters_keep_redundant_columns_consistent() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    track.set_bpm(Some(127.53)).unwrap();
    assert_eq!(track.bpm().unwrap(), Some(127.53));

    track.set_key(Some(MusicalKey::FMajor)).unwrap();
    assert_eq!(track.key().unwrap(), Some(MusicalKey::FMajor));
    // The duplicate in the track-data blob follows the column.
    let snapshot = track.snapshot().unwrap();
    assert_eq!(snapshot.key, Some(MusicalKey::FMajor));

    track
        .set_hot_cue_at(
            5,
            Some(HotCue {
                label: "Drop".into(),
                sample_offset: 96_000.0,
                color: standard_pad_colors::PAD_6,
            }),
        )
        .unwrap();
    let cues = track.hot_cues().unwrap();
    assert_eq!(cues[5].as_ref().unwrap().label, "Drop");
    // The slot write must not disturb its neighbours.
    assert_eq!(cues[0].as_ref().unwrap().label, "Cue 1");
    assert!(cues[1].is_none());

    assert!(track.set_hot_cue_at(8, None).is_err());

    track.set_loop_at(1, None).unwrap();
    assert!(track.loop_at(1).unwrap().is_none());
    assert_eq!(track.loop_at(0).unwrap().unwrap().label, "Loop 1");
}

#[test]
fn update_replaces_full_record_and_rejects_foreign_snapshots() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    let mut changed = example_snapshot();
    changed.title = Some("Renamed".into());
    changed.rating = None;
    track.update(&changed).unwrap();
    assert_eq!(track.title().unwrap(), Some("Renamed".into()));
    assert_eq!(track.rating().unwrap(), None);

    let mut foreign = example_snapshot();
    foreign.id = Some(track.id() + 1);
    assert!(matches!(
        track.update(&foreign),
        Err(Error::InvalidTrackSnapshot(_))
    ));
}

#[test]
fn import_info_roundtrips_and_resets() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    assert_eq!(track.import_info().unwrap(), None);

    let info = TrackImportInfo {
        external_db_uuid: "99999999-8888-7777-6666-555555555555".into(),
        external_track_id: 42,
    };
    track.set_import_info(Some(&info)).unwrap();
    assert_eq!(track.import_info().unwrap(), Some(info));

    track.set_import_info(None).unwrap();
    assert_eq!(track.import_info().unwrap(), None);
}

#[test]
fn root_crate_properties_hold_for_all_versions() {
    for version in ALL_VERSIONS {
        let tmp = TempDir::new().unwrap();
        let db = Database::create(tmp.path(), version).unwrap();

        let crate_name = "Example Root Crate";
        let cr = db.create_root_crate(crate_name).unwrap();

        assert_ne!(cr.id(), 0);
        assert_eq!(cr.db().uuid().unwrap(), db.uuid().unwrap());
        assert_eq!(cr.name().unwrap(), crate_name);
        assert!(cr.parent().unwrap().is_none());
        assert!(db.crates().unwrap().iter().any(|c| c.id() == cr.id()));
        assert!(db.root_crates().unwrap().iter().any(|c| c.id() == cr.id()));
        assert_eq!(
            db.crate_by_id(cr.id()).unwrap().unwrap().name().unwrap(),
            crate_name
        );
        assert_eq!(
            db.root_crate_by_name(crate_name).unwrap().unwrap().id(),
            cr.id()
        );
    }
}

#[test]
fn invalid_crate_names_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    assert!(matches!(
        db.create_root_crate(""),
        Err(Error::CrateInvalidName { .. })
    ));
    assert!(matches!(
        db.create_root_crate("Hip;Hop"),
        Err(Error::CrateInvalidName { .. })
    ));
}

#[test]
fn child_crates_nest_under_their_parent() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let root = db.create_root_crate("House").unwrap();
    let child = db.create_crate(&root, "Deep").unwrap();

    assert_eq!(child.parent().unwrap().unwrap().id(), root.id());
    let children = root.children().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id(), child.id());
    assert!(db.root_crates().unwrap().iter().all(|c| c.id() != child.id()));

    child.set_name("Deeper").unwrap();
    assert_eq!(child.name().unwrap(), "Deeper");
}

#[test]
fn removing_a_track_cascades_memberships() {
    for version in [FIRMWARE_1_0_3, DESKTOP_1_1_1, DESKTOP_2_0_0] {
        let tmp = TempDir::new().unwrap();
        let db = Database::create(tmp.path(), version).unwrap();
        let track = db.create_track(&example_snapshot()).unwrap();
        let old_id = track.id();

        let cr = db.create_root_crate("My Crate").unwrap();
        cr.add_track(&track).unwrap();
        assert_eq!(cr.tracks().unwrap().len(), 1);

        let playlist = db.create_playlist("My Playlist").unwrap();
        db.add_track_to_playlist(playlist, &track).unwrap();
        assert_eq!(db.playlist_tracks(playlist).unwrap().len(), 1);

        db.remove_track(&track).unwrap();

        assert!(db.track_by_id(old_id).unwrap().is_none());
        assert!(!track.is_valid().unwrap());
        assert!(matches!(track.snapshot(), Err(Error::TrackDeleted(_))));
        assert!(cr.is_valid().unwrap());
        assert_eq!(cr.tracks().unwrap().len(), 0);
        assert_eq!(db.playlist_tracks(playlist).unwrap().len(), 0);
    }
}

#[test]
fn removing_a_track_cascades_smartlist_memberships_on_v1() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), FIRMWARE_1_0_3).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    let list = db.create_smartlist("Bangers", "rating >= 80").unwrap();
    db.add_track_to_smartlist(list, &track).unwrap();
    assert_eq!(db.smartlist_tracks(list).unwrap().len(), 1);

    db.remove_track(&track).unwrap();
    assert_eq!(db.smartlist_tracks(list).unwrap().len(), 0);

    assert_eq!(db.smartlists().unwrap(), vec![list]);
    db.remove_smartlist(list).unwrap();
    assert!(db.smartlists().unwrap().is_empty());
}

#[test]
fn album_art_sentinel_maps_to_absent() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();

    // Freshly created tracks point at the seeded sentinel row.
    assert_eq!(track.album_art_id().unwrap(), None);

    let art_id = db.add_album_art("b2c9f1", &[0xFF, 0xD8, 0xFF]).unwrap();
    track.set_album_art_id(Some(art_id)).unwrap();
    assert_eq!(track.album_art_id().unwrap(), Some(art_id));
    assert!(db.album_art_ids().unwrap().contains(&art_id));
    assert_eq!(
        db.album_art(art_id).unwrap().unwrap().hash.as_deref(),
        Some("b2c9f1")
    );

    assert!(track.set_album_art_id(Some(9999)).is_err());

    track.set_album_art_id(None).unwrap();
    assert_eq!(track.album_art_id().unwrap(), None);
    db.remove_album_art(art_id).unwrap();
    assert!(db.album_art(art_id).unwrap().is_none());
}

#[test]
fn removing_a_crate_leaves_tracks_alone() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();
    let track = db.create_track(&example_snapshot()).unwrap();
    let cr = db.create_root_crate("Doomed").unwrap();
    cr.add_track(&track).unwrap();

    db.remove_crate(&cr).unwrap();

    assert!(!cr.is_valid().unwrap());
    assert!(db.crates().unwrap().is_empty());
    assert!(track.is_valid().unwrap());
}

#[test]
fn transaction_rollback_discards_service_writes() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();

    {
        let _guard = db.begin_transaction().unwrap();
        db.create_track(&example_snapshot()).unwrap();
        db.create_root_crate("Discarded").unwrap();
        assert!(matches!(
            db.begin_transaction(),
            Err(Error::AlreadyInTransaction)
        ));
        // Guard dropped without commit.
    }

    assert!(db.tracks().unwrap().is_empty());
    assert!(db.crates().unwrap().is_empty());
}

#[test]
fn transaction_commit_persists_service_writes() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), VERSION_LATEST).unwrap();

    let guard = db.begin_transaction().unwrap();
    db.create_track(&example_snapshot()).unwrap();
    guard.commit().unwrap();

    drop(db);
    let db = Database::load(tmp.path()).unwrap();
    assert_eq!(db.tracks().unwrap().len(), 1);
}

#[test]
fn on_disk_upgrade_chain_reaches_latest_v1() {
    let tmp = TempDir::new().unwrap();
    let db = Database::create(tmp.path(), FIRMWARE_1_0_0).unwrap();
    let cr = db.create_root_crate("Carried Along").unwrap();
    let crate_id = cr.id();

    db.upgrade_to(FIRMWARE_1_0_3).unwrap();
    db.verify().unwrap();
    db.upgrade_to(DESKTOP_1_1_1).unwrap();
    db.verify().unwrap();
    assert_eq!(db.version(), DESKTOP_1_1_1);

    // Crate data survives the move into the List table.
    let cr = db.crate_by_id(crate_id).unwrap().unwrap();
    assert_eq!(cr.name().unwrap(), "Carried Along");
    assert!(cr.parent().unwrap().is_none());

    // The upgraded file reopens as the new version.
    drop(db);
    let db = Database::load(tmp.path()).unwrap();
    assert_eq!(db.version(), DESKTOP_1_1_1);
    db.verify().unwrap();
}

#[test]
fn crate_ids_continue_after_list_fork() {
    // Pre-fork ids come from the rowid; post-fork ids are pre-computed.
    // Either way they must stay unique and dense per database.
    for version in [FIRMWARE_1_0_3, DESKTOP_1_1_1] {
        let tmp = TempDir::new().unwrap();
        let db = Database::create(tmp.path(), version).unwrap();
        let first = db.create_root_crate("A").unwrap();
        let second = db.create_root_crate("B").unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(db.crates().unwrap().len(), 2);
    }
}
