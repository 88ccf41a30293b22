//! Queue engine driven through the player: cursor rules, auto-advance,
//! transport controls and failed tracks

mod helpers;

use cuedeck_common::events::HostEvent;
use cuedeck_common::models::Repeat;
use cuedeck_host::playback::{PlayerCommand, QueueStatus};
use cuedeck_host::store::LibraryIntent;
use helpers::{player, Call, Fixture};

fn url(track: &str) -> String {
    format!("file:///music/{}.mp3", track)
}

fn play(id: &str) -> PlayerCommand {
    PlayerCommand::PlayPlaylist { id: id.into() }
}

fn current_track(fx: &Fixture) -> Option<String> {
    fx.player
        .state()
        .playback
        .queue
        .as_ref()
        .map(|q| q.track_id().to_string())
}

fn status(fx: &Fixture) -> QueueStatus {
    QueueStatus::of(&fx.player.state().playback)
}

#[test]
fn test_track_id_starts_its_playlist_at_that_track() {
    let mut fx = player(1);
    fx.player.handle(play("t2")).unwrap();

    let playback = &fx.player.state().playback;
    let queue = playback.queue.as_ref().unwrap();
    assert_eq!(queue.playlist_id(), "p1");
    assert_eq!(queue.cursor(), 1);
    assert!(playback.playing);
    assert_eq!(fx.engine.started_urls(), vec![url("t2")]);

    let events = fx.event_types();
    assert!(events.contains(&"TrackStarted"));
    assert!(events.contains(&"PlaybackStateChanged"));
}

#[test]
fn test_playlist_id_starts_at_first_track() {
    let mut fx = player(1);
    fx.player.handle(play("p1")).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t1"));
    assert_eq!(fx.engine.starts()[0].1.volume, 1.0);
}

#[test]
fn test_unknown_id_is_ignored() {
    let mut fx = player(1);
    fx.player.handle(play("missing")).unwrap();
    assert_eq!(status(&fx), QueueStatus::Idle);
    assert!(fx.engine.calls().is_empty());
}

#[test]
fn test_next_and_previous_step_through_queue() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();

    fx.player.handle(PlayerCommand::Next).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t2"));
    fx.player.handle(PlayerCommand::Next).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t3"));
    fx.player.handle(PlayerCommand::Previous).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t2"));

    assert_eq!(fx.engine.started_urls(), vec![url("t1"), url("t2"), url("t3"), url("t2")]);
    // Each replacement stops the previous instance at once
    assert!(fx.engine.stops().iter().all(|(_, fade)| *fade == 0));
    assert_eq!(fx.engine.live_count(), 1);
}

#[test]
fn test_next_past_end_with_repeat_off_goes_idle() {
    let mut fx = player(1);
    fx.player.handle(play("t3")).unwrap();
    fx.drain_events();

    fx.player.handle(PlayerCommand::Next).unwrap();

    assert_eq!(status(&fx), QueueStatus::Idle);
    assert!(!fx.player.state().playback.playing);
    assert_eq!(fx.engine.live_count(), 0);
    assert_eq!(fx.track_instance(), None);

    let events = fx.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, HostEvent::QueueFinished { playlist_id, .. } if playlist_id == "p1")));
    assert!(events
        .iter()
        .any(|e| matches!(e, HostEvent::PlaybackStateChanged { playing: false, track_id: None, .. })));
}

#[test]
fn test_previous_at_start_with_repeat_off_goes_idle() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    fx.player.handle(PlayerCommand::Previous).unwrap();
    assert_eq!(status(&fx), QueueStatus::Idle);
}

#[test]
fn test_repeat_all_wraps_both_ways() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Repeat { repeat: Repeat::All }).unwrap();
    fx.player.handle(play("t3")).unwrap();

    fx.player.handle(PlayerCommand::Next).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t1"));
    fx.player.handle(PlayerCommand::Previous).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t3"));
}

#[test]
fn test_repeat_one_is_ignored_by_next() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Repeat { repeat: Repeat::One }).unwrap();
    fx.player.handle(play("t1")).unwrap();

    fx.player.handle(PlayerCommand::Next).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t2"));
}

#[test]
fn test_track_end_advances() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();

    fx.engine.finish(id);
    fx.player.tick().unwrap();

    assert_eq!(current_track(&fx).as_deref(), Some("t2"));
    assert_eq!(fx.engine.started_urls(), vec![url("t1"), url("t2")]);
    assert_eq!(status(&fx), QueueStatus::Playing);
}

#[test]
fn test_track_end_with_repeat_one_replays() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Repeat { repeat: Repeat::One }).unwrap();
    fx.player.handle(play("t2")).unwrap();
    let first = fx.track_instance().unwrap();

    fx.engine.finish(first);
    fx.player.tick().unwrap();

    assert_eq!(current_track(&fx).as_deref(), Some("t2"));
    assert_eq!(fx.engine.started_urls(), vec![url("t2"), url("t2")]);
    assert_ne!(fx.track_instance(), Some(first));
}

#[test]
fn test_track_end_on_last_with_repeat_off_goes_idle() {
    let mut fx = player(1);
    fx.player.handle(play("t4")).unwrap();
    let id = fx.track_instance().unwrap();

    fx.engine.finish(id);
    fx.player.tick().unwrap();

    assert_eq!(status(&fx), QueueStatus::Idle);
    assert_eq!(fx.engine.live_count(), 0);
}

#[test]
fn test_track_end_with_repeat_all_wraps() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Repeat { repeat: Repeat::All }).unwrap();
    fx.player.handle(play("t3")).unwrap();
    let id = fx.track_instance().unwrap();

    fx.engine.finish(id);
    fx.player.tick().unwrap();

    assert_eq!(current_track(&fx).as_deref(), Some("t1"));
}

#[test]
fn test_shuffle_never_repeats_current_track() {
    let mut fx = player(42);
    fx.player.handle(PlayerCommand::Shuffle { shuffle: true }).unwrap();
    fx.player.handle(play("t1")).unwrap();

    for _ in 0..30 {
        let before = fx.player.state().playback.queue.as_ref().unwrap().cursor();
        fx.player.handle(PlayerCommand::Next).unwrap();
        let after = fx.player.state().playback.queue.as_ref().unwrap().cursor();
        assert_ne!(before, after);
        assert!(after < 3);
    }
}

#[test]
fn test_shuffle_on_single_track_queue_replays_it() {
    let mut fx = player(42);
    fx.player.handle(PlayerCommand::Shuffle { shuffle: true }).unwrap();
    fx.player.handle(play("p2")).unwrap();

    fx.player.handle(PlayerCommand::Next).unwrap();
    assert_eq!(current_track(&fx).as_deref(), Some("t4"));
    assert_eq!(fx.engine.started_urls().len(), 2);
}

#[test]
fn test_pause_and_resume_reach_engine_once() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();
    fx.engine.clear_calls();

    fx.player.handle(PlayerCommand::PauseResume { playing: false }).unwrap();
    fx.player.handle(PlayerCommand::PauseResume { playing: false }).unwrap();
    assert_eq!(status(&fx), QueueStatus::Paused);
    fx.player.handle(PlayerCommand::PauseResume { playing: true }).unwrap();

    assert_eq!(
        fx.engine.calls(),
        vec![
            Call::SetPaused { id, paused: true },
            Call::SetPaused { id, paused: false },
        ]
    );
    assert_eq!(current_track(&fx).as_deref(), Some("t1"));
}

#[test]
fn test_seek_moves_instance_and_progress() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();
    fx.engine.clear_calls();

    fx.player.handle(PlayerCommand::Seek { position_ms: 30_000 }).unwrap();

    assert_eq!(fx.engine.calls(), vec![Call::Seek { id, position_ms: 30_000 }]);
    assert_eq!(fx.player.state().playback.track.as_ref().unwrap().progress, 30_000);

    // Progress measured after the seek is kept, not rewound
    fx.player.tick().unwrap();
    assert_eq!(fx.player.state().playback.track.as_ref().unwrap().progress, 30_000);
}

#[test]
fn test_volume_and_mute_use_effective_gain() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();
    fx.engine.clear_calls();

    fx.player.handle(PlayerCommand::Volume { volume: 0.5 }).unwrap();
    fx.player.handle(PlayerCommand::Mute { muted: true }).unwrap();
    fx.player.handle(PlayerCommand::Volume { volume: 0.7 }).unwrap();
    fx.player.handle(PlayerCommand::Mute { muted: false }).unwrap();

    assert_eq!(
        fx.engine.calls(),
        vec![
            Call::SetVolume { id, volume: 0.5 },
            Call::SetVolume { id, volume: 0.0 },
            Call::SetVolume { id, volume: 0.7 },
        ]
    );
    assert_eq!(fx.player.state().playback.volume, 0.7);
}

#[test]
fn test_volume_is_clamped() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Volume { volume: 3.0 }).unwrap();
    assert_eq!(fx.player.state().playback.volume, 1.0);
    fx.player.handle(PlayerCommand::Volume { volume: -1.0 }).unwrap();
    assert_eq!(fx.player.state().playback.volume, 0.0);
}

#[test]
fn test_idle_transport_controls_are_no_ops() {
    let mut fx = player(1);
    let before = fx.player.snapshot();

    fx.player.handle(PlayerCommand::Next).unwrap();
    fx.player.handle(PlayerCommand::Previous).unwrap();
    fx.player.handle(PlayerCommand::Seek { position_ms: 500 }).unwrap();
    fx.player.handle(PlayerCommand::PauseResume { playing: true }).unwrap();

    assert!(std::sync::Arc::ptr_eq(&before, &fx.player.snapshot()));
    assert!(!fx.player.state().playback.playing);
    assert!(fx.engine.calls().is_empty());
}

#[test]
fn test_new_queue_replaces_old_one_wholesale() {
    let mut fx = player(1);
    fx.player.handle(play("t2")).unwrap();
    let old = fx.track_instance().unwrap();

    fx.player
        .handle(PlayerCommand::StartQueue {
            tracks: vec!["t4".into()],
            track_id: "t4".into(),
            playlist_id: "p2".into(),
        })
        .unwrap();

    assert_eq!(fx.engine.stops(), vec![(old, 0)]);
    let queue = fx.player.state().playback.queue.clone().unwrap();
    assert_eq!(queue.playlist_id(), "p2");
    assert_eq!(queue.track_ids(), ["t4".to_string()]);
}

#[test]
fn test_start_queue_with_foreign_track_is_rejected() {
    let mut fx = player(1);
    let result = fx.player.handle(PlayerCommand::StartQueue {
        tracks: vec!["t1".into()],
        track_id: "t9".into(),
        playlist_id: "p1".into(),
    });
    assert!(result.is_err());
    assert_eq!(status(&fx), QueueStatus::Idle);
}

#[test]
fn test_unplayable_track_is_skipped() {
    let mut fx = player(1);
    fx.engine.refuse(&url("t2"));

    fx.player.handle(play("t2")).unwrap();

    assert_eq!(current_track(&fx).as_deref(), Some("t3"));
    assert_eq!(fx.engine.started_urls(), vec![url("t3")]);
    let events = fx.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, HostEvent::EngineError { id, .. } if id == "t2")));
}

#[test]
fn test_queue_of_unplayable_tracks_stops() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::Repeat { repeat: Repeat::All }).unwrap();
    for track in ["t1", "t2", "t3"] {
        fx.engine.refuse(&url(track));
    }

    fx.player.handle(play("p1")).unwrap();

    assert_eq!(status(&fx), QueueStatus::Idle);
    assert!(fx.engine.started_urls().is_empty());
}

#[test]
fn test_failure_while_loading_skips_forward() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();

    fx.engine
        .set_state(id, cuedeck_host::playback::InstanceState::Failed("corrupt".into()));
    fx.player.tick().unwrap();

    assert_eq!(current_track(&fx).as_deref(), Some("t2"));
}

#[test]
fn test_tick_records_track_progress() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();
    let id = fx.track_instance().unwrap();

    fx.engine.set_position(id, 2_000, 180_000);
    fx.player.tick().unwrap();

    let track = fx.player.state().playback.track.clone().unwrap();
    assert_eq!(track.progress, 2_000);
    assert_eq!(track.duration, 180_000);
}

#[test]
fn test_removing_current_track_stops_queue() {
    let mut fx = player(1);
    fx.player.handle(play("t1")).unwrap();

    fx.player
        .handle(PlayerCommand::Library(LibraryIntent::RemoveTrack {
            playlist_id: "p1".into(),
            track_id: "t1".into(),
        }))
        .unwrap();

    assert_eq!(status(&fx), QueueStatus::Idle);
    assert_eq!(fx.engine.live_count(), 0);
    assert!(fx.player.state().library.tracks.get("t1").is_none());
}

#[test]
fn test_removing_queued_playlist_stops_queue() {
    let mut fx = player(1);
    fx.player.handle(play("t2")).unwrap();

    fx.player
        .handle(PlayerCommand::Library(LibraryIntent::RemovePlaylist { id: "p1".into() }))
        .unwrap();

    assert_eq!(status(&fx), QueueStatus::Idle);
    assert!(fx.player.state().library.tracks.get("t2").is_none());
}

#[test]
fn test_sounds_keep_playing_across_queue_changes() {
    let mut fx = player(1);
    fx.player.handle(PlayerCommand::PlaySound { id: "s2".into() }).unwrap();
    fx.player.handle(play("t1")).unwrap();
    fx.player.handle(PlayerCommand::Next).unwrap();
    fx.player.handle(PlayerCommand::PauseResume { playing: false }).unwrap();

    assert!(fx.player.state().sounds.get("s2").is_some());
    assert!(fx.engine.instance_for("file:///sounds/s2.wav").is_some());
}
