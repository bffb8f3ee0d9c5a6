// Unit tests for domain models

use super::*;
use serde_json::json;

#[test]
fn test_scenes_from_boundaries() {
    let scenes = scenes_from_boundaries(&[0.0, 10.0, 25.0, 40.0]);
    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes[0], Scene::new(0.0, 10.0, 1));
    assert_eq!(scenes[1], Scene::new(10.0, 25.0, 2));
    assert_eq!(scenes[2], Scene::new(25.0, 40.0, 3));
}

#[test]
fn test_scenes_from_boundaries_skips_degenerate_pairs() {
    let scenes = scenes_from_boundaries(&[0.0, 0.0, 4.0]);
    assert_eq!(scenes, vec![Scene::new(0.0, 4.0, 1)]);
    assert!(scenes_from_boundaries(&[0.0]).is_empty());
    assert!(scenes_from_boundaries(&[]).is_empty());
}

#[test]
fn test_scene_validate() {
    assert!(Scene::new(0.0, 1.0, 1).validate().is_ok());
    assert!(Scene::new(2.0, 2.0, 1).validate().is_err());
    assert!(Scene::new(3.0, 2.0, 1).validate().is_err());
}

#[test]
fn test_scene_midpoint_and_display() {
    let mut scene = Scene::new(10.0, 25.0, 2);
    assert_eq!(scene.midpoint(), 17.5);
    assert_eq!(scene.duration(), 15.0);
    assert_eq!(scene.to_string(), "Scene 2 [00:10.000 - 00:25.000]");
    scene.group_id = Some(4);
    assert_eq!(scene.to_string(), "Scene 2 [00:10.000 - 00:25.000] group 4");
}

#[test]
fn test_scene_serialization_omits_missing_group() {
    let value = serde_json::to_value(Scene::new(0.0, 10.0, 1)).unwrap();
    assert_eq!(value, json!({"start": 0.0, "end": 10.0, "scene_number": 1}));

    let parsed: Scene =
        serde_json::from_value(json!({"start": 1.0, "end": 2.0, "scene_number": 7})).unwrap();
    assert_eq!(parsed.group_id, None);
}

#[test]
fn test_progress_event_wire_shape() {
    let event: ProgressEvent<SplitReport> = ProgressEvent::Progress(ProgressUpdate {
        percent: 42,
        fps: 120.5,
        eta_seconds: 3.0,
        scenes_so_far: 2,
    });
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"type": "progress", "value": 42, "fps": 120.5, "eta": 3.0, "scenes": 2})
    );

    let done: ProgressEvent<SplitReport> = ProgressEvent::Complete(SplitReport {
        files: vec!["a_scene_001.mp4".to_string()],
        output_dir: "a".to_string(),
    });
    assert_eq!(
        serde_json::to_value(&done).unwrap(),
        json!({"type": "complete", "files": ["a_scene_001.mp4"], "output_dir": "a"})
    );

    let failed: ProgressEvent<SplitReport> = ProgressEvent::Error { message: "boom".to_string() };
    assert_eq!(
        serde_json::to_value(&failed).unwrap(),
        json!({"type": "error", "message": "boom"})
    );
    assert!(failed.is_terminal());
    assert!(!event.is_terminal());
}

#[test]
fn test_batch_plan() {
    let plan = Batch::plan(20, 9);
    assert_eq!(plan, vec![0..9, 9..18, 18..20]);
    assert!(Batch::plan(0, 9).is_empty());
}

#[test]
fn test_batch_global_index() {
    let batch = Batch { indices: vec![9, 10, 11], stitched_image: Vec::new() };
    assert_eq!(batch.global_index(1), Some(9));
    assert_eq!(batch.global_index(3), Some(11));
    assert_eq!(batch.global_index(4), None);
    assert_eq!(batch.global_index(0), None);
    assert_eq!(batch.global_index(-2), None);
}

#[test]
fn test_group_assignment_merge() {
    let mut scenes = vec![
        Scene::new(0.0, 1.0, 1),
        Scene::new(1.0, 2.0, 2),
        Scene::new(2.0, 3.0, 3),
    ];
    let batch = Batch { indices: vec![0, 1, 2], stitched_image: Vec::new() };
    let groups = vec![vec![json!(1), json!(2)], vec![json!(3)]];

    let assignment = GroupAssignment::from_groups(&groups, 3);
    let next = assignment.merge_into(&mut scenes, &batch, 1);

    assert_eq!(next, 3);
    assert_eq!(scenes[0].group_id, Some(1));
    assert_eq!(scenes[1].group_id, Some(1));
    assert_eq!(scenes[2].group_id, Some(2));
}

#[test]
fn test_group_assignment_ignores_bad_indices() {
    let groups = vec![vec![json!(1), json!("2"), json!(7), json!(0), json!(2.5)]];
    let assignment = GroupAssignment::from_groups(&groups, 3);
    assert_eq!(assignment.entries, vec![(1, 0)]);
    assert_eq!(assignment.group_count, 1);
}
