// Copyright (c) 2024 Mike Tsao

use ensnare_timespans::prelude::*;
use std::{collections::BTreeSet, sync::Arc};

#[derive(Debug)]
struct Note {
    quarters: i64,
    pitch: Option<u8>,
}
impl IndexableElement for Note {
    fn duration(&self) -> Offset {
        Offset::from(self.quarters)
    }

    fn pitches(&self) -> BTreeSet<PitchId> {
        self.pitch.map(PitchId).into_iter().collect()
    }
}

type Tree = TimespanTree<ElementTimespan<Note>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Two parts in 4/4, two measures each. The soprano walks C D E F | A, and the
// bass holds C, then rests, then G.
fn two_part_walk() -> Vec<ScoreWalkEvent<Note>> {
    let mut walk = vec![ScoreWalkEvent::Enter {
        kind: ContainerKind::Score,
        uid: Uid(1),
        offset: Offset::zero(),
        duration: Offset::from(8),
    }];
    let parts: [(usize, &[&[(i64, Option<u8>)]]); 2] = [
        (
            10,
            &[
                &[(1, Some(60)), (1, Some(62)), (1, Some(64)), (1, Some(65))],
                &[(4, Some(69))],
            ],
        ),
        (20, &[&[(2, Some(48)), (2, None)], &[(4, Some(43))]]),
    ];
    for (part_uid, measures) in parts {
        walk.push(ScoreWalkEvent::Enter {
            kind: ContainerKind::Part,
            uid: Uid(part_uid),
            offset: Offset::zero(),
            duration: Offset::from(8),
        });
        for (m, notes) in measures.iter().enumerate() {
            walk.push(ScoreWalkEvent::Enter {
                kind: ContainerKind::Measure,
                uid: Uid(part_uid + m + 1),
                offset: Offset::from(4 * m as i64),
                duration: Offset::from(4),
            });
            let mut position = 0;
            for (quarters, pitch) in notes.iter() {
                walk.push(ScoreWalkEvent::Leaf {
                    element: Arc::new(Note {
                        quarters: *quarters,
                        pitch: *pitch,
                    }),
                    offset: Offset::from(position),
                });
                position += quarters;
            }
            walk.push(ScoreWalkEvent::Exit);
        }
        walk.push(ScoreWalkEvent::Exit);
    }
    walk.push(ScoreWalkEvent::Exit);
    walk
}

fn two_part_tree() -> Tree {
    Tree::from(OffsetTree::from_walk(two_part_walk()).unwrap())
}

fn o(value: i64) -> Offset {
    Offset::from(value)
}

#[test]
fn walk_builds_a_navigable_tree() {
    init_logging();
    let tree = two_part_tree();
    assert_eq!(tree.tree().len(), 8);
    assert!(tree.tree().validate().is_ok());

    let offsets: Vec<_> = tree
        .iterate_verticalities(false)
        .map(|v| v.start_offset())
        .collect();
    assert_eq!(offsets, vec![o(0), o(1), o(2), o(3), o(4)]);

    let v = tree.verticality_at(o(1));
    assert_eq!(v.pitch_set(), BTreeSet::from([PitchId(48), PitchId(62)]));
    assert_eq!(
        v.bass_timespan().and_then(|t| t.part()),
        Some(PartUid(20))
    );
    assert_eq!(
        v.measure_extent(),
        Some(TimeRange::new_with_start_and_end(o(0), o(4)))
    );

    let v = tree.verticality_at(o(2));
    assert_eq!(v.pitch_set(), BTreeSet::from([PitchId(64)]), "the bass rests");
    assert_eq!(v.stop_timespans().len(), 2);
}

#[test]
fn navigation_boundaries() {
    init_logging();
    let tree = two_part_tree();
    let last = tree.verticality_at(tree.tree().latest_start().unwrap());
    assert!(last.next_verticality().unwrap().is_none());
    let first = tree.verticality_at(tree.tree().earliest_start().unwrap());
    assert!(first.previous_verticality().unwrap().is_none());

    let mut v = first;
    let mut steps = 0;
    while let Some(next) = v.next_verticality().unwrap() {
        v = next;
        steps += 1;
    }
    assert_eq!(steps, 4);
    assert_eq!(v.start_offset(), o(4));
}

#[test]
fn removing_the_current_timespans_mid_walk() {
    init_logging();
    let tree = two_part_tree();
    let mut visited = Vec::default();
    let mut v = tree.first_verticality();
    while let Some(current) = v {
        visited.push(current.start_offset());
        tree.remove_many(current.start_timespans()).unwrap();
        v = current.next_verticality().unwrap();
    }
    assert_eq!(visited, vec![o(0), o(1), o(2), o(3), o(4)]);
    assert!(tree.tree().is_empty());
    assert!(tree.tree().validate().is_ok());
}

#[test]
fn windows_and_melodic_shapes() {
    init_logging();
    let tree = two_part_tree();
    let windows: Vec<_> = tree
        .iterate_verticalities_nwise(3, false)
        .unwrap()
        .collect();
    assert_eq!(windows.len(), 3);
    assert_eq!(windows[0].start_offsets(), vec![o(0), o(1), o(2)]);

    let soprano: Vec<_> = windows
        .iter()
        .map(|w| {
            tree.unwrap_verticalities(w)
                .into_iter()
                .find(|(part, _)| *part == Some(PartUid(10)))
                .map(|(_, h)| h)
                .unwrap()
        })
        .collect();
    assert!(soprano[0].has_passing_tone(), "C D E");
    assert!(soprano[1].has_passing_tone(), "D E F");
    assert!(!soprano[2].has_passing_tone(), "E F A leaps at the end");
    assert!(!soprano[0].has_neighbor_tone());
}

#[test]
fn consonance_bounded_runs() {
    init_logging();
    let tree = two_part_tree();
    // Anything without a second (or a ninth) is consonant here.
    let no_seconds = |pitches: &BTreeSet<PitchId>| {
        let classes: Vec<_> = pitches.iter().map(|p| p.pitch_class().0 as i16).collect();
        classes.iter().all(|a| {
            classes
                .iter()
                .all(|b| !matches!((a - b).rem_euclid(12), 1 | 2 | 10 | 11))
        })
    };
    let runs: Vec<_> = tree
        .iterate_consonance_bounded_verticalities(no_seconds)
        .map(|run| run.start_offsets())
        .collect();
    // 0: C/C, 1: C/D (second), 2: E alone, 3: F alone, 4: G/A (ninth).
    assert_eq!(runs, vec![vec![o(0), o(1), o(2)]]);
}

#[test]
fn handles_outlive_their_tree_safely() {
    init_logging();
    let tree = two_part_tree();
    let v = tree.verticality_at(o(1));
    let mut iter = tree.iterate_verticalities(false);
    assert!(iter.next().is_some());
    drop(tree);
    assert_eq!(v.next_verticality().err(), Some(TimespanError::StaleHandle));
    assert!(iter.next().is_none());
    assert!(v.handle().is_stale());
}
